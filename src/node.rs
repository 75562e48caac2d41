use crate::{Index, NodeId};

/// Per-peer replication bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub struct RaftNode {
    /// Index of the next log entry the server believes it must still send
    /// this peer.
    next_idx: Index,
}

impl RaftNode {
    pub fn next_idx(&self) -> Index {
        self.next_idx
    }
}

/// The fixed set of peer records, one per node in the cluster configuration
/// (including a slot for this server, which is never addressed).  Sized once
/// at startup; membership changes are not supported.
#[derive(Clone, Debug, PartialEq)]
pub struct Nodes {
    nodes: Vec<RaftNode>,
}

impl Nodes {
    /// Materialize `count` peer records, each starting at `next_idx = 0`.
    pub fn new(count: usize) -> Nodes {
        Nodes {
            nodes: vec![RaftNode { next_idx: 0 }; count],
        }
    }

    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a peer record, or `None` outside the configured range.
    pub fn get(&self, node: NodeId) -> Option<&RaftNode> {
        self.nodes.get(node)
    }

    /// Get a peer's replication pointer.
    pub fn next_idx(&self, node: NodeId) -> Index {
        assert!(node < self.nodes.len(), "no such node: {}", node);
        self.nodes[node].next_idx
    }

    pub fn set_next_idx(&mut self, node: NodeId, next_idx: Index) {
        // peer indexes outside the configuration are a caller bug
        assert!(node < self.nodes.len(), "no such node: {}", node);
        self.nodes[node].next_idx = next_idx;
    }

    /// Reset a peer's replication pointer, for use when the peer disconnects
    /// and may later reconnect with an empty log.
    pub fn clear(&mut self, node: NodeId) {
        self.set_next_idx(node, 0);
    }
}
