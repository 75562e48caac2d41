use crate::log::RaftLog;
use crate::node::Nodes;
use crate::{Index, NodeId, Term};
use std::time::Duration;

/// The current mode of the server.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Mode {
    Follower,
    Candidate,
    Leader,
}

/// Raft-related state of the server.
///
/// All protocol handlers operate on this struct; the surrounding
/// [`Server`](crate::Server) only routes events to them.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RaftState {
    /// This node.
    pub(crate) node_id: NodeId,

    /// Number of nodes in the cluster, fixed at startup.
    pub(crate) num_nodes: usize,

    /// Current server mode.
    pub(crate) mode: Mode,

    /// "latest term the server has seen"
    pub(crate) current_term: Term,

    /// "candidateId that received vote in current term (or null if none)"
    pub(crate) voted_for: Option<NodeId>,

    /// Index of the highest log entry known to be committed.
    pub(crate) commit_idx: Option<Index>,

    /// Index of the highest log entry applied to the application state.
    pub(crate) last_applied_idx: Option<Index>,

    /// True for each node that has voted for this node in the current
    /// election.
    pub(crate) votes_for_me: Vec<bool>,

    /// Time since the last leader contact (as follower) or the last heartbeat
    /// broadcast (as leader).
    pub(crate) timeout_elapsed: Duration,

    /// Time without leader contact after which an election is called.
    pub(crate) election_timeout: Duration,

    /// Time between AppendEntries broadcasts when leader.
    pub(crate) request_timeout: Duration,

    /// The log entries.
    pub(crate) log: RaftLog,

    /// Per-peer replication bookkeeping.
    pub(crate) nodes: Nodes,
}

impl RaftState {
    /// The next free log index, i.e. the number of entries ever appended and
    /// not truncated.
    pub(crate) fn current_idx(&self) -> Index {
        self.log.count()
    }

    /// Number of votes received this election, counting our own vote for
    /// ourselves.
    pub(crate) fn nvotes_for_me(&self) -> usize {
        let mut votes = (0..self.num_nodes)
            .filter(|&i| i != self.node_id && self.votes_for_me[i])
            .count();
        if self.voted_for == Some(self.node_id) {
            votes += 1;
        }
        votes
    }
}
