use crate::callbacks::RaftCallbacks;
use crate::log::{LogEntry, RaftLog};
use crate::message::{AppendEntries, AppendEntriesResponse, Entry, RequestVote, RequestVoteResponse};
use crate::node::Nodes;
use crate::{Index, NodeId, Term};
use failure::Fallible;
use log::debug;
use std::time::Duration;

mod handlers;
mod state;
pub use state::Mode;
use state::RaftState;


/// Default time without leader contact after which a new election is called.
/// This should be well over the round trip between two nodes on the link.
pub const ELECTION_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default maximum time between AppendEntries broadcasts when leader.  This
/// must be comfortably under the election timeout, or followers will call
/// elections against a live leader.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(200);

/// A Server is a single node participating in a Raft.
///
/// The server is driven entirely by its caller: deliver elapsed time with
/// [`periodic`](Server::periodic) and inbound peer messages with the `recv_*`
/// methods, all from one logical thread.  Outbound messages and apply
/// notifications are made synchronously through the [`RaftCallbacks`]
/// supplied at construction.
#[derive(Debug)]
pub struct Server<CB: RaftCallbacks> {
    state: RaftState,
    callbacks: CB,
}

impl<CB: RaftCallbacks> Server<CB> {
    /// Create a server as node `node_id` of a fixed `num_nodes`-node cluster,
    /// starting as a Follower at term 0 with an empty log and default
    /// timeouts.
    pub fn new(node_id: NodeId, num_nodes: usize, callbacks: CB) -> Server<CB> {
        assert!(node_id < num_nodes, "node_id outside the cluster");

        debug!("[{}] created new server", node_id);
        Server {
            state: RaftState {
                node_id,
                num_nodes,
                mode: Mode::Follower,
                current_term: 0,
                voted_for: None,
                commit_idx: None,
                last_applied_idx: None,
                votes_for_me: vec![false; num_nodes],
                timeout_elapsed: Duration::from_millis(0),
                election_timeout: ELECTION_TIMEOUT,
                request_timeout: REQUEST_TIMEOUT,
                log: RaftLog::new(),
                nodes: Nodes::new(num_nodes),
            },
            callbacks,
        }
    }

    /// Set the election timeout: the time without leader contact that makes
    /// this node call an election.
    pub fn set_election_timeout(&mut self, timeout: Duration) {
        self.state.election_timeout = timeout;
    }

    /// Set the request timeout: the heartbeat interval when leader.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.state.request_timeout = timeout;
    }

    /// Begin participating: asks the transport to start discovering peers.
    pub fn start(&mut self) -> Fallible<()> {
        self.callbacks.start_peer_scan()
    }

    /// Stop participating: asks the transport to stop discovering peers.
    pub fn shutdown(&mut self) -> Fallible<()> {
        self.callbacks.stop_peer_scan()
    }

    /// Process events that depend on time passing.  `elapsed` is the time
    /// since the previous call.
    pub fn periodic(&mut self, elapsed: Duration) -> Fallible<()> {
        handlers::handle_periodic(&mut self.state, &mut self.callbacks, elapsed)
    }

    /// Call an election now, without waiting for the election timeout.
    pub fn start_election(&mut self) -> Fallible<()> {
        debug!(
            "[{}] election starting, term {}",
            self.state.node_id, self.state.current_term
        );
        handlers::become_candidate(&mut self.state, &mut self.callbacks)
    }

    /// Receive a ballot request from `from`.
    pub fn recv_request_vote(&mut self, from: NodeId, msg: &RequestVote) -> Fallible<()> {
        handlers::handle_request_vote(&mut self.state, &mut self.callbacks, from, msg)
    }

    /// Receive a response to a ballot request we sent.
    pub fn recv_request_vote_response(
        &mut self,
        from: NodeId,
        msg: &RequestVoteResponse,
    ) -> Fallible<()> {
        handlers::handle_request_vote_response(&mut self.state, &mut self.callbacks, from, msg)
    }

    /// Receive a replication request (or heartbeat) from `from`.
    pub fn recv_append_entries(&mut self, from: NodeId, msg: &AppendEntries) -> Fallible<()> {
        handlers::handle_append_entries(&mut self.state, &mut self.callbacks, from, msg)
    }

    /// Receive a response to a replication request we sent.
    pub fn recv_append_entries_response(
        &mut self,
        from: NodeId,
        msg: &AppendEntriesResponse,
    ) -> Fallible<()> {
        handlers::handle_append_entries_response(&mut self.state, &mut self.callbacks, from, msg)
    }

    /// Receive a client-submitted command: append it to the log and replicate
    /// it to every peer.
    pub fn recv_entry(&mut self, from: NodeId, entry: Entry) -> Fallible<()> {
        handlers::handle_entry(&mut self.state, &mut self.callbacks, from, entry)
    }

    /// Forget what we know about a peer's log, for when the peer disconnects;
    /// replication starts over from index 0 if it returns.
    pub fn clear_node(&mut self, node: NodeId) {
        self.state.nodes.clear(node);
    }

    // read accessors

    pub fn node_id(&self) -> NodeId {
        self.state.node_id
    }

    pub fn num_nodes(&self) -> usize {
        self.state.num_nodes
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn is_follower(&self) -> bool {
        self.state.mode == Mode::Follower
    }

    pub fn is_candidate(&self) -> bool {
        self.state.mode == Mode::Candidate
    }

    pub fn is_leader(&self) -> bool {
        self.state.mode == Mode::Leader
    }

    pub fn current_term(&self) -> Term {
        self.state.current_term
    }

    /// The next free log index: the number of entries appended and not
    /// truncated.
    pub fn current_idx(&self) -> Index {
        self.state.current_idx()
    }

    pub fn commit_idx(&self) -> Option<Index> {
        self.state.commit_idx
    }

    pub fn last_applied_idx(&self) -> Option<Index> {
        self.state.last_applied_idx
    }

    pub fn voted_for(&self) -> Option<NodeId> {
        self.state.voted_for
    }

    pub fn log_count(&self) -> Index {
        self.state.log.count()
    }

    /// Get a log entry by index.
    pub fn entry(&self, idx: Index) -> Option<&LogEntry> {
        self.state.log.get(idx)
    }

    /// The replication pointer stored for the given peer.
    pub fn next_idx(&self, node: NodeId) -> Option<Index> {
        self.state.nodes.get(node).map(|n| n.next_idx())
    }

    /// Number of votes received this election, our own included.
    pub fn nvotes_for_me(&self) -> usize {
        self.state.nvotes_for_me()
    }

    pub fn timeout_elapsed(&self) -> Duration {
        self.state.timeout_elapsed
    }

    pub fn election_timeout(&self) -> Duration {
        self.state.election_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.state.request_timeout
    }
}
