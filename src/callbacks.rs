use crate::message::{AppendEntries, AppendEntriesResponse, Entry, RequestVote, RequestVoteResponse};
use crate::NodeId;
use failure::Fallible;

/// The capability interface the embedding application supplies to a
/// [`Server`](crate::Server) at construction.
///
/// The server performs no network I/O itself; each outbound message becomes a
/// `send_*` call, made synchronously from within the receive or periodic
/// operation that produced it.  Implementations must not re-enter the
/// server's receive API from within a callback.
///
/// A send failure propagates out of the triggering operation; the protocol
/// itself recovers from lost messages via timeouts, so implementations are
/// free to report best-effort delivery as success.
pub trait RaftCallbacks {
    /// Send a ballot request to the given peer.
    fn send_request_vote(&mut self, to: NodeId, msg: &RequestVote) -> Fallible<()>;

    /// Send a ballot response to the given peer.
    fn send_request_vote_response(&mut self, to: NodeId, msg: &RequestVoteResponse)
        -> Fallible<()>;

    /// Send a replication request (or heartbeat) to the given peer.
    fn send_append_entries(&mut self, to: NodeId, msg: &AppendEntries) -> Fallible<()>;

    /// Send a replication response to the given peer.
    fn send_append_entries_response(
        &mut self,
        to: NodeId,
        msg: &AppendEntriesResponse,
    ) -> Fallible<()>;

    /// Apply a committed entry to the application state.  Invoked exactly once
    /// per committed index, in commit order.
    fn apply_entry(&mut self, entry: &Entry) -> Fallible<()>;

    /// Begin discovering peers.  Invoked from [`Server::start`](crate::Server::start);
    /// not part of the consensus protocol.
    fn start_peer_scan(&mut self) -> Fallible<()>;

    /// Stop discovering peers.  Invoked from [`Server::shutdown`](crate::Server::shutdown).
    fn stop_peer_scan(&mut self) -> Fallible<()>;
}
