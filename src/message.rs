use crate::{Index, NodeId, Term};
use serde::{Deserialize, Serialize};

/// A client-submitted command: the only application-visible entry shape.
///
/// The payload is a fixed two-element vector so that a whole message fits in
/// one frame on the wireless link.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Entry {
    pub data: [f32; 2],
}

impl Entry {
    pub fn new(data: [f32; 2]) -> Entry {
        Entry { data }
    }
}

/// Ballot request sent by a candidate to every other node.
///
/// Fields are 16-bit to fit the link MTU; terms and indexes in a game session
/// stay well below that.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestVote {
    /// Candidate's term.
    pub term: u16,

    /// The candidate's `current_idx` (its log entry count).  Voters deny the
    /// ballot if their own log is longer.
    pub last_log_idx: u16,

    /// The candidate's device UUID.  Zeroed by the core; the transport fills
    /// it in, and voters echo it back in the response.
    pub candidate_uuid: [u8; 16],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestVoteResponse {
    /// Voter's current term, for the candidate to update itself.
    pub term: Term,

    pub vote_granted: bool,

    /// UUID of the candidate this vote is addressed to, echoed from the
    /// request.
    pub voter_uuid: [u8; 16],
}

/// Replication request from the leader.  Also serves as the heartbeat when
/// `entry` is `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppendEntries {
    pub term: Term,
    pub leader_id: NodeId,

    /// Index of the entry immediately preceding the one being sent, or `None`
    /// when replication starts from the beginning of the log.
    pub prev_log_idx: Option<Index>,

    /// Term of the entry at `prev_log_idx`; `None` iff `prev_log_idx` is.
    pub prev_log_term: Option<Term>,

    /// At most one entry per message: the link cannot carry more.
    pub entry: Option<Entry>,

    /// The leader's commit index, or `None` if it has committed nothing.
    pub leader_commit: Option<Index>,
}

/// Outcome of an AppendEntries request, from the follower's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum AppendOutcome {
    /// Stale term or log mismatch; the leader should back up and retry.
    Failure,

    /// The request applied cleanly.
    Success,

    /// The entry was already appended by an earlier delivery of the same
    /// request.  The leader takes no action.
    Duplicate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppendEntriesResponse {
    /// Current term, for the leader to update itself.
    pub term: Term,

    pub outcome: AppendOutcome,

    /// The responder's log entry count after any append.
    pub current_idx: Index,

    /// The first index covered by the request, i.e. `prev_log_idx + 1`.  On
    /// success the sender should consider `[first_idx, current_idx)`
    /// acknowledged by this node.
    pub first_idx: Index,
}

/// Envelope over the four RPC records, for transports that carry all message
/// kinds over one channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    RequestVote(RequestVote),
    RequestVoteResponse(RequestVoteResponse),
    AppendEntries(AppendEntries),
    AppendEntriesResponse(AppendEntriesResponse),
}
