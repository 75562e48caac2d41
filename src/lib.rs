//! A single-node Raft consensus engine for small, fixed-size clusters.
//!
//! The [`Server`] owns the whole algorithm state and is driven entirely from
//! the outside: the embedding application feeds it elapsed-time ticks
//! ([`Server::periodic`]) and inbound peer messages (`Server::recv_*`), and
//! receives outbound messages and apply notifications through the
//! [`RaftCallbacks`] it supplied at construction.  The server performs no I/O
//! and has no concurrency of its own; the caller must serialize all calls
//! onto one logical thread.
//!
//! The transport this was built for is a low-bandwidth short-range wireless
//! link, so an AppendEntries message carries at most one log entry.

/// A Term describes the leadership epoch in which an entry was made.
pub type Term = u64;

/// An Index is a position within the raft log.  Indexes are 0-based.
pub type Index = u64;

/// Nodes are addressed by their position in the fixed cluster configuration.
pub type NodeId = usize;

pub mod callbacks;
pub mod log;
pub mod message;
pub mod node;
pub mod server;
pub mod util;

pub use callbacks::RaftCallbacks;
pub use server::{Mode, Server};
