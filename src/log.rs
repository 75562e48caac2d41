use crate::message::Entry;
use crate::{Index, Term};
use serde::{Deserialize, Serialize};

/// Initial capacity of the entry array; growth doubles from here.
const INITIAL_CAPACITY: usize = 10;

/// A LogEntry is an entry in a RaftLog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Term in which the entry was appended.
    pub term: Term,

    /// The underlying client command.
    pub entry: Entry,

    /// Number of peers that have acknowledged this entry.  Incremented once
    /// per follower whose AppendEntries response range covers this index;
    /// the basis for majority-commit detection.
    pub acks: usize,
}

impl LogEntry {
    pub fn new(term: Term, entry: Entry) -> LogEntry {
        LogEntry {
            term,
            entry,
            acks: 0,
        }
    }
}

/// A RaftLog is the central data structure in raft: an append-only, 0-indexed,
/// contiguous sequence of entries.  The only mutations are appending, dropping
/// a suffix to resolve a leader/follower conflict, and acknowledgment counts.
#[derive(Clone, Debug, PartialEq)]
pub struct RaftLog {
    entries: Vec<LogEntry>,
}

impl RaftLog {
    /// Create an empty log.
    pub fn new() -> RaftLog {
        RaftLog {
            entries: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Get the number of entries.
    pub fn count(&self) -> Index {
        self.entries.len() as Index
    }

    /// Append an entry, resetting its acknowledgment count, and return the
    /// index it was stored at.
    pub fn append(&mut self, mut entry: LogEntry) -> Index {
        entry.acks = 0;
        self.entries.push(entry);
        self.entries.len() as Index - 1
    }

    /// Get an entry by index, or `None` past the end of the log.
    pub fn get(&self, index: Index) -> Option<&LogEntry> {
        self.entries.get(index as usize)
    }

    /// Discard every entry at or after `index`.  Used only to drop a suffix
    /// that diverges from the leader's log.
    pub fn truncate(&mut self, index: Index) {
        self.entries.truncate(index as usize);
    }

    /// The last entry, or `None` if the log is empty.
    pub fn tail(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Record that one more node holds the entry at `index`.  A no-op if the
    /// index is absent.
    pub fn mark_acknowledged(&mut self, index: Index) {
        if let Some(entry) = self.entries.get_mut(index as usize) {
            entry.acks += 1;
        }
    }
}
