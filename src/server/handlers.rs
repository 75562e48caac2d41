use super::state::{Mode, RaftState};
use crate::callbacks::RaftCallbacks;
use crate::log::LogEntry;
use crate::message::{
    AppendEntries, AppendEntriesResponse, AppendOutcome, Entry, RequestVote, RequestVoteResponse,
};
use crate::{Index, NodeId, Term};
use failure::Fallible;
use log::debug;
use rand::{thread_rng, Rng};
use std::cmp;
use std::time::Duration;

/// Upper bound (exclusive, in milliseconds) of the random head start a new
/// candidate gives its own election timer, to desynchronize simultaneous
/// candidates.
const CANDIDACY_FUZZ_MS: u64 = 500;

pub(super) fn handle_periodic<CB: RaftCallbacks>(
    state: &mut RaftState,
    cb: &mut CB,
    elapsed: Duration,
) -> Fallible<()> {
    // a plain follower learns of commitment only from heartbeats, so catch up
    // on any entries the leader has already committed
    if state.mode == Mode::Follower {
        while state.last_applied_idx < state.commit_idx {
            if !apply_next(state, cb)? {
                break;
            }
        }
    }

    state.timeout_elapsed += elapsed;

    match state.mode {
        Mode::Leader => {
            if state.request_timeout <= state.timeout_elapsed {
                send_append_entries_all(state, cb)?;
                state.timeout_elapsed = Duration::from_millis(0);
            }
        }
        Mode::Follower | Mode::Candidate => {
            if state.election_timeout <= state.timeout_elapsed {
                debug!(
                    "[{}] election starting, term {}",
                    state.node_id, state.current_term
                );
                become_candidate(state, cb)?;
            }
        }
    }

    Ok(())
}

pub(super) fn handle_request_vote<CB: RaftCallbacks>(
    state: &mut RaftState,
    cb: &mut CB,
    peer: NodeId,
    msg: &RequestVote,
) -> Fallible<()> {
    let term = Term::from(msg.term);

    // a fresh term brings fresh vote eligibility
    if state.current_term < term {
        state.voted_for = None;
    }

    let vote_granted = if term < state.current_term
        || state.voted_for.is_some()
        || Index::from(msg.last_log_idx) < state.current_idx()
    {
        false
    } else {
        state.voted_for = Some(peer);
        true
    };

    debug!(
        "[{}] node {} requested vote: {}",
        state.node_id,
        peer,
        if vote_granted { "granted" } else { "not granted" }
    );

    cb.send_request_vote_response(
        peer,
        &RequestVoteResponse {
            term: state.current_term,
            vote_granted,
            voter_uuid: msg.candidate_uuid,
        },
    )
}

pub(super) fn handle_request_vote_response<CB: RaftCallbacks>(
    state: &mut RaftState,
    cb: &mut CB,
    peer: NodeId,
    msg: &RequestVoteResponse,
) -> Fallible<()> {
    debug!(
        "[{}] node {} responded to requestvote: {}",
        state.node_id,
        peer,
        if msg.vote_granted {
            "granted"
        } else {
            "not granted"
        }
    );

    if state.mode == Mode::Leader {
        return Ok(());
    }

    assert!(peer < state.num_nodes, "no such node: {}", peer);

    if msg.vote_granted {
        state.votes_for_me[peer] = true;
        let votes = state.nvotes_for_me();
        debug!(
            "[{}] now have {} of {} votes",
            state.node_id, votes, state.num_nodes
        );
        if votes_is_majority(state.num_nodes, votes) {
            become_leader(state, cb)?;
        }
    }

    Ok(())
}

pub(super) fn handle_append_entries<CB: RaftCallbacks>(
    state: &mut RaftState,
    cb: &mut CB,
    peer: NodeId,
    msg: &AppendEntries,
) -> Fallible<()> {
    // leader liveness observed
    state.timeout_elapsed = Duration::from_millis(0);

    debug!(
        "[{}] received appendentries from {}: {:?}",
        state.node_id, peer, msg
    );

    // the response carries the term as it was on receipt, before any adoption
    // of the message's term below
    let reply_term = state.current_term;

    // we've found a leader who is legitimate
    if state.mode == Mode::Leader && state.current_term <= msg.term {
        become_follower(state);
    }

    let first_idx = msg.prev_log_idx.map_or(0, |i| i + 1);
    let outcome = append_entries_outcome(state, cb, msg, first_idx)?;

    let response = AppendEntriesResponse {
        term: reply_term,
        outcome,
        current_idx: state.current_idx(),
        first_idx,
    };
    debug!(
        "[{}] sending appendentries response to {}: {:?}",
        state.node_id, peer, response
    );
    cb.send_append_entries_response(peer, &response)
}

/// The mutating part of AppendEntries receipt.  Splitting this out lets the
/// caller send a response on every path.
fn append_entries_outcome<CB: RaftCallbacks>(
    state: &mut RaftState,
    cb: &mut CB,
    msg: &AppendEntries,
    first_idx: Index,
) -> Fallible<AppendOutcome> {
    // 1. Reply false if term < currentTerm (§5.1)
    if msg.term < state.current_term {
        debug!("[{}] AE term is less than current term", state.node_id);
        return Ok(AppendOutcome::Failure);
    }

    // not the first appendentries we've received
    if let Some(prev_log_idx) = msg.prev_log_idx {
        let prev_term = match state.log.get(prev_log_idx) {
            Some(e) => e.term,
            None => {
                debug!("[{}] AE no log at prev_idx", state.node_id);
                return Ok(AppendOutcome::Failure);
            }
        };

        // 2. Reply false if log doesn't contain an entry at prevLogIndex
        // whose term matches prevLogTerm (§5.3)
        if Some(prev_term) != msg.prev_log_term {
            debug!("[{}] AE term doesn't match prev_idx", state.node_id);
            return Ok(AppendOutcome::Failure);
        }

        // 3. If an existing entry conflicts with a new one (same index but
        // different terms), delete the existing entry and all that follow it
        // (§5.3).  Only the entry at first_idx needs checking, since at most
        // one entry arrives per message.
        if let Some(existing) = state.log.get(first_idx) {
            if existing.term != msg.term {
                state.log.truncate(first_idx);
            }
        }
    }

    // 5. If leaderCommit > commitIndex, set
    // commitIndex = min(leaderCommit, last log index)
    if state.commit_idx < msg.leader_commit {
        let new_commit = cmp::min(state.current_idx().checked_sub(1), msg.leader_commit);
        // never regress the commit index
        if state.commit_idx < new_commit {
            state.commit_idx = new_commit;
            while state.last_applied_idx < state.commit_idx {
                if !apply_next(state, cb)? {
                    break;
                }
            }
        }
    }

    if state.mode == Mode::Candidate {
        // we lost the election
        become_follower(state);
    }

    state.current_term = msg.term;

    if let Some(entry) = msg.entry {
        if state.current_idx() > first_idx {
            debug!("[{}] AE got duplicate message", state.node_id);
            return Ok(AppendOutcome::Duplicate);
        }
        state.log.append(LogEntry::new(state.current_term, entry));
    }

    Ok(AppendOutcome::Success)
}

pub(super) fn handle_append_entries_response<CB: RaftCallbacks>(
    state: &mut RaftState,
    cb: &mut CB,
    peer: NodeId,
    msg: &AppendEntriesResponse,
) -> Fallible<()> {
    debug!(
        "[{}] received appendentries response from {}: {:?}",
        state.node_id, peer, msg
    );

    match msg.outcome {
        AppendOutcome::Success => {
            for idx in msg.first_idx..msg.current_idx {
                state.log.mark_acknowledged(idx);
            }
            state.nodes.set_next_idx(peer, msg.current_idx);

            // apply forward while the next unapplied entry is held by a
            // majority; the leader itself counts implicitly
            loop {
                let next = state.last_applied_idx.map_or(0, |i| i + 1);
                match state.log.get(next) {
                    Some(e) if state.num_nodes / 2 <= e.acks => {
                        if !apply_next(state, cb)? {
                            break;
                        }
                    }
                    _ => break,
                }
            }
        }

        AppendOutcome::Failure => {
            // If AppendEntries fails because of log inconsistency:
            // decrement nextIndex and retry (§5.3)
            let next_idx = state.nodes.next_idx(peer);
            assert!(
                next_idx >= 1,
                "next_idx for node {} would become negative",
                peer
            );
            state.nodes.set_next_idx(peer, next_idx - 1);
            send_append_entries(state, cb, peer)?;
        }

        // the peer already had the entry; nothing to record or retry
        AppendOutcome::Duplicate => {}
    }

    Ok(())
}

pub(super) fn handle_entry<CB: RaftCallbacks>(
    state: &mut RaftState,
    cb: &mut CB,
    from: NodeId,
    entry: Entry,
) -> Fallible<()> {
    debug!("[{}] received entry from {}", state.node_id, from);

    state.log.append(LogEntry::new(state.current_term, entry));

    for peer in 0..state.num_nodes {
        if peer == state.node_id {
            continue;
        }
        send_append_entries(state, cb, peer)?;
    }

    // a lone node is its own majority: apply without waiting for a quorum
    if state.num_nodes == 1 {
        apply_next(state, cb)?;
    }

    Ok(())
}

//
// Mode transitions
//

pub(super) fn become_candidate<CB: RaftCallbacks>(
    state: &mut RaftState,
    cb: &mut CB,
) -> Fallible<()> {
    debug!("[{}] becoming candidate", state.node_id);

    for vote in state.votes_for_me.iter_mut() {
        *vote = false;
    }
    state.current_term += 1;
    state.voted_for = Some(state.node_id);
    state.mode = Mode::Candidate;

    // a random head start prevents candidates that timed out together from
    // splitting the vote forever
    state.timeout_elapsed = Duration::from_millis(thread_rng().gen_range(0, CANDIDACY_FUZZ_MS));

    for peer in 0..state.num_nodes {
        if peer == state.node_id {
            continue;
        }
        send_request_vote(state, cb, peer)?;
    }

    // with one node only, our own vote already carries the election
    if votes_is_majority(state.num_nodes, state.nvotes_for_me()) {
        become_leader(state, cb)?;
    }

    Ok(())
}

fn become_leader<CB: RaftCallbacks>(state: &mut RaftState, cb: &mut CB) -> Fallible<()> {
    debug!(
        "[{}] becoming leader in term {}",
        state.node_id, state.current_term
    );

    state.mode = Mode::Leader;
    state.voted_for = None;
    for peer in 0..state.num_nodes {
        if peer == state.node_id {
            continue;
        }
        // optimistic: assume the peer is fully caught up, and let failure
        // responses walk next_idx back
        state.nodes.set_next_idx(peer, state.current_idx());
        send_append_entries(state, cb, peer)?;
    }

    Ok(())
}

fn become_follower(state: &mut RaftState) {
    debug!("[{}] becoming follower", state.node_id);

    state.mode = Mode::Follower;
    state.voted_for = None;
}

//
// Utility functions
//

/// Determine whether `nvotes` forms a strict majority of an `num_nodes`-node
/// cluster.
fn votes_is_majority(num_nodes: usize, nvotes: usize) -> bool {
    if num_nodes < nvotes {
        return false;
    }
    num_nodes / 2 + 1 <= nvotes
}

/// Apply the next unapplied entry, if there is one, and tell the caller
/// whether anything was applied.  The sole path by which the application
/// observes committed state.
fn apply_next<CB: RaftCallbacks>(state: &mut RaftState, cb: &mut CB) -> Fallible<bool> {
    let next = state.last_applied_idx.map_or(0, |i| i + 1);
    let entry = match state.log.get(next) {
        Some(e) => e.entry,
        None => return Ok(false),
    };

    debug!("[{}] applying log entry {}", state.node_id, next);

    state.last_applied_idx = Some(next);
    if state.commit_idx < state.last_applied_idx {
        state.commit_idx = state.last_applied_idx;
    }
    cb.apply_entry(&entry)?;
    Ok(true)
}

fn send_request_vote<CB: RaftCallbacks>(
    state: &mut RaftState,
    cb: &mut CB,
    peer: NodeId,
) -> Fallible<()> {
    debug!("[{}] sending requestvote to {}", state.node_id, peer);

    cb.send_request_vote(
        peer,
        &RequestVote {
            term: state.current_term as u16,
            last_log_idx: state.current_idx() as u16,
            // the transport knows our device UUID; it fills this in
            candidate_uuid: [0; 16],
        },
    )
}

/// Send an AppendEntries to the given peer, carrying the next entry it is
/// missing (if any) according to our stored next_idx.
pub(super) fn send_append_entries<CB: RaftCallbacks>(
    state: &mut RaftState,
    cb: &mut CB,
    peer: NodeId,
) -> Fallible<()> {
    let next_idx = state.nodes.next_idx(peer);
    let prev_log_idx = next_idx.checked_sub(1);
    let prev_log_term = prev_log_idx.and_then(|i| state.log.get(i)).map(|e| e.term);

    let entry = if state.current_idx() > next_idx {
        state.log.get(next_idx).map(|e| e.entry)
    } else {
        None
    };

    let msg = AppendEntries {
        term: state.current_term,
        leader_id: state.node_id,
        prev_log_idx,
        prev_log_term,
        entry,
        leader_commit: state.commit_idx,
    };
    debug!(
        "[{}] sending appendentries to {}: {:?}",
        state.node_id, peer, msg
    );
    cb.send_append_entries(peer, &msg)
}

fn send_append_entries_all<CB: RaftCallbacks>(state: &mut RaftState, cb: &mut CB) -> Fallible<()> {
    for peer in 0..state.num_nodes {
        if peer == state.node_id {
            continue;
        }
        send_append_entries(state, cb, peer)?;
    }
    Ok(())
}
