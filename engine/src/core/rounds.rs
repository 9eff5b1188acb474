//! Round progression rules
//!
//! Round decks are disjoint windows over the ordered pool. Deck exhaustion is
//! treated identically to reaching the round limit: the window is simply
//! shorter, so the completion predicate still converges instead of blocking.

use crate::session::{RoundLimits, Session};
use shared::Candidate;

/// Candidates shown in the given round.
///
/// Round 1 takes the first `round1` candidates; round 2 the disjoint suffix
/// that was not previously shown, capped at `round2`.
pub fn deck_for_round(pool: &[Candidate], limits: RoundLimits, round: u8) -> &[Candidate] {
    match round {
        1 => {
            let end = limits.round1.min(pool.len());
            &pool[..end]
        }
        _ => {
            let start = limits.round1.min(pool.len());
            let end = (start + limits.round2).min(pool.len());
            &pool[start..end]
        }
    }
}

/// Round-completion predicate for one participant: swipe count for the
/// current round covers the round's deck.
pub fn participant_done(session: &Session, participant_id: &shared::ParticipantId) -> bool {
    let deck = deck_for_round(&session.pool, session.limits, session.round);
    session.swipe_count(participant_id, session.round) >= deck.len()
}

/// The round is complete only when the predicate holds for every participant.
///
/// Pure function of stored swipes: safe to re-evaluate by whichever poller
/// happens to observe it.
pub fn round_complete(session: &Session) -> bool {
    !session.participants.is_empty()
        && session
            .participants
            .iter()
            .all(|p| participant_done(session, &p.id))
}
