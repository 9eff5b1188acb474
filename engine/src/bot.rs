//! Synthetic demo partner
//!
//! A demo session gets a partner that happens to be algorithmically driven
//! rather than human-driven. It sits behind the same participant interface
//! the real protocol consumes, so the consensus engine never special-cases
//! it: its swipes land through the ordinary ingestion path during
//! reconciliation.

use chrono::Utc;
use shared::{Decision, Participant, ParticipantId, SessionId, SwipeRecord};
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::core::rounds;
use crate::session::Session;

/// Display name clients see for the synthetic partner
pub const BOT_DISPLAY_NAME: &str = "Demo Partner";

/// The synthetic participant for a given session
pub fn bot_participant(session_id: SessionId) -> Participant {
    Participant {
        id: bot_id(session_id),
        display_name: BOT_DISPLAY_NAME.to_string(),
        is_host: false,
        joined_at: Utc::now(),
    }
}

pub fn bot_id(session_id: SessionId) -> ParticipantId {
    ParticipantId::new(format!("bot-{session_id}"))
}

/// Swipes the bot still owes for the current round's deck.
///
/// Decisions derive from a hash of (session, candidate, round): roughly two
/// thirds likes, never superlikes (so the bot cannot short-circuit a demo
/// round), with latencies spread over 500–3000 ms. Deterministic, so
/// redundant reconciliation passes produce identical records.
pub fn pending_swipes(session: &Session) -> Vec<SwipeRecord> {
    let bot = bot_id(session.id);
    let deck = rounds::deck_for_round(&session.pool, session.limits, session.round);

    deck.iter()
        .filter(|candidate| session.swipe(&bot, &candidate.id, session.round).is_none())
        .map(|candidate| {
            let mut hasher = DefaultHasher::new();
            session.id.hash(&mut hasher);
            candidate.id.hash(&mut hasher);
            session.round.hash(&mut hasher);
            let h = hasher.finish();

            let decision = if h % 3 != 0 {
                Decision::Like
            } else {
                Decision::Dislike
            };
            SwipeRecord {
                participant_id: bot.clone(),
                candidate_id: candidate.id.clone(),
                round: session.round,
                decision,
                decided_at_ms: 500 + h % 2500,
            }
        })
        .collect()
}
