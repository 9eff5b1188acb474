//! Shared fixtures for engine integration tests

use engine::{CreateSessionParams, MemorySessionStore, NewParticipant, SessionEngine};
use shared::{Candidate, CandidateId, Decision, ParticipantId, SessionMode, SessionSnapshot};

pub fn engine() -> SessionEngine<MemorySessionStore> {
    SessionEngine::new(MemorySessionStore::new())
}

pub fn pool(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| Candidate {
            id: CandidateId::new(format!("movie-{i:02}")),
            metadata: serde_json::json!({ "title": format!("Movie {i}") }),
        })
        .collect()
}

pub fn participant(id: &str) -> NewParticipant {
    NewParticipant {
        id: ParticipantId::new(id),
        display_name: id.to_string(),
    }
}

pub fn pair_params(pool_size: usize, round1: usize, round2: usize) -> CreateSessionParams {
    CreateSessionParams {
        mode: SessionMode::Pair,
        host: participant("alice"),
        pool: pool(pool_size),
        min_participants: None,
        round1_limit: Some(round1),
        round2_limit: Some(round2),
        demo: false,
    }
}

pub fn group_params(pool_size: usize, round1: usize) -> CreateSessionParams {
    CreateSessionParams {
        mode: SessionMode::Group,
        host: participant("alice"),
        pool: pool(pool_size),
        min_participants: Some(3),
        round1_limit: Some(round1),
        round2_limit: Some(3),
        demo: false,
    }
}

/// Create a pair session, join bob, and walk it to round-1 swiping
pub async fn swiping_pair(
    eng: &SessionEngine<MemorySessionStore>,
    pool_size: usize,
    round1: usize,
    round2: usize,
) -> SessionSnapshot {
    let snap = eng
        .create_session(pair_params(pool_size, round1, round2))
        .await
        .unwrap();
    eng.join_session(&snap.join_code, participant("bob"))
        .await
        .unwrap();
    eng.mark_pool_ready(snap.session_id, &ParticipantId::new("alice"))
        .await
        .unwrap();
    eng.begin_swiping(snap.session_id, &ParticipantId::new("alice"))
        .await
        .unwrap()
}

/// Submit decisions for every card in the snapshot's deck, in deck order
pub async fn swipe_deck(
    eng: &SessionEngine<MemorySessionStore>,
    snap: &SessionSnapshot,
    who: &str,
    decisions: &[(usize, Decision, u64)],
) -> SessionSnapshot {
    let pid = ParticipantId::new(who);
    let mut last = snap.clone();
    for (idx, decision, latency) in decisions {
        last = eng
            .submit_swipe(
                snap.session_id,
                &pid,
                &snap.deck[*idx].id,
                *decision,
                snap.round,
                *latency,
            )
            .await
            .unwrap();
    }
    last
}

pub fn cid(i: usize) -> CandidateId {
    CandidateId::new(format!("movie-{i:02}"))
}

pub fn pid(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}
