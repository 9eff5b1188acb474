//! Main consensus engine implementation
//!
//! `SessionEngine` is a stateless request handler over an injected store: no
//! in-process locks, no blocking waits. "Waiting for partner" exists only as
//! the client's polling loop observing the round-completion predicate, and
//! every cross-participant computation is a pure function persisted with
//! write-if-absent, so concurrent pollers invoking the same session converge.

use chrono::Utc;
use shared::{
    Candidate, CandidateId, Decision, Participant, ParticipantId, RoundResult, SessionId,
    SessionMode, SessionSnapshot, SessionStatus, SwipeRecord,
};
use tracing::{debug, info};

use crate::bot;
use crate::core::{consensus, join_code, lifecycle, rounds};
use crate::error::{EngineError, EngineResult};
use crate::session::{RoundLimits, Session};
use crate::traits::SessionStore;

/// Engine tuning knobs
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Superlikes a participant may spend per round
    pub superlike_budget: u32,
    /// Bounded retry for join-code collision checking
    pub max_join_code_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            superlike_budget: 1,
            max_join_code_attempts: 16,
        }
    }
}

/// Profile a joining client supplies for itself
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub id: ParticipantId,
    pub display_name: String,
}

/// Everything needed to open a session
#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub mode: SessionMode,
    pub host: NewParticipant,
    /// Ordered candidate pool from the external pool supplier
    pub pool: Vec<Candidate>,
    pub min_participants: Option<usize>,
    pub round1_limit: Option<usize>,
    pub round2_limit: Option<usize>,
    /// Attach a synthetic demo partner
    pub demo: bool,
}

/// The session consensus engine, generic over its persistence
pub struct SessionEngine<S: SessionStore> {
    store: S,
    config: EngineConfig,
}

impl<S: SessionStore> SessionEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Create a session in `Lobby` with the caller as host
    pub async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> EngineResult<SessionSnapshot> {
        let id = SessionId::new();

        let defaults = RoundLimits::default();
        let limits = RoundLimits {
            round1: params.round1_limit.unwrap_or(defaults.round1),
            round2: params.round2_limit.unwrap_or(defaults.round2),
        };
        let min_participants = match params.mode {
            SessionMode::Pair => 2,
            SessionMode::Group => params.min_participants.unwrap_or(2).max(2),
        };

        let now = Utc::now();
        let mut participants = vec![Participant {
            id: params.host.id.clone(),
            display_name: params.host.display_name,
            is_host: true,
            joined_at: now,
        }];
        if params.demo {
            participants.push(bot::bot_participant(id));
        }

        let mut session = Session {
            id,
            join_code: String::new(),
            mode: params.mode,
            status: SessionStatus::Lobby,
            round: 1,
            min_participants,
            host_id: params.host.id,
            pool: params.pool,
            limits,
            participants,
            swipes: Vec::new(),
            round_results: Vec::new(),
            finalists: None,
            final_votes: std::collections::HashMap::new(),
            final_winner: None,
            demo: params.demo,
            created_at: now,
            last_activity: now,
        };

        // Codes are drawn at random, so a collision with a live session is
        // possible. The store rejects a taken code, and we retry with a
        // fresh one up to the configured attempt budget.
        for _ in 0..self.config.max_join_code_attempts {
            let code = join_code::generate(&mut rand::thread_rng());
            if self.store.join_code_active(&code).await? {
                continue;
            }
            session.join_code = code;
            match self.store.create(session.clone()).await {
                Ok(()) => {
                    info!(
                        "Created {} session {id} with join code {}",
                        session.mode, session.join_code
                    );
                    return Ok(build_snapshot(&session));
                }
                Err(EngineError::JoinCodeTaken { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(EngineError::JoinCodeExhausted {
            attempts: self.config.max_join_code_attempts,
        })
    }

    /// Join by code. Idempotent by participant id: a rejoin returns the
    /// current snapshot in any state, a fresh join is only accepted in
    /// `Lobby`.
    pub async fn join_session(
        &self,
        code: &str,
        participant: NewParticipant,
    ) -> EngineResult<SessionSnapshot> {
        let session = self.store.find_by_join_code(code).await?;

        if session.is_member(&participant.id) {
            debug!("Participant {} rejoined session {}", participant.id, session.id);
            return Ok(build_snapshot(&session));
        }

        if session.status != SessionStatus::Lobby {
            return Err(EngineError::InvalidTransition {
                from: session.status,
                action: "join".to_string(),
            });
        }
        if session.mode == SessionMode::Pair && session.participants.len() >= 2 {
            return Err(EngineError::SessionFull { capacity: 2 });
        }

        let joined = self
            .store
            .append_participant(
                session.id,
                Participant {
                    id: participant.id.clone(),
                    display_name: participant.display_name,
                    is_host: false,
                    joined_at: Utc::now(),
                },
            )
            .await?;
        info!(
            "Participant {} joined session {} ({} total)",
            participant.id,
            joined.id,
            joined.participants.len()
        );
        Ok(build_snapshot(&joined))
    }

    /// Host-only: `Lobby → PoolReady` once enough participants are present
    pub async fn mark_pool_ready(
        &self,
        id: SessionId,
        participant_id: &ParticipantId,
    ) -> EngineResult<SessionSnapshot> {
        let session = self.store.get(id).await?;
        self.require_host(&session, participant_id, "start session")?;
        if session.participants.len() < session.min_participants {
            return Err(EngineError::NotEnoughParticipants {
                have: session.participants.len(),
                need: session.min_participants,
            });
        }
        self.advance(&session, SessionStatus::PoolReady, None, "start session")
            .await?;
        Ok(build_snapshot(&self.store.get(id).await?))
    }

    /// Host-only: `PoolReady → Swiping`, round 1 opens
    pub async fn begin_swiping(
        &self,
        id: SessionId,
        participant_id: &ParticipantId,
    ) -> EngineResult<SessionSnapshot> {
        let session = self.store.get(id).await?;
        self.require_host(&session, participant_id, "begin swiping")?;
        self.advance(&session, SessionStatus::Swiping, Some(1), "begin swiping")
            .await?;
        info!("Session {id} entered round 1 swiping");
        Ok(build_snapshot(&self.store.get(id).await?))
    }

    /// Record one decision; idempotent under retries. `decided_at_ms` is the
    /// client-measured time from card shown to decision made; on a replayed
    /// submission the store keeps the originally recorded value.
    pub async fn submit_swipe(
        &self,
        id: SessionId,
        participant_id: &ParticipantId,
        candidate_id: &CandidateId,
        decision: Decision,
        round: u8,
        decided_at_ms: u64,
    ) -> EngineResult<SessionSnapshot> {
        let session = self.store.get(id).await?;
        self.require_member(&session, participant_id)?;

        if session.status != SessionStatus::Swiping {
            return Err(EngineError::NotAcceptingSwipes {
                status: session.status,
            });
        }
        if round != session.round {
            return Err(EngineError::StaleRound {
                submitted: round,
                current: session.round,
            });
        }
        let deck = rounds::deck_for_round(&session.pool, session.limits, session.round);
        if !deck.iter().any(|c| &c.id == candidate_id) {
            return Err(EngineError::UnknownCandidate {
                candidate_id: candidate_id.to_string(),
            });
        }
        if decision == Decision::Superlike {
            let already_superliked = session
                .swipe(participant_id, candidate_id, round)
                .map(|s| s.decision == Decision::Superlike)
                .unwrap_or(false);
            if !already_superliked
                && session.superlike_count(participant_id, round)
                    >= self.config.superlike_budget as usize
            {
                return Err(EngineError::SuperlikeBudgetExhausted {
                    budget: self.config.superlike_budget,
                });
            }
        }

        let updated = self
            .store
            .upsert_swipe(
                id,
                SwipeRecord {
                    participant_id: participant_id.clone(),
                    candidate_id: candidate_id.clone(),
                    round,
                    decision,
                    decided_at_ms,
                },
            )
            .await?;

        if decision == Decision::Superlike {
            self.try_superlike_short_circuit(&updated, participant_id, candidate_id)
                .await?;
        }

        let reconciled = self.reconcile(self.store.get(id).await?).await?;
        Ok(build_snapshot(&reconciled))
    }

    /// The polling read: reconcile whatever the predicate allows, then
    /// return the full snapshot
    pub async fn snapshot(
        &self,
        id: SessionId,
        participant_id: &ParticipantId,
    ) -> EngineResult<SessionSnapshot> {
        let session = self.store.get(id).await?;
        self.require_member(&session, participant_id)?;
        let reconciled = self.reconcile(session).await?;
        Ok(build_snapshot(&reconciled))
    }

    /// Group mode: promote the top-ranked candidates to finalists and open
    /// the final vote. Idempotent: a second caller observes the stored list.
    pub async fn compute_finalists(
        &self,
        id: SessionId,
        participant_id: &ParticipantId,
    ) -> EngineResult<SessionSnapshot> {
        let session = self.reconcile(self.store.get(id).await?).await?;
        self.require_member(&session, participant_id)?;

        match session.status {
            SessionStatus::FinalistComputation => {}
            // A racing poller already advanced the session; converge quietly.
            SessionStatus::FinalVoting => return Ok(build_snapshot(&session)),
            from => {
                return Err(EngineError::InvalidTransition {
                    from,
                    action: "compute finalists".to_string(),
                });
            }
        }

        let mut finalists = consensus::compute_finalists(&session.swipes, session.round);
        if finalists.is_empty() {
            // Nobody liked anything: vote over the head of the deck rather
            // than failing the session.
            let deck = rounds::deck_for_round(&session.pool, session.limits, session.round);
            finalists = deck
                .iter()
                .take(consensus::TOP_MATCHES)
                .map(|c| c.id.clone())
                .collect();
        }
        let stored = self.store.set_finalists_if_absent(id, finalists).await?;
        self.store
            .transition_status(
                id,
                &[SessionStatus::FinalistComputation],
                SessionStatus::FinalVoting,
                None,
            )
            .await?;
        info!("Session {id} finalists computed: {stored:?}");
        Ok(build_snapshot(&self.store.get(id).await?))
    }

    /// Cast one immutable final vote for a finalist
    pub async fn cast_final_vote(
        &self,
        id: SessionId,
        participant_id: &ParticipantId,
        candidate_id: &CandidateId,
    ) -> EngineResult<SessionSnapshot> {
        let session = self.store.get(id).await?;
        self.require_member(&session, participant_id)?;

        if session.status != SessionStatus::FinalVoting {
            return Err(EngineError::InvalidTransition {
                from: session.status,
                action: "cast final vote".to_string(),
            });
        }
        let is_finalist = session
            .finalists
            .as_deref()
            .map(|f| f.contains(candidate_id))
            .unwrap_or(false);
        if !is_finalist {
            return Err(EngineError::UnknownCandidate {
                candidate_id: candidate_id.to_string(),
            });
        }

        let updated = self
            .store
            .cast_final_vote_if_absent(id, participant_id.clone(), candidate_id.clone())
            .await?;
        let reconciled = self.reconcile(updated).await?;
        Ok(build_snapshot(&reconciled))
    }

    /// Close the vote: requires every participant to have voted
    pub async fn finalize(
        &self,
        id: SessionId,
        participant_id: &ParticipantId,
    ) -> EngineResult<SessionSnapshot> {
        let session = self.reconcile(self.store.get(id).await?).await?;
        self.require_member(&session, participant_id)?;

        if session.status == SessionStatus::Completed {
            return Ok(build_snapshot(&session));
        }
        if session.status != SessionStatus::FinalVoting {
            return Err(EngineError::InvalidTransition {
                from: session.status,
                action: "finalize".to_string(),
            });
        }
        if session.final_votes.len() < session.participants.len() {
            return Err(EngineError::InvalidTransition {
                from: session.status,
                action: "finalize before all votes are cast".to_string(),
            });
        }

        let finalists = session.finalists.clone().unwrap_or_default();
        if let Some(winner) = consensus::tally_votes(&session.final_votes, &finalists) {
            self.store.set_final_winner_if_absent(id, winner).await?;
        }
        self.store
            .transition_status(
                id,
                &[SessionStatus::FinalVoting],
                SessionStatus::Completed,
                None,
            )
            .await?;
        let done = self.store.get(id).await?;
        info!("Session {id} completed, winner: {:?}", done.final_winner);
        Ok(build_snapshot(&done))
    }

    /// Host-only cancellation; always safe from any non-terminal state
    pub async fn cancel(
        &self,
        id: SessionId,
        participant_id: &ParticipantId,
    ) -> EngineResult<SessionSnapshot> {
        let session = self.store.get(id).await?;
        self.require_host(&session, participant_id, "cancel session")?;
        self.advance(&session, SessionStatus::Cancelled, None, "cancel session")
            .await?;
        info!("Session {id} cancelled");
        Ok(build_snapshot(&self.store.get(id).await?))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn require_member(&self, session: &Session, id: &ParticipantId) -> EngineResult<()> {
        if session.is_member(id) {
            Ok(())
        } else {
            Err(EngineError::UnknownParticipant {
                participant_id: id.to_string(),
            })
        }
    }

    fn require_host(
        &self,
        session: &Session,
        id: &ParticipantId,
        action: &str,
    ) -> EngineResult<()> {
        self.require_member(session, id)?;
        if session.is_host(id) {
            Ok(())
        } else {
            Err(EngineError::Unauthorized {
                participant_id: id.to_string(),
                action: action.to_string(),
            })
        }
    }

    /// Guarded transition: validate against the fetched status, CAS in the
    /// store, and accept a racing caller having landed the same target.
    async fn advance(
        &self,
        session: &Session,
        to: SessionStatus,
        round: Option<u8>,
        action: &str,
    ) -> EngineResult<()> {
        lifecycle::guard(session.mode, session.status, to, action)?;
        let advanced = self
            .store
            .transition_status(session.id, &[session.status], to, round)
            .await?;
        if !advanced {
            let current = self.store.get(session.id).await?;
            if current.status != to {
                return Err(EngineError::InvalidTransition {
                    from: current.status,
                    action: action.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Double-superlike fast path: the only point where a round can end
    /// before all participants finish.
    async fn try_superlike_short_circuit(
        &self,
        session: &Session,
        participant_id: &ParticipantId,
        candidate_id: &CandidateId,
    ) -> EngineResult<()> {
        let matched = session.swipes.iter().any(|s| {
            &s.participant_id != participant_id
                && &s.candidate_id == candidate_id
                && s.round == session.round
                && s.decision == Decision::Superlike
        });
        if !matched {
            return Ok(());
        }

        info!(
            "Session {} double-superlike on {candidate_id}, short-circuiting round {}",
            session.id, session.round
        );
        match session.mode {
            SessionMode::Pair => {
                let result = RoundResult {
                    round: session.round,
                    matches: vec![candidate_id.clone()],
                    winner: Some(candidate_id.clone()),
                    compromise: None,
                };
                self.store
                    .write_round_result_if_absent(session.id, result)
                    .await?;
                let target = if session.round >= 2 {
                    SessionStatus::Winner
                } else {
                    SessionStatus::Results
                };
                self.store
                    .transition_status(session.id, &[SessionStatus::Swiping], target, None)
                    .await?;
            }
            SessionMode::Group => {
                self.store
                    .set_final_winner_if_absent(session.id, candidate_id.clone())
                    .await?;
                self.store
                    .transition_status(
                        session.id,
                        &[SessionStatus::Swiping],
                        SessionStatus::Completed,
                        None,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Advance whatever the stored swipes allow. Runs on every poll and
    /// every swipe; all effects are write-if-absent or CAS, so redundant
    /// concurrent passes converge.
    async fn reconcile(&self, mut session: Session) -> EngineResult<Session> {
        if session.demo {
            session = self.drive_bot(session).await?;
        }

        match session.status {
            SessionStatus::Swiping if rounds::round_complete(&session) => {
                match session.mode {
                    SessionMode::Pair => self.conclude_pair_round(&session).await?,
                    SessionMode::Group => {
                        self.store
                            .transition_status(
                                session.id,
                                &[SessionStatus::Swiping],
                                SessionStatus::FinalistComputation,
                                None,
                            )
                            .await?;
                        debug!("Session {} ready for finalist computation", session.id);
                    }
                }
            }
            // Escalation to round 2 happens on the next observation, so
            // clients see the no_match status for at least one poll cycle.
            SessionStatus::NoMatch => {
                self.store
                    .transition_status(
                        session.id,
                        &[SessionStatus::NoMatch],
                        SessionStatus::Swiping,
                        Some(2),
                    )
                    .await?;
                info!("Session {} escalated to round 2", session.id);
            }
            _ => {}
        }

        self.store.get(session.id).await
    }

    async fn conclude_pair_round(&self, session: &Session) -> EngineResult<()> {
        let participants: Vec<ParticipantId> =
            session.participants.iter().map(|p| p.id.clone()).collect();
        let round = session.round;
        let must_conclude = round >= 2;

        let round2_deck_empty = must_conclude
            && rounds::deck_for_round(&session.pool, session.limits, 2).is_empty();
        let mut result = if round2_deck_empty {
            // Pool exhausted before round 2 could show anything: promote the
            // round-1 compromise rather than finishing winnerless.
            let carried = session.round_result(1).and_then(|r| r.compromise.clone());
            RoundResult {
                round,
                matches: Vec::new(),
                winner: carried.clone(),
                compromise: carried,
            }
        } else {
            consensus::compute_round_result(
                &participants,
                &session.host_id,
                &session.swipes,
                round,
                must_conclude,
            )
        };

        // A concluding round always names a winner. With no likes and no
        // neutrals anywhere the compromise pick is empty, so degrade further:
        // the round-1 compromise, then the head of the current deck, then the
        // head of the pool.
        if must_conclude && result.winner.is_none() {
            let fallback = session
                .round_result(1)
                .and_then(|r| r.compromise.clone())
                .or_else(|| {
                    rounds::deck_for_round(&session.pool, session.limits, round)
                        .first()
                        .map(|c| c.id.clone())
                })
                .or_else(|| session.pool.first().map(|c| c.id.clone()));
            result.winner = fallback.clone();
            result.compromise = result.compromise.take().or(fallback);
        }

        let stored = self
            .store
            .write_round_result_if_absent(session.id, result)
            .await?;
        let target = if must_conclude {
            SessionStatus::Winner
        } else if stored.winner.is_some() {
            SessionStatus::Results
        } else {
            SessionStatus::NoMatch
        };
        self.store
            .transition_status(session.id, &[SessionStatus::Swiping], target, None)
            .await?;
        info!(
            "Session {} round {round} concluded: {target} (winner: {:?})",
            session.id, stored.winner
        );
        Ok(())
    }

    /// Let the demo partner catch up through the ordinary ingestion path
    async fn drive_bot(&self, mut session: Session) -> EngineResult<Session> {
        match session.status {
            SessionStatus::Swiping => {
                for swipe in bot::pending_swipes(&session) {
                    session = self.store.upsert_swipe(session.id, swipe).await?;
                }
                Ok(session)
            }
            SessionStatus::FinalVoting => {
                let bot_id = bot::bot_id(session.id);
                if !session.final_votes.contains_key(&bot_id) {
                    if let Some(finalists) = session.finalists.as_deref() {
                        if let Some(pick) = finalists.first() {
                            session = self
                                .store
                                .cast_final_vote_if_absent(session.id, bot_id, pick.clone())
                                .await?;
                        }
                    }
                }
                Ok(session)
            }
            _ => Ok(session),
        }
    }
}

/// Project the stored record into the client-facing snapshot
fn build_snapshot(session: &Session) -> SessionSnapshot {
    let deck = rounds::deck_for_round(&session.pool, session.limits, session.round).to_vec();
    let swipe_counts = session
        .participants
        .iter()
        .map(|p| (p.id.clone(), session.swipe_count(&p.id, session.round)))
        .collect();

    SessionSnapshot {
        session_id: session.id,
        join_code: session.join_code.clone(),
        mode: session.mode,
        status: session.status,
        round: session.round,
        min_participants: session.min_participants,
        participants: session.participants.clone(),
        deck,
        pool_size: session.pool.len(),
        swipe_counts,
        round_results: session.round_results.clone(),
        finalists: session.finalists.clone(),
        votes_cast: session.final_votes.len(),
        winner: session.winner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockSessionStore;
    use mockall::Sequence;

    fn params() -> CreateSessionParams {
        CreateSessionParams {
            mode: SessionMode::Pair,
            host: NewParticipant {
                id: ParticipantId::new("host"),
                display_name: "Host".to_string(),
            },
            pool: vec![Candidate::new("c1"), Candidate::new("c2")],
            min_participants: None,
            round1_limit: None,
            round2_limit: None,
            demo: false,
        }
    }

    #[tokio::test]
    async fn create_session_retries_colliding_join_codes() {
        let mut store = MockSessionStore::new();
        let mut seq = Sequence::new();
        store
            .expect_join_code_active()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        store
            .expect_join_code_active()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));
        store.expect_create().times(1).returning(|_| Ok(()));

        let engine = SessionEngine::new(store);
        let snapshot = engine.create_session(params()).await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Lobby);
        assert_eq!(snapshot.join_code.len(), join_code::CODE_LEN);
    }

    #[tokio::test]
    async fn create_session_survives_a_lost_join_code_race() {
        // The availability check can pass and the insert still lose to a
        // concurrent creator. The engine retries with a fresh code.
        let mut store = MockSessionStore::new();
        let mut seq = Sequence::new();
        store.expect_join_code_active().returning(|_| Ok(false));
        store
            .expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|session| {
                Err(EngineError::JoinCodeTaken {
                    code: session.join_code,
                })
            });
        store
            .expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let engine = SessionEngine::new(store);
        let snapshot = engine.create_session(params()).await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Lobby);
    }

    #[tokio::test]
    async fn create_session_gives_up_after_bounded_retries() {
        let mut store = MockSessionStore::new();
        store.expect_join_code_active().returning(|_| Ok(true));
        store.expect_create().never();

        let engine = SessionEngine::new(store);
        let err = engine.create_session(params()).await.unwrap_err();
        assert_eq!(err, EngineError::JoinCodeExhausted { attempts: 16 });
    }

    #[tokio::test]
    async fn pair_min_participant_count_is_fixed_at_two() {
        let mut store = MockSessionStore::new();
        store.expect_join_code_active().returning(|_| Ok(false));
        store
            .expect_create()
            .withf(|session| session.min_participants == 2)
            .times(1)
            .returning(|_| Ok(()));

        let engine = SessionEngine::new(store);
        let mut p = params();
        p.min_participants = Some(5);
        engine.create_session(p).await.unwrap();
    }
}
