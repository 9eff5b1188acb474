//! In-memory session store
//!
//! Reference implementation of [`SessionStore`] over `tokio::sync::RwLock`
//! maps. Any durable keyed store with the same write-if-absent semantics can
//! replace it; persistence choice is deliberately out of scope.
//!
//! Abandonment policy: a session whose `last_activity` is older than the
//! configured TTL is dropped on access and reported `SessionNotFound`, which
//! matches the store contract ("unknown or expired"). Every mutating
//! operation refreshes `last_activity`.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use shared::{
    CandidateId, Participant, ParticipantId, RoundResult, SessionId, SessionStatus, SwipeRecord,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{EngineError, EngineResult};
use crate::session::Session;
use crate::traits::SessionStore;

/// Default session TTL measured from last activity
pub const DEFAULT_TTL_SECS: i64 = 2 * 60 * 60;

pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    /// Join code → session id, maintained for active sessions only
    codes: RwLock<HashMap<String, SessionId>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_ttl_secs(DEFAULT_TTL_SECS)
    }

    pub fn with_ttl_secs(ttl_secs: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            codes: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    fn is_expired(&self, session: &Session) -> bool {
        Utc::now() - session.last_activity > self.ttl
    }

    fn not_found(id: SessionId) -> EngineError {
        EngineError::SessionNotFound { id: id.to_string() }
    }

    async fn evict(&self, id: SessionId) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.remove(&id) {
            self.codes.write().await.remove(&session.join_code);
            tracing::debug!("Evicted expired session {id}");
        }
    }

    /// Run a mutation against a live session, refreshing its activity stamp.
    /// Expired entries are evicted on the way and reported as not found.
    async fn with_session_mut<T>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut Session) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&id) else {
            return Err(Self::not_found(id));
        };
        if self.is_expired(session) {
            if let Some(session) = sessions.remove(&id) {
                self.codes.write().await.remove(&session.join_code);
                tracing::debug!("Evicted expired session {id}");
            }
            return Err(Self::not_found(id));
        }
        let value = f(session)?;
        session.last_activity = Utc::now();
        Ok(value)
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: Session) -> EngineResult<()> {
        let mut sessions = self.sessions.write().await;
        let mut codes = self.codes.write().await;
        // The code check and the insert happen under one write lock, so two
        // creators racing on the same code cannot both win.
        if let Some(holder) = codes.get(&session.join_code).copied() {
            match sessions.get(&holder) {
                Some(existing) if !self.is_expired(existing) => {
                    return Err(EngineError::JoinCodeTaken {
                        code: session.join_code.clone(),
                    });
                }
                _ => {
                    sessions.remove(&holder);
                }
            }
        }
        codes.insert(session.join_code.clone(), session.id);
        sessions.insert(session.id, session);
        Ok(())
    }

    async fn get(&self, id: SessionId) -> EngineResult<Session> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&id) {
                Some(session) if !self.is_expired(session) => return Ok(session.clone()),
                Some(_) => {}
                None => return Err(Self::not_found(id)),
            }
        }
        self.evict(id).await;
        Err(Self::not_found(id))
    }

    async fn find_by_join_code(&self, code: &str) -> EngineResult<Session> {
        let id = {
            let codes = self.codes.read().await;
            codes.get(code).copied()
        };
        match id {
            Some(id) => self.get(id).await,
            None => Err(EngineError::SessionNotFound {
                id: code.to_string(),
            }),
        }
    }

    async fn join_code_active(&self, code: &str) -> EngineResult<bool> {
        Ok(self.find_by_join_code(code).await.is_ok())
    }

    async fn append_participant(
        &self,
        id: SessionId,
        participant: Participant,
    ) -> EngineResult<Session> {
        self.with_session_mut(id, |session| {
            if !session.is_member(&participant.id) {
                session.participants.push(participant);
            }
            Ok(session.clone())
        })
        .await
    }

    async fn upsert_swipe(&self, id: SessionId, swipe: SwipeRecord) -> EngineResult<Session> {
        self.with_session_mut(id, |session| {
            let existing = session.swipes.iter_mut().find(|s| {
                s.participant_id == swipe.participant_id
                    && s.candidate_id == swipe.candidate_id
                    && s.round == swipe.round
            });
            match existing {
                // decided_at_ms is fixed at first arrival; only the decision
                // field may change on a later write.
                Some(record) => record.decision = swipe.decision,
                None => session.swipes.push(swipe),
            }
            Ok(session.clone())
        })
        .await
    }

    async fn write_round_result_if_absent(
        &self,
        id: SessionId,
        result: RoundResult,
    ) -> EngineResult<RoundResult> {
        self.with_session_mut(id, |session| {
            if let Some(existing) = session.round_result(result.round) {
                return Ok(existing.clone());
            }
            session.round_results.push(result.clone());
            Ok(result)
        })
        .await
    }

    async fn set_finalists_if_absent(
        &self,
        id: SessionId,
        finalists: Vec<CandidateId>,
    ) -> EngineResult<Vec<CandidateId>> {
        self.with_session_mut(id, |session| {
            if let Some(existing) = &session.finalists {
                return Ok(existing.clone());
            }
            session.finalists = Some(finalists.clone());
            Ok(finalists)
        })
        .await
    }

    async fn cast_final_vote_if_absent(
        &self,
        id: SessionId,
        participant_id: ParticipantId,
        candidate_id: CandidateId,
    ) -> EngineResult<Session> {
        self.with_session_mut(id, |session| {
            match session.final_votes.get(&participant_id) {
                Some(existing) if existing == &candidate_id => {}
                Some(_) => {
                    return Err(EngineError::AlreadyVoted {
                        participant_id: participant_id.to_string(),
                    });
                }
                None => {
                    session.final_votes.insert(participant_id, candidate_id);
                }
            }
            Ok(session.clone())
        })
        .await
    }

    async fn set_final_winner_if_absent(
        &self,
        id: SessionId,
        winner: CandidateId,
    ) -> EngineResult<CandidateId> {
        self.with_session_mut(id, |session| {
            if let Some(existing) = &session.final_winner {
                return Ok(existing.clone());
            }
            session.final_winner = Some(winner.clone());
            Ok(winner)
        })
        .await
    }

    async fn transition_status(
        &self,
        id: SessionId,
        from: &[SessionStatus],
        to: SessionStatus,
        round: Option<u8>,
    ) -> EngineResult<bool> {
        let (advanced, freed_code) = self
            .with_session_mut(id, |session| {
                if !from.contains(&session.status) {
                    return Ok((false, None));
                }
                session.status = to;
                if let Some(round) = round {
                    session.round = round;
                }
                // Join codes only need to be unique among active sessions;
                // terminal sessions release theirs for reuse.
                let freed = to.is_terminal().then(|| session.join_code.clone());
                Ok((true, freed))
            })
            .await?;

        if let Some(code) = freed_code {
            self.codes.write().await.remove(&code);
        }
        Ok(advanced)
    }
}
