//! Store trait definition for dependency injection
//!
//! The engine is a stateless request handler over a durable keyed store; any
//! store that offers atomic field-scoped read/modify/write and write-if-absent
//! semantics will do. All multi-writer operations are shaped so that two
//! pollers racing to finalize the same computation converge without
//! corruption.

use async_trait::async_trait;
use shared::{CandidateId, Participant, ParticipantId, RoundResult, SessionId, SessionStatus, SwipeRecord};

use crate::error::EngineResult;
use crate::session::Session;

/// Durable, keyed session persistence
#[mockall::automock]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a freshly created session record. Fails with
    /// [`crate::error::EngineError::JoinCodeTaken`] if the join code already belongs to a
    /// live session.
    async fn create(&self, session: Session) -> EngineResult<()>;

    /// Fetch a session; `SessionNotFound` if the id is unknown or expired
    async fn get(&self, id: SessionId) -> EngineResult<Session>;

    /// Look a session up by join code
    async fn find_by_join_code(&self, code: &str) -> EngineResult<Session>;

    /// Whether a join code currently maps to an active session
    async fn join_code_active(&self, code: &str) -> EngineResult<bool>;

    /// Append a participant unless one with the same id already exists.
    /// Idempotent: a duplicate join returns the unchanged session.
    async fn append_participant(
        &self,
        id: SessionId,
        participant: Participant,
    ) -> EngineResult<Session>;

    /// Record a swipe. One logical record per (participant, candidate, round):
    /// a later write may overwrite the decision but `decided_at_ms` keeps its
    /// first value, and resubmitting the identical decision is a no-op.
    async fn upsert_swipe(&self, id: SessionId, swipe: SwipeRecord) -> EngineResult<Session>;

    /// Store a round result unless one for that round exists; returns the
    /// stored result either way so redundant computations converge.
    async fn write_round_result_if_absent(
        &self,
        id: SessionId,
        result: RoundResult,
    ) -> EngineResult<RoundResult>;

    /// Store the finalist list once; returns the stored list either way
    async fn set_finalists_if_absent(
        &self,
        id: SessionId,
        finalists: Vec<CandidateId>,
    ) -> EngineResult<Vec<CandidateId>>;

    /// Record a final vote. Immutable once cast: an identical resubmission is
    /// a no-op, a conflicting one fails with `AlreadyVoted`.
    async fn cast_final_vote_if_absent(
        &self,
        id: SessionId,
        participant_id: ParticipantId,
        candidate_id: CandidateId,
    ) -> EngineResult<Session>;

    /// Store the final winner once; returns the stored winner either way
    async fn set_final_winner_if_absent(
        &self,
        id: SessionId,
        winner: CandidateId,
    ) -> EngineResult<CandidateId>;

    /// Compare-and-set the session status, optionally bumping the round.
    /// Returns `false` (with no side effect) when the current status is not
    /// in `from` — the loser of a transition race simply observes `false`.
    async fn transition_status(
        &self,
        id: SessionId,
        from: &[SessionStatus],
        to: SessionStatus,
        round: Option<u8>,
    ) -> EngineResult<bool>;
}
