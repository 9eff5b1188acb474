//! Engine-specific error types
//!
//! Every variant is terminal: it is reported verbatim to the caller and never
//! retried server-side. Clients retry transient transport failures instead and
//! re-poll the snapshot, which is always safe.

use shared::SessionStatus;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Session not found or expired: {id}")]
    SessionNotFound { id: String },

    #[error("Invalid transition from {from} while attempting {action}")]
    InvalidTransition { from: SessionStatus, action: String },

    #[error("Session is not accepting swipes in status {status}")]
    NotAcceptingSwipes { status: SessionStatus },

    #[error("Stale round: submitted {submitted}, session is in round {current}")]
    StaleRound { submitted: u8, current: u8 },

    #[error("Candidate not in the current deck: {candidate_id}")]
    UnknownCandidate { candidate_id: String },

    #[error("Participant has not joined this session: {participant_id}")]
    UnknownParticipant { participant_id: String },

    #[error("Participant already cast a final vote: {participant_id}")]
    AlreadyVoted { participant_id: String },

    #[error("Not enough participants: have {have}, need {need}")]
    NotEnoughParticipants { have: usize, need: usize },

    #[error("Participant {participant_id} is not allowed to {action}")]
    Unauthorized {
        participant_id: String,
        action: String,
    },

    #[error("Session already has its full complement of {capacity} participants")]
    SessionFull { capacity: usize },

    #[error("Superlike budget of {budget} per round exhausted")]
    SuperlikeBudgetExhausted { budget: u32 },

    #[error("Join code already in use: {code}")]
    JoinCodeTaken { code: String },

    #[error("Could not allocate a unique join code after {attempts} attempts")]
    JoinCodeExhausted { attempts: u32 },
}

pub type EngineResult<T> = Result<T, EngineError>;
