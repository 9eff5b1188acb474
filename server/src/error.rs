//! Server-specific error types and their HTTP projection

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use engine::EngineError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Server startup error: {0}")]
    Startup(String),

    #[error("Invalid request format: {details}")]
    InvalidRequest { details: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Stable machine-readable code for each error shape
fn error_code(err: &ServerError) -> &'static str {
    match err {
        ServerError::Engine(e) => match e {
            EngineError::SessionNotFound { .. } => "session_not_found",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::NotAcceptingSwipes { .. } => "not_accepting_swipes",
            EngineError::StaleRound { .. } => "stale_round",
            EngineError::UnknownCandidate { .. } => "unknown_candidate",
            EngineError::UnknownParticipant { .. } => "unknown_participant",
            EngineError::AlreadyVoted { .. } => "already_voted",
            EngineError::NotEnoughParticipants { .. } => "not_enough_participants",
            EngineError::Unauthorized { .. } => "unauthorized",
            EngineError::SessionFull { .. } => "session_full",
            EngineError::SuperlikeBudgetExhausted { .. } => "superlike_budget_exhausted",
            EngineError::JoinCodeTaken { .. } | EngineError::JoinCodeExhausted { .. } => {
                "internal_error"
            }
        },
        ServerError::Startup(_) => "internal_error",
        ServerError::InvalidRequest { .. } => "invalid_request",
        ServerError::Io(_) => "internal_error",
    }
}

fn status_of(err: &ServerError) -> StatusCode {
    match err {
        ServerError::Engine(e) => match e {
            EngineError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            EngineError::UnknownCandidate { .. } | EngineError::UnknownParticipant { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            EngineError::InvalidTransition { .. }
            | EngineError::NotAcceptingSwipes { .. }
            | EngineError::StaleRound { .. }
            | EngineError::AlreadyVoted { .. }
            | EngineError::NotEnoughParticipants { .. }
            | EngineError::SessionFull { .. }
            | EngineError::SuperlikeBudgetExhausted { .. } => StatusCode::CONFLICT,
            EngineError::JoinCodeTaken { .. } | EngineError::JoinCodeExhausted { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        ServerError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        ServerError::Startup(_) | ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = status_of(&self);
        let body = Json(json!({
            "error": error_code(&self),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
