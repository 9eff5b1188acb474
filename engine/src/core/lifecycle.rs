//! Session status state machine
//!
//! Transitions form a strict DAG per mode; anything else is rejected with
//! `InvalidTransition` and has no side effect. `Cancelled` is reachable from
//! every non-terminal state.

use crate::error::{EngineError, EngineResult};
use shared::{SessionMode, SessionStatus};

/// Whether `from → to` is a legal transition for the given mode
pub fn allowed(mode: SessionMode, from: SessionStatus, to: SessionStatus) -> bool {
    use SessionStatus::*;

    if to == Cancelled {
        return !from.is_terminal();
    }

    match mode {
        SessionMode::Pair => matches!(
            (from, to),
            (Lobby, PoolReady)
                | (PoolReady, Swiping)
                | (Swiping, Results)
                | (Swiping, NoMatch)
                | (Swiping, Winner)
                | (NoMatch, Swiping)
        ),
        SessionMode::Group => matches!(
            (from, to),
            (Lobby, PoolReady)
                | (PoolReady, Swiping)
                | (Swiping, FinalistComputation)
                | (Swiping, Completed)
                | (FinalistComputation, FinalVoting)
                | (FinalVoting, Completed)
        ),
    }
}

/// Validate a transition, naming the attempted action in the error
pub fn guard(
    mode: SessionMode,
    from: SessionStatus,
    to: SessionStatus,
    action: &str,
) -> EngineResult<()> {
    if allowed(mode, from, to) {
        Ok(())
    } else {
        Err(EngineError::InvalidTransition {
            from,
            action: action.to_string(),
        })
    }
}
