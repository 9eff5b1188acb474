//! Core types used throughout the consensus engine and its HTTP surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors shared across crates, mostly textual parsing of wire values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Unknown session mode: {0}")]
    UnknownMode(String),

    #[error("Unknown decision: {0}")]
    UnknownDecision(String),
}

/// Identifier for a session, generated server-side at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Stable per-device pseudo-identity supplied by the client.
///
/// Survives client reloads; the engine only requires uniqueness and
/// stability, not authentication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque comparable key identifying one watchable title in the pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A participant's decision on one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Like,
    Dislike,
    Neutral,
    Superlike,
}

impl Decision {
    /// Whether this decision counts toward the mutual/liked set
    pub fn is_positive(self) -> bool {
        matches!(self, Decision::Like | Decision::Superlike)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Like => write!(f, "like"),
            Decision::Dislike => write!(f, "dislike"),
            Decision::Neutral => write!(f, "neutral"),
            Decision::Superlike => write!(f, "superlike"),
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(Decision::Like),
            "dislike" => Ok(Decision::Dislike),
            "neutral" => Ok(Decision::Neutral),
            "superlike" => Ok(Decision::Superlike),
            _ => Err(SharedError::UnknownDecision(s.to_string())),
        }
    }
}

/// Session mode: the two client-observed variants of the same engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Pair,
    Group,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Pair => write!(f, "pair"),
            SessionMode::Group => write!(f, "group"),
        }
    }
}

impl std::str::FromStr for SessionMode {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pair" => Ok(SessionMode::Pair),
            "group" => Ok(SessionMode::Group),
            _ => Err(SharedError::UnknownMode(s.to_string())),
        }
    }
}

/// Session lifecycle status.
///
/// Pair path: `Lobby → PoolReady → Swiping(1) → Results`, or on a
/// no-overlap round `→ NoMatch → Swiping(2) → Winner`. Group path:
/// `Lobby → PoolReady → Swiping →
/// FinalistComputation → FinalVoting → Completed`. `Cancelled` is reachable
/// from any non-terminal state; transitions never go backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Lobby,
    PoolReady,
    Swiping,
    Results,
    NoMatch,
    Winner,
    FinalistComputation,
    FinalVoting,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Terminal sessions are immutable; every mutation is rejected
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Results
                | SessionStatus::Winner
                | SessionStatus::Completed
                | SessionStatus::Cancelled
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Lobby => "lobby",
            SessionStatus::PoolReady => "pool_ready",
            SessionStatus::Swiping => "swiping",
            SessionStatus::Results => "results",
            SessionStatus::NoMatch => "no_match",
            SessionStatus::Winner => "winner",
            SessionStatus::FinalistComputation => "finalist_computation",
            SessionStatus::FinalVoting => "final_voting",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// One watchable title in the session pool.
///
/// The engine treats the id as opaque; `metadata` is display data passed
/// through untouched from the candidate pool supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Candidate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: CandidateId::new(id),
            metadata: serde_json::Value::Null,
        }
    }
}

/// A session member. Created on join, never deleted; leaving is modeled as
/// inactivity, not removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub is_host: bool,
    pub joined_at: DateTime<Utc>,
}

/// One logical decision record per (participant, candidate, round).
///
/// `decided_at_ms` is the client-reported decision latency in milliseconds
/// from card presentation. It is fixed at first arrival: retries and decision
/// overwrites never shift it, so the latency-based tie-break is immune to
/// transport jitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipeRecord {
    pub participant_id: ParticipantId,
    pub candidate_id: CandidateId,
    pub round: u8,
    pub decision: Decision,
    pub decided_at_ms: u64,
}

/// Computed outcome of one round; cached write-once per round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round: u8,
    /// Ranked mutual candidates (top 3)
    pub matches: Vec<CandidateId>,
    pub winner: Option<CandidateId>,
    pub compromise: Option<CandidateId>,
}

/// Full state snapshot returned to a polling client.
///
/// This is the sole reconciliation mechanism: reads are idempotent and the
/// server never blocks, so a client may re-poll at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub join_code: String,
    pub mode: SessionMode,
    pub status: SessionStatus,
    pub round: u8,
    pub min_participants: usize,
    pub participants: Vec<Participant>,
    /// Candidates in the current round's deck
    pub deck: Vec<Candidate>,
    pub pool_size: usize,
    /// Swipe counts for the current round, keyed by participant
    pub swipe_counts: HashMap<ParticipantId, usize>,
    pub round_results: Vec<RoundResult>,
    pub finalists: Option<Vec<CandidateId>>,
    pub votes_cast: usize,
    pub winner: Option<CandidateId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_positivity() {
        assert!(Decision::Like.is_positive());
        assert!(Decision::Superlike.is_positive());
        assert!(!Decision::Dislike.is_positive());
        assert!(!Decision::Neutral.is_positive());
    }

    #[test]
    fn decision_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Decision::Superlike).unwrap(),
            "\"superlike\""
        );
        let parsed: Decision = serde_json::from_str("\"dislike\"").unwrap();
        assert_eq!(parsed, Decision::Dislike);
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::FinalVoting).unwrap(),
            "\"final_voting\""
        );
        assert_eq!(SessionStatus::NoMatch.to_string(), "no_match");
    }

    #[test]
    fn terminal_statuses() {
        assert!(SessionStatus::Results.is_terminal());
        assert!(SessionStatus::Winner.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::Swiping.is_terminal());
        assert!(!SessionStatus::NoMatch.is_terminal());
    }

    #[test]
    fn session_mode_round_trips_from_str() {
        assert_eq!("pair".parse::<SessionMode>().unwrap(), SessionMode::Pair);
        assert_eq!("GROUP".parse::<SessionMode>().unwrap(), SessionMode::Group);
        assert!("solo".parse::<SessionMode>().is_err());
    }
}
