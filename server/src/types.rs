//! Request and response payloads for the HTTP API
//!
//! Every mutating endpoint carries the acting participant id in the body;
//! there is no session affinity or auth token, identity is claimed by the
//! client and scoped to one session.

use serde::{Deserialize, Serialize};
use shared::{Candidate, CandidateId, Decision, ParticipantId, SessionId, SessionMode};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub mode: SessionMode,
    pub participant_id: ParticipantId,
    pub display_name: String,
    /// Ordered candidate pool supplied by the client-side pool builder
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub min_participants: Option<usize>,
    #[serde(default)]
    pub round1_limit: Option<usize>,
    #[serde(default)]
    pub round2_limit: Option<usize>,
    /// Attach the synthetic demo partner
    #[serde(default)]
    pub demo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinSessionRequest {
    pub join_code: String,
    pub participant_id: ParticipantId,
    pub display_name: String,
}

/// Body shared by the plain session-scoped actions (start, begin,
/// compute-finalists, finalize, cancel)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionActionRequest {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeRequest {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
    pub candidate_id: CandidateId,
    pub round: u8,
    pub decision: Decision,
    /// Client-measured milliseconds from card shown to decision made
    pub decided_at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalVoteRequest {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
    pub candidate_id: CandidateId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotQuery {
    pub participant_id: ParticipantId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default = "default_true")]
    pub healthy: bool,
    pub uptime_secs: u64,
}
