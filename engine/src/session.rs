//! The stored session record
//!
//! Single source of truth for one matching attempt, owned exclusively by the
//! engine. Wire-facing views are built from it in `SessionEngine::snapshot`.

use chrono::{DateTime, Utc};
use shared::{
    Candidate, CandidateId, Participant, ParticipantId, RoundResult, SessionId, SessionMode,
    SessionStatus, SwipeRecord,
};
use std::collections::HashMap;

/// Per-round swipe limits. Round 2 runs over a disjoint suffix of the pool
/// with a smaller limit than round 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RoundLimits {
    pub round1: usize,
    pub round2: usize,
}

impl Default for RoundLimits {
    fn default() -> Self {
        Self {
            round1: 10,
            round2: 5,
        }
    }
}

/// Durable session record as held by the [`SessionStore`](crate::traits::SessionStore)
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub join_code: String,
    pub mode: SessionMode,
    pub status: SessionStatus,
    pub round: u8,
    pub min_participants: usize,
    pub host_id: ParticipantId,
    /// Ordered candidate pool from the pool supplier
    pub pool: Vec<Candidate>,
    pub limits: RoundLimits,
    pub participants: Vec<Participant>,
    pub swipes: Vec<SwipeRecord>,
    pub round_results: Vec<RoundResult>,
    pub finalists: Option<Vec<CandidateId>>,
    pub final_votes: HashMap<ParticipantId, CandidateId>,
    pub final_winner: Option<CandidateId>,
    /// Session includes a synthetic demo partner
    pub demo: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn is_member(&self, id: &ParticipantId) -> bool {
        self.participant(id).is_some()
    }

    pub fn is_host(&self, id: &ParticipantId) -> bool {
        &self.host_id == id
    }

    pub fn swipe(
        &self,
        participant_id: &ParticipantId,
        candidate_id: &CandidateId,
        round: u8,
    ) -> Option<&SwipeRecord> {
        self.swipes.iter().find(|s| {
            &s.participant_id == participant_id && &s.candidate_id == candidate_id && s.round == round
        })
    }

    pub fn swipe_count(&self, participant_id: &ParticipantId, round: u8) -> usize {
        self.swipes
            .iter()
            .filter(|s| &s.participant_id == participant_id && s.round == round)
            .count()
    }

    pub fn superlike_count(&self, participant_id: &ParticipantId, round: u8) -> usize {
        self.swipes
            .iter()
            .filter(|s| {
                &s.participant_id == participant_id
                    && s.round == round
                    && s.decision == shared::Decision::Superlike
            })
            .count()
    }

    pub fn round_result(&self, round: u8) -> Option<&RoundResult> {
        self.round_results.iter().find(|r| r.round == round)
    }

    /// The session-level winner, whichever path produced it
    pub fn winner(&self) -> Option<CandidateId> {
        self.final_winner.clone().or_else(|| {
            self.round_results
                .iter()
                .rev()
                .find_map(|r| r.winner.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Decision;

    fn base_session() -> Session {
        Session {
            id: SessionId::new(),
            join_code: "ABC234".to_string(),
            mode: SessionMode::Pair,
            status: SessionStatus::Swiping,
            round: 1,
            min_participants: 2,
            host_id: ParticipantId::new("p1"),
            pool: vec![Candidate::new("c1"), Candidate::new("c2")],
            limits: RoundLimits::default(),
            participants: vec![],
            swipes: vec![],
            round_results: vec![],
            finalists: None,
            final_votes: HashMap::new(),
            final_winner: None,
            demo: false,
            created_at: Utc::now(),
            last_activity: Utc::now(),
        }
    }

    #[test]
    fn swipe_lookup_is_scoped_by_round() {
        let mut session = base_session();
        session.swipes.push(SwipeRecord {
            participant_id: ParticipantId::new("p1"),
            candidate_id: CandidateId::new("c1"),
            round: 1,
            decision: Decision::Like,
            decided_at_ms: 800,
        });

        let p1 = ParticipantId::new("p1");
        let c1 = CandidateId::new("c1");
        assert!(session.swipe(&p1, &c1, 1).is_some());
        assert!(session.swipe(&p1, &c1, 2).is_none());
        assert_eq!(session.swipe_count(&p1, 1), 1);
        assert_eq!(session.swipe_count(&p1, 2), 0);
    }

    #[test]
    fn winner_prefers_final_winner() {
        let mut session = base_session();
        session.round_results.push(RoundResult {
            round: 1,
            matches: vec![CandidateId::new("c1")],
            winner: Some(CandidateId::new("c1")),
            compromise: None,
        });
        assert_eq!(session.winner(), Some(CandidateId::new("c1")));

        session.final_winner = Some(CandidateId::new("c2"));
        assert_eq!(session.winner(), Some(CandidateId::new("c2")));
    }
}
