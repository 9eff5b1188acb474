//! Match and consensus computation
//!
//! Every function here is a pure function of the stored swipes/votes, so
//! redundant recomputation by racing pollers always converges on the same
//! output. Persistence is the caller's job, via write-if-absent store ops.

use shared::{CandidateId, ParticipantId, RoundResult, SwipeRecord};
use std::collections::HashMap;

/// How many ranked matches / finalists a round surfaces
pub const TOP_MATCHES: usize = 3;

/// Positive decisions per participant for the round, with decision latency
fn liked_by_participant(
    swipes: &[SwipeRecord],
    round: u8,
) -> HashMap<&ParticipantId, HashMap<&CandidateId, u64>> {
    let mut liked: HashMap<&ParticipantId, HashMap<&CandidateId, u64>> = HashMap::new();
    for swipe in swipes {
        if swipe.round == round && swipe.decision.is_positive() {
            liked
                .entry(&swipe.participant_id)
                .or_default()
                .insert(&swipe.candidate_id, swipe.decided_at_ms);
        }
    }
    liked
}

/// Compute the result of one pairwise-style round.
///
/// `mutual` is the intersection of every participant's liked set, ranked by
/// ascending minimum decision latency (ties broken by candidate id so the
/// ranking is total). With no mutual candidate the compromise pick is the
/// liked candidate with the smallest latency, preferring the host's likes.
/// When `must_conclude` is set (round 2) the compromise is promoted to
/// winner, so round 2 never re-enters `no_match`.
pub fn compute_round_result(
    participants: &[ParticipantId],
    host: &ParticipantId,
    swipes: &[SwipeRecord],
    round: u8,
    must_conclude: bool,
) -> RoundResult {
    let liked = liked_by_participant(swipes, round);

    // Mutual set: candidates every participant liked.
    let empty = HashMap::new();
    let mut mutual: Vec<(u64, &CandidateId)> = Vec::new();
    if let Some(first) = participants.first() {
        let first_liked = liked.get(first).unwrap_or(&empty);
        'candidates: for (candidate, latency) in first_liked {
            let mut min_latency = *latency;
            for other in &participants[1..] {
                match liked.get(other).and_then(|set| set.get(candidate)) {
                    Some(other_latency) => min_latency = min_latency.min(*other_latency),
                    None => continue 'candidates,
                }
            }
            mutual.push((min_latency, candidate));
        }
    }

    if !mutual.is_empty() {
        mutual.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        let matches: Vec<CandidateId> = mutual
            .iter()
            .take(TOP_MATCHES)
            .map(|(_, c)| (*c).clone())
            .collect();
        let winner = matches.first().cloned();
        return RoundResult {
            round,
            matches,
            winner,
            compromise: None,
        };
    }

    let compromise = compromise_pick(host, &liked, swipes, round);
    RoundResult {
        round,
        matches: Vec::new(),
        winner: if must_conclude {
            compromise.clone()
        } else {
            None
        },
        compromise,
    }
}

/// Fallback candidate when no mutual like exists: the earliest-decided like,
/// from the host if the host liked anything, otherwise from anyone. If nobody
/// liked anything the earliest neutral decision stands in, and only a round
/// of pure dislikes produces no pick at all.
fn compromise_pick(
    host: &ParticipantId,
    liked: &HashMap<&ParticipantId, HashMap<&CandidateId, u64>>,
    swipes: &[SwipeRecord],
    round: u8,
) -> Option<CandidateId> {
    let earliest = |set: &HashMap<&CandidateId, u64>| -> Option<CandidateId> {
        set.iter()
            .min_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(c, _)| (*c).clone())
    };

    if let Some(host_liked) = liked.get(host) {
        if !host_liked.is_empty() {
            return earliest(host_liked);
        }
    }

    let mut all: HashMap<&CandidateId, u64> = HashMap::new();
    for set in liked.values() {
        for (candidate, latency) in set {
            all.entry(candidate)
                .and_modify(|l| *l = (*l).min(*latency))
                .or_insert(*latency);
        }
    }
    if !all.is_empty() {
        return earliest(&all);
    }

    // Pure-dislike rounds aside, neutral decisions still express tolerance.
    swipes
        .iter()
        .filter(|s| s.round == round && s.decision == shared::Decision::Neutral)
        .min_by(|a, b| {
            a.decided_at_ms
                .cmp(&b.decided_at_ms)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        })
        .map(|s| s.candidate_id.clone())
}

/// Group-mode finalist ranking: like/superlike count descending, then sum of
/// decision latencies ascending, then candidate id. Top three are promoted to
/// the final plurality vote.
pub fn compute_finalists(swipes: &[SwipeRecord], round: u8) -> Vec<CandidateId> {
    let mut stats: HashMap<&CandidateId, (usize, u64)> = HashMap::new();
    for swipe in swipes {
        if swipe.round == round && swipe.decision.is_positive() {
            let entry = stats.entry(&swipe.candidate_id).or_insert((0, 0));
            entry.0 += 1;
            // decided_at_ms is client-reported; cap the sum instead of
            // trusting it to stay within u64.
            entry.1 = entry.1.saturating_add(swipe.decided_at_ms);
        }
    }

    let mut ranked: Vec<(&CandidateId, usize, u64)> =
        stats.into_iter().map(|(c, (n, sum))| (c, n, sum)).collect();
    ranked.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| a.2.cmp(&b.2))
            .then_with(|| a.0.cmp(b.0))
    });
    ranked
        .into_iter()
        .take(TOP_MATCHES)
        .map(|(c, _, _)| c.clone())
        .collect()
}

/// Tally final votes over the finalists. Plurality wins; a vote tie goes to
/// the finalist that ranked higher in the finalist computation.
pub fn tally_votes(
    votes: &HashMap<ParticipantId, CandidateId>,
    finalists: &[CandidateId],
) -> Option<CandidateId> {
    let mut counts: HashMap<&CandidateId, usize> = HashMap::new();
    for candidate in votes.values() {
        *counts.entry(candidate).or_insert(0) += 1;
    }

    // max_by_key keeps the last maximum, so walk the ranking backwards to
    // make a vote tie land on the higher-ranked finalist.
    finalists
        .iter()
        .rev()
        .max_by_key(|finalist| counts.get(finalist).copied().unwrap_or(0))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Decision;

    fn swipe(p: &str, c: &str, round: u8, decision: Decision, ms: u64) -> SwipeRecord {
        SwipeRecord {
            participant_id: ParticipantId::new(p),
            candidate_id: CandidateId::new(c),
            round,
            decision,
            decided_at_ms: ms,
        }
    }

    fn pair() -> Vec<ParticipantId> {
        vec![ParticipantId::new("p1"), ParticipantId::new("p2")]
    }

    #[test]
    fn mutual_like_ranked_by_min_latency() {
        // Only candidate 2 is liked by both; it wins on p2's faster decision.
        let swipes = vec![
            swipe("p1", "1", 1, Decision::Like, 1000),
            swipe("p1", "2", 1, Decision::Like, 1500),
            swipe("p1", "3", 1, Decision::Dislike, 2000),
            swipe("p2", "2", 1, Decision::Like, 800),
            swipe("p2", "4", 1, Decision::Like, 1200),
        ];
        let result =
            compute_round_result(&pair(), &ParticipantId::new("p1"), &swipes, 1, false);
        assert_eq!(result.winner, Some(CandidateId::new("2")));
        assert_eq!(result.matches, vec![CandidateId::new("2")]);
        assert_eq!(result.compromise, None);
    }

    #[test]
    fn matches_are_capped_at_top_three() {
        let mut swipes = Vec::new();
        for (c, (ms1, ms2)) in [
            ("a", (400, 900)),
            ("b", (100, 800)),
            ("c", (300, 700)),
            ("d", (200, 600)),
        ] {
            swipes.push(swipe("p1", c, 1, Decision::Like, ms1));
            swipes.push(swipe("p2", c, 1, Decision::Like, ms2));
        }
        let result =
            compute_round_result(&pair(), &ParticipantId::new("p1"), &swipes, 1, false);
        // Ranked by min latency: b(100), d(200), c(300); a(400) drops off.
        assert_eq!(
            result.matches,
            vec![
                CandidateId::new("b"),
                CandidateId::new("d"),
                CandidateId::new("c")
            ]
        );
        assert_eq!(result.winner, Some(CandidateId::new("b")));
    }

    #[test]
    fn no_overlap_yields_compromise_without_winner() {
        let swipes = vec![
            swipe("p1", "1", 1, Decision::Like, 1200),
            swipe("p2", "2", 1, Decision::Like, 500),
        ];
        let result =
            compute_round_result(&pair(), &ParticipantId::new("p1"), &swipes, 1, false);
        assert_eq!(result.winner, None);
        // Host liked something, so the host's earliest like wins the pick
        // even though p2 decided faster.
        assert_eq!(result.compromise, Some(CandidateId::new("1")));
    }

    #[test]
    fn compromise_falls_back_to_any_participant() {
        let swipes = vec![
            swipe("p1", "1", 1, Decision::Dislike, 200),
            swipe("p2", "2", 1, Decision::Like, 900),
        ];
        let result =
            compute_round_result(&pair(), &ParticipantId::new("p1"), &swipes, 1, false);
        assert_eq!(result.compromise, Some(CandidateId::new("2")));
    }

    #[test]
    fn must_conclude_promotes_compromise_to_winner() {
        let swipes = vec![
            swipe("p1", "6", 2, Decision::Like, 700),
            swipe("p2", "7", 2, Decision::Like, 400),
        ];
        let result = compute_round_result(&pair(), &ParticipantId::new("p1"), &swipes, 2, true);
        assert_eq!(result.winner, Some(CandidateId::new("6")));
        assert_eq!(result.winner, result.compromise);
    }

    #[test]
    fn round_isolation() {
        // A round-1 mutual like must not leak into round 2.
        let swipes = vec![
            swipe("p1", "1", 1, Decision::Like, 100),
            swipe("p2", "1", 1, Decision::Like, 150),
            swipe("p1", "6", 2, Decision::Like, 300),
            swipe("p2", "7", 2, Decision::Like, 200),
        ];
        let result = compute_round_result(&pair(), &ParticipantId::new("p1"), &swipes, 2, true);
        assert!(result.matches.is_empty());
        assert_ne!(result.winner, Some(CandidateId::new("1")));
    }

    #[test]
    fn recomputation_is_deterministic() {
        let swipes = vec![
            swipe("p1", "1", 1, Decision::Like, 1000),
            swipe("p1", "2", 1, Decision::Superlike, 1500),
            swipe("p2", "2", 1, Decision::Like, 800),
            swipe("p2", "1", 1, Decision::Like, 800),
        ];
        let first = compute_round_result(&pair(), &ParticipantId::new("p1"), &swipes, 1, false);
        for _ in 0..10 {
            let again =
                compute_round_result(&pair(), &ParticipantId::new("p1"), &swipes, 1, false);
            assert_eq!(again, first);
        }
    }

    #[test]
    fn finalists_ranked_by_count_then_latency_sum() {
        // Like counts: A=3, B=2, C=1; D only collected a dislike.
        let swipes = vec![
            swipe("p1", "A", 1, Decision::Like, 500),
            swipe("p2", "A", 1, Decision::Like, 600),
            swipe("p3", "A", 1, Decision::Superlike, 700),
            swipe("p1", "B", 1, Decision::Like, 400),
            swipe("p2", "B", 1, Decision::Like, 450),
            swipe("p3", "C", 1, Decision::Like, 300),
            swipe("p1", "D", 1, Decision::Dislike, 100),
        ];
        let finalists = compute_finalists(&swipes, 1);
        assert_eq!(
            finalists,
            vec![
                CandidateId::new("A"),
                CandidateId::new("B"),
                CandidateId::new("C")
            ]
        );
    }

    #[test]
    fn absurd_client_latencies_saturate_instead_of_overflowing() {
        // Two maxed-out latencies on one candidate must not wrap the sum,
        // and like count still outranks latency.
        let swipes = vec![
            swipe("p1", "A", 1, Decision::Like, u64::MAX),
            swipe("p2", "A", 1, Decision::Like, u64::MAX),
            swipe("p1", "B", 1, Decision::Like, 100),
        ];
        let finalists = compute_finalists(&swipes, 1);
        assert_eq!(finalists, vec![CandidateId::new("A"), CandidateId::new("B")]);
    }

    #[test]
    fn finalist_count_tie_broken_by_latency_sum() {
        let swipes = vec![
            swipe("p1", "A", 1, Decision::Like, 900),
            swipe("p2", "A", 1, Decision::Like, 900),
            swipe("p1", "B", 1, Decision::Like, 100),
            swipe("p2", "B", 1, Decision::Like, 100),
        ];
        let finalists = compute_finalists(&swipes, 1);
        assert_eq!(finalists[0], CandidateId::new("B"));
    }

    #[test]
    fn vote_plurality_wins() {
        let finalists = vec![
            CandidateId::new("A"),
            CandidateId::new("B"),
            CandidateId::new("C"),
        ];
        let mut votes = HashMap::new();
        votes.insert(ParticipantId::new("p1"), CandidateId::new("A"));
        votes.insert(ParticipantId::new("p2"), CandidateId::new("B"));
        votes.insert(ParticipantId::new("p3"), CandidateId::new("A"));
        assert_eq!(tally_votes(&votes, &finalists), Some(CandidateId::new("A")));
    }

    #[test]
    fn vote_tie_goes_to_higher_ranked_finalist() {
        let finalists = vec![CandidateId::new("A"), CandidateId::new("B")];
        let mut votes = HashMap::new();
        votes.insert(ParticipantId::new("p1"), CandidateId::new("B"));
        votes.insert(ParticipantId::new("p2"), CandidateId::new("A"));
        assert_eq!(tally_votes(&votes, &finalists), Some(CandidateId::new("A")));
    }
}
