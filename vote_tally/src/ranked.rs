use std::collections::HashMap;

use log::{debug, info};
use serde_json::Value as JSValue;

use crate::ballot::{validate_ranking, BallotResult};
use crate::config::*;
use crate::engine::TallyEngine;

type RoundId = u32;

// Invariant: never empty when accepted. Choices get removed during a count,
// so working copies may become empty (exhausted).
type Ranking = Vec<String>;

/// Ranked ballots tabulated with instant-runoff.
///
/// The raw ballots are kept untouched. The live results only show first
/// preferences, the runoff is computed on demand.
#[derive(Debug, Clone)]
pub struct RankedChoiceEngine {
    tiebreak_mode: TieBreakMode,
    duplicate_candidate_mode: DuplicateCandidateMode,
    ballots: Vec<Ranking>,
}

impl RankedChoiceEngine {
    pub fn new(
        tiebreak_mode: TieBreakMode,
        duplicate_candidate_mode: DuplicateCandidateMode,
    ) -> RankedChoiceEngine {
        RankedChoiceEngine {
            tiebreak_mode,
            duplicate_candidate_mode,
            ballots: Vec::new(),
        }
    }

    /// Runs the instant-runoff count.
    ///
    /// At most one round per known candidate is run. If no candidate reached
    /// a majority by then, the first preferences are returned instead.
    pub fn run_runoff(&self, candidates: &[String]) -> FinalResult {
        info!(
            "run_runoff: processing {:?} ballots, {:?} known candidates, tiebreak: {:?}",
            self.ballots.len(),
            candidates.len(),
            self.tiebreak_mode
        );

        let mut cur_ballots: Vec<Ranking> = self.ballots.clone();
        let mut round_stats: Vec<RoundStats> = Vec::new();
        let max_rounds = candidates.len();

        while round_stats.len() < max_rounds {
            let round_id = (round_stats.len() + 1) as RoundId;
            let tally = compute_tally(&cur_ballots);
            let exhausted = cur_ballots.iter().filter(|b| b.is_empty()).count() as u64;
            debug!("run_runoff: round {:?} tally: {:?}", round_id, tally);

            if let Some(winner) = find_majority(&tally) {
                info!("run_runoff: round {:?}: {:?} has a majority", round_id, winner);
                round_stats.push(RoundStats {
                    round: round_id,
                    tally: tally.clone(),
                    eliminated: None,
                    exhausted,
                });
                return FinalResult::Runoff(RunoffOutcome {
                    winner: Winner::Candidate(winner),
                    rounds: round_id,
                    final_counts: tally,
                    round_stats,
                });
            }

            // No vote left to count: every ballot is exhausted.
            if tally.is_empty() {
                info!("run_runoff: round {:?}: no counted votes, tie", round_id);
                round_stats.push(RoundStats {
                    round: round_id,
                    tally: Tally::new(),
                    eliminated: None,
                    exhausted,
                });
                return FinalResult::Runoff(RunoffOutcome {
                    winner: Winner::Tie,
                    rounds: round_id,
                    final_counts: Tally::new(),
                    round_stats,
                });
            }

            let loser = find_eliminated_candidate(&tally, self.tiebreak_mode, candidates, round_id);
            debug!("run_runoff: round {:?}: eliminating {:?}", round_id, loser);
            for ballot in cur_ballots.iter_mut() {
                ballot.retain(|cid| *cid != loser);
            }
            round_stats.push(RoundStats {
                round: round_id,
                tally,
                eliminated: Some(loser),
                exhausted,
            });
        }

        info!(
            "run_runoff: no majority after {:?} rounds, returning first preferences",
            max_rounds
        );
        FinalResult::Counts(compute_tally(&self.ballots))
    }
}

impl TallyEngine for RankedChoiceEngine {
    fn method(&self) -> VotingMethod {
        VotingMethod::RankedChoice
    }

    fn record(&mut self, payload: &JSValue) -> BallotResult<()> {
        let ranking = validate_ranking(payload, self.duplicate_candidate_mode)?;
        debug!("RankedChoiceEngine::record: ranking {:?}", ranking);
        self.ballots.push(ranking);
        Ok(())
    }

    fn public_results(&self) -> Tally {
        compute_tally(&self.ballots)
    }

    fn final_results(&self, candidates: &[String]) -> FinalResult {
        self.run_runoff(candidates)
    }

    fn ballot_count(&self) -> usize {
        self.ballots.len()
    }
}

/// First-choice counts of the ballots that are not exhausted.
fn compute_tally(ballots: &[Ranking]) -> Tally {
    let mut tally = Tally::new();
    for first in ballots.iter().filter_map(|b| b.first()) {
        *tally.entry(first.clone()).or_insert(0) += 1;
    }
    tally
}

/// The candidate holding strictly more than half of the counted votes.
fn find_majority(tally: &Tally) -> Option<String> {
    let total: u64 = tally.values().sum();
    // count > total / 2, without integer truncation.
    tally
        .iter()
        .find(|(_, &count)| count * 2 > total)
        .map(|(cid, _)| cid.clone())
}

// Invariant: the tally is not empty.
fn find_eliminated_candidate(
    tally: &Tally,
    tiebreak: TieBreakMode,
    candidates: &[String],
    num_round: RoundId,
) -> String {
    let min_count: u64 = tally.values().copied().min().unwrap_or(0);
    let all_smallest: Vec<&String> = tally
        .iter()
        .filter_map(|(cid, vc)| if *vc <= min_count { Some(cid) } else { None })
        .collect();
    debug!(
        "find_eliminated_candidate: all_smallest: {:?}",
        all_smallest
    );

    if all_smallest.len() == 1 {
        return all_smallest[0].clone();
    }

    let picked = match tiebreak {
        // The tally is ordered by identifier.
        TieBreakMode::Lexicographic => all_smallest.first().copied(),
        TieBreakMode::UseCandidateOrder => {
            let candidate_order: HashMap<&str, usize> = candidates
                .iter()
                .enumerate()
                .map(|(idx, cid)| (cid.as_str(), idx))
                .collect();
            // Unlisted candidates sort after every listed one.
            all_smallest
                .iter()
                .map(|cid| {
                    let idx = candidate_order
                        .get(cid.as_str())
                        .copied()
                        .unwrap_or(usize::MAX);
                    (idx, *cid)
                })
                .max()
                .map(|(_, cid)| cid)
        }
        TieBreakMode::Random(seed) => {
            let res = candidate_permutation_crypto(&all_smallest, seed, num_round);
            debug!(
                "find_eliminated_candidate: elimination queue using random tiebreak: {:?}",
                res
            );
            res.into_iter().next()
        }
    };
    picked.cloned().unwrap_or_default()
}

/// Generates a "random" permutation of the candidates. Random in this context
/// means hard to guess in advance, yet reproducible for a given seed.
fn candidate_permutation_crypto<'a>(
    candidates: &[&'a String],
    seed: u32,
    num_round: RoundId,
) -> Vec<&'a String> {
    let mut data: Vec<(&String, String)> = candidates
        .iter()
        .map(|cid| {
            let key = format!("{:08}{:08}{}", seed, num_round, cid);
            (*cid, sha256::digest(key.as_str()))
        })
        .collect();
    data.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    data.into_iter().map(|p| p.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine_with(ballots: &[&[&str]], tiebreak: TieBreakMode) -> RankedChoiceEngine {
        let mut engine =
            RankedChoiceEngine::new(tiebreak, DuplicateCandidateMode::SkipDuplicate);
        for b in ballots {
            engine.record(&json!({ "ballot": b })).unwrap();
        }
        engine
    }

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn tally(xs: &[(&str, u64)]) -> Tally {
        xs.iter().map(|(c, n)| (c.to_string(), *n)).collect()
    }

    #[test]
    fn public_results_are_first_preferences() {
        let engine = engine_with(
            &[&["A", "B"], &["B", "A"], &["A", "C"]],
            TieBreakMode::Lexicographic,
        );
        assert_eq!(engine.public_results(), tally(&[("A", 2), ("B", 1)]));
    }

    #[test]
    fn first_round_majority() {
        let engine = engine_with(
            &[&["A", "B", "C"], &["B", "A", "C"], &["B", "C", "A"]],
            TieBreakMode::Lexicographic,
        );
        let res = engine.final_results(&names(&["A", "B", "C"]));
        match res {
            FinalResult::Runoff(outcome) => {
                assert_eq!(outcome.winner, Winner::Candidate("B".to_string()));
                assert_eq!(outcome.rounds, 1);
                assert_eq!(outcome.final_counts, tally(&[("A", 1), ("B", 2)]));
                assert_eq!(outcome.round_stats.len(), 1);
            }
            x => panic!("expected a runoff outcome, got {:?}", x),
        }
    }

    #[test]
    fn three_way_tie_eliminates_smallest_identifier() {
        let engine = engine_with(&[&["A", "B"], &["B", "A"], &["C"]], TieBreakMode::Lexicographic);
        let res = engine.final_results(&names(&["A", "B", "C"]));
        match res {
            FinalResult::Runoff(outcome) => {
                assert_eq!(outcome.winner, Winner::Candidate("B".to_string()));
                assert_eq!(outcome.rounds, 2);
                assert_eq!(outcome.final_counts, tally(&[("B", 2), ("C", 1)]));
                assert_eq!(outcome.round_stats[0].eliminated, Some("A".to_string()));
                assert_eq!(
                    outcome.round_stats[0].tally,
                    tally(&[("A", 1), ("B", 1), ("C", 1)])
                );
            }
            x => panic!("expected a runoff outcome, got {:?}", x),
        }
    }

    #[test]
    fn candidate_order_tiebreak_eliminates_last_listed() {
        let engine = engine_with(
            &[&["A", "B"], &["B", "A"], &["C", "A"]],
            TieBreakMode::UseCandidateOrder,
        );
        // C is listed last and eliminated first, its ballot moves to A.
        let res = engine.final_results(&names(&["A", "B", "C"]));
        assert_eq!(res.winner(), Some(&Winner::Candidate("A".to_string())));
        match res {
            FinalResult::Runoff(outcome) => {
                assert_eq!(outcome.round_stats[0].eliminated, Some("C".to_string()));
                assert_eq!(outcome.rounds, 2);
            }
            x => panic!("expected a runoff outcome, got {:?}", x),
        }
    }

    #[test]
    fn candidate_order_tiebreak_eliminates_unlisted_first() {
        let t = tally(&[("A", 1), ("Z", 1)]);
        let loser = find_eliminated_candidate(
            &t,
            TieBreakMode::UseCandidateOrder,
            &names(&["Z", "B"]),
            1,
        );
        assert_eq!(loser, "A");
    }

    #[test]
    fn random_tiebreak_is_reproducible() {
        let t = tally(&[("A", 1), ("B", 1), ("C", 1), ("D", 4)]);
        let cands = names(&["A", "B", "C", "D"]);
        let first = find_eliminated_candidate(&t, TieBreakMode::Random(42), &cands, 1);
        for _ in 0..5 {
            assert_eq!(
                find_eliminated_candidate(&t, TieBreakMode::Random(42), &cands, 1),
                first
            );
        }
        assert_ne!(first, "D");
    }

    #[test]
    fn unique_loser_ignores_tiebreak() {
        let t = tally(&[("A", 3), ("B", 1), ("C", 2)]);
        for mode in [
            TieBreakMode::Lexicographic,
            TieBreakMode::UseCandidateOrder,
            TieBreakMode::Random(7),
        ] {
            assert_eq!(find_eliminated_candidate(&t, mode, &[], 1), "B");
        }
    }

    #[test]
    fn eliminated_candidate_is_removed_everywhere() {
        // B is eliminated in round 1 and must disappear from the middle of ballots too.
        let engine = engine_with(
            &[
                &["A", "B", "C"],
                &["A", "B", "C"],
                &["C", "B", "A"],
                &["C", "B", "A"],
                &["B", "C", "A"],
                &["D", "A"],
                &["D", "A"],
            ],
            TieBreakMode::Lexicographic,
        );
        let res = engine.final_results(&names(&["A", "B", "C", "D"]));
        match res {
            FinalResult::Runoff(outcome) => {
                assert_eq!(outcome.round_stats[0].eliminated, Some("B".to_string()));
                for later in outcome.round_stats.iter().skip(1) {
                    assert!(!later.tally.contains_key("B"));
                }
                // Round 2: A 2, C 3, D 2 -> A eliminated (lexicographic).
                assert_eq!(outcome.round_stats[1].eliminated, Some("A".to_string()));
                // Round 3: C 3 + 2 from the A ballots, D 2.
                assert_eq!(outcome.winner, Winner::Candidate("C".to_string()));
                assert_eq!(outcome.rounds, 3);
                assert_eq!(outcome.final_counts, tally(&[("C", 5), ("D", 2)]));
            }
            x => panic!("expected a runoff outcome, got {:?}", x),
        }
    }

    #[test]
    fn exact_half_is_not_a_majority() {
        let engine = engine_with(&[&["A"], &["B"]], TieBreakMode::Lexicographic);
        // Round 1: A 1, B 1, no majority, A eliminated. Round 2: B 1 of 1.
        let res = engine.final_results(&names(&["A", "B"]));
        match res {
            FinalResult::Runoff(outcome) => {
                assert_eq!(outcome.winner, Winner::Candidate("B".to_string()));
                assert_eq!(outcome.rounds, 2);
            }
            x => panic!("expected a runoff outcome, got {:?}", x),
        }
    }

    #[test]
    fn all_ballots_exhausted_is_a_tie() {
        let mut exhausted = engine_with(&[], TieBreakMode::Lexicographic);
        exhausted.ballots = vec![vec![], vec![]];
        let res = exhausted.final_results(&names(&["A", "B"]));
        match res {
            FinalResult::Runoff(outcome) => {
                assert_eq!(outcome.winner, Winner::Tie);
                assert_eq!(outcome.rounds, 1);
                assert!(outcome.final_counts.is_empty());
                assert_eq!(outcome.round_stats[0].exhausted, 2);
            }
            x => panic!("expected a runoff outcome, got {:?}", x),
        }
    }

    #[test]
    fn no_ballots_is_an_immediate_tie() {
        let engine = engine_with(&[], TieBreakMode::Lexicographic);
        let res = engine.final_results(&names(&["A", "B"]));
        assert_eq!(res.winner(), Some(&Winner::Tie));
        assert!(res.counts().is_empty());
    }

    #[test]
    fn round_cap_falls_back_to_first_preferences() {
        let engine = engine_with(&[&["A", "B"], &["B", "A"], &["C"]], TieBreakMode::Lexicographic);
        // Only one round allowed: no majority in round 1.
        let res = engine.final_results(&names(&["A"]));
        assert_eq!(
            res,
            FinalResult::Counts(tally(&[("A", 1), ("B", 1), ("C", 1)]))
        );
        // No known candidate at all: no round is run.
        let res = engine.final_results(&[]);
        assert_eq!(res, FinalResult::Counts(engine.public_results()));
    }

    #[test]
    fn final_results_do_not_modify_ballots() {
        let engine = engine_with(&[&["A", "B"], &["B", "A"], &["C", "B"]], TieBreakMode::Lexicographic);
        let before = engine.public_results();
        let _ = engine.final_results(&names(&["A", "B", "C"]));
        assert_eq!(engine.public_results(), before);
        assert_eq!(engine.ballot_count(), 3);
    }
}
