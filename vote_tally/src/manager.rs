use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use serde_json::Value as JSValue;

use crate::ballot::BallotResult;
use crate::config::*;
use crate::engine::{build_engine, TallyEngine};

#[derive(Debug)]
struct ActiveEngine {
    settings: TallySettings,
    engine: Box<dyn TallyEngine>,
}

impl ActiveEngine {
    fn new(settings: TallySettings) -> ActiveEngine {
        let engine = build_engine(&settings);
        ActiveEngine { settings, engine }
    }
}

/// Holds the active tally engine and forwards votes and result queries to it.
///
/// All the operations go through a single lock, so swapping the engine with
/// [`VotingManager::reconfigure`] is atomic with respect to the votes being
/// recorded: a vote lands either in the old round or in the new one.
///
/// ```
/// use serde_json::json;
/// use vote_tally::manager::VotingManager;
///
/// let manager = VotingManager::from_method_name("plurality", 5);
/// manager.record_vote(&json!({"book_id": "book_1"}))?;
/// assert_eq!(manager.public_results().get("book_1"), Some(&1));
///
/// // A new voting method starts a new round.
/// manager.reconfigure_by_name("cumulative", 3);
/// assert!(manager.public_results().is_empty());
/// assert!(manager.record_vote(&json!({"ballot": {"book_1": 2}})).is_err());
/// # Ok::<(), vote_tally::BallotError>(())
/// ```
#[derive(Debug)]
pub struct VotingManager {
    active: Mutex<ActiveEngine>,
}

impl VotingManager {
    pub fn new(settings: TallySettings) -> VotingManager {
        let settings = settings.sanitized();
        info!("VotingManager: initialized with settings {:?}", settings);
        VotingManager {
            active: Mutex::new(ActiveEngine::new(settings)),
        }
    }

    /// Builds a manager from the voting method name found in the settings.
    /// Unknown names select plurality.
    pub fn from_method_name(method_name: &str, points_per_voter: u32) -> VotingManager {
        VotingManager::new(TallySettings::new(
            VotingMethod::from_name(method_name),
            points_per_voter,
        ))
    }

    // Ballots are validated before any mutation, so a poisoned lock still
    // guards a consistent engine.
    fn lock(&self) -> MutexGuard<'_, ActiveEngine> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a vote with the active engine. `Ok` is the success flag.
    pub fn record_vote(&self, payload: &JSValue) -> BallotResult<()> {
        let mut active = self.lock();
        let res = active.engine.record(payload);
        if let Err(e) = &res {
            debug!(
                "record_vote: {} ballot rejected: {}",
                active.settings.method, e
            );
        }
        res
    }

    pub fn public_results(&self) -> Tally {
        self.lock().engine.public_results()
    }

    pub fn final_results(&self, candidates: &[String]) -> FinalResult {
        self.lock().engine.final_results(candidates)
    }

    /// Replaces the active engine by a new, empty one.
    ///
    /// The ballots of the previous round are discarded, even when the method
    /// does not change.
    pub fn reconfigure(&self, settings: TallySettings) {
        let settings = settings.sanitized();
        let mut active = self.lock();
        info!(
            "VotingManager: switching from {} ({} ballots discarded) to settings {:?}",
            active.settings.method,
            active.engine.ballot_count(),
            settings
        );
        *active = ActiveEngine::new(settings);
    }

    /// Changes the voting method and the point budget, keeping the other rules.
    pub fn reconfigure_by_name(&self, method_name: &str, points_per_voter: u32) {
        let method = VotingMethod::from_name(method_name);
        let mut active = self.lock();
        let settings = TallySettings {
            method,
            points_per_voter,
            ..active.settings.clone()
        }
        .sanitized();
        info!(
            "VotingManager: switching from {} ({} ballots discarded) to {}",
            active.settings.method,
            active.engine.ballot_count(),
            settings.method
        );
        *active = ActiveEngine::new(settings);
    }

    pub fn settings(&self) -> TallySettings {
        self.lock().settings.clone()
    }

    pub fn ballot_count(&self) -> usize {
        self.lock().engine.ballot_count()
    }
}

impl Default for VotingManager {
    fn default() -> Self {
        VotingManager::new(TallySettings::DEFAULT_SETTINGS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn forwards_to_active_engine() {
        let manager = VotingManager::default();
        for cid in ["A", "B", "A"] {
            manager.record_vote(&json!({ "book_id": cid })).unwrap();
        }
        let res = manager.public_results();
        assert_eq!(res.get("A"), Some(&2));
        assert_eq!(res.get("B"), Some(&1));
        assert_eq!(
            manager.final_results(&[]),
            FinalResult::Counts(res.clone())
        );
        assert_eq!(manager.ballot_count(), 3);
    }

    #[test]
    fn reconfigure_discards_ballots() {
        let manager = VotingManager::default();
        manager.record_vote(&json!({"book_id": "A"})).unwrap();
        manager.reconfigure_by_name("ranked_choice", 5);
        assert!(manager.public_results().is_empty());
        assert_eq!(manager.settings().method, VotingMethod::RankedChoice);

        manager.record_vote(&json!({"ballot": ["A", "B"]})).unwrap();
        // Same method again: still a new round.
        manager.reconfigure_by_name("ranked_choice", 5);
        assert!(manager.public_results().is_empty());
        assert_eq!(manager.ballot_count(), 0);
    }

    #[test]
    fn reconfigure_keeps_other_rules() {
        let manager = VotingManager::new(TallySettings {
            tiebreak_mode: TieBreakMode::Random(3),
            ..TallySettings::new(VotingMethod::RankedChoice, 5)
        });
        manager.reconfigure_by_name("cumulative", 0);
        let s = manager.settings();
        assert_eq!(s.method, VotingMethod::Cumulative);
        assert_eq!(s.points_per_voter, 5);
        assert_eq!(s.tiebreak_mode, TieBreakMode::Random(3));
    }

    #[test]
    fn unknown_method_selects_plurality() {
        let manager = VotingManager::from_method_name("borda", 5);
        assert_eq!(manager.settings().method, VotingMethod::Plurality);
        assert!(manager.record_vote(&json!({"book_id": "A"})).is_ok());
    }

    #[test]
    fn rejected_vote_leaves_results_unchanged() {
        let manager = VotingManager::from_method_name("cumulative", 5);
        manager
            .record_vote(&json!({"ballot": {"A": 2, "B": 3}}))
            .unwrap();
        let before = serde_json::to_string(&manager.public_results()).unwrap();
        for bad in [
            json!({"ballot": {"A": 6}}),
            json!({"ballot": {}}),
            json!({"book_id": "A"}),
            json!(null),
        ] {
            assert!(manager.record_vote(&bad).is_err());
            let after = serde_json::to_string(&manager.public_results()).unwrap();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn concurrent_votes_are_all_counted() {
        let manager = Arc::new(VotingManager::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let m = Arc::clone(&manager);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let cid = if i % 2 == 0 { "A" } else { "B" };
                        m.record_vote(&json!({ "book_id": cid })).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let res = manager.public_results();
        assert_eq!(res.get("A"), Some(&400));
        assert_eq!(res.get("B"), Some(&400));
    }

    #[test]
    fn reconfigure_while_voting_discards_the_old_round() {
        let manager = Arc::new(VotingManager::default());
        let voter = {
            let m = Arc::clone(&manager);
            thread::spawn(move || {
                for _ in 0..500 {
                    // Only valid for plurality.
                    let _ = m.record_vote(&json!({"book_id": "A"}));
                }
            })
        };
        manager.reconfigure_by_name("cumulative", 5);
        voter.join().unwrap();
        // Votes before the switch were discarded with the old engine, votes
        // after it were rejected by the cumulative engine.
        assert_eq!(manager.ballot_count(), 0);
        assert!(manager.public_results().is_empty());
    }
}
