use std::fmt::Debug;

use log::info;
use serde_json::Value as JSValue;

use crate::ballot::BallotResult;
use crate::config::*;
use crate::cumulative::CumulativeEngine;
use crate::plurality::PluralityEngine;
use crate::ranked::RankedChoiceEngine;

/// A stateful accumulator and counter for one voting method.
///
/// An engine starts empty and only grows: ballots are validated by the
/// engine itself, then either fully recorded or rejected without any change.
pub trait TallyEngine: Send + Debug {
    fn method(&self) -> VotingMethod;

    /// Validates and records one vote payload.
    fn record(&mut self, payload: &JSValue) -> BallotResult<()>;

    /// The live view of the votes, cheap enough for frequent polling.
    fn public_results(&self) -> Tally;

    /// The authoritative outcome.
    ///
    /// `candidates` are the identifiers of the books currently known to the
    /// host. Only instant-runoff uses them, to bound the number of rounds.
    fn final_results(&self, candidates: &[String]) -> FinalResult;

    /// Number of accepted ballots.
    fn ballot_count(&self) -> usize;
}

/// Builds a new, empty engine for the given settings.
pub fn build_engine(settings: &TallySettings) -> Box<dyn TallyEngine> {
    info!("build_engine: creating a {} engine", settings.method);
    match settings.method {
        VotingMethod::Plurality => Box::new(PluralityEngine::new()),
        VotingMethod::RankedChoice => Box::new(RankedChoiceEngine::new(
            settings.tiebreak_mode,
            settings.duplicate_candidate_mode,
        )),
        VotingMethod::Cumulative => {
            Box::new(CumulativeEngine::new(settings.points_per_voter as u64))
        }
    }
}
