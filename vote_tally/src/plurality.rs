use log::debug;
use serde_json::Value as JSValue;

use crate::ballot::{validate_single_choice, BallotResult};
use crate::config::*;
use crate::engine::TallyEngine;

/// One vote per ballot. The counts are maintained incrementally.
#[derive(Debug, Default, Clone)]
pub struct PluralityEngine {
    counts: Tally,
    ballot_count: usize,
}

impl PluralityEngine {
    pub fn new() -> PluralityEngine {
        PluralityEngine::default()
    }
}

impl TallyEngine for PluralityEngine {
    fn method(&self) -> VotingMethod {
        VotingMethod::Plurality
    }

    fn record(&mut self, payload: &JSValue) -> BallotResult<()> {
        let cid = validate_single_choice(payload)?;
        debug!("PluralityEngine::record: vote for {:?}", cid);
        *self.counts.entry(cid).or_insert(0) += 1;
        self.ballot_count += 1;
        Ok(())
    }

    fn public_results(&self) -> Tally {
        self.counts.clone()
    }

    // There is no separate final computation for plurality.
    fn final_results(&self, _candidates: &[String]) -> FinalResult {
        FinalResult::Counts(self.public_results())
    }

    fn ballot_count(&self) -> usize {
        self.ballot_count
    }
}
