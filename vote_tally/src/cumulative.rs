use std::collections::BTreeMap;

use log::debug;
use serde_json::Value as JSValue;

use crate::ballot::{validate_allocation, BallotResult};
use crate::config::*;
use crate::engine::TallyEngine;

/// Each voter spreads a fixed budget of points across the books.
#[derive(Debug, Clone)]
pub struct CumulativeEngine {
    points_per_voter: u64,
    // Invariant: every allocation sums to points_per_voter.
    allocations: Vec<BTreeMap<String, u64>>,
}

impl CumulativeEngine {
    pub fn new(points_per_voter: u64) -> CumulativeEngine {
        CumulativeEngine {
            points_per_voter,
            allocations: Vec::new(),
        }
    }

    pub fn points_per_voter(&self) -> u64 {
        self.points_per_voter
    }

    fn sum_points(&self) -> Tally {
        let mut tally = Tally::new();
        for allocation in self.allocations.iter() {
            for (cid, points) in allocation.iter() {
                *tally.entry(cid.clone()).or_insert(0) += *points;
            }
        }
        tally
    }
}

impl TallyEngine for CumulativeEngine {
    fn method(&self) -> VotingMethod {
        VotingMethod::Cumulative
    }

    fn record(&mut self, payload: &JSValue) -> BallotResult<()> {
        let allocation = validate_allocation(payload, self.points_per_voter)?;
        debug!("CumulativeEngine::record: allocation {:?}", allocation);
        self.allocations.push(allocation);
        Ok(())
    }

    fn public_results(&self) -> Tally {
        self.sum_points()
    }

    fn final_results(&self, _candidates: &[String]) -> FinalResult {
        FinalResult::Counts(self.sum_points())
    }

    fn ballot_count(&self) -> usize {
        self.allocations.len()
    }
}
