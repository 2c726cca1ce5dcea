//! Structural validation of incoming vote payloads.
//!
//! Each voting method accepts a different payload shape. The validators
//! below turn a raw JSON payload into the typed ballot an engine stores, or
//! explain why it was rejected.

use std::collections::{BTreeMap, HashSet};

use log::debug;
use serde_json::Value as JSValue;

use crate::config::*;

/// Field holding the single choice of a plurality vote.
pub const BOOK_ID_FIELD: &str = "book_id";
/// Field holding a ranked list or a point allocation.
pub const BALLOT_FIELD: &str = "ballot";

pub type BallotResult<T> = Result<T, BallotError>;

fn get_field<'a>(payload: &'a JSValue, field: &'static str) -> BallotResult<&'a JSValue> {
    match payload.get(field) {
        Some(JSValue::Null) | None => Err(BallotError::MissingField { field }),
        Some(v) => Ok(v),
    }
}

/// A plurality vote: `{"book_id": "<id>"}`.
pub fn validate_single_choice(payload: &JSValue) -> BallotResult<String> {
    let choice = get_field(payload, BOOK_ID_FIELD)?
        .as_str()
        .ok_or(BallotError::WrongShape {
            field: BOOK_ID_FIELD,
            expected: "a string",
        })?;
    if choice.is_empty() {
        return Err(BallotError::EmptyBallot);
    }
    Ok(choice.to_string())
}

/// A ranked vote: `{"ballot": ["<id>", ...]}`, highest preference first.
pub fn validate_ranking(
    payload: &JSValue,
    duplicate_policy: DuplicateCandidateMode,
) -> BallotResult<Vec<String>> {
    let choices = get_field(payload, BALLOT_FIELD)?
        .as_array()
        .ok_or(BallotError::WrongShape {
            field: BALLOT_FIELD,
            expected: "a list of book ids",
        })?;
    if choices.is_empty() {
        return Err(BallotError::EmptyBallot);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut ranking: Vec<String> = Vec::with_capacity(choices.len());
    for choice in choices.iter() {
        let cid = match choice.as_str() {
            Some(s) if !s.is_empty() => s,
            _ => {
                return Err(BallotError::WrongShape {
                    field: BALLOT_FIELD,
                    expected: "a list of non-empty book ids",
                })
            }
        };
        if !seen.insert(cid) {
            match duplicate_policy {
                DuplicateCandidateMode::Reject => {
                    return Err(BallotError::DuplicateCandidate {
                        candidate: cid.to_string(),
                    });
                }
                DuplicateCandidateMode::SkipDuplicate => {
                    debug!("validate_ranking: skipping repeated choice {:?}", cid);
                    continue;
                }
            }
        }
        ranking.push(cid.to_string());
    }
    Ok(ranking)
}

/// A cumulative vote: `{"ballot": {"<id>": <points>, ...}}`.
///
/// The points must be non-negative integers adding up to `budget` exactly.
pub fn validate_allocation(payload: &JSValue, budget: u64) -> BallotResult<BTreeMap<String, u64>> {
    let entries = get_field(payload, BALLOT_FIELD)?
        .as_object()
        .ok_or(BallotError::WrongShape {
            field: BALLOT_FIELD,
            expected: "a mapping from book ids to points",
        })?;
    if entries.is_empty() {
        return Err(BallotError::EmptyBallot);
    }

    let mut allocation: BTreeMap<String, u64> = BTreeMap::new();
    let mut total: Option<u64> = Some(0);
    for (cid, points) in entries.iter() {
        if cid.is_empty() {
            return Err(BallotError::EmptyBallot);
        }
        let p = points.as_u64().ok_or_else(|| BallotError::InvalidPoints {
            candidate: cid.clone(),
        })?;
        total = total.and_then(|t| t.checked_add(p));
        allocation.insert(cid.clone(), p);
    }

    match total {
        Some(t) if t == budget => Ok(allocation),
        Some(t) => Err(BallotError::PointsMismatch {
            expected: budget,
            actual: t,
        }),
        None => Err(BallotError::PointsMismatch {
            expected: budget,
            actual: u64::MAX,
        }),
    }
}
