// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

use log::warn;
use serde::{Serialize, Serializer};

/// The voting methods supported by the tabulation core.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum VotingMethod {
    /// One book per ballot, most votes wins.
    Plurality,
    /// Books ranked by preference, tabulated with instant-runoff.
    RankedChoice,
    /// A fixed budget of points spread across books.
    Cumulative,
}

impl VotingMethod {
    /// Parses the name of a voting method as it appears in the settings.
    ///
    /// Unknown names fall back to plurality.
    pub fn from_name(name: &str) -> VotingMethod {
        match name {
            "plurality" => VotingMethod::Plurality,
            "ranked_choice" => VotingMethod::RankedChoice,
            "cumulative" => VotingMethod::Cumulative,
            x => {
                warn!(
                    "VotingMethod::from_name: unknown voting method {:?}, using plurality",
                    x
                );
                VotingMethod::Plurality
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VotingMethod::Plurality => "plurality",
            VotingMethod::RankedChoice => "ranked_choice",
            VotingMethod::Cumulative => "cumulative",
        }
    }
}

impl Display for VotingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ******** Output data structures *********

/// Counts (or points) per candidate identifier.
///
/// Ordered by identifier so that serialized results are stable.
pub type Tally = BTreeMap<String, u64>;

/// The winner of an instant-runoff count.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Winner {
    Candidate(String),
    /// Every ballot was exhausted before anyone reached a majority.
    Tie,
}

impl Winner {
    pub const TIE_LABEL: &'static str = "Tie";

    pub fn name(&self) -> &str {
        match self {
            Winner::Candidate(name) => name.as_str(),
            Winner::Tie => Winner::TIE_LABEL,
        }
    }
}

impl Serialize for Winner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Statistics for one round of an instant-runoff count.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct RoundStats {
    pub round: u32,
    pub tally: Tally,
    /// The candidate removed at the end of this round, if any.
    pub eliminated: Option<String>,
    /// Number of ballots with no remaining choice at the start of this round.
    pub exhausted: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct RunoffOutcome {
    pub winner: Winner,
    pub rounds: u32,
    #[serde(rename = "finalCounts")]
    pub final_counts: Tally,
    #[serde(rename = "roundStats")]
    pub round_stats: Vec<RoundStats>,
}

/// The authoritative outcome of a voting round.
///
/// Plurality and cumulative voting only produce counts. Instant-runoff
/// produces a winner, unless it could not converge within the round cap, in
/// which case the first preferences are returned instead. Callers branch on
/// the presence of a winner.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FinalResult {
    Runoff(RunoffOutcome),
    Counts(Tally),
}

impl FinalResult {
    pub fn winner(&self) -> Option<&Winner> {
        match self {
            FinalResult::Runoff(outcome) => Some(&outcome.winner),
            FinalResult::Counts(_) => None,
        }
    }

    /// The counts of the last round for a runoff, or the plain counts otherwise.
    pub fn counts(&self) -> &Tally {
        match self {
            FinalResult::Runoff(outcome) => &outcome.final_counts,
            FinalResult::Counts(tally) => tally,
        }
    }
}

/// Reasons for rejecting a ballot. A rejected ballot leaves the tally untouched.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum BallotError {
    /// The payload does not contain the field required by the voting method.
    MissingField { field: &'static str },
    /// The field is present but does not have the expected JSON type.
    WrongShape {
        field: &'static str,
        expected: &'static str,
    },
    /// The ballot does not name any candidate.
    EmptyBallot,
    /// A ranked ballot names the same candidate twice.
    DuplicateCandidate { candidate: String },
    /// A point allocation is not a non-negative integer.
    InvalidPoints { candidate: String },
    /// The allocated points do not add up to the budget.
    PointsMismatch { expected: u64, actual: u64 },
}

impl Error for BallotError {}

impl Display for BallotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BallotError::MissingField { field } => write!(f, "missing field {:?}", field),
            BallotError::WrongShape { field, expected } => {
                write!(f, "field {:?} should be {}", field, expected)
            }
            BallotError::EmptyBallot => write!(f, "the ballot is empty"),
            BallotError::DuplicateCandidate { candidate } => {
                write!(f, "candidate {:?} is ranked more than once", candidate)
            }
            BallotError::InvalidPoints { candidate } => write!(
                f,
                "points for {:?} must be a non-negative integer",
                candidate
            ),
            BallotError::PointsMismatch { expected, actual } => write!(
                f,
                "exactly {} points must be allocated, got {}",
                expected, actual
            ),
        }
    }
}

// ********* Configuration **********

/// How to pick the candidate to eliminate when several are tied for the
/// fewest first-choice votes.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// The smallest identifier is eliminated.
    Lexicographic,
    /// The candidate listed last in the candidate order is eliminated.
    /// Identifiers missing from the list go before any listed candidate.
    UseCandidateOrder,
    /// Reproducible pseudo-random order derived from a SHA-256 hash of the
    /// seed, the round and the candidate identifier.
    Random(u32),
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DuplicateCandidateMode {
    /// Reject ranked ballots that name a candidate more than once.
    Reject,
    /// Keep the first occurrence and drop the repeats.
    SkipDuplicate,
}

/// Everything needed to build a tally engine.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallySettings {
    pub method: VotingMethod,
    /// Budget of each cumulative ballot. Ignored by the other methods.
    pub points_per_voter: u32,
    pub tiebreak_mode: TieBreakMode,
    pub duplicate_candidate_mode: DuplicateCandidateMode,
}

impl TallySettings {
    pub const DEFAULT_POINTS_PER_VOTER: u32 = 5;

    pub const DEFAULT_SETTINGS: TallySettings = TallySettings {
        method: VotingMethod::Plurality,
        points_per_voter: TallySettings::DEFAULT_POINTS_PER_VOTER,
        tiebreak_mode: TieBreakMode::Lexicographic,
        duplicate_candidate_mode: DuplicateCandidateMode::SkipDuplicate,
    };

    /// Default settings for the given method and budget.
    ///
    /// A budget of zero cannot be satisfied by any ballot and is replaced by the default.
    pub fn new(method: VotingMethod, points_per_voter: u32) -> TallySettings {
        TallySettings {
            method,
            points_per_voter,
            ..TallySettings::DEFAULT_SETTINGS
        }
        .sanitized()
    }

    pub(crate) fn sanitized(self) -> TallySettings {
        if self.points_per_voter == 0 {
            warn!(
                "TallySettings: a budget of 0 points is not usable, using {}",
                TallySettings::DEFAULT_POINTS_PER_VOTER
            );
            TallySettings {
                points_per_voter: TallySettings::DEFAULT_POINTS_PER_VOTER,
                ..self
            }
        } else {
            self
        }
    }
}

impl Default for TallySettings {
    fn default() -> Self {
        TallySettings::DEFAULT_SETTINGS
    }
}
