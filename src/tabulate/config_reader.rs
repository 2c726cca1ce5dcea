use crate::tabulate::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    #[serde(rename = "votingSystem")]
    pub voting_system: String,
    #[serde(rename = "pointsPerVoter")]
    pub points_per_voter: Option<u32>,
}

/// A book record, as kept by the book collection.
/// Only the identifier matters for the tabulation.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub suggested_by: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstVoteColumnIndex")]
    pub _first_vote_column_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl FileSource {
    /// A source given on the command line. The provider is guessed from the
    /// extension when not specified.
    pub fn from_input(
        path: &str,
        input_type: Option<String>,
        excel_worksheet_name: Option<String>,
    ) -> FileSource {
        let provider = input_type.unwrap_or_else(|| {
            if path.to_lowercase().ends_with(".xlsx") {
                "xlsx".to_string()
            } else {
                "json".to_string()
            }
        });
        FileSource {
            provider,
            file_path: path.to_string(),
            _first_vote_column_index: None,
            excel_worksheet_name,
        }
    }

    /// The first column holding choices, 0-based. Defaults to the first column.
    pub fn first_vote_column_index(&self) -> TabulateResult<usize> {
        if self._first_vote_column_index.is_none() {
            return Ok(0);
        }
        let x = read_js_int(&self._first_vote_column_index)?;
        ensure!(x >= 1, ParsingJsonNumberSnafu {});
        Ok(x - 1)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "votingSystem")]
    pub voting_system: Option<String>,
    #[serde(rename = "pointsPerVoter")]
    pub points_per_voter: Option<u32>,
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: Option<String>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<String>,
    #[serde(rename = "rejectDuplicateCandidates")]
    pub reject_duplicate_candidates: Option<bool>,
    #[serde(default)]
    pub books: Vec<BookRecord>,
    #[serde(rename = "ballotSources", default)]
    pub ballot_sources: Vec<FileSource>,
}

impl ElectionConfig {
    pub fn tiebreak_mode(&self) -> TabulateResult<TieBreakMode> {
        let mode = match self.tiebreak_mode.as_deref() {
            None | Some("lexicographic") => TieBreakMode::Lexicographic,
            Some("useCandidateOrder") => TieBreakMode::UseCandidateOrder,
            Some("random") => {
                let seed = match self.random_seed.clone().map(|s| s.parse::<u32>()) {
                    Some(Result::Ok(x)) => x,
                    x => {
                        whatever!("Cannot use tiebreak mode random with seed {:?}", x)
                    }
                };
                TieBreakMode::Random(seed)
            }
            Some(x) => {
                whatever!("Cannot use tiebreak mode {:?}: unknown mode", x)
            }
        };
        Ok(mode)
    }

    pub fn duplicate_candidate_mode(&self) -> DuplicateCandidateMode {
        match self.reject_duplicate_candidates {
            Some(true) => DuplicateCandidateMode::Reject,
            _ => DuplicateCandidateMode::SkipDuplicate,
        }
    }
}

pub fn read_config(path: &str) -> TabulateResult<ElectionConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ElectionConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> TabulateResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn read_js_int(x: &Option<JSValue>) -> TabulateResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_election_description() {
        let js = json!({
            "outputSettings": {"contestName": "Spring picks"},
            "votingSystem": "ranked_choice",
            "tiebreakMode": "random",
            "randomSeed": "12",
            "books": [{"id": "book_1", "title": "Dune", "author": "Frank Herbert"}],
            "ballotSources": [{"provider": "json", "filePath": "ballots.json"}]
        });
        let config: ElectionConfig = serde_json::from_value(js).unwrap();
        assert_eq!(config.output_settings.contest_name, "Spring picks");
        assert_eq!(config.voting_system.as_deref(), Some("ranked_choice"));
        assert_eq!(config.tiebreak_mode().unwrap(), TieBreakMode::Random(12));
        assert_eq!(
            config.duplicate_candidate_mode(),
            DuplicateCandidateMode::SkipDuplicate
        );
        assert_eq!(config.books[0].id, "book_1");
        assert_eq!(config.books[0].suggested_by, None);
        assert_eq!(
            config.ballot_sources[0].first_vote_column_index().unwrap(),
            0
        );
    }

    #[test]
    fn rejects_unknown_tiebreak() {
        let config: ElectionConfig =
            serde_json::from_value(json!({"tiebreakMode": "coinFlip"})).unwrap();
        assert!(config.tiebreak_mode().is_err());
        let config: ElectionConfig =
            serde_json::from_value(json!({"tiebreakMode": "random"})).unwrap();
        assert!(config.tiebreak_mode().is_err());
    }

    #[test]
    fn column_index() {
        let mut source = FileSource::from_input("votes.XLSX", None, None);
        assert_eq!(source.provider, "xlsx");
        source._first_vote_column_index = Some(json!("3"));
        assert_eq!(source.first_vote_column_index().unwrap(), 2);
        source._first_vote_column_index = Some(json!(0));
        assert!(source.first_vote_column_index().is_err());
        assert_eq!(
            FileSource::from_input("votes.json", None, None).provider,
            "json"
        );
    }
}
