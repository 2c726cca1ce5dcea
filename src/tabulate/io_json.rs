// Reading ballots stored as JSON.

use crate::tabulate::*;

/// Reads a JSON array of ballots, each one a vote payload such as
/// `{"book_id": "book_1"}` or `{"ballot": ["book_2", "book_1"]}`.
pub fn read_json_ballots(path: &str) -> TabulateResult<Vec<JSValue>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    match js {
        JSValue::Array(ballots) => {
            debug!("read_json_ballots: {} ballots in {}", ballots.len(), path);
            Ok(ballots)
        }
        _ => NotABallotListSnafu { path }.fail(),
    }
}
