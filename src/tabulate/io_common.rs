use std::collections::HashSet;

use serde_json::Value as JSValue;
use vote_tally::ballot::{BALLOT_FIELD, BOOK_ID_FIELD};

/// The book identifiers mentioned in the ballots, in order of first appearance.
///
/// Used when no book list is provided.
pub fn infer_books(payloads: &[JSValue]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut books: Vec<String> = Vec::new();
    let mut add = |cid: &str| {
        if !cid.is_empty() && seen.insert(cid.to_string()) {
            books.push(cid.to_string());
        }
    };
    for payload in payloads.iter() {
        if let Some(cid) = payload.get(BOOK_ID_FIELD).and_then(|v| v.as_str()) {
            add(cid);
        }
        match payload.get(BALLOT_FIELD) {
            Some(JSValue::Array(choices)) => {
                for cid in choices.iter().filter_map(|c| c.as_str()) {
                    add(cid);
                }
            }
            Some(JSValue::Object(points)) => {
                for cid in points.keys() {
                    add(cid);
                }
            }
            _ => {}
        }
    }
    books
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn infers_books_in_order() {
        let payloads = vec![
            json!({"book_id": "b"}),
            json!({"ballot": ["c", "b", "a"]}),
            json!({"ballot": {"d": 3, "a": 2}}),
            json!({"ballot": [""]}),
            json!(null),
        ];
        assert_eq!(infer_books(&payloads), vec!["b", "c", "a", "d"]);
    }
}
