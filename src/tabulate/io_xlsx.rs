// Reading ballots from spreadsheets, typically exported from an online form.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use serde_json::{json, Map as JSMap};

use crate::tabulate::*;

/// Reads one ballot per row, skipping the header row.
///
/// The layout of the choice columns depends on the voting method:
/// - plurality: the first non-empty choice cell is the book,
/// - ranked choice: the non-empty choice cells, in column order,
/// - cumulative: the header names the books, the cells hold the points.
pub fn read_excel_ballots(
    path: &str,
    cfs: &FileSource,
    method: VotingMethod,
) -> TabulateResult<Vec<JSValue>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match &cfs.excel_worksheet_name {
        Some(name) => workbook.worksheet_range(name),
        None => workbook.worksheet_range_at(0),
    }
    .context(EmptyExcelSnafu { path })?
    .context(OpeningExcelSnafu { path })?;

    let mut rows = wrange.rows();
    let header = rows.next().context(EmptyExcelSnafu { path })?;
    debug!("read_excel_ballots: header: {:?}", header);
    let start_range = cfs.first_vote_column_index()?;
    let book_columns: Vec<String> = if method == VotingMethod::Cumulative {
        header_books(header.get(start_range..).unwrap_or(&[]))?
    } else {
        Vec::new()
    };

    let mut res: Vec<JSValue> = Vec::new();
    for (idx, row) in rows.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let choices = row.get(start_range..).unwrap_or(&[]);
        let ballot = match method {
            VotingMethod::Plurality => plurality_ballot(choices, lineno)?,
            VotingMethod::RankedChoice => ranked_ballot(choices, lineno)?,
            VotingMethod::Cumulative => cumulative_ballot(&book_columns, choices, lineno)?,
        };
        match ballot {
            Some(b) => {
                debug!("read_excel_ballots: line {}: {}", lineno, b);
                res.push(b);
            }
            None => debug!("read_excel_ballots: line {}: empty row, skipping", lineno),
        }
    }
    Ok(res)
}

fn header_books(cells: &[DataType]) -> TabulateResult<Vec<String>> {
    let mut books: Vec<String> = Vec::new();
    for cell in cells {
        match read_choice(cell, 1)? {
            Some(name) => books.push(name),
            None => whatever!("read_excel_ballots: empty book name in the header row"),
        }
    }
    Ok(books)
}

fn read_choice(cell: &DataType, lineno: usize) -> TabulateResult<Option<String>> {
    match cell {
        DataType::String(s) if s.trim().is_empty() => Ok(None),
        DataType::String(s) => Ok(Some(s.trim().to_string())),
        DataType::Int(i) => Ok(Some(i.to_string())),
        DataType::Float(f) if f.fract() == 0.0 => Ok(Some((*f as i64).to_string())),
        DataType::Float(f) => Ok(Some(f.to_string())),
        DataType::Empty => Ok(None),
        _ => whatever!(
            "read_choice: could not understand cell {:?} at line {}",
            cell,
            lineno
        ),
    }
}

fn read_points(cell: &DataType, lineno: usize) -> TabulateResult<Option<JSValue>> {
    match cell {
        DataType::Int(i) => Ok(Some(json!(i))),
        DataType::Float(f) if f.fract() == 0.0 && *f >= 0.0 => Ok(Some(json!(*f as u64))),
        // Kept as is: the ballot validation rejects them.
        DataType::Float(f) => Ok(Some(json!(f))),
        DataType::String(s) if s.trim().is_empty() => Ok(None),
        DataType::String(s) => match s.trim().parse::<u64>() {
            Ok(p) => Ok(Some(json!(p))),
            Err(_) => Ok(Some(json!(s))),
        },
        DataType::Empty => Ok(None),
        _ => whatever!(
            "read_points: could not understand cell {:?} at line {}",
            cell,
            lineno
        ),
    }
}

fn plurality_ballot(cells: &[DataType], lineno: usize) -> TabulateResult<Option<JSValue>> {
    for cell in cells {
        if let Some(cid) = read_choice(cell, lineno)? {
            return Ok(Some(json!({ "book_id": cid })));
        }
    }
    Ok(None)
}

fn ranked_ballot(cells: &[DataType], lineno: usize) -> TabulateResult<Option<JSValue>> {
    let mut ranking: Vec<String> = Vec::new();
    for cell in cells {
        // Skipped ranks are ignored.
        if let Some(cid) = read_choice(cell, lineno)? {
            ranking.push(cid);
        }
    }
    if ranking.is_empty() {
        Ok(None)
    } else {
        Ok(Some(json!({ "ballot": ranking })))
    }
}

fn cumulative_ballot(
    books: &[String],
    cells: &[DataType],
    lineno: usize,
) -> TabulateResult<Option<JSValue>> {
    let mut allocation: JSMap<String, JSValue> = JSMap::new();
    for (book, cell) in books.iter().zip(cells.iter()) {
        if let Some(points) = read_points(cell, lineno)? {
            allocation.insert(book.clone(), points);
        }
    }
    if allocation.is_empty() {
        Ok(None)
    } else {
        Ok(Some(json!({ "ballot": allocation })))
    }
}
