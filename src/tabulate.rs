use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use vote_tally::*;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tabulate::config_reader::*;
use crate::tabulate::io_common::infer_books;
use crate::tabulate::io_json::read_json_ballots;
use crate::tabulate::io_xlsx::read_excel_ballots;

pub mod config_reader;
mod io_common;
mod io_json;
mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum TabulateError {
    #[snafu(display("Error opening the spreadsheet {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The spreadsheet {path} has no data"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening the file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a positive integer"))]
    ParsingJsonNumber {},
    #[snafu(display("The file {path} does not contain a list of ballots"))]
    NotABallotList { path: String },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TabulateResult<T> = Result<T, TabulateError>;

/// What came out of recording a batch of ballots.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub accepted: usize,
    pub rejected: usize,
    pub public_results: Tally,
    pub final_results: FinalResult,
}

fn build_settings(config: Option<&ElectionConfig>, args: &Args) -> TabulateResult<TallySettings> {
    let method_name = args
        .voting_system
        .clone()
        .or_else(|| config.and_then(|c| c.voting_system.clone()))
        .unwrap_or_else(|| VotingMethod::Plurality.as_str().to_string());
    let points_per_voter = args
        .points_per_voter
        .or_else(|| config.and_then(|c| c.points_per_voter))
        .unwrap_or(TallySettings::DEFAULT_POINTS_PER_VOTER);
    let base = TallySettings::new(VotingMethod::from_name(&method_name), points_per_voter);
    let settings = match config {
        Some(c) => TallySettings {
            tiebreak_mode: c.tiebreak_mode()?,
            duplicate_candidate_mode: c.duplicate_candidate_mode(),
            ..base
        },
        None => base,
    };
    Ok(settings)
}

/// The ballot files to read, with their paths resolved.
fn ballot_sources(
    config: Option<(&ElectionConfig, &str)>,
    args: &Args,
) -> TabulateResult<Vec<(String, FileSource)>> {
    if let Some(input) = &args.input {
        let cfs = FileSource::from_input(
            input,
            args.input_type.clone(),
            args.excel_worksheet_name.clone(),
        );
        return Ok(vec![(input.clone(), cfs)]);
    }
    let (config, config_path) = match config {
        Some(x) => x,
        None => whatever!("No ballots to read: pass --input or a configuration with --config"),
    };
    if config.ballot_sources.is_empty() {
        whatever!("The configuration {} has no ballot sources", config_path);
    }
    let root_p = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu {})?;
    let sources = config
        .ballot_sources
        .iter()
        .map(|cfs| {
            let p = root_p.join(&cfs.file_path);
            (p.to_string_lossy().to_string(), cfs.clone())
        })
        .collect();
    Ok(sources)
}

fn read_ballots(path: &str, cfs: &FileSource, method: VotingMethod) -> TabulateResult<Vec<JSValue>> {
    info!("Reading ballots from {} ({})", path, cfs.provider);
    match cfs.provider.as_str() {
        "json" => read_json_ballots(path),
        "xlsx" => read_excel_ballots(path, cfs, method),
        x => whatever!("Provider {:?} not implemented", x),
    }
}

/// Records every payload and computes the results of the round.
pub fn tabulate_ballots(
    settings: &TallySettings,
    payloads: &[JSValue],
    books: &[String],
) -> VoteOutcome {
    let manager = VotingManager::new(settings.clone());
    let mut accepted = 0;
    let mut rejected = 0;
    for (idx, payload) in payloads.iter().enumerate() {
        match manager.record_vote(payload) {
            Ok(()) => accepted += 1,
            Err(e) => {
                warn!("tabulate_ballots: ballot {} rejected: {}", idx, e);
                debug!("tabulate_ballots: rejected payload: {}", payload);
                rejected += 1;
            }
        }
    }
    info!(
        "tabulate_ballots: {} ballots accepted, {} rejected",
        accepted, rejected
    );
    VoteOutcome {
        accepted,
        rejected,
        public_results: manager.public_results(),
        final_results: manager.final_results(books),
    }
}

fn build_summary_js(config: &OutputConfig, outcome: &VoteOutcome) -> JSValue {
    json!({
        "config": config,
        "ballots": {
            "accepted": outcome.accepted,
            "rejected": outcome.rejected,
        },
        "publicResults": outcome.public_results,
        "finalResults": outcome.final_results,
    })
}

fn book_label(books: &[BookRecord], cid: &str) -> String {
    match books.iter().find(|b| b.id == cid) {
        Some(BookRecord {
            title: Some(t),
            author: Some(a),
            ..
        }) => format!("{} ({} by {})", cid, t, a),
        Some(BookRecord { title: Some(t), .. }) => format!("{} ({})", cid, t),
        _ => cid.to_string(),
    }
}

fn log_results(outcome: &VoteOutcome, books: &[BookRecord]) {
    match outcome.final_results.winner() {
        Some(Winner::Candidate(cid)) => info!("Winner: {}", book_label(books, cid)),
        Some(Winner::Tie) => info!("No winner: tie"),
        None => {}
    }
    for (cid, count) in outcome.final_results.counts().iter() {
        info!("  {}: {}", book_label(books, cid), count);
    }
}

/// Where the summary goes. None means the standard output.
fn output_path(
    config: Option<(&ElectionConfig, &str)>,
    args: &Args,
) -> TabulateResult<Option<PathBuf>> {
    match args.out.as_deref() {
        Some("stdout") | Some("") => return Ok(None),
        Some(p) => return Ok(Some(PathBuf::from(p))),
        None => {}
    }
    if let Some((c, config_path)) = config {
        if let Some(dir) = &c.output_settings.output_directory {
            let root_p = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu {})?;
            return Ok(Some(root_p.join(dir).join("summary.json")));
        }
    }
    Ok(None)
}

fn write_summary(path: &Path, contents: &str) -> TabulateResult<()> {
    let path_s = path.to_string_lossy().to_string();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).context(WritingOutputSnafu { path: path_s.clone() })?;
        }
    }
    fs::write(path, contents).context(WritingOutputSnafu { path: path_s.clone() })?;
    info!("Summary written to {}", path_s);
    Ok(())
}

pub fn run_vote(args: &Args) -> TabulateResult<()> {
    let config = match &args.config {
        Some(p) => Some(read_config(p)?),
        None => None,
    };
    let config_with_path = config.as_ref().zip(args.config.as_deref());
    let settings = build_settings(config.as_ref(), args)?;
    info!("settings: {:?}", settings);

    let mut payloads: Vec<JSValue> = Vec::new();
    for (path, cfs) in ballot_sources(config_with_path, args)? {
        let mut file_data = read_ballots(&path, &cfs, settings.method)?;
        payloads.append(&mut file_data);
    }
    info!("Read {} ballots", payloads.len());

    let book_records: Vec<BookRecord> = config
        .as_ref()
        .map(|c| c.books.clone())
        .unwrap_or_default();
    let books: Vec<String> = if book_records.is_empty() {
        let inferred = infer_books(&payloads);
        debug!("run_vote: inferred books: {:?}", inferred);
        inferred
    } else {
        book_records.iter().map(|b| b.id.clone()).collect()
    };

    let outcome = tabulate_ballots(&settings, &payloads, &books);
    log_results(&outcome, &book_records);

    let output_config = OutputConfig {
        contest: config
            .as_ref()
            .map(|c| c.output_settings.contest_name.clone())
            .unwrap_or_default(),
        date: config
            .as_ref()
            .and_then(|c| c.output_settings.contest_date.clone()),
        voting_system: settings.method.as_str().to_string(),
        points_per_voter: if settings.method == VotingMethod::Cumulative {
            Some(settings.points_per_voter)
        } else {
            None
        },
    };
    let result_js = build_summary_js(&output_config, &outcome);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match output_path(config_with_path, args)? {
        Some(p) => write_summary(&p, &pretty_js_stats)?,
        None => println!("{}", pretty_js_stats),
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}
