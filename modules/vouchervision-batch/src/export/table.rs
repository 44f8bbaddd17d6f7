//! CSV projections of a run.
//!
//! Keys, errors and string values are always quoted; numbers and booleans
//! are written bare.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::record::{ItemSource, RunOutcome, SourceKind};

pub const NO_RESULTS: &str = "No results to export";

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Quote only when the cell would otherwise break the row.
fn quote_if_needed(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        quote(s)
    } else {
        s.to_string()
    }
}

fn key_label(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Url => "URL",
        SourceKind::File => "Filename",
    }
}

/// One row per item, successes first.
pub fn summary_csv(outcome: &RunOutcome) -> String {
    if outcome.is_empty() {
        return NO_RESULTS.to_string();
    }

    let kind = outcome.source_kind();
    let header: &[&str] = match kind {
        SourceKind::Url => &["URL", "Status", "Error", "OCR Engine"],
        SourceKind::File => &["Filename", "FileSize", "FileType", "Status", "Error", "OCR Engine"],
    };

    let mut csv = header.join(",");
    csv.push('\n');

    for record in outcome.all_records() {
        let mut row = vec![quote(record.source_key())];

        if kind == SourceKind::File {
            match &record.item.source {
                ItemSource::File(file) => {
                    row.push(format!("{:.2}", file.size as f64 / 1024.0));
                    row.push(quote_if_needed(&file.media_type));
                }
                ItemSource::Url(_) => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }

        match record.error_message() {
            None => {
                let engines = record
                    .parsed()
                    .map(|resp| resp.engine_list())
                    .unwrap_or_default();
                row.push("Success".to_string());
                row.push(String::new());
                row.push(quote_if_needed(&engines));
            }
            Some(error) => {
                row.push("Failed".to_string());
                row.push(quote(error));
                row.push(String::new());
            }
        }

        csv.push_str(&row.join(","));
        csv.push('\n');
    }

    csv
}

/// One column per `formatted_json` field seen across the run's successes.
///
/// Successes without a `formatted_json` object are left out of this table.
pub fn detailed_csv(outcome: &RunOutcome) -> String {
    if outcome.results.is_empty() {
        return NO_RESULTS.to_string();
    }

    let rows: Vec<(&str, Map<String, Value>)> = outcome
        .results
        .iter()
        .filter_map(|record| {
            let formatted = record.parsed()?.formatted_json?;
            Some((record.source_key(), formatted))
        })
        .collect();

    let fields: BTreeSet<&str> = rows
        .iter()
        .flat_map(|(_, formatted)| formatted.keys().map(String::as_str))
        .collect();

    let mut header = vec![key_label(outcome.source_kind()).to_string()];
    header.extend(fields.iter().map(|f| quote_if_needed(f)));

    let mut csv = header.join(",");
    csv.push('\n');

    for (key, formatted) in &rows {
        let mut row = vec![quote(key)];
        row.extend(fields.iter().map(|field| render_cell(formatted.get(*field))));
        csv.push_str(&row.join(","));
        csv.push('\n');
    }

    csv
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v @ (Value::Object(_) | Value::Array(_))) => quote(&v.to_string()),
        Some(Value::String(s)) => quote(s),
        Some(other) => other.to_string(),
    }
}
