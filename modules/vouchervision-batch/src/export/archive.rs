//! ZIP projections of a run.
//!
//! Entries carry a fixed modification time so the same run always produces
//! the same bytes.

use std::io::{Cursor, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tracing::warn;
use vouchervision_client::ProcessResponse;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::naming::NameAllocator;
use crate::error::Result;
use crate::record::{ResultRecord, RunOutcome};

fn write_zip(entries: Vec<(String, Vec<u8>)>) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for (name, bytes) in entries {
        zip.start_file(name, options)?;
        zip.write_all(&bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Build an archive from the successes, one entry per record that `render`
/// produces content for.
fn archive_successes<F>(outcome: &RunOutcome, extension: &str, mut render: F) -> Result<Vec<u8>>
where
    F: FnMut(&ResultRecord, &ProcessResponse) -> Result<Option<Vec<u8>>>,
{
    let mut names = NameAllocator::new();
    let mut entries = Vec::new();

    for record in &outcome.results {
        let Some(parsed) = record.parsed() else {
            continue;
        };
        if let Some(bytes) = render(record, &parsed)? {
            entries.push((names.allocate(&record.item, extension), bytes));
        }
    }

    write_zip(entries)
}

/// `formatted_json` of each success that has one, pretty-printed.
pub fn results_json_archive(outcome: &RunOutcome) -> Result<Vec<u8>> {
    archive_successes(outcome, "json", |_, parsed| {
        parsed
            .formatted_json
            .as_ref()
            .map(|formatted| serde_json::to_vec_pretty(&Value::Object(formatted.clone())))
            .transpose()
            .map_err(Into::into)
    })
}

/// Whole raw response of each success, pretty-printed.
pub fn full_json_archive(outcome: &RunOutcome) -> Result<Vec<u8>> {
    archive_successes(outcome, "json", |record, _| match record.response() {
        Some(response) => Ok(Some(serde_json::to_vec_pretty(response)?)),
        None => Ok(None),
    })
}

/// Markdown (or OCR text) of each success that has any.
pub fn markdown_archive(outcome: &RunOutcome) -> Result<Vec<u8>> {
    archive_successes(outcome, "md", |_, parsed| {
        Ok(parsed.markdown().map(|md| md.as_bytes().to_vec()))
    })
}

/// Decoded collage JPEG of each success that returned one.
pub fn collage_archive(outcome: &RunOutcome) -> Result<Vec<u8>> {
    archive_successes(outcome, "jpg", |record, parsed| {
        let Some(encoded) = parsed.image_collage.as_deref() else {
            return Ok(None);
        };
        match decode_collage(encoded) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => {
                warn!(key = record.source_key(), error = %e, "Skipping undecodable collage image");
                Ok(None)
            }
        }
    })
}

fn decode_collage(encoded: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let payload = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact)
}

/// Markdown export is offered only in notebook mode, and only when at least
/// one success carries text.
pub fn markdown_available(outcome: &RunOutcome, notebook_mode: bool) -> bool {
    notebook_mode
        && outcome
            .results
            .iter()
            .filter_map(ResultRecord::parsed)
            .any(|parsed| parsed.markdown().is_some())
}

pub fn collage_available(outcome: &RunOutcome) -> bool {
    outcome
        .results
        .iter()
        .filter_map(ResultRecord::parsed)
        .any(|parsed| parsed.image_collage.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_collage_accepts_data_urls_and_wrapped_lines() {
        assert_eq!(decode_collage("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_collage("data:image/jpeg;base64,aGVs\nbG8=").unwrap(), b"hello");
        assert!(decode_collage("***").is_err());
    }
}
