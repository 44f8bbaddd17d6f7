//! Turns raw inputs into an ordered queue of [`WorkItem`]s.
//!
//! URL lists come from a CSV (one column holds the URL, the rest of the row
//! rides along as metadata) or a plain text file with one URL per line.
//! Image batches come from a directory scan filtered to `image/*` entries.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{BatchError, Result};
use crate::record::{FileSource, WorkItem};

/// Substrings that mark a header as a likely URL column, in priority order
/// per header.
const URL_COLUMN_MARKERS: [&str; 3] = ["url", "link", "image"];

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq)]
pub struct DelimitedInput {
    pub items: Vec<WorkItem>,
    /// Column the URLs were read from; differs from the hint when it was
    /// auto-detected.
    pub detected_column: String,
}

/// Parse CSV text with a header row into URL work items.
///
/// Uses `url_column_hint` when the header has it, otherwise the first header
/// containing `url`, `link` or `image` (case-insensitive). Rows whose URL is
/// blank are dropped.
pub fn parse_delimited(content: &str, url_column_hint: &str) -> Result<DelimitedInput> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(record);
    }

    if rows.is_empty() {
        return Err(BatchError::EmptyInput);
    }

    let column = resolve_url_column(&headers, url_column_hint)?;
    let detected_column = headers[column].clone();
    if detected_column != url_column_hint {
        debug!(column = %detected_column, hint = url_column_hint, "URL column auto-detected");
    }

    let items = rows
        .iter()
        .filter_map(|record| {
            let url = record.get(column).map(str::trim).unwrap_or_default();
            if url.is_empty() {
                return None;
            }
            let row: Map<String, Value> = headers
                .iter()
                .zip(record.iter())
                .map(|(name, value)| (name.clone(), Value::String(value.to_string())))
                .collect();
            Some(WorkItem::url(url).with_row(row))
        })
        .collect();

    Ok(DelimitedInput {
        items,
        detected_column,
    })
}

fn resolve_url_column(headers: &[String], hint: &str) -> Result<usize> {
    if let Some(idx) = headers.iter().position(|h| h == hint) {
        return Ok(idx);
    }

    headers
        .iter()
        .position(|h| {
            let lower = h.to_lowercase();
            URL_COLUMN_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .ok_or_else(|| BatchError::ColumnNotFound {
            column: hint.to_string(),
            available: headers.to_vec(),
        })
}

/// One URL per line; blank lines are skipped.
pub fn parse_line_list(content: &str) -> Vec<WorkItem> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(WorkItem::url)
        .collect()
}

/// Keep only files whose declared media type is `image/*`.
///
/// An empty result is not an error here; callers decide whether a batch
/// with nothing to send is acceptable.
pub fn select_image_files(files: Vec<FileSource>) -> Vec<WorkItem> {
    let total = files.len();
    let items: Vec<WorkItem> = files
        .into_iter()
        .filter(|f| f.media_type.to_lowercase().starts_with("image/"))
        .map(WorkItem::file)
        .collect();

    if items.len() < total {
        debug!(kept = items.len(), dropped = total - items.len(), "Filtered non-image files");
    }
    items
}

/// Read a `.csv` or `.txt` URL list from disk.
pub fn load_url_list(path: &Path, url_column_hint: &str) -> Result<Vec<WorkItem>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("csv") => {
            let content = fs::read_to_string(path)?;
            let parsed = parse_delimited(&content, url_column_hint)?;
            info!(
                path = %path.display(),
                column = %parsed.detected_column,
                urls = parsed.items.len(),
                "Loaded CSV URL list"
            );
            Ok(parsed.items)
        }
        Some("txt") => {
            let content = fs::read_to_string(path)?;
            let items = parse_line_list(&content);
            info!(path = %path.display(), urls = items.len(), "Loaded text URL list");
            Ok(items)
        }
        _ => Err(BatchError::UnsupportedInput(format!(
            "{}: expected a .csv or .txt file",
            path.display()
        ))),
    }
}

/// Recursively list regular files under `dir`, sorted by path, with a media
/// type guessed from the extension.
pub fn scan_image_dir(dir: &Path) -> Result<Vec<FileSource>> {
    if !dir.is_dir() {
        return Err(BatchError::UnsupportedInput(format!(
            "{}: not a directory",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let size = entry.metadata().map_err(std::io::Error::from)?.len();
        let path = entry.into_path();
        files.push(FileSource {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            media_type: media_type_for(&path).to_string(),
            size,
            path,
        });
    }

    info!(dir = %dir.display(), files = files.len(), "Scanned image directory");
    Ok(files)
}

pub fn media_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("jpg" | "jpeg" | "jpe") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        Some("avif") => "image/avif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => FALLBACK_MEDIA_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn media_type_is_case_insensitive() {
        assert_eq!(media_type_for(Path::new("a/B.JPG")), "image/jpeg");
        assert_eq!(media_type_for(Path::new("scan.TiF")), "image/tiff");
        assert_eq!(media_type_for(Path::new("notes")), FALLBACK_MEDIA_TYPE);
    }

    #[test]
    fn resolve_prefers_exact_hint() {
        let headers = vec!["image_link".to_string(), "url".to_string()];
        assert_eq!(resolve_url_column(&headers, "url").unwrap(), 1);
    }

    #[test]
    fn resolve_reports_available_columns() {
        let headers = vec!["id".to_string(), "notes".to_string()];
        let err = resolve_url_column(&headers, "url").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Column \"url\" not found. Available columns: id, notes"
        );
    }

    #[test]
    fn select_image_files_uses_declared_type() {
        let file = |name: &str, media_type: &str| FileSource {
            path: PathBuf::from(name),
            name: name.to_string(),
            size: 1,
            media_type: media_type.to_string(),
        };
        let items = select_image_files(vec![
            file("a.jpg", "image/jpeg"),
            file("b.pdf", "application/pdf"),
            file("c.PNG", "IMAGE/PNG"),
        ]);
        let keys: Vec<&str> = items.iter().map(WorkItem::key).collect();
        assert_eq!(keys, vec!["a.jpg", "c.PNG"]);
    }
}
