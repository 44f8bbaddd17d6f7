//! Export projections over a finished run.
//!
//! Every projection is a pure function of the [`RunOutcome`]; calling one
//! twice yields identical bytes. Only the suggested file names carry the run
//! timestamp.

pub mod archive;
pub mod naming;
pub mod table;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

pub use archive::{
    collage_archive, collage_available, full_json_archive, markdown_archive, markdown_available,
    results_json_archive,
};
pub use naming::{export_stem, hash_code, NameAllocator};
pub use table::{detailed_csv, summary_csv, NO_RESULTS};

use crate::error::Result;
use crate::record::{RunOutcome, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Summary,
    Detailed,
    ResultsJson,
    FullJson,
    Markdown,
    Collage,
}

impl ExportKind {
    fn base_name(self) -> &'static str {
        match self {
            ExportKind::Summary => "batch_summary",
            ExportKind::Detailed => "batch_detailed_results",
            ExportKind::ResultsJson => "batch_json_results",
            ExportKind::FullJson => "batch_full_json_results",
            ExportKind::Markdown => "batch_markdown",
            ExportKind::Collage => "batch_collage",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ExportKind::Summary | ExportKind::Detailed => "csv",
            _ => "zip",
        }
    }

    /// Suggested download name, e.g. `image_batch_summary_1718031234567.csv`.
    pub fn file_name(self, source: SourceKind, stamp: &str) -> String {
        let prefix = match source {
            SourceKind::Url => "",
            SourceKind::File => "image_",
        };
        format!("{prefix}{}_{stamp}.{}", self.base_name(), self.extension())
    }

    pub fn render(self, outcome: &RunOutcome) -> Result<Vec<u8>> {
        match self {
            ExportKind::Summary => Ok(summary_csv(outcome).into_bytes()),
            ExportKind::Detailed => Ok(detailed_csv(outcome).into_bytes()),
            ExportKind::ResultsJson => results_json_archive(outcome),
            ExportKind::FullJson => full_json_archive(outcome),
            ExportKind::Markdown => markdown_archive(outcome),
            ExportKind::Collage => collage_archive(outcome),
        }
    }
}

/// Projections worth offering for this run. The summary is always offered;
/// the per-success projections need at least one success.
pub fn available_exports(outcome: &RunOutcome, notebook_mode: bool) -> Vec<ExportKind> {
    let mut kinds = vec![ExportKind::Summary];
    if !outcome.results.is_empty() {
        kinds.extend([
            ExportKind::Detailed,
            ExportKind::ResultsJson,
            ExportKind::FullJson,
        ]);
    }
    if markdown_available(outcome, notebook_mode) {
        kinds.push(ExportKind::Markdown);
    }
    if collage_available(outcome) {
        kinds.push(ExportKind::Collage);
    }
    kinds
}

/// Millisecond run stamp used in export file names.
pub fn run_stamp() -> String {
    Utc::now().timestamp_millis().to_string()
}

/// Write every available projection into `dir`, returning the paths written.
pub fn write_exports(
    outcome: &RunOutcome,
    dir: &Path,
    stamp: &str,
    notebook_mode: bool,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let source = outcome.source_kind();

    let mut written = Vec::new();
    for kind in available_exports(outcome, notebook_mode) {
        let path = dir.join(kind.file_name(source, stamp));
        let bytes = kind.render(outcome)?;
        fs::write(&path, &bytes)?;
        info!(export = ?kind, path = %path.display(), bytes = bytes.len(), "Wrote export");
        written.push(path);
    }
    Ok(written)
}
