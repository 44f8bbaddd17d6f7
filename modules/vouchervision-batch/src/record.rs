use std::path::PathBuf;

use serde_json::{Map, Value};
use vouchervision_client::ProcessResponse;

/// A local file queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub media_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSource {
    Url(String),
    File(FileSource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Url,
    File,
}

/// One unit of input. Has no identity beyond its position in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub source: ItemSource,
    /// Remaining columns of the input row, passed through untouched.
    pub original_row: Option<Map<String, Value>>,
}

impl WorkItem {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            source: ItemSource::Url(url.into()),
            original_row: None,
        }
    }

    pub fn file(file: FileSource) -> Self {
        Self {
            source: ItemSource::File(file),
            original_row: None,
        }
    }

    pub fn with_row(mut self, row: Map<String, Value>) -> Self {
        self.original_row = Some(row);
        self
    }

    /// Display and export key: the URL, or the file name.
    pub fn key(&self) -> &str {
        match &self.source {
            ItemSource::Url(url) => url.as_str(),
            ItemSource::File(file) => file.name.as_str(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self.source {
            ItemSource::Url(_) => SourceKind::Url,
            ItemSource::File(_) => SourceKind::File,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Raw decoded response body.
    Success(Value),
    /// Message text of whatever went wrong.
    Failure(String),
}

/// The outcome of processing one work item.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// Index of the item in the submitted queue.
    pub position: usize,
    pub item: WorkItem,
    pub outcome: Outcome,
}

impl ResultRecord {
    pub fn source_key(&self) -> &str {
        self.item.key()
    }

    pub fn original_row(&self) -> Option<&Map<String, Value>> {
        self.item.original_row.as_ref()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn response(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Success(response) => Some(response),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(message) => Some(message.as_str()),
        }
    }

    pub fn parsed(&self) -> Option<ProcessResponse> {
        self.response().map(ProcessResponse::from_value)
    }
}

/// Everything one batch run produced. Both lists are in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutcome {
    pub results: Vec<ResultRecord>,
    pub errors: Vec<ResultRecord>,
    pub total_processed: usize,
}

impl RunOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.errors.is_empty()
    }

    /// Kind of the run's inputs. Runs are built from one source, so the
    /// first record decides; an empty run counts as a URL run.
    pub fn source_kind(&self) -> SourceKind {
        self.results
            .first()
            .or_else(|| self.errors.first())
            .map(|r| r.item.kind())
            .unwrap_or(SourceKind::Url)
    }

    /// Successes followed by failures, the row order of the summary export.
    pub fn all_records(&self) -> impl Iterator<Item = &ResultRecord> {
        self.results.iter().chain(self.errors.iter())
    }
}
