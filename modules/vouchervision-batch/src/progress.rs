use tracing::{info, warn};

use crate::record::{Outcome, ResultRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

/// Receives one call per finished item, in completion order.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: Progress, record: &ResultRecord);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress, &ResultRecord) + Send + Sync,
{
    fn on_progress(&self, progress: Progress, record: &ResultRecord) {
        self(progress, record)
    }
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _progress: Progress, _record: &ResultRecord) {}
}

/// Emits a structured log line per completion.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_progress(&self, progress: Progress, record: &ResultRecord) {
        match &record.outcome {
            Outcome::Success(_) => info!(
                completed = progress.completed,
                total = progress.total,
                key = record.source_key(),
                "Item processed"
            ),
            Outcome::Failure(error) => warn!(
                completed = progress.completed,
                total = progress.total,
                key = record.source_key(),
                error = %error,
                "Item failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_of_empty_run_is_complete() {
        let p = Progress { completed: 0, total: 0 };
        assert_eq!(p.fraction(), 1.0);
        assert!(p.is_complete());
    }

    #[test]
    fn fraction_tracks_completed() {
        let p = Progress { completed: 1, total: 4 };
        assert_eq!(p.fraction(), 0.25);
        assert!(!p.is_complete());
    }
}
