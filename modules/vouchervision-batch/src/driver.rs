//! Bounded-concurrency batch driver.
//!
//! Every submission is polled from the calling task, so completions are
//! handled one at a time and the run state needs no lock. Nothing is spawned;
//! the submitter is borrowed for the length of the run.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, info};
use vouchervision_client::RequestOptions;

use crate::progress::{Progress, ProgressSink};
use crate::record::{Outcome, ResultRecord, RunOutcome, WorkItem};
use crate::submit::Submitter;

pub const DEFAULT_CONCURRENCY: usize = 3;

/// How queued items are released to the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schedule {
    /// Fixed windows of `concurrency` items. A window is dispatched only
    /// after every item of the previous one has completed, so one slow item
    /// holds back the next window.
    #[default]
    Windowed,
    /// Up to `concurrency` calls in flight at all times; the next queued item
    /// starts as soon as any call completes.
    Pool,
}

impl FromStr for Schedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "windowed" | "window" => Ok(Schedule::Windowed),
            "pool" => Ok(Schedule::Pool),
            other => Err(format!("unknown schedule '{other}' (expected windowed or pool)")),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Windowed => f.write_str("windowed"),
            Schedule::Pool => f.write_str("pool"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Peak number of in-flight calls. Values below 1 are treated as 1.
    pub concurrency: usize,
    pub schedule: Schedule,
    /// Per-call limit. `None` waits on a call indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            schedule: Schedule::default(),
            request_timeout: None,
        }
    }
}

/// Accumulator for a single run. Created fresh by [`run_batch`].
struct RunState {
    total: usize,
    completed: usize,
    successes: Vec<ResultRecord>,
    failures: Vec<ResultRecord>,
}

impl RunState {
    fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn record<P: ProgressSink + ?Sized>(&mut self, record: ResultRecord, sink: &P) {
        self.completed += 1;
        let progress = Progress {
            completed: self.completed,
            total: self.total,
        };
        sink.on_progress(progress, &record);

        match record.outcome {
            Outcome::Success(_) => self.successes.push(record),
            Outcome::Failure(_) => self.failures.push(record),
        }
    }

    fn finish(mut self) -> RunOutcome {
        self.successes.sort_by_key(|r| r.position);
        self.failures.sort_by_key(|r| r.position);
        RunOutcome {
            results: self.successes,
            errors: self.failures,
            total_processed: self.completed,
        }
    }
}

/// Submit every item and collect one [`ResultRecord`] per item.
///
/// Never fails: submission errors and timeouts become `Failure` records and
/// do not affect sibling items. `progress` is called after each individual
/// completion with a strictly increasing `completed` count.
pub async fn run_batch<S, P>(
    items: Vec<WorkItem>,
    config: &DriverConfig,
    submitter: &S,
    options: &RequestOptions,
    progress: &P,
) -> RunOutcome
where
    S: Submitter + ?Sized,
    P: ProgressSink + ?Sized,
{
    let concurrency = config.concurrency.max(1);
    let timeout = config.request_timeout;
    let total = items.len();
    let mut state = RunState::new(total);

    info!(total, concurrency, schedule = %config.schedule, "Starting batch run");

    match config.schedule {
        Schedule::Windowed => {
            let mut queue = items.into_iter().enumerate();
            let mut window_index = 0usize;
            loop {
                let window: Vec<(usize, WorkItem)> = queue.by_ref().take(concurrency).collect();
                if window.is_empty() {
                    break;
                }
                debug!(window = window_index, size = window.len(), "Dispatching window");

                let mut completions = stream::iter(window.into_iter().map(|(position, item)| {
                    attempt(submitter, options, timeout, position, item)
                }))
                .buffer_unordered(concurrency);

                while let Some(record) = completions.next().await {
                    state.record(record, progress);
                }
                window_index += 1;
            }
        }
        Schedule::Pool => {
            let mut completions = stream::iter(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(position, item)| attempt(submitter, options, timeout, position, item)),
            )
            .buffer_unordered(concurrency);

            while let Some(record) = completions.next().await {
                state.record(record, progress);
            }
        }
    }

    let outcome = state.finish();
    info!(
        succeeded = outcome.results.len(),
        failed = outcome.errors.len(),
        "Batch run complete"
    );
    outcome
}

async fn attempt<S: Submitter + ?Sized>(
    submitter: &S,
    options: &RequestOptions,
    timeout: Option<Duration>,
    position: usize,
    item: WorkItem,
) -> ResultRecord {
    debug!(position, key = item.key(), "Submitting item");

    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, submitter.submit(&item, options))
            .await
            .unwrap_or_else(|_| Err(anyhow::anyhow!("request timed out after {limit:?}"))),
        None => submitter.submit(&item, options).await,
    };

    let outcome = match result {
        Ok(response) => Outcome::Success(response),
        Err(e) => {
            debug!(position, key = item.key(), error = %e, "Submission failed");
            Outcome::Failure(format!("{e:#}"))
        }
    };

    ResultRecord {
        position,
        item,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_parses_case_insensitively() {
        assert_eq!("Pool".parse::<Schedule>().unwrap(), Schedule::Pool);
        assert_eq!(" windowed ".parse::<Schedule>().unwrap(), Schedule::Windowed);
        assert!("sliding".parse::<Schedule>().is_err());
    }

    #[test]
    fn run_state_counts_and_orders_by_position() {
        let mut state = RunState::new(3);
        let record = |position: usize, outcome: Outcome| ResultRecord {
            position,
            item: WorkItem::url(format!("http://a/{position}.jpg")),
            outcome,
        };

        state.record(record(2, Outcome::Success(serde_json::json!({}))), &crate::progress::NoProgress);
        state.record(record(1, Outcome::Failure("boom".into())), &crate::progress::NoProgress);
        state.record(record(0, Outcome::Success(serde_json::json!({}))), &crate::progress::NoProgress);

        let outcome = state.finish();
        assert_eq!(outcome.total_processed, 3);
        let positions: Vec<usize> = outcome.results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 2]);
        assert_eq!(outcome.errors[0].error_message(), Some("boom"));
    }
}
