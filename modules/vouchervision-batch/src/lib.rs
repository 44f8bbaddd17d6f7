pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod progress;
pub mod record;
pub mod source;
pub mod submit;

pub use config::Config;
pub use driver::{run_batch, DriverConfig, Schedule};
pub use error::{BatchError, Result};
pub use progress::{LogProgress, NoProgress, Progress, ProgressSink};
pub use record::{FileSource, ItemSource, Outcome, ResultRecord, RunOutcome, SourceKind, WorkItem};
pub use submit::Submitter;
pub use vouchervision_client::{ProcessResponse, RequestOptions};
