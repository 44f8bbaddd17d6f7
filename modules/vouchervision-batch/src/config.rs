use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;
use vouchervision_client::{RequestOptions, DEFAULT_BASE_URL};

use crate::driver::{DriverConfig, Schedule, DEFAULT_CONCURRENCY};
use crate::error::{BatchError, Result};

/// Batch client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,

    // Credentials; the API key wins when both are set.
    pub api_key: Option<String>,
    pub auth_token: Option<String>,

    // Driver
    pub concurrency: usize,
    pub schedule: Schedule,
    pub request_timeout: Option<Duration>,

    pub output_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let concurrency = match get("VV_CONCURRENCY") {
            Some(raw) => parse_concurrency(&raw)?,
            None => DEFAULT_CONCURRENCY,
        };

        let schedule = match get("VV_SCHEDULE") {
            Some(raw) => raw.parse::<Schedule>().map_err(BatchError::Config)?,
            None => Schedule::default(),
        };

        let request_timeout = match get("VV_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Some(parse_timeout(&raw)?),
            None => None,
        };

        Ok(Self {
            base_url: get("VV_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: get("VV_API_KEY"),
            auth_token: get("VV_AUTH_TOKEN"),
            concurrency,
            schedule,
            request_timeout,
            output_dir: get("VV_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            concurrency: self.concurrency,
            schedule: self.schedule,
            request_timeout: self.request_timeout,
        }
    }

    /// Attach whichever credential is configured to `options`.
    pub fn authorize(&self, options: RequestOptions) -> Result<RequestOptions> {
        match (&self.api_key, &self.auth_token) {
            (Some(key), _) => Ok(options.with_api_key(key.clone())),
            (None, Some(token)) => Ok(options.with_bearer_token(token.clone())),
            (None, None) => Err(BatchError::Config(
                "VV_API_KEY or VV_AUTH_TOKEN is required".to_string(),
            )),
        }
    }

    /// Log the effective configuration with credentials masked.
    pub fn log_redacted(&self) {
        info!(
            base_url = %self.base_url,
            api_key = %redact(self.api_key.as_deref()),
            auth_token = %redact(self.auth_token.as_deref()),
            concurrency = self.concurrency,
            schedule = %self.schedule,
            request_timeout = ?self.request_timeout,
            output_dir = %self.output_dir.display(),
            "Configuration loaded"
        );
    }
}

pub fn parse_concurrency(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(BatchError::Config(format!(
            "concurrency must be a positive integer, got '{raw}'"
        ))),
    }
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(BatchError::Config(format!(
            "VV_REQUEST_TIMEOUT_SECS must be a positive number of seconds, got '{raw}'"
        ))),
    }
}

/// First three and last two characters, the rest masked.
fn redact(secret: Option<&str>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 6 {
        return "•••••••".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}•••••••{tail}")
}
