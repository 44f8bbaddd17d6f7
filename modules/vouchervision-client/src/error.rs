use thiserror::Error;

pub type Result<T> = std::result::Result<T, VoucherVisionError>;

#[derive(Debug, Error)]
pub enum VoucherVisionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request options: {0}")]
    InvalidOptions(String),
}

impl From<reqwest::Error> for VoucherVisionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            VoucherVisionError::Parse(err.to_string())
        } else {
            VoucherVisionError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for VoucherVisionError {
    fn from(err: serde_json::Error) -> Self {
        VoucherVisionError::Parse(err.to_string())
    }
}
