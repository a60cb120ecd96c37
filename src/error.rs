// Error types for the fetch layer.
// Errors stay local to the orchestrator and are exposed through ListingState.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("inventory returned HTTP {status}")]
    Status { status: u16 },
    #[error("malformed inventory response: {0}")]
    Malformed(String),
    #[error("request timed out")]
    Timeout,
    #[error("invalid page cursor {cursor:?}: {reason}")]
    InvalidCursor { cursor: String, reason: String },
}

impl FetchError {
    /// Whether issuing the same request again can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::InvalidCursor { .. })
    }
}

// Convert reqwest errors into the fetch taxonomy
impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_decode() {
            FetchError::Malformed(error.to_string())
        } else if let Some(status) = error.status() {
            FetchError::Status {
                status: status.as_u16(),
            }
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

// Define a custom Result type using our FetchError
pub type FetchResult<T> = Result<T, FetchError>;
