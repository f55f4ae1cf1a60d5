use retry_utils::{RetryError, RetryableError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("API error: {message}")]
    Api { message: String },

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid wallet address: {address}")]
    InvalidAddress { address: String },

    #[error("{0}")]
    Retry(Box<RetryError<FetchError>>),
}

impl FetchError {
    /// Retry category. Everything except a bad address or an already
    /// exhausted retry is worth another attempt.
    pub fn classify(&self) -> RetryableError {
        match self {
            FetchError::RateLimited => RetryableError::RateLimit,
            FetchError::Timeout { .. } => RetryableError::Timeout,
            FetchError::Http { status, .. } if *status >= 500 => RetryableError::ServerError,
            FetchError::InvalidAddress { .. } | FetchError::Url(_) | FetchError::Retry(_) => {
                RetryableError::Other
            }
            _ => RetryableError::Network,
        }
    }

    /// Number of attempts behind this error, 1 unless retries were exhausted
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::Retry(inner) => inner.attempts(),
            _ => 1,
        }
    }
}

impl From<RetryError<FetchError>> for FetchError {
    fn from(err: RetryError<FetchError>) -> Self {
        match err {
            RetryError::NonRetryable(inner) => inner,
            exhausted => FetchError::Retry(Box::new(exhausted)),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}
