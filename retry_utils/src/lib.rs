use async_trait::async_trait;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

pub mod pacer;

pub use pacer::RequestPacer;

/// Classification of errors for retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableError {
    /// 429 or an explorer "rate limit" envelope
    RateLimit,
    /// 5xx Server Error
    ServerError,
    /// Request exceeded its hard timeout
    Timeout,
    /// Connection refused, DNS failure, malformed body and the like
    Network,
    /// Other errors - don't retry
    Other,
}

/// Configuration for retry behavior.
///
/// Every retryable failure waits `base_delay * 2^attempt` before the next
/// attempt, where `attempt` counts from zero.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including initial attempt)
    pub max_retries: u32,
    /// Base delay the exponential backoff is seeded with
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(300),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// Backoff delay before retry number `attempt + 1`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Error, Debug)]
pub enum RetryError<E> {
    #[error("Failed after {retries} attempts: {last_error}")]
    Exhausted {
        retries: u32,
        attempts: u32,
        last_error: E,
    },
    #[error("{0}")]
    NonRetryable(E),
}

impl<E> RetryError<E> {
    /// The error returned by the final attempt
    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Exhausted { last_error, .. } => last_error,
            RetryError::NonRetryable(e) => e,
        }
    }

    /// Total number of attempts made, including the initial one
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::NonRetryable(_) => 1,
        }
    }
}

/// Suspension used between attempts. Injected so tests can observe
/// backoff without waiting on the wall clock.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately and remembers every requested delay
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

/// Retry an async operation with exponential backoff.
///
/// # Arguments
/// * `operation` - The async operation to retry (a closure returning a Future)
/// * `config` - Retry configuration
/// * `sleeper` - Where backoff delays are spent
/// * `classify_error` - Function to classify errors for retry strategy
///
/// # Returns
/// * `Ok(T)` - Operation succeeded (either on first attempt or after retries)
/// * `Err(RetryError::Exhausted)` - every attempt failed; `1 + max_retries` attempts were made
/// * `Err(RetryError::NonRetryable)` - the error was classified as `Other`
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    config: &RetryConfig,
    sleeper: &dyn Sleeper,
    classify_error: impl Fn(&E) -> RetryableError,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("✅ Operation succeeded after {} retry attempts", attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                let error_type = classify_error(&e);

                if error_type == RetryableError::Other {
                    error!("❌ Operation failed with non-retryable error: {}", e);
                    return Err(RetryError::NonRetryable(e));
                }

                if attempt >= config.max_retries {
                    error!(
                        "❌ Operation failed after {} attempts (max retries exhausted): {}",
                        attempt + 1,
                        e
                    );
                    return Err(RetryError::Exhausted {
                        retries: config.max_retries,
                        attempts: attempt + 1,
                        last_error: e,
                    });
                }

                let delay = config.delay_for(attempt);

                warn!(
                    "⚠️  Operation failed (attempt {}/{}): {} - Retrying in {}ms (error type: {:?})",
                    attempt + 1,
                    config.max_retries + 1,
                    e,
                    delay.as_millis(),
                    error_type
                );

                sleeper.sleep(delay).await;

                attempt += 1;
            }
        }
    }
}
