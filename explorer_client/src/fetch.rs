use crate::error::FetchError;
use crate::transport::{redact, HttpTransport};
use retry_utils::{retry_with_backoff, RequestPacer, RetryConfig, Sleeper};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Pacing and retry knobs shared by both explorers
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub request_delay: Duration,
    pub max_retries: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_millis(300),
            max_retries: 3,
        }
    }
}

impl FetchSettings {
    pub fn new(request_delay_ms: u64, max_retries: u32) -> Self {
        Self {
            request_delay: Duration::from_millis(request_delay_ms),
            max_retries,
        }
    }
}

/// Issues paced GET requests and retries failures with exponential backoff.
///
/// Backoff is seeded with the request delay, so attempt `n` waits
/// `request_delay * 2^n`.
pub struct RetryingFetchClient {
    transport: Arc<dyn HttpTransport>,
    retry: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
    pacer: RequestPacer,
}

impl RetryingFetchClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        settings: FetchSettings,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let retry = RetryConfig {
            max_retries: settings.max_retries,
            base_delay: settings.request_delay,
        };
        let pacer = RequestPacer::new(settings.request_delay, sleeper.clone());

        Self {
            transport,
            retry,
            sleeper,
            pacer,
        }
    }

    /// Start a new batch: the next request goes out without waiting
    pub fn start_batch(&self) {
        self.pacer.reset();
    }

    pub async fn fetch(&self, url: &Url) -> Result<Value, FetchError> {
        self.fetch_with(url, Ok).await
    }

    /// Fetch and validate in one retried unit, so an explorer envelope that
    /// reports failure is retried like a transport error.
    pub async fn fetch_with<T, F>(&self, url: &Url, validate: F) -> Result<T, FetchError>
    where
        F: Fn(Value) -> Result<T, FetchError>,
    {
        self.pacer.pace().await;
        debug!("🔍 Fetching {}", redact(url));

        let transport = self.transport.as_ref();
        let validate = &validate;

        retry_with_backoff(
            || async move {
                let body = transport.get_json(url).await?;
                validate(body)
            },
            &self.retry,
            self.sleeper.as_ref(),
            FetchError::classify,
        )
        .await
        .map_err(FetchError::from)
    }
}
