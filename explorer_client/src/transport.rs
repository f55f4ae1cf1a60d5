use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, error};
use url::Url;

/// Hard per-request timeout used when none is configured
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// One GET request returning a JSON body
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get_json(&self, url: &Url) -> Result<Value, FetchError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_seconds: u64,
}

impl ReqwestTransport {
    pub fn new(timeout_seconds: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .connect_timeout(Duration::from_secs(timeout_seconds))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            timeout_seconds,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                seconds: self.timeout_seconds,
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_json(&self, url: &Url) -> Result<Value, FetchError> {
        debug!("📡 GET {}", redact(url));
        let start_time = Instant::now();

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let status = response.status();

        debug!(
            "📨 Response status: {} ({:.2}s)",
            status,
            start_time.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ Explorer API error - Status: {}, Body: {}", status, body);

            return Err(match status.as_u16() {
                429 => FetchError::RateLimited,
                code => FetchError::Http { status: code, body },
            });
        }

        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// URL with the `apikey` query value masked, for logging
pub fn redact(url: &Url) -> String {
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == "apikey" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), value)
        })
        .collect();

    if pairs.is_empty() {
        return masked.to_string();
    }

    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
