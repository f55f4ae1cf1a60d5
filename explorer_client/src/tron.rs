//! TronGrid v1 account queries.

use crate::aggregator::LedgerSource;
use crate::error::FetchError;
use crate::fetch::RetryingFetchClient;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use tx_normalizer::address::is_valid_tron_address;
use tx_normalizer::{Network, RawRecord, SubQuery, TimeWindow};
use url::Url;

pub const DEFAULT_TRONGRID_URL: &str = "https://api.trongrid.io";

/// Event type TronGrid reports for TRC20 transfers
const TRANSFER_EVENT: &str = "Transfer";

#[derive(Debug, Clone)]
pub struct TronGridOptions {
    pub api_base_url: String,
    pub page_limit: u32,
    pub max_pages: u32,
    pub include_internal: bool,
}

impl Default for TronGridOptions {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_TRONGRID_URL.to_string(),
            page_limit: 200,
            max_pages: 5,
            include_internal: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TronEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<Value>,
    meta: Option<TronMeta>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TronMeta {
    links: Option<TronLinks>,
}

#[derive(Debug, Deserialize)]
struct TronLinks {
    next: Option<String>,
}

struct TronPage {
    data: Vec<Value>,
    next: Option<String>,
}

fn parse_page(body: Value) -> Result<TronPage, FetchError> {
    let envelope: TronEnvelope = serde_json::from_value(body)?;
    if !envelope.success {
        return Err(FetchError::Api {
            message: envelope
                .error
                .unwrap_or_else(|| "TronGrid reported an unsuccessful request".to_string()),
        });
    }

    let next = envelope
        .meta
        .and_then(|m| m.links)
        .and_then(|l| l.next)
        .filter(|n| !n.is_empty());

    Ok(TronPage {
        data: envelope.data,
        next,
    })
}

/// Fetches incoming TRC20, outgoing TRC20, native and optionally internal
/// transfers for one wallet, in that order.
pub struct TronGridSource {
    client: RetryingFetchClient,
    options: TronGridOptions,
}

impl TronGridSource {
    pub fn new(client: RetryingFetchClient, options: TronGridOptions) -> Self {
        Self { client, options }
    }

    fn account_url(
        &self,
        wallet: &str,
        path: &str,
        window: &TimeWindow,
        extra: &[(&str, &str)],
    ) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!(
            "{}/v1/accounts/{}/{}",
            self.options.api_base_url.trim_end_matches('/'),
            wallet,
            path
        ))?;

        {
            let mut query = url.query_pairs_mut();
            for (key, value) in extra {
                query.append_pair(key, value);
            }
            query
                .append_pair("limit", &self.options.page_limit.to_string())
                .append_pair("min_timestamp", &window.start_ms.to_string())
                .append_pair("max_timestamp", &window.end_ms.to_string());
        }

        Ok(url)
    }

    /// Follow `meta.links.next` until exhausted or `max_pages` reached
    async fn fetch_paged(&self, first: Url) -> Result<Vec<Value>, FetchError> {
        let mut records = Vec::new();
        let mut next = Some(first);
        let mut pages = 0u32;

        while let Some(url) = next.take() {
            let page = self.client.fetch_with(&url, parse_page).await?;
            pages += 1;
            records.extend(page.data);

            if pages >= self.options.max_pages {
                if page.next.is_some() {
                    debug!("Stopping after {} pages for {}", pages, url.path());
                }
                break;
            }
            next = page.next.map(|n| Url::parse(&n)).transpose()?;
        }

        Ok(records)
    }

    async fn token_transfers(
        &self,
        wallet: &str,
        window: &TimeWindow,
        direction: &str,
    ) -> Result<Vec<Value>, FetchError> {
        let url = self.account_url(wallet, "transactions/trc20", window, &[(direction, "true")])?;
        let records = self.fetch_paged(url).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.get("type").and_then(Value::as_str) == Some(TRANSFER_EVENT))
            .collect())
    }
}

fn tag(source: SubQuery, bodies: Vec<Value>) -> impl Iterator<Item = RawRecord> {
    bodies.into_iter().map(move |body| RawRecord::new(source, body))
}

#[async_trait]
impl LedgerSource for TronGridSource {
    fn network(&self) -> Network {
        Network::Tron
    }

    fn validate_address(&self, wallet: &str) -> bool {
        is_valid_tron_address(wallet)
    }

    fn start_batch(&self) {
        self.client.start_batch();
    }

    async fn fetch_wallet(
        &self,
        wallet: &str,
        window: &TimeWindow,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let incoming = self.token_transfers(wallet, window, "only_to").await?;
        let outgoing = self.token_transfers(wallet, window, "only_from").await?;

        let native_url = self.account_url(wallet, "transactions", window, &[])?;
        let native = self.fetch_paged(native_url).await?;

        let internal = if self.options.include_internal {
            let url = self.account_url(wallet, "internal-transactions", window, &[])?;
            self.fetch_paged(url).await?
        } else {
            Vec::new()
        };

        info!(
            "📊 TRON {}: {} incoming TRC20, {} outgoing TRC20, {} native, {} internal",
            wallet,
            incoming.len(),
            outgoing.len(),
            native.len(),
            internal.len()
        );

        Ok(tag(SubQuery::IncomingToken, incoming)
            .chain(tag(SubQuery::OutgoingToken, outgoing))
            .chain(tag(SubQuery::Native, native))
            .chain(tag(SubQuery::Internal, internal))
            .collect())
    }
}
