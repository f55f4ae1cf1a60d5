//! Etherscan account module (`txlist`, `tokentx`).

use crate::aggregator::LedgerSource;
use crate::error::FetchError;
use crate::fetch::RetryingFetchClient;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use tx_normalizer::address::is_valid_eth_address;
use tx_normalizer::{Network, RawRecord, SubQuery, TimeWindow};
use url::Url;

pub const DEFAULT_ETHERSCAN_URL: &str = "https://api.etherscan.io/api";

const START_BLOCK: &str = "0";
const END_BLOCK: &str = "99999999";
const NO_TRANSACTIONS: &str = "No transactions found";

#[derive(Debug, Clone)]
pub struct EtherscanOptions {
    pub api_base_url: String,
    pub api_key: String,
}

impl Default for EtherscanOptions {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_ETHERSCAN_URL.to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EtherscanEnvelope {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

/// Unwrap `{status, message, result}`. Status `0` is an error unless the
/// explorer is just saying there is nothing to list.
fn parse_envelope(body: Value) -> Result<Vec<Value>, FetchError> {
    let envelope: EtherscanEnvelope = serde_json::from_value(body)?;

    if envelope.status == "1" {
        return match envelope.result {
            Value::Array(items) => Ok(items),
            other => Err(FetchError::Api {
                message: format!("expected a result list, got {}", other),
            }),
        };
    }

    if envelope.message.contains(NO_TRANSACTIONS) {
        return Ok(Vec::new());
    }

    let detail = match &envelope.result {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };

    if detail.to_lowercase().contains("rate limit") {
        return Err(FetchError::RateLimited);
    }

    Err(FetchError::Api {
        message: format!("{}: {}", envelope.message, detail),
    })
}

/// Whether `record.timeStamp` (seconds) falls inside the window.
/// Records without a readable timestamp are kept for the mapper to judge.
fn within(window: &TimeWindow, record: &Value) -> bool {
    let seconds = match record.get("timeStamp") {
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(Value::Number(n)) => n.as_i64(),
        _ => None,
    };

    match seconds.and_then(|s| s.checked_mul(1000)) {
        Some(ms) => window.contains(ms),
        None => true,
    }
}

/// Fetches native then token transfers for one wallet and filters them to
/// the requested window client-side.
pub struct EtherscanSource {
    client: RetryingFetchClient,
    options: EtherscanOptions,
}

impl EtherscanSource {
    pub fn new(client: RetryingFetchClient, options: EtherscanOptions) -> Self {
        Self { client, options }
    }

    fn account_url(&self, action: &str, wallet: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.options.api_base_url)?;
        url.query_pairs_mut()
            .append_pair("module", "account")
            .append_pair("action", action)
            .append_pair("address", wallet)
            .append_pair("startblock", START_BLOCK)
            .append_pair("endblock", END_BLOCK)
            .append_pair("sort", "desc")
            .append_pair("apikey", &self.options.api_key);
        Ok(url)
    }

    async fn list(&self, action: &str, wallet: &str, window: &TimeWindow) -> Result<Vec<Value>, FetchError> {
        let url = self.account_url(action, wallet)?;
        let records = self.client.fetch_with(&url, parse_envelope).await?;
        Ok(records.into_iter().filter(|r| within(window, r)).collect())
    }
}

#[async_trait]
impl LedgerSource for EtherscanSource {
    fn network(&self) -> Network {
        Network::Eth
    }

    fn validate_address(&self, wallet: &str) -> bool {
        is_valid_eth_address(wallet)
    }

    fn start_batch(&self) {
        self.client.start_batch();
    }

    async fn fetch_wallet(
        &self,
        wallet: &str,
        window: &TimeWindow,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let native = self.list("txlist", wallet, window).await?;
        let tokens = self.list("tokentx", wallet, window).await?;

        info!(
            "📊 ETH {}: {} native, {} ERC20 in window",
            wallet,
            native.len(),
            tokens.len()
        );

        Ok(native
            .into_iter()
            .map(|body| RawRecord::new(SubQuery::Native, body))
            .chain(tokens.into_iter().map(|body| RawRecord::new(SubQuery::Token, body)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchSettings;
    use crate::scripted::{Reply, ScriptedTransport};
    use retry_utils::RecordingSleeper;
    use serde_json::json;
    use std::sync::Arc;

    const WALLET: &str = "0x1111111111111111111111111111111111111111";

    fn source(transport: Arc<ScriptedTransport>) -> EtherscanSource {
        let client = RetryingFetchClient::new(
            transport,
            FetchSettings::default(),
            Arc::new(RecordingSleeper::new()),
        );
        EtherscanSource::new(
            client,
            EtherscanOptions {
                api_key: "KEY".to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_envelope_variants() {
        assert_eq!(
            parse_envelope(json!({ "status": "1", "message": "OK", "result": [{ "hash": "0x1" }] }))
                .unwrap()
                .len(),
            1
        );
        assert!(parse_envelope(json!({ "status": "0", "message": "No transactions found", "result": [] }))
            .unwrap()
            .is_empty());
        assert!(matches!(
            parse_envelope(json!({ "status": "0", "message": "NOTOK", "result": "Max rate limit reached" })),
            Err(FetchError::RateLimited)
        ));
        assert!(matches!(
            parse_envelope(json!({ "status": "0", "message": "NOTOK", "result": "Invalid API Key" })),
            Err(FetchError::Api { .. })
        ));
    }

    #[tokio::test]
    async fn test_window_filter_and_order() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(
                    "action=txlist",
                    vec![Reply::Json(json!({
                        "status": "1",
                        "message": "OK",
                        "result": [
                            { "hash": "0xin", "timeStamp": "1700000000" },
                            { "hash": "0xold", "timeStamp": "1600000000" }
                        ]
                    }))],
                )
                .route(
                    "action=tokentx",
                    vec![Reply::Json(json!({ "status": "0", "message": "No transactions found", "result": [] }))],
                ),
        );
        let source = source(transport.clone());
        let window = TimeWindow::new(1_699_999_000_000, 1_700_001_000_000);

        let records = source.fetch_wallet(WALLET, &window).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].body["hash"], "0xin");
        assert_eq!(records[0].source, SubQuery::Native);

        let requests = transport.requests();
        assert!(requests[0].contains("action=txlist"));
        assert!(requests[0].contains("apikey=KEY"));
        assert!(requests[1].contains("action=tokentx"));
    }
}
