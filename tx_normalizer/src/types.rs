use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ledger a record was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Network {
    Tron,
    Eth,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Tron => "TRON",
            Network::Eth => "ETH",
        }
    }

    /// Symbol of the ledger's own base asset
    pub fn native_ticker(&self) -> Ticker {
        match self {
            Network::Tron => Ticker::Trx,
            Network::Eth => Ticker::Eth,
        }
    }

    /// Decimal places of the native asset's smallest unit
    pub fn native_decimals(&self) -> u32 {
        match self {
            Network::Tron => 6,
            Network::Eth => 18,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset symbols a canonical record may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Ticker {
    Trx,
    Eth,
    Usdt,
    Usdc,
}

impl Ticker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ticker::Trx => "TRX",
            Ticker::Eth => "ETH",
            Ticker::Usdt => "USDT",
            Ticker::Usdc => "USDC",
        }
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    #[serde(rename = "TRX")]
    Trx,
    #[serde(rename = "TRC20")]
    Trc20,
    #[serde(rename = "TRX_INTERNAL")]
    TrxInternal,
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "ERC20")]
    Erc20,
    /// Synthetic record standing for a fee paid by a zero-value call
    #[serde(rename = "FEE")]
    Fee,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Trx => "TRX",
            TransactionType::Trc20 => "TRC20",
            TransactionType::TrxInternal => "TRX_INTERNAL",
            TransactionType::Eth => "ETH",
            TransactionType::Erc20 => "ERC20",
            TransactionType::Fee => "FEE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxStatus {
    Success,
    Fail,
    Unknown,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Success => "SUCCESS",
            TxStatus::Fail => "FAIL",
            TxStatus::Unknown => "UNKNOWN",
        }
    }
}

/// Direction relative to the observed wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
    #[serde(rename = "SELF")]
    SelfTransfer,
}

impl Direction {
    pub fn derive(is_sender: bool, is_receiver: bool) -> Self {
        match (is_sender, is_receiver) {
            (true, true) => Direction::SelfTransfer,
            (true, false) => Direction::Out,
            _ => Direction::In,
        }
    }

    pub fn is_outgoing(&self) -> bool {
        matches!(self, Direction::Out | Direction::SelfTransfer)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
            Direction::SelfTransfer => "SELF",
        }
    }
}

/// Placeholder receiver for contract creations and records without a receiver
pub const CONTRACT_INTERACTION: &str = "contract_interaction";

/// The ledger-agnostic transfer record produced by the chain mappers.
///
/// Created once per raw record and never mutated afterwards, except for the
/// optional `raw_data` attachment used for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTransaction {
    /// Ledger transaction hash
    pub id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Human readable UTC date, `YYYY-MM-DD HH:MM:SS`
    pub date: String,
    pub from_address: String,
    pub to_address: String,
    /// Display units, already scaled by the asset's decimals
    pub amount: Decimal,
    pub ticker: Ticker,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub status: TxStatus,
    pub network: Network,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fee: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fee_currency: Option<Ticker>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw_data: Option<serde_json::Value>,
}

impl CanonicalTransaction {
    pub fn with_raw_data(mut self, raw: serde_json::Value) -> Self {
        self.raw_data = Some(raw);
        self
    }
}

/// Format epoch milliseconds as `YYYY-MM-DD HH:MM:SS` (UTC)
pub fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Inclusive query window in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Window ending at `now_ms` and reaching `hours` back
    pub fn last_hours(hours: u64, now_ms: i64) -> Self {
        let span = (hours as i64).saturating_mul(60 * 60 * 1000);
        Self {
            start_ms: now_ms.saturating_sub(span),
            end_ms: now_ms,
        }
    }

    pub fn contains(&self, timestamp_ms: i64) -> bool {
        timestamp_ms >= self.start_ms && timestamp_ms <= self.end_ms
    }
}

/// Which sub-query produced a raw record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubQuery {
    IncomingToken,
    OutgoingToken,
    Token,
    Native,
    Internal,
}

/// Ledger-native JSON payload tagged with the sub-query it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub source: SubQuery,
    pub body: serde_json::Value,
}

impl RawRecord {
    pub fn new(source: SubQuery, body: serde_json::Value) -> Self {
        Self { source, body }
    }
}

/// One wallet's entry in a [`WalletQueryResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WalletRecords {
    Fetched(Vec<RawRecord>),
    Failed { error: String },
}

impl WalletRecords {
    pub fn is_error(&self) -> bool {
        matches!(self, WalletRecords::Failed { .. })
    }
}

/// Wallet address → fetched records or an error descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletQueryResult {
    entries: BTreeMap<String, WalletRecords>,
}

impl WalletQueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_records(&mut self, wallet: &str, records: Vec<RawRecord>) {
        self.entries
            .insert(wallet.to_string(), WalletRecords::Fetched(records));
    }

    pub fn insert_error(&mut self, wallet: &str, error: impl Into<String>) {
        self.entries.insert(
            wallet.to_string(),
            WalletRecords::Failed {
                error: error.into(),
            },
        );
    }

    pub fn get(&self, wallet: &str) -> Option<&WalletRecords> {
        self.entries.get(wallet)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &WalletRecords)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A failure scoped to one wallet, handed to the sink layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletError {
    pub wallet: String,
    pub error: String,
}
