use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tx_normalizer::{CanonicalTransaction, DedupKey, WalletError};

/// Destination of normalized transactions
#[async_trait]
pub trait TransactionSink: Send + Sync {
    /// Keys of everything already persisted
    async fn known_keys(&self) -> Result<HashSet<DedupKey>>;

    async fn persist(
        &self,
        transactions: &[CanonicalTransaction],
        wallet_errors: &[WalletError],
    ) -> Result<()>;
}

/// Writes every transaction to the log and keeps nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl TransactionSink for LogSink {
    async fn known_keys(&self) -> Result<HashSet<DedupKey>> {
        Ok(HashSet::new())
    }

    async fn persist(
        &self,
        transactions: &[CanonicalTransaction],
        wallet_errors: &[WalletError],
    ) -> Result<()> {
        for tx in transactions {
            info!(
                "{} {} {} {} {} {} -> {} [{}]",
                tx.date,
                tx.network,
                tx.direction.as_str(),
                tx.amount,
                tx.ticker,
                tx.from_address,
                tx.to_address,
                tx.id
            );
        }
        for err in wallet_errors {
            warn!("⚠️ Wallet {} failed: {}", err.wallet, err.error);
        }
        Ok(())
    }
}

/// One CSV line, the serialized canonical field set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow {
    id: String,
    timestamp: i64,
    date: String,
    from_address: String,
    to_address: String,
    amount: String,
    ticker: String,
    #[serde(rename = "type")]
    tx_type: String,
    status: String,
    network: String,
    direction: String,
    fee: String,
    fee_currency: String,
}

impl From<&CanonicalTransaction> for CsvRow {
    fn from(tx: &CanonicalTransaction) -> Self {
        Self {
            id: tx.id.clone(),
            timestamp: tx.timestamp,
            date: tx.date.clone(),
            from_address: tx.from_address.clone(),
            to_address: tx.to_address.clone(),
            amount: tx.amount.to_string(),
            ticker: tx.ticker.as_str().to_string(),
            tx_type: tx.tx_type.as_str().to_string(),
            status: tx.status.as_str().to_string(),
            network: tx.network.as_str().to_string(),
            direction: tx.direction.as_str().to_string(),
            fee: tx.fee.map(|f| f.to_string()).unwrap_or_default(),
            fee_currency: tx
                .fee_currency
                .map(|c| c.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}

const ID_COLUMN: &str = "id";
const AMOUNT_COLUMN: &str = "amount";

/// Appends transactions to a CSV file and reads back its dedup keys
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn has_rows(&self) -> bool {
        fs::metadata(&self.path).map(|m| m.len() > 0).unwrap_or(false)
    }

    fn column_positions(headers: &csv::StringRecord) -> Option<(usize, usize)> {
        let id = headers.iter().position(|h| h == ID_COLUMN)?;
        let amount = headers.iter().position(|h| h == AMOUNT_COLUMN)?;
        Some((id, amount))
    }

    fn read_keys(&self) -> Result<HashSet<DedupKey>> {
        if !self.has_rows() {
            return Ok(HashSet::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;
        let positions = Self::column_positions(reader.headers()?);
        let (id_col, amount_col) = match positions {
            Some(p) => p,
            None => {
                warn!("⚠️ {} has no id/amount columns", self.path.display());
                return Ok(HashSet::new());
            }
        };

        let mut keys = HashSet::new();
        for record in reader.records() {
            let record = record?;
            if let (Some(id), Some(amount)) = (record.get(id_col), record.get(amount_col)) {
                if !id.is_empty() && !amount.is_empty() {
                    keys.insert(DedupKey::from_strings(id, amount));
                }
            }
        }
        Ok(keys)
    }

    fn append(&self, transactions: &[CanonicalTransaction]) -> Result<()> {
        let write_headers = !self.has_rows();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_headers)
            .from_writer(file);
        for tx in transactions {
            writer.serialize(CsvRow::from(tx))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Rewrite the file keeping the first row of every dedup key.
    ///
    /// Rows without a hash or amount are kept untouched. Returns the number
    /// of rows removed.
    pub fn clean_duplicates(&self) -> Result<usize> {
        if !self.has_rows() {
            return Ok(0);
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let Some((id_col, amount_col)) = Self::column_positions(&headers) else {
            warn!("⚠️ {} has no id/amount columns, nothing to clean", self.path.display());
            return Ok(0);
        };

        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        let mut removed = 0usize;

        for record in reader.records() {
            let record = record?;
            let id = record.get(id_col).unwrap_or_default();
            let amount = record.get(amount_col).unwrap_or_default();

            if id.is_empty() || amount.is_empty() || seen.insert(DedupKey::from_strings(id, amount)) {
                kept.push(record);
            } else {
                removed += 1;
            }
        }

        if removed == 0 {
            return Ok(0);
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp_path)?;
            writer.write_record(&headers)?;
            for record in &kept {
                writer.write_record(record)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        info!(
            "🧹 Removed {} duplicate rows from {}",
            removed,
            self.path.display()
        );
        Ok(removed)
    }
}

#[async_trait]
impl TransactionSink for CsvSink {
    async fn known_keys(&self) -> Result<HashSet<DedupKey>> {
        self.read_keys()
    }

    async fn persist(
        &self,
        transactions: &[CanonicalTransaction],
        wallet_errors: &[WalletError],
    ) -> Result<()> {
        for err in wallet_errors {
            warn!("⚠️ Wallet {} failed: {}", err.wallet, err.error);
        }
        if transactions.is_empty() {
            return Ok(());
        }

        self.append(transactions)?;
        info!(
            "💾 Appended {} transactions to {}",
            transactions.len(),
            self.path.display()
        );
        Ok(())
    }
}
