use crate::{MonitorError, Result};
use explorer_client::{fetch_all, LedgerSource};
use std::collections::HashSet;
use tracing::info;
use tx_normalizer::{
    dedupe, normalize, sort_by_timestamp_desc, CanonicalTransaction, ChainMapper, DedupKey,
    NormalizationStats, Network, TimeWindow, WalletError,
};

/// Outcome of one pipeline run over one ledger
#[derive(Debug, Clone, Default)]
pub struct MonitorReport {
    /// Unique transactions, newest first
    pub transactions: Vec<CanonicalTransaction>,
    /// Wallets whose fetch failed, with the reason
    pub wallet_errors: Vec<WalletError>,
    pub stats: NormalizationStats,
    /// Records dropped as duplicates
    pub duplicates: usize,
}

/// Fetch, normalize, dedupe and sort for a single ledger
pub struct LedgerMonitor {
    source: Box<dyn LedgerSource>,
    mapper: Box<dyn ChainMapper>,
    include_raw_data: bool,
}

impl LedgerMonitor {
    pub fn new(
        source: Box<dyn LedgerSource>,
        mapper: Box<dyn ChainMapper>,
        include_raw_data: bool,
    ) -> Self {
        Self {
            source,
            mapper,
            include_raw_data,
        }
    }

    pub fn network(&self) -> Network {
        self.source.network()
    }

    /// Run the pipeline with per-batch dedup only.
    ///
    /// Fails only when `wallets` is empty; per-wallet and per-record
    /// failures end up in the report.
    pub async fn monitor(&self, wallets: &[String], window: &TimeWindow) -> Result<MonitorReport> {
        self.monitor_against(wallets, window, &HashSet::new()).await
    }

    /// Like [`LedgerMonitor::monitor`] but also drops records whose key is in `seen`
    pub async fn monitor_against(
        &self,
        wallets: &[String],
        window: &TimeWindow,
        seen: &HashSet<DedupKey>,
    ) -> Result<MonitorReport> {
        let network = self.network();
        if wallets.is_empty() {
            return Err(MonitorError::NoWallets(network.to_string()));
        }

        let results = fetch_all(self.source.as_ref(), wallets, window).await;
        let batch = normalize(&results, self.mapper.as_ref(), self.include_raw_data);

        let candidates = batch.transactions.len();
        let mut transactions = dedupe(batch.transactions, seen);
        let duplicates = candidates - transactions.len();
        sort_by_timestamp_desc(&mut transactions);

        info!(
            "📊 {} run: {} transactions ({} duplicates dropped), stats: {:?}",
            network,
            transactions.len(),
            duplicates,
            batch.stats
        );

        Ok(MonitorReport {
            transactions,
            wallet_errors: batch.wallet_errors,
            stats: batch.stats,
            duplicates,
        })
    }
}
