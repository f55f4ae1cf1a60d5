use crate::error::FetchError;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{error, info, warn};
use tx_normalizer::{Network, RawRecord, TimeWindow, WalletQueryResult};

/// One ledger's explorer, queried a wallet at a time
#[async_trait]
pub trait LedgerSource: Send + Sync {
    fn network(&self) -> Network;

    fn validate_address(&self, wallet: &str) -> bool;

    /// Reset request pacing at the start of an aggregation run
    fn start_batch(&self);

    /// Every sub-query this ledger needs, concatenated in a fixed order
    async fn fetch_wallet(
        &self,
        wallet: &str,
        window: &TimeWindow,
    ) -> Result<Vec<RawRecord>, FetchError>;
}

/// Fetch every wallet in turn.
///
/// Wallets are processed sequentially so the pacing delay holds across the
/// whole run. A wallet that fails (bad address, exhausted retries, explorer
/// error) gets an error entry and the loop moves on.
pub async fn fetch_all(
    source: &dyn LedgerSource,
    wallets: &[String],
    window: &TimeWindow,
) -> WalletQueryResult {
    let network = source.network();
    let mut results = WalletQueryResult::new();
    let mut visited = HashSet::new();

    info!("🔍 Fetching {} {} wallets", wallets.len(), network);
    source.start_batch();

    for wallet in wallets {
        if !visited.insert(wallet.as_str()) {
            warn!("⚠️ Wallet {} listed twice, skipping repeat", wallet);
            continue;
        }

        if !source.validate_address(wallet) {
            let err = FetchError::InvalidAddress {
                address: wallet.clone(),
            };
            error!("❌ {}", err);
            results.insert_error(wallet, err.to_string());
            continue;
        }

        match source.fetch_wallet(wallet, window).await {
            Ok(records) => {
                info!("✅ Fetched {} records for {} wallet {}", records.len(), network, wallet);
                results.insert_records(wallet, records);
            }
            Err(e) => {
                error!("❌ Failed to fetch {} wallet {}: {}", network, wallet, e);
                results.insert_error(wallet, e.to_string());
            }
        }
    }

    results
}
