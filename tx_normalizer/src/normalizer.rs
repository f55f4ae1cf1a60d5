use crate::mapper::{ChainMapper, MapOutcome};
use crate::types::{CanonicalTransaction, WalletError, WalletQueryResult, WalletRecords};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use tracing::{debug, warn};

/// Counters describing what happened to every raw record of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub mapped: usize,
    pub unclassified: usize,
    pub malformed: usize,
    pub rejected_token: usize,
    pub fee_only: usize,
    pub skipped_wallets: usize,
}

impl NormalizationStats {
    pub fn record(&mut self, outcome: &MapOutcome) {
        match outcome {
            MapOutcome::Mapped(_) => self.mapped += 1,
            MapOutcome::FeeOnly(_) => self.fee_only += 1,
            MapOutcome::Unrecognized => self.unclassified += 1,
            MapOutcome::Rejected(_) => self.rejected_token += 1,
            MapOutcome::Malformed(_) => self.malformed += 1,
        }
    }

    /// Records that produced a canonical transaction
    pub fn emitted(&self) -> usize {
        self.mapped + self.fee_only
    }
}

impl AddAssign for NormalizationStats {
    fn add_assign(&mut self, other: Self) {
        self.mapped += other.mapped;
        self.unclassified += other.unclassified;
        self.malformed += other.malformed;
        self.rejected_token += other.rejected_token;
        self.fee_only += other.fee_only;
        self.skipped_wallets += other.skipped_wallets;
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub transactions: Vec<CanonicalTransaction>,
    pub wallet_errors: Vec<WalletError>,
    pub stats: NormalizationStats,
}

/// Fold a per-wallet fetch result into canonical transactions.
///
/// Wallets whose entry is an error are skipped and reported, never treated
/// as having zero transactions.
pub fn normalize(
    results: &WalletQueryResult,
    mapper: &dyn ChainMapper,
    include_raw_data: bool,
) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    for (wallet, entry) in results.iter() {
        let records = match entry {
            WalletRecords::Fetched(records) => records,
            WalletRecords::Failed { error } => {
                warn!("⚠️ Skipping {} wallet {}: {}", mapper.network(), wallet, error);
                batch.stats.skipped_wallets += 1;
                batch.wallet_errors.push(WalletError {
                    wallet: wallet.clone(),
                    error: error.clone(),
                });
                continue;
            }
        };

        let outcomes = mapper.map_batch(wallet, records);
        for (record, outcome) in records.iter().zip(outcomes) {
            batch.stats.record(&outcome);

            match outcome {
                MapOutcome::Mapped(tx) | MapOutcome::FeeOnly(tx) => {
                    let tx = if include_raw_data {
                        tx.with_raw_data(record.body.clone())
                    } else {
                        tx
                    };
                    batch.transactions.push(tx);
                }
                MapOutcome::Unrecognized => {}
                MapOutcome::Rejected(reason) => {
                    debug!("Rejected record for {}: {}", wallet, reason);
                }
                MapOutcome::Malformed(e) => {
                    warn!("⚠️ Skipping malformed record for {}: {}", wallet, e);
                }
            }
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eth_mapper::EthMapper;
    use crate::types::{RawRecord, SubQuery};
    use serde_json::json;

    #[test]
    fn test_error_wallets_are_skipped_and_reported() {
        let mut results = WalletQueryResult::new();
        results.insert_error("0xbad", "Failed after 3 attempts: timeout");
        results.insert_records(
            "0x2",
            vec![
                RawRecord::new(
                    SubQuery::Native,
                    json!({ "hash": "0xabc", "timeStamp": "1700000000", "from": "0x1", "to": "0x2", "value": "1" }),
                ),
                RawRecord::new(SubQuery::Native, json!({ "unexpected": true })),
                RawRecord::new(SubQuery::Native, json!({ "hash": "0xdef", "timeStamp": "1" })),
            ],
        );

        let batch = normalize(&results, &EthMapper::new(), true);

        assert_eq!(batch.transactions.len(), 1);
        assert!(batch.transactions[0].raw_data.is_some());
        assert_eq!(
            batch.wallet_errors,
            vec![WalletError {
                wallet: "0xbad".to_string(),
                error: "Failed after 3 attempts: timeout".to_string()
            }]
        );
        assert_eq!(
            batch.stats,
            NormalizationStats {
                mapped: 1,
                unclassified: 1,
                malformed: 1,
                rejected_token: 0,
                fee_only: 0,
                skipped_wallets: 1,
            }
        );
    }

    #[test]
    fn test_stats_accumulate() {
        let mut total = NormalizationStats { mapped: 1, ..Default::default() };
        total += NormalizationStats { mapped: 2, fee_only: 1, ..Default::default() };
        assert_eq!(total.mapped, 3);
        assert_eq!(total.emitted(), 4);
    }
}
