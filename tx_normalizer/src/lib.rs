pub mod address;
pub mod allowlist;
pub mod classifier;
pub mod dedup;
pub mod error;
pub mod eth_mapper;
pub mod fee;
pub mod mapper;
pub mod normalizer;
pub mod raw;
pub mod tron_mapper;
pub mod types;
pub mod units;

pub use allowlist::TokenAllowList;
pub use classifier::{classify, TransferKind};
pub use dedup::{dedupe, sort_by_timestamp_desc, DedupKey, Dedupable, Deduplicator};
pub use error::NormalizeError;
pub use eth_mapper::EthMapper;
pub use fee::{eth_fee, extract_tron_fee, FeeAccumulator};
pub use mapper::{ChainMapper, MapOutcome};
pub use normalizer::{normalize, NormalizationStats, NormalizedBatch};
pub use tron_mapper::TronMapper;
pub use types::*;
