//! Cross-source deduplication.
//!
//! The same on-chain event can surface through several sub-queries (an
//! incoming-token query and the generic transaction list, for example). Two
//! records are the same event when their hash and two-decimal amount agree.

use crate::types::CanonicalTransaction;
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    hash: String,
    amount: String,
}

impl DedupKey {
    pub fn new(hash: &str, amount: Decimal) -> Self {
        Self {
            hash: clean_hash(hash),
            amount: format_amount(amount),
        }
    }

    /// Build a key from persisted text columns. An amount that does not
    /// parse as a number is kept verbatim.
    pub fn from_strings(hash: &str, amount: &str) -> Self {
        let trimmed = amount.trim();
        let amount = match Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed)) {
            Ok(value) => format_amount(value),
            Err(_) => trimmed.to_string(),
        };
        Self {
            hash: clean_hash(hash),
            amount,
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.hash, self.amount)
    }
}

/// Strip leading non-hex markers (spreadsheet apostrophes and the like)
pub fn clean_hash(hash: &str) -> String {
    hash.trim()
        .trim_start_matches(|c: char| !c.is_ascii_hexdigit())
        .to_lowercase()
}

fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Anything that has a dedup identity
pub trait Dedupable {
    fn dedup_key(&self) -> DedupKey;
}

impl Dedupable for CanonicalTransaction {
    fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.id, self.amount)
    }
}

/// Keep the first record of every key that is not already in `seen`.
///
/// `seen` is not modified; duplicates inside `records` are still collapsed.
pub fn dedupe<T: Dedupable>(records: Vec<T>, seen: &HashSet<DedupKey>) -> Vec<T> {
    let mut batch_keys = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let key = record.dedup_key();
            !seen.contains(&key) && batch_keys.insert(key)
        })
        .collect()
}

/// Keys remembered from earlier batches, each with the newest timestamp
/// it was seen at.
///
/// One scope per pipeline instance; concurrent monitors must not share one.
/// Keys only enter the scope through [`Deduplicator::remember`], so a caller
/// can check candidates, try to persist them, and commit afterwards.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    seen: HashMap<DedupKey, i64>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records whose key is neither remembered nor in `external`.
    /// The scope itself is left untouched.
    pub fn fresh<T: Dedupable>(&self, records: Vec<T>, external: &HashSet<DedupKey>) -> Vec<T> {
        let mut batch_keys = HashSet::new();
        records
            .into_iter()
            .filter(|record| {
                let key = record.dedup_key();
                !self.seen.contains_key(&key) && !external.contains(&key) && batch_keys.insert(key)
            })
            .collect()
    }

    /// Commit the keys of records that reached their destination
    pub fn remember<'a>(&mut self, transactions: impl IntoIterator<Item = &'a CanonicalTransaction>) {
        for tx in transactions {
            let newest = self.seen.entry(tx.dedup_key()).or_insert(tx.timestamp);
            *newest = (*newest).max(tx.timestamp);
        }
    }

    /// Forget keys last seen before `start_ms`; returns how many were dropped.
    ///
    /// Records older than the window start can no longer be fetched, so
    /// their keys are dead weight.
    pub fn evict_before(&mut self, start_ms: i64) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, timestamp| *timestamp >= start_ms);
        before - self.seen.len()
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.seen.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Newest first. Records with equal timestamps come out in no particular order.
pub fn sort_by_timestamp_desc(transactions: &mut [CanonicalTransaction]) {
    transactions.sort_unstable_by_key(|tx| Reverse(tx.timestamp));
}
