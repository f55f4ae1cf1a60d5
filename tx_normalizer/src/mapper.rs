use crate::error::{NormalizeError, Result};
use crate::types::{CanonicalTransaction, Direction, Network, RawRecord, TransactionType};
use crate::units::IntValue;
use rust_decimal::Decimal;

/// What became of one raw record
#[derive(Debug, Clone, PartialEq)]
pub enum MapOutcome {
    Mapped(CanonicalTransaction),
    /// Zero-value outgoing call replaced by a record of the fee it paid
    FeeOnly(CanonicalTransaction),
    /// Shape is not a transfer this pipeline understands
    Unrecognized,
    /// A well-formed transfer the pipeline refuses, e.g. a token off the allow-list
    Rejected(String),
    Malformed(NormalizeError),
}

impl MapOutcome {
    pub fn transaction(&self) -> Option<&CanonicalTransaction> {
        match self {
            MapOutcome::Mapped(tx) | MapOutcome::FeeOnly(tx) => Some(tx),
            _ => None,
        }
    }

    pub fn into_transaction(self) -> Option<CanonicalTransaction> {
        match self {
            MapOutcome::Mapped(tx) | MapOutcome::FeeOnly(tx) => Some(tx),
            _ => None,
        }
    }
}

/// Converts one wallet's raw records for a single ledger into outcomes.
///
/// Works on the whole batch so that records can be paired with siblings
/// fetched by another sub-query (TRON token transfers and their native
/// transaction share a hash).
pub trait ChainMapper: Send + Sync {
    fn network(&self) -> Network;

    fn map_batch(&self, observer: &str, records: &[RawRecord]) -> Vec<MapOutcome>;
}

/// Apply the zero-amount rule: an outgoing transfer that moved nothing but
/// paid a fee is reported as the fee itself.
pub fn apply_fee_only_rule(tx: CanonicalTransaction) -> MapOutcome {
    let fee = tx.fee.unwrap_or(Decimal::ZERO);
    if tx.amount.is_zero() && tx.direction.is_outgoing() && fee > Decimal::ZERO {
        MapOutcome::FeeOnly(fee_only_record(tx, fee))
    } else {
        MapOutcome::Mapped(tx)
    }
}

fn fee_only_record(tx: CanonicalTransaction, fee: Decimal) -> CanonicalTransaction {
    CanonicalTransaction {
        amount: fee,
        ticker: tx.network.native_ticker(),
        tx_type: TransactionType::Fee,
        fee: None,
        fee_currency: None,
        ..tx
    }
}

/// `Some(fee)` only when a positive fee was found
pub fn positive_fee(fee: Decimal) -> Option<Decimal> {
    (fee > Decimal::ZERO).then_some(fee)
}

/// Fee charged to the observed wallet. Only the sending side pays, so
/// incoming records never carry the sender's cost.
pub fn payer_fee(fee: Decimal, direction: Direction) -> Option<Decimal> {
    if direction.is_outgoing() {
        positive_fee(fee)
    } else {
        None
    }
}

pub fn decimals_from(value: &IntValue) -> Result<u32> {
    let raw = value.to_i128()?;
    u32::try_from(raw).map_err(|_| {
        NormalizeError::MalformedRecord(format!("token decimals '{}' out of range", raw))
    })
}

pub fn require_id(id: &str) -> Result<String> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::MalformedRecord(
            "transaction hash is empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
