//! Fee extraction.
//!
//! TRON exposes the cost of a transaction in up to three overlapping places
//! (an aggregated `cost` object, direct fee fields, and the `ret` receipt).
//! Exactly one of them is used per record so the same sun is never counted
//! twice.

use crate::units::{scale_i128, IntValue};
use crate::types::Network;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

/// Members of the aggregated `cost` object that carry a fee in sun
const COST_FEE_MEMBERS: [&str; 5] = [
    "net_fee",
    "energy_fee",
    "extra_energy_fee",
    "energy_penalty_total",
    "fee",
];

/// Fee fields that may appear directly on the record
const DIRECT_FEE_FIELDS: [&str; 3] = ["net_fee", "energy_fee", "energy_penalty_total"];

/// Where a fee was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSource {
    CostObject,
    DirectFields,
    Receipt,
    Companion,
}

/// Running sum of fee amounts in the ledger's smallest unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeAccumulator {
    units: i128,
}

impl FeeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fee field; absent, negative or unparsable values contribute nothing
    pub fn add_field(&mut self, value: Option<&Value>) {
        if let Some(units) = value.and_then(read_units) {
            self.units = self.units.saturating_add(units);
        }
    }

    pub fn units(&self) -> i128 {
        self.units
    }

    pub fn is_positive(&self) -> bool {
        self.units > 0
    }

    /// Convert to display units; an amount that cannot be represented counts as zero
    pub fn to_display(&self, decimals: u32) -> Decimal {
        scale_i128(self.units, decimals).unwrap_or(Decimal::ZERO)
    }
}

fn read_units(value: &Value) -> Option<i128> {
    IntValue::deserialize(value)
        .ok()
        .and_then(|v| v.to_i128().ok())
        .filter(|units| *units > 0)
}

fn sum_fields(object: &Value, fields: &[&str]) -> FeeAccumulator {
    let mut acc = FeeAccumulator::new();
    for field in fields {
        acc.add_field(object.get(*field));
    }
    acc
}

/// Steps 1 to 3 applied to a single record, first non-empty source wins
fn own_tron_fee(record: &Value) -> Option<(FeeSource, FeeAccumulator)> {
    if let Some(cost) = record.get("cost").filter(|c| c.is_object()) {
        let acc = sum_fields(cost, &COST_FEE_MEMBERS);
        if acc.is_positive() {
            return Some((FeeSource::CostObject, acc));
        }
    }

    let direct = sum_fields(record, &DIRECT_FEE_FIELDS);
    if direct.is_positive() {
        return Some((FeeSource::DirectFields, direct));
    }

    let receipt_fee = record
        .get("ret")
        .and_then(Value::as_array)
        .and_then(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("fee").and_then(read_units))
                .next()
        });

    receipt_fee.map(|units| (FeeSource::Receipt, FeeAccumulator { units }))
}

/// Locate the fee of a TRON record in sun, falling back to the companion
/// native record carrying the same transaction hash.
pub fn locate_tron_fee(
    record: &Value,
    companion: Option<&Value>,
) -> Option<(FeeSource, FeeAccumulator)> {
    own_tron_fee(record).or_else(|| {
        companion
            .and_then(own_tron_fee)
            .map(|(_, acc)| (FeeSource::Companion, acc))
    })
}

/// TRON fee in TRX; zero when no fee field is found anywhere
pub fn extract_tron_fee(record: &Value, companion: Option<&Value>) -> Decimal {
    locate_tron_fee(record, companion)
        .map(|(_, acc)| acc.to_display(Network::Tron.native_decimals()))
        .unwrap_or(Decimal::ZERO)
}

/// ETH fee: `gasPrice * gasUsed` wei in ETH, zero if either is missing
pub fn eth_fee(gas_price: Option<&IntValue>, gas_used: Option<&IntValue>) -> Decimal {
    let (price, used) = match (gas_price, gas_used) {
        (Some(price), Some(used)) => (price.to_i128(), used.to_i128()),
        _ => return Decimal::ZERO,
    };

    match (price, used) {
        (Ok(price), Ok(used)) => price
            .checked_mul(used)
            .and_then(|wei| scale_i128(wei, Network::Eth.native_decimals()).ok())
            .unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_cost_object_wins_over_direct_fields() {
        let record = json!({
            "cost": { "net_fee": 100000, "energy_fee": 200000 },
            "net_fee": 999000,
            "ret": [{ "fee": 777000 }]
        });
        assert_eq!(extract_tron_fee(&record, None), dec!(0.3));
        assert_eq!(
            locate_tron_fee(&record, None).map(|(s, _)| s),
            Some(FeeSource::CostObject)
        );
    }

    #[test]
    fn test_empty_cost_object_falls_through() {
        let record = json!({
            "cost": { "net_fee": 0, "energy_fee": 0 },
            "net_fee": "345000",
            "energy_penalty_total": 5000
        });
        assert_eq!(extract_tron_fee(&record, None), dec!(0.35));
    }

    #[test]
    fn test_receipt_fee_used_last() {
        let record = json!({ "ret": [{ "contractRet": "SUCCESS", "fee": 0 }, { "fee": 1100000 }] });
        assert_eq!(extract_tron_fee(&record, None), dec!(1.1));
        assert_eq!(
            locate_tron_fee(&record, None).map(|(s, _)| s),
            Some(FeeSource::Receipt)
        );
    }

    #[test]
    fn test_companion_consulted_only_when_record_has_no_fee() {
        let token = json!({ "transaction_id": "abc", "token_info": {} });
        let native = json!({ "txID": "abc", "ret": [{ "fee": 2000000 }] });
        assert_eq!(extract_tron_fee(&token, Some(&native)), dec!(2));

        let token_with_fee = json!({ "net_fee": 1000000 });
        assert_eq!(extract_tron_fee(&token_with_fee, Some(&native)), dec!(1));
    }

    #[test]
    fn test_no_fee_anywhere_is_zero() {
        assert_eq!(extract_tron_fee(&json!({}), None), Decimal::ZERO);
        assert_eq!(extract_tron_fee(&json!({ "net_fee": "abc" }), None), Decimal::ZERO);
    }

    #[test]
    fn test_eth_fee() {
        let price = IntValue("20000000000".to_string());
        let used = IntValue("21000".to_string());
        assert_eq!(eth_fee(Some(&price), Some(&used)), dec!(0.00042));
        assert_eq!(eth_fee(Some(&price), None), Decimal::ZERO);
    }
}
