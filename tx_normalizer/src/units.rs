//! Conversion from integer base units to decimal display units.

use crate::error::{NormalizeError, Result};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest scale `rust_decimal` can represent
const MAX_DECIMALS: u32 = 28;

/// An integer amount that explorers report either as a JSON string or a JSON number.
///
/// Kept as its decimal digit string so values wider than 64 bits survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(transparent)]
pub struct IntValue(pub String);

impl IntValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as a non-negative integer
    pub fn to_i128(&self) -> Result<i128> {
        parse_base_units(&self.0)
    }

    /// Scale by `10^decimals`
    pub fn scaled(&self, decimals: u32) -> Result<Decimal> {
        scale_base_units(&self.0, decimals)
    }

    pub fn is_zero(&self) -> bool {
        self.0.trim().trim_start_matches('0').is_empty()
    }
}

impl<'de> Deserialize<'de> for IntValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IntValueVisitor;

        impl<'de> Visitor<'de> for IntValueVisitor {
            type Value = IntValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer or a string of digits")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<IntValue, E> {
                Ok(IntValue(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<IntValue, E> {
                Ok(IntValue(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<IntValue, E> {
                if v.fract() == 0.0 && v.is_finite() && v.abs() < 9.0e15 {
                    Ok(IntValue(format!("{}", v as i64)))
                } else {
                    Err(E::custom(format!("non-integer amount {}", v)))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<IntValue, E> {
                Ok(IntValue(v.trim().to_string()))
            }
        }

        deserializer.deserialize_any(IntValueVisitor)
    }
}

/// Parse a non-negative integer amount in base units
pub fn parse_base_units(raw: &str) -> Result<i128> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(NormalizeError::MalformedRecord(format!(
            "amount '{}' is not a non-negative integer",
            raw
        )));
    }
    trimmed
        .parse::<i128>()
        .map_err(|_| NormalizeError::AmountOverflow {
            value: trimmed.to_string(),
            decimals: 0,
        })
}

/// `raw / 10^decimals`, exact
pub fn scale_base_units(raw: &str, decimals: u32) -> Result<Decimal> {
    let units = parse_base_units(raw)?;
    scale_i128(units, decimals)
}

pub fn scale_i128(units: i128, decimals: u32) -> Result<Decimal> {
    if decimals > MAX_DECIMALS {
        return Err(NormalizeError::AmountOverflow {
            value: units.to_string(),
            decimals,
        });
    }
    Decimal::try_from_i128_with_scale(units, decimals)
        .map(|d| d.normalize())
        .map_err(|_| NormalizeError::AmountOverflow {
            value: units.to_string(),
            decimals,
        })
}
