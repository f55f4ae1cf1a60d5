use crate::error::Result;
use crate::raw::{
    EthNativeTransfer, EthTokenTransfer, TronInternalTransfer, TronNativeTransfer,
    TronTokenTransfer,
};
use crate::types::Network;
use serde::Deserialize;
use serde_json::Value;

/// Tron contract type of a plain TRX transfer
pub const TRON_TRANSFER_CONTRACT: &str = "TransferContract";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    NativeTransfer,
    TokenTransfer,
    InternalTransfer,
    Unrecognized,
}

/// Decide what a raw record represents from its shape alone.
pub fn classify(network: Network, record: &Value) -> TransferKind {
    match network {
        Network::Tron => classify_tron(record),
        Network::Eth => classify_eth(record),
    }
}

fn classify_tron(record: &Value) -> TransferKind {
    // Internal records may carry a token context too
    if record.get("internal_tx_id").map_or(false, |v| !v.is_null()) {
        return TransferKind::InternalTransfer;
    }

    if record.get("token_info").map_or(false, Value::is_object) {
        return TransferKind::TokenTransfer;
    }

    let first_contract_type = record
        .pointer("/raw_data/contract/0/type")
        .and_then(Value::as_str);

    match first_contract_type {
        Some(TRON_TRANSFER_CONTRACT) => TransferKind::NativeTransfer,
        _ => TransferKind::Unrecognized,
    }
}

fn classify_eth(record: &Value) -> TransferKind {
    let has = |key: &str| record.get(key).map_or(false, |v| !v.is_null());

    if !(has("hash") && has("timeStamp")) {
        return TransferKind::Unrecognized;
    }

    if has("tokenSymbol") {
        TransferKind::TokenTransfer
    } else {
        TransferKind::NativeTransfer
    }
}

/// A TRON record narrowed to the variant its shape selected
#[derive(Debug, Clone)]
pub enum TronRecord {
    Native(TronNativeTransfer),
    Token(TronTokenTransfer),
    Internal(TronInternalTransfer),
}

#[derive(Debug, Clone)]
pub enum EthRecord {
    Native(EthNativeTransfer),
    Token(EthTokenTransfer),
}

/// Classify and type a TRON record.
///
/// `Ok(None)` means the shape is not a transfer at all; `Err` means the
/// shape matched a variant but the fields it guarantees were missing or
/// malformed.
pub fn parse_tron(record: &Value) -> Result<Option<TronRecord>> {
    let parsed = match classify_tron(record) {
        TransferKind::NativeTransfer => {
            Some(TronRecord::Native(TronNativeTransfer::deserialize(record)?))
        }
        TransferKind::TokenTransfer => {
            Some(TronRecord::Token(TronTokenTransfer::deserialize(record)?))
        }
        TransferKind::InternalTransfer => {
            Some(TronRecord::Internal(TronInternalTransfer::deserialize(record)?))
        }
        TransferKind::Unrecognized => None,
    };
    Ok(parsed)
}

pub fn parse_eth(record: &Value) -> Result<Option<EthRecord>> {
    let parsed = match classify_eth(record) {
        TransferKind::NativeTransfer => Some(EthRecord::Native(EthNativeTransfer::deserialize(record)?)),
        TransferKind::TokenTransfer => Some(EthRecord::Token(EthTokenTransfer::deserialize(record)?)),
        TransferKind::InternalTransfer | TransferKind::Unrecognized => None,
    };
    Ok(parsed)
}
