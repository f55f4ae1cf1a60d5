use crate::address::tron_display_address;
use crate::allowlist::TokenAllowList;
use crate::classifier::{parse_tron, TronRecord, TRON_TRANSFER_CONTRACT};
use crate::error::{NormalizeError, Result};
use crate::fee::extract_tron_fee;
use crate::mapper::{apply_fee_only_rule, decimals_from, payer_fee, require_id, ChainMapper, MapOutcome};
use crate::raw::{TronInternalTransfer, TronNativeTransfer, TronTokenTransfer};
use crate::types::{
    format_timestamp, CanonicalTransaction, Direction, Network, RawRecord, SubQuery, Ticker,
    TransactionType, TxStatus, CONTRACT_INTERACTION,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Contract return code of a successful execution
const TRON_SUCCESS: &str = "SUCCESS";

/// Key under `call_value` holding the TRX amount
const TRX_CALL_VALUE_KEY: &str = "_";

/// Maps TronGrid records into canonical transactions
#[derive(Debug, Clone)]
pub struct TronMapper {
    allow_list: TokenAllowList,
}

impl Default for TronMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl TronMapper {
    pub fn new() -> Self {
        Self {
            allow_list: TokenAllowList::tron(),
        }
    }

    /// Map one typed record. `companion` is the native record sharing the
    /// transaction hash, if the native sub-query returned one.
    pub fn map(
        &self,
        record: &TronRecord,
        raw: &Value,
        companion: Option<&Value>,
        observer: &str,
    ) -> Result<MapOutcome> {
        let observer = tron_display_address(observer);
        match record {
            TronRecord::Native(native) => self.map_native(native, raw, &observer),
            TronRecord::Token(token) => self.map_token(token, raw, companion, &observer),
            TronRecord::Internal(internal) => self.map_internal(internal, &observer),
        }
    }

    fn map_native(
        &self,
        native: &TronNativeTransfer,
        raw: &Value,
        observer: &str,
    ) -> Result<MapOutcome> {
        let contract = native
            .raw_data
            .contract
            .first()
            .filter(|c| c.contract_type == TRON_TRANSFER_CONTRACT)
            .ok_or_else(|| {
                NormalizeError::MalformedRecord(format!(
                    "{} has no {}",
                    native.tx_id, TRON_TRANSFER_CONTRACT
                ))
            })?;
        let value = &contract.parameter.value;

        let id = require_id(&native.tx_id)?;
        let timestamp = native
            .block_timestamp
            .or(native.raw_data.timestamp)
            .ok_or_else(|| NormalizeError::MalformedRecord(format!("{} has no timestamp", id)))?;

        let from_address = tron_display_address(&value.owner_address);
        let to_address = value
            .to_address
            .as_deref()
            .filter(|a| !a.is_empty())
            .map(tron_display_address)
            .unwrap_or_else(|| CONTRACT_INTERACTION.to_string());

        let amount = match &value.amount {
            Some(amount) => amount.scaled(Network::Tron.native_decimals())?,
            None => Decimal::ZERO,
        };

        let status = native_status(native);
        let direction = Direction::derive(from_address == observer, to_address == observer);
        let fee = payer_fee(extract_tron_fee(raw, None), direction);

        let tx = CanonicalTransaction {
            id,
            timestamp,
            date: format_timestamp(timestamp),
            from_address,
            to_address,
            amount,
            ticker: Ticker::Trx,
            tx_type: TransactionType::Trx,
            status,
            network: Network::Tron,
            direction,
            fee,
            fee_currency: fee.map(|_| Ticker::Trx),
            raw_data: None,
        };
        Ok(apply_fee_only_rule(tx))
    }

    fn map_token(
        &self,
        token: &TronTokenTransfer,
        raw: &Value,
        companion: Option<&Value>,
        observer: &str,
    ) -> Result<MapOutcome> {
        let ticker = match self.allow_list.lookup(&token.token_info.address) {
            Some(ticker) => ticker,
            None => {
                return Ok(MapOutcome::Rejected(format!(
                    "token contract {} is not allow-listed",
                    token.token_info.address
                )))
            }
        };

        let id = require_id(&token.transaction_id)?;
        let decimals = decimals_from(&token.token_info.decimals)?;
        let amount = token.value.scaled(decimals)?;

        let from_address = tron_display_address(&token.from);
        let to_address = token
            .to
            .as_deref()
            .filter(|a| !a.is_empty())
            .map(tron_display_address)
            .unwrap_or_else(|| CONTRACT_INTERACTION.to_string());

        // Transfer events are only emitted by executions that succeeded
        let status = companion
            .and_then(|c| c.pointer("/ret/0/contractRet"))
            .and_then(Value::as_str)
            .map(status_from_code)
            .unwrap_or(TxStatus::Success);

        let direction = Direction::derive(from_address == observer, to_address == observer);
        let fee = payer_fee(extract_tron_fee(raw, companion), direction);

        Ok(MapOutcome::Mapped(CanonicalTransaction {
            id,
            timestamp: token.block_timestamp,
            date: format_timestamp(token.block_timestamp),
            from_address,
            to_address,
            amount,
            ticker,
            tx_type: TransactionType::Trc20,
            status,
            network: Network::Tron,
            direction,
            fee,
            fee_currency: fee.map(|_| Ticker::Trx),
            raw_data: None,
        }))
    }

    fn map_internal(&self, internal: &TronInternalTransfer, observer: &str) -> Result<MapOutcome> {
        let id = require_id(&internal.tx_id)?;

        let call_value = internal
            .data
            .call_value
            .get(TRX_CALL_VALUE_KEY)
            .or_else(|| internal.data.call_value.values().next());

        let decimals = match &internal.token_info {
            Some(context) => decimals_from(&context.decimals)?,
            None => Network::Tron.native_decimals(),
        };

        let amount = match call_value {
            Some(value) => value.scaled(decimals)?,
            None => Decimal::ZERO,
        };

        let from_address = tron_display_address(&internal.from_address);
        let to_address = if internal.to_address.is_empty() {
            CONTRACT_INTERACTION.to_string()
        } else {
            tron_display_address(&internal.to_address)
        };

        let status = if internal.data.rejected {
            TxStatus::Fail
        } else {
            TxStatus::Success
        };
        let direction = Direction::derive(from_address == observer, to_address == observer);

        Ok(MapOutcome::Mapped(CanonicalTransaction {
            id,
            timestamp: internal.block_timestamp,
            date: format_timestamp(internal.block_timestamp),
            from_address,
            to_address,
            amount,
            ticker: Ticker::Trx,
            tx_type: TransactionType::TrxInternal,
            status,
            network: Network::Tron,
            direction,
            fee: None,
            fee_currency: None,
            raw_data: None,
        }))
    }
}

fn status_from_code(code: &str) -> TxStatus {
    if code == TRON_SUCCESS {
        TxStatus::Success
    } else {
        TxStatus::Fail
    }
}

fn native_status(native: &TronNativeTransfer) -> TxStatus {
    native
        .ret
        .first()
        .and_then(|r| r.contract_ret.as_deref())
        .map(status_from_code)
        .unwrap_or(TxStatus::Fail)
}

/// Index of native sub-query records by transaction hash
fn companion_index(records: &[RawRecord]) -> HashMap<&str, &Value> {
    records
        .iter()
        .filter(|r| r.source == SubQuery::Native)
        .filter_map(|r| r.body.get("txID").and_then(Value::as_str).map(|id| (id, &r.body)))
        .collect()
}

impl ChainMapper for TronMapper {
    fn network(&self) -> Network {
        Network::Tron
    }

    fn map_batch(&self, observer: &str, records: &[RawRecord]) -> Vec<MapOutcome> {
        let companions = companion_index(records);
        debug!(
            "Mapping {} TRON records for {} ({} native companions)",
            records.len(),
            observer,
            companions.len()
        );

        records
            .iter()
            .map(|record| {
                let typed = match parse_tron(&record.body) {
                    Ok(Some(typed)) => typed,
                    Ok(None) => return MapOutcome::Unrecognized,
                    Err(e) => return MapOutcome::Malformed(e),
                };

                let companion = match &typed {
                    TronRecord::Token(token) => companions.get(token.transaction_id.as_str()).copied(),
                    _ => None,
                };

                self.map(&typed, &record.body, companion, observer)
                    .unwrap_or_else(MapOutcome::Malformed)
            })
            .collect()
    }
}
