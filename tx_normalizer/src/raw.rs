//! Typed views over the raw explorer payloads.
//!
//! Each struct only declares the fields its variant guarantees; anything
//! else in the JSON is ignored.

use crate::units::IntValue;
use serde::Deserialize;
use std::collections::BTreeMap;

// ---- TRON (TronGrid v1) ----

/// Native TRX transfer from `/v1/accounts/{address}/transactions`
#[derive(Debug, Clone, Deserialize)]
pub struct TronNativeTransfer {
    #[serde(rename = "txID")]
    pub tx_id: String,
    pub block_timestamp: Option<i64>,
    pub raw_data: TronRawData,
    #[serde(default)]
    pub ret: Vec<TronRet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TronRawData {
    pub timestamp: Option<i64>,
    pub contract: Vec<TronContract>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TronContract {
    #[serde(rename = "type")]
    pub contract_type: String,
    pub parameter: TronContractParameter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TronContractParameter {
    pub value: TronTransferValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TronTransferValue {
    pub amount: Option<IntValue>,
    pub owner_address: String,
    pub to_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TronRet {
    #[serde(rename = "contractRet")]
    pub contract_ret: Option<String>,
    pub fee: Option<IntValue>,
}

/// TRC20 transfer from `/v1/accounts/{address}/transactions/trc20`
#[derive(Debug, Clone, Deserialize)]
pub struct TronTokenTransfer {
    pub transaction_id: String,
    pub token_info: TronTokenInfo,
    pub block_timestamp: i64,
    pub from: String,
    pub to: Option<String>,
    pub value: IntValue,
    #[serde(rename = "type")]
    pub transfer_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TronTokenInfo {
    pub symbol: Option<String>,
    pub address: String,
    pub decimals: IntValue,
    pub name: Option<String>,
}

/// Value moved as a side effect of contract execution
#[derive(Debug, Clone, Deserialize)]
pub struct TronInternalTransfer {
    pub internal_tx_id: String,
    #[serde(alias = "hash", alias = "transaction_id")]
    pub tx_id: String,
    pub block_timestamp: i64,
    pub from_address: String,
    pub to_address: String,
    #[serde(default)]
    pub data: TronInternalData,
    pub token_info: Option<TronTokenContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TronInternalData {
    /// Token id → amount; `_` is TRX
    #[serde(default)]
    pub call_value: BTreeMap<String, IntValue>,
    #[serde(default)]
    pub rejected: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TronTokenContext {
    pub decimals: IntValue,
}

// ---- ETH (Etherscan account module) ----

/// `action=txlist` entry
#[derive(Debug, Clone, Deserialize)]
pub struct EthNativeTransfer {
    pub hash: String,
    #[serde(rename = "timeStamp")]
    pub time_stamp: IntValue,
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub value: IntValue,
    #[serde(rename = "gasPrice")]
    pub gas_price: Option<IntValue>,
    #[serde(rename = "gasUsed")]
    pub gas_used: Option<IntValue>,
    #[serde(rename = "isError")]
    pub is_error: Option<String>,
    pub txreceipt_status: Option<String>,
}

/// `action=tokentx` entry
#[derive(Debug, Clone, Deserialize)]
pub struct EthTokenTransfer {
    #[serde(flatten)]
    pub base: EthNativeTransfer,
    #[serde(rename = "tokenSymbol")]
    pub token_symbol: String,
    #[serde(rename = "tokenDecimal")]
    pub token_decimal: IntValue,
    #[serde(rename = "contractAddress")]
    pub contract_address: String,
    #[serde(rename = "tokenName")]
    pub token_name: Option<String>,
}
