use crate::address::same_eth_address;
use crate::allowlist::TokenAllowList;
use crate::classifier::{parse_eth, EthRecord};
use crate::error::{NormalizeError, Result};
use crate::fee::eth_fee;
use crate::mapper::{apply_fee_only_rule, decimals_from, payer_fee, require_id, ChainMapper, MapOutcome};
use crate::raw::{EthNativeTransfer, EthTokenTransfer};
use crate::types::{
    format_timestamp, CanonicalTransaction, Direction, Network, RawRecord, Ticker,
    TransactionType, TxStatus, CONTRACT_INTERACTION,
};
use tracing::debug;

/// Maps Etherscan `txlist` and `tokentx` entries into canonical transactions
#[derive(Debug, Clone)]
pub struct EthMapper {
    allow_list: TokenAllowList,
}

impl Default for EthMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl EthMapper {
    pub fn new() -> Self {
        Self {
            allow_list: TokenAllowList::eth(),
        }
    }

    pub fn map(&self, record: &EthRecord, observer: &str) -> Result<MapOutcome> {
        match record {
            EthRecord::Native(native) => {
                let tx = base_transaction(native, observer)?;
                Ok(apply_fee_only_rule(tx))
            }
            EthRecord::Token(token) => self.map_token(token, observer),
        }
    }

    fn map_token(&self, token: &EthTokenTransfer, observer: &str) -> Result<MapOutcome> {
        let ticker = match self.allow_list.lookup(&token.contract_address) {
            Some(ticker) => ticker,
            None => {
                return Ok(MapOutcome::Rejected(format!(
                    "token contract {} ({}) is not allow-listed",
                    token.contract_address, token.token_symbol
                )))
            }
        };

        let decimals = decimals_from(&token.token_decimal)?;
        let mut tx = base_transaction(&token.base, observer)?;
        tx.amount = token.base.value.scaled(decimals)?;
        tx.ticker = ticker;
        tx.tx_type = TransactionType::Erc20;
        // Gas belongs to the txlist entry with the same hash
        tx.fee = None;
        tx.fee_currency = None;
        Ok(MapOutcome::Mapped(tx))
    }
}

/// Fields shared by native and token entries; amount is in ETH
fn base_transaction(native: &EthNativeTransfer, observer: &str) -> Result<CanonicalTransaction> {
    let id = require_id(&native.hash)?;

    let seconds = native.time_stamp.to_i128()?;
    let timestamp = i64::try_from(seconds)
        .ok()
        .and_then(|s| s.checked_mul(1000))
        .ok_or_else(|| NormalizeError::MalformedRecord(format!("{} timestamp out of range", id)))?;

    let to_address = if native.to.is_empty() {
        CONTRACT_INTERACTION.to_string()
    } else {
        native.to.clone()
    };

    let direction = Direction::derive(
        same_eth_address(&native.from, observer),
        same_eth_address(&to_address, observer),
    );

    let fee = payer_fee(
        eth_fee(native.gas_price.as_ref(), native.gas_used.as_ref()),
        direction,
    );

    Ok(CanonicalTransaction {
        id,
        timestamp,
        date: format_timestamp(timestamp),
        from_address: native.from.clone(),
        to_address,
        amount: native.value.scaled(Network::Eth.native_decimals())?,
        ticker: Ticker::Eth,
        tx_type: TransactionType::Eth,
        status: eth_status(native),
        network: Network::Eth,
        direction,
        fee,
        fee_currency: fee.map(|_| Ticker::Eth),
        raw_data: None,
    })
}

fn eth_status(native: &EthNativeTransfer) -> TxStatus {
    let receipt = native.txreceipt_status.as_deref();
    let error = native.is_error.as_deref();

    if receipt == Some("1") || error == Some("0") {
        TxStatus::Success
    } else if error == Some("1") {
        TxStatus::Fail
    } else {
        TxStatus::Unknown
    }
}

impl ChainMapper for EthMapper {
    fn network(&self) -> Network {
        Network::Eth
    }

    fn map_batch(&self, observer: &str, records: &[RawRecord]) -> Vec<MapOutcome> {
        debug!("Mapping {} ETH records for {}", records.len(), observer);

        records
            .iter()
            .map(|record| match parse_eth(&record.body) {
                Ok(Some(typed)) => self
                    .map(&typed, observer)
                    .unwrap_or_else(MapOutcome::Malformed),
                Ok(None) => MapOutcome::Unrecognized,
                Err(e) => MapOutcome::Malformed(e),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::{ETH_USDC, ETH_USDT};
    use crate::types::SubQuery;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};

    const WALLET: &str = "0x1111111111111111111111111111111111111111";

    fn map_one(body: Value, observer: &str) -> MapOutcome {
        let mapper = EthMapper::new();
        let mut outcomes = mapper.map_batch(observer, &[RawRecord::new(SubQuery::Native, body)]);
        outcomes.remove(0)
    }

    #[test]
    fn test_native_transfer_scales_wei() {
        let body = json!({
            "hash": "0xabc",
            "timeStamp": "1700000000",
            "from": "0x1",
            "to": "0x2",
            "value": "1000000000000000000"
        });
        let tx = map_one(body, "0x2").into_transaction().unwrap();

        assert_eq!(tx.id, "0xabc");
        assert_eq!(tx.timestamp, 1_700_000_000_000);
        assert_eq!(tx.amount, dec!(1.0));
        assert_eq!(tx.ticker, Ticker::Eth);
        assert_eq!(tx.network, Network::Eth);
        assert_eq!(tx.direction, Direction::In);
        assert_eq!(tx.status, TxStatus::Unknown);
        assert!(tx.fee.is_none());
    }

    #[test]
    fn test_status_markers() {
        let mut body = json!({
            "hash": "0xabc", "timeStamp": "1", "from": "0x1", "to": "0x2", "value": "0",
            "isError": "0", "txreceipt_status": ""
        });
        assert_eq!(map_one(body.clone(), WALLET).into_transaction().unwrap().status, TxStatus::Success);

        body["isError"] = json!("1");
        assert_eq!(map_one(body.clone(), WALLET).into_transaction().unwrap().status, TxStatus::Fail);

        body["txreceipt_status"] = json!("1");
        assert_eq!(map_one(body, WALLET).into_transaction().unwrap().status, TxStatus::Success);
    }

    #[test]
    fn test_fee_and_contract_creation() {
        let body = json!({
            "hash": "0xdef",
            "timeStamp": "1700000000",
            "from": WALLET.to_uppercase().replace("0X", "0x"),
            "to": "",
            "value": "0",
            "gasPrice": "1000000000",
            "gasUsed": "50000",
            "isError": "0"
        });
        match map_one(body, WALLET) {
            MapOutcome::FeeOnly(tx) => {
                assert_eq!(tx.amount, dec!(0.00005));
                assert_eq!(tx.tx_type, TransactionType::Fee);
                assert_eq!(tx.to_address, CONTRACT_INTERACTION);
                assert_eq!(tx.direction, Direction::Out);
            }
            other => panic!("expected fee-only, got {:?}", other),
        }
    }

    fn token_body(contract: &str, symbol: &str) -> Value {
        json!({
            "hash": "0xfeed",
            "timeStamp": "1700000000",
            "from": "0x2222222222222222222222222222222222222222",
            "to": WALLET,
            "value": "2500000",
            "tokenSymbol": symbol,
            "tokenDecimal": "6",
            "contractAddress": contract,
            "gasPrice": "1000000000",
            "gasUsed": "60000"
        })
    }

    #[test]
    fn test_allow_listed_token() {
        let tx = map_one(token_body(&ETH_USDT.to_uppercase().replace("0X", "0x"), "USDT"), WALLET)
            .into_transaction()
            .unwrap();
        assert_eq!(tx.amount, dec!(2.5));
        assert_eq!(tx.ticker, Ticker::Usdt);
        assert_eq!(tx.tx_type, TransactionType::Erc20);
        assert!(tx.fee.is_none());
        assert!(tx.fee_currency.is_none());
    }

    #[test]
    fn test_token_call_gas_reported_once() {
        let mapper = EthMapper::new();
        let call = json!({
            "hash": "0xt",
            "timeStamp": "1700000000",
            "from": WALLET,
            "to": ETH_USDT,
            "value": "0",
            "gasPrice": "1000000000",
            "gasUsed": "50000",
            "isError": "0"
        });
        let mut transfer = token_body(ETH_USDT, "USDT");
        transfer["hash"] = json!("0xt");
        transfer["from"] = json!(WALLET);
        transfer["to"] = json!("0x2222222222222222222222222222222222222222");
        transfer["gasUsed"] = json!("50000");

        let outcomes = mapper.map_batch(
            WALLET,
            &[
                RawRecord::new(SubQuery::Native, call),
                RawRecord::new(SubQuery::Token, transfer),
            ],
        );

        let gas: Decimal = outcomes
            .iter()
            .filter_map(MapOutcome::transaction)
            .map(|tx| match tx.tx_type {
                TransactionType::Fee => tx.amount,
                _ => tx.fee.unwrap_or(Decimal::ZERO),
            })
            .sum();
        assert_eq!(gas, dec!(0.00005));

        assert!(matches!(&outcomes[0], MapOutcome::FeeOnly(_)));
        let token = outcomes[1].transaction().unwrap();
        assert_eq!(token.tx_type, TransactionType::Erc20);
        assert_eq!(token.direction, Direction::Out);
        assert!(token.fee.is_none());
    }

    #[test]
    fn test_incoming_transfer_carries_no_fee() {
        let body = json!({
            "hash": "0xin",
            "timeStamp": "1700000000",
            "from": "0x2222222222222222222222222222222222222222",
            "to": WALLET,
            "value": "1000000000000000000",
            "gasPrice": "1000000000",
            "gasUsed": "21000"
        });
        let tx = map_one(body, WALLET).into_transaction().unwrap();
        assert_eq!(tx.direction, Direction::In);
        assert!(tx.fee.is_none());
        assert!(tx.fee_currency.is_none());
    }

    #[test]
    fn test_ticker_comes_from_allow_list_not_symbol() {
        let tx = map_one(token_body(ETH_USDC, "USDT"), WALLET)
            .into_transaction()
            .unwrap();
        assert_eq!(tx.ticker, Ticker::Usdc);
    }

    #[test]
    fn test_spoofed_token_rejected() {
        let outcome = map_one(
            token_body("0x0000000000000000000000000000000000000bad", "USDT"),
            WALLET,
        );
        assert!(matches!(outcome, MapOutcome::Rejected(_)));
    }

    #[test]
    fn test_zero_and_unrecognized() {
        let zero = json!({ "hash": "0x0", "timeStamp": "1", "from": "0x2", "to": WALLET, "value": "0" });
        assert_eq!(
            map_one(zero, WALLET).into_transaction().unwrap().amount,
            Decimal::ZERO
        );
        assert_eq!(map_one(json!({ "foo": 1 }), WALLET), MapOutcome::Unrecognized);
    }
}
