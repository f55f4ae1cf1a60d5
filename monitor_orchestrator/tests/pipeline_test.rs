//! End-to-end pipeline runs against scripted explorer responses

use async_trait::async_trait;
use config_manager::SystemConfig;
use explorer_client::{Reply, ScriptedTransport};
use monitor_orchestrator::{
    eth_monitor, run_periodically, tron_monitor, CsvSink, LogSink, MonitorError,
    MultiLedgerMonitor, TransactionSink,
};
use retry_utils::RecordingSleeper;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tx_normalizer::{
    CanonicalTransaction, DedupKey, Direction, Network, Ticker, TimeWindow, TransactionType,
    TxStatus, WalletError,
};

const ETH_WALLET: &str = "0x1111111111111111111111111111111111111111";
const ETH_DOWN: &str = "0x2222222222222222222222222222222222222222";
const ETH_USDT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";

const TRON_WALLET: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
const TRON_WALLET_HEX: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";
const TRON_OTHER: &str = "T9yD14Nj9j7xAB4dbGeiX9h8unkKHxuWwb";
const TRON_OTHER_HEX: &str = "410000000000000000000000000000000000000000";
const TRON_USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

/// One hour window around 2023-11-14 22:13:20 UTC
const NOW_MS: i64 = 1_700_001_800_000;

fn etherscan_ok(result: Value) -> Reply {
    Reply::Json(json!({ "status": "1", "message": "OK", "result": result }))
}

fn trongrid_page(data: Value) -> Reply {
    Reply::Json(json!({ "success": true, "data": data, "meta": { "page_size": 1 } }))
}

fn eth_transport() -> Arc<ScriptedTransport> {
    Arc::new(
        ScriptedTransport::new()
            .route(&format!("address={}", ETH_DOWN), vec![Reply::Timeout])
            .route(
                "action=txlist",
                vec![etherscan_ok(json!([
                    {
                        "hash": "0xabc",
                        "timeStamp": "1700000000",
                        "from": "0x9999999999999999999999999999999999999999",
                        "to": ETH_WALLET,
                        "value": "1000000000000000000",
                        "isError": "0",
                        "txreceipt_status": "1"
                    },
                    {
                        "hash": "0xolder",
                        "timeStamp": "1699999000",
                        "from": ETH_WALLET,
                        "to": "0x9999999999999999999999999999999999999999",
                        "value": "0",
                        "gasPrice": "20000000000",
                        "gasUsed": "21000",
                        "isError": "0"
                    }
                ]))],
            )
            .route(
                "action=tokentx",
                vec![etherscan_ok(json!([
                    {
                        "hash": "0xfeed",
                        "timeStamp": "1700001000",
                        "from": "0x9999999999999999999999999999999999999999",
                        "to": ETH_WALLET,
                        "value": "2500000",
                        "tokenSymbol": "USDT",
                        "tokenDecimal": "6",
                        "contractAddress": ETH_USDT
                    },
                    {
                        "hash": "0xspam",
                        "timeStamp": "1700001000",
                        "from": "0x9999999999999999999999999999999999999999",
                        "to": ETH_WALLET,
                        "value": "1000000",
                        "tokenSymbol": "USDT",
                        "tokenDecimal": "6",
                        "contractAddress": "0x0000000000000000000000000000000000000bad"
                    }
                ]))],
            ),
    )
}

fn tron_transport() -> Arc<ScriptedTransport> {
    // A self-transfer surfaces through both token queries
    let self_transfer = json!({
        "transaction_id": "c0ffee",
        "token_info": { "symbol": "USDT", "address": TRON_USDT, "decimals": 6, "name": "Tether USD" },
        "block_timestamp": 1_700_000_500_000i64,
        "from": TRON_WALLET,
        "to": TRON_WALLET,
        "type": "Transfer",
        "value": "10000000"
    });

    Arc::new(
        ScriptedTransport::new()
            .route("only_to=true", vec![trongrid_page(json!([self_transfer.clone()]))])
            .route("only_from=true", vec![trongrid_page(json!([self_transfer]))])
            .route(
                "/transactions?",
                vec![trongrid_page(json!([
                    {
                        "txID": "c0ffee",
                        "raw_data": { "contract": [{ "type": "TriggerSmartContract" }] },
                        "ret": [{ "contractRet": "SUCCESS", "fee": 345000 }]
                    },
                    {
                        "txID": "beef01",
                        "block_timestamp": 1_700_001_000_000i64,
                        "raw_data": {
                            "contract": [{
                                "type": "TransferContract",
                                "parameter": { "value": {
                                    "amount": 5_000_000,
                                    "owner_address": TRON_OTHER_HEX,
                                    "to_address": TRON_WALLET_HEX
                                } }
                            }]
                        },
                        "ret": [{ "contractRet": "SUCCESS" }]
                    }
                ]))],
            ),
    )
}

fn eth_config() -> SystemConfig {
    let mut config = SystemConfig::default();
    config.etherscan.api_key = "KEY".to_string();
    config
}

#[tokio::test]
async fn test_eth_pipeline_isolates_failing_wallet() {
    let transport = eth_transport();
    let sleeper = Arc::new(RecordingSleeper::new());
    let monitor = eth_monitor(&eth_config(), transport.clone(), sleeper.clone());

    let wallets = vec![ETH_DOWN.to_string(), ETH_WALLET.to_string()];
    let window = TimeWindow::last_hours(1, NOW_MS);
    let report = monitor.monitor(&wallets, &window).await.unwrap();

    // 1 initial attempt + 3 retries for the failing wallet
    assert_eq!(transport.count(ETH_DOWN), 4);
    assert_eq!(report.wallet_errors.len(), 1);
    assert_eq!(report.wallet_errors[0].wallet, ETH_DOWN);
    assert!(report.wallet_errors[0].error.starts_with("Failed after 3 attempts: "));

    let ids: Vec<&str> = report.transactions.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["0xfeed", "0xabc", "0xolder"]);

    let native = &report.transactions[1];
    assert_eq!(native.timestamp, 1_700_000_000_000);
    assert_eq!(native.amount, dec!(1.0));
    assert_eq!(native.ticker, Ticker::Eth);
    assert_eq!(native.network, Network::Eth);
    assert_eq!(native.status, TxStatus::Success);
    assert_eq!(native.direction, Direction::In);

    let fee_only = &report.transactions[2];
    assert_eq!(fee_only.tx_type, TransactionType::Fee);
    assert_eq!(fee_only.amount, dec!(0.00042));

    assert_eq!(report.transactions[0].ticker, Ticker::Usdt);
    assert_eq!(report.stats.rejected_token, 1);
    assert_eq!(report.stats.skipped_wallets, 1);
    assert_eq!(report.stats.fee_only, 1);
}

#[tokio::test]
async fn test_tron_pipeline_collapses_duplicate_sightings() {
    let config = SystemConfig::default();
    let monitor = tron_monitor(&config, tron_transport(), Arc::new(RecordingSleeper::new()));

    let window = TimeWindow::last_hours(1, NOW_MS);
    let report = monitor
        .monitor(&[TRON_WALLET.to_string()], &window)
        .await
        .unwrap();

    assert_eq!(report.duplicates, 1);
    assert_eq!(report.stats.unclassified, 1);
    assert_eq!(report.transactions.len(), 2);

    let native = &report.transactions[0];
    assert_eq!(native.id, "beef01");
    assert_eq!(native.from_address, TRON_OTHER);
    assert_eq!(native.amount, dec!(5));
    assert_eq!(native.direction, Direction::In);

    let token = &report.transactions[1];
    assert_eq!(token.id, "c0ffee");
    assert_eq!(token.ticker, Ticker::Usdt);
    assert_eq!(token.direction, Direction::SelfTransfer);
    assert_eq!(token.fee, Some(dec!(0.345)));
}

#[tokio::test]
async fn test_monitor_is_idempotent() {
    let config = SystemConfig::default();
    let window = TimeWindow::last_hours(1, NOW_MS);
    let wallets = vec![TRON_WALLET.to_string()];

    let first = tron_monitor(&config, tron_transport(), Arc::new(RecordingSleeper::new()))
        .monitor(&wallets, &window)
        .await
        .unwrap();
    let second = tron_monitor(&config, tron_transport(), Arc::new(RecordingSleeper::new()))
        .monitor(&wallets, &window)
        .await
        .unwrap();

    assert_eq!(first.transactions, second.transactions);
}

#[tokio::test]
async fn test_empty_wallet_list_is_a_configuration_failure() {
    let monitor = eth_monitor(&eth_config(), eth_transport(), Arc::new(RecordingSleeper::new()));
    let result = monitor.monitor(&[], &TimeWindow::last_hours(1, NOW_MS)).await;
    assert!(matches!(result, Err(MonitorError::NoWallets(_))));

    let mut runner = MultiLedgerMonitor::new(Arc::new(LogSink), 1);
    assert!(matches!(
        runner.run_once(NOW_MS).await,
        Err(MonitorError::NoWallets(_))
    ));
}

#[tokio::test]
async fn test_second_run_persists_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(CsvSink::new(dir.path().join("ledger.csv")));
    let config = eth_config();
    let sleeper = Arc::new(RecordingSleeper::new());

    let mut runner = MultiLedgerMonitor::new(sink.clone(), 1)
        .with_ledger(
            tron_monitor(&config, tron_transport(), sleeper.clone()),
            vec![TRON_WALLET.to_string()],
        )
        .with_ledger(
            eth_monitor(&config, eth_transport(), sleeper),
            vec![ETH_WALLET.to_string()],
        );
    assert_eq!(runner.networks(), vec![Network::Tron, Network::Eth]);

    let first = runner.run_once(NOW_MS).await.unwrap();
    assert_eq!(first.persisted, 5);
    assert!(first.wallet_errors.is_empty());

    let second = runner.run_once(NOW_MS).await.unwrap();
    assert_eq!(second.persisted, 0);

    // A fresh runner sees the same rows through the CSV file
    let mut restarted = MultiLedgerMonitor::new(sink.clone(), 1).with_ledger(
        eth_monitor(&config, eth_transport(), Arc::new(RecordingSleeper::new())),
        vec![ETH_WALLET.to_string()],
    );
    assert_eq!(restarted.run_once(NOW_MS).await.unwrap().persisted, 0);
    assert_eq!(sink.clean_duplicates().unwrap(), 0);
}

#[tokio::test]
async fn test_periodic_runner_stops_on_shutdown() {
    let config = SystemConfig::default();
    let mut runner = MultiLedgerMonitor::new(Arc::new(LogSink), 1).with_ledger(
        tron_monitor(&config, tron_transport(), Arc::new(RecordingSleeper::new())),
        vec![TRON_WALLET.to_string()],
    );

    let runs = run_periodically(
        &mut runner,
        Duration::from_secs(3600),
        tokio::time::sleep(Duration::from_millis(50)),
    )
    .await
    .unwrap();

    assert_eq!(runs, 1);
}

/// Rejects the first write, accepts the rest, remembers nothing itself
#[derive(Default)]
struct FailOnceSink {
    failed: AtomicBool,
    batches: Mutex<Vec<usize>>,
}

#[async_trait]
impl TransactionSink for FailOnceSink {
    async fn known_keys(&self) -> monitor_orchestrator::Result<HashSet<DedupKey>> {
        Ok(HashSet::new())
    }

    async fn persist(
        &self,
        transactions: &[CanonicalTransaction],
        _wallet_errors: &[WalletError],
    ) -> monitor_orchestrator::Result<()> {
        self.batches.lock().unwrap().push(transactions.len());
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(MonitorError::Sink("disk full".to_string()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_persist_is_retried_next_run() {
    let sink = Arc::new(FailOnceSink::default());
    let mut runner = MultiLedgerMonitor::new(sink.clone(), 1).with_ledger(
        eth_monitor(&eth_config(), eth_transport(), Arc::new(RecordingSleeper::new())),
        vec![ETH_WALLET.to_string()],
    );

    assert!(matches!(
        runner.run_once(NOW_MS).await,
        Err(MonitorError::Sink(_))
    ));

    let retried = runner.run_once(NOW_MS).await.unwrap();
    assert_eq!(retried.persisted, 3);

    let third = runner.run_once(NOW_MS).await.unwrap();
    assert_eq!(third.persisted, 0);

    assert_eq!(*sink.batches.lock().unwrap(), vec![3, 3, 0]);
}
