use crate::monitor::LedgerMonitor;
use crate::sink::TransactionSink;
use crate::{MonitorError, Result};
use config_manager::SystemConfig;
use explorer_client::{
    EtherscanOptions, EtherscanSource, FetchSettings, HttpTransport, ReqwestTransport,
    RetryingFetchClient, TronGridOptions, TronGridSource,
};
use retry_utils::{Sleeper, TokioSleeper};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tx_normalizer::{
    sort_by_timestamp_desc, Deduplicator, EthMapper, NormalizationStats, Network, TimeWindow,
    TronMapper, WalletError,
};

/// One ledger's monitor with its wallets and the keys it already delivered
struct LedgerRun {
    monitor: LedgerMonitor,
    wallets: Vec<String>,
    dedup: Deduplicator,
}

#[derive(Debug, Clone)]
pub struct LedgerRunSummary {
    pub network: Network,
    pub stats: NormalizationStats,
    pub new_transactions: usize,
    pub failed_wallets: usize,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub window: TimeWindow,
    pub ledgers: Vec<LedgerRunSummary>,
    pub persisted: usize,
    pub wallet_errors: Vec<WalletError>,
}

/// Runs every configured ledger and hands the combined result to a sink.
///
/// Ledgers run one after the other. Each keeps a separate dedup scope,
/// seeded from the sink before every run.
pub struct MultiLedgerMonitor {
    ledgers: Vec<LedgerRun>,
    sink: Arc<dyn TransactionSink>,
    interval_hours: u64,
}

/// TRON monitor wired from configuration
pub fn tron_monitor(
    config: &SystemConfig,
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
) -> LedgerMonitor {
    let settings = FetchSettings::new(config.tron.request_delay_ms, config.tron.max_retries);
    let client = RetryingFetchClient::new(transport, settings, sleeper);
    let source = TronGridSource::new(
        client,
        TronGridOptions {
            api_base_url: config.tron.api_base_url.clone(),
            page_limit: config.tron.page_limit,
            max_pages: config.tron.max_pages,
            include_internal: config.tron.include_internal,
        },
    );

    LedgerMonitor::new(
        Box::new(source),
        Box::new(TronMapper::new()),
        config.monitor.include_raw_data,
    )
}

/// ETH monitor wired from configuration
pub fn eth_monitor(
    config: &SystemConfig,
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
) -> LedgerMonitor {
    let settings = FetchSettings::new(
        config.etherscan.request_delay_ms,
        config.etherscan.max_retries,
    );
    let client = RetryingFetchClient::new(transport, settings, sleeper);
    let source = EtherscanSource::new(
        client,
        EtherscanOptions {
            api_base_url: config.etherscan.api_base_url.clone(),
            api_key: config.etherscan.api_key.clone(),
        },
    );

    LedgerMonitor::new(
        Box::new(source),
        Box::new(EthMapper::new()),
        config.monitor.include_raw_data,
    )
}

impl MultiLedgerMonitor {
    pub fn new(sink: Arc<dyn TransactionSink>, interval_hours: u64) -> Self {
        Self {
            ledgers: Vec::new(),
            sink,
            interval_hours,
        }
    }

    /// Add a ledger; ledgers without wallets are ignored
    pub fn with_ledger(mut self, monitor: LedgerMonitor, wallets: Vec<String>) -> Self {
        if wallets.is_empty() {
            info!("No {} wallets configured, skipping ledger", monitor.network());
            return self;
        }
        self.ledgers.push(LedgerRun {
            monitor,
            wallets,
            dedup: Deduplicator::new(),
        });
        self
    }

    /// Build the monitors the configuration asks for, talking to the real explorers
    pub fn from_config(config: &SystemConfig, sink: Arc<dyn TransactionSink>) -> Result<Self> {
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
        let mut runner = Self::new(sink, config.monitor.time_interval_hours);

        let tron_wallets = config.active_tron_wallets().to_vec();
        if !tron_wallets.is_empty() {
            let transport = Arc::new(ReqwestTransport::new(config.tron.request_timeout_seconds)?);
            runner = runner.with_ledger(
                tron_monitor(config, transport, sleeper.clone()),
                tron_wallets,
            );
        }

        let eth_wallets = config.active_eth_wallets().to_vec();
        if !eth_wallets.is_empty() {
            let transport = Arc::new(ReqwestTransport::new(
                config.etherscan.request_timeout_seconds,
            )?);
            runner = runner.with_ledger(eth_monitor(config, transport, sleeper), eth_wallets);
        }

        Ok(runner)
    }

    pub fn networks(&self) -> Vec<Network> {
        self.ledgers.iter().map(|l| l.monitor.network()).collect()
    }

    /// Run every ledger over the window ending at `now_ms` and persist new records.
    ///
    /// Keys enter a ledger's scope only after the sink accepted them, so a
    /// failed persist leaves the records eligible for the next run.
    pub async fn run_once(&mut self, now_ms: i64) -> Result<RunSummary> {
        if self.ledgers.is_empty() {
            return Err(MonitorError::NoWallets("any network".to_string()));
        }

        let window = TimeWindow::last_hours(self.interval_hours, now_ms);
        let persisted_keys = self.sink.known_keys().await?;

        let mut all_transactions = Vec::new();
        let mut wallet_errors = Vec::new();
        let mut summaries = Vec::new();

        for ledger in &mut self.ledgers {
            let evicted = ledger.dedup.evict_before(window.start_ms);
            if evicted > 0 {
                debug!("Forgot {} {} keys older than the window", evicted, ledger.monitor.network());
            }

            let report = ledger.monitor.monitor(&ledger.wallets, &window).await?;
            let fresh = ledger.dedup.fresh(report.transactions, &persisted_keys);

            summaries.push(LedgerRunSummary {
                network: ledger.monitor.network(),
                stats: report.stats,
                new_transactions: fresh.len(),
                failed_wallets: report.wallet_errors.len(),
            });
            all_transactions.extend(fresh);
            wallet_errors.extend(report.wallet_errors);
        }

        sort_by_timestamp_desc(&mut all_transactions);
        self.sink.persist(&all_transactions, &wallet_errors).await?;

        for ledger in &mut self.ledgers {
            let network = ledger.monitor.network();
            ledger
                .dedup
                .remember(all_transactions.iter().filter(|tx| tx.network == network));
        }

        if !wallet_errors.is_empty() {
            warn!("⚠️ {} wallets failed this run", wallet_errors.len());
        }
        info!(
            "✅ Run complete: {} new transactions across {} ledgers",
            all_transactions.len(),
            summaries.len()
        );

        Ok(RunSummary {
            window,
            ledgers: summaries,
            persisted: all_transactions.len(),
            wallet_errors,
        })
    }
}
