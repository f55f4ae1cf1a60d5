use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use config_manager::{NetworkSelection, SystemConfig};
use monitor_orchestrator::{
    run_periodically, CsvSink, LogSink, MultiLedgerMonitor, TransactionSink,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tx_normalizer::address::{is_valid_eth_address, is_valid_tron_address};

#[derive(Parser, Debug)]
#[command(name = "ledger_watch")]
#[command(about = "Normalize TRON and Ethereum wallet activity into one transaction format")]
struct Args {
    /// Configuration file; missing files fall back to defaults and env
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,

    /// ALL, TRON or ETH
    #[arg(short, long)]
    network: Option<NetworkSelection>,

    /// Extra wallet to watch, routed to TRON or ETH by its shape
    #[arg(short, long = "wallet")]
    wallets: Vec<String>,

    /// Look-back window in hours
    #[arg(long)]
    hours: Option<u64>,

    /// Append results to this CSV file
    #[arg(long)]
    csv: Option<String>,
}

fn apply_overrides(config: &mut SystemConfig, args: &Args) -> Result<()> {
    if let Some(network) = args.network {
        config.monitor.network = network;
    }
    if let Some(hours) = args.hours {
        config.monitor.time_interval_hours = hours;
    }
    if let Some(csv) = &args.csv {
        config.output.csv_path = Some(csv.clone());
    }

    for wallet in &args.wallets {
        let wallet = wallet.trim();
        if is_valid_tron_address(wallet) {
            config.monitor.tron_wallets.push(wallet.to_string());
        } else if is_valid_eth_address(wallet) {
            config.monitor.eth_wallets.push(wallet.to_string());
        } else {
            bail!("'{}' is neither a TRON nor an Ethereum address", wallet);
        }
    }

    config.monitor.normalize_wallets();
    config.validate()?;
    Ok(())
}

fn build_sink(config: &SystemConfig) -> Result<Arc<dyn TransactionSink>> {
    match &config.output.csv_path {
        Some(path) => {
            let sink = CsvSink::new(path);
            if config.output.clean_duplicates_on_start {
                let removed = sink
                    .clean_duplicates()
                    .with_context(|| format!("cleaning duplicates in {}", path))?;
                info!("Startup cleanup removed {} rows", removed);
            }
            Ok(Arc::new(sink))
        }
        None => {
            warn!("No output.csv_path configured, transactions are only logged");
            Ok(Arc::new(LogSink))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ledger_watch=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = SystemConfig::load_from_path(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    apply_overrides(&mut config, &args)?;

    info!(
        "Starting ledger watch: network={}, window={}h, {} TRON / {} ETH wallets",
        config.monitor.network,
        config.monitor.time_interval_hours,
        config.active_tron_wallets().len(),
        config.active_eth_wallets().len()
    );

    let sink = build_sink(&config)?;
    let mut monitor = MultiLedgerMonitor::from_config(&config, sink)?;

    if args.once {
        let summary = monitor.run_once(Utc::now().timestamp_millis()).await?;
        for ledger in &summary.ledgers {
            info!(
                "{}: {} new, {} failed wallets, {:?}",
                ledger.network, ledger.new_transactions, ledger.failed_wallets, ledger.stats
            );
        }
        return Ok(());
    }

    let every = Duration::from_secs(config.monitor.run_interval_minutes * 60);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let runs = run_periodically(&mut monitor, every, shutdown).await?;
    info!("Stopped after {} runs", runs);
    Ok(())
}
