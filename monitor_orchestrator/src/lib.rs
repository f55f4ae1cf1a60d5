use thiserror::Error;

pub mod monitor;
pub mod runner;
pub mod scheduler;
pub mod sink;

pub use monitor::{LedgerMonitor, MonitorReport};
pub use runner::{eth_monitor, tron_monitor, LedgerRunSummary, MultiLedgerMonitor, RunSummary};
pub use scheduler::run_periodically;
pub use sink::{CsvSink, LogSink, TransactionSink};

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("No wallets configured for {0}")]
    NoWallets(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Sink error: {0}")]
    Sink(String),
}

impl From<config_manager::ConfigurationError> for MonitorError {
    fn from(err: config_manager::ConfigurationError) -> Self {
        MonitorError::Config(err.to_string())
    }
}

impl From<explorer_client::FetchError> for MonitorError {
    fn from(err: explorer_client::FetchError) -> Self {
        MonitorError::Config(err.to_string())
    }
}

impl From<csv::Error> for MonitorError {
    fn from(err: csv::Error) -> Self {
        MonitorError::Sink(err.to_string())
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Sink(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
