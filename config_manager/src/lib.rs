use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Environment variable prefix, e.g. `LEDGER__TRON__MAX_RETRIES=5`
pub const ENV_PREFIX: &str = "LEDGER";

/// Keys whose environment values are comma separated lists
const LIST_KEYS: [&str; 2] = ["monitor.tron_wallets", "monitor.eth_wallets"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Which ledgers to watch and for which wallets
    pub monitor: MonitorConfig,

    /// TronGrid API configuration
    pub tron: TronConfig,

    /// Etherscan API configuration
    pub etherscan: EtherscanConfig,

    /// Where normalized transactions go
    pub output: OutputConfig,
}

/// Ledgers a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetworkSelection {
    All,
    Tron,
    Eth,
}

impl NetworkSelection {
    pub fn includes_tron(&self) -> bool {
        matches!(self, NetworkSelection::All | NetworkSelection::Tron)
    }

    pub fn includes_eth(&self) -> bool {
        matches!(self, NetworkSelection::All | NetworkSelection::Eth)
    }
}

impl std::str::FromStr for NetworkSelection {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "ALL" => Ok(NetworkSelection::All),
            "TRON" | "TRX" => Ok(NetworkSelection::Tron),
            "ETH" | "ETHEREUM" => Ok(NetworkSelection::Eth),
            other => Err(ConfigurationError::InvalidValue(format!(
                "Unsupported network: '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for NetworkSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkSelection::All => "ALL",
            NetworkSelection::Tron => "TRON",
            NetworkSelection::Eth => "ETH",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub network: NetworkSelection,

    /// Length of the look-back window ending now
    pub time_interval_hours: u64,

    /// TRON wallets in base58 form
    #[serde(default)]
    pub tron_wallets: Vec<String>,

    /// Ethereum wallets, `0x` prefixed
    #[serde(default)]
    pub eth_wallets: Vec<String>,

    /// Attach the raw explorer record to every canonical transaction
    pub include_raw_data: bool,

    /// Minutes between runs in continuous mode
    pub run_interval_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TronConfig {
    pub api_base_url: String,

    /// Delay between consecutive requests, also the backoff seed
    pub request_delay_ms: u64,

    /// Retries after the first attempt
    pub max_retries: u32,

    pub request_timeout_seconds: u64,

    /// Records per TronGrid page
    pub page_limit: u32,

    /// Upper bound on pages followed per sub-query
    pub max_pages: u32,

    /// Also query internal (contract call) transfers
    pub include_internal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtherscanConfig {
    pub api_base_url: String,

    /// Etherscan API key, required when ETH wallets are monitored
    pub api_key: String,

    pub request_delay_ms: u64,

    pub max_retries: u32,

    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV file to append to; transactions are only logged when unset
    #[serde(default)]
    pub csv_path: Option<String>,

    /// Rewrite the CSV without duplicate rows before the first run
    pub clean_duplicates_on_start: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig {
                network: NetworkSelection::All,
                time_interval_hours: 1,
                tron_wallets: Vec::new(),
                eth_wallets: Vec::new(),
                include_raw_data: false,
                run_interval_minutes: 60,
            },
            tron: TronConfig {
                api_base_url: "https://api.trongrid.io".to_string(),
                request_delay_ms: 300,
                max_retries: 3,
                request_timeout_seconds: 30,
                page_limit: 200,
                max_pages: 5,
                include_internal: false,
            },
            etherscan: EtherscanConfig {
                api_base_url: "https://api.etherscan.io/api".to_string(),
                api_key: "".to_string(), // Must be set in config.toml or LEDGER__ETHERSCAN__API_KEY
                request_delay_ms: 300,
                max_retries: 3,
                request_timeout_seconds: 30,
            },
            output: OutputConfig {
                csv_path: None,
                clean_duplicates_on_start: false,
            },
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.time_interval_hours == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Time interval must be greater than 0 hours".to_string(),
            ));
        }

        if self.run_interval_minutes == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Run interval must be greater than 0 minutes".to_string(),
            ));
        }

        Ok(())
    }

    /// Drop blanks and surrounding whitespace from the wallet lists
    pub fn normalize_wallets(&mut self) {
        for list in [&mut self.tron_wallets, &mut self.eth_wallets] {
            let before = list.len();
            *list = list
                .iter()
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty())
                .collect();
            if list.len() != before {
                warn!("Ignored {} empty wallet entries", before - list.len());
            }
        }
    }
}

impl TronConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "TRON request timeout must be greater than 0".to_string(),
            ));
        }

        if self.page_limit == 0 || self.max_pages == 0 {
            return Err(ConfigurationError::InvalidValue(
                "TRON page_limit and max_pages must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl EtherscanConfig {
    /// `wallets_configured` is true when ETH wallets will actually be queried
    pub fn validate(&self, wallets_configured: bool) -> Result<()> {
        if wallets_configured && self.api_key.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Etherscan API key is required when ETH wallets are configured".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Etherscan request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl SystemConfig {
    /// Load defaults, then `config_path` if it exists, then `LEDGER__*`
    /// environment variables
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&SystemConfig::default())?);

        // Add config file if it exists
        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        // Add environment variables with prefix
        let mut environment = Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .separator("__")
            .list_separator(",");
        for key in LIST_KEYS {
            environment = environment.with_list_parse_key(key);
        }
        config_builder = config_builder.add_source(environment);

        let config = config_builder.build()?;
        let mut system_config: SystemConfig = config.try_deserialize()?;

        system_config.monitor.normalize_wallets();

        // Validate configuration
        system_config.validate()?;

        Ok(system_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.monitor.validate()?;
        self.tron.validate()?;

        let eth_active =
            self.monitor.network.includes_eth() && !self.monitor.eth_wallets.is_empty();
        self.etherscan.validate(eth_active)?;

        Ok(())
    }

    /// Wallets that will actually be queried under the selected network
    pub fn active_tron_wallets(&self) -> &[String] {
        if self.monitor.network.includes_tron() {
            &self.monitor.tron_wallets
        } else {
            &[]
        }
    }

    pub fn active_eth_wallets(&self) -> &[String] {
        if self.monitor.network.includes_eth() {
            &self.monitor.eth_wallets
        } else {
            &[]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = SystemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tron.request_delay_ms, 300);
        assert_eq!(config.tron.max_retries, 3);
        assert_eq!(config.monitor.network, NetworkSelection::All);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = SystemConfig::load_from_path("definitely-not-here.toml").unwrap();
        assert_eq!(config.etherscan.api_base_url, "https://api.etherscan.io/api");
        assert_eq!(config.monitor.time_interval_hours, 1);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[monitor]
network = "TRON"
time_interval_hours = 6
tron_wallets = ["TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t", "  "]

[tron]
include_internal = true
"#
        )
        .unwrap();

        let config = SystemConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.monitor.network, NetworkSelection::Tron);
        assert_eq!(config.monitor.time_interval_hours, 6);
        assert_eq!(config.monitor.tron_wallets, vec!["TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"]);
        assert!(config.tron.include_internal);
        assert_eq!(config.tron.max_pages, 5);
        assert!(config.active_eth_wallets().is_empty());
    }

    #[test]
    fn test_eth_wallets_require_api_key() {
        let mut config = SystemConfig::default();
        config.monitor.eth_wallets = vec!["0x1111111111111111111111111111111111111111".to_string()];
        assert!(config.validate().is_err());

        config.monitor.network = NetworkSelection::Tron;
        assert!(config.validate().is_ok());

        config.monitor.network = NetworkSelection::All;
        config.etherscan.api_key = "KEY".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut config = SystemConfig::default();
        config.monitor.run_interval_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.tron.request_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_network_selection_parsing() {
        assert_eq!("eth".parse::<NetworkSelection>().unwrap(), NetworkSelection::Eth);
        assert_eq!("TRON".parse::<NetworkSelection>().unwrap(), NetworkSelection::Tron);
        assert!("solana".parse::<NetworkSelection>().is_err());
        assert!(NetworkSelection::All.includes_tron() && NetworkSelection::All.includes_eth());
    }
}
