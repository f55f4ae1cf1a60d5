pub mod aggregator;
pub mod error;
pub mod etherscan;
pub mod fetch;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;
pub mod transport;
pub mod tron;

pub use aggregator::{fetch_all, LedgerSource};
pub use error::FetchError;
pub use etherscan::{EtherscanOptions, EtherscanSource};
pub use fetch::{FetchSettings, RetryingFetchClient};
#[cfg(any(test, feature = "test-util"))]
pub use scripted::{Reply, ScriptedTransport};
pub use transport::{HttpTransport, ReqwestTransport};
pub use tron::{TronGridOptions, TronGridSource};
