use crate::address::tron_display_address;
use crate::types::{Network, Ticker};

/// A stablecoin contract whose transfers are accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedToken {
    pub ticker: Ticker,
    pub contract: &'static str,
}

pub const TRON_USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
pub const TRON_USDC: &str = "TEkxiTehnzSmSe2XqrBj4w32RUN966rdz8";
pub const ETH_USDT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";
pub const ETH_USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

/// The two token contracts each ledger accepts.
///
/// Tickers come from the matched entry; a token's self-reported symbol is
/// never consulted.
#[derive(Debug, Clone)]
pub struct TokenAllowList {
    network: Network,
    entries: [AllowedToken; 2],
}

impl TokenAllowList {
    pub fn tron() -> Self {
        Self {
            network: Network::Tron,
            entries: [
                AllowedToken { ticker: Ticker::Usdt, contract: TRON_USDT },
                AllowedToken { ticker: Ticker::Usdc, contract: TRON_USDC },
            ],
        }
    }

    pub fn eth() -> Self {
        Self {
            network: Network::Eth,
            entries: [
                AllowedToken { ticker: Ticker::Usdt, contract: ETH_USDT },
                AllowedToken { ticker: Ticker::Usdc, contract: ETH_USDC },
            ],
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Tron => Self::tron(),
            Network::Eth => Self::eth(),
        }
    }

    pub fn lookup(&self, contract: &str) -> Option<Ticker> {
        match self.network {
            // base58 is case sensitive
            Network::Tron => {
                let display = tron_display_address(contract);
                self.entries
                    .iter()
                    .find(|e| e.contract == display)
                    .map(|e| e.ticker)
            }
            Network::Eth => {
                let lowered = contract.to_lowercase();
                self.entries
                    .iter()
                    .find(|e| e.contract == lowered)
                    .map(|e| e.ticker)
            }
        }
    }

    pub fn entries(&self) -> &[AllowedToken] {
        &self.entries
    }
}
