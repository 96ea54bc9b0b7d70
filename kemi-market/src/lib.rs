//! Market data adapters for Kemi
//!
//! This crate provides the sources the services read market data from:
//! - CoinGecko: direct REST integration (top movers, coin details, OHLC)
//! - Proxy endpoint: top movers via a deployed Kemi API
//!
//! Top movers strategies are ordered in a [`ProviderChain`] and resolved once.

pub mod coingecko;
pub mod error;
pub mod provider;
pub mod proxy;
pub mod types;

pub use coingecko::{
    parse_top_movers, top_movers_to_value, CoinGeckoClient, CoinGeckoConfig, COINGECKO_API_BASE,
};
pub use error::MarketDataError;
pub use provider::{CoinDataSource, ProviderChain, TopMoversProvider};
pub use proxy::{ProxyEndpointClient, TOP_MOVERS_PROXY_PATH};
pub use types::{OhlcInterval, TopMoversToolCall, TOP_GAINERS_LOSERS_TOOL};
