//! Provider abstractions
//!
//! `TopMoversProvider` is the single capability the gainers poller consumes.
//! Concrete strategies (direct CoinGecko integration, proxy endpoint) are
//! listed in a `ProviderChain` in preference order and one is picked up
//! front, so the choice is made once at startup and never per request.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use kemi_core::{Candle, CoinDetails, TopMovers, TopMoversParams};

use crate::error::MarketDataError;
use crate::types::OhlcInterval;

/// Source of top gainers / losers
#[async_trait]
pub trait TopMoversProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Whether this strategy is configured and able to serve requests
    fn is_available(&self) -> bool {
        true
    }

    /// Fetch one snapshot of top movers. No retries, no caching.
    async fn fetch_top_movers(&self, params: &TopMoversParams)
        -> Result<TopMovers, MarketDataError>;
}

/// Source of per-coin details and price history
#[async_trait]
pub trait CoinDataSource: Send + Sync {
    async fn fetch_coin(&self, coin_id: &str) -> Result<CoinDetails, MarketDataError>;

    /// OHLC candles between two unix timestamps (seconds)
    async fn fetch_ohlc_range(
        &self,
        coin_id: &str,
        from: i64,
        to: i64,
        interval: OhlcInterval,
    ) -> Result<Vec<Candle>, MarketDataError>;

    /// Line price history between two unix timestamps (seconds), as flat candles
    async fn fetch_market_chart_range(
        &self,
        coin_id: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>, MarketDataError>;
}

/// Ordered list of top movers strategies; the first available one wins
#[derive(Default, Clone)]
pub struct ProviderChain {
    candidates: Vec<Arc<dyn TopMoversProvider>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy with lower preference than the ones already added
    pub fn with(mut self, provider: Arc<dyn TopMoversProvider>) -> Self {
        self.candidates.push(provider);
        self
    }

    pub fn push(&mut self, provider: Arc<dyn TopMoversProvider>) {
        self.candidates.push(provider);
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Resolve the strategy to use. Results from several strategies are never merged.
    pub fn select(&self) -> Result<Arc<dyn TopMoversProvider>, MarketDataError> {
        for candidate in &self.candidates {
            if candidate.is_available() {
                info!("Using top movers provider: {}", candidate.name());
                return Ok(Arc::clone(candidate));
            }
            debug!("Top movers provider {} unavailable, skipping", candidate.name());
        }

        let names: Vec<&str> = self.candidates.iter().map(|c| c.name()).collect();
        Err(MarketDataError::NoProviderAvailable(if names.is_empty() {
            "no providers configured".to_string()
        } else {
            format!("none of [{}] is available", names.join(", "))
        }))
    }
}
