//! Business logic services for Kemi
//!
//! This crate sits between the market data adapters and the HTTP API:
//! - Gainers pipeline and the polling controller behind the movers widget
//! - Technical indicators and per-coin analysis with caching
//! - Request rate limiting for the expensive analysis endpoint

pub mod analysis_cache;
pub mod coin_analysis;
pub mod gainers_filter;
pub mod gainers_poller;
pub mod rate_limiter;
pub mod technical;

pub use analysis_cache::{AnalysisCache, CacheStats};
pub use coin_analysis::{
    CachedReport, CoinAnalysisConfig, CoinAnalysisReport, CoinAnalysisService, CoinInfo,
    DataQuality, OhlcReport, TechnicalReport,
};
pub use gainers_filter::{
    filter_valid_gainers, GainersFilter, GainersFilterConfig, STABLECOIN_NAME_FRAGMENTS,
    STABLECOIN_SYMBOLS,
};
pub use gainers_poller::{
    GainersPoller, GainersSnapshot, PollerConfig, PollerState, DEFAULT_DISPLAY_CAP,
    DEFAULT_POLL_INTERVAL, GENERIC_ERROR_MESSAGE,
};
pub use rate_limiter::{RateLimiter, RateLimiterStats, ANALYSIS_REQUESTS_PER_MINUTE};
