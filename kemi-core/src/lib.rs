//! Core types for the Kemi crypto market data service
//!
//! This crate defines the shared data structures used across the service,
//! including market movers, coin details, technical analysis results and
//! price formatting helpers.

pub mod analysis;
pub mod coin;
pub mod error;
pub mod market;
pub mod price;

pub use analysis::{
    AnalysisQuality, AnalysisSummary, BollingerBands, Indicators, Recommendation, SignalSummary,
    SupportResistance, TechnicalAnalysis, Trend, TrendAnalysis, TrendStrength,
};
pub use coin::{is_valid_coin_id, Candle, CoinDetails, CoinImage, CoinMarketData};
pub use error::{KemiError, KemiResult};
pub use market::{
    FallbackSample, GainersList, MarketAsset, TopMovers, TopMoversParams, PLACEHOLDER_IMAGE_URL,
};
pub use price::{
    format_crypto_price, format_with_separators, price_precision, round_to_precision,
};
