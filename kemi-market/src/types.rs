//! Wire types for CoinGecko and for the top movers proxy endpoint

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use kemi_core::{CoinDetails, CoinImage, CoinMarketData, TopMoversParams};

use crate::error::MarketDataError;

/// Tool name accepted by the proxy endpoint
pub const TOP_GAINERS_LOSERS_TOOL: &str = "get_coins_top_gainers_losers";

// ============================================================================
// Proxy endpoint types
// ============================================================================

/// Request body for `POST /api/mcp/coingecko/top-gainers-losers`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopMoversToolCall {
    /// Name of the upstream tool to invoke
    pub tool: String,
    /// Query arguments forwarded to the provider
    pub arguments: TopMoversParams,
}

impl TopMoversToolCall {
    pub fn new(arguments: TopMoversParams) -> Self {
        Self {
            tool: TOP_GAINERS_LOSERS_TOOL.to_string(),
            arguments,
        }
    }
}

// ============================================================================
// CoinGecko types
// ============================================================================

/// Candle granularity for OHLC range queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OhlcInterval {
    #[default]
    Daily,
    Hourly,
}

impl OhlcInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            OhlcInterval::Daily => "daily",
            OhlcInterval::Hourly => "hourly",
        }
    }
}

impl fmt::Display for OhlcInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OhlcInterval {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(OhlcInterval::Daily),
            "hourly" => Ok(OhlcInterval::Hourly),
            other => Err(MarketDataError::InvalidConfig(format!(
                "Unknown OHLC interval: {}",
                other
            ))),
        }
    }
}

/// Prices keyed by quote currency ("usd", "eur", ...)
pub(crate) type CurrencyMap = HashMap<String, Option<f64>>;

/// Response of `GET /coins/{id}`
#[derive(Debug, Deserialize)]
pub(crate) struct CoinResponse {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub description: HashMap<String, Option<String>>,
    #[serde(default)]
    pub image: Option<CoinImage>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub categories: Vec<Option<String>>,
    #[serde(default)]
    pub market_data: Option<CoinMarketDataResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CoinMarketDataResponse {
    #[serde(default)]
    pub current_price: CurrencyMap,
    #[serde(default)]
    pub market_cap: CurrencyMap,
    #[serde(default)]
    pub total_volume: CurrencyMap,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_7d: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_30d: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub ath: CurrencyMap,
    #[serde(default)]
    pub atl: CurrencyMap,
}

impl CoinResponse {
    /// Flatten into the service's coin model, quoting in `vs_currency`
    pub fn into_details(self, vs_currency: &str) -> CoinDetails {
        let quote = |map: &CurrencyMap| map.get(vs_currency).copied().flatten();
        let data = self.market_data.unwrap_or_default();

        CoinDetails {
            id: self.id,
            name: self.name,
            symbol: self.symbol,
            description: self
                .description
                .get("en")
                .cloned()
                .flatten()
                .unwrap_or_default(),
            image: self.image.unwrap_or_default(),
            market_cap_rank: self.market_cap_rank,
            categories: self.categories.into_iter().flatten().collect(),
            market_data: CoinMarketData {
                current_price: quote(&data.current_price),
                market_cap: quote(&data.market_cap),
                total_volume: quote(&data.total_volume),
                price_change_24h: data.price_change_percentage_24h,
                price_change_7d: data.price_change_percentage_7d,
                price_change_30d: data.price_change_percentage_30d,
                circulating_supply: data.circulating_supply,
                total_supply: data.total_supply,
                ath: quote(&data.ath),
                atl: quote(&data.atl),
            },
        }
    }
}

/// Response of `GET /coins/{id}/market_chart/range`
#[derive(Debug, Deserialize)]
pub(crate) struct MarketChartResponse {
    #[serde(default)]
    pub prices: Vec<Vec<f64>>,
    #[serde(default)]
    pub total_volumes: Vec<Vec<f64>>,
}
