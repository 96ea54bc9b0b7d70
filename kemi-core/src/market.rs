//! Market mover data structures
//!
//! `MarketAsset` is the per-coin record delivered by market data providers.
//! Its serde names are CoinGecko's `top_gainers_losers` keys for the default
//! query (`usd`, 24h). Movers fetched for another currency or window keep the
//! numbers in the same fields and are re-keyed when rendered for the proxy
//! endpoint.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

/// Static image shown in place of a missing or unreachable asset thumbnail
pub const PLACEHOLDER_IMAGE_URL: &str = "/images/coin-placeholder.svg";

/// A single coin/token as reported by a market data provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAsset {
    /// Provider-assigned identifier, stable across calls (e.g. "bitcoin")
    pub id: String,

    /// Ticker symbol (compare case-insensitively)
    pub symbol: String,

    /// Human-readable name
    pub name: String,

    /// Thumbnail URL, may be missing or unreachable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Market capitalization rank (display only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap_rank: Option<u32>,

    /// Price in the quote currency the movers were fetched for (USD by default)
    #[serde(rename = "usd", alias = "price_usd", with = "rust_decimal::serde::float")]
    pub price_usd: Decimal,

    /// 24h traded volume in the quote currency
    #[serde(
        rename = "usd_24h_vol",
        alias = "volume_24h_usd",
        with = "rust_decimal::serde::float"
    )]
    pub volume_24h_usd: Decimal,

    /// Price change over the requested window in percent (137.08 means +137.08%)
    #[serde(
        rename = "usd_24h_change",
        alias = "change_24h_percent",
        with = "rust_decimal::serde::float"
    )]
    pub change_24h_percent: Decimal,
}

impl MarketAsset {
    /// Thumbnail to render, substituting the placeholder when none is usable
    pub fn display_image(&self) -> &str {
        match self.image.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => PLACEHOLDER_IMAGE_URL,
        }
    }

    /// Copy of this asset with the placeholder image applied if needed
    pub fn with_display_image(&self) -> Self {
        let mut asset = self.clone();
        asset.image = Some(self.display_image().to_string());
        asset
    }
}

impl fmt::Display for MarketAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {:+}%",
            self.name,
            self.symbol.to_uppercase(),
            self.change_24h_percent
        )
    }
}

/// Top gainers and losers for a time window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopMovers {
    pub top_gainers: Vec<MarketAsset>,
    pub top_losers: Vec<MarketAsset>,
}

/// Parameters for a top movers query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopMoversParams {
    /// Window for the price change (e.g. "1h", "24h", "7d")
    pub duration: String,
    /// Quote currency (e.g. "usd")
    pub vs_currency: String,
    /// Universe size the movers are picked from (e.g. "300", "1000", "all")
    pub top_coins: String,
}

impl Default for TopMoversParams {
    fn default() -> Self {
        Self {
            duration: "24h".to_string(),
            vs_currency: "usd".to_string(),
            top_coins: "300".to_string(),
        }
    }
}

/// Bounded, de-duplicated list of gainers ready for display.
///
/// Immutable once built; a new poll cycle replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct GainersList(Arc<[MarketAsset]>);

impl GainersList {
    /// Build a list from already-filtered assets, keeping provider order.
    ///
    /// Later duplicates of an identifier are dropped, then the list is cut
    /// to `cap` entries.
    pub fn from_filtered(assets: impl IntoIterator<Item = MarketAsset>, cap: usize) -> Self {
        let mut seen = HashSet::new();
        let items: Vec<MarketAsset> = assets
            .into_iter()
            .filter(|asset| seen.insert(asset.id.clone()))
            .take(cap)
            .collect();
        Self(Arc::from(items))
    }

    pub fn as_slice(&self) -> &[MarketAsset] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarketAsset> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.0.iter().map(|a| a.id.as_str()).collect()
    }
}

impl Default for GainersList {
    fn default() -> Self {
        Self(Arc::from(Vec::new()))
    }
}

impl Serialize for GainersList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

/// Hard-coded assets shown when live data cannot be fetched
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackSample {
    assets: Vec<MarketAsset>,
}

impl FallbackSample {
    pub fn new(assets: Vec<MarketAsset>) -> Self {
        Self { assets }
    }

    pub fn assets(&self) -> &[MarketAsset] {
        &self.assets
    }

    /// The sample as a display list (never truncated)
    pub fn to_list(&self) -> GainersList {
        GainersList::from_filtered(self.assets.iter().cloned(), self.assets.len())
    }
}

impl Default for FallbackSample {
    fn default() -> Self {
        Self::new(vec![
            MarketAsset {
                id: "zora".to_string(),
                symbol: "zora".to_string(),
                name: "Zora".to_string(),
                image: Some(
                    "https://coin-images.coingecko.com/coins/images/54693/small/zora.jpg"
                        .to_string(),
                ),
                market_cap_rank: Some(214),
                price_usd: Decimal::new(516, 4),
                volume_24h_usd: Decimal::new(412_880_152, 0),
                change_24h_percent: Decimal::new(13708, 2),
            },
            MarketAsset {
                id: "pump-fun".to_string(),
                symbol: "pump".to_string(),
                name: "Pump.fun".to_string(),
                image: Some(
                    "https://coin-images.coingecko.com/coins/images/67164/small/pump.jpg"
                        .to_string(),
                ),
                market_cap_rank: Some(71),
                price_usd: Decimal::new(288_026, 8),
                volume_24h_usd: Decimal::new(301_554_210, 0),
                change_24h_percent: Decimal::new(2461, 2),
            },
            MarketAsset {
                id: "sui".to_string(),
                symbol: "sui".to_string(),
                name: "Sui".to_string(),
                image: Some(
                    "https://coin-images.coingecko.com/coins/images/26375/small/sui-ocean-square.png"
                        .to_string(),
                ),
                market_cap_rank: Some(13),
                price_usd: Decimal::new(387, 2),
                volume_24h_usd: Decimal::new(1_902_337_584, 0),
                change_24h_percent: Decimal::new(1241, 2),
            },
        ])
    }
}
