//! CoinGecko REST client
//!
//! Direct, in-process integration with the CoinGecko API. Serves top movers,
//! coin details and price history. A demo or pro API key is attached when
//! configured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};
use url::Url;

use kemi_core::{is_valid_coin_id, Candle, CoinDetails, MarketAsset, TopMovers, TopMoversParams};

use crate::error::MarketDataError;
use crate::provider::{CoinDataSource, TopMoversProvider};
use crate::types::{CoinResponse, MarketChartResponse, OhlcInterval};

pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// Configuration for the CoinGecko client
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    /// REST root, without trailing slash
    pub base_url: String,
    /// Optional API key
    pub api_key: Option<String>,
    /// Send the key as a pro key instead of a demo key
    pub pro: bool,
    /// Whether this strategy may be selected for top movers
    pub enabled: bool,
    /// Quote currency for coin details
    pub vs_currency: String,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_API_BASE.to_string(),
            api_key: None,
            pro: false,
            enabled: true,
            vs_currency: "usd".to_string(),
        }
    }
}

/// CoinGecko API client
pub struct CoinGeckoClient {
    http: Client,
    config: CoinGeckoConfig,
}

impl CoinGeckoClient {
    /// Create a new CoinGecko client
    pub fn new(config: CoinGeckoConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("Kemi/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self { http, config }
    }

    pub fn config(&self) -> &CoinGeckoConfig {
        &self.config
    }

    /// Base URL with `segments` appended, each one percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, MarketDataError> {
        let mut url = Url::parse(&self.config.base_url).map_err(|e| {
            MarketDataError::InvalidConfig(format!("CoinGecko base URL: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                MarketDataError::InvalidConfig(format!(
                    "CoinGecko base URL can't take a path: {}",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a CoinGecko endpoint and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, MarketDataError> {
        let url = self.endpoint(segments)?;
        debug!("[CoinGecko] GET {}", url);

        let path = url.path().to_string();
        let mut request = self.http.get(url).query(query);
        if let Some(key) = &self.config.api_key {
            let header = if self.config.pro {
                "x-cg-pro-api-key"
            } else {
                "x-cg-demo-api-key"
            };
            request = request.header(header, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MarketDataError::NotFound(path));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketDataError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| MarketDataError::MalformedPayload(e.to_string()))
    }
}

#[async_trait]
impl TopMoversProvider for CoinGeckoClient {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn is_available(&self) -> bool {
        self.config.enabled
    }

    #[instrument(skip(self))]
    async fn fetch_top_movers(
        &self,
        params: &TopMoversParams,
    ) -> Result<TopMovers, MarketDataError> {
        let payload: Value = self
            .get_json(
                &["coins", "top_gainers_losers"],
                &[
                    ("vs_currency", params.vs_currency.clone()),
                    ("duration", params.duration.clone()),
                    ("top_coins", params.top_coins.clone()),
                ],
            )
            .await?;

        let movers = parse_top_movers(&payload, &params.vs_currency, &params.duration)?;
        info!(
            "[CoinGecko] Fetched {} gainers and {} losers",
            movers.top_gainers.len(),
            movers.top_losers.len()
        );
        Ok(movers)
    }
}

#[async_trait]
impl CoinDataSource for CoinGeckoClient {
    #[instrument(skip(self))]
    async fn fetch_coin(&self, coin_id: &str) -> Result<CoinDetails, MarketDataError> {
        let coin: CoinResponse = self
            .get_json(
                &["coins", checked_coin_id(coin_id)?],
                &[
                    ("localization", "false".to_string()),
                    ("tickers", "false".to_string()),
                    ("community_data", "false".to_string()),
                    ("developer_data", "false".to_string()),
                    ("sparkline", "false".to_string()),
                ],
            )
            .await?;

        Ok(coin.into_details(&self.config.vs_currency))
    }

    #[instrument(skip(self))]
    async fn fetch_ohlc_range(
        &self,
        coin_id: &str,
        from: i64,
        to: i64,
        interval: OhlcInterval,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let rows: Vec<Vec<f64>> = self
            .get_json(
                &["coins", checked_coin_id(coin_id)?, "ohlc", "range"],
                &[
                    ("vs_currency", self.config.vs_currency.clone()),
                    ("from", from.to_string()),
                    ("to", to.to_string()),
                    ("interval", interval.as_str().to_string()),
                ],
            )
            .await?;

        let candles: Vec<Candle> = rows
            .iter()
            .filter_map(|row| match row.as_slice() {
                [ts, open, high, low, close, rest @ ..] => Some(Candle {
                    timestamp: *ts as i64,
                    open: *open,
                    high: *high,
                    low: *low,
                    close: *close,
                    volume: rest.first().copied(),
                }),
                _ => None,
            })
            .collect();

        debug!("[CoinGecko] {} OHLC candles for {}", candles.len(), coin_id);
        Ok(candles)
    }

    #[instrument(skip(self))]
    async fn fetch_market_chart_range(
        &self,
        coin_id: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let chart: MarketChartResponse = self
            .get_json(
                &["coins", checked_coin_id(coin_id)?, "market_chart", "range"],
                &[
                    ("vs_currency", self.config.vs_currency.clone()),
                    ("from", from.to_string()),
                    ("to", to.to_string()),
                ],
            )
            .await?;

        let candles = chart
            .prices
            .iter()
            .enumerate()
            .filter_map(|(i, point)| match point.as_slice() {
                [ts, price, ..] => {
                    let volume = chart
                        .total_volumes
                        .get(i)
                        .and_then(|v| v.get(1))
                        .copied()
                        .unwrap_or(0.0);
                    Some(Candle::flat(*ts as i64, *price, Some(volume)))
                }
                _ => None,
            })
            .collect();

        Ok(candles)
    }
}

fn checked_coin_id(coin_id: &str) -> Result<&str, MarketDataError> {
    if is_valid_coin_id(coin_id) {
        Ok(coin_id)
    } else {
        Err(MarketDataError::InvalidRequest(format!(
            "invalid coin id {:?}",
            coin_id
        )))
    }
}

/// Parse a `top_gainers_losers` payload.
///
/// CoinGecko keys prices by quote currency and change by window
/// (`usd`, `usd_24h_vol`, `usd_24h_change`). Entries without a usable price
/// or change are skipped.
pub fn parse_top_movers(
    payload: &Value,
    vs_currency: &str,
    duration: &str,
) -> Result<TopMovers, MarketDataError> {
    let gainers = payload
        .get("top_gainers")
        .and_then(Value::as_array)
        .ok_or_else(|| MarketDataError::MalformedPayload("missing top_gainers array".to_string()))?;

    let losers = match payload.get("top_losers") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => {
            return Err(MarketDataError::MalformedPayload(
                "top_losers is not an array".to_string(),
            ))
        }
    };

    let keys = MoverKeys::new(vs_currency, duration);
    Ok(TopMovers {
        top_gainers: gainers.iter().filter_map(|v| keys.parse(v)).collect(),
        top_losers: losers.iter().filter_map(|v| keys.parse(v)).collect(),
    })
}

/// Render movers in the `top_gainers_losers` shape, keyed by the
/// currency and window they were requested for (`eur`, `eur_1h_change`).
pub fn top_movers_to_value(movers: &TopMovers, vs_currency: &str, duration: &str) -> Value {
    let keys = MoverKeys::new(vs_currency, duration);
    let render = |assets: &[MarketAsset]| -> Value {
        assets.iter().map(|asset| keys.render(asset)).collect()
    };

    let mut payload = Map::new();
    payload.insert("top_gainers".to_string(), render(movers.top_gainers.as_slice()));
    payload.insert("top_losers".to_string(), render(movers.top_losers.as_slice()));
    Value::Object(payload)
}

struct MoverKeys {
    price: String,
    volume: String,
    change: String,
}

impl MoverKeys {
    fn new(vs_currency: &str, duration: &str) -> Self {
        let vs = vs_currency.to_lowercase();
        Self {
            volume: format!("{}_24h_vol", vs),
            change: format!("{}_{}_change", vs, duration.to_lowercase()),
            price: vs,
        }
    }

    fn parse(&self, entry: &Value) -> Option<MarketAsset> {
        let text = |key: &str| entry.get(key).and_then(Value::as_str).map(str::to_string);
        let decimal = |key: &str| entry.get(key).and_then(Value::as_f64).and_then(Decimal::from_f64);

        let id = text("id")?;
        let (Some(price_usd), Some(change_24h_percent)) = (decimal(&self.price), decimal(&self.change))
        else {
            warn!("[CoinGecko] Skipping mover {} without price or change", id);
            return None;
        };

        Some(MarketAsset {
            symbol: text("symbol").unwrap_or_default(),
            name: text("name").unwrap_or_else(|| id.clone()),
            image: text("image"),
            market_cap_rank: entry
                .get("market_cap_rank")
                .and_then(Value::as_u64)
                .and_then(|r| u32::try_from(r).ok()),
            price_usd,
            volume_24h_usd: decimal(&self.volume).unwrap_or(Decimal::ZERO),
            change_24h_percent,
            id,
        })
    }

    fn render(&self, asset: &MarketAsset) -> Value {
        let number = |d: Decimal| d.to_f64().map_or(Value::Null, Value::from);

        let mut entry = Map::new();
        entry.insert("id".to_string(), Value::from(asset.id.as_str()));
        entry.insert("symbol".to_string(), Value::from(asset.symbol.as_str()));
        entry.insert("name".to_string(), Value::from(asset.name.as_str()));
        if let Some(image) = &asset.image {
            entry.insert("image".to_string(), Value::from(image.as_str()));
        }
        if let Some(rank) = asset.market_cap_rank {
            entry.insert("market_cap_rank".to_string(), Value::from(rank));
        }
        entry.insert(self.price.clone(), number(asset.price_usd));
        entry.insert(self.volume.clone(), number(asset.volume_24h_usd));
        entry.insert(self.change.clone(), number(asset.change_24h_percent));
        Value::Object(entry)
    }
}
