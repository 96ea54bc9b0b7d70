//! Per-coin analysis: coin details, price history, indicators and commentary
//!
//! Upstream failures never fail an analysis. Missing coin details are
//! replaced with placeholder details and missing history with synthetic
//! candles; both cases are flagged in the report's data quality block.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use kemi_ai::{AiAnalysis, AiAnalyzer, CoinAnalysisInput};
use kemi_core::{
    AnalysisQuality, Candle, CoinDetails, CoinImage, CoinMarketData, KemiError, KemiResult,
    TechnicalAnalysis, PLACEHOLDER_IMAGE_URL,
};
use kemi_market::{CoinDataSource, OhlcInterval};

use crate::analysis_cache::{AnalysisCache, CacheStats};
use crate::technical;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct CoinAnalysisConfig {
    pub cache_ttl: Duration,
    /// History window for the full analysis
    pub analysis_days: u32,
    /// Attempts at loading price history before giving up
    pub history_attempts: u32,
    /// Base back-off between history attempts, multiplied by the attempt number
    pub retry_delay: Duration,
    /// Pause between the coin details request and the history request
    pub request_spacing: Duration,
    /// Length of the synthetic series used when no history is available
    pub synthetic_days: usize,
    /// Daily volatility of the synthetic series
    pub synthetic_volatility: f64,
    /// Candles included in the full report
    pub report_candles: usize,
}

impl Default for CoinAnalysisConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30 * 60),
            analysis_days: 90,
            history_attempts: 2,
            retry_delay: Duration::from_secs(2),
            request_spacing: Duration::from_millis(500),
            synthetic_days: 90,
            synthetic_volatility: 0.03,
            report_candles: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinInfo {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub image: CoinImage,
    pub market_cap_rank: Option<u32>,
    pub categories: Vec<String>,
}

impl From<&CoinDetails> for CoinInfo {
    fn from(coin: &CoinDetails) -> Self {
        Self {
            id: coin.id.clone(),
            name: coin.name.clone(),
            symbol: coin.symbol.clone(),
            description: coin.description.clone(),
            image: coin.image.clone(),
            market_cap_rank: coin.market_cap_rank,
            categories: coin.categories.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuality {
    pub ohlc_data_points: usize,
    pub analysis_reliability: AnalysisQuality,
    /// Price history was generated because none could be loaded
    pub synthetic_history: bool,
    /// Coin details are placeholders because none could be loaded
    pub placeholder_details: bool,
    pub last_updated: DateTime<Utc>,
}

/// Full analysis for one coin
#[derive(Debug, Clone, Serialize)]
pub struct CoinAnalysisReport {
    pub coin_info: CoinInfo,
    pub market_data: CoinMarketData,
    pub technical_analysis: TechnicalAnalysis,
    pub ai_analysis: AiAnalysis,
    /// Most recent candles, oldest first
    pub ohlc_data: Vec<Candle>,
    pub data_quality: DataQuality,
}

/// Indicators only, over a caller-chosen window
#[derive(Debug, Clone, Serialize)]
pub struct TechnicalReport {
    pub technical_analysis: TechnicalAnalysis,
    pub ohlc_data: Vec<Candle>,
    pub data_points: usize,
    pub analysis_period_days: u32,
    pub last_updated: DateTime<Utc>,
}

/// Raw candles for a coin
#[derive(Debug, Clone, Serialize)]
pub struct OhlcReport {
    pub coin_id: String,
    pub interval: String,
    pub days: u32,
    pub data_points: usize,
    pub ohlc_data: Vec<Candle>,
    pub last_updated: DateTime<Utc>,
}

/// A report plus where it came from
#[derive(Debug, Clone, Serialize)]
pub struct CachedReport<T> {
    pub coin_id: String,
    pub cached: bool,
    /// Seconds since the report was computed, when served from cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age: Option<u64>,
    #[serde(flatten)]
    pub report: T,
}

#[derive(Debug, Clone)]
enum CachedAnalysis {
    Full(Box<CoinAnalysisReport>),
    Technical(Box<TechnicalReport>),
}

pub struct CoinAnalysisService {
    source: Arc<dyn CoinDataSource>,
    analyzer: AiAnalyzer,
    config: CoinAnalysisConfig,
    cache: AnalysisCache<CachedAnalysis>,
}

impl CoinAnalysisService {
    pub fn new(
        source: Arc<dyn CoinDataSource>,
        analyzer: AiAnalyzer,
        config: CoinAnalysisConfig,
    ) -> Self {
        info!(
            "Initializing CoinAnalysisService (AI: {}, cache TTL: {:?})",
            analyzer.has_generator(),
            config.cache_ttl
        );
        Self {
            source,
            analyzer,
            cache: AnalysisCache::new(config.cache_ttl),
            config,
        }
    }

    /// Full analysis, served from cache unless `force_refresh` is set
    #[instrument(skip(self))]
    pub async fn analyze(
        &self,
        coin_id: &str,
        force_refresh: bool,
    ) -> CachedReport<CoinAnalysisReport> {
        let key = format!("{}_gemini", coin_id);
        if !force_refresh {
            if let Some((CachedAnalysis::Full(report), age)) = self.cache.get(&key) {
                debug!("Serving cached analysis for {} ({:?} old)", coin_id, age);
                return CachedReport {
                    coin_id: coin_id.to_string(),
                    cached: true,
                    cache_age: Some(age.as_secs()),
                    report: *report,
                };
            }
        }

        let (coin, placeholder_details) = match self.source.fetch_coin(coin_id).await {
            Ok(coin) => (coin, false),
            Err(e) => {
                warn!("Coin details for {} unavailable, using placeholder: {}", coin_id, e);
                (placeholder_details(coin_id), true)
            }
        };

        if !self.config.request_spacing.is_zero() {
            tokio::time::sleep(self.config.request_spacing).await;
        }

        let mut candles = self.load_history(coin_id, self.config.analysis_days).await;
        let synthetic_history = candles.is_empty();
        if synthetic_history {
            warn!("No price history for {}, generating synthetic candles", coin_id);
            candles = synthetic_candles(
                coin.current_price(),
                self.config.synthetic_days,
                self.config.synthetic_volatility,
                Utc::now(),
            );
        }

        let technical_analysis = technical::analyze(&candles);
        let input = CoinAnalysisInput::new(coin, technical_analysis);
        let ai_analysis = self.analyzer.analyze(&input).await;
        let CoinAnalysisInput {
            coin,
            technical: technical_analysis,
        } = input;

        let recent = candles.len().saturating_sub(self.config.report_candles);
        let report = CoinAnalysisReport {
            coin_info: CoinInfo::from(&coin),
            market_data: coin.market_data,
            data_quality: DataQuality {
                ohlc_data_points: candles.len(),
                analysis_reliability: technical_analysis.summary.analysis_quality,
                synthetic_history,
                placeholder_details,
                last_updated: Utc::now(),
            },
            technical_analysis,
            ai_analysis,
            ohlc_data: candles[recent..].to_vec(),
        };

        self.cache
            .insert(key, CachedAnalysis::Full(Box::new(report.clone())));
        info!(
            "Analysis for {} complete ({} candles, provider {})",
            coin_id, report.data_quality.ohlc_data_points, report.ai_analysis.provider
        );

        CachedReport {
            coin_id: coin_id.to_string(),
            cached: false,
            cache_age: None,
            report,
        }
    }

    /// Indicators over the last `days` days (7 to 365)
    #[instrument(skip(self))]
    pub async fn technical(
        &self,
        coin_id: &str,
        days: u32,
    ) -> KemiResult<CachedReport<TechnicalReport>> {
        if !(7..=365).contains(&days) {
            return Err(KemiError::invalid_input(format!(
                "days must be between 7 and 365, got {}",
                days
            )));
        }

        let key = format!("{}_technical_{}", coin_id, days);
        if let Some((CachedAnalysis::Technical(report), age)) = self.cache.get(&key) {
            return Ok(CachedReport {
                coin_id: coin_id.to_string(),
                cached: true,
                cache_age: Some(age.as_secs()),
                report: *report,
            });
        }

        let candles = self.load_history(coin_id, days).await;
        let report = TechnicalReport {
            technical_analysis: technical::analyze(&candles),
            data_points: candles.len(),
            ohlc_data: candles,
            analysis_period_days: days,
            last_updated: Utc::now(),
        };
        self.cache
            .insert(key, CachedAnalysis::Technical(Box::new(report.clone())));

        Ok(CachedReport {
            coin_id: coin_id.to_string(),
            cached: false,
            cache_age: None,
            report,
        })
    }

    /// Raw candles over the last `days` days (1 to 365). Upstream errors are returned.
    #[instrument(skip(self))]
    pub async fn ohlc(
        &self,
        coin_id: &str,
        days: u32,
        interval: OhlcInterval,
    ) -> KemiResult<OhlcReport> {
        if !(1..=365).contains(&days) {
            return Err(KemiError::invalid_input(format!(
                "days must be between 1 and 365, got {}",
                days
            )));
        }

        let (from, to) = window(days);
        let candles = self
            .source
            .fetch_ohlc_range(coin_id, from, to, interval)
            .await?;

        Ok(OhlcReport {
            coin_id: coin_id.to_string(),
            interval: interval.to_string(),
            days,
            data_points: candles.len(),
            ohlc_data: candles,
            last_updated: Utc::now(),
        })
    }

    pub fn ai_enabled(&self) -> bool {
        self.analyzer.has_generator()
    }

    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Daily candles, falling back to line data; empty when every attempt failed
    async fn load_history(&self, coin_id: &str, days: u32) -> Vec<Candle> {
        let attempts = self.config.history_attempts.max(1);

        for attempt in 1..=attempts {
            let (from, to) = window(days);

            match self
                .source
                .fetch_ohlc_range(coin_id, from, to, OhlcInterval::Daily)
                .await
            {
                Ok(candles) if !candles.is_empty() => return candles,
                Ok(_) => debug!("Empty OHLC range for {}", coin_id),
                Err(e) => debug!("OHLC range for {} failed: {}", coin_id, e),
            }

            match self.source.fetch_market_chart_range(coin_id, from, to).await {
                Ok(candles) if !candles.is_empty() => return candles,
                Ok(_) => debug!("Empty market chart for {}", coin_id),
                Err(e) => debug!("Market chart for {} failed: {}", coin_id, e),
            }

            if attempt < attempts {
                let delay = self.config.retry_delay * attempt;
                warn!(
                    "History attempt {} for {} failed, retrying in {:?}",
                    attempt, coin_id, delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        warn!("All {} history attempts failed for {}", attempts, coin_id);
        Vec::new()
    }
}

fn window(days: u32) -> (i64, i64) {
    let to = Utc::now().timestamp();
    (to - i64::from(days) * SECONDS_PER_DAY, to)
}

/// Details shown when the provider has nothing for a coin
pub fn placeholder_details(coin_id: &str) -> CoinDetails {
    let name = coin_id
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    CoinDetails {
        id: coin_id.to_string(),
        name,
        symbol: coin_id.chars().take(3).collect::<String>().to_uppercase(),
        description: format!("No details available for {}", coin_id),
        image: CoinImage {
            thumb: Some(PLACEHOLDER_IMAGE_URL.to_string()),
            small: Some(PLACEHOLDER_IMAGE_URL.to_string()),
            large: Some(PLACEHOLDER_IMAGE_URL.to_string()),
        },
        market_cap_rank: None,
        categories: vec!["cryptocurrency".to_string()],
        market_data: CoinMarketData {
            current_price: Some(1.0),
            market_cap: Some(1_000_000.0),
            total_volume: Some(100_000.0),
            price_change_24h: Some(0.0),
            price_change_7d: Some(0.0),
            price_change_30d: Some(0.0),
            circulating_supply: Some(1_000_000.0),
            total_supply: Some(1_000_000.0),
            ath: Some(2.0),
            atl: Some(0.5),
        },
    }
}

/// Random walk of daily candles ending near `current_price`, one per day up to `now`
pub fn synthetic_candles(
    current_price: f64,
    days: usize,
    volatility: f64,
    now: DateTime<Utc>,
) -> Vec<Candle> {
    let mut rng = rand::rng();
    let start_price = if current_price > 0.0 {
        current_price
    } else {
        1.0
    };
    let mut base = start_price * 0.9;
    let end_ms = now.timestamp_millis();

    (0..days)
        .map(|i| {
            let days_back = (days - i) as i64;
            let change = (rng.random::<f64>() - 0.5) * volatility;
            base *= 1.0 + change;

            let high = base * (1.0 + rng.random::<f64>() * 0.02);
            let low = base * (1.0 - rng.random::<f64>() * 0.02);
            let open = base + (rng.random::<f64>() - 0.5) * (high - low) * 0.5;
            let close = base + (rng.random::<f64>() - 0.5) * (high - low) * 0.5;

            Candle {
                timestamp: end_ms - days_back * SECONDS_PER_DAY * 1000,
                open,
                high,
                low,
                close,
                volume: Some(rng.random_range(1_000_000..10_000_000) as f64),
            }
        })
        .collect()
}
