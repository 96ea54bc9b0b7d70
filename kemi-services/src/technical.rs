//! Technical indicators over candle closes
//!
//! All indicator functions take close prices oldest-first. Price-like
//! outputs are rounded with the precision appropriate for the latest close.

use std::collections::BTreeMap;

use kemi_core::{
    round_to_precision, AnalysisQuality, AnalysisSummary, BollingerBands, Candle, Indicators,
    Recommendation, SignalSummary, SupportResistance, TechnicalAnalysis, Trend, TrendAnalysis,
    TrendStrength,
};

/// Below this many candles no analysis is attempted
pub const MIN_CANDLES: usize = 5;

const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_STD_DEV: f64 = 2.0;
const SUPPORT_LOOKBACK: usize = 50;
const VOLATILITY_PERIOD: usize = 20;

/// Simple moving average of the last `period` prices.
/// Falls back to the latest price when the series is shorter than `period`.
pub fn sma(prices: &[f64], period: usize) -> f64 {
    if prices.len() < period || period == 0 {
        return prices.last().copied().unwrap_or(0.0);
    }
    mean(&prices[prices.len() - period..])
}

/// Exponential moving average seeded with the first price
pub fn ema(prices: &[f64], period: usize) -> f64 {
    if prices.len() < period {
        return prices.last().copied().unwrap_or(0.0);
    }
    ema_series(prices, period).last().copied().unwrap_or(0.0)
}

fn ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut series = Vec::with_capacity(prices.len());
    let mut current = match prices.first() {
        Some(first) => *first,
        None => return series,
    };
    series.push(current);
    for price in &prices[1..] {
        current = price * multiplier + current * (1.0 - multiplier);
        series.push(current);
    }
    series
}

/// Relative strength index over the last `period` price changes
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if prices.len() < period + 1 {
        return 50.0;
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let recent = &deltas[deltas.len() - period..];
    let avg_gain = recent.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
    let avg_loss = recent.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// MACD line, signal line and histogram.
///
/// The signal line is an EMA of the MACD series, taken from the point where
/// the slow EMA has a full window.
pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> (f64, f64, f64) {
    if prices.len() < slow {
        return (0.0, 0.0, 0.0);
    }

    let fast_series = ema_series(prices, fast);
    let slow_series = ema_series(prices, slow);
    let macd_series: Vec<f64> = fast_series
        .iter()
        .zip(&slow_series)
        .skip(slow - 1)
        .map(|(f, s)| f - s)
        .collect();

    let macd_line = macd_series.last().copied().unwrap_or(0.0);
    let signal_line = ema(&macd_series, signal);
    (macd_line, signal_line, macd_line - signal_line)
}

/// Bollinger bands with a population standard deviation
pub fn bollinger_bands(prices: &[f64], period: usize, std_dev: f64) -> BollingerBands {
    if prices.len() < period {
        let current = prices.last().copied().unwrap_or(0.0);
        return BollingerBands {
            upper: current,
            middle: current,
            lower: current,
        };
    }

    let middle = sma(prices, period);
    let std = std_dev_population(&prices[prices.len() - period..]);
    BollingerBands {
        upper: middle + std * std_dev,
        middle,
        lower: middle - std * std_dev,
    }
}

/// Support and resistance from local extrema of the recent closes.
///
/// A point is an extremum when it is strictly below (or above) its two
/// neighbours on each side. Without extrema the window's min / max is used.
pub fn support_resistance(prices: &[f64]) -> SupportResistance {
    if prices.len() < 10 {
        let current = prices.last().copied().unwrap_or(0.0);
        return SupportResistance {
            support: current * 0.95,
            resistance: current * 1.05,
        };
    }

    let recent = &prices[prices.len().saturating_sub(SUPPORT_LOOKBACK)..];
    let mut lows = Vec::new();
    let mut highs = Vec::new();
    for i in 2..recent.len() - 2 {
        let p = recent[i];
        let neighbours = [recent[i - 2], recent[i - 1], recent[i + 1], recent[i + 2]];
        if neighbours.iter().all(|n| p < *n) {
            lows.push(p);
        }
        if neighbours.iter().all(|n| p > *n) {
            highs.push(p);
        }
    }

    let support = if lows.is_empty() {
        recent.iter().copied().fold(f64::INFINITY, f64::min)
    } else {
        mean(&lows)
    };
    let resistance = if highs.is_empty() {
        recent.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    } else {
        mean(&highs)
    };

    SupportResistance {
        support,
        resistance,
    }
}

/// Standard deviation of the last `period` simple returns, in percent
pub fn volatility(prices: &[f64], period: usize) -> f64 {
    if prices.len() < period || period < 2 {
        return 0.0;
    }
    let window = &prices[prices.len() - period..];
    let returns: Vec<f64> = window
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    std_dev_population(&returns) * 100.0
}

/// Trend from SMA10 vs SMA20 and the change over the last 10 closes
pub fn analyze_trend(prices: &[f64]) -> TrendAnalysis {
    if prices.len() < 10 {
        return TrendAnalysis::default();
    }

    let short = sma(prices, 10);
    let long = sma(prices, 20);
    let reference = prices[prices.len() - 10];
    let last = prices[prices.len() - 1];
    let price_change = if reference != 0.0 {
        (last - reference) / reference * 100.0
    } else {
        0.0
    };

    let (trend, strength) = if short > long && price_change > 2.0 {
        let strength = if price_change > 10.0 {
            TrendStrength::Strong
        } else {
            TrendStrength::Moderate
        };
        (Trend::Bullish, strength)
    } else if short < long && price_change < -2.0 {
        let strength = if price_change < -10.0 {
            TrendStrength::Strong
        } else {
            TrendStrength::Moderate
        };
        (Trend::Bearish, strength)
    } else {
        (Trend::Neutral, TrendStrength::Weak)
    };

    TrendAnalysis {
        trend,
        strength,
        confidence: (prices.len() as f64 * 2.0).min(100.0),
        price_change,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Bias {
    Bullish,
    Bearish,
}

/// Human-readable signals, recommendation and confidence
pub fn generate_signals(
    indicators: &Indicators,
    current_price: f64,
    trend: &TrendAnalysis,
) -> SignalSummary {
    let mut signals: Vec<(&str, Bias)> = Vec::new();

    if indicators.rsi > 70.0 {
        signals.push(("RSI indicates overbought conditions", Bias::Bearish));
    } else if indicators.rsi < 30.0 {
        signals.push(("RSI indicates oversold conditions", Bias::Bullish));
    }

    if indicators.macd > indicators.macd_signal {
        signals.push(("MACD shows bullish momentum", Bias::Bullish));
    } else {
        signals.push(("MACD shows bearish momentum", Bias::Bearish));
    }

    let bands = &indicators.bollinger_bands;
    if current_price > bands.upper {
        signals.push((
            "Price above upper Bollinger Band - potential reversal",
            Bias::Bearish,
        ));
    } else if current_price < bands.lower {
        signals.push((
            "Price below lower Bollinger Band - potential bounce",
            Bias::Bullish,
        ));
    }

    if indicators.ema_12 > indicators.ema_26 {
        signals.push((
            "Short-term EMA above long-term EMA - bullish signal",
            Bias::Bullish,
        ));
    } else {
        signals.push((
            "Short-term EMA below long-term EMA - bearish signal",
            Bias::Bearish,
        ));
    }

    let bullish = signals.iter().filter(|(_, b)| *b == Bias::Bullish).count();
    let bearish = signals.len() - bullish;
    let recommendation = match bullish.cmp(&bearish) {
        std::cmp::Ordering::Greater => Recommendation::Buy,
        std::cmp::Ordering::Less => Recommendation::Sell,
        std::cmp::Ordering::Equal => Recommendation::Hold,
    };

    let spread = bullish.abs_diff(bearish) as f64 / signals.len() as f64 * 100.0;
    let confidence = (spread + trend.confidence * 0.3).min(100.0);

    let key_levels = BTreeMap::from([
        ("support".to_string(), indicators.support_resistance.support),
        (
            "resistance".to_string(),
            indicators.support_resistance.resistance,
        ),
        ("sma_20".to_string(), indicators.sma_20),
        ("sma_50".to_string(), indicators.sma_50),
    ]);

    SignalSummary {
        trend: trend.trend,
        strength: trend.strength,
        recommendation,
        confidence,
        key_levels,
        signals: signals.into_iter().map(|(s, _)| s.to_string()).collect(),
    }
}

/// Run every indicator over `candles` (oldest first)
pub fn analyze(candles: &[Candle]) -> TechnicalAnalysis {
    if candles.len() < MIN_CANDLES {
        return TechnicalAnalysis::insufficient();
    }

    let prices: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volumes: Vec<f64> = candles.iter().filter_map(|c| c.volume).collect();
    let current = prices[prices.len() - 1];
    let previous = prices[prices.len() - 2];

    let (macd_line, macd_signal, macd_histogram) =
        macd(&prices, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let volume_sma = if volumes.len() >= 20 {
        mean(&volumes[volumes.len() - 20..])
    } else {
        mean(&volumes)
    };
    let price_change_24h = if previous != 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    };

    let indicators = Indicators {
        sma_20: sma(&prices, 20),
        sma_50: sma(&prices, 50),
        ema_12: ema(&prices, 12),
        ema_26: ema(&prices, 26),
        rsi: rsi(&prices, RSI_PERIOD),
        macd: macd_line,
        macd_signal,
        macd_histogram,
        bollinger_bands: bollinger_bands(&prices, BOLLINGER_PERIOD, BOLLINGER_STD_DEV),
        support_resistance: support_resistance(&prices),
        volume_sma,
        volatility: volatility(&prices, VOLATILITY_PERIOD),
    };

    let trend_analysis = analyze_trend(&prices);
    let signals = generate_signals(&indicators, current, &trend_analysis);

    let price = |v: f64| round_to_precision(v, Some(current));
    TechnicalAnalysis {
        indicators: Some(Indicators {
            sma_20: price(indicators.sma_20),
            sma_50: price(indicators.sma_50),
            ema_12: price(indicators.ema_12),
            ema_26: price(indicators.ema_26),
            rsi: round_dp(indicators.rsi, 2),
            macd: price(indicators.macd),
            macd_signal: price(indicators.macd_signal),
            macd_histogram: price(indicators.macd_histogram),
            bollinger_bands: BollingerBands {
                upper: price(indicators.bollinger_bands.upper),
                middle: price(indicators.bollinger_bands.middle),
                lower: price(indicators.bollinger_bands.lower),
            },
            support_resistance: SupportResistance {
                support: price(indicators.support_resistance.support),
                resistance: price(indicators.support_resistance.resistance),
            },
            volume_sma: round_dp(indicators.volume_sma, 2),
            volatility: round_dp(indicators.volatility, 2),
        }),
        trend_analysis: TrendAnalysis {
            price_change: round_dp(trend_analysis.price_change, 2),
            ..trend_analysis
        },
        signals: SignalSummary {
            confidence: round_dp(signals.confidence, 1),
            key_levels: signals
                .key_levels
                .iter()
                .map(|(k, v)| (k.clone(), price(*v)))
                .collect(),
            ..signals
        },
        summary: AnalysisSummary {
            current_price: price(current),
            price_change_24h: round_dp(price_change_24h, 2),
            data_points: candles.len(),
            analysis_quality: AnalysisQuality::from_data_points(candles.len()),
        },
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev_population(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn round_dp(value: f64, dp: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}
