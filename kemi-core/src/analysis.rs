//! Technical analysis result types

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of the prevailing trend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

/// How pronounced the trend is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendStrength {
    Strong,
    Moderate,
    #[default]
    Weak,
}

/// Action suggested by the indicator signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Buy,
    Sell,
    #[default]
    Hold,
}

/// Reliability of an analysis given how much history it was computed on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisQuality {
    High,
    Medium,
    Low,
    #[default]
    Insufficient,
}

impl AnalysisQuality {
    pub fn from_data_points(points: usize) -> Self {
        match points {
            p if p >= 50 => AnalysisQuality::High,
            p if p >= 20 => AnalysisQuality::Medium,
            _ => AnalysisQuality::Low,
        }
    }
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Bullish => "bullish",
            Trend::Bearish => "bearish",
            Trend::Neutral => "neutral",
        }
    }
}

impl TrendStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendStrength::Strong => "strong",
            TrendStrength::Moderate => "moderate",
            TrendStrength::Weak => "weak",
        }
    }
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "buy",
            Recommendation::Sell => "sell",
            Recommendation::Hold => "hold",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TrendStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AnalysisQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AnalysisQuality::High => "high",
            AnalysisQuality::Medium => "medium",
            AnalysisQuality::Low => "low",
            AnalysisQuality::Insufficient => "insufficient",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
}

/// Indicator values computed from close prices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub sma_20: f64,
    pub sma_50: f64,
    pub ema_12: f64,
    pub ema_26: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub bollinger_bands: BollingerBands,
    pub support_resistance: SupportResistance,
    pub volume_sma: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub trend: Trend,
    pub strength: TrendStrength,
    pub confidence: f64,
    /// Percent change over the last 10 closes
    pub price_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub trend: Trend,
    pub strength: TrendStrength,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub key_levels: BTreeMap<String, f64>,
    pub signals: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub current_price: f64,
    pub price_change_24h: f64,
    pub data_points: usize,
    pub analysis_quality: AnalysisQuality,
}

/// Full technical analysis for a price series.
///
/// `indicators` is `None` when there was too little data to compute them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub indicators: Option<Indicators>,
    pub trend_analysis: TrendAnalysis,
    pub signals: SignalSummary,
    pub summary: AnalysisSummary,
}

impl TechnicalAnalysis {
    /// Analysis returned when there aren't enough candles to say anything
    pub fn insufficient() -> Self {
        Self {
            indicators: None,
            trend_analysis: TrendAnalysis::default(),
            signals: SignalSummary {
                signals: vec!["Insufficient data for analysis".to_string()],
                ..SignalSummary::default()
            },
            summary: AnalysisSummary::default(),
        }
    }
}
