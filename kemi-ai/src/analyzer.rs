//! Analyst commentary built on top of technical analysis
//!
//! The analyzer asks a [`TextGenerator`] for a written report. When no
//! generator is configured, or the call fails, it produces a deterministic
//! markdown report from the same numbers instead.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kemi_core::{
    format_crypto_price, format_with_separators, AnalysisSummary, CoinDetails, Indicators,
    Recommendation, TechnicalAnalysis,
};

use crate::gemini::TextGenerator;

/// Label recorded when the deterministic report was used
pub const FALLBACK_PROVIDER: &str = "enhanced_fallback";

const DISCLAIMER: &str = "*This analysis is based on technical indicators and should not be considered as financial advice. Always do your own research before making investment decisions.*";

/// Everything the analyzer looks at for one coin
#[derive(Debug, Clone)]
pub struct CoinAnalysisInput {
    pub coin: CoinDetails,
    pub technical: TechnicalAnalysis,
}

impl CoinAnalysisInput {
    pub fn new(coin: CoinDetails, technical: TechnicalAnalysis) -> Self {
        Self { coin, technical }
    }
}

/// Written analysis for a coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub analysis: String,
    /// `gemini` or `enhanced_fallback`
    pub provider: String,
    pub timestamp: DateTime<Utc>,
    pub coin_id: String,
    pub coin_name: String,
    pub technical_summary: AnalysisSummary,
    pub recommendation: Recommendation,
    pub confidence: f64,
}

impl AiAnalysis {
    pub fn is_fallback(&self) -> bool {
        self.provider == FALLBACK_PROVIDER
    }
}

#[derive(Clone, Default)]
pub struct AiAnalyzer {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl AiAnalyzer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        match &generator {
            Some(g) => info!("AI analyzer using {}", g.name()),
            None => warn!("No AI provider configured, analyses will use the fallback report"),
        }
        Self { generator }
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn analyze(&self, input: &CoinAnalysisInput) -> AiAnalysis {
        let generated = match &self.generator {
            Some(generator) => match generator.generate(&build_prompt(input)).await {
                Ok(text) => Some((text, generator.name().to_string())),
                Err(e) => {
                    warn!("AI analysis for {} failed, using fallback: {}", input.coin.id, e);
                    None
                }
            },
            None => None,
        };

        let (analysis, provider) = generated
            .unwrap_or_else(|| (fallback_report(input), FALLBACK_PROVIDER.to_string()));

        let signals = &input.technical.signals;
        AiAnalysis {
            analysis,
            provider,
            timestamp: Utc::now(),
            coin_id: input.coin.id.clone(),
            coin_name: input.coin.name.clone(),
            technical_summary: input.technical.summary.clone(),
            recommendation: signals.recommendation,
            confidence: signals.confidence,
        }
    }
}

/// Prompt sent to the text generator
pub fn build_prompt(input: &CoinAnalysisInput) -> String {
    let coin = &input.coin;
    let market = &coin.market_data;
    let signals = &input.technical.signals;
    let summary = &input.technical.summary;
    let indicators = input.technical.indicators.clone().unwrap_or_default();

    let mut prompt = format!(
        "You are a professional cryptocurrency analyst. Analyze {} ({}) using the provided technical data and market information.\n\n",
        coin.name,
        coin.id.to_uppercase()
    );

    prompt.push_str("CURRENT MARKET DATA:\n");
    prompt.push_str(&format!("- Price: ${}\n", format_with_separators(coin.current_price(), 2)));
    prompt.push_str(&format!("- 24h Change: {:+.2}%\n", market.price_change_24h.unwrap_or(0.0)));
    prompt.push_str(&format!("- Market Cap: {}\n", usd_or_na(market.market_cap)));
    prompt.push_str(&format!("- 24h Volume: {}\n", usd_or_na(market.total_volume)));
    prompt.push_str(&format!(
        "- Market Cap Rank: #{}\n",
        coin.market_cap_rank
            .map(|r| r.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    ));

    prompt.push_str("\nTECHNICAL ANALYSIS DATA:\n");
    prompt.push_str(&format!(
        "- Overall Trend: {} ({} strength)\n",
        title_case(signals.trend.as_str()),
        title_case(signals.strength.as_str())
    ));
    prompt.push_str(&format!(
        "- Technical Recommendation: {}\n",
        signals.recommendation.as_str().to_uppercase()
    ));
    prompt.push_str(&format!("- Analysis Confidence: {:.1}%\n", signals.confidence));
    prompt.push_str(&format!(
        "- Data Quality: {} ({} data points)\n",
        title_case(&summary.analysis_quality.to_string()),
        summary.data_points
    ));

    prompt.push_str("\nKEY TECHNICAL INDICATORS:\n");
    prompt.push_str(&format!("- RSI (14): {}\n", describe_rsi(indicators.rsi)));
    let macd_momentum = if indicators.macd > indicators.macd_signal {
        "Bullish momentum"
    } else {
        "Bearish momentum"
    };
    prompt.push_str(&format!("- MACD: {:.2} ({})\n", indicators.macd, macd_momentum));
    prompt.push_str(&format!("- SMA 20: ${}\n", format_with_separators(indicators.sma_20, 2)));
    prompt.push_str(&format!("- SMA 50: ${}\n", format_with_separators(indicators.sma_50, 2)));
    prompt.push_str(&format!("- EMA 12: ${}\n", format_with_separators(indicators.ema_12, 2)));
    prompt.push_str(&format!("- EMA 26: ${}\n", format_with_separators(indicators.ema_26, 2)));
    prompt.push_str(&format!("- Volatility: {:.2}%\n", indicators.volatility));

    write_levels(&mut prompt, &indicators);

    prompt.push_str("\nTECHNICAL SIGNALS DETECTED:\n");
    write_signals(&mut prompt, &signals.signals, "No specific signals detected");

    prompt.push_str("\nCOIN FUNDAMENTALS:\n");
    prompt.push_str(&format_fundamentals(coin));

    prompt.push_str(
        "\n\nPlease provide a comprehensive analysis with these sections:\n\n\
         ## Market Overview\n\
         Analyze the current market position, recent price action, and overall market sentiment based on the data.\n\n\
         ## Technical Analysis Interpretation\n\
         Explain what the technical indicators suggest about price momentum, trend strength, and potential reversals. Reference specific indicator values.\n\n\
         ## Key Price Levels\n\
         Identify critical support and resistance levels, and explain their significance for trading decisions.\n\n\
         ## Risk Assessment\n\
         Evaluate volatility, potential risks, and market uncertainties based on the technical data.\n\n\
         ## Trading Insights\n\
         Provide short-term and medium-term outlook based on the technical analysis. Include potential entry/exit points.\n\n\
         ## Investment Perspective\n\
         Consider fundamental factors and longer-term implications for investors.\n\n\
         Use specific numbers from the data provided. Be analytical and educational, avoiding direct financial advice. Format with clear headings and bullet points.",
    );

    prompt
}

/// Markdown report built only from the numbers, used when no AI text is available
pub fn fallback_report(input: &CoinAnalysisInput) -> String {
    let coin = &input.coin;
    let market = &coin.market_data;
    let signals = &input.technical.signals;
    let indicators = input.technical.indicators.as_ref();

    let mut report = format!(
        "# Technical Analysis for {} ({})\n\n",
        coin.name,
        coin.id.to_uppercase()
    );

    report.push_str("## Market Overview\n");
    report.push_str(&format!(
        "- **Current Price**: {}\n",
        format_crypto_price(coin.current_price(), "usd")
    ));
    report.push_str(&format!("- **24h Change**: {:+.2}%\n", market.price_change_24h.unwrap_or(0.0)));
    report.push_str(&format!("- **Market Cap**: {}\n", usd_or_na(market.market_cap)));
    report.push_str(&format!("- **24h Volume**: {}\n", usd_or_na(market.total_volume)));

    report.push_str("\n## Technical Analysis Summary\n");
    report.push_str(&format!("- **Trend**: {}\n", title_case(signals.trend.as_str())));
    report.push_str(&format!("- **Strength**: {}\n", title_case(signals.strength.as_str())));
    report.push_str(&format!(
        "- **Recommendation**: {}\n",
        signals.recommendation.as_str().to_uppercase()
    ));
    report.push_str(&format!("- **Confidence**: {:.1}%\n", signals.confidence));

    report.push_str("\n## Key Technical Indicators\n");
    match indicators {
        Some(ind) => {
            report.push_str(&format!("- **RSI (14)**: {}\n", describe_rsi(ind.rsi)));
            report.push_str(&format!(
                "- **Moving Averages**: SMA20: {}, SMA50: {}\n",
                format_crypto_price(ind.sma_20, "usd"),
                format_crypto_price(ind.sma_50, "usd")
            ));
            let momentum = if ind.macd > 0.0 {
                "Bullish momentum"
            } else if ind.macd < 0.0 {
                "Bearish momentum"
            } else {
                "Neutral"
            };
            report.push_str(&format!("- **MACD**: {} - {}\n", ind.macd, momentum));
            report.push_str(&format!(
                "\n## Support & Resistance Levels\n- **Support**: {}\n- **Resistance**: {}\n",
                format_crypto_price(ind.support_resistance.support, "usd"),
                format_crypto_price(ind.support_resistance.resistance, "usd")
            ));
            let volatility = if ind.volatility > 5.0 {
                "High volatility"
            } else if ind.volatility > 2.0 {
                "Moderate volatility"
            } else {
                "Low volatility"
            };
            report.push_str(&format!(
                "\n## Risk Assessment\n- **Volatility**: {:.2}% - {}\n",
                ind.volatility, volatility
            ));
        }
        None => {
            report.push_str("- Indicator data unavailable\n");
            report.push_str("\n## Risk Assessment\n- **Volatility**: Volatility data unavailable\n");
        }
    }
    report.push_str(&format!(
        "- **Analysis Quality**: {}\n",
        title_case(&input.technical.summary.analysis_quality.to_string())
    ));

    report.push_str("\n## Technical Signals\n");
    write_signals(&mut report, &signals.signals, "No signals available");

    report.push_str("\n---\n");
    report.push_str(DISCLAIMER);
    report
}

fn write_levels(out: &mut String, indicators: &Indicators) {
    let sr = &indicators.support_resistance;
    let bb = &indicators.bollinger_bands;
    out.push_str(&format!(
        "\nSUPPORT & RESISTANCE LEVELS:\n- Support: ${}\n- Resistance: ${}\n",
        format_with_separators(sr.support, 2),
        format_with_separators(sr.resistance, 2)
    ));
    out.push_str(&format!(
        "\nBOLLINGER BANDS:\n- Upper Band: ${}\n- Middle Band: ${}\n- Lower Band: ${}\n",
        format_with_separators(bb.upper, 2),
        format_with_separators(bb.middle, 2),
        format_with_separators(bb.lower, 2)
    ));
}

fn write_signals(out: &mut String, signals: &[String], empty: &str) {
    if signals.is_empty() {
        out.push_str(&format!("- {}\n", empty));
        return;
    }
    for signal in signals {
        out.push_str(&format!("- {}\n", signal));
    }
}

fn format_fundamentals(coin: &CoinDetails) -> String {
    let mut parts = Vec::new();

    if !coin.description.is_empty() {
        let desc: String = coin.description.chars().take(200).collect();
        let ellipsis = if coin.description.chars().count() > 200 {
            "..."
        } else {
            ""
        };
        parts.push(format!("- Description: {}{}", desc, ellipsis));
    }
    if let Some(rank) = coin.market_cap_rank {
        parts.push(format!("- Market Cap Rank: #{}", rank));
    }
    if let Some(supply) = coin.market_data.total_supply {
        parts.push(format!("- Total Supply: {}", format_with_separators(supply, 0)));
    }
    if let Some(supply) = coin.market_data.circulating_supply {
        parts.push(format!("- Circulating Supply: {}", format_with_separators(supply, 0)));
    }
    if !coin.categories.is_empty() {
        let categories: Vec<&str> = coin.categories.iter().take(3).map(String::as_str).collect();
        parts.push(format!("- Categories: {}", categories.join(", ")));
    }

    if parts.is_empty() {
        "- No additional coin information available".to_string()
    } else {
        parts.join("\n")
    }
}

fn describe_rsi(rsi: f64) -> String {
    if rsi > 70.0 {
        format!("{:.1} (Overbought - potential sell signal)", rsi)
    } else if rsi < 30.0 {
        format!("{:.1} (Oversold - potential buy signal)", rsi)
    } else {
        format!("{:.1} (Neutral zone)", rsi)
    }
}

fn usd_or_na(value: Option<f64>) -> String {
    match value {
        Some(v) if v > 0.0 => format!("${}", format_with_separators(v, 0)),
        _ => "N/A".to_string(),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
