//! Server configuration loaded from environment variables

use std::env;
use std::time::Duration;

use kemi_ai::DEFAULT_GEMINI_MODEL;
use kemi_market::{CoinGeckoConfig, COINGECKO_API_BASE};
use kemi_services::{
    ANALYSIS_REQUESTS_PER_MINUTE, DEFAULT_DISPLAY_CAP, DEFAULT_POLL_INTERVAL,
};
use url::Url;

/// Everything `main` needs to wire the server
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub coingecko: CoinGeckoConfig,
    /// Root of another Kemi deployment serving the top movers proxy endpoint
    pub upstream_api_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub poll_interval: Duration,
    pub display_cap: usize,
    /// `max-age` sent with proxy endpoint responses
    pub top_movers_cache_ttl: Duration,
    pub analysis_cache_ttl: Duration,
    pub analysis_rate_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            coingecko: CoinGeckoConfig::default(),
            upstream_api_url: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            display_cap: DEFAULT_DISPLAY_CAP,
            top_movers_cache_ttl: Duration::from_secs(60),
            analysis_cache_ttl: Duration::from_secs(30 * 60),
            analysis_rate_limit: ANALYSIS_REQUESTS_PER_MINUTE,
        }
    }
}

impl ApiConfig {
    /// Load configuration from the process environment
    ///
    /// Every variable is optional. Unset or empty variables keep their default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let coingecko = CoinGeckoConfig {
            base_url: match var("COINGECKO_BASE_URL") {
                Some(raw) => parse_url("COINGECKO_BASE_URL", &raw)?,
                None => COINGECKO_API_BASE.to_string(),
            },
            api_key: var("COINGECKO_API_KEY"),
            pro: parse_bool(&var, "COINGECKO_PRO", false)?,
            enabled: parse_bool(&var, "COINGECKO_DIRECT", true)?,
            ..CoinGeckoConfig::default()
        };

        let upstream_api_url = var("UPSTREAM_API_URL")
            .map(|raw| parse_url("UPSTREAM_API_URL", &raw))
            .transpose()?;

        let display_cap = parse_num(&var, "GAINERS_DISPLAY_CAP", defaults.display_cap)?;
        if display_cap == 0 {
            return Err(ConfigError::Invalid {
                field: "GAINERS_DISPLAY_CAP".to_string(),
                error: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            port: parse_num(&var, "SERVER_PORT", defaults.port)?,
            coingecko,
            upstream_api_url,
            gemini_api_key: var("GEMINI_API_KEY"),
            gemini_model: var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            poll_interval: parse_secs(&var, "GAINERS_POLL_INTERVAL_SECS", defaults.poll_interval)?,
            display_cap,
            top_movers_cache_ttl: parse_secs(
                &var,
                "TOP_MOVERS_CACHE_TTL_SECS",
                defaults.top_movers_cache_ttl,
            )?,
            analysis_cache_ttl: parse_secs(
                &var,
                "ANALYSIS_CACHE_TTL_SECS",
                defaults.analysis_cache_ttl,
            )?,
            analysis_rate_limit: parse_num(
                &var,
                "ANALYSIS_RATE_LIMIT_PER_MIN",
                defaults.analysis_rate_limit,
            )?,
        })
    }
}

fn parse_url(field: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        field: field.to_string(),
        error: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            field: field.to_string(),
            error: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_num<T, F>(var: &F, field: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(field) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            field: field.to_string(),
            error: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_secs<F>(var: &F, field: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_num(var, field, default.as_secs()).map(Duration::from_secs)
}

fn parse_bool<F>(var: &F, field: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(field).map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                field: field.to_string(),
                error: format!("expected a boolean, got {}", v),
            }),
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {error}")]
    Invalid { field: String, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.coingecko.base_url, COINGECKO_API_BASE);
        assert!(config.coingecko.enabled);
        assert!(!config.coingecko.pro);
        assert!(config.upstream_api_url.is_none());
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.poll_interval, Duration::from_secs(120));
        assert_eq!(config.display_cap, 5);
        assert_eq!(config.top_movers_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.analysis_cache_ttl, Duration::from_secs(1800));
        assert_eq!(config.analysis_rate_limit, 10);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SERVER_PORT", "8080"),
            ("COINGECKO_API_KEY", "cg-key"),
            ("COINGECKO_PRO", "TRUE"),
            ("COINGECKO_DIRECT", "false"),
            ("UPSTREAM_API_URL", "https://kemi.example.com/"),
            ("GEMINI_API_KEY", "  "),
            ("GAINERS_POLL_INTERVAL_SECS", "30"),
            ("GAINERS_DISPLAY_CAP", "8"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.coingecko.api_key.as_deref(), Some("cg-key"));
        assert!(config.coingecko.pro);
        assert!(!config.coingecko.enabled);
        assert_eq!(
            config.upstream_api_url.as_deref(),
            Some("https://kemi.example.com")
        );
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.display_cap, 8);
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("SERVER_PORT", "http")]).is_err());
        assert!(load(&[("COINGECKO_DIRECT", "maybe")]).is_err());
        assert!(load(&[("UPSTREAM_API_URL", "not a url")]).is_err());
        assert!(load(&[("UPSTREAM_API_URL", "ftp://kemi.example.com")]).is_err());
        assert!(load(&[("GAINERS_DISPLAY_CAP", "0")]).is_err());

        let err = load(&[("ANALYSIS_CACHE_TTL_SECS", "-5")]).unwrap_err();
        assert!(err.to_string().contains("ANALYSIS_CACHE_TTL_SECS"));
    }
}
