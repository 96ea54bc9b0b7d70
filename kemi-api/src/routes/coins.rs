//! Per-coin analysis endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use kemi_core::{is_valid_coin_id, KemiError};
use kemi_market::OhlcInterval;
use kemi_services::{
    CacheStats, CachedReport, CoinAnalysisReport, OhlcReport, RateLimiterStats, TechnicalReport,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ApiError;
use crate::AppState;

/// Query parameters for the full analysis
#[derive(Debug, Deserialize)]
pub struct AnalysisQuery {
    /// Skip the cache and recompute
    #[serde(default)]
    pub force_refresh: bool,
}

/// Query parameters for the technical analysis
#[derive(Debug, Deserialize)]
pub struct TechnicalQuery {
    /// History window in days (7 to 365)
    pub days: Option<u32>,
}

/// Query parameters for raw candles
#[derive(Debug, Deserialize)]
pub struct OhlcQuery {
    /// History window in days (1 to 365)
    pub days: Option<u32>,
    /// `daily` or `hourly`
    pub interval: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CacheClearedResponse {
    pub message: String,
    pub cleared_entries: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub cache: CacheStats,
    pub rate_limiter: RateLimiterStats,
}

/// Create coin routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/coins/cache/clear", post(clear_cache))
        .route("/coins/cache/stats", get(cache_stats))
        .route("/coins/{coin_id}/analysis", get(get_analysis))
        .route("/coins/{coin_id}/technical", get(get_technical))
        .route("/coins/{coin_id}/ohlc", get(get_ohlc))
}

fn normalize_id(coin_id: &str) -> Result<String, ApiError> {
    let id = coin_id.trim().to_lowercase();
    if id.is_empty() {
        return Err(ApiError::bad_request("coin_id must not be empty"));
    }
    if !is_valid_coin_id(&id) {
        return Err(ApiError::bad_request(
            "coin_id may only contain letters, digits and '-'",
        ));
    }
    Ok(id)
}

/// Full analysis: coin info, market data, indicators and written commentary
async fn get_analysis(
    State(state): State<AppState>,
    Path(coin_id): Path<String>,
    Query(params): Query<AnalysisQuery>,
) -> Result<Json<CachedReport<CoinAnalysisReport>>, ApiError> {
    let coin_id = normalize_id(&coin_id)?;

    if !state.rate_limiter.try_acquire().await {
        let window = state.rate_limiter.window().as_secs();
        return Err(KemiError::rate_limited(format!(
            "too many analysis requests, try again within {} seconds",
            window
        ))
        .into());
    }

    info!(
        "Analysis request for {} (force_refresh: {})",
        coin_id, params.force_refresh
    );
    Ok(Json(
        state.analysis.analyze(&coin_id, params.force_refresh).await,
    ))
}

async fn get_technical(
    State(state): State<AppState>,
    Path(coin_id): Path<String>,
    Query(params): Query<TechnicalQuery>,
) -> Result<Json<CachedReport<TechnicalReport>>, ApiError> {
    let coin_id = normalize_id(&coin_id)?;
    let report = state
        .analysis
        .technical(&coin_id, params.days.unwrap_or(30))
        .await?;
    Ok(Json(report))
}

async fn get_ohlc(
    State(state): State<AppState>,
    Path(coin_id): Path<String>,
    Query(params): Query<OhlcQuery>,
) -> Result<Json<OhlcReport>, ApiError> {
    let coin_id = normalize_id(&coin_id)?;
    let interval = match params.interval.as_deref() {
        Some(raw) => raw
            .parse::<OhlcInterval>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
        None => OhlcInterval::Daily,
    };

    let report = state
        .analysis
        .ohlc(&coin_id, params.days.unwrap_or(30), interval)
        .await?;
    Ok(Json(report))
}

async fn clear_cache(State(state): State<AppState>) -> Json<CacheClearedResponse> {
    let cleared = state.analysis.clear_cache();
    Json(CacheClearedResponse {
        message: format!("Cleared {} cached entries", cleared),
        cleared_entries: cleared,
    })
}

async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        cache: state.analysis.cache_stats(),
        rate_limiter: state.rate_limiter.stats(),
    })
}
