//! Top movers endpoints: the CoinGecko proxy and the gainers widget feed

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use kemi_core::{KemiError, TopMoversParams};
use kemi_market::{top_movers_to_value, TOP_GAINERS_LOSERS_TOOL};
use kemi_services::GainersSnapshot;
use serde::Deserialize;
use tracing::{info, warn};

use super::ApiError;
use crate::AppState;

/// Body of a proxy request. Missing arguments fall back to the defaults.
#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    pub tool: String,
    #[serde(default)]
    pub arguments: ToolArguments,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolArguments {
    pub duration: Option<String>,
    pub vs_currency: Option<String>,
    pub top_coins: Option<String>,
}

impl ToolArguments {
    fn into_params(self) -> TopMoversParams {
        let defaults = TopMoversParams::default();
        TopMoversParams {
            duration: self.duration.unwrap_or(defaults.duration),
            vs_currency: self.vs_currency.unwrap_or(defaults.vs_currency),
            top_coins: self.top_coins.unwrap_or(defaults.top_coins),
        }
    }
}

/// Create movers routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/mcp/coingecko/top-gainers-losers", post(top_gainers_losers))
        .route("/gainers", get(get_gainers))
        .route("/gainers/refresh", post(refresh_gainers))
}

/// Forward a top gainers/losers query to the market data provider
async fn top_gainers_losers(
    State(state): State<AppState>,
    Json(request): Json<ToolCallRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.tool != TOP_GAINERS_LOSERS_TOOL {
        return Err(ApiError::bad_request(format!(
            "Unknown tool: {}",
            request.tool
        )));
    }

    let params = request.arguments.into_params();
    info!(
        "Top movers request: duration={}, vs_currency={}, top_coins={}",
        params.duration, params.vs_currency, params.top_coins
    );

    let movers = state
        .movers
        .fetch_top_movers(&params)
        .await
        .map_err(|e| {
            warn!("Top movers upstream failed: {}", e);
            ApiError::new(StatusCode::BAD_GATEWAY, KemiError::from(e).to_string())
        })?;

    let cache_control = format!(
        "public, max-age={}",
        state.top_movers_cache_ttl.as_secs()
    );
    let cache_control = HeaderValue::from_str(&cache_control)
        .unwrap_or_else(|_| HeaderValue::from_static("no-store"));

    let body = top_movers_to_value(&movers, &params.vs_currency, &params.duration);
    Ok(([(header::CACHE_CONTROL, cache_control)], Json(body)))
}

/// Current gainers widget state
async fn get_gainers(State(state): State<AppState>) -> Json<GainersSnapshot> {
    Json(state.poller.snapshot().with_display_images())
}

/// Retry now instead of waiting for the next poll
async fn refresh_gainers(State(state): State<AppState>) -> Json<GainersSnapshot> {
    info!("Manual gainers refresh");
    Json(state.poller.refresh().await.with_display_images())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{asset, get, json_body, post_json, send, state};
    use axum::http::{header, StatusCode};
    use kemi_core::PLACEHOLDER_IMAGE_URL;
    use kemi_services::GENERIC_ERROR_MESSAGE;
    use serde_json::json;

    #[tokio::test]
    async fn test_proxy_returns_movers_with_cache_header() {
        let state = state(Some(vec![asset("ZORA", 2, 137)]), 10);
        let response = send(
            state,
            post_json(
                "/api/mcp/coingecko/top-gainers-losers",
                &json!({
                    "tool": "get_coins_top_gainers_losers",
                    "arguments": {"duration": "24h", "vs_currency": "usd", "top_coins": "300"}
                }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=60"
        );
        let body = json_body(response).await;
        assert_eq!(body["top_gainers"][0]["symbol"], "ZORA");
        assert_eq!(body["top_gainers"][0]["usd_24h_change"], 137.0);
        assert_eq!(body["top_losers"], json!([]));
    }

    #[tokio::test]
    async fn test_proxy_keys_follow_requested_currency_and_window() {
        let state = state(Some(vec![asset("ZORA", 2, 137)]), 10);
        let response = send(
            state,
            post_json(
                "/api/mcp/coingecko/top-gainers-losers",
                &json!({
                    "tool": "get_coins_top_gainers_losers",
                    "arguments": {"duration": "1h", "vs_currency": "eur"}
                }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let zora = &body["top_gainers"][0];
        assert_eq!(zora["eur"], 2.0);
        assert_eq!(zora["eur_24h_vol"], 1_000_000.0);
        assert_eq!(zora["eur_1h_change"], 137.0);
        assert!(zora.get("usd").is_none());
        assert!(zora.get("usd_24h_vol").is_none());
        assert!(zora.get("usd_24h_change").is_none());
    }

    #[tokio::test]
    async fn test_proxy_defaults_missing_arguments() {
        let state = state(Some(vec![]), 10);
        let response = send(
            state,
            post_json(
                "/api/mcp/coingecko/top-gainers-losers",
                &json!({"tool": "get_coins_top_gainers_losers"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_proxy_rejects_unknown_tool() {
        let response = send(
            state(Some(vec![]), 10),
            post_json(
                "/api/mcp/coingecko/top-gainers-losers",
                &json!({"tool": "get_coin_prices", "arguments": {}}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Unknown tool: get_coin_prices");
    }

    #[tokio::test]
    async fn test_proxy_upstream_failure() {
        let response = send(
            state(None, 10),
            post_json(
                "/api/mcp/coingecko/top-gainers-losers",
                &json!({"tool": "get_coins_top_gainers_losers", "arguments": {}}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_refresh_then_get_gainers() {
        let state = state(
            Some(vec![
                asset("USDT", 1, 50),
                asset("ZORA", 2, 137),
                asset("XYZ", 3, 4),
            ]),
            10,
        );
        state.poller.start();

        let response = send(state.clone(), post_json("/api/gainers/refresh", &json!({}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["gainers"].as_array().unwrap().len(), 1);
        assert_eq!(body["gainers"][0]["id"], "zora");
        assert_eq!(body["gainers"][0]["image"], PLACEHOLDER_IMAGE_URL);
        assert!(body["error"].is_null());

        let body = json_body(send(state.clone(), get("/api/gainers")).await).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["gainers"][0]["symbol"], "ZORA");

        state.poller.stop();
    }

    #[tokio::test]
    async fn test_refresh_failure_serves_fallback() {
        let state = state(None, 10);
        state.poller.start();

        let response = send(state.clone(), post_json("/api/gainers/refresh", &json!({}))).await;
        let body = json_body(response).await;
        assert_eq!(body["status"], "failure");
        assert_eq!(body["error"], GENERIC_ERROR_MESSAGE);
        let ids: Vec<&str> = body["gainers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["zora", "pump-fun", "sui"]);

        state.poller.stop();
    }
}
