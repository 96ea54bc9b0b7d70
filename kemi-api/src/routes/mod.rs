//! API route definitions

mod coins;
mod health;
mod movers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use kemi_core::KemiError;
use serde::Serialize;
use tracing::error;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(movers::routes())
        .merge(coins::routes())
        .merge(health::routes())
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error carrying the status to answer with
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<KemiError> for ApiError {
    fn from(err: KemiError) -> Self {
        let status = match &err {
            KemiError::InvalidInput(_) | KemiError::Parse(_) => StatusCode::BAD_REQUEST,
            KemiError::NotFound(_) => StatusCode::NOT_FOUND,
            KemiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            KemiError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            e if e.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed ({}): {}", self.status, self.message);
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Stub data sources and state for route tests

    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, Response};
    use kemi_ai::AiAnalyzer;
    use kemi_core::{Candle, CoinDetails, MarketAsset, TopMovers, TopMoversParams};
    use kemi_market::{CoinDataSource, MarketDataError, OhlcInterval, TopMoversProvider};
    use kemi_services::{
        CoinAnalysisConfig, CoinAnalysisService, GainersPoller, PollerConfig, RateLimiter,
    };
    use rust_decimal::Decimal;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::AppState;

    /// Top movers source that either answers with `gainers` or fails
    pub struct StubMovers {
        pub gainers: Option<Vec<MarketAsset>>,
    }

    #[async_trait]
    impl TopMoversProvider for StubMovers {
        fn name(&self) -> &str {
            "stub"
        }

        async fn fetch_top_movers(
            &self,
            _params: &TopMoversParams,
        ) -> Result<TopMovers, MarketDataError> {
            match &self.gainers {
                Some(gainers) => Ok(TopMovers {
                    top_gainers: gainers.clone(),
                    top_losers: vec![],
                }),
                None => Err(MarketDataError::Network("connection refused".to_string())),
            }
        }
    }

    /// Coin source that knows only `bitcoin`
    pub struct StubCoins;

    #[async_trait]
    impl CoinDataSource for StubCoins {
        async fn fetch_coin(&self, coin_id: &str) -> Result<CoinDetails, MarketDataError> {
            if coin_id != "bitcoin" {
                return Err(MarketDataError::NotFound(coin_id.to_string()));
            }
            Ok(CoinDetails {
                id: "bitcoin".to_string(),
                name: "Bitcoin".to_string(),
                symbol: "btc".to_string(),
                description: String::new(),
                image: Default::default(),
                market_cap_rank: Some(1),
                categories: vec![],
                market_data: Default::default(),
            })
        }

        async fn fetch_ohlc_range(
            &self,
            coin_id: &str,
            _from: i64,
            _to: i64,
            _interval: OhlcInterval,
        ) -> Result<Vec<Candle>, MarketDataError> {
            if coin_id != "bitcoin" {
                return Err(MarketDataError::NotFound(coin_id.to_string()));
            }
            Ok((0..40)
                .map(|i| Candle::flat(i * 86_400_000, 100.0 + i as f64, Some(5.0)))
                .collect())
        }

        async fn fetch_market_chart_range(
            &self,
            coin_id: &str,
            _from: i64,
            _to: i64,
        ) -> Result<Vec<Candle>, MarketDataError> {
            Err(MarketDataError::NotFound(coin_id.to_string()))
        }
    }

    pub fn asset(symbol: &str, price: i64, change: i64) -> MarketAsset {
        MarketAsset {
            id: symbol.to_lowercase(),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            image: None,
            market_cap_rank: None,
            price_usd: Decimal::new(price, 0),
            volume_24h_usd: Decimal::new(1_000_000, 0),
            change_24h_percent: Decimal::new(change, 0),
        }
    }

    /// State wired to stubs. `gainers: None` makes every movers fetch fail.
    pub fn state(gainers: Option<Vec<MarketAsset>>, analysis_limit: usize) -> AppState {
        let movers: Arc<dyn TopMoversProvider> = Arc::new(StubMovers { gainers });
        let poller = GainersPoller::new(
            movers.clone(),
            PollerConfig {
                interval: Duration::from_secs(3600),
                ..PollerConfig::default()
            },
        );
        let analysis = CoinAnalysisService::new(
            Arc::new(StubCoins),
            AiAnalyzer::new(None),
            CoinAnalysisConfig {
                retry_delay: Duration::ZERO,
                request_spacing: Duration::ZERO,
                ..CoinAnalysisConfig::default()
            },
        );

        AppState {
            poller: Arc::new(poller),
            movers,
            analysis: Arc::new(analysis),
            rate_limiter: Arc::new(RateLimiter::per_minute(analysis_limit, "coin_analysis")),
            top_movers_cache_ttl: Duration::from_secs(60),
        }
    }

    /// Send `request` through the full API router
    pub async fn send(state: AppState, request: Request<Body>) -> Response<Body> {
        axum::Router::new()
            .nest("/api", super::api_routes())
            .with_state(state)
            .oneshot(request)
            .await
            .unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub async fn json_body(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
