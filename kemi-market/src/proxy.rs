//! Top movers through the service's own proxy endpoint
//!
//! Used when the process doesn't talk to CoinGecko directly and instead
//! calls a deployed instance of `POST /api/mcp/coingecko/top-gainers-losers`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use serde_json::Value;

use kemi_core::{TopMovers, TopMoversParams};

use crate::coingecko::parse_top_movers;
use crate::error::MarketDataError;
use crate::provider::TopMoversProvider;
use crate::types::TopMoversToolCall;

/// Path of the proxy endpoint relative to the API base
pub const TOP_MOVERS_PROXY_PATH: &str = "/api/mcp/coingecko/top-gainers-losers";

/// Client for a remote top movers proxy endpoint
pub struct ProxyEndpointClient {
    http: Client,
    base_url: Option<String>,
}

impl ProxyEndpointClient {
    /// `base_url` is the root of the remote API (e.g. `https://kemi.example.com`).
    /// The client reports itself unavailable when none is given.
    pub fn new(base_url: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("Kemi/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
        }
    }

    fn endpoint(&self) -> Result<String, MarketDataError> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}{}", base, TOP_MOVERS_PROXY_PATH))
            .ok_or_else(|| MarketDataError::InvalidConfig("proxy base URL not set".to_string()))
    }
}

#[async_trait]
impl TopMoversProvider for ProxyEndpointClient {
    fn name(&self) -> &str {
        "proxy"
    }

    fn is_available(&self) -> bool {
        self.base_url.is_some()
    }

    #[instrument(skip(self))]
    async fn fetch_top_movers(
        &self,
        params: &TopMoversParams,
    ) -> Result<TopMovers, MarketDataError> {
        let url = self.endpoint()?;
        debug!("[Proxy] POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(&TopMoversToolCall::new(params.clone()))
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        let status = response.status();
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

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| MarketDataError::MalformedPayload(e.to_string()))?;

        // The endpoint keys prices and changes by the requested currency and window
        parse_top_movers(&payload, &params.vs_currency, &params.duration)
    }
}
