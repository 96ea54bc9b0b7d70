//! Kemi API Server
//!
//! HTTP API serving crypto top movers, the gainers widget feed and
//! per-coin technical analysis.

mod config;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, Method},
    Router,
};
use kemi_ai::{AiAnalyzer, GeminiClient, TextGenerator};
use kemi_market::{CoinGeckoClient, ProviderChain, ProxyEndpointClient, TopMoversProvider};
use kemi_services::{
    CoinAnalysisConfig, CoinAnalysisService, GainersPoller, PollerConfig, RateLimiter,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ApiConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub poller: Arc<GainersPoller>,
    /// Source behind the top movers proxy endpoint
    pub movers: Arc<dyn TopMoversProvider>,
    pub analysis: Arc<CoinAnalysisService>,
    /// Guards the coin analysis route
    pub rate_limiter: Arc<RateLimiter>,
    /// `max-age` of proxy endpoint responses
    pub top_movers_cache_ttl: Duration,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,kemi_api=debug")),
        )
        .init();

    info!("Starting Kemi API");

    let config = ApiConfig::from_env()?;

    // One CoinGecko client serves coin data, the proxy endpoint and the
    // in-process top movers strategy
    let coingecko = Arc::new(CoinGeckoClient::new(config.coingecko.clone()));
    if config.coingecko.api_key.is_some() {
        info!("CoinGecko API key found in environment");
    }

    // Top movers strategies in preference order
    let chain = ProviderChain::new()
        .with(coingecko.clone())
        .with(Arc::new(ProxyEndpointClient::new(
            config.upstream_api_url.clone(),
        )));

    let poller = GainersPoller::from_chain(
        &chain,
        PollerConfig {
            interval: config.poll_interval,
            display_cap: config.display_cap,
            ..PollerConfig::default()
        },
    )?;
    info!(
        "Gainers poller using {} (every {:?}, showing {})",
        poller.provider_name(),
        config.poll_interval,
        config.display_cap
    );
    let poller = Arc::new(poller);
    poller.start();

    // AI commentary (optional - falls back to a generated report)
    let generator: Option<Arc<dyn TextGenerator>> = match &config.gemini_api_key {
        Some(key) => match GeminiClient::new(key.as_str()) {
            Ok(client) => {
                info!("Gemini commentary enabled ({})", config.gemini_model);
                Some(Arc::new(client.with_model(&config.gemini_model)) as Arc<dyn TextGenerator>)
            }
            Err(e) => {
                warn!("Gemini client unavailable: {}", e);
                None
            }
        },
        None => {
            info!("GEMINI_API_KEY not set - analyses will use the fallback report");
            None
        }
    };

    let analysis = CoinAnalysisService::new(
        coingecko.clone(),
        AiAnalyzer::new(generator),
        CoinAnalysisConfig {
            cache_ttl: config.analysis_cache_ttl,
            ..CoinAnalysisConfig::default()
        },
    );

    // Create app state
    let state = AppState {
        poller: poller.clone(),
        movers: coingecko,
        analysis: Arc::new(analysis),
        rate_limiter: Arc::new(RateLimiter::per_minute(
            config.analysis_rate_limit,
            "coin_analysis",
        )),
        top_movers_cache_ttl: config.top_movers_cache_ttl,
    };

    // Configure CORS for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Build router
    let app = Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    poller.stop();
    info!("Kemi API stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
