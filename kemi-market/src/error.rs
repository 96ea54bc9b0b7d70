//! Error types for the market data adapters

use kemi_core::KemiError;
use thiserror::Error;

/// Errors that can occur while talking to a market data provider
#[derive(Debug, Error)]
pub enum MarketDataError {
    /// Transport-level failure (connect, timeout, TLS, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Provider answered with a non-2xx status
    #[error("HTTP error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Response body didn't have the expected shape
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Requested coin doesn't exist at the provider
    #[error("Not found: {0}")]
    NotFound(String),

    /// No strategy in a provider chain could serve requests
    #[error("No market data provider available: {0}")]
    NoProviderAvailable(String),

    /// Request rejected before it was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MarketDataError {
    /// Whether the failure happened on the wire rather than in the payload
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            MarketDataError::Network(_) | MarketDataError::Status { .. }
        )
    }
}

impl From<MarketDataError> for KemiError {
    fn from(err: MarketDataError) -> Self {
        match err {
            MarketDataError::Network(msg) => KemiError::Network(msg),
            MarketDataError::Status { status, message } => {
                KemiError::Api(format!("status {}: {}", status, message))
            }
            MarketDataError::MalformedPayload(msg) => KemiError::MalformedPayload(msg),
            MarketDataError::NotFound(msg) => KemiError::NotFound(msg),
            MarketDataError::InvalidRequest(msg) => KemiError::InvalidInput(msg),
            MarketDataError::NoProviderAvailable(msg) | MarketDataError::InvalidConfig(msg) => {
                KemiError::Config(msg)
            }
        }
    }
}
