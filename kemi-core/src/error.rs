//! Error types for the service

use thiserror::Error;

/// Service-wide error type
#[derive(Error, Debug)]
pub enum KemiError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KemiError {
    pub fn api(msg: impl Into<String>) -> Self {
        KemiError::Api(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        KemiError::Network(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        KemiError::MalformedPayload(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        KemiError::Parse(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        KemiError::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        KemiError::InvalidInput(msg.into())
    }

    pub fn rate_limited(msg: impl Into<String>) -> Self {
        KemiError::RateLimited(msg.into())
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        KemiError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        KemiError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        KemiError::Internal(msg.into())
    }

    /// Whether this error came from talking to (or parsing) an upstream provider
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            KemiError::Api(_)
                | KemiError::Network(_)
                | KemiError::MalformedPayload(_)
                | KemiError::Provider { .. }
        )
    }
}

/// Result type alias for service operations
pub type KemiResult<T> = Result<T, KemiError>;
