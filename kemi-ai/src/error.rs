//! Error types for AI commentary

use kemi_core::KemiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    /// No API key configured for the text generator
    #[error("AI provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Provider answered but produced no text
    #[error("Empty response from AI provider")]
    EmptyResponse,

    #[error("Failed to parse AI response: {0}")]
    Parse(String),
}

impl From<AiError> for KemiError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::NotConfigured(msg) => KemiError::Config(msg),
            AiError::RequestFailed(msg) => KemiError::Network(msg),
            AiError::Api { status, message } => {
                KemiError::Api(format!("status {}: {}", status, message))
            }
            AiError::EmptyResponse => KemiError::Api("empty AI response".to_string()),
            AiError::Parse(msg) => KemiError::Parse(msg),
        }
    }
}
