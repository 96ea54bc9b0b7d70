//! AI commentary for Kemi coin analysis
//!
//! This crate turns technical analysis into a written analyst report,
//! using Google Gemini when an API key is configured and a deterministic
//! markdown report otherwise.

pub mod analyzer;
pub mod error;
pub mod gemini;

pub use analyzer::{
    build_prompt, fallback_report, AiAnalysis, AiAnalyzer, CoinAnalysisInput, FALLBACK_PROVIDER,
};
pub use error::AiError;
pub use gemini::{GeminiClient, TextGenerator, DEFAULT_GEMINI_MODEL, GEMINI_API_BASE};
