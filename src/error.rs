//! Custom error types for the analysis pipeline
//!
//! Provides structured, typed errors instead of generic Box<dyn Error>

use thiserror::Error;

/// Errors raised by a single chat-completion call through the gateway.
///
/// Only `Configuration` is fatal to a pipeline run; the other variants are
/// caught at each stage boundary and downgraded to placeholder text.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API credential is not configured")]
    Configuration,

    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM queue unavailable: {0}")]
    Queue(String),
}

/// Top-level pipeline errors. These are the only errors that escape a run;
/// everything else degrades into a partial result.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Configuration file loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}
