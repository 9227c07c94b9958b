//! Application-wide constants and magic numbers
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make the codebase easier to tune.

/// LLM gateway constants
pub mod llm {
    /// Default chat-completions endpoint
    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

    /// Default model (cost-optimized)
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

    /// Sampling temperature for every analysis call
    pub const TEMPERATURE: f32 = 0.7;

    /// Completion token cap for every analysis call
    pub const MAX_TOKENS: u32 = 2000;

    /// Maximum attempts per call (1 initial + 2 retries)
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Exponential backoff base for HTTP 429 (2^attempt * base: 2s, 4s)
    /// and the flat wait between transport-level retries
    pub const BACKOFF_BASE_MS: u64 = 2000;

    /// Default max in-flight requests; 1 keeps a run under the upstream
    /// rate limit
    pub const DEFAULT_MAX_CONCURRENT: usize = 1;

    /// Default queue depth before `chat` calls start waiting to enqueue
    pub const DEFAULT_QUEUE_SIZE: usize = 32;
}

/// Pipeline pacing constants
pub mod pipeline {
    /// Delay between consecutive analyst calls. Historically anywhere from
    /// 800ms to 3000ms depending on the rate-limit tier; configurable.
    pub const DEFAULT_INTER_CALL_DELAY_MS: u64 = 1000;
}

/// Progress checkpoints published on the event bus (percent)
pub mod progress {
    pub const INIT: f64 = 10.0;

    /// Agent progress interpolates from `AGENTS_BASE` up to
    /// `AGENTS_BASE + AGENTS_SPAN` as each analyst completes
    pub const AGENTS_BASE: f64 = 10.0;
    pub const AGENTS_SPAN: f64 = 60.0;

    pub const DEBATE: f64 = 75.0;
    pub const RISK: f64 = 85.0;
    pub const DECISION: f64 = 95.0;
    pub const DONE: f64 = 100.0;
}

/// Score extraction constants
pub mod score {
    /// Fallback when no pattern yields an in-range score
    pub const DEFAULT_SCORE: f64 = 5.0;

    pub const MIN_SCORE: f64 = 1.0;
    pub const MAX_SCORE: f64 = 10.0;
}

/// Result store constants
pub mod store {
    /// History keeps at most this many records, newest first
    pub const DEFAULT_HISTORY_LIMIT: usize = 50;

    pub const HISTORY_FILE: &str = "history.json";
    pub const WATCHLIST_FILE: &str = "watchlist.json";
}
