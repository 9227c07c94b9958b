use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants::{llm, pipeline, store};
use crate::error::ConfigError;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API credential. Falls back to OPENAI_API_KEY in the environment.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    /// Max in-flight gateway calls. 1 serializes everything.
    pub max_concurrent: usize,
    pub queue_size: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: llm::DEFAULT_MODEL.to_string(),
            max_concurrent: llm::DEFAULT_MAX_CONCURRENT,
            queue_size: llm::DEFAULT_QUEUE_SIZE,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pause between consecutive analyst calls (rate-limit pacing)
    pub inter_call_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inter_call_delay_ms: pipeline::DEFAULT_INTER_CALL_DELAY_MS,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding history.json and watchlist.json
    pub data_dir: PathBuf,
    pub history_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            history_limit: store::DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load config.yaml from the working directory. A missing file is fine;
    /// every field has a default and the credential can come from the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.yaml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        let config: AppConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// The credential the gateway should use, resolved at startup:
    /// config.yaml first, then OPENAI_API_KEY.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.llm
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| env::var("OPENAI_API_KEY").ok().filter(|key| !key.trim().is_empty()))
    }
}
