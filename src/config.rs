//! Runtime settings loaded from environment variables.
//!
//! Every field has a documented default and can be overridden through the
//! environment, so deployments configure the service without a config file.
//! The provider/model metadata itself lives in the catalog (see `catalog`).

use std::path::PathBuf;

/// Service configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Settings {
    /// Provider name serving the reasoning stage, e.g. "openrouter"
    pub reasoning_provider: String,
    /// Model id for the reasoning stage, e.g. "deepseek/deepseek-r1"
    pub reasoning_model: String,
    /// Provider name serving the response stage
    pub coding_provider: String,
    /// Model id for the response stage
    pub coding_model: String,
    /// Capacity of the rolling conversation context store
    pub max_context_entries: usize,
    /// Character budget for transcript history on the reasoning stage
    pub reasoning_history_chars: usize,
    /// Character budget for transcript history on the response stage
    pub response_history_chars: usize,
    /// Path to the provider/model metadata catalog
    pub catalog_path: PathBuf,
}

impl Settings {
    /// Read the full configuration from the environment
    pub fn from_env() -> Self {
        Self::default()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reasoning_provider: std::env::var("REASONING_PROVIDER")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "openrouter".to_string()),
            reasoning_model: std::env::var("REASONING_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "deepseek/deepseek-r1".to_string()),
            coding_provider: std::env::var("CODING_PROVIDER")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "openrouter".to_string()),
            coding_model: std::env::var("CODING_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "deepseek/deepseek-chat".to_string()),
            max_context_entries: std::env::var("TANDEM_MAX_CONTEXT_ENTRIES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(10),
            reasoning_history_chars: std::env::var("TANDEM_REASONING_HISTORY_CHARS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(50_000),
            response_history_chars: std::env::var("TANDEM_RESPONSE_HISTORY_CHARS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(600_000),
            catalog_path: std::env::var("TANDEM_PROVIDERS_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("providers.json")),
        }
    }
}
