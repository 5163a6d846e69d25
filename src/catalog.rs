//! Static provider/model metadata catalog.
//!
//! The catalog maps provider name -> model id -> sampling parameters. It is
//! loaded once at startup and read-only afterwards. Absence of an entry for a
//! selected model is a configuration error, never a silent runtime fallback.

use crate::{Result, TandemError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// Sampling parameters for one (provider, model) pair.
///
/// `extra_params` is an open bag merged verbatim into outgoing request
/// bodies after the named fields, so it can override them per model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelInfo {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub repetition_penalty: Option<f64>,
    #[serde(default)]
    pub extra_params: Option<Map<String, Value>>,
}

/// Read-only provider/model metadata, keyed by provider name then model id
#[derive(Debug, Clone, Default)]
pub struct ProviderCatalog {
    providers: HashMap<String, HashMap<String, ModelInfo>>,
}

impl ProviderCatalog {
    /// Load the catalog from a JSON file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TandemError::ConfigError(format!(
                "Failed to read provider catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        let value: Value = serde_json::from_str(&raw)?;
        Self::from_value(value)
    }

    /// Build the catalog from an in-memory JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let providers: HashMap<String, HashMap<String, ModelInfo>> =
            serde_json::from_value(value).map_err(|e| {
                TandemError::ConfigError(format!("Malformed provider catalog: {}", e))
            })?;
        Ok(Self { providers })
    }

    /// Whether a configuration section exists for the given provider
    pub fn has_provider(&self, provider: &str) -> bool {
        self.providers.contains_key(provider)
    }

    /// Look up metadata for a model under a provider.
    ///
    /// A missing entry for the selected model is a configuration error.
    pub fn model_info(&self, provider: &str, model: &str) -> Result<&ModelInfo> {
        self.providers
            .get(provider)
            .and_then(|models| models.get(model))
            .ok_or_else(|| {
                TandemError::ConfigError(format!(
                    "Model {} for provider {} not found in providers.json",
                    model, provider
                ))
            })
    }
}
