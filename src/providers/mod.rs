//! Provider abstraction: a closed set of interchangeable LLM backends.
//!
//! Each backend implements the same two-operation contract (`reason`,
//! `respond`) behind [`ProviderAdapter`]. Dispatch is by provider name over
//! a closed, compile-time-enumerable set; an unrecognized name fails
//! immediately. Clients are initialized once at startup by
//! [`ProviderRegistry`], only for the providers actually selected, so a
//! missing configuration fails construction instead of a later request.

mod google;
mod openai_compat;

pub use google::GoogleAdapter;
pub use openai_compat::OpenAiCompatAdapter;

use crate::catalog::ProviderCatalog;
use crate::config::Settings;
use crate::{Result, TandemError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// The enumerable set of supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenRouter,
    Anthropic,
    DeepSeek,
    OpenAi,
    Gemini,
    Vertex,
}

impl ProviderKind {
    /// Canonical lowercase name used in configuration and the catalog
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Vertex => "vertex",
        }
    }

    /// Human-readable name used in error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "OpenRouter",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::DeepSeek => "DeepSeek",
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Vertex => "Vertex",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = TandemError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            "vertex" => Ok(ProviderKind::Vertex),
            other => Err(TandemError::ConfigError(format!(
                "Unsupported provider: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The uniform two-operation contract every backend implements.
///
/// `reason` produces intermediate rationale text for a prompt; `respond`
/// produces the final answer, conditioned on that rationale framed as a
/// prior assistant turn. Both fail with a configuration error when the
/// selected model has no catalog entry, and with an upstream error when the
/// backend call fails or returns no usable text.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which backend this adapter talks to
    fn kind(&self) -> ProviderKind;

    /// Run the reasoning stage for the given prompt
    async fn reason(&self, prompt: &str) -> Result<String>;

    /// Run the response stage, conditioned on the accumulated reasoning
    async fn respond(&self, prompt: &str, reasoning: &str) -> Result<String>;
}

/// Configuration-resolved map of initialized provider adapters.
///
/// Built once at process start for the providers selected by the settings,
/// then passed by reference into the orchestrator. Resolution of a provider
/// that was never initialized is a configuration error.
pub struct ProviderRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
    reasoning: ProviderKind,
    coding: ProviderKind,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("reasoning", &self.reasoning)
            .field("coding", &self.coding)
            .finish_non_exhaustive()
    }
}

impl ProviderRegistry {
    /// Initialize clients for the selected reasoning and response providers.
    ///
    /// Fails fast when a selected provider name is unsupported or its
    /// configuration section is absent from the catalog.
    pub fn new(settings: &Settings, catalog: Arc<ProviderCatalog>) -> Result<Self> {
        let reasoning = ProviderKind::from_str(&settings.reasoning_provider)?;
        let coding = ProviderKind::from_str(&settings.coding_provider)?;

        let mut adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>> = HashMap::new();
        let mut selected = vec![reasoning];
        if coding != reasoning {
            selected.push(coding);
        }

        for kind in selected {
            if !catalog.has_provider(kind.as_str()) {
                return Err(TandemError::ConfigError(format!(
                    "{} selected as provider, but configuration not found in providers.json",
                    kind.display_name()
                )));
            }

            let adapter = Self::build_adapter(kind, settings, Arc::clone(&catalog))?;
            info!(target: "providers", provider = %kind, "Initialized provider client");
            adapters.insert(kind, adapter);
        }

        Ok(Self {
            adapters,
            reasoning,
            coding,
        })
    }

    fn build_adapter(
        kind: ProviderKind,
        settings: &Settings,
        catalog: Arc<ProviderCatalog>,
    ) -> Result<Arc<dyn ProviderAdapter>> {
        let adapter: Arc<dyn ProviderAdapter> = match kind {
            ProviderKind::OpenRouter => Arc::new(OpenAiCompatAdapter::new(
                kind,
                "https://openrouter.ai/api/v1",
                std::env::var("OPENROUTER_API_KEY").ok(),
                settings,
                catalog,
            )?),
            ProviderKind::Anthropic => Arc::new(OpenAiCompatAdapter::new(
                kind,
                "https://api.anthropic.com/v1",
                std::env::var("ANTHROPIC_API_KEY").ok(),
                settings,
                catalog,
            )?),
            ProviderKind::DeepSeek => Arc::new(OpenAiCompatAdapter::new(
                kind,
                "https://api.deepseek.com/v1",
                std::env::var("DEEPSEEK_API_KEY").ok(),
                settings,
                catalog,
            )?),
            ProviderKind::OpenAi => {
                let base_url = std::env::var("OPENAI_API_BASE_URL")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
                Arc::new(OpenAiCompatAdapter::new(
                    kind,
                    &base_url,
                    std::env::var("OPENAI_API_KEY").ok(),
                    settings,
                    catalog,
                )?)
            }
            ProviderKind::Gemini => Arc::new(GoogleAdapter::gemini(settings, catalog)?),
            ProviderKind::Vertex => Arc::new(GoogleAdapter::vertex(settings, catalog)?),
        };
        Ok(adapter)
    }

    /// Adapter serving the reasoning stage
    pub fn reasoning_adapter(&self) -> Result<Arc<dyn ProviderAdapter>> {
        self.resolve(self.reasoning)
    }

    /// Adapter serving the response stage
    pub fn coding_adapter(&self) -> Result<Arc<dyn ProviderAdapter>> {
        self.resolve(self.coding)
    }

    /// Look up an initialized adapter by kind
    pub fn resolve(&self, kind: ProviderKind) -> Result<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&kind).cloned().ok_or_else(|| {
            TandemError::ConfigError(format!(
                "Client not initialized for provider: {}",
                kind.as_str()
            ))
        })
    }
}
