//! Chat-completions template adapter.
//!
//! Covers the four backends that speak the OpenAI chat completions shape
//! (OpenRouter, Anthropic, DeepSeek, OpenAI); they differ only in base URL
//! and credential. Request bodies carry the catalog's sampling parameters
//! with `extra_params` merged last, so per-model extras win on collision.

use crate::catalog::{ModelInfo, ProviderCatalog};
use crate::config::Settings;
use crate::providers::{ProviderAdapter, ProviderKind};
use crate::{Result, TandemError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub struct OpenAiCompatAdapter {
    kind: ProviderKind,
    http: Client,
    base_url: String,
    api_key: Option<String>,
    reasoning_model: String,
    coding_model: String,
    catalog: Arc<ProviderCatalog>,
}

impl OpenAiCompatAdapter {
    pub fn new(
        kind: ProviderKind,
        base_url: &str,
        api_key: Option<String>,
        settings: &Settings,
        catalog: Arc<ProviderCatalog>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TandemError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            kind,
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            reasoning_model: settings.reasoning_model.clone(),
            coding_model: settings.coding_model.clone(),
            catalog,
        })
    }

    async fn chat(&self, body: Value) -> Result<Value> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(target: "providers", provider = %self.kind, %url, "POST chat completions");

        let mut req = self.http.post(&url).header("content-type", "application/json");
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.json(&body).send().await.map_err(|e| {
            TandemError::UpstreamError(format!(
                "{} request failed: {}",
                self.kind.display_name(),
                e
            ))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(TandemError::UpstreamError(format!(
                "{} error: status={} body={}",
                self.kind.display_name(),
                status,
                text
            )));
        }

        resp.json().await.map_err(|e| {
            TandemError::UpstreamError(format!(
                "Failed to parse {} response: {}",
                self.kind.display_name(),
                e
            ))
        })
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn reason(&self, prompt: &str) -> Result<String> {
        let info = self
            .catalog
            .model_info(self.kind.as_str(), &self.reasoning_model)?;
        let messages = vec![json!({ "role": "user", "content": prompt })];
        let body = build_chat_body(&self.reasoning_model, messages, info, false);

        let val = self.chat(body).await?;
        extract_message_content(&val).ok_or_else(|| {
            TandemError::UpstreamError(format!(
                "No reasoning received from {}",
                self.kind.display_name()
            ))
        })
    }

    async fn respond(&self, prompt: &str, reasoning: &str) -> Result<String> {
        let info = self
            .catalog
            .model_info(self.kind.as_str(), &self.coding_model)?;
        let messages = vec![
            json!({ "role": "user", "content": prompt }),
            json!({
                "role": "assistant",
                "content": format!("<thinking>{}</thinking>", reasoning)
            }),
        ];
        let body = build_chat_body(&self.coding_model, messages, info, true);

        let val = self.chat(body).await?;
        extract_message_content(&val).ok_or_else(|| {
            TandemError::UpstreamError(format!(
                "No response content received from {}",
                self.kind.display_name()
            ))
        })
    }
}

/// Assemble a chat completions request body.
///
/// Named sampling fields come from the model record with the documented
/// defaults; `extra_params` is applied last and overrides named fields.
fn build_chat_body(
    model: &str,
    messages: Vec<Value>,
    info: &ModelInfo,
    with_repetition_penalty: bool,
) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), json!(model));
    body.insert("messages".to_string(), json!(messages));
    body.insert(
        "temperature".to_string(),
        json!(info.temperature.unwrap_or(0.7)),
    );
    body.insert("top_p".to_string(), json!(info.top_p.unwrap_or(1.0)));
    if with_repetition_penalty {
        body.insert(
            "repetition_penalty".to_string(),
            json!(info.repetition_penalty.unwrap_or(1.0)),
        );
    }
    if let Some(extras) = &info.extra_params {
        for (k, v) in extras {
            body.insert(k.clone(), v.clone());
        }
    }
    Value::Object(body)
}

fn extract_message_content(v: &Value) -> Option<String> {
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
