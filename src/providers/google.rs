//! generateContent template adapter for the Google backends.
//!
//! Gemini and Vertex share the role/parts request shape and differ only in
//! endpoint construction and credential: Gemini authenticates with an API
//! key header, Vertex with a bearer token against a project/region endpoint.
//! For the response stage the accumulated reasoning travels as a prior
//! `model` turn, which is how these backends represent assistant context.

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

enum Endpoint {
    /// Generative Language API, authenticated by API key header
    Gemini { api_key: Option<String> },
    /// Vertex AI publisher endpoint, authenticated by bearer token
    Vertex {
        project: String,
        region: String,
        access_token: Option<String>,
    },
}

pub struct GoogleAdapter {
    kind: ProviderKind,
    http: Client,
    endpoint: Endpoint,
    reasoning_model: String,
    coding_model: String,
    catalog: Arc<ProviderCatalog>,
}

impl GoogleAdapter {
    pub fn gemini(settings: &Settings, catalog: Arc<ProviderCatalog>) -> Result<Self> {
        Self::build(
            ProviderKind::Gemini,
            Endpoint::Gemini {
                api_key: std::env::var("GEMINI_API_KEY").ok().filter(|s| !s.is_empty()),
            },
            settings,
            catalog,
        )
    }

    pub fn vertex(settings: &Settings, catalog: Arc<ProviderCatalog>) -> Result<Self> {
        let project = std::env::var("VERTEX_PROJECT_ID")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                TandemError::ConfigError(
                    "Vertex selected as provider, but VERTEX_PROJECT_ID is not set".to_string(),
                )
            })?;
        let region = std::env::var("VERTEX_REGION")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                TandemError::ConfigError(
                    "Vertex selected as provider, but VERTEX_REGION is not set".to_string(),
                )
            })?;
        Self::build(
            ProviderKind::Vertex,
            Endpoint::Vertex {
                project,
                region,
                access_token: std::env::var("VERTEX_ACCESS_TOKEN")
                    .ok()
                    .filter(|s| !s.is_empty()),
            },
            settings,
            catalog,
        )
    }

    fn build(
        kind: ProviderKind,
        endpoint: Endpoint,
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
            endpoint,
            reasoning_model: settings.reasoning_model.clone(),
            coding_model: settings.coding_model.clone(),
            catalog,
        })
    }

    fn url_for(&self, model: &str) -> String {
        match &self.endpoint {
            Endpoint::Gemini { .. } => format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                model
            ),
            Endpoint::Vertex {
                project, region, ..
            } => format!(
                "https://{region}-aiplatform.googleapis.com/v1/projects/{project}/locations/{region}/publishers/google/models/{model}:generateContent"
            ),
        }
    }

    async fn generate(&self, model: &str, contents: Vec<Value>, info: &ModelInfo) -> Result<Value> {
        let url = self.url_for(model);
        debug!(target: "providers", provider = %self.kind, %url, "POST generateContent");

        let body = json!({
            "contents": contents,
            "generationConfig": build_generation_config(info),
        });

        let mut req = self.http.post(&url).header("content-type", "application/json");
        match &self.endpoint {
            Endpoint::Gemini { api_key } => {
                if let Some(key) = api_key {
                    req = req.header("x-goog-api-key", key);
                }
            }
            Endpoint::Vertex { access_token, .. } => {
                if let Some(token) = access_token {
                    req = req.bearer_auth(token);
                }
            }
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
impl ProviderAdapter for GoogleAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn reason(&self, prompt: &str) -> Result<String> {
        let info = self
            .catalog
            .model_info(self.kind.as_str(), &self.reasoning_model)?;
        let contents = vec![json!({ "role": "user", "parts": [{ "text": prompt }] })];

        let val = self.generate(&self.reasoning_model, contents, info).await?;
        extract_candidate_text(&val).ok_or_else(|| {
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
        let contents = vec![
            json!({ "role": "user", "parts": [{ "text": prompt }] }),
            json!({ "role": "model", "parts": [{ "text": reasoning }] }),
        ];

        let val = self.generate(&self.coding_model, contents, info).await?;
        extract_candidate_text(&val).ok_or_else(|| {
            TandemError::UpstreamError(format!(
                "No response content received from {}",
                self.kind.display_name()
            ))
        })
    }
}

/// generationConfig carries the catalog sampling parameters; extras last
fn build_generation_config(info: &ModelInfo) -> Value {
    let mut config = Map::new();
    config.insert(
        "temperature".to_string(),
        json!(info.temperature.unwrap_or(0.7)),
    );
    config.insert("topP".to_string(), json!(info.top_p.unwrap_or(1.0)));
    if let Some(extras) = &info.extra_params {
        for (k, v) in extras {
            config.insert(k.clone(), v.clone());
        }
    }
    Value::Object(config)
}

fn extract_candidate_text(v: &Value) -> Option<String> {
    let parts = v
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let mut acc = String::new();
    for part in parts {
        if let Some(t) = part.get("text").and_then(|t| t.as_str()) {
            acc.push_str(t);
        }
    }
    if acc.is_empty() {
        None
    } else {
        Some(acc)
    }
}
