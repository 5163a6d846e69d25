// Tandem Core Library
// Two-stage reasoning/response orchestration over interchangeable LLM providers

pub mod catalog;
pub mod config;
pub mod context;
pub mod history;
pub mod orchestrator;
pub mod providers;
pub mod tools;

// Export core types
pub use catalog::{ModelInfo, ProviderCatalog};
pub use config::Settings;
pub use context::{ContextEntry, ContextStore};
pub use orchestrator::{Orchestrator, StatusSnapshot, SubmitRequest, TaskStatus};
pub use providers::{ProviderAdapter, ProviderKind, ProviderRegistry};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TandemError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Upstream provider error: {0}")]
    UpstreamError(String),

    #[error("No task found with ID: {0}")]
    TaskNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, TandemError>;
