use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tandem::tools::native::{CheckResponseStatusTool, GenerateResponseTool};
use tandem::tools::ToolRegistry;
use tandem::{Orchestrator, ProviderCatalog, ProviderRegistry, Settings};

/// One request line on stdin: `{"tool": "...", "arguments": {...}}`
#[derive(Debug, Deserialize)]
struct ToolCall {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    let settings = Settings::from_env();
    info!(
        target: "tandem",
        reasoning_provider = %settings.reasoning_provider,
        reasoning_model = %settings.reasoning_model,
        coding_provider = %settings.coding_provider,
        coding_model = %settings.coding_model,
        "Initializing provider clients"
    );

    let catalog = Arc::new(ProviderCatalog::load(&settings.catalog_path)?);
    let registry = ProviderRegistry::new(&settings, catalog)?;

    let orchestrator = Arc::new(Orchestrator::new(
        registry.reasoning_adapter()?,
        registry.coding_adapter()?,
        &settings,
    ));

    let tools = ToolRegistry::new();
    tools
        .register(Arc::new(GenerateResponseTool::new(Arc::clone(
            &orchestrator,
        ))))
        .await;
    tools
        .register(Arc::new(CheckResponseStatusTool::new(orchestrator)))
        .await;

    info!(target: "tandem", "Tandem server running on stdio");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<ToolCall>(&line) {
            Ok(call) => match tools.call(&call.tool, call.arguments).await {
                Ok(result) => json!({ "tool": call.tool, "result": result }),
                Err(e) => json!({ "tool": call.tool, "error": e.to_string() }),
            },
            Err(e) => {
                error!(target: "tandem", error = %e, "Malformed request line");
                json!({ "error": format!("Malformed request: {}", e) })
            }
        };

        println!("{}", reply);
    }

    info!(target: "tandem", "stdin closed, shutting down");
    Ok(())
}
