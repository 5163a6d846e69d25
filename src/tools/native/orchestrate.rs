//! The two orchestration tools exposed to the calling layer.
//!
//! `generate_response` submits a prompt and returns a task id immediately;
//! `check_response_status` polls a task by id. Both are thin wrappers over
//! the orchestrator; validation errors and unknown ids surface as
//! invalid-argument tool errors, never as task state.

use crate::orchestrator::{Orchestrator, SubmitRequest};
use crate::tools::{Tool, ToolError, ToolResult};
use crate::TandemError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct GenerateResponseTool {
    orchestrator: Arc<Orchestrator>,
}

impl GenerateResponseTool {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Tool for GenerateResponseTool {
    fn name(&self) -> String {
        "generate_response".to_string()
    }

    fn description(&self) -> String {
        "Generate a two-stage response: a reasoning pass followed by a final response pass."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The user's input prompt"
                },
                "showReasoning": {
                    "type": "boolean",
                    "description": "Whether to include reasoning in response",
                    "default": false
                },
                "clearContext": {
                    "type": "boolean",
                    "description": "Clear conversation history before this request",
                    "default": false
                },
                "includeHistory": {
                    "type": "boolean",
                    "description": "Include external conversation history for context",
                    "default": true
                }
            },
            "required": ["prompt"]
        })
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let request: SubmitRequest = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid generate_response arguments: {}", e)))?;

        let task_id = self.orchestrator.submit(request).map_err(|e| match e {
            TandemError::InvalidRequest(msg) => ToolError::InvalidArguments(msg),
            other => ToolError::ExecutionFailed(other.to_string()),
        })?;

        Ok(json!({ "taskId": task_id }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckStatusArgs {
    task_id: String,
}

pub struct CheckResponseStatusTool {
    orchestrator: Arc<Orchestrator>,
}

impl CheckResponseStatusTool {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Tool for CheckResponseStatusTool {
    fn name(&self) -> String {
        "check_response_status".to_string()
    }

    fn description(&self) -> String {
        "Check the status of a response generation task".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "taskId": {
                    "type": "string",
                    "description": "The task ID returned by generate_response"
                }
            },
            "required": ["taskId"]
        })
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let args: CheckStatusArgs = serde_json::from_value(arguments).map_err(|e| {
            ToolError::InvalidArguments(format!("Invalid check_response_status arguments: {}", e))
        })?;

        let snapshot = self
            .orchestrator
            .poll_status(&args.task_id)
            .map_err(|e| match e {
                TandemError::TaskNotFound(id) => {
                    ToolError::InvalidArguments(format!("No task found with ID: {}", id))
                }
                other => ToolError::ExecutionFailed(other.to_string()),
            })?;

        serde_json::to_value(snapshot).map_err(|e| ToolError::Internal(e.to_string()))
    }
}
