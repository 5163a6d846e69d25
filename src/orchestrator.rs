//! Task orchestration: the per-task state machine and two-stage pipeline.
//!
//! `submit` records a pending task and spawns its pipeline as a detached
//! unit of work, returning the task id before any provider call is made.
//! Pollers read a snapshot of the current state; tasks advance
//! `pending -> reasoning -> responding -> complete`, with `error` reachable
//! from any non-terminal state. Both `complete` and `error` are terminal.
//! Tasks are retained in memory for the life of the process.

use crate::context::{ContextEntry, ContextStore};
use crate::history::{self, TranscriptMessage};
use crate::providers::ProviderAdapter;
use crate::{Result, Settings, TandemError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Reasoning,
    Responding,
    Complete,
    Error,
}

/// Mutable task record, owned exclusively by the orchestrator
#[derive(Debug, Clone)]
struct Task {
    status: TaskStatus,
    prompt: String,
    show_reasoning: bool,
    reasoning: Option<String>,
    response: Option<String>,
    error: Option<String>,
    timestamp: DateTime<Utc>,
}

/// Arguments accepted by `submit`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub prompt: String,
    #[serde(default)]
    pub show_reasoning: bool,
    #[serde(default)]
    pub clear_context: bool,
    #[serde(default = "default_include_history")]
    pub include_history: bool,
}

fn default_include_history() -> bool {
    true
}

impl SubmitRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            show_reasoning: false,
            clear_context: false,
            include_history: true,
        }
    }
}

/// Read-only view of a task returned to pollers.
///
/// `reasoning` is present only when the task was submitted with
/// `showReasoning` and the stage has completed; `response` only once the
/// task is complete; `error` only once it has failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Owns the task table and runs the two-stage pipeline
pub struct Orchestrator {
    tasks: DashMap<String, Task>,
    context: Mutex<ContextStore>,
    reasoner: Arc<dyn ProviderAdapter>,
    responder: Arc<dyn ProviderAdapter>,
    coding_model: String,
    reasoning_history_chars: usize,
    response_history_chars: usize,
    transcript_dir: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(
        reasoner: Arc<dyn ProviderAdapter>,
        responder: Arc<dyn ProviderAdapter>,
        settings: &Settings,
    ) -> Self {
        Self {
            tasks: DashMap::new(),
            context: Mutex::new(ContextStore::new(settings.max_context_entries)),
            reasoner,
            responder,
            coding_model: settings.coding_model.clone(),
            reasoning_history_chars: settings.reasoning_history_chars,
            response_history_chars: settings.response_history_chars,
            transcript_dir: history::default_tasks_dir(),
        }
    }

    /// Override where external transcripts are discovered
    pub fn with_transcript_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.transcript_dir = dir;
        self
    }

    /// Accept a prompt, record a pending task, and schedule its pipeline.
    ///
    /// Returns the fresh task id before any provider call is made. Ids are
    /// never reused. The spawned pipeline captures its own failures into
    /// the task record; the wrapper only logs them.
    pub fn submit(self: &Arc<Self>, request: SubmitRequest) -> Result<String> {
        if request.prompt.trim().is_empty() {
            return Err(TandemError::InvalidRequest(
                "prompt must be non-empty text".to_string(),
            ));
        }

        let task_id = uuid::Uuid::new_v4().to_string();
        self.tasks.insert(
            task_id.clone(),
            Task {
                status: TaskStatus::Pending,
                prompt: request.prompt.clone(),
                show_reasoning: request.show_reasoning,
                reasoning: None,
                response: None,
                error: None,
                timestamp: Utc::now(),
            },
        );

        info!(target: "orchestrator", task_id = %task_id, "Accepted task");

        let this = Arc::clone(self);
        let id = task_id.clone();
        tokio::spawn(async move {
            if let Err(e) = this
                .run_pipeline(&id, request.clear_context, request.include_history)
                .await
            {
                warn!(target: "orchestrator", task_id = %id, error = %e, "Pipeline failed");
            }
        });

        Ok(task_id)
    }

    /// Read the current state of a task. Side-effect free.
    pub fn poll_status(&self, task_id: &str) -> Result<StatusSnapshot> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| TandemError::TaskNotFound(task_id.to_string()))?;

        Ok(StatusSnapshot {
            status: task.status,
            reasoning: if task.show_reasoning {
                task.reasoning.clone()
            } else {
                None
            },
            response: if task.status == TaskStatus::Complete {
                task.response.clone()
            } else {
                None
            },
            error: if task.status == TaskStatus::Error {
                task.error.clone()
            } else {
                None
            },
        })
    }

    /// Run the two-stage pipeline for a previously recorded task.
    ///
    /// Any provider failure marks the task `error` and propagates to the
    /// spawning wrapper, which logs it without affecting other tasks.
    async fn run_pipeline(
        &self,
        task_id: &str,
        clear_context: bool,
        include_history: bool,
    ) -> Result<()> {
        let prompt = self
            .tasks
            .get(task_id)
            .map(|t| t.prompt.clone())
            .ok_or_else(|| TandemError::TaskNotFound(task_id.to_string()))?;

        if clear_context {
            self.context.lock().await.clear();
            debug!(target: "orchestrator", task_id = %task_id, "Context store cleared");
        }

        self.transition(task_id, TaskStatus::Reasoning);

        // The transcript source is only touched when history was requested
        let transcript: Option<Vec<TranscriptMessage>> = if include_history {
            self.load_transcript().await
        } else {
            None
        };

        let reasoning_prompt = self
            .build_reasoning_prompt(&prompt, transcript.as_deref())
            .await;

        let reasoning = match self.reasoner.reason(&reasoning_prompt).await {
            Ok(text) => text,
            Err(e) => {
                self.fail(task_id, &e);
                return Err(e);
            }
        };

        if let Some(mut task) = self.tasks.get_mut(task_id) {
            task.status = TaskStatus::Responding;
            task.reasoning = Some(reasoning.clone());
            task.timestamp = Utc::now();
        }
        debug!(target: "orchestrator", task_id = %task_id, "Reasoning stage complete");

        // Re-rendered at the looser budget; message selection differs
        let full_prompt = self.build_final_prompt(&prompt, transcript.as_deref());

        let response = match self.responder.respond(&full_prompt, &reasoning).await {
            Ok(text) => text,
            Err(e) => {
                self.fail(task_id, &e);
                return Err(e);
            }
        };

        self.context.lock().await.push(ContextEntry {
            timestamp: Utc::now(),
            prompt,
            reasoning: reasoning.clone(),
            response: response.clone(),
            model: self.coding_model.clone(),
        });

        if let Some(mut task) = self.tasks.get_mut(task_id) {
            task.status = TaskStatus::Complete;
            task.response = Some(response);
            task.timestamp = Utc::now();
        }
        info!(target: "orchestrator", task_id = %task_id, "Task complete");

        Ok(())
    }

    /// Reasoning prompt: transcript window first, then the rolling context
    /// store as a `Previous conversation:` prefix when non-empty.
    async fn build_reasoning_prompt(
        &self,
        prompt: &str,
        transcript: Option<&[TranscriptMessage]>,
    ) -> String {
        let rendered = transcript
            .map(|m| history::render_transcript(m, self.reasoning_history_chars))
            .unwrap_or_default();

        let with_history = if rendered.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\nNew question: {}", rendered, prompt)
        };

        let context = self.context.lock().await;
        if context.is_empty() {
            with_history
        } else {
            format!(
                "Previous conversation:\n{}\n\nNew question: {}",
                context.format_for_prompt(),
                with_history
            )
        }
    }

    /// Final prompt: the original prompt plus the loose-budget transcript
    fn build_final_prompt(&self, prompt: &str, transcript: Option<&[TranscriptMessage]>) -> String {
        let rendered = transcript
            .map(|m| history::render_transcript(m, self.response_history_chars))
            .unwrap_or_default();

        if rendered.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\nCurrent task: {}", rendered, prompt)
        }
    }

    async fn load_transcript(&self) -> Option<Vec<TranscriptMessage>> {
        let dir = self.transcript_dir.as_deref()?;
        history::find_active_transcript(dir).await
    }

    fn transition(&self, task_id: &str, status: TaskStatus) {
        if let Some(mut task) = self.tasks.get_mut(task_id) {
            task.status = status;
            task.timestamp = Utc::now();
        }
    }

    fn fail(&self, task_id: &str, error: &TandemError) {
        if let Some(mut task) = self.tasks.get_mut(task_id) {
            task.status = TaskStatus::Error;
            task.error = Some(error.to_string());
            task.timestamp = Utc::now();
        }
    }
}
