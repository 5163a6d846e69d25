//! External transcript import and character-budget windowing.
//!
//! The transcript is an ordered list of role-tagged messages maintained by an
//! external editor extension on disk. Importing it is best-effort: any
//! failure during discovery or parsing yields no history rather than an
//! error, since history is optional context.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Author of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A typed text segment inside a structured message body
#[derive(Debug, Clone, Deserialize)]
pub struct ContentSegment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

/// Message content, either a plain string or a list of typed segments
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Segments(Vec<ContentSegment>),
}

/// One role-tagged message from the external transcript
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl TranscriptMessage {
    /// Flatten the content to plain text, concatenating segments in order
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Segments(segments) => segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Render a transcript into a single string within a character budget.
///
/// Walks the transcript newest to oldest, accumulating formatted
/// `Human:`/`Assistant:` lines, and stops before the first message that
/// would push the running total over `max_chars`. The output is then
/// reversed back into chronological order. The result never exceeds the
/// budget and always prefers the most recent messages.
pub fn render_transcript(messages: &[TranscriptMessage], max_chars: usize) -> String {
    let mut formatted: Vec<String> = Vec::new();
    let mut total_len = 0usize;

    for msg in messages.iter().rev() {
        let prefix = match msg.role {
            Role::User => "Human",
            Role::Assistant => "Assistant",
        };
        let line = format!("{}: {}", prefix, msg.text());
        // Account for the "\n\n" joiner so the final string stays in budget
        let separator_len = if formatted.is_empty() { 0 } else { 2 };
        let line_len = line.chars().count() + separator_len;

        if total_len + line_len > max_chars {
            break;
        }

        formatted.push(line);
        total_len += line_len;
    }

    formatted.reverse();
    formatted.join("\n\n")
}

/// Marker entry in the extension's UI message log
#[derive(Debug, Deserialize)]
struct UiMessage {
    #[serde(rename = "type")]
    kind: String,
}

/// Platform-dependent location of the editor extension's task directories
pub fn default_tasks_dir() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    let dir = if cfg!(target_os = "windows") {
        home.join("AppData")
            .join("Roaming")
            .join("Code")
            .join("User")
            .join("globalStorage")
            .join("saoudrizwan.claude-dev")
            .join("tasks")
    } else if cfg!(target_os = "macos") {
        home.join("Library")
            .join("Application Support")
            .join("Code")
            .join("User")
            .join("globalStorage")
            .join("saoudrizwan.claude-dev")
            .join("tasks")
    } else {
        home.join(".config")
            .join("Code")
            .join("User")
            .join("globalStorage")
            .join("saoudrizwan.claude-dev")
            .join("tasks")
    };
    Some(dir)
}

/// Find the most recently active, not-yet-ended conversation transcript.
///
/// Scans the task directories under `tasks_dir`, skips conversations whose
/// UI log records a `conversation_ended` marker, and returns the transcript
/// with the newest modification time. Returns `None` when nothing usable is
/// found; individual unreadable directories are skipped with a debug log.
pub async fn find_active_transcript(tasks_dir: &Path) -> Option<Vec<TranscriptMessage>> {
    let mut dir_entries = match tokio::fs::read_dir(tasks_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!(target: "history", dir = %tasks_dir.display(), error = %e, "Cannot read tasks directory");
            return None;
        }
    };

    let mut candidates: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();

    while let Ok(Some(entry)) = dir_entries.next_entry().await {
        let dir = entry.path();
        let history_path = dir.join("api_conversation_history.json");

        let mtime = match tokio::fs::metadata(&history_path)
            .await
            .and_then(|meta| meta.modified())
        {
            Ok(mtime) => mtime,
            Err(e) => {
                debug!(target: "history", dir = %dir.display(), error = %e, "Skipping task directory");
                continue;
            }
        };

        let ui_path = dir.join("ui_messages.json");
        let has_ended = match tokio::fs::read_to_string(&ui_path).await {
            Ok(raw) => match serde_json::from_str::<Vec<UiMessage>>(&raw) {
                Ok(ui_messages) => ui_messages.iter().any(|m| m.kind == "conversation_ended"),
                Err(e) => {
                    debug!(target: "history", dir = %dir.display(), error = %e, "Malformed UI log, skipping");
                    continue;
                }
            },
            Err(e) => {
                debug!(target: "history", dir = %dir.display(), error = %e, "Missing UI log, skipping");
                continue;
            }
        };

        if !has_ended {
            candidates.push((history_path, mtime));
        }
    }

    let (latest, _) = candidates.into_iter().max_by_key(|(_, mtime)| *mtime)?;

    let raw = match tokio::fs::read_to_string(&latest).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(target: "history", path = %latest.display(), error = %e, "Failed to read transcript");
            return None;
        }
    };

    match serde_json::from_str::<Vec<TranscriptMessage>>(&raw) {
        Ok(messages) => {
            debug!(target: "history", path = %latest.display(), count = messages.len(), "Loaded transcript");
            Some(messages)
        }
        Err(e) => {
            warn!(target: "history", path = %latest.display(), error = %e, "Malformed transcript");
            None
        }
    }
}
