//! Cheap per-session summaries for listings.
//!
//! A summary only walks the record stream: no turn assembly and no tool call
//! pairing, so hundreds of sessions can be summarized per listing.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reader::{LogReader, ReadError};
use crate::record::RecordKind;
use crate::store::{SessionFile, extract_project_name};

/// Maximum preview length in characters.
pub const PREVIEW_CHARS: usize = 100;

const NO_PREVIEW: &str = "(no preview)";

/// Listing view of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// The session file path.
    pub session_id: String,
    pub path: PathBuf,
    pub date: DateTime<Utc>,
    /// Working directory the session ran in.
    pub project: String,
    pub project_name: String,
    pub preview: String,
    pub duration_seconds: i64,
    pub turn_count: usize,
    /// User and agent messages.
    pub message_count: usize,
    pub modified: DateTime<Utc>,
}

/// Slash commands and injected `<command-name>`-style tags make poor previews.
fn is_command_noise(text: &str) -> bool {
    let text = text.trim_start();
    text.starts_with('<') || text.starts_with('/')
}

/// First [`PREVIEW_CHARS`] characters of `text`, with `...` appended if cut.
pub fn make_preview(text: &str) -> String {
    let text = text.trim();
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Summarize one session file.
pub fn summarize(file: &SessionFile) -> Result<SessionSummary, ReadError> {
    let mut reader = LogReader::open(&file.path)?;

    let mut first_timestamp: Option<DateTime<Utc>> = None;
    let mut last_timestamp: Option<DateTime<Utc>> = None;
    let mut preview: Option<String> = None;
    let mut cwd: Option<String> = None;
    let mut turn_count = 0usize;
    let mut message_count = 0usize;

    for record in reader.by_ref() {
        let record = record?;
        if let Some(ts) = record.timestamp {
            first_timestamp.get_or_insert(ts);
            last_timestamp = Some(ts);
        }

        match &record.kind {
            RecordKind::UserMessage { text, cwd: line_cwd } => {
                turn_count += 1;
                message_count += 1;
                if preview.is_none() && !is_command_noise(text) {
                    preview = Some(make_preview(text));
                }
                if cwd.is_none() {
                    cwd.clone_from(line_cwd);
                }
            }
            RecordKind::AgentMessage { .. } => message_count += 1,
            RecordKind::ToolCall { .. } | RecordKind::ToolResult { .. } => {}
        }
    }

    let project = reader
        .header()
        .cwd
        .clone()
        .or(cwd)
        .unwrap_or_else(|| file.project_path.clone());
    let duration_seconds = match (first_timestamp, last_timestamp) {
        (Some(first), Some(last)) => (last - first).num_seconds(),
        _ => 0,
    };

    Ok(SessionSummary {
        session_id: file.id(),
        path: file.path.clone(),
        date: first_timestamp.unwrap_or(file.start_time),
        project_name: extract_project_name(&project),
        project,
        preview: preview.unwrap_or_else(|| NO_PREVIEW.to_string()),
        duration_seconds,
        turn_count,
        message_count,
        modified: file.modified,
    })
}
