//! Streaming reader for Claude Code JSONL session logs.
//!
//! Lines are decoded one at a time into [`Record`]s. A physical line can
//! expand into several records (an assistant line with text and tool calls),
//! which are queued and yielded in order.
//!
//! Malformed lines never abort a read. A malformed line is held back until the
//! reader knows whether anything follows it: a malformed final line is the
//! normal result of a crash mid-write and is tolerated silently, while a
//! malformed line in the middle of the file is counted as a corrupt line.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::record::{Record, RecordKind, SessionHeader, TokenStats};

/// Buffer size for `BufReader` (64KB for optimal performance on large files)
const BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode problems encountered during a read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadWarnings {
    /// Malformed lines that were followed by more data.
    pub corrupt_lines: usize,
    /// Whether the last line was malformed and skipped.
    pub truncated_tail: bool,
}

/// One log line, typed down to the fields the engine uses.
#[derive(Debug, Deserialize)]
struct LogLine {
    #[serde(rename = "type")]
    line_type: Option<String>,
    timestamp: Option<String>,
    cwd: Option<String>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    version: Option<String>,
    #[serde(rename = "gitBranch")]
    git_branch: Option<String>,
    message: Option<LogMessage>,
}

#[derive(Debug, Deserialize)]
struct LogMessage {
    model: Option<String>,
    content: Option<MessageContentValue>,
    usage: Option<RawUsage>,
}

/// Message content can be a string or an array of content blocks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContentValue {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: Option<bool>,
    },
    /// `thinking`, `image` and anything newer.
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct RawUsage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
}

impl From<RawUsage> for TokenStats {
    fn from(usage: RawUsage) -> Self {
        Self::new(
            usage.input_tokens.unwrap_or(0),
            usage.output_tokens.unwrap_or(0),
            usage.cache_read_input_tokens.unwrap_or(0),
            usage.cache_creation_input_tokens.unwrap_or(0),
        )
    }
}

/// Parse an RFC 3339 timestamp, ignoring anything unparsable.
pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Flatten tool result content (string or text blocks) into plain text.
fn tool_result_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn maybe_set(target: &mut Option<String>, value: Option<&String>) {
    if target.is_none()
        && let Some(value) = value.filter(|v| !v.is_empty())
    {
        *target = Some(value.clone());
    }
}

/// Lazy, forward-only record iterator over one session log.
///
/// Only I/O failures surface as `Err` items; decode failures are recorded in
/// [`LogReader::warnings`].
pub struct LogReader<R> {
    reader: R,
    path: Option<PathBuf>,
    buf: Vec<u8>,
    line_index: usize,
    queued: VecDeque<Record>,
    pending_corrupt: Option<usize>,
    header: SessionHeader,
    warnings: ReadWarnings,
    done: bool,
}

impl LogReader<BufReader<File>> {
    /// Open a session file for a single forward pass.
    pub fn open(path: &Path) -> Result<Self, ReadError> {
        let file = File::open(path)?;
        let mut reader = Self::new(BufReader::with_capacity(BUFFER_SIZE, file));
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }
}

impl<R: BufRead> LogReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            path: None,
            buf: Vec::new(),
            line_index: 0,
            queued: VecDeque::new(),
            pending_corrupt: None,
            header: SessionHeader::default(),
            warnings: ReadWarnings::default(),
            done: false,
        }
    }

    /// Session-level fields seen so far.
    pub const fn header(&self) -> &SessionHeader {
        &self.header
    }

    /// Decode warnings seen so far. Final once the iterator is exhausted.
    pub const fn warnings(&self) -> ReadWarnings {
        self.warnings
    }

    fn flag_pending_corrupt(&mut self) {
        if let Some(line) = self.pending_corrupt.take() {
            self.warnings.corrupt_lines += 1;
            tracing::warn!(path = ?self.path, line = line + 1, "skipping corrupt log line");
        }
    }

    fn finish(&mut self) {
        self.done = true;
        if let Some(line) = self.pending_corrupt.take() {
            self.warnings.truncated_tail = true;
            tracing::debug!(path = ?self.path, line = line + 1, "ignoring truncated final line");
        }
    }

    fn handle_line(&mut self, index: usize, bytes: &[u8]) {
        let Ok(text) = std::str::from_utf8(bytes) else {
            self.flag_pending_corrupt();
            self.pending_corrupt = Some(index);
            return;
        };
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        // Anything non-blank after a malformed line proves it was not a torn write.
        self.flag_pending_corrupt();

        match serde_json::from_str::<LogLine>(text) {
            Ok(line) => self.decode(index, line),
            Err(e) => {
                tracing::trace!(error = %e, line = index + 1, "malformed JSON line");
                self.pending_corrupt = Some(index);
            }
        }
    }

    fn decode(&mut self, index: usize, line: LogLine) {
        maybe_set(&mut self.header.session_id, line.session_id.as_ref());
        maybe_set(&mut self.header.cwd, line.cwd.as_ref());
        maybe_set(&mut self.header.version, line.version.as_ref());
        maybe_set(&mut self.header.git_branch, line.git_branch.as_ref());

        let timestamp = parse_timestamp(line.timestamp.as_deref());
        let Some(message) = line.message else {
            return;
        };
        let usage: TokenStats = message.usage.map(Into::into).unwrap_or_default();
        let record = |kind| Record {
            line: index,
            timestamp,
            kind,
        };

        match line.line_type.as_deref() {
            Some("user") => match message.content {
                Some(MessageContentValue::Text(text)) => {
                    if !text.trim().is_empty() {
                        self.queued.push_back(record(RecordKind::UserMessage {
                            text,
                            cwd: line.cwd,
                        }));
                    }
                }
                Some(MessageContentValue::Blocks(blocks)) => {
                    let mut texts = Vec::new();
                    let mut usage = Some(usage);
                    for block in blocks {
                        match block {
                            ContentBlock::Text { text } => texts.push(text),
                            ContentBlock::ToolResult {
                                tool_use_id,
                                content,
                                is_error,
                            } => {
                                self.queued.push_back(record(RecordKind::ToolResult {
                                    tool_use_id,
                                    content: tool_result_text(&content),
                                    is_error: is_error.unwrap_or(false),
                                    // A line's usage is attributed once.
                                    usage: usage.take().unwrap_or_default(),
                                }));
                            }
                            ContentBlock::ToolUse { .. } | ContentBlock::Other => {}
                        }
                    }
                    let text = texts.join("\n");
                    if !text.trim().is_empty() {
                        self.queued.push_back(record(RecordKind::UserMessage {
                            text,
                            cwd: line.cwd,
                        }));
                    }
                }
                None => {}
            },
            Some("assistant") => {
                let mut texts = Vec::new();
                let mut calls = Vec::new();
                match message.content {
                    Some(MessageContentValue::Text(text)) => texts.push(text),
                    Some(MessageContentValue::Blocks(blocks)) => {
                        for block in blocks {
                            match block {
                                ContentBlock::Text { text } => texts.push(text),
                                ContentBlock::ToolUse { id, name, input } => {
                                    calls.push(RecordKind::ToolCall { id, name, input });
                                }
                                ContentBlock::ToolResult { .. } | ContentBlock::Other => {}
                            }
                        }
                    }
                    None => {}
                }
                self.queued.push_back(record(RecordKind::AgentMessage {
                    text: texts.join("\n"),
                    model: message.model,
                    usage,
                }));
                self.queued.extend(calls.into_iter().map(record));
            }
            _ => {}
        }
    }
}

impl<R: BufRead> Iterator for LogReader<R> {
    type Item = Result<Record, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.queued.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }

            let mut buf = std::mem::take(&mut self.buf);
            buf.clear();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    self.buf = buf;
                    self.finish();
                }
                Ok(_) => {
                    let index = self.line_index;
                    self.line_index += 1;
                    self.handle_line(index, &buf);
                    self.buf = buf;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(ReadError::Io(e)));
                }
            }
        }
    }
}

/// Timestamp of the first record in a session log, if any record carries one.
///
/// Stops reading as soon as it is found.
pub fn read_start_time(path: &Path) -> Result<Option<DateTime<Utc>>, ReadError> {
    for record in LogReader::open(path)? {
        if let Some(ts) = record?.timestamp {
            return Ok(Some(ts));
        }
    }
    Ok(None)
}
