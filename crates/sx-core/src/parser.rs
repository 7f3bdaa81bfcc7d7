//! Full structured parse of one session: turns, tool calls and usage totals.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reader::{LogReader, ReadError, ReadWarnings};
use crate::record::{Record, RecordKind, SessionHeader, TokenStats};
use crate::store::extract_project_name;

/// What a tool call did, as far as session statistics are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    FileCreate,
    FileEdit,
    FileRead,
    Command,
    Other,
}

/// Tool families recognized by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolKind {
    /// Creates the file, or rewrites one that already existed.
    Write,
    Edit,
    Read,
    Shell,
}

const TOOL_KINDS: &[(&str, ToolKind)] = &[
    ("Write", ToolKind::Write),
    ("Edit", ToolKind::Edit),
    ("MultiEdit", ToolKind::Edit),
    ("NotebookEdit", ToolKind::Edit),
    ("Read", ToolKind::Read),
    ("Bash", ToolKind::Shell),
];

fn tool_kind(name: &str) -> Option<ToolKind> {
    TOOL_KINDS
        .iter()
        .find(|(tool, _)| *tool == name)
        .map(|(_, kind)| *kind)
}

fn target_path(input: &Value) -> Option<&str> {
    input
        .get("file_path")
        .or_else(|| input.get("notebook_path"))
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
}

/// A tool call embedded in a turn, with its result once seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnToolCall {
    pub id: String,
    pub name: String,
    pub category: ToolCategory,
    pub input: Value,
    pub result: Option<String>,
    #[serde(default)]
    pub is_error: bool,
}

/// One user message and everything the agent did in response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub timestamp: Option<DateTime<Utc>>,
    pub user_message: String,
    pub agent_response: String,
    pub tool_calls: Vec<TurnToolCall>,
    /// Seconds until the next turn started; 0 for the last turn.
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub path: Option<PathBuf>,
    pub session_id: Option<String>,
    pub project: Option<String>,
    pub project_name: String,
    pub version: Option<String>,
    pub git_branch: Option<String>,
    /// Models in order of first use.
    pub models: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub turn_count: usize,
    pub tool_calls: usize,
    pub tool_counts: BTreeMap<String, usize>,
    /// Unique paths created.
    pub files_created: usize,
    /// Unique paths edited.
    pub files_edited: usize,
    /// Unique paths read.
    pub files_read: usize,
    /// Shell invocations.
    pub commands_run: usize,
    pub created_files: Vec<String>,
    pub edited_files: Vec<String>,
    pub read_files: Vec<String>,
    pub commands: Vec<String>,
    pub tokens: TokenStats,
}

/// Structured model of one session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSession {
    pub metadata: SessionMetadata,
    pub turns: Vec<Turn>,
    pub stats: SessionStats,
    pub warnings: ReadWarnings,
}

/// Incremental builder fed one record at a time.
#[derive(Debug, Default)]
pub struct SessionParser {
    turns: Vec<Turn>,
    /// Tool id to (turn, call) position, for attaching results.
    open_calls: HashMap<String, (usize, usize)>,
    touched_paths: BTreeSet<String>,
    created: BTreeSet<String>,
    edited: BTreeSet<String>,
    read: BTreeSet<String>,
    commands: Vec<String>,
    tool_counts: BTreeMap<String, usize>,
    tool_calls: usize,
    tokens: TokenStats,
    first_timestamp: Option<DateTime<Utc>>,
    last_timestamp: Option<DateTime<Utc>>,
    models: Vec<String>,
    cwd: Option<String>,
}

impl SessionParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        if let Some(ts) = record.timestamp {
            self.first_timestamp.get_or_insert(ts);
            self.last_timestamp = Some(ts);
        }
        self.tokens += record.usage();

        match record.kind {
            RecordKind::UserMessage { text, cwd } => {
                if self.cwd.is_none() {
                    self.cwd = cwd;
                }
                self.turns.push(Turn {
                    timestamp: record.timestamp,
                    user_message: text,
                    agent_response: String::new(),
                    tool_calls: Vec::new(),
                    duration_seconds: 0,
                });
            }
            RecordKind::AgentMessage { text, model, .. } => {
                if let Some(model) = model
                    && !self.models.contains(&model)
                {
                    self.models.push(model);
                }
                if let Some(turn) = self.turns.last_mut()
                    && !text.trim().is_empty()
                {
                    if !turn.agent_response.is_empty() {
                        turn.agent_response.push_str("\n\n");
                    }
                    turn.agent_response.push_str(&text);
                }
            }
            RecordKind::ToolCall { id, name, input } => {
                self.tool_calls += 1;
                *self.tool_counts.entry(name.clone()).or_insert(0) += 1;
                let category = self.classify(&name, &input);

                if let Some(turn_index) = self.turns.len().checked_sub(1) {
                    let turn = &mut self.turns[turn_index];
                    if !id.is_empty() {
                        self.open_calls
                            .insert(id.clone(), (turn_index, turn.tool_calls.len()));
                    }
                    turn.tool_calls.push(TurnToolCall {
                        id,
                        name,
                        category,
                        input,
                        result: None,
                        is_error: false,
                    });
                }
            }
            RecordKind::ToolResult {
                tool_use_id,
                content,
                is_error,
                ..
            } => {
                if let Some((turn, call)) = self.open_calls.remove(&tool_use_id) {
                    let call = &mut self.turns[turn].tool_calls[call];
                    call.result = Some(content);
                    call.is_error = is_error;
                }
            }
        }
    }

    /// Categorize a tool call and record its effect on files and commands.
    fn classify(&mut self, name: &str, input: &Value) -> ToolCategory {
        let path = target_path(input).map(str::to_string);

        let category = match tool_kind(name) {
            Some(ToolKind::Write) => {
                let existed = path.as_ref().is_some_and(|p| self.touched_paths.contains(p));
                if existed {
                    ToolCategory::FileEdit
                } else {
                    ToolCategory::FileCreate
                }
            }
            Some(ToolKind::Edit) => ToolCategory::FileEdit,
            Some(ToolKind::Read) => ToolCategory::FileRead,
            Some(ToolKind::Shell) => {
                let command = input.get("command").and_then(Value::as_str).unwrap_or("");
                self.commands.push(command.to_string());
                ToolCategory::Command
            }
            None => ToolCategory::Other,
        };

        if let Some(path) = path {
            match category {
                ToolCategory::FileCreate => {
                    self.created.insert(path.clone());
                }
                ToolCategory::FileEdit => {
                    self.edited.insert(path.clone());
                }
                ToolCategory::FileRead => {
                    self.read.insert(path.clone());
                }
                ToolCategory::Command | ToolCategory::Other => {}
            }
            self.touched_paths.insert(path);
        }

        category
    }

    /// Assemble the parsed session.
    pub fn finish(
        mut self,
        path: Option<&Path>,
        header: &SessionHeader,
        warnings: ReadWarnings,
    ) -> ParsedSession {
        let starts: Vec<Option<DateTime<Utc>>> = self.turns.iter().map(|t| t.timestamp).collect();
        for (turn, next) in self.turns.iter_mut().zip(starts.iter().skip(1)) {
            if let (Some(start), Some(next)) = (turn.timestamp, next) {
                turn.duration_seconds = (*next - start).num_seconds().max(0);
            }
        }

        let project = header.cwd.clone().or(self.cwd);
        let duration_seconds = match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => (last - first).num_seconds(),
            _ => 0,
        };

        let stats = SessionStats {
            turn_count: self.turns.len(),
            tool_calls: self.tool_calls,
            tool_counts: self.tool_counts,
            files_created: self.created.len(),
            files_edited: self.edited.len(),
            files_read: self.read.len(),
            commands_run: self.commands.len(),
            created_files: self.created.into_iter().collect(),
            edited_files: self.edited.into_iter().collect(),
            read_files: self.read.into_iter().collect(),
            commands: self.commands,
            tokens: self.tokens,
        };

        ParsedSession {
            metadata: SessionMetadata {
                path: path.map(Path::to_path_buf),
                session_id: header.session_id.clone(),
                project_name: project
                    .as_deref()
                    .map_or_else(|| "unknown".to_string(), extract_project_name),
                project,
                version: header.version.clone(),
                git_branch: header.git_branch.clone(),
                models: self.models,
                started_at: self.first_timestamp,
                ended_at: self.last_timestamp,
                duration_seconds,
            },
            turns: self.turns,
            stats,
            warnings,
        }
    }
}

/// Parse an already-decoded record stream.
pub fn parse<I>(records: I) -> ParsedSession
where
    I: IntoIterator<Item = Record>,
{
    let mut parser = SessionParser::new();
    for record in records {
        parser.push(record);
    }
    parser.finish(None, &SessionHeader::default(), ReadWarnings::default())
}

/// Read and parse one session log.
pub fn parse_file(path: &Path) -> Result<ParsedSession, ReadError> {
    let mut reader = LogReader::open(path)?;
    let mut parser = SessionParser::new();
    for record in reader.by_ref() {
        parser.push(record?);
    }
    Ok(parser.finish(Some(path), reader.header(), reader.warnings()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Three turns, an Edit and a Bash call, usage 1000/500/200/0.
    fn write_example_session(file: &mut NamedTempFile) {
        writeln!(file, r#"{{"type":"user","message":{{"role":"user","content":"fix the parser"}},"timestamp":"2026-01-29T10:00:00Z","cwd":"/home/sami/project","sessionId":"s-1"}}"#).unwrap();
        writeln!(file, r#"{{"type":"assistant","message":{{"role":"assistant","model":"claude-sonnet-4","content":[{{"type":"text","text":"Editing."}},{{"type":"tool_use","id":"t1","name":"Edit","input":{{"file_path":"/home/sami/project/src/lib.rs","old_string":"a","new_string":"b"}}}}],"usage":{{"input_tokens":400,"output_tokens":200,"cache_read_input_tokens":200}}}},"timestamp":"2026-01-29T10:00:10Z"}}"#).unwrap();
        writeln!(file, r#"{{"type":"user","message":{{"role":"user","content":[{{"type":"tool_result","tool_use_id":"t1","content":"ok"}}]}},"timestamp":"2026-01-29T10:00:11Z"}}"#).unwrap();
        writeln!(file, r#"{{"type":"user","message":{{"role":"user","content":"now run the tests"}},"timestamp":"2026-01-29T10:01:00Z"}}"#).unwrap();
        writeln!(file, r#"{{"type":"assistant","message":{{"role":"assistant","content":[{{"type":"tool_use","id":"t2","name":"Bash","input":{{"command":"cargo test"}}}}],"usage":{{"input_tokens":300,"output_tokens":100}}}},"timestamp":"2026-01-29T10:01:05Z"}}"#).unwrap();
        writeln!(file, r#"{{"type":"user","message":{{"role":"user","content":[{{"type":"tool_result","tool_use_id":"t2","content":"test result: ok","is_error":false}}]}},"timestamp":"2026-01-29T10:01:30Z"}}"#).unwrap();
        writeln!(file, r#"{{"type":"user","message":{{"role":"user","content":"thanks"}},"timestamp":"2026-01-29T10:02:00Z"}}"#).unwrap();
        writeln!(file, r#"{{"type":"assistant","message":{{"role":"assistant","content":"You're welcome.","usage":{{"input_tokens":300,"output_tokens":200}}}},"timestamp":"2026-01-29T10:02:30Z"}}"#).unwrap();
    }

    #[test]
    fn test_parse_example_session() {
        let mut file = NamedTempFile::new().unwrap();
        write_example_session(&mut file);

        let parsed = parse_file(file.path()).unwrap();

        assert_eq!(parsed.stats.turn_count, 3);
        assert_eq!(parsed.stats.tool_calls, 2);
        assert_eq!(parsed.stats.files_edited, 1);
        assert_eq!(parsed.stats.files_created, 0);
        assert_eq!(parsed.stats.commands_run, 1);
        assert_eq!(parsed.stats.tokens, TokenStats::new(1000, 500, 200, 0));
        assert_eq!(parsed.stats.commands, vec!["cargo test"]);
        assert_eq!(parsed.stats.tool_counts.get("Edit"), Some(&1));
        assert_eq!(parsed.stats.tool_counts.get("Bash"), Some(&1));

        assert_eq!(parsed.metadata.session_id.as_deref(), Some("s-1"));
        assert_eq!(parsed.metadata.project.as_deref(), Some("/home/sami/project"));
        assert_eq!(parsed.metadata.project_name, "project");
        assert_eq!(parsed.metadata.models, vec!["claude-sonnet-4"]);
        assert_eq!(parsed.metadata.duration_seconds, 150);
        assert_eq!(parsed.warnings, ReadWarnings::default());
    }

    #[test]
    fn test_turns_carry_responses_and_results() {
        let mut file = NamedTempFile::new().unwrap();
        write_example_session(&mut file);

        let parsed = parse_file(file.path()).unwrap();
        let turns = &parsed.turns;

        assert_eq!(turns[0].user_message, "fix the parser");
        assert_eq!(turns[0].agent_response, "Editing.");
        assert_eq!(turns[0].tool_calls.len(), 1);
        assert_eq!(turns[0].tool_calls[0].category, ToolCategory::FileEdit);
        assert_eq!(turns[0].tool_calls[0].result.as_deref(), Some("ok"));
        assert_eq!(turns[0].duration_seconds, 60);

        assert_eq!(turns[1].agent_response, "");
        assert_eq!(turns[1].tool_calls[0].category, ToolCategory::Command);
        assert_eq!(
            turns[1].tool_calls[0].result.as_deref(),
            Some("test result: ok")
        );

        assert_eq!(turns[2].agent_response, "You're welcome.");
        assert_eq!(turns[2].duration_seconds, 0);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let mut file = NamedTempFile::new().unwrap();
        write_example_session(&mut file);

        let first = parse_file(file.path()).unwrap();
        let second = parse_file(file.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_token_totals_equal_sum_of_record_usage() {
        let mut file = NamedTempFile::new().unwrap();
        write_example_session(&mut file);

        let records: Vec<Record> = LogReader::open(file.path())
            .unwrap()
            .map(Result::unwrap)
            .collect();
        let expected: TokenStats = records.iter().map(Record::usage).sum();

        assert_eq!(parse(records).stats.tokens, expected);
    }

    #[test]
    fn test_write_creates_then_edits() {
        let records = vec![
            user(0, "make a file"),
            call(1, "w1", "Write", serde_json::json!({"file_path": "/p/new.rs", "content": "x"})),
            call(2, "w2", "Write", serde_json::json!({"file_path": "/p/new.rs", "content": "y"})),
            call(3, "r1", "Read", serde_json::json!({"file_path": "/p/old.rs"})),
            call(4, "w3", "Write", serde_json::json!({"file_path": "/p/old.rs", "content": "z"})),
        ];

        let parsed = parse(records);
        let categories: Vec<ToolCategory> = parsed.turns[0]
            .tool_calls
            .iter()
            .map(|c| c.category)
            .collect();

        assert_eq!(
            categories,
            vec![
                ToolCategory::FileCreate,
                ToolCategory::FileEdit,
                ToolCategory::FileRead,
                ToolCategory::FileEdit,
            ]
        );
        assert_eq!(parsed.stats.created_files, vec!["/p/new.rs"]);
        assert_eq!(parsed.stats.edited_files, vec!["/p/new.rs", "/p/old.rs"]);
        assert_eq!(parsed.stats.files_read, 1);
    }

    #[test]
    fn test_unknown_tools_count_as_other() {
        let records = vec![
            user(0, "look around"),
            call(1, "g1", "Grep", serde_json::json!({"pattern": "fn main"})),
            call(2, "m1", "mcp__github__create_issue", serde_json::json!({})),
        ];

        let parsed = parse(records);

        assert_eq!(parsed.stats.tool_calls, 2);
        assert_eq!(parsed.stats.files_created + parsed.stats.files_edited, 0);
        assert_eq!(parsed.stats.commands_run, 0);
        assert!(
            parsed.turns[0]
                .tool_calls
                .iter()
                .all(|c| c.category == ToolCategory::Other)
        );
    }

    #[test]
    fn test_records_before_first_user_message_still_count() {
        let records = vec![
            Record {
                line: 0,
                timestamp: None,
                kind: RecordKind::AgentMessage {
                    text: "warming up".to_string(),
                    model: None,
                    usage: TokenStats::new(5, 5, 0, 0),
                },
            },
            call(1, "b1", "Bash", serde_json::json!({"command": "pwd"})),
            user(2, "hello"),
        ];

        let parsed = parse(records);

        assert_eq!(parsed.stats.turn_count, 1);
        assert_eq!(parsed.stats.tool_calls, 1);
        assert_eq!(parsed.stats.commands_run, 1);
        assert_eq!(parsed.stats.tokens, TokenStats::new(5, 5, 0, 0));
        assert!(parsed.turns[0].tool_calls.is_empty());
        assert_eq!(parsed.turns[0].agent_response, "");
    }

    #[test]
    fn test_corrupt_middle_line_drops_only_that_turn() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type":"user","message":{{"content":"one"}},"timestamp":"2026-01-29T10:00:00Z"}}"#).unwrap();
        writeln!(file, r#"{{"type":"user","message":{{"content":"two""#).unwrap();
        writeln!(file, r#"{{"type":"user","message":{{"content":"three"}},"timestamp":"2026-01-29T10:02:00Z"}}"#).unwrap();

        let parsed = parse_file(file.path()).unwrap();

        assert_eq!(parsed.stats.turn_count, 2);
        assert_eq!(parsed.warnings.corrupt_lines, 1);
        assert!(!parsed.warnings.truncated_tail);
    }

    #[test]
    fn test_truncated_tail_keeps_complete_turns() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type":"user","message":{{"content":"one"}},"timestamp":"2026-01-29T10:00:00Z"}}"#).unwrap();
        writeln!(file, r#"{{"type":"assistant","message":{{"content":"reply"}},"timestamp":"2026-01-29T10:00:01Z"}}"#).unwrap();
        write!(file, r#"{{"type":"user","message":{{"content":"tw"#).unwrap();
        file.flush().unwrap();

        let parsed = parse_file(file.path()).unwrap();

        assert_eq!(parsed.stats.turn_count, 1);
        assert_eq!(parsed.warnings.corrupt_lines, 0);
        assert!(parsed.warnings.truncated_tail);
    }

    #[test]
    fn test_parse_missing_file_is_an_error() {
        let result = parse_file(Path::new("/nonexistent/session.jsonl"));
        assert!(matches!(result, Err(ReadError::Io(_))));
    }

    fn user(line: usize, text: &str) -> Record {
        Record {
            line,
            timestamp: None,
            kind: RecordKind::UserMessage {
                text: text.to_string(),
                cwd: None,
            },
        }
    }

    fn call(line: usize, id: &str, name: &str, input: Value) -> Record {
        Record {
            line,
            timestamp: None,
            kind: RecordKind::ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                input,
            },
        }
    }
}
