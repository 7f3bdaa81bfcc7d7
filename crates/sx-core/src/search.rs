//! Case-insensitive full-text search across session logs.
//!
//! Matching is done on text units: a user message, an agent message, a tool
//! result, or one string argument of a tool call. Each matching unit yields
//! one match whose snippet never crosses into another unit.
//!
//! Line breaks match as spaces on both sides, the same way snippets show them.

use std::cmp::Ordering;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::reader::{LogReader, ReadError};
use crate::record::{Record, RecordKind, Role};
use crate::scope::Scope;
use crate::store::{LocateError, SessionFile, SessionStore, extract_project_name};

pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_PER_SESSION: usize = 5;
pub const DEFAULT_SNIPPET_WIDTH: usize = 80;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search query is empty")]
    EmptyQuery,
    #[error(transparent)]
    Locate(#[from] LocateError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub scope: Scope,
    pub cwd: PathBuf,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    /// Maximum matches overall; 0 means no bound.
    pub limit: usize,
    /// Maximum matches per session; 0 means no bound.
    pub per_session: usize,
    /// Snippet width in characters.
    pub snippet_width: usize,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, scope: Scope, cwd: impl Into<PathBuf>) -> Self {
        Self {
            query: query.into(),
            scope,
            cwd: cwd.into(),
            after: None,
            before: None,
            limit: DEFAULT_LIMIT,
            per_session: DEFAULT_PER_SESSION,
            snippet_width: DEFAULT_SNIPPET_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub session_id: String,
    /// 0-based line of the matching record in the session file.
    pub matched_line_index: usize,
    pub snippet: String,
    /// Occurrences of the query in the matched text.
    pub score: usize,
    pub role: Role,
    pub timestamp: Option<DateTime<Utc>>,
    pub session_date: DateTime<Utc>,
    pub project_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub matches: Vec<SearchMatch>,
    pub sessions_scanned: usize,
    pub sessions_matched: usize,
    pub skipped: usize,
}

/// Lowercased characters of a text, each mapped back to its source character.
struct Folded {
    chars: Vec<char>,
    origin: Vec<usize>,
}

impl Folded {
    fn new(text: &str) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut origin = Vec::with_capacity(text.len());
        for (i, c) in text.chars().map(flatten).enumerate() {
            for lower in c.to_lowercase() {
                chars.push(lower);
                origin.push(i);
            }
        }
        Self { chars, origin }
    }
}

const fn flatten(c: char) -> char {
    if c == '\n' || c == '\r' { ' ' } else { c }
}

fn fold(text: &str) -> Vec<char> {
    text.chars().map(flatten).flat_map(char::to_lowercase).collect()
}

/// Non-overlapping occurrences of `needle`, as source character ranges.
fn find_all(haystack: &Folded, needle: &[char]) -> Vec<(usize, usize)> {
    let mut found = Vec::new();
    if needle.is_empty() || haystack.chars.len() < needle.len() {
        return found;
    }

    let mut i = 0;
    while i + needle.len() <= haystack.chars.len() {
        if haystack.chars[i..i + needle.len()] == *needle {
            let start = haystack.origin[i];
            let end = haystack.origin[i + needle.len() - 1] + 1;
            found.push((start, end));
            i += needle.len();
        } else {
            i += 1;
        }
    }
    found
}

/// A `width`-character window centred on `start`, widened to cover `end`.
fn snippet(chars: &[char], start: usize, end: usize, width: usize) -> String {
    let from = start.saturating_sub(width / 2);
    let to = (from + width).min(chars.len()).max(end);
    chars[from..to].iter().copied().map(flatten).collect()
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Searchable text units of a record, in order.
fn text_units(record: &Record) -> Vec<&str> {
    match &record.kind {
        RecordKind::UserMessage { text, .. } | RecordKind::AgentMessage { text, .. } => {
            vec![text.as_str()]
        }
        RecordKind::ToolCall { input, .. } => {
            let mut out = Vec::new();
            collect_strings(input, &mut out);
            out
        }
        RecordKind::ToolResult { content, .. } => vec![content.as_str()],
    }
}

fn rank(a: &SearchMatch, b: &SearchMatch) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.session_date.cmp(&a.session_date))
        .then_with(|| a.session_id.cmp(&b.session_id))
        .then_with(|| a.matched_line_index.cmp(&b.matched_line_index))
}

/// Scan one session, returning its ranked matches before any per-session cap.
fn scan_session(
    file: &SessionFile,
    needle: &[char],
    snippet_width: usize,
) -> Result<Vec<SearchMatch>, ReadError> {
    let mut reader = LogReader::open(&file.path)?;
    let session_id = file.id();
    let mut matches = Vec::new();
    let mut cwd: Option<String> = None;

    for record in reader.by_ref() {
        let record = record?;
        if let RecordKind::UserMessage { cwd: Some(line_cwd), .. } = &record.kind {
            cwd.get_or_insert_with(|| line_cwd.clone());
        }

        for text in text_units(&record) {
            let folded = Folded::new(text);
            let found = find_all(&folded, needle);
            let Some(&(start, end)) = found.first() else {
                continue;
            };
            let chars: Vec<char> = text.chars().collect();
            matches.push(SearchMatch {
                session_id: session_id.clone(),
                matched_line_index: record.line,
                snippet: snippet(&chars, start, end, snippet_width),
                score: found.len(),
                role: record.role(),
                timestamp: record.timestamp,
                session_date: file.start_time,
                project_name: String::new(),
            });
        }
    }

    let project = reader
        .header()
        .cwd
        .clone()
        .or(cwd)
        .unwrap_or_else(|| file.project_path.clone());
    let project_name = extract_project_name(&project);
    for m in &mut matches {
        m.project_name.clone_from(&project_name);
    }

    tracing::trace!(path = ?file.path, matches = matches.len(), "scanned session");
    Ok(matches)
}

pub fn search(store: &SessionStore, query: &SearchQuery) -> Result<SearchResults, SearchError> {
    if query.query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    let needle = fold(&query.query);

    let located = store.locate(query.scope, &query.cwd, query.after, query.before)?;
    let mut skipped = located.skipped;

    let results: Vec<_> = located
        .files
        .par_iter()
        .map(|file| (file, scan_session(file, &needle, query.snippet_width)))
        .collect();

    let mut sessions_scanned = 0;
    let mut sessions_matched = 0;
    let mut matches = Vec::new();
    for (file, result) in results {
        match result {
            Ok(mut found) => {
                sessions_scanned += 1;
                if found.is_empty() {
                    continue;
                }
                sessions_matched += 1;
                found.sort_by(rank);
                if query.per_session > 0 {
                    found.truncate(query.per_session);
                }
                matches.append(&mut found);
            }
            Err(e) => {
                tracing::warn!(path = ?file.path, error = %e, "skipping unreadable session");
                skipped += 1;
            }
        }
    }

    matches.sort_by(rank);
    if query.limit > 0 {
        matches.truncate(query.limit);
    }

    Ok(SearchResults {
        query: query.query.clone(),
        matches,
        sessions_scanned,
        sessions_matched,
        skipped,
    })
}
