//! `sx parse`: one session as statistics and turns.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use sx_core::{
    ParsedSession, ReadWarnings, SessionMetadata, SessionStats, ToolCategory, Turn, TurnToolCall,
    parse_file,
};

use super::util::{format_duration, format_timestamp};

const LINE_CHARS: usize = 100;

/// `--stats-only` JSON document.
#[derive(Debug, Serialize)]
struct StatsOnly<'a> {
    metadata: &'a SessionMetadata,
    stats: &'a SessionStats,
    warnings: ReadWarnings,
}

/// First line of `text`, shortened to `max_chars`.
fn one_line(text: &str, max_chars: usize) -> String {
    let line = text.trim().lines().next().unwrap_or("");
    if line.chars().count() > max_chars {
        let head: String = line.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        line.to_string()
    }
}

fn describe_call(call: &TurnToolCall) -> String {
    let target = match call.category {
        ToolCategory::FileCreate | ToolCategory::FileEdit | ToolCategory::FileRead => call
            .input
            .get("file_path")
            .or_else(|| call.input.get("notebook_path"))
            .and_then(Value::as_str),
        ToolCategory::Command => call.input.get("command").and_then(Value::as_str),
        ToolCategory::Other => None,
    };
    let category = serde_json::to_value(call.category)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let error = if call.is_error { " [error]" } else { "" };

    match target {
        Some(target) => format!("{} ({category}): {}{error}", call.name, one_line(target, LINE_CHARS)),
        None => format!("{} ({category}){error}", call.name),
    }
}

fn write_header(output: &mut String, session: &ParsedSession) {
    let meta = &session.metadata;
    writeln!(output, "SESSION: {}", meta.project_name).unwrap();
    if let Some(path) = &meta.path {
        writeln!(output, "Path:     {}", path.display()).unwrap();
    }
    if let Some(id) = &meta.session_id {
        writeln!(output, "Id:       {id}").unwrap();
    }
    if let Some(project) = &meta.project {
        writeln!(output, "Project:  {project}").unwrap();
    }
    if let Some(branch) = &meta.git_branch {
        writeln!(output, "Branch:   {branch}").unwrap();
    }
    if let Some(started) = meta.started_at {
        writeln!(output, "Started:  {}", format_timestamp(started)).unwrap();
    }
    writeln!(output, "Duration: {}", format_duration(meta.duration_seconds)).unwrap();
    if !meta.models.is_empty() {
        writeln!(output, "Models:   {}", meta.models.join(", ")).unwrap();
    }
}

fn write_stats(output: &mut String, stats: &SessionStats, warnings: ReadWarnings) {
    writeln!(output).unwrap();
    writeln!(output, "STATS").unwrap();
    writeln!(output, "─────").unwrap();
    writeln!(output, "Turns:          {}", stats.turn_count).unwrap();

    let per_tool: Vec<String> = stats
        .tool_counts
        .iter()
        .map(|(name, count)| format!("{name} {count}"))
        .collect();
    if per_tool.is_empty() {
        writeln!(output, "Tool calls:     {}", stats.tool_calls).unwrap();
    } else {
        writeln!(
            output,
            "Tool calls:     {} ({})",
            stats.tool_calls,
            per_tool.join(", ")
        )
        .unwrap();
    }

    writeln!(output, "Files created:  {}", stats.files_created).unwrap();
    writeln!(output, "Files edited:   {}", stats.files_edited).unwrap();
    writeln!(output, "Files read:     {}", stats.files_read).unwrap();
    writeln!(output, "Commands run:   {}", stats.commands_run).unwrap();
    let t = &stats.tokens;
    writeln!(
        output,
        "Tokens:         {} in, {} out, {} cache read, {} cache create",
        t.input, t.output, t.cache_read, t.cache_create
    )
    .unwrap();

    if warnings.corrupt_lines > 0 {
        writeln!(output, "Warning: {} corrupt lines skipped", warnings.corrupt_lines).unwrap();
    }
    if warnings.truncated_tail {
        writeln!(output, "Warning: truncated final line ignored").unwrap();
    }
}

fn write_turns(output: &mut String, turns: &[Turn]) {
    writeln!(output).unwrap();
    writeln!(output, "TURNS").unwrap();
    writeln!(output, "─────").unwrap();
    if turns.is_empty() {
        writeln!(output, "(no turns)").unwrap();
        return;
    }

    for (i, turn) in turns.iter().enumerate() {
        let when = turn
            .timestamp
            .map(|ts| format!("[{}] ", ts.format("%H:%M:%S")))
            .unwrap_or_default();
        writeln!(output, "{}. {when}{}", i + 1, one_line(&turn.user_message, LINE_CHARS)).unwrap();
        for call in &turn.tool_calls {
            writeln!(output, "   > {}", describe_call(call)).unwrap();
        }
        if !turn.agent_response.trim().is_empty() {
            writeln!(output, "   < {}", one_line(&turn.agent_response, LINE_CHARS)).unwrap();
        }
    }
}

/// Formats a parsed session for humans.
pub fn format_session(session: &ParsedSession, stats_only: bool) -> String {
    let mut output = String::new();
    write_header(&mut output, session);
    write_stats(&mut output, &session.stats, session.warnings);
    if !stats_only {
        write_turns(&mut output, &session.turns);
    }
    output
}

/// Formats a parsed session as JSON.
pub fn format_session_json(session: &ParsedSession, stats_only: bool) -> Result<String> {
    if stats_only {
        let doc = StatsOnly {
            metadata: &session.metadata,
            stats: &session.stats,
            warnings: session.warnings,
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    } else {
        Ok(serde_json::to_string_pretty(session)?)
    }
}

/// Runs the parse command.
pub fn run(path: &Path, stats_only: bool, json: bool) -> Result<()> {
    let session =
        parse_file(path).with_context(|| format!("failed to read session {}", path.display()))?;

    if json {
        println!("{}", format_session_json(&session, stats_only)?);
    } else {
        print!("{}", format_session(&session, stats_only));
    }
    Ok(())
}
