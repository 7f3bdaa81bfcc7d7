//! `sx discover`: paginated session listing.

use std::fmt::Write;

use anyhow::{Context, Result};
use sx_core::{DiscoverQuery, Discovery, SessionStore, discover};

use super::util::{format_duration, format_timestamp};

/// Max preview characters in the table.
const TABLE_PREVIEW_CHARS: usize = 60;

fn table_cell(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let flat = flat.replace('|', "\\|");
    if flat.chars().count() > max_chars {
        let head: String = flat.chars().take(max_chars - 3).collect();
        format!("{head}...")
    } else {
        flat
    }
}

/// Formats a discovery page as a markdown table.
pub fn format_discovery(discovery: &Discovery, offset: usize) -> String {
    let mut output = String::new();

    if discovery.sessions.is_empty() {
        if discovery.total_count == 0 {
            writeln!(output, "No sessions found.").unwrap();
        } else {
            writeln!(
                output,
                "No sessions at offset {offset} ({} total).",
                discovery.total_count
            )
            .unwrap();
        }
    } else {
        writeln!(output, "| # | Date | Project | Turns | Duration | Preview | Path |").unwrap();
        writeln!(output, "|---|------|---------|-------|----------|---------|------|").unwrap();
        for (i, session) in discovery.sessions.iter().enumerate() {
            writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} |",
                offset + i + 1,
                format_timestamp(session.date),
                table_cell(&session.project_name, TABLE_PREVIEW_CHARS),
                session.turn_count,
                format_duration(session.duration_seconds),
                table_cell(&session.preview, TABLE_PREVIEW_CHARS),
                session.path.display(),
            )
            .unwrap();
        }
        writeln!(output).unwrap();
        writeln!(
            output,
            "Showing {}-{} of {} sessions.",
            offset + 1,
            offset + discovery.sessions.len(),
            discovery.total_count
        )
        .unwrap();
    }

    if discovery.skipped > 0 {
        writeln!(output, "({} unreadable sessions skipped)", discovery.skipped).unwrap();
    }
    output
}

/// Formats a discovery page as JSON.
pub fn format_discovery_json(discovery: &Discovery) -> Result<String> {
    Ok(serde_json::to_string_pretty(discovery)?)
}

/// Runs the discover command.
pub fn run(store: &SessionStore, query: &DiscoverQuery, json: bool) -> Result<()> {
    tracing::debug!(root = ?store.projects_dir(), scope = %query.scope, "listing sessions");
    let discovery = discover(store, query).context("failed to list sessions")?;

    if json {
        println!("{}", format_discovery_json(&discovery)?);
    } else {
        print!("{}", format_discovery(&discovery, query.offset));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use insta::assert_snapshot;
    use std::path::PathBuf;
    use sx_core::SessionSummary;

    fn summary(name: &str, day: u32, preview: &str, turns: usize, duration: i64) -> SessionSummary {
        let date = Utc.with_ymd_and_hms(2026, 1, day, 10, 0, 0).unwrap();
        let path = PathBuf::from(format!("/claude/projects/-home-sami-{name}/{name}.jsonl"));
        SessionSummary {
            session_id: path.display().to_string(),
            path,
            date,
            project: format!("/home/sami/{name}"),
            project_name: name.to_string(),
            preview: preview.to_string(),
            duration_seconds: duration,
            turn_count: turns,
            message_count: turns * 2,
            modified: date,
        }
    }

    #[test]
    fn test_discovery_table() {
        let discovery = Discovery {
            sessions: vec![
                summary("api", 29, "add | pipe\nand newline", 3, 330),
                summary("web", 28, "fix login", 1, 42),
            ],
            total_count: 12,
            skipped: 1,
        };

        let output = format_discovery(&discovery, 10);
        assert_snapshot!(output, @r"
        | # | Date | Project | Turns | Duration | Preview | Path |
        |---|------|---------|-------|----------|---------|------|
        | 11 | 2026-01-29 10:00 | api | 3 | 5m | add \| pipe and newline | /claude/projects/-home-sami-api/api.jsonl |
        | 12 | 2026-01-28 10:00 | web | 1 | 42s | fix login | /claude/projects/-home-sami-web/web.jsonl |

        Showing 11-12 of 12 sessions.
        (1 unreadable sessions skipped)
        ");
    }

    #[test]
    fn test_empty_discovery() {
        let output = format_discovery(&Discovery::default(), 0);
        assert_eq!(output, "No sessions found.\n");

        let past_end = Discovery {
            sessions: vec![],
            total_count: 3,
            skipped: 0,
        };
        assert_eq!(
            format_discovery(&past_end, 20),
            "No sessions at offset 20 (3 total).\n"
        );
    }

    #[test]
    fn test_long_preview_is_shortened() {
        let cell = table_cell(&"x".repeat(100), TABLE_PREVIEW_CHARS);
        assert_eq!(cell.chars().count(), TABLE_PREVIEW_CHARS);
        assert!(cell.ends_with("..."));
    }

    #[test]
    fn test_discovery_json_shape() {
        let discovery = Discovery {
            sessions: vec![summary("api", 29, "hello", 1, 0)],
            total_count: 1,
            skipped: 0,
        };
        let json: serde_json::Value =
            serde_json::from_str(&format_discovery_json(&discovery).unwrap()).unwrap();

        assert_eq!(json["total_count"], 1);
        assert_eq!(json["skipped"], 0);
        assert_eq!(json["sessions"][0]["project_name"], "api");
        assert_eq!(json["sessions"][0]["turn_count"], 1);
        assert_eq!(json["sessions"][0]["date"], "2026-01-29T10:00:00Z");
    }
}
