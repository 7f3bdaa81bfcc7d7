//! `sx search`: full-text search over sessions.

use std::fmt::Write;

use anyhow::{Context, Result};
use sx_core::{SearchQuery, SearchResults, SessionStore, search};

use super::util::format_timestamp;

/// Formats search results as a numbered list.
pub fn format_results(results: &SearchResults) -> String {
    let mut output = String::new();

    if results.matches.is_empty() {
        writeln!(
            output,
            "No matches for \"{}\" in {} sessions.",
            results.query, results.sessions_scanned
        )
        .unwrap();
    } else {
        writeln!(
            output,
            "{} matches for \"{}\" in {} of {} sessions.",
            results.matches.len(),
            results.query,
            results.sessions_matched,
            results.sessions_scanned
        )
        .unwrap();

        for (i, m) in results.matches.iter().enumerate() {
            let when = m.timestamp.unwrap_or(m.session_date);
            writeln!(output).unwrap();
            writeln!(
                output,
                "{}. {} | {} | {} | score {}",
                i + 1,
                m.project_name,
                format_timestamp(when),
                m.role,
                m.score
            )
            .unwrap();
            writeln!(output, "   {}", m.snippet.trim()).unwrap();
            writeln!(output, "   {}:{}", m.session_id, m.matched_line_index + 1).unwrap();
        }
    }

    if results.skipped > 0 {
        writeln!(output).unwrap();
        writeln!(output, "({} unreadable sessions skipped)", results.skipped).unwrap();
    }
    output
}

/// Formats search results as JSON.
pub fn format_results_json(results: &SearchResults) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Runs the search command.
pub fn run(store: &SessionStore, query: &SearchQuery, json: bool) -> Result<()> {
    tracing::debug!(root = ?store.projects_dir(), scope = %query.scope, "searching sessions");
    let results = search(store, query).context("search failed")?;

    if json {
        println!("{}", format_results_json(&results)?);
    } else {
        print!("{}", format_results(&results));
    }
    Ok(())
}
