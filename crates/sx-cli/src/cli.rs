//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sx_core::Scope;

/// Explore Claude Code sessions.
///
/// Lists, searches and parses the session logs Claude Code writes under
/// `~/.claude/projects`, and estimates what they cost.
#[derive(Debug, Parser)]
#[command(name = "sx", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List sessions, newest first.
    Discover {
        /// Which sessions to consider: project, parent, children, personal or all.
        #[arg(long, default_value_t = Scope::All)]
        scope: Scope,

        /// Directory scopes are resolved against (defaults to the current directory).
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Maximum sessions to show; 0 shows all.
        #[arg(long)]
        limit: Option<usize>,

        /// Sessions to skip before the first one shown.
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Only sessions started at or after this date (e.g. 2026-01-15, yesterday, "3 days ago").
        #[arg(long)]
        after: Option<String>,

        /// Only sessions started at or before this date.
        #[arg(long)]
        before: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search session text.
    Search {
        /// Text to find (case-insensitive, matched as one phrase).
        query: String,

        /// Which sessions to consider: project, parent, children, personal or all.
        #[arg(long, default_value_t = Scope::All)]
        scope: Scope,

        /// Directory scopes are resolved against (defaults to the current directory).
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Only sessions started at or after this date.
        #[arg(long)]
        after: Option<String>,

        /// Only sessions started at or before this date.
        #[arg(long)]
        before: Option<String>,

        /// Maximum matches to show; 0 shows all.
        #[arg(long)]
        limit: Option<usize>,

        /// Maximum matches per session; 0 shows all.
        #[arg(long)]
        per_session: Option<usize>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Parse one session into turns and statistics.
    Parse {
        /// Session file.
        path: PathBuf,

        /// Only show metadata and statistics.
        #[arg(long)]
        stats_only: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Estimate what a session cost.
    Cost {
        /// Session file.
        path: PathBuf,

        /// Pricing table to use (defaults to the configured model).
        #[arg(long)]
        model: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
