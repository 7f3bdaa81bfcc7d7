use anyhow::{Context, Result};
use clap::Parser;
use sx_core::{DiscoverQuery, SearchQuery};
use tracing_subscriber::EnvFilter;

use sx_cli::commands::{cost, discover, parse, search, util};
use sx_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so JSON on stdout stays clean
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Commands::Discover {
            scope,
            cwd,
            limit,
            offset,
            after,
            before,
            json,
        }) => {
            let (after, before) = util::parse_range(after.as_deref(), before.as_deref())?;
            let query = DiscoverQuery {
                scope,
                cwd: util::resolve_cwd(scope, cwd)?,
                limit: limit.unwrap_or(config.default_limit),
                offset,
                after,
                before,
            };
            discover::run(&config.store(), &query, json)?;
        }
        Some(Commands::Search {
            query,
            scope,
            cwd,
            after,
            before,
            limit,
            per_session,
            json,
        }) => {
            let (after, before) = util::parse_range(after.as_deref(), before.as_deref())?;
            let query = SearchQuery {
                query,
                scope,
                cwd: util::resolve_cwd(scope, cwd)?,
                after,
                before,
                limit: limit.unwrap_or(config.default_limit),
                per_session: per_session.unwrap_or(config.per_session_matches),
                snippet_width: config.snippet_width,
            };
            search::run(&config.store(), &query, json)?;
        }
        Some(Commands::Parse {
            path,
            stats_only,
            json,
        }) => {
            parse::run(&path, stats_only, json)?;
        }
        Some(Commands::Cost { path, model, json }) => {
            cost::run(&config, &path, model.as_deref(), json)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
