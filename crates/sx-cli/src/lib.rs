//! Session explorer CLI library.
//!
//! This crate provides the `sx` command-line interface over `sx-core`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
