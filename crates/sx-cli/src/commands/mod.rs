//! Command implementations.

pub mod cost;
pub mod discover;
pub mod parse;
pub mod search;
pub mod util;
