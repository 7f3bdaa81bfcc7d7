//! Core engine for exploring Claude Code session logs.
//!
//! This crate contains the fundamental types and logic for:
//! - Locating session files by scope and date range
//! - Streaming session logs into typed records, tolerating damaged lines
//! - Parsing sessions into turns, tool calls and token usage
//! - Discovery listings, full-text search and cost estimates

pub mod cost;
pub mod discover;
pub mod parser;
pub mod reader;
pub mod record;
pub mod scope;
pub mod search;
pub mod store;
pub mod summary;

pub use cost::{CostBreakdown, PricingTable, estimate};
pub use discover::{DiscoverQuery, Discovery, discover};
pub use parser::{
    ParsedSession, SessionMetadata, SessionParser, SessionStats, ToolCategory, Turn, TurnToolCall,
    parse, parse_file,
};
pub use reader::{LogReader, ReadError, ReadWarnings};
pub use record::{Record, RecordKind, Role, SessionHeader, TokenStats};
pub use scope::{InvalidScope, Scope};
pub use search::{SearchError, SearchMatch, SearchQuery, SearchResults, search};
pub use store::{LocateError, Located, SessionFile, SessionStore};
pub use summary::{SessionSummary, summarize};
