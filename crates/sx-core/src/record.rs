//! Decoded session log records.

use std::ops::{Add, AddAssign};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token usage totals.
///
/// The field names are part of the JSON output contract and must not change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStats {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_create: u64,
}

impl TokenStats {
    #[must_use]
    pub const fn new(input: u64, output: u64, cache_read: u64, cache_create: u64) -> Self {
        Self {
            input,
            output,
            cache_read,
            cache_create,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.input
            .saturating_add(self.output)
            .saturating_add(self.cache_read)
            .saturating_add(self.cache_create)
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

impl Add for TokenStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            input: self.input.saturating_add(rhs.input),
            output: self.output.saturating_add(rhs.output),
            cache_read: self.cache_read.saturating_add(rhs.cache_read),
            cache_create: self.cache_create.saturating_add(rhs.cache_create),
        }
    }
}

impl AddAssign for TokenStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for TokenStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Who produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged event, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 0-based line index of the log line this record was decoded from.
    pub line: usize,
    pub timestamp: Option<DateTime<Utc>>,
    pub kind: RecordKind,
}

/// The closed set of record variants a session log can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKind {
    UserMessage {
        text: String,
        cwd: Option<String>,
    },
    AgentMessage {
        /// Visible text; empty for tool-only responses.
        text: String,
        model: Option<String>,
        usage: TokenStats,
    },
    ToolCall {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
        usage: TokenStats,
    },
}

impl Record {
    #[must_use]
    pub const fn role(&self) -> Role {
        match self.kind {
            RecordKind::UserMessage { .. } => Role::User,
            RecordKind::AgentMessage { .. } => Role::Assistant,
            RecordKind::ToolCall { .. } | RecordKind::ToolResult { .. } => Role::Tool,
        }
    }

    /// Usage annotation carried by this record, zero if none.
    #[must_use]
    pub fn usage(&self) -> TokenStats {
        match &self.kind {
            RecordKind::AgentMessage { usage, .. } | RecordKind::ToolResult { usage, .. } => *usage,
            RecordKind::UserMessage { .. } | RecordKind::ToolCall { .. } => TokenStats::default(),
        }
    }

    #[must_use]
    pub const fn is_user_message(&self) -> bool {
        matches!(self.kind, RecordKind::UserMessage { .. })
    }
}

/// Session-level fields taken from the first log line that carries each one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub version: Option<String>,
    pub git_branch: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_stats_add_and_sum() {
        let a = TokenStats::new(10, 20, 30, 40);
        let b = TokenStats::new(1, 2, 3, 4);
        assert_eq!(a + b, TokenStats::new(11, 22, 33, 44));

        let mut c = a;
        c += b;
        assert_eq!(c, a + b);

        let total: TokenStats = [a, b, b].into_iter().sum();
        assert_eq!(total, TokenStats::new(12, 24, 36, 48));
        assert_eq!(total.total(), 120);
    }

    #[test]
    fn token_stats_field_names_are_stable() {
        let json = serde_json::to_value(TokenStats::new(1, 2, 3, 4)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"input": 1, "output": 2, "cache_read": 3, "cache_create": 4})
        );
    }

    #[test]
    fn role_follows_variant() {
        let record = Record {
            line: 0,
            timestamp: None,
            kind: RecordKind::ToolCall {
                id: "t1".to_string(),
                name: "Bash".to_string(),
                input: Value::Null,
            },
        };
        assert_eq!(record.role(), Role::Tool);
        assert!(record.usage().is_zero());
        assert!(!record.is_user_message());
    }
}
