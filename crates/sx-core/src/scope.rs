//! Session scope: which project directories an operation looks at.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Breadth of session files considered by discovery and search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Sessions recorded in the current working directory only.
    Project,
    /// Sessions recorded in the parent of the current working directory.
    Parent,
    /// Sessions recorded in any directory below the current working directory.
    Children,
    /// Every project under the Claude projects root.
    #[default]
    All,
}

impl Scope {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Parent => "parent",
            Self::Children => "children",
            Self::All => "all",
        }
    }

    /// Whether resolving this scope depends on the working directory.
    #[must_use]
    pub const fn needs_cwd(&self) -> bool {
        !matches!(self, Self::All)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = InvalidScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(Self::Project),
            "parent" => Ok(Self::Parent),
            "children" => Ok(Self::Children),
            "all" | "personal" => Ok(Self::All),
            _ => Err(InvalidScope(s.to_string())),
        }
    }
}

impl Serialize for Scope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error for unrecognized scope strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid scope: {0} (expected project, parent, children, personal or all)")]
pub struct InvalidScope(pub String);
