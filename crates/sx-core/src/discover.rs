//! Paginated, newest-first session listings.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::scope::Scope;
use crate::store::{LocateError, SessionStore};
use crate::summary::{SessionSummary, summarize};

/// Default page size.
pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverQuery {
    pub scope: Scope,
    pub cwd: PathBuf,
    /// Page size; 0 means no bound.
    pub limit: usize,
    pub offset: usize,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

impl DiscoverQuery {
    pub fn new(scope: Scope, cwd: impl Into<PathBuf>) -> Self {
        Self {
            scope,
            cwd: cwd.into(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            after: None,
            before: None,
        }
    }
}

/// One page of sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    pub sessions: Vec<SessionSummary>,
    /// Size of the whole filtered set, not just this page.
    pub total_count: usize,
    pub skipped: usize,
}

pub fn discover(store: &SessionStore, query: &DiscoverQuery) -> Result<Discovery, LocateError> {
    let located = store.locate(query.scope, &query.cwd, query.after, query.before)?;
    let mut skipped = located.skipped;

    let results: Vec<_> = located
        .files
        .par_iter()
        .map(|file| (file, summarize(file)))
        .collect();

    let mut sessions = Vec::with_capacity(results.len());
    for (file, result) in results {
        match result {
            Ok(summary) => sessions.push(summary),
            Err(e) => {
                tracing::warn!(path = ?file.path, error = %e, "skipping unreadable session");
                skipped += 1;
            }
        }
    }

    sessions.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.path.cmp(&b.path)));
    let total_count = sessions.len();

    let limit = if query.limit == 0 { usize::MAX } else { query.limit };
    let sessions = sessions
        .into_iter()
        .skip(query.offset)
        .take(limit)
        .collect();

    Ok(Discovery {
        sessions,
        total_count,
        skipped,
    })
}
