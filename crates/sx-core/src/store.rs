//! Locating session files on disk.
//!
//! Claude Code keeps one directory per working directory under
//! `~/.claude/projects`, named after the absolute path with separators
//! replaced by dashes (`/home/sami/project` becomes `-home-sami-project`).
//! Each top-level `*.jsonl` file in such a directory is one session.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reader::{ReadError, read_start_time};
use crate::scope::Scope;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("failed to read projects directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A candidate session log and what can be known about it without parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFile {
    pub path: PathBuf,
    /// The Claude project directory containing the file.
    pub project_dir: PathBuf,
    /// Working directory reconstructed from the project directory name.
    ///
    /// Lossy: dashes in the original path cannot be told apart from separators.
    pub project_path: String,
    /// First record timestamp, or the modification time when the log has none.
    pub start_time: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

impl SessionFile {
    /// Session id: the file path, which is unique and stable.
    pub fn id(&self) -> String {
        self.path.display().to_string()
    }
}

/// Files found for a scope, plus how many candidates could not be read.
#[derive(Debug, Default)]
pub struct Located {
    pub files: Vec<SessionFile>,
    pub skipped: usize,
}

/// Encode a working directory the way Claude names its project directories.
pub fn encode_project_dir(cwd: &str) -> String {
    cwd.chars()
        .map(|c| if c == '/' || c == '\\' || c == '.' { '-' } else { c })
        .collect()
}

/// Best-effort inverse of [`encode_project_dir`].
pub fn decode_project_dir(name: &str) -> String {
    let trimmed = name.strip_prefix('-').unwrap_or(name);
    format!("/{}", trimmed.replace('-', "/"))
}

/// Extract project name from path.
pub fn extract_project_name(path: &str) -> String {
    Path::new(path.trim_end_matches('/'))
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Whether a file looks like a top-level user session log.
fn is_session_log(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    path.extension().is_some_and(|e| e == "jsonl")
        && !name.starts_with("agent-")
        && !name.to_lowercase().contains("warmup")
}

/// Root of the Claude project directories and the rules for picking sessions in it.
#[derive(Debug, Clone)]
pub struct SessionStore {
    projects_dir: PathBuf,
    min_file_size: u64,
}

impl SessionStore {
    pub fn new(projects_dir: impl Into<PathBuf>) -> Self {
        Self {
            projects_dir: projects_dir.into(),
            min_file_size: 0,
        }
    }

    /// Ignore session files smaller than `bytes` (aborted or empty sessions).
    #[must_use]
    pub const fn with_min_file_size(mut self, bytes: u64) -> Self {
        self.min_file_size = bytes;
        self
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// Project directories covered by `scope`, relative to `cwd`.
    ///
    /// A missing projects root yields no directories.
    pub fn project_dirs(&self, scope: Scope, cwd: &Path) -> Result<Vec<PathBuf>, LocateError> {
        if !self.projects_dir.is_dir() {
            tracing::debug!(path = ?self.projects_dir, "projects directory does not exist");
            return Ok(Vec::new());
        }

        let dirs = match scope {
            Scope::Project => self.existing_dir(&cwd.to_string_lossy()),
            Scope::Parent => cwd
                .parent()
                .map(|p| self.existing_dir(&p.to_string_lossy()))
                .unwrap_or_default(),
            Scope::Children => {
                let prefix = format!("{}-", encode_project_dir(&cwd.to_string_lossy()));
                self.all_dirs()?
                    .into_iter()
                    .filter(|d| {
                        d.file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| n.starts_with(&prefix))
                    })
                    .collect()
            }
            Scope::All => self.all_dirs()?,
        };
        Ok(dirs)
    }

    fn existing_dir(&self, cwd: &str) -> Vec<PathBuf> {
        let dir = self.projects_dir.join(encode_project_dir(cwd));
        if dir.is_dir() { vec![dir] } else { Vec::new() }
    }

    fn all_dirs(&self) -> Result<Vec<PathBuf>, LocateError> {
        let entries = fs::read_dir(&self.projects_dir).map_err(|source| LocateError::Io {
            path: self.projects_dir.clone(),
            source,
        })?;

        let mut dirs: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        Ok(dirs)
    }

    /// Resolve a scope to session files whose start time lies in `[after, before]`.
    ///
    /// Unreadable candidates are skipped and counted, never fatal.
    pub fn locate(
        &self,
        scope: Scope,
        cwd: &Path,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    ) -> Result<Located, LocateError> {
        let mut candidates: Vec<(PathBuf, PathBuf)> = Vec::new();
        let mut skipped = 0usize;

        for project_dir in self.project_dirs(scope, cwd)? {
            let entries = match fs::read_dir(&project_dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = ?project_dir, error = %e, "skipping unreadable project directory");
                    skipped += 1;
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() && is_session_log(&path) {
                    candidates.push((path, project_dir.clone()));
                }
            }
        }

        let results: Vec<(&PathBuf, Result<Option<SessionFile>, ReadError>)> = candidates
            .par_iter()
            .map(|(path, project_dir)| (path, self.describe(path, project_dir)))
            .collect();

        let mut files = Vec::new();
        for (path, result) in results {
            match result {
                Ok(Some(file)) => {
                    let in_range = after.is_none_or(|a| file.start_time >= a)
                        && before.is_none_or(|b| file.start_time <= b);
                    if in_range {
                        files.push(file);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "skipping unreadable session");
                    skipped += 1;
                }
            }
        }

        tracing::debug!(scope = %scope, found = files.len(), skipped, "located sessions");
        Ok(Located { files, skipped })
    }

    /// Stat and date one candidate. `Ok(None)` means it is filtered out by size.
    fn describe(
        &self,
        path: &Path,
        project_dir: &Path,
    ) -> Result<Option<SessionFile>, ReadError> {
        let metadata = fs::metadata(path)?;
        if metadata.len() < self.min_file_size {
            return Ok(None);
        }

        let modified: DateTime<Utc> = metadata.modified()?.into();
        let start_time = read_start_time(path)?.unwrap_or(modified);
        let project_path = project_dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(decode_project_dir)
            .unwrap_or_default();

        Ok(Some(SessionFile {
            path: path.to_path_buf(),
            project_dir: project_dir.to_path_buf(),
            project_path,
            start_time,
            modified,
            size: metadata.len(),
        }))
    }
}
