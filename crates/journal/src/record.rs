//! Commit records

use cowork_core::layout::{self, normalize_path};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// One file touched by a commit
///
/// Fields other than `path` are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedFile {
    /// Root-relative path in `/` form
    pub path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommittedFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extra: Map::new(),
        }
    }

    /// Compare against a normalized root-relative path
    pub fn matches(&self, relative: &str) -> bool {
        self.path == relative
            || normalize_path(Path::new(&self.path))
                .map(|p| p == relative)
                .unwrap_or(false)
    }
}

/// One logical commit: files changed together by one user at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub user: String,
    /// Unix milliseconds
    pub modified: u64,
    pub files: Vec<CommittedFile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommitRecord {
    /// New record stamped with the current time
    pub fn new<I, S>(user: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::at(user, layout::now_ms(), paths)
    }

    pub fn at<I, S>(user: impl Into<String>, modified: u64, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user: user.into(),
            modified,
            files: paths.into_iter().map(CommittedFile::new).collect(),
            extra: Map::new(),
        }
    }

    /// Whether this commit changed the given root-relative path
    pub fn touches(&self, relative: &str) -> bool {
        self.files.iter().any(|f| f.matches(relative))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }
}
