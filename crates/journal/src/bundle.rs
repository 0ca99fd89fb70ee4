//! Per-source commit bundles returned by history queries

use crate::record::CommitRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Commits from one changelog source
///
/// `snapshot_path == None` marks the live changelog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCommitBundle {
    pub snapshot_path: Option<PathBuf>,
    /// Unix milliseconds
    pub modified: u64,
    pub commits: Vec<CommitRecord>,
}

impl SnapshotCommitBundle {
    pub fn is_live(&self) -> bool {
        self.snapshot_path.is_none()
    }

    /// Copy with commits newest-first, keeping only those `keep` accepts
    pub(crate) fn newest_first(&self, keep: impl Fn(&CommitRecord) -> bool) -> Self {
        Self {
            snapshot_path: self.snapshot_path.clone(),
            modified: self.modified,
            commits: self.commits.iter().rev().filter(|c| keep(c)).cloned().collect(),
        }
    }
}

/// Sort bundles by `modified`, newest first; ties keep their order
pub(crate) fn sort_newest_first(bundles: &mut [SnapshotCommitBundle]) {
    bundles.sort_by(|a, b| b.modified.cmp(&a.modified));
}
