//! Pending-change scan
//!
//! Compares a user's private workspace with the canonical root and lists the
//! files that differ. Used to show what a commit would publish.

use anyhow::Result;
use cowork_core::layout::normalize_path;
use cowork_core::{DirectoryEntity, Entity, FileEntity, UserWorkspace};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present in both trees with different content
    Modified,
    /// Only in the private workspace
    Added,
    /// Only in the canonical root
    Removed,
}

impl ChangeKind {
    pub fn marker(self) -> char {
        match self {
            ChangeKind::Modified => 'M',
            ChangeKind::Added => 'A',
            ChangeKind::Removed => 'D',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChange {
    /// Root-relative `/`-separated path
    pub path: String,
    pub kind: ChangeKind,
}

/// Files whose private version differs from the canonical one, sorted by path
///
/// A user without a private workspace has nothing pending.
pub fn scan(workspace: &UserWorkspace) -> Result<Vec<PendingChange>> {
    if !workspace.exists() {
        return Ok(Vec::new());
    }

    let canonical = files_by_path(&workspace.canonical())?;
    let private = files_by_path(&workspace.directory())?;

    let mut changes = Vec::new();
    for (path, file) in &private {
        let kind = match canonical.get(path) {
            None => Some(ChangeKind::Added),
            Some(original) if differs(file, original)? => Some(ChangeKind::Modified),
            Some(_) => None,
        };
        if let Some(kind) = kind {
            changes.push(PendingChange {
                path: path.clone(),
                kind,
            });
        }
    }
    for path in canonical.keys().filter(|path| !private.contains_key(*path)) {
        changes.push(PendingChange {
            path: path.clone(),
            kind: ChangeKind::Removed,
        });
    }
    changes.sort_by(|a, b| a.path.cmp(&b.path));

    debug!(user = %workspace.user(), pending = changes.len(), "scanned workspace");
    Ok(changes)
}

/// Files of a tree keyed by their canonical relative path
fn files_by_path(dir: &DirectoryEntity) -> Result<BTreeMap<String, FileEntity>> {
    let mut files = BTreeMap::new();
    for entity in dir.content(true)? {
        if let Entity::File(file) = entity {
            let key = normalize_path(file.canonical_version().relative_path())?;
            files.insert(key, file);
        }
    }
    Ok(files)
}

fn differs(a: &FileEntity, b: &FileEntity) -> Result<bool> {
    if a.size() != b.size() {
        return Ok(true);
    }
    Ok(a.read_bytes()? != b.read_bytes()?)
}
