//! Immutable snapshots of a canonical root
//!
//! A snapshot lives in `.snapshots/<created-ms>-<user>/` and holds a copy of
//! the visible tree plus a frozen copy of the live changelog. It is built in a
//! staging directory and renamed into place, and never written again.

use crate::bundle::SnapshotCommitBundle;
use crate::document::{changelog_path, ChangelogDocument};
use crate::error::Result;
use cowork_core::layout::{self, is_hidden, SNAPSHOTS_DIR, STAGING_PREFIX};
use cowork_core::{mirror_tree, CancelFlag, CoreError, DirectoryEntity};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{info, warn};

/// Snapshot slot keyed by `(root, user)`
#[derive(Debug, Clone)]
pub struct Snapshot {
    root: PathBuf,
    user: String,
}

/// An existing snapshot directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub id: String,
    pub user: String,
    /// Unix milliseconds
    pub created: u64,
    pub path: PathBuf,
}

/// Directory holding all snapshots of `root`
pub fn snapshots_dir(root: &Path) -> PathBuf {
    root.join(SNAPSHOTS_DIR)
}

/// Split a snapshot id into creation time and user
pub fn parse_id(id: &str) -> Option<(u64, &str)> {
    let (created, user) = id.split_once('-')?;
    if user.is_empty() {
        return None;
    }
    Some((created.parse().ok()?, user))
}

impl Snapshot {
    pub fn new(root: impl Into<PathBuf>, user: &str) -> Result<Self> {
        layout::validate_username(user)?;
        Ok(Self {
            root: root.into(),
            user: user.to_string(),
        })
    }

    /// Existing snapshot for this key, if any
    pub fn find(&self) -> Option<SnapshotInfo> {
        Self::list(&self.root)
            .into_iter()
            .find(|info| info.user == self.user)
    }

    pub fn exists(&self) -> bool {
        self.find().is_some()
    }

    /// Freeze the canonical tree and the live changelog as of now
    pub fn make(&self) -> Result<SnapshotInfo> {
        let live = ChangelogDocument::load_or_create(&self.root)?;
        let created = layout::now_ms();
        let id = format!("{created}-{}", self.user);
        let dir = snapshots_dir(&self.root);
        let staging = dir.join(format!("{STAGING_PREFIX}{id}"));
        let target = dir.join(&id);

        info!(snapshot = %id, root = %self.root.display(), "creating snapshot");
        let built = mirror_tree(
            &DirectoryEntity::at_root(&self.root),
            &staging,
            &mut |_| {},
            &CancelFlag::new(),
        )
        .map_err(Into::into)
        .and_then(|_| {
            let frozen = ChangelogDocument {
                created,
                directory: self.root.display().to_string(),
                modified: created,
                log: live.log,
            };
            frozen.write(&changelog_path(&staging))
        });
        if let Err(e) = built {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        fs::rename(&staging, &target).map_err(|e| CoreError::io(&target, e))?;
        Ok(SnapshotInfo {
            id,
            user: self.user.clone(),
            created,
            path: target,
        })
    }

    /// All snapshots of `root`, oldest first
    pub fn list(root: &Path) -> Vec<SnapshotInfo> {
        let Ok(entries) = fs::read_dir(snapshots_dir(root)) else {
            return Vec::new();
        };

        let mut snapshots: Vec<SnapshotInfo> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| {
                let id = entry.file_name().to_str()?.to_string();
                if is_hidden(&id) {
                    return None;
                }
                let (created, user) = parse_id(&id)?;
                Some(SnapshotInfo {
                    user: user.to_string(),
                    created,
                    path: entry.path(),
                    id,
                })
            })
            .collect();
        snapshots.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        snapshots
    }
}

/// Read every snapshot changelog of `root` into commit bundles
///
/// Bundle `modified` is the snapshot changelog's mtime. Folders without a
/// changelog are skipped, malformed ones are skipped with a warning.
pub fn discover_bundles(root: &Path) -> Vec<SnapshotCommitBundle> {
    let Ok(entries) = fs::read_dir(snapshots_dir(root)) else {
        return Vec::new();
    };

    let mut folders: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| !is_hidden(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    folders.sort();

    let mut bundles = Vec::with_capacity(folders.len());
    for folder in folders {
        let path = changelog_path(&folder);
        if !path.exists() {
            continue;
        }
        let document = match ChangelogDocument::read(&path) {
            Ok(Some(document)) => document,
            Ok(None) => {
                warn!(path = %path.display(), "skipping malformed snapshot changelog");
                continue;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable snapshot changelog");
                continue;
            }
        };
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(document.modified);
        bundles.push(SnapshotCommitBundle {
            snapshot_path: Some(folder),
            modified,
            commits: document.log,
        });
    }
    bundles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CommitRecord;
    use tempfile::TempDir;

    fn canonical_root() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("cfg")).unwrap();
        fs::write(root.join("a.yaml"), b"a").unwrap();
        fs::write(root.join("cfg/b.yaml"), b"b").unwrap();
        fs::create_dir_all(root.join(".users/alice")).unwrap();
        fs::write(root.join(".users/alice/a.yaml"), b"private").unwrap();
        temp_dir
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("1700-alice"), Some((1700, "alice")));
        assert_eq!(parse_id("1700-bob-smith"), Some((1700, "bob-smith")));
        assert_eq!(parse_id("alice"), None);
        assert_eq!(parse_id("x-alice"), None);
        assert_eq!(parse_id("1700-"), None);
    }

    #[test]
    fn test_make_copies_tree_and_changelog() {
        let temp_dir = canonical_root();
        let root = temp_dir.path();
        let mut live = ChangelogDocument::fresh(root);
        live.log.push(CommitRecord::at("bob", 5, ["a.yaml"]));
        live.write(&changelog_path(root)).unwrap();

        let snapshot = Snapshot::new(root, "alice").unwrap();
        assert!(!snapshot.exists());
        let info = snapshot.make().unwrap();

        assert!(snapshot.exists());
        assert_eq!(snapshot.find(), Some(info.clone()));
        assert_eq!(fs::read(info.path.join("cfg/b.yaml")).unwrap(), b"b");
        assert!(!info.path.join(".users").exists());
        let frozen = ChangelogDocument::read(&changelog_path(&info.path)).unwrap().unwrap();
        assert_eq!(frozen.log, live.log);

        // Keyed per user
        assert!(!Snapshot::new(root, "bob").unwrap().exists());
    }

    #[test]
    fn test_discover_skips_incomplete_folders() {
        let temp_dir = canonical_root();
        let root = temp_dir.path();
        Snapshot::new(root, "alice").unwrap().make().unwrap();
        fs::create_dir_all(snapshots_dir(root).join("99-nochangelog")).unwrap();
        fs::create_dir_all(snapshots_dir(root).join("98-broken")).unwrap();
        fs::write(snapshots_dir(root).join("98-broken/.changelog"), b"[]").unwrap();
        fs::create_dir_all(snapshots_dir(root).join(".staging-97-x")).unwrap();
        fs::write(snapshots_dir(root).join(".staging-97-x/.changelog"), b"{}").unwrap();

        let bundles = discover_bundles(root);

        assert_eq!(bundles.len(), 1);
        assert!(!bundles[0].is_live());
    }
}
