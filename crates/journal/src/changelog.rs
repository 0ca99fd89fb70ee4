//! Changelog store: the live changelog merged with every snapshot changelog
//!
//! The store starts uninitialized. Until a working directory is set, reads
//! return empty results and appends fail. Once set, it holds one live
//! [`ChangelogDocument`] plus the bundles read from snapshots at the last
//! refresh. Snapshot changelogs are re-read only on refresh.

use crate::bundle::{sort_newest_first, SnapshotCommitBundle};
use crate::document::{changelog_path, ChangelogDocument};
use crate::error::Result;
use crate::record::CommitRecord;
use crate::snapshot::discover_bundles;
use cowork_core::layout::{self, normalize_path};
use cowork_core::EntityPath;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Notification sent to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangelogEvent {
    /// A commit was appended; carries the new `modified` timestamp
    Modified { modified: u64 },
    /// The aggregate was rebuilt from disk
    Refreshed { modified: u64 },
}

struct Loaded {
    root: PathBuf,
    live: ChangelogDocument,
    snapshots: Vec<SnapshotCommitBundle>,
}

impl Loaded {
    fn read(root: &Path) -> Result<Self> {
        let live = ChangelogDocument::load_or_create(root)?;
        let snapshots = discover_bundles(root);
        Ok(Self {
            root: root.to_path_buf(),
            live,
            snapshots,
        })
    }

    fn live_bundle(&self) -> SnapshotCommitBundle {
        SnapshotCommitBundle {
            snapshot_path: None,
            modified: self.live.modified,
            commits: self.live.log.clone(),
        }
    }

    /// Snapshot bundles followed by the live bundle
    fn bundles(&self) -> impl Iterator<Item = SnapshotCommitBundle> + '_ {
        self.snapshots
            .iter()
            .cloned()
            .chain(std::iter::once(self.live_bundle()))
    }
}

/// Owner of the live changelog of one canonical root
pub struct ChangelogStore {
    state: RwLock<Option<Loaded>>,
    events: broadcast::Sender<ChangelogEvent>,
}

impl Default for ChangelogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangelogStore {
    /// Uninitialized store
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: RwLock::new(None),
            events,
        }
    }

    /// Store pointed at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new();
        store.set_working_directory(root)?;
        Ok(store)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().is_some()
    }

    pub fn working_directory(&self) -> Option<PathBuf> {
        self.state.read().as_ref().map(|s| s.root.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangelogEvent> {
        self.events.subscribe()
    }

    /// Point the store at `root`, discarding everything loaded before
    ///
    /// On failure the store is left uninitialized.
    pub fn set_working_directory(&self, root: impl Into<PathBuf>) -> Result<()> {
        let root = root.into();
        *self.state.write() = None;
        info!(root = %root.display(), "changelog working directory set");
        self.load(&root)
    }

    /// Re-read the live document and rescan snapshots
    pub fn refresh(&self) -> Result<()> {
        match self.working_directory() {
            Some(root) => self.load(&root),
            None => Ok(()),
        }
    }

    fn load(&self, root: &Path) -> Result<()> {
        let loaded = Loaded::read(root)?;
        let modified = loaded.live.modified;
        debug!(
            root = %root.display(),
            commits = loaded.live.log.len(),
            snapshots = loaded.snapshots.len(),
            "changelog refreshed"
        );
        *self.state.write() = Some(loaded);
        let _ = self.events.send(ChangelogEvent::Refreshed { modified });
        Ok(())
    }

    /// Put the in-memory live document back on disk if its file vanished
    fn ensure_persisted(&self) {
        let state = self.state.read();
        let Some(loaded) = state.as_ref() else {
            return;
        };
        let path = changelog_path(&loaded.root);
        if path.exists() {
            return;
        }
        warn!(path = %path.display(), "live changelog missing, rewriting");
        if let Err(e) = loaded.live.write(&path) {
            warn!(path = %path.display(), error = %e, "failed to rewrite live changelog");
        }
    }

    /// `modified` of the live document, 0 when uninitialized
    pub fn modified_timestamp(&self) -> u64 {
        self.ensure_persisted();
        self.state
            .read()
            .as_ref()
            .map(|s| s.live.modified)
            .unwrap_or(0)
    }

    /// Append a commit to the live log and persist it
    ///
    /// Returns false, leaving memory untouched, when uninitialized or when the
    /// write fails.
    pub fn append_commit(&self, record: CommitRecord) -> bool {
        let mut state = self.state.write();
        let Some(loaded) = state.as_mut() else {
            debug!("append_commit without working directory");
            return false;
        };

        let mut next = loaded.live.clone();
        next.log.push(record);
        next.modified = layout::now_ms().max(loaded.live.modified);

        let path = changelog_path(&loaded.root);
        if let Err(e) = next.write(&path) {
            warn!(path = %path.display(), error = %e, "failed to persist commit");
            return false;
        }

        let modified = next.modified;
        loaded.live = next;
        drop(state);

        let _ = self.events.send(ChangelogEvent::Modified { modified });
        true
    }

    /// Every bundle, newest bundle first, commits newest first
    pub fn all_changes(&self) -> Vec<SnapshotCommitBundle> {
        self.ensure_persisted();
        let state = self.state.read();
        let Some(loaded) = state.as_ref() else {
            return Vec::new();
        };

        let mut bundles: Vec<_> = loaded.bundles().map(|b| b.newest_first(|_| true)).collect();
        sort_newest_first(&mut bundles);
        bundles
    }

    /// Like [`all_changes`](Self::all_changes), restricted to commits touching `path`
    ///
    /// `path` may be root-relative, absolute under the root, or inside a
    /// user's private workspace. Bundles left empty are dropped.
    pub fn changes_for_file(&self, path: &Path) -> Vec<SnapshotCommitBundle> {
        if path.as_os_str().is_empty() {
            return Vec::new();
        }
        self.ensure_persisted();
        let state = self.state.read();
        let Some(loaded) = state.as_ref() else {
            return Vec::new();
        };
        let Some(relative) = relative_key(&loaded.root, path) else {
            return Vec::new();
        };

        let mut bundles: Vec<_> = loaded
            .bundles()
            .map(|b| b.newest_first(|c| c.touches(&relative)))
            .filter(|b| !b.commits.is_empty())
            .collect();
        sort_newest_first(&mut bundles);
        bundles
    }
}

/// Root-relative `/` form of `path` with any user workspace prefix removed
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let entity = EntityPath::from_absolute(root, path)?.canonical_version();
    normalize_path(entity.relative_path())
        .ok()
        .filter(|relative| !relative.is_empty())
}
