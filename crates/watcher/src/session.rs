//! Session glue between the changelog store and the maintenance worker
//!
//! A session belongs to one user. It owns the changelog store for the current
//! canonical root, the worker handle and the list of files open for editing,
//! and records a changelog entry for every successful commit.

use crate::open_files::OpenFiles;
use crate::pending::{self, PendingChange};
use crate::worker::{
    ActiveContext, CommitOutcome, MaintenanceReport, WorkerConfig, WorkerEvent, WorkerHandle,
    WorkspaceMaintenanceWorker,
};
use anyhow::{Context, Result};
use cowork_core::{layout, FileEntity, UserWorkspace};
use cowork_journal::{ChangelogEvent, ChangelogStore, CommitRecord, SnapshotCommitBundle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct Session {
    user: String,
    root: PathBuf,
    changelog: Arc<ChangelogStore>,
    worker: WorkerHandle,
    task: JoinHandle<()>,
    relay: JoinHandle<()>,
    open_files: OpenFiles,
}

impl Session {
    /// Open `root` for `user` and start maintaining the user's workspace
    ///
    /// Returns the session together with a receiver for the first
    /// maintenance pass.
    pub async fn open(
        root: impl Into<PathBuf>,
        user: &str,
        config: WorkerConfig,
    ) -> Result<(Self, oneshot::Receiver<Result<MaintenanceReport>>)> {
        let session = Self::start(root.into(), user, config)?;
        let first_pass = session
            .worker
            .activate(ActiveContext::new(&session.root, user))
            .await?;

        info!(root = %session.root.display(), user, "session opened");
        Ok((session, first_pass))
    }

    /// Open `root` for `user` without maintaining the private workspace
    ///
    /// For one-shot commits: no tree copy or snapshot is ever started, so the
    /// workspace must already exist for a commit to succeed.
    pub async fn attach(root: impl Into<PathBuf>, user: &str, config: WorkerConfig) -> Result<Self> {
        let session = Self::start(root.into(), user, config)?;
        session
            .worker
            .attach(ActiveContext::new(&session.root, user))
            .await?;

        info!(root = %session.root.display(), user, "session attached");
        Ok(session)
    }

    fn start(root: PathBuf, user: &str, config: WorkerConfig) -> Result<Self> {
        layout::validate_username(user)?;
        let changelog = Arc::new(
            ChangelogStore::open(&root)
                .with_context(|| format!("Failed to open changelog of {}", root.display()))?,
        );

        let (worker, task) = WorkspaceMaintenanceWorker::spawn(config);
        let relay = tokio::spawn(refresh_on_snapshot(worker.subscribe(), changelog.clone()));
        Ok(Self {
            user: user.to_string(),
            root,
            changelog,
            worker,
            task,
            relay,
            open_files: OpenFiles::new(),
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn changelog(&self) -> &Arc<ChangelogStore> {
        &self.changelog
    }

    pub fn worker(&self) -> &WorkerHandle {
        &self.worker
    }

    pub fn workspace(&self) -> Result<UserWorkspace> {
        Ok(UserWorkspace::new(&self.root, &self.user)?)
    }

    /// Switch to another canonical root
    pub async fn set_working_directory(
        &mut self,
        root: impl Into<PathBuf>,
    ) -> Result<oneshot::Receiver<Result<MaintenanceReport>>> {
        let root = root.into();
        self.changelog
            .set_working_directory(&root)
            .with_context(|| format!("Failed to open changelog of {}", root.display()))?;
        let first_pass = self
            .worker
            .activate(ActiveContext::new(&root, &self.user))
            .await?;
        self.root = root;
        self.open_files.close_all();
        Ok(first_pass)
    }

    pub fn open_files(&self) -> &OpenFiles {
        &self.open_files
    }

    /// Open `path` for editing and return the user's version of it
    ///
    /// The open-file list tracks the root-relative canonical path; a preview
    /// (`permanent == false`) replaces the other previews.
    pub fn open_file(&mut self, path: &Path, permanent: bool) -> Result<FileEntity> {
        let canonical = self.workspace()?.resolve(path)?;
        self.open_files.open(canonical.path().relative_path(), permanent);
        Ok(canonical.user_version(&self.user))
    }

    /// Keep an opened preview open when another file is opened
    pub fn pin_file(&mut self, path: &Path) -> Result<bool> {
        let canonical = self.workspace()?.resolve(path)?;
        Ok(self.open_files.pin(canonical.path().relative_path()))
    }

    /// Close `path`; false if it was not open
    pub fn close_file(&mut self, path: &Path) -> Result<bool> {
        let canonical = self.workspace()?.resolve(path)?;
        Ok(self.open_files.close(canonical.path().relative_path()))
    }

    /// Publish the user's versions of `paths` and record the commit
    ///
    /// The changelog entry lists every committed file and is only written
    /// when the whole request succeeded.
    pub async fn commit(&self, paths: Vec<PathBuf>) -> Result<CommitOutcome> {
        let mut outcome = self.worker.commit(paths).await?;
        if !outcome.success() || outcome.committed.is_empty() {
            return Ok(outcome);
        }

        let record = CommitRecord::new(&self.user, &outcome.committed);
        if !self.changelog.append_commit(record) {
            warn!(user = %self.user, "files committed but changelog was not updated");
            outcome.failure = Some("files committed but the changelog could not be written".into());
        }
        Ok(outcome)
    }

    pub fn all_changes(&self) -> Vec<SnapshotCommitBundle> {
        self.changelog.all_changes()
    }

    pub fn changes_for_file(&self, path: &Path) -> Vec<SnapshotCommitBundle> {
        self.changelog.changes_for_file(path)
    }

    pub fn modified_timestamp(&self) -> u64 {
        self.changelog.modified_timestamp()
    }

    /// Files whose private version differs from the canonical one
    pub async fn pending_changes(&self) -> Result<Vec<PendingChange>> {
        let workspace = self.workspace()?;
        tokio::task::spawn_blocking(move || pending::scan(&workspace))
            .await
            .context("pending scan task panicked")?
    }

    pub fn subscribe_changelog(&self) -> broadcast::Receiver<ChangelogEvent> {
        self.changelog.subscribe()
    }

    pub fn subscribe_worker(&self) -> broadcast::Receiver<WorkerEvent> {
        self.worker.subscribe()
    }

    /// Stop the worker and wait for it to finish
    pub async fn close(self) -> Result<()> {
        self.worker.shutdown().await?;
        self.task.await.context("maintenance worker panicked")?;
        self.relay.abort();
        Ok(())
    }
}

/// Reload snapshot changelogs whenever the worker freezes a new snapshot
async fn refresh_on_snapshot(
    mut events: broadcast::Receiver<WorkerEvent>,
    changelog: Arc<ChangelogStore>,
) {
    loop {
        match events.recv().await {
            Ok(WorkerEvent::SnapshotCreated { path }) => {
                if let Err(e) = changelog.refresh() {
                    warn!(snapshot = %path.display(), error = %e, "failed to reload changelog");
                }
            }
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
