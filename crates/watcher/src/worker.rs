//! Background workspace maintenance
//!
//! One worker task runs per open canonical root. The interactive layer talks to
//! it only through messages: commands go in over an mpsc channel, progress and
//! completion come back on a broadcast channel, and replies travel on oneshot
//! channels the caller may await or drop.
//!
//! Maintenance (ensure the private workspace, ensure a snapshot) runs on its
//! own task so commits are never queued behind a long copy. Switching context
//! or shutting down cancels a running copy between files. A worker can also be
//! attached to a context without maintaining it, for one-shot commits.

use anyhow::{anyhow, Context, Result};
use cowork_core::{CancelFlag, CoreError, EnsureOutcome, UserWorkspace};
use cowork_journal::Snapshot;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Worker tuning
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Period of the self-healing re-check (default: 3s)
    pub recheck_interval: Duration,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
    /// Capacity of the command queue
    pub command_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            recheck_interval: Duration::from_secs(3),
            event_capacity: 256,
            command_capacity: 32,
        }
    }
}

/// The root and user the worker currently maintains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveContext {
    pub root: PathBuf,
    pub user: String,
}

impl ActiveContext {
    pub fn new(root: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            user: user.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStatus {
    InProgress,
    Finished,
}

/// Events published by the worker
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Fraction of the private workspace copy completed
    CopyProgress { progress: f64, status: CopyStatus },
    /// The private workspace exists; `created` is true if it was just copied
    WorkspaceReady { user: String, created: bool },
    SnapshotCreated { path: PathBuf },
    /// Files of a commit request were copied to the canonical root
    CommitFinished { success: bool },
    /// A maintenance pass failed; it is retried on the next tick
    Failed { message: String },
}

/// Result of one maintenance pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub workspace: EnsureOutcome,
    /// Path of the snapshot created in this pass, if any
    pub snapshot: Option<PathBuf>,
}

/// Result of a commit request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Root-relative paths copied to the canonical root
    pub committed: Vec<String>,
    /// Human-readable reason the commit stopped, if it did
    pub failure: Option<String>,
}

impl CommitOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            committed: Vec::new(),
            failure: Some(message.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

type MaintenanceReply = oneshot::Sender<Result<MaintenanceReport>>;

enum WorkerCommand {
    Activate {
        context: ActiveContext,
        reply: MaintenanceReply,
    },
    Attach {
        context: ActiveContext,
        reply: oneshot::Sender<Result<()>>,
    },
    Commit {
        paths: Vec<PathBuf>,
        reply: oneshot::Sender<CommitOutcome>,
    },
    Shutdown,
}

/// Cloneable handle used by the interactive layer
#[derive(Clone)]
pub struct WorkerHandle {
    commands: mpsc::Sender<WorkerCommand>,
    events: broadcast::Sender<WorkerEvent>,
}

impl WorkerHandle {
    /// Switch the worker to `context` and start maintaining it
    ///
    /// Returns as soon as the request is queued. The receiver resolves when
    /// the first maintenance pass for the context finishes.
    pub async fn activate(
        &self,
        context: ActiveContext,
    ) -> Result<oneshot::Receiver<Result<MaintenanceReport>>> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(WorkerCommand::Activate { context, reply })
            .await
            .map_err(|_| anyhow!("maintenance worker has stopped"))?;
        Ok(rx)
    }

    /// Switch the worker to `context` for commits only
    ///
    /// No maintenance pass runs and no re-check is scheduled, so nothing is
    /// copied into the private workspace or a snapshot.
    pub async fn attach(&self, context: ActiveContext) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(WorkerCommand::Attach { context, reply })
            .await
            .map_err(|_| anyhow!("maintenance worker has stopped"))?;
        rx.await.context("maintenance worker dropped the attach request")?
    }

    /// Copy the active user's versions of `paths` to the canonical root
    pub async fn commit(&self, paths: Vec<PathBuf>) -> Result<CommitOutcome> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(WorkerCommand::Commit { paths, reply })
            .await
            .map_err(|_| anyhow!("maintenance worker has stopped"))?;
        rx.await.context("maintenance worker dropped the commit request")
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    /// Ask the worker to stop; a running copy is cancelled
    pub async fn shutdown(&self) -> Result<()> {
        self.commands
            .send(WorkerCommand::Shutdown)
            .await
            .map_err(|_| anyhow!("maintenance worker has stopped"))
    }
}

/// Worker-owned state
pub struct WorkspaceMaintenanceWorker {
    config: WorkerConfig,
    workspace: Option<UserWorkspace>,
    cancel: CancelFlag,
    running: Option<JoinHandle<()>>,
    events: broadcast::Sender<WorkerEvent>,
    commands: mpsc::Receiver<WorkerCommand>,
}

impl WorkspaceMaintenanceWorker {
    /// Spawn a worker on the current tokio runtime
    pub fn spawn(config: WorkerConfig) -> (WorkerHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        let worker = Self {
            config,
            workspace: None,
            cancel: CancelFlag::new(),
            running: None,
            events: events.clone(),
            commands: command_rx,
        };
        let task = tokio::spawn(worker.run());

        (
            WorkerHandle {
                commands: command_tx,
                events,
            },
            task,
        )
    }

    async fn run(mut self) {
        let mut timer: Option<Interval> = None;
        info!(interval = ?self.config.recheck_interval, "maintenance worker started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(WorkerCommand::Activate { context, reply }) => {
                        if timer.is_none() {
                            timer = Some(self.recheck_timer());
                        }
                        self.activate(context, reply).await;
                    }
                    Some(WorkerCommand::Attach { context, reply }) => {
                        timer = None;
                        let _ = reply.send(self.attach(context).await);
                    }
                    Some(WorkerCommand::Commit { paths, reply }) => {
                        let outcome = self.commit(paths).await;
                        let _ = self.events.send(WorkerEvent::CommitFinished {
                            success: outcome.success(),
                        });
                        let _ = reply.send(outcome);
                    }
                    Some(WorkerCommand::Shutdown) | None => break,
                },
                _ = next_tick(&mut timer) => self.start_maintenance(None),
            }
        }

        self.stop_running().await;
        info!("maintenance worker stopped");
    }

    fn recheck_timer(&self) -> Interval {
        let period = self.config.recheck_interval;
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer
    }

    async fn activate(&mut self, context: ActiveContext, reply: MaintenanceReply) {
        self.stop_running().await;

        match UserWorkspace::new(&context.root, &context.user) {
            Ok(workspace) => {
                info!(root = %context.root.display(), user = %context.user, "workspace activated");
                self.workspace = Some(workspace);
                self.start_maintenance(Some(reply));
            }
            Err(e) => {
                warn!(user = %context.user, error = %e, "rejected activation");
                let _ = reply.send(Err(e.into()));
            }
        }
    }

    async fn attach(&mut self, context: ActiveContext) -> Result<()> {
        self.stop_running().await;
        self.workspace = None;

        let workspace = UserWorkspace::new(&context.root, &context.user)?;
        debug!(root = %context.root.display(), user = %context.user, "worker attached");
        self.workspace = Some(workspace);
        Ok(())
    }

    /// Cancel and wait for an in-flight maintenance pass
    async fn stop_running(&mut self) {
        if let Some(running) = self.running.take() {
            self.cancel.cancel();
            let _ = running.await;
        }
        self.cancel.reset();
    }

    fn start_maintenance(&mut self, reply: Option<MaintenanceReply>) {
        if self.running.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("maintenance pass still running, skipping tick");
            return;
        }
        let Some(workspace) = self.workspace.clone() else {
            return;
        };

        let events = self.events.clone();
        let cancel = self.cancel.clone();
        self.running = Some(tokio::spawn(async move {
            let result = maintain(workspace, events.clone(), cancel).await;
            match &result {
                Err(e) if is_cancelled(e) => debug!("maintenance pass cancelled"),
                Err(e) => {
                    warn!(error = %e, "workspace maintenance failed, retrying on next tick");
                    let _ = events.send(WorkerEvent::Failed {
                        message: format!("{e:#}"),
                    });
                }
                Ok(_) => {}
            }
            if let Some(reply) = reply {
                let _ = reply.send(result);
            }
        }));
    }

    async fn commit(&self, paths: Vec<PathBuf>) -> CommitOutcome {
        let Some(workspace) = self.workspace.clone() else {
            return CommitOutcome::failed("no active workspace");
        };

        match tokio::task::spawn_blocking(move || workspace.commit_files(&paths)).await {
            Ok(Ok(committed)) => {
                info!(files = committed.len(), "committed user changes");
                CommitOutcome {
                    committed,
                    failure: None,
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "commit failed");
                CommitOutcome::failed(e.to_string())
            }
            Err(e) => CommitOutcome::failed(format!("commit task failed: {e}")),
        }
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn is_cancelled(error: &anyhow::Error) -> bool {
    matches!(error.downcast_ref::<CoreError>(), Some(CoreError::Cancelled))
}

/// Ensure the private workspace, then a snapshot for `(root, user)`
async fn maintain(
    workspace: UserWorkspace,
    events: broadcast::Sender<WorkerEvent>,
    cancel: CancelFlag,
) -> Result<MaintenanceReport> {
    let user = workspace.user().to_string();
    let progress_events = events.clone();

    let report = tokio::task::spawn_blocking(move || -> Result<MaintenanceReport> {
        let outcome = workspace.ensure(
            |p| {
                let status = if p.is_complete() {
                    CopyStatus::Finished
                } else {
                    CopyStatus::InProgress
                };
                let _ = progress_events.send(WorkerEvent::CopyProgress {
                    progress: p.fraction(),
                    status,
                });
            },
            &cancel,
        )?;
        if outcome == EnsureOutcome::Busy {
            return Ok(MaintenanceReport {
                workspace: outcome,
                snapshot: None,
            });
        }

        let snapshot = Snapshot::new(workspace.root(), workspace.user())?;
        let created = if snapshot.exists() {
            None
        } else {
            Some(snapshot.make()?.path)
        };
        Ok(MaintenanceReport {
            workspace: outcome,
            snapshot: created,
        })
    })
    .await
    .context("maintenance task panicked")??;

    if report.workspace != EnsureOutcome::Busy {
        let created = matches!(report.workspace, EnsureOutcome::Created { .. });
        let _ = events.send(WorkerEvent::WorkspaceReady { user, created });
    }
    if let Some(path) = &report.snapshot {
        let _ = events.send(WorkerEvent::SnapshotCreated { path: path.clone() });
    }
    Ok(report)
}
