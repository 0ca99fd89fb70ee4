//! Ensure the private workspace and snapshot of the acting user

use crate::system_config::SystemConfig;
use crate::util;
use anyhow::{Context, Result};
use cowork_core::EnsureOutcome;
use cowork_watcher::{ActiveContext, MaintenanceLock, WorkspaceMaintenanceWorker};
use owo_colors::OwoColorize;

pub async fn run(context: &ActiveContext, config: &SystemConfig) -> Result<()> {
    let _lock = MaintenanceLock::acquire(&context.root, &context.user)
        .context("Another process is maintaining this root (see 'cw status')")?;

    let (worker, task) = WorkspaceMaintenanceWorker::spawn(config.worker_config());
    let mut events = worker.subscribe();
    let mut first_pass = worker.activate(context.clone()).await?;

    let bar = util::copy_progress_bar()?;
    let report = loop {
        tokio::select! {
            result = &mut first_pass => break result.context("maintenance worker stopped")?,
            Ok(event) = events.recv() => util::render_worker_event(&bar, &event),
        }
    };
    while let Ok(event) = events.try_recv() {
        util::render_worker_event(&bar, &event);
    }
    bar.finish_and_clear();

    worker.shutdown().await?;
    task.await.context("maintenance worker panicked")?;

    let report = report?;
    match report.workspace {
        EnsureOutcome::Present => println!(
            "{} Workspace ready at {}",
            "✓".green(),
            context.root.join(".users").join(&context.user).display()
        ),
        EnsureOutcome::Created { files } => println!(
            "{} Copied {} files into {}",
            "✓".green(),
            files,
            context.root.join(".users").join(&context.user).display()
        ),
        EnsureOutcome::Busy => println!("{}", "Workspace copy already in progress".yellow()),
    }
    Ok(())
}
