//! Ensure the acting user's snapshot, or list all snapshots

use crate::util;
use anyhow::{Context, Result};
use cowork_journal::Snapshot;
use cowork_watcher::{ActiveContext, MaintenanceLock};
use owo_colors::OwoColorize;

pub async fn run(context: &ActiveContext, list: bool) -> Result<()> {
    if list {
        return run_list(context);
    }

    let snapshot = Snapshot::new(&context.root, &context.user)?;
    if let Some(info) = snapshot.find() {
        println!(
            "{} Snapshot {} exists ({})",
            "✓".green(),
            info.id.yellow(),
            util::format_relative_time(info.created)
        );
        return Ok(());
    }

    let _lock = MaintenanceLock::acquire(&context.root, &context.user)
        .context("Another process is maintaining this root (see 'cw status')")?;
    let info = tokio::task::spawn_blocking(move || snapshot.make())
        .await
        .context("snapshot task panicked")??;
    println!("{} Created snapshot {}", "✓".green(), info.id.yellow());
    Ok(())
}

fn run_list(context: &ActiveContext) -> Result<()> {
    let snapshots = Snapshot::list(&context.root);
    if snapshots.is_empty() {
        println!("{}", "No snapshots yet".dimmed());
        return Ok(());
    }

    println!("{}", "Snapshots".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for info in snapshots {
        println!(
            "  {} {} {}",
            util::format_absolute_time(info.created).dimmed(),
            info.user.cyan(),
            info.id.yellow()
        );
    }
    Ok(())
}
