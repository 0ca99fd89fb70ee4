//! Publish the user's versions of files and record the commit

use crate::system_config::SystemConfig;
use crate::util;
use anyhow::{bail, Result};
use cowork_core::UserWorkspace;
use cowork_watcher::{ActiveContext, Session};
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub async fn run(context: &ActiveContext, config: &SystemConfig, paths: Vec<PathBuf>) -> Result<()> {
    let paths = paths
        .iter()
        .map(|p| util::cli_path(p))
        .collect::<Result<Vec<_>>>()?;

    if !UserWorkspace::new(&context.root, &context.user)?.exists() {
        bail!("No private workspace for {} (run 'cw workspace' first)", context.user);
    }

    let session = Session::attach(&context.root, &context.user, config.worker_config()).await?;
    let outcome = session.commit(paths).await?;
    session.close().await?;

    for path in &outcome.committed {
        println!("  {} {}", "✓".green(), path);
    }
    if let Some(failure) = outcome.failure {
        eprintln!("{} Commit failed: {}", "✗".red(), failure);
        bail!("commit failed");
    }
    println!(
        "{} Committed {} file(s) as {}",
        "✓".green(),
        outcome.committed.len(),
        context.user.cyan()
    );
    Ok(())
}
