//! Replace the user's copies of files with the canonical versions

use crate::util;
use anyhow::Result;
use cowork_core::{CoreError, UserWorkspace};
use cowork_watcher::ActiveContext;
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub async fn run(context: &ActiveContext, paths: &[PathBuf]) -> Result<()> {
    let workspace = UserWorkspace::new(&context.root, &context.user)?;
    let paths = paths
        .iter()
        .map(|p| util::cli_path(p))
        .collect::<Result<Vec<_>>>()?;

    match workspace.sync_files(&paths) {
        Ok(synced) => {
            for path in &synced {
                println!("  {} {}", "✓".green(), path);
            }
            println!("{} Synced {} file(s)", "✓".green(), synced.len());
            Ok(())
        }
        Err(e @ CoreError::FileOperation { .. }) => {
            eprintln!("{} Sync failed: {}", "✗".red(), e);
            anyhow::bail!("sync failed");
        }
        Err(e) => Err(e.into()),
    }
}
