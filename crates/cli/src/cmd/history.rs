//! Show commits that touched one file

use crate::util;
use anyhow::{Context, Result};
use cowork_journal::ChangelogStore;
use cowork_watcher::ActiveContext;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(context: &ActiveContext, file: &Path, json: bool) -> Result<()> {
    let store = ChangelogStore::open(&context.root)
        .with_context(|| format!("Failed to open changelog of {}", context.root.display()))?;
    let file = util::cli_path(file)?;
    let bundles = store.changes_for_file(&file);

    if json {
        println!("{}", serde_json::to_string_pretty(&bundles)?);
        return Ok(());
    }

    if bundles.is_empty() {
        println!("{}", format!("No commits touched {}", file.display()).dimmed());
        return Ok(());
    }
    println!("{} {}", "History of".bold(), file.display().to_string().cyan());
    println!();
    util::print_bundles(&bundles, None);
    Ok(())
}
