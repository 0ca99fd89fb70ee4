//! Diff the canonical version of a file against the user's copy

use crate::diff_utils;
use crate::util;
use anyhow::{Context, Result};
use cowork_core::UserWorkspace;
use cowork_watcher::ActiveContext;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(context: &ActiveContext, file: &Path, context_lines: usize) -> Result<()> {
    let workspace = UserWorkspace::new(&context.root, &context.user)?;
    let canonical = workspace
        .resolve(&util::cli_path(file)?)
        .with_context(|| format!("Cannot diff {}", file.display()))?;
    let private = canonical.user_version(&context.user);
    let relative = canonical.relative_slash();

    if !canonical.exists() && !private.exists() {
        anyhow::bail!("{} exists neither in the root nor in your workspace", relative);
    }

    let old = canonical.read_bytes()?;
    let new = private.read_bytes()?;
    if diff_utils::is_binary(&old) || diff_utils::is_binary(&new) {
        if old == new {
            println!("{}", format!("No changes to {relative}").dimmed());
        } else {
            println!("Binary file {} differs", relative.cyan());
        }
        return Ok(());
    }

    let rendered = diff_utils::unified_diff(&old, &new, &relative, &context.user, context_lines);
    if rendered.is_empty() {
        println!("{}", format!("No changes to {relative}").dimmed());
    } else {
        print!("{rendered}");
    }
    Ok(())
}
