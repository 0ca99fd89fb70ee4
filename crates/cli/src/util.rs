//! Shared utilities for CLI commands

use crate::system_config::SystemConfig;
use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use cowork_core::layout::CHANGELOG_FILE;
use cowork_journal::SnapshotCommitBundle;
use cowork_watcher::{ActiveContext, CopyStatus, WorkerEvent};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Find the canonical root by walking up from `start` to a `.changelog`
pub fn find_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CHANGELOG_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Resolve the root and user a command operates on
///
/// `--root` wins; otherwise the nearest ancestor holding a changelog, else
/// the current directory. `--user` wins over the configured name, which wins
/// over `$USER`.
pub fn resolve_context(
    root: Option<PathBuf>,
    user: Option<String>,
    config: &SystemConfig,
) -> Result<ActiveContext> {
    let root = match root {
        Some(root) => root,
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            find_root_from(&cwd).unwrap_or(cwd)
        }
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("Root directory {} does not exist", root.display()))?;

    let user = user
        .or_else(|| config.user.name.clone())
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .context("No user given (use --user, set user.name in config, or set $USER)")?;
    cowork_core::layout::validate_username(&user)?;

    Ok(ActiveContext::new(root, user))
}

/// Interpret a path typed on the command line
///
/// Paths that exist relative to the current directory are made absolute;
/// anything else is taken as root-relative.
pub fn cli_path(path: &Path) -> Result<PathBuf> {
    if path.is_relative() && path.exists() {
        return path
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", path.display()));
    }
    Ok(path.to_path_buf())
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts_ms: u64) -> String {
    let now = cowork_core::layout::now_ms();
    let Some(elapsed) = now.checked_sub(ts_ms) else {
        return "in the future".to_string();
    };
    let seconds = elapsed / 1000;

    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format timestamp as local time ("2024-01-03 14:30:00")
pub fn format_absolute_time(ts_ms: u64) -> String {
    match Local.timestamp_millis_opt(ts_ms as i64).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts_ms.to_string(),
    }
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Label for the source of a bundle
pub fn bundle_label(bundle: &SnapshotCommitBundle) -> String {
    match &bundle.snapshot_path {
        None => "live changelog".to_string(),
        Some(path) => format!(
            "snapshot {}",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        ),
    }
}

/// Print bundles, newest first, stopping after `limit` commits
pub fn print_bundles(bundles: &[SnapshotCommitBundle], limit: Option<usize>) {
    let mut remaining = limit.unwrap_or(usize::MAX);

    for bundle in bundles {
        if remaining == 0 {
            break;
        }
        println!(
            "{} {}",
            bundle_label(bundle).bold(),
            format!("({})", format_absolute_time(bundle.modified)).dimmed()
        );
        if bundle.commits.is_empty() {
            println!("  {}", "no commits".dimmed());
        }
        for commit in bundle.commits.iter().take(remaining) {
            let files: Vec<&str> = commit.paths().collect();
            println!(
                "  {} {} {}",
                format_relative_time(commit.modified).dimmed(),
                commit.user.cyan(),
                files.join(", ")
            );
            remaining -= 1;
        }
        println!();
    }
}

/// Progress bar for the workspace copy
///
/// Starts hidden and only appears while a copy is running.
pub fn copy_progress_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::with_draw_target(Some(1000), ProgressDrawTarget::hidden());
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {percent:>3}%")?
            .progress_chars("=> "),
    );
    bar.set_message("Copying workspace");
    Ok(bar)
}

/// Print a line without tearing a visible progress bar
pub fn say(bar: &ProgressBar, line: String) {
    if bar.is_hidden() {
        println!("{line}");
    } else {
        bar.println(line);
    }
}

/// Render one worker event
pub fn render_worker_event(bar: &ProgressBar, event: &WorkerEvent) {
    match event {
        WorkerEvent::CopyProgress { progress, status } => {
            if *status == CopyStatus::Finished {
                bar.finish_and_clear();
                bar.set_draw_target(ProgressDrawTarget::hidden());
                bar.reset();
                return;
            }
            if bar.is_hidden() {
                bar.set_draw_target(ProgressDrawTarget::stderr());
            }
            bar.set_position((progress * 1000.0).round() as u64);
        }
        WorkerEvent::WorkspaceReady { user, created: true } => {
            say(bar, format!("{} Created private workspace for {}", "✓".green(), user.cyan()));
        }
        WorkerEvent::WorkspaceReady { created: false, .. } => {}
        WorkerEvent::SnapshotCreated { path } => {
            say(bar, format!("{} Created snapshot {}", "✓".green(), path.display()));
        }
        WorkerEvent::CommitFinished { .. } => {}
        WorkerEvent::Failed { message } => {
            say(bar, format!("{} {}", "✗".red(), message));
        }
    }
}
