//! Show workspace, changelog and pending changes

use crate::util;
use anyhow::Result;
use cowork_core::{DirectoryEntity, EntityPath, UserWorkspace};
use cowork_journal::document::changelog_path;
use cowork_journal::{ChangelogDocument, Snapshot};
use cowork_watcher::{pending, ActiveContext, ChangeKind, MaintenanceLock};
use owo_colors::OwoColorize;

pub async fn run(context: &ActiveContext) -> Result<()> {
    let root = &context.root;
    let workspace = UserWorkspace::new(root, &context.user)?;

    println!("{}", "Workspace Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Root:          {}", root.display().to_string().cyan());
    println!("User:          {}", context.user.cyan());
    if !EntityPath::new("", root).is_writable() {
        println!("  {}", "Warning: root is not writable, commits will fail".yellow());
    }
    println!();

    // Changelog
    print!("Changelog:     ");
    match ChangelogDocument::read(&changelog_path(root))? {
        Some(document) => println!(
            "{} commits, modified {}",
            document.log.len(),
            util::format_relative_time(document.modified)
        ),
        None => {
            println!("{}", "Not initialized".yellow());
            println!("  {}", "Tip: Run 'cw init'".dimmed());
        }
    }

    // Maintenance
    print!("Maintenance:   ");
    match MaintenanceLock::owner(root) {
        Some(owner) => println!(
            "{} (pid {}, {}, since {})",
            "Running ✓".green(),
            owner.pid,
            owner.user,
            util::format_relative_time(owner.started_at)
        ),
        None => println!("{}", "Not running".yellow()),
    }
    println!();

    // Files
    let canonical = DirectoryEntity::at_root(root);
    println!("Files:");
    println!("  Canonical:   {}", canonical.count_files(true));
    if workspace.exists() {
        println!("  Private:     {}", workspace.directory().count_files(true));
    } else {
        println!("  Private:     {}", "none".dimmed());
        println!("  {}", "Tip: Run 'cw workspace' to create it".dimmed());
    }
    match Snapshot::new(root, &context.user)?.find() {
        Some(info) => println!(
            "  Snapshot:    {} ({})",
            info.id.yellow(),
            util::format_relative_time(info.created).dimmed()
        ),
        None => println!("  Snapshot:    {}", "none".dimmed()),
    }
    println!();

    // Pending
    let changes = pending::scan(&workspace)?;
    println!("Pending changes:");
    if changes.is_empty() {
        println!("  {}", "Nothing to commit".dimmed());
    }
    for change in &changes {
        let marker = change.kind.marker().to_string();
        let marker = match change.kind {
            ChangeKind::Modified => marker.yellow().to_string(),
            ChangeKind::Added => marker.green().to_string(),
            ChangeKind::Removed => marker.red().to_string(),
        };
        println!("  {} {}", marker, change.path);
    }

    Ok(())
}
