//! Create the changelog of a canonical root

use anyhow::{Context, Result};
use cowork_journal::document::changelog_path;
use cowork_journal::ChangelogStore;
use cowork_watcher::ActiveContext;
use owo_colors::OwoColorize;

pub async fn run(context: &ActiveContext) -> Result<()> {
    let path = changelog_path(&context.root);
    let existed = path.exists();

    let store = ChangelogStore::open(&context.root)
        .with_context(|| format!("Failed to initialize {}", context.root.display()))?;

    if existed {
        println!(
            "{} Changelog already present at {}",
            "✓".green(),
            path.display()
        );
    } else {
        println!("{} Initialized changelog at {}", "✓".green(), path.display());
    }
    println!(
        "  Commits:     {}",
        store.all_changes().iter().map(|b| b.commits.len()).sum::<usize>()
    );
    println!();
    println!("Next steps:");
    println!("  - Run 'cw workspace' to create your private copy");
    println!("  - Run 'cw status' to see what changed");
    Ok(())
}
