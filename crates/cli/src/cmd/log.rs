//! Show every commit, newest first

use crate::util;
use anyhow::{Context, Result};
use cowork_journal::{ChangelogStore, SnapshotCommitBundle};
use cowork_watcher::ActiveContext;
use owo_colors::OwoColorize;

pub async fn run(context: &ActiveContext, limit: Option<usize>, json: bool) -> Result<()> {
    let store = ChangelogStore::open(&context.root)
        .with_context(|| format!("Failed to open changelog of {}", context.root.display()))?;
    let bundles = store.all_changes();

    if json {
        let limited = limit_commits(bundles, limit);
        println!("{}", serde_json::to_string_pretty(&limited)?);
        return Ok(());
    }

    if bundles.iter().all(|b| b.commits.is_empty()) {
        println!("{}", "No commits yet".dimmed());
        return Ok(());
    }
    util::print_bundles(&bundles, limit);
    Ok(())
}

/// Keep at most `limit` commits across bundles, newest first
pub fn limit_commits(
    bundles: Vec<SnapshotCommitBundle>,
    limit: Option<usize>,
) -> Vec<SnapshotCommitBundle> {
    let Some(mut remaining) = limit else {
        return bundles;
    };
    let mut kept = Vec::new();
    for mut bundle in bundles {
        if remaining == 0 {
            break;
        }
        bundle.commits.truncate(remaining);
        remaining -= bundle.commits.len();
        kept.push(bundle);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use cowork_journal::CommitRecord;

    fn bundle(modified: u64, commits: usize) -> SnapshotCommitBundle {
        SnapshotCommitBundle {
            snapshot_path: None,
            modified,
            commits: (0..commits)
                .map(|i| CommitRecord::at("alice", i as u64, ["a.yaml"]))
                .collect(),
        }
    }

    #[test]
    fn test_limit_spans_bundles() {
        let limited = limit_commits(vec![bundle(3, 2), bundle(2, 2), bundle(1, 2)], Some(3));

        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].commits.len(), 2);
        assert_eq!(limited[1].commits.len(), 1);
    }

    #[test]
    fn test_no_limit_keeps_everything() {
        let limited = limit_commits(vec![bundle(2, 2), bundle(1, 0)], None);
        assert_eq!(limited.len(), 2);
    }
}
