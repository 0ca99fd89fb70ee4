//! Bulk tree copy with progress reporting and cooperative cancellation

use crate::directory::{DirectoryEntity, Entity};
use crate::error::{CoreError, IoResultExt, Result};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag, checked between copied entries
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress of a bulk copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyProgress {
    /// Files and directories processed so far
    pub processed: usize,
    /// Files and directories to process in total
    pub total: usize,
}

impl CopyProgress {
    /// Fraction complete in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Mirror the visible content of `source` into the absolute `destination`
///
/// Reports progress after every file or directory. Returns the number of
/// files copied.
pub fn mirror_tree(
    source: &DirectoryEntity,
    destination: &Path,
    progress: &mut dyn FnMut(CopyProgress),
    cancel: &CancelFlag,
) -> Result<usize> {
    let entities = source.content(true)?;
    let total = entities.len();
    fs::create_dir_all(destination).at(destination)?;

    if total == 0 {
        progress(CopyProgress { processed: 0, total: 0 });
        return Ok(0);
    }

    let mut files = 0;
    for (index, entity) in entities.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        let relative = entity
            .path()
            .relative_path()
            .strip_prefix(source.relative_path())
            .map_err(|_| CoreError::InvalidPath(entity.path().relative_slash()))?;
        let target = destination.join(relative);

        match entity {
            Entity::Directory(_) => fs::create_dir_all(&target).at(&target)?,
            Entity::File(file) => {
                file.copy_to(&target)?;
                files += 1;
            }
        }

        progress(CopyProgress {
            processed: index + 1,
            total,
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mirror_reports_every_entry() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src/sub")).unwrap();
        fs::write(root.join("src/a.yaml"), b"a").unwrap();
        fs::write(root.join("src/sub/b.yaml"), b"b").unwrap();
        fs::write(root.join("src/.hidden"), b"h").unwrap();

        let mut reports = Vec::new();
        let copied = mirror_tree(
            &DirectoryEntity::new("src", root),
            &root.join("out"),
            &mut |p| reports.push(p),
            &CancelFlag::new(),
        )
        .unwrap();

        assert_eq!(copied, 2);
        assert_eq!(reports.len(), 3);
        assert!(reports.last().unwrap().is_complete());
        assert_eq!(fs::read(root.join("out/sub/b.yaml")).unwrap(), b"b");
        assert!(!root.join("out/.hidden").exists());
    }

    #[test]
    fn test_mirror_stops_when_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        for i in 0..5 {
            fs::write(root.join(format!("src/{i}.yaml")), b"x").unwrap();
        }

        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        let result = mirror_tree(
            &DirectoryEntity::new("src", root),
            &root.join("out"),
            &mut |p| {
                if p.processed == 2 {
                    trigger.cancel();
                }
            },
            &cancel,
        );

        assert!(matches!(result, Err(CoreError::Cancelled)));
        assert_eq!(DirectoryEntity::new("out", root).count_files(true), 2);
    }

    #[test]
    fn test_fraction_of_empty_copy_is_complete() {
        let progress = CopyProgress { processed: 0, total: 0 };
        assert_eq!(progress.fraction(), 1.0);
        assert!(progress.is_complete());
    }
}
