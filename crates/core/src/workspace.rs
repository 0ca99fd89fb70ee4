//! Per-user private workspaces
//!
//! Every active user of a canonical root gets a private mirror under
//! `.users/<user>`. The mirror is built in a staging directory and renamed into
//! place only once complete, so an interrupted copy never looks like a
//! finished workspace.

use crate::copy::{mirror_tree, CancelFlag, CopyProgress};
use crate::directory::DirectoryEntity;
use crate::error::{CoreError, IoResultExt, Result};
use crate::file::FileEntity;
use crate::layout::{self, should_ignore};
use crate::path::EntityPath;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of [`UserWorkspace::ensure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The private directory already existed, nothing was copied
    Present,
    /// The private directory was created by copying this many files
    Created { files: usize },
    /// Another `ensure` on this workspace is still copying
    Busy,
}

/// A user's private copy of a canonical root
///
/// Clones share the in-progress guard.
#[derive(Debug, Clone)]
pub struct UserWorkspace {
    root: PathBuf,
    user: String,
    copying: Arc<AtomicBool>,
}

struct CopyGuard<'a>(&'a AtomicBool);

impl Drop for CopyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl UserWorkspace {
    pub fn new(root: impl Into<PathBuf>, user: &str) -> Result<Self> {
        layout::validate_username(user)?;
        Ok(Self {
            root: root.into(),
            user: user.to_string(),
            copying: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// The canonical root as a directory entity
    pub fn canonical(&self) -> DirectoryEntity {
        DirectoryEntity::at_root(&self.root)
    }

    /// The private directory, `root/.users/<user>`
    pub fn directory(&self) -> DirectoryEntity {
        self.canonical().user_version(&self.user)
    }

    pub fn exists(&self) -> bool {
        self.directory().exists()
    }

    pub fn is_copying(&self) -> bool {
        self.copying.load(Ordering::SeqCst)
    }

    /// Make sure the private directory exists, copying the canonical tree if not
    pub fn ensure(
        &self,
        mut progress: impl FnMut(CopyProgress),
        cancel: &CancelFlag,
    ) -> Result<EnsureOutcome> {
        if self
            .copying
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(user = %self.user, "workspace copy already in progress");
            return Ok(EnsureOutcome::Busy);
        }
        let _guard = CopyGuard(&self.copying);

        if self.exists() {
            return Ok(EnsureOutcome::Present);
        }

        let staging = self.root.join(layout::staging_dir(&self.user));
        if staging.exists() {
            warn!(path = %staging.display(), "removing interrupted workspace copy");
            fs::remove_dir_all(&staging).at(&staging)?;
        }

        info!(user = %self.user, root = %self.root.display(), "creating private workspace");
        let files = match mirror_tree(&self.canonical(), &staging, &mut progress, cancel) {
            Ok(files) => files,
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(e);
            }
        };

        let target = self.directory().absolute_path();
        fs::rename(&staging, &target).at(&target)?;
        info!(user = %self.user, files, "private workspace ready");
        Ok(EnsureOutcome::Created { files })
    }

    /// Resolve a user-supplied path to the canonical file it designates
    ///
    /// Accepts root-relative paths, absolute paths under the root, and paths
    /// inside any user's private workspace.
    pub fn resolve(&self, path: &Path) -> Result<FileEntity> {
        let entity = EntityPath::from_absolute(&self.root, path)
            .ok_or_else(|| CoreError::InvalidPath(path.display().to_string()))?
            .canonical_version();
        let relative = layout::normalize_path(entity.relative_path())?;
        if relative.is_empty() || should_ignore(Path::new(&relative)) {
            return Err(CoreError::InvalidPath(relative));
        }
        Ok(FileEntity::new(relative, &self.root))
    }

    /// Copy the user's versions of `paths` over the canonical files
    ///
    /// Stops at the first failure. Files committed before it stay committed.
    /// Returns the committed paths in root-relative `/` form.
    pub fn commit_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<String>> {
        self.for_each_file(paths, |file| file.commit(&self.user))
    }

    /// Copy the canonical versions of `paths` over the user's files
    pub fn sync_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<String>> {
        self.for_each_file(paths, |file| file.sync(&self.user))
    }

    fn for_each_file<P: AsRef<Path>>(
        &self,
        paths: &[P],
        op: impl Fn(&FileEntity) -> Result<()>,
    ) -> Result<Vec<String>> {
        let mut done = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let result = self.resolve(path).and_then(|file| {
                op(&file)?;
                Ok(file.relative_slash())
            });
            match result {
                Ok(relative) => done.push(relative),
                Err(source) => {
                    return Err(CoreError::FileOperation {
                        path: path.display().to_string(),
                        source: Box::new(source),
                    })
                }
            }
        }
        Ok(done)
    }
}
