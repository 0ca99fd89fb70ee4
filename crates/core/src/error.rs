//! Error types for filesystem entities and workspaces

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by entity and workspace operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// A filesystem operation failed (permission denied, disk full, ...)
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A path escapes its root or is otherwise unusable as a relative path
    #[error("invalid relative path: {0}")]
    InvalidPath(String),

    /// Username cannot be used as a directory name
    #[error("invalid username: {0:?}")]
    InvalidUsername(String),

    /// One file of a multi-file commit or sync failed; earlier files stay copied
    #[error("failed to copy {path}: {source}")]
    FileOperation {
        path: String,
        #[source]
        source: Box<CoreError>,
    },

    /// A bulk copy was interrupted by a cancellation request
    #[error("operation cancelled")]
    Cancelled,
}

impl CoreError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// True if this error is the "not found" flavour of an I/O failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Result type used throughout cowork-core
pub type Result<T> = std::result::Result<T, CoreError>;

/// Attach a path to `std::io` results
pub(crate) trait IoResultExt<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|source| CoreError::io(path, source))
    }
}
