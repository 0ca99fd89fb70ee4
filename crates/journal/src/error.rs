//! Error types for changelog and snapshot operations

use cowork_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    /// Filesystem failure from the entity layer
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A changelog could not be encoded for writing
    #[error("failed to encode changelog {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An operation that needs a working directory ran before one was set
    #[error("changelog working directory not set")]
    NotConfigured,
}

/// Result type for journal operations
pub type Result<T> = std::result::Result<T, JournalError>;
