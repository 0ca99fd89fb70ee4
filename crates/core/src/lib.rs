//! Cowork Core - filesystem entities and per-user workspaces
//!
//! This crate provides the foundational layer:
//! - Root-relative paths with the per-user path mapping
//! - File and directory entities (enumeration, copy, permission probes)
//! - Bulk tree copy with progress and cancellation
//! - Private user workspaces (ensure, commit, sync)
//! - On-disk layout constants and atomic writes

pub mod copy;
pub mod directory;
pub mod error;
pub mod file;
pub mod layout;
pub mod path;
pub mod workspace;

// Re-export main types for convenience
pub use copy::{mirror_tree, CancelFlag, CopyProgress};
pub use directory::{DirectoryEntity, Entity};
pub use error::{CoreError, Result};
pub use file::FileEntity;
pub use path::EntityPath;
pub use workspace::{EnsureOutcome, UserWorkspace};
