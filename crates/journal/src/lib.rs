//! Changelog journal and snapshots
//!
//! This crate provides:
//! - Commit records and the on-disk changelog document
//! - Immutable per-user snapshots with frozen changelogs
//! - The changelog store merging live and snapshot logs into history views

pub mod bundle;
pub mod changelog;
pub mod document;
pub mod error;
pub mod record;
pub mod snapshot;

// Re-exports
pub use bundle::SnapshotCommitBundle;
pub use changelog::{ChangelogEvent, ChangelogStore};
pub use document::ChangelogDocument;
pub use error::{JournalError, Result};
pub use record::{CommitRecord, CommittedFile};
pub use snapshot::{Snapshot, SnapshotInfo};
