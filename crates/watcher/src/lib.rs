//! Background maintenance for Cowork
//!
//! This crate keeps a canonical root usable by its active user:
//! - A maintenance worker that ensures the private workspace and snapshot,
//!   re-checking on a fixed interval
//! - Commit requests executed off the interactive path
//! - A process-level maintenance lock
//! - Pending-change scans and open-file bookkeeping for editing sessions

pub mod lock;
pub mod open_files;
pub mod pending;
pub mod session;
pub mod worker;

pub use lock::{LockOwner, MaintenanceLock};
pub use open_files::{OpenFile, OpenFiles};
pub use pending::{ChangeKind, PendingChange};
pub use session::Session;
pub use worker::{
    ActiveContext, CommitOutcome, CopyStatus, MaintenanceReport, WorkerConfig, WorkerEvent,
    WorkerHandle, WorkspaceMaintenanceWorker,
};
