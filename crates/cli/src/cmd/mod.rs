//! CLI command implementations

pub mod commit;
pub mod config;
pub mod diff;
pub mod history;
pub mod init;
pub mod log;
pub mod snapshot;
pub mod status;
pub mod sync;
pub mod watch;
pub mod workspace;
