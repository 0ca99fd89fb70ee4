//! On-disk layout of a canonical root
//!
//! ```text
//! <root>/
//!   .changelog              live changelog (JSON)
//!   .users/
//!     <user>/               private mirror of <root>
//!     .staging-<user>/      in-flight copy, renamed into place when complete
//!   .snapshots/
//!     <created-ms>-<user>/  frozen mirror of <root> plus its own .changelog
//!   .locks/
//!     maintenance.lock
//!     logs/
//!   <configuration files>
//! ```
//!
//! Every dot-prefixed entry is system state and is never enumerated, copied
//! into a workspace, or frozen into a snapshot.

use crate::error::{CoreError, IoResultExt, Result};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Name of the changelog file inside a root or snapshot
pub const CHANGELOG_FILE: &str = ".changelog";

/// Directory holding per-user private workspaces
pub const USERS_DIR: &str = ".users";

/// Directory holding snapshots
pub const SNAPSHOTS_DIR: &str = ".snapshots";

/// Directory holding lock files and daemon logs
pub const LOCKS_DIR: &str = ".locks";

/// Prefix of in-flight copy directories
pub const STAGING_PREFIX: &str = ".staging-";

/// Check whether a file name denotes a hidden (system) entry
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Check if a root-relative path touches hidden entries at any level
pub fn should_ignore(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name.to_str().map(is_hidden).unwrap_or(false),
        _ => false,
    })
}

/// Normalize a path for storage
///
/// - Rejects `..` and absolute paths
/// - Removes `./` components
/// - Returns the `/`-separated form used in changelog records
pub fn normalize_path(path: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => {
                let name = name
                    .to_str()
                    .ok_or_else(|| CoreError::InvalidPath(path.display().to_string()))?;
                parts.push(name);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(CoreError::InvalidPath(path.display().to_string()));
            }
        }
    }
    Ok(parts.join("/"))
}

/// Validate a username for use as a directory name
pub fn validate_username(user: &str) -> Result<()> {
    let bad = user.is_empty()
        || is_hidden(user)
        || user.contains(['/', '\\'])
        || user.chars().any(char::is_control);
    if bad {
        return Err(CoreError::InvalidUsername(user.to_string()));
    }
    Ok(())
}

/// Root-relative directory of a user's private workspace
pub fn user_dir(user: &str) -> PathBuf {
    Path::new(USERS_DIR).join(user)
}

/// Root-relative staging directory used while a user's workspace is copied
pub fn staging_dir(user: &str) -> PathBuf {
    Path::new(USERS_DIR).join(format!("{STAGING_PREFIX}{user}"))
}

/// Current wall-clock time in Unix milliseconds
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Atomic write helper
///
/// Writes data to a temporary file next to `target`, fsyncs it, then renames
/// it over the target path.
pub fn atomic_write(target: &Path, data: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).at(parent)?;

    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CoreError::InvalidPath(target.display().to_string()))?;
    let tmp = parent.join(format!(".{file_name}.tmp-{}", std::process::id()));

    let mut file = fs::File::create(&tmp).at(&tmp)?;
    file.write_all(data).at(&tmp)?;
    file.sync_all().at(&tmp)?;
    drop(file);

    if let Err(e) = fs::rename(&tmp, target) {
        let _ = fs::remove_file(&tmp);
        return Err(CoreError::io(target, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("nested/out.json");

        atomic_write(&target, b"{\"a\":1}").unwrap();
        atomic_write(&target, b"{\"a\":2}").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"{\"a\":2}");
        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("a/b.yaml")).unwrap(), "a/b.yaml");
        assert_eq!(normalize_path(Path::new("./a/./b.yaml")).unwrap(), "a/b.yaml");
        assert!(normalize_path(Path::new("../a")).is_err());
        assert!(normalize_path(Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn test_should_ignore() {
        assert!(should_ignore(Path::new(".changelog")));
        assert!(should_ignore(Path::new(".users/alice/a.yaml")));
        assert!(should_ignore(Path::new("config/.hidden")));
        assert!(!should_ignore(Path::new("config/model.yaml")));
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("bob-smith").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username(".hidden").is_err());
        assert!(validate_username("..").is_err());
        assert!(validate_username("a/b").is_err());
    }
}
