//! Maintenance lock
//!
//! At most one process maintains a canonical root at a time. The lock is an
//! exclusive `flock` on `<root>/.locks/maintenance.lock` holding the owner's
//! pid, user and start time.

use anyhow::{anyhow, bail, Context, Result};
use cowork_core::layout::{self, LOCKS_DIR};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const LOCK_FILE: &str = "maintenance.lock";
const MAX_ATTEMPTS: usize = 3;

/// Held maintenance lock; released on drop
pub struct MaintenanceLock {
    path: PathBuf,
    _file: File,
}

/// Who holds the lock, as recorded in the lock file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOwner {
    pub pid: u32,
    pub user: String,
    /// Unix milliseconds
    pub started_at: u64,
}

/// Path of the lock file for `root`
pub fn lock_path(root: &Path) -> PathBuf {
    root.join(LOCKS_DIR).join(LOCK_FILE)
}

impl MaintenanceLock {
    /// Take the lock for `root` without blocking
    ///
    /// Fails while any other process holds the `flock`, whatever the file
    /// says. An owner record left by a dead process is overwritten once the
    /// `flock` is ours.
    pub fn acquire(root: &Path, user: &str) -> Result<Self> {
        let path = lock_path(root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create locks directory")?;
        }

        for _ in 0..MAX_ATTEMPTS {
            let mut file = open_lock_file(&path)?;
            if !try_flock_exclusive(&file)? {
                return Err(held_by(root, &mut file));
            }
            // The previous holder may have unlinked the file between our open
            // and our flock; that inode no longer guards anything.
            if !same_file(&file, &path) {
                debug!(path = %path.display(), "lock file replaced while locking, retrying");
                continue;
            }

            if let Ok(previous) = read_owner(&mut file) {
                warn!(
                    pid = previous.pid,
                    user = %previous.user,
                    "taking over maintenance lock left by a dead process"
                );
            }
            write_owner(&mut file, user)?;
            return Ok(Self { path, _file: file });
        }
        bail!("{} lock file keeps being replaced, try again", path.display())
    }

    /// Current holder of the lock for `root`, if any live process holds it
    pub fn owner(root: &Path) -> Option<LockOwner> {
        let mut file = File::open(lock_path(root)).ok()?;
        let owner = read_owner(&mut file).ok()?;
        is_process_alive(owner.pid).then_some(owner)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock and remove the lock file
    pub fn release(self) -> Result<()> {
        fs::remove_file(&self.path).context("Failed to remove lock file")
    }
}

impl Drop for MaintenanceLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", path.display()))
}

/// Error for a lock whose `flock` another process holds
fn held_by(root: &Path, file: &mut File) -> anyhow::Error {
    match read_owner(file) {
        Ok(owner) => anyhow!(
            "{} is already maintained by {} (pid {})",
            root.display(),
            owner.user,
            owner.pid
        ),
        Err(_) => anyhow!("{} is already maintained (lock held by an unknown process)", root.display()),
    }
}

fn write_owner(file: &mut File, user: &str) -> Result<()> {
    let owner = LockOwner {
        pid: std::process::id(),
        user: user.to_string(),
        started_at: layout::now_ms(),
    };
    let serialized = serde_json::to_vec(&owner).context("Failed to serialize lock owner")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&serialized)?;
    file.sync_all()?;
    Ok(())
}

fn read_owner(file: &mut File) -> Result<LockOwner> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    serde_json::from_slice(&contents).context("Failed to parse lock owner")
}

#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::errno::Errno;
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(()) => Ok(true),
        Err(Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e).context("flock failed"),
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    Ok(true)
}

/// Whether `path` still names the inode `file` has open
#[cfg(unix)]
fn same_file(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(named)) => held.dev() == named.dev() && held.ino() == named.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(_file: &File, path: &Path) -> bool {
    path.exists()
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(target_os = "linux"))]
fn is_process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_is_exclusive() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let first = MaintenanceLock::acquire(root, "alice");
        assert!(first.is_ok());

        let second = MaintenanceLock::acquire(root, "bob");
        let message = second.err().unwrap().to_string();
        assert!(message.contains("alice"), "{message}");

        drop(first);
        assert!(MaintenanceLock::acquire(root, "bob").is_ok());
    }

    #[test]
    fn test_owner_reports_holder() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        assert_eq!(MaintenanceLock::owner(root), None);

        let lock = MaintenanceLock::acquire(root, "alice").unwrap();
        let owner = MaintenanceLock::owner(root).unwrap();

        assert_eq!(owner.user, "alice");
        assert_eq!(owner.pid, std::process::id());
        assert!(owner.started_at > 0);
        assert_eq!(lock.path(), lock_path(root));
    }

    #[test]
    fn test_release_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let lock = MaintenanceLock::acquire(temp_dir.path(), "alice").unwrap();
        let path = lock.path().to_path_buf();
        assert!(path.exists());

        lock.release().unwrap();

        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_held_flock_without_owner_record_is_respected() {
        use nix::fcntl::{flock, FlockArg};
        use std::os::unix::io::AsRawFd;

        let temp_dir = TempDir::new().unwrap();
        let path = lock_path(temp_dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        // A holder that has locked but not yet written its record
        let holder = File::create(&path).unwrap();
        flock(holder.as_raw_fd(), FlockArg::LockExclusiveNonblock).unwrap();

        let second = MaintenanceLock::acquire(temp_dir.path(), "bob");

        let message = second.err().unwrap().to_string();
        assert!(message.contains("unknown process"), "{message}");
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"");

        drop(holder);
        let lock = MaintenanceLock::acquire(temp_dir.path(), "bob").unwrap();
        assert_eq!(MaintenanceLock::owner(temp_dir.path()).unwrap().user, "bob");
        drop(lock);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_stale_owner_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = lock_path(temp_dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, br#"{"pid":999999,"user":"ghost","started_at":1}"#).unwrap();

        assert_eq!(MaintenanceLock::owner(temp_dir.path()), None);
        let lock = MaintenanceLock::acquire(temp_dir.path(), "alice").unwrap();
        assert_eq!(MaintenanceLock::owner(temp_dir.path()).unwrap().user, "alice");
        drop(lock);
    }
}
