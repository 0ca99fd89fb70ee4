//! Root-relative paths
//!
//! An [`EntityPath`] never stores an absolute path. Swapping or extending the
//! relative part is how a canonical path becomes a user's private path.

use crate::layout::{self, USERS_DIR};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

/// A file or directory identified by a path relative to a working root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityPath {
    relative: PathBuf,
    root: PathBuf,
}

impl EntityPath {
    pub fn new(relative: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            relative: relative.into(),
            root: root.into(),
        }
    }

    /// Build from an absolute path located under `root`
    ///
    /// Relative inputs are taken as already root-relative.
    pub fn from_absolute(root: &Path, path: &Path) -> Option<Self> {
        if path.is_relative() {
            return Some(Self::new(path, root));
        }
        path.strip_prefix(root)
            .ok()
            .map(|relative| Self::new(relative, root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative
    }

    pub fn absolute_path(&self) -> PathBuf {
        if self.relative.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(&self.relative)
        }
    }

    /// Final component of the path (the root's own name for the root itself)
    pub fn base_name(&self) -> String {
        self.absolute_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Forward-slash form of the relative path, as stored in changelogs
    pub fn relative_slash(&self) -> String {
        self.relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Same entity inside `user`'s private workspace
    ///
    /// `root/<rel>` maps to `root/.users/<user>/<rel>`. Paths that already
    /// live in some user's workspace are first mapped back to canonical.
    pub fn user_version(&self, user: &str) -> Self {
        let canonical = self.canonical_version();
        Self::new(layout::user_dir(user).join(&canonical.relative), &self.root)
    }

    /// Inverse of [`user_version`](Self::user_version)
    pub fn canonical_version(&self) -> Self {
        let mut components = self.relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(first)), Some(Component::Normal(_))) if first == USERS_DIR => {
                Self::new(components.as_path(), &self.root)
            }
            _ => self.clone(),
        }
    }

    /// Name of the user whose private workspace contains this path
    pub fn owner(&self) -> Option<String> {
        let mut components = self.relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(first)), Some(Component::Normal(user))) if first == USERS_DIR => {
                Some(user.to_string_lossy().into_owned())
            }
            _ => None,
        }
    }

    pub fn exists(&self) -> bool {
        fs::symlink_metadata(self.absolute_path()).is_ok()
    }

    /// Whether the calling process may write the path, or its nearest
    /// existing ancestor when the path does not exist yet
    pub fn is_writable(&self) -> bool {
        let absolute = self.absolute_path();
        absolute
            .ancestors()
            .find(|candidate| fs::symlink_metadata(candidate).is_ok())
            .is_some_and(can_write)
    }

    /// Last modification time in Unix milliseconds
    pub fn modified_ms(&self) -> Option<u64> {
        fs::metadata(self.absolute_path())
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
    }
}

#[cfg(unix)]
fn can_write(path: &Path) -> bool {
    use nix::unistd::{access, AccessFlags};

    access(path, AccessFlags::W_OK).is_ok()
}

#[cfg(not(unix))]
fn can_write(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| !m.permissions().readonly())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_absolute_is_root_joined_with_relative() {
        let path = EntityPath::new("cfg/model.yaml", "/data/project");
        assert_eq!(path.absolute_path(), PathBuf::from("/data/project/cfg/model.yaml"));
        assert_eq!(path.base_name(), "model.yaml");
        assert_eq!(path.relative_slash(), "cfg/model.yaml");

        let root = EntityPath::new("", "/data/project");
        assert_eq!(root.absolute_path(), PathBuf::from("/data/project"));
        assert_eq!(root.base_name(), "project");
    }

    #[test]
    fn test_user_version_mapping() {
        let path = EntityPath::new("cfg/model.yaml", "/data/project");
        let user = path.user_version("alice");

        assert_eq!(user.root(), Path::new("/data/project"));
        assert_eq!(
            user.absolute_path(),
            PathBuf::from("/data/project/.users/alice/cfg/model.yaml")
        );
        assert_eq!(user.owner().as_deref(), Some("alice"));
        assert_eq!(user.canonical_version(), path);

        // Re-mapping a private path goes through the canonical form
        assert_eq!(user.user_version("bob"), path.user_version("bob"));
    }

    #[test]
    fn test_from_absolute() {
        let root = Path::new("/data/project");
        let path = EntityPath::from_absolute(root, Path::new("/data/project/a/b.yaml")).unwrap();
        assert_eq!(path.relative_slash(), "a/b.yaml");
        assert!(EntityPath::from_absolute(root, Path::new("/elsewhere/b.yaml")).is_none());
        assert_eq!(
            EntityPath::from_absolute(root, Path::new("a/b.yaml")).unwrap(),
            path
        );
    }

    #[test]
    fn test_exists_and_writable() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.yaml"), b"x").unwrap();

        let present = EntityPath::new("a.yaml", temp_dir.path());
        let missing = EntityPath::new("nope/b.yaml", temp_dir.path());
        assert!(present.exists());
        assert!(!missing.exists());
        assert!(present.is_writable());
        // Falls back to the nearest existing ancestor
        assert!(missing.is_writable());
    }

    #[cfg(unix)]
    #[test]
    fn test_writable_agrees_with_a_real_write() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("a.yaml"), b"x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
        fs::set_permissions(locked.join("a.yaml"), fs::Permissions::from_mode(0o444)).unwrap();

        // Root may write regardless of mode bits, other users may not
        let dir_writable = fs::write(locked.join("new.yaml"), b"y").is_ok();
        let file_writable = fs::OpenOptions::new()
            .write(true)
            .open(locked.join("a.yaml"))
            .is_ok();

        let new_file = EntityPath::new("locked/deep/new.yaml", temp_dir.path());
        let existing = EntityPath::new("locked/a.yaml", temp_dir.path());
        assert_eq!(new_file.is_writable(), dir_writable);
        assert_eq!(existing.is_writable(), file_writable);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }
}
