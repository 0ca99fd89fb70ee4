//! File entity

use crate::error::{IoResultExt, Result};
use crate::path::EntityPath;
use std::fs;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// One file under a working root
///
/// Holds no state besides its path; size, mtime and existence are read live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileEntity {
    path: EntityPath,
}

impl FileEntity {
    pub fn new(relative: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            path: EntityPath::new(relative, root),
        }
    }

    pub fn from_path(path: EntityPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &EntityPath {
        &self.path
    }

    pub fn user_version(&self, user: &str) -> Self {
        Self::from_path(self.path.user_version(user))
    }

    pub fn canonical_version(&self) -> Self {
        Self::from_path(self.path.canonical_version())
    }

    /// True only for an existing regular file
    pub fn exists(&self) -> bool {
        self.absolute_path().is_file()
    }

    /// Size in bytes, 0 if the file is missing
    pub fn size(&self) -> u64 {
        fs::metadata(self.absolute_path()).map(|m| m.len()).unwrap_or(0)
    }

    /// Raw content; a missing file reads as empty
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        let absolute = self.absolute_path();
        match fs::read(&absolute) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).at(&absolute),
        }
    }

    /// Content as text with invalid UTF-8 replaced
    pub fn read_to_string(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.read_bytes()?).into_owned())
    }

    /// Binary-safe copy to an absolute destination
    ///
    /// Creates intermediate directories and overwrites an existing file.
    pub fn copy_to(&self, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        let source = self.absolute_path();
        fs::copy(&source, destination).at(&source)?;
        Ok(())
    }

    /// Copy `user`'s private version of this file over the canonical one
    ///
    /// Recording the commit in the changelog is left to the caller.
    pub fn commit(&self, user: &str) -> Result<()> {
        let canonical = self.canonical_version();
        canonical
            .user_version(user)
            .copy_to(&canonical.absolute_path())
    }

    /// Copy the canonical version over `user`'s private one
    pub fn sync(&self, user: &str) -> Result<()> {
        let canonical = self.canonical_version();
        canonical.copy_to(&canonical.user_version(user).absolute_path())
    }
}

impl Deref for FileEntity {
    type Target = EntityPath;

    fn deref(&self) -> &EntityPath {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_to_creates_parents_and_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let bytes: Vec<u8> = (0u8..=255).collect();
        fs::write(root.join("blob.bin"), &bytes).unwrap();

        let file = FileEntity::new("blob.bin", root);
        let dest = root.join("deep/er/copy.bin");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, b"old").unwrap();

        file.copy_to(&dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), bytes);
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let file = FileEntity::new("missing.yaml", temp_dir.path());

        assert!(!file.exists());
        assert_eq!(file.size(), 0);
        assert!(file.read_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_commit_and_sync() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.yaml"), b"canonical").unwrap();
        fs::create_dir_all(root.join(".users/alice")).unwrap();
        fs::write(root.join(".users/alice/a.yaml"), b"edited").unwrap();

        let file = FileEntity::new("a.yaml", root);
        file.commit("alice").unwrap();
        assert_eq!(fs::read(root.join("a.yaml")).unwrap(), b"edited");

        fs::write(root.join("a.yaml"), b"upstream").unwrap();
        // Works from the private path as well
        file.user_version("alice").sync("alice").unwrap();
        assert_eq!(fs::read(root.join(".users/alice/a.yaml")).unwrap(), b"upstream");
    }

    #[test]
    fn test_commit_missing_user_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let file = FileEntity::new("a.yaml", temp_dir.path());

        let err = file.commit("alice").unwrap_err();
        assert!(err.is_not_found());
    }
}
