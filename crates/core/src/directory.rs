//! Directory entity and the File/Directory variant

use crate::error::{CoreError, IoResultExt, Result};
use crate::file::FileEntity;
use crate::layout::is_hidden;
use crate::path::EntityPath;
use std::fs;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// One directory under a working root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryEntity {
    path: EntityPath,
}

/// Enumeration result: either a file or a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    File(FileEntity),
    Directory(DirectoryEntity),
}

impl Entity {
    pub fn path(&self) -> &EntityPath {
        match self {
            Entity::File(file) => file.path(),
            Entity::Directory(dir) => dir.path(),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Entity::File(_))
    }
}

impl DirectoryEntity {
    pub fn new(relative: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            path: EntityPath::new(relative, root),
        }
    }

    /// The working root itself
    pub fn at_root(root: impl Into<PathBuf>) -> Self {
        Self::new(PathBuf::new(), root)
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

    /// True only for an existing directory
    pub fn exists(&self) -> bool {
        self.absolute_path().is_dir()
    }

    /// Idempotent recursive creation
    pub fn make_if_not_exists(&self) -> Result<()> {
        let absolute = self.absolute_path();
        fs::create_dir_all(&absolute).at(&absolute)
    }

    /// Children of this directory, hidden entries excluded at every level
    ///
    /// Pre-order, siblings sorted by name, so a directory always precedes its
    /// content. Entities keep this directory's root. A missing directory
    /// yields an empty list.
    pub fn content(&self, recursive: bool) -> Result<Vec<Entity>> {
        let mut entities = Vec::new();
        for entry in self.walk(recursive) {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(self.path.root())
                .map_err(|_| CoreError::InvalidPath(entry.path().display().to_string()))?
                .to_path_buf();
            let path = EntityPath::new(relative, self.path.root());
            if entry.file_type().is_dir() {
                entities.push(Entity::Directory(DirectoryEntity::from_path(path)));
            } else {
                entities.push(Entity::File(FileEntity::from_path(path)));
            }
        }
        Ok(entities)
    }

    /// Number of files (not directories) below this directory
    pub fn count_files(&self, recursive: bool) -> usize {
        self.walk(recursive)
            .filter_map(|entry| entry.ok())
            .filter(|entry| !entry.file_type().is_dir())
            .count()
    }

    fn walk(&self, recursive: bool) -> Box<dyn Iterator<Item = Result<DirEntry>>> {
        let absolute = self.absolute_path();
        if !absolute.is_dir() {
            return Box::new(std::iter::empty());
        }
        let walker = WalkDir::new(&absolute)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(&e.file_name().to_string_lossy()));

        Box::new(walker.filter_map(|entry| match entry {
            Ok(entry) => Some(Ok(entry)),
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                let source = io::Error::from(e);
                // Entries deleted mid-walk are not an error
                if source.kind() == io::ErrorKind::NotFound {
                    None
                } else {
                    Some(Err(CoreError::io(path, source)))
                }
            }
        }))
    }
}

impl Deref for DirectoryEntity {
    type Target = EntityPath;

    fn deref(&self) -> &EntityPath {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("b/nested")).unwrap();
        fs::create_dir_all(root.join(".users/alice")).unwrap();
        fs::create_dir_all(root.join("b/.cache")).unwrap();
        fs::write(root.join("a.yaml"), b"a").unwrap();
        fs::write(root.join("b/c.yaml"), b"c").unwrap();
        fs::write(root.join("b/nested/d.yaml"), b"d").unwrap();
        fs::write(root.join("b/.cache/x"), b"x").unwrap();
        fs::write(root.join(".changelog"), b"{}").unwrap();
        fs::write(root.join(".users/alice/a.yaml"), b"a").unwrap();
        temp_dir
    }

    fn relatives(entities: &[Entity]) -> Vec<String> {
        entities.iter().map(|e| e.path().relative_slash()).collect()
    }

    #[test]
    fn test_content_one_level() {
        let temp_dir = fixture();
        let root = DirectoryEntity::at_root(temp_dir.path());

        let content = root.content(false).unwrap();
        assert_eq!(relatives(&content), vec!["a.yaml", "b"]);
        assert!(content[0].is_file());
        assert!(!content[1].is_file());
    }

    #[test]
    fn test_content_recursive_excludes_hidden_and_is_preorder() {
        let temp_dir = fixture();
        let root = DirectoryEntity::at_root(temp_dir.path());

        let content = root.content(true).unwrap();
        assert_eq!(
            relatives(&content),
            vec!["a.yaml", "b", "b/c.yaml", "b/nested", "b/nested/d.yaml"]
        );
    }

    #[test]
    fn test_count_files() {
        let temp_dir = fixture();
        let root = DirectoryEntity::at_root(temp_dir.path());

        assert_eq!(root.count_files(false), 1);
        assert_eq!(root.count_files(true), 3);
        assert_eq!(DirectoryEntity::new("b", temp_dir.path()).count_files(true), 2);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let missing = DirectoryEntity::new("nope", temp_dir.path());

        assert!(!missing.exists());
        assert!(missing.content(true).unwrap().is_empty());
        assert_eq!(missing.count_files(true), 0);
    }

    #[test]
    fn test_make_if_not_exists_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let dir = DirectoryEntity::new("x/y/z", temp_dir.path()).user_version("alice");

        dir.make_if_not_exists().unwrap();
        dir.make_if_not_exists().unwrap();
        assert!(temp_dir.path().join(".users/alice/x/y/z").is_dir());
    }
}
