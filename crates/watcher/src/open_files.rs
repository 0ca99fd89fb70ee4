//! Open-file list of an editing session
//!
//! Files open either as a transient preview or permanently. Opening a new file
//! replaces every preview; only permanent files accumulate.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    pub path: PathBuf,
    pub permanent: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OpenFiles {
    files: Vec<OpenFile>,
    active: Option<PathBuf>,
}

impl OpenFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open files, in opening order
    pub fn files(&self) -> &[OpenFile] {
        &self.files
    }

    pub fn active(&self) -> Option<&Path> {
        self.active.as_deref()
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.position(path).is_some()
    }

    /// Open `path` and make it active
    ///
    /// Reopening an already open file only activates it; if that file is a
    /// preview, the other previews are closed.
    pub fn open(&mut self, path: impl Into<PathBuf>, permanent: bool) {
        let path = path.into();
        match self.position(&path) {
            Some(index) => {
                if !self.files[index].permanent {
                    self.files.retain(|f| f.permanent || f.path == path);
                }
            }
            None => {
                self.files.retain(|f| f.permanent);
                self.files.push(OpenFile {
                    path: path.clone(),
                    permanent,
                });
            }
        }
        self.active = Some(path);
    }

    /// Activate an open file; false if it is not open
    pub fn activate(&mut self, path: &Path) -> bool {
        if !self.is_open(path) {
            return false;
        }
        self.active = Some(path.to_path_buf());
        true
    }

    /// Turn a preview into a permanently open file
    pub fn pin(&mut self, path: &Path) -> bool {
        match self.position(path) {
            Some(index) => {
                self.files[index].permanent = true;
                true
            }
            None => false,
        }
    }

    /// Follow a file rename
    pub fn rename(&mut self, from: &Path, to: &Path) {
        for file in self.files.iter_mut().filter(|f| f.path == from) {
            file.path = to.to_path_buf();
        }
        if self.active.as_deref() == Some(from) {
            self.active = Some(to.to_path_buf());
        }
    }

    /// Follow a directory rename for every open file below it
    pub fn rename_directory(&mut self, from: &Path, to: &Path) {
        let moved = |path: &Path| -> Option<PathBuf> {
            path.strip_prefix(from).ok().map(|rest| to.join(rest))
        };
        for file in &mut self.files {
            if let Some(path) = moved(&file.path) {
                file.path = path;
            }
        }
        if let Some(path) = self.active.as_deref().and_then(moved) {
            self.active = Some(path);
        }
    }

    /// Close `path`; false if it was not open
    ///
    /// Closing the active file activates the one opened just before it, or
    /// the last remaining file if the closed one was first.
    pub fn close(&mut self, path: &Path) -> bool {
        let Some(index) = self.position(path) else {
            return false;
        };
        self.files.remove(index);

        if self.active.as_deref() == Some(path) {
            self.active = if self.files.is_empty() {
                None
            } else if index == 0 {
                self.files.last().map(|f| f.path.clone())
            } else {
                Some(self.files[index - 1].path.clone())
            };
        }
        true
    }

    pub fn close_all(&mut self) {
        self.files.clear();
        self.active = None;
    }

    fn position(&self, path: &Path) -> Option<usize> {
        self.files.iter().position(|f| f.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(open: &OpenFiles) -> Vec<&str> {
        open.files()
            .iter()
            .map(|f| f.path.to_str().unwrap())
            .collect()
    }

    fn three_pinned() -> OpenFiles {
        let mut open = OpenFiles::new();
        open.open("a.yaml", true);
        open.open("b.yaml", true);
        open.open("c.yaml", true);
        open
    }

    #[test]
    fn test_preview_is_replaced() {
        let mut open = OpenFiles::new();
        open.open("a.yaml", true);
        open.open("b.yaml", false);
        open.open("c.yaml", false);

        assert_eq!(paths(&open), vec!["a.yaml", "c.yaml"]);
        assert_eq!(open.active(), Some(Path::new("c.yaml")));
    }

    #[test]
    fn test_reopen_activates_without_duplicating() {
        let mut open = three_pinned();
        open.open("a.yaml", false);

        assert_eq!(paths(&open), vec!["a.yaml", "b.yaml", "c.yaml"]);
        assert_eq!(open.active(), Some(Path::new("a.yaml")));
        assert!(open.files()[0].permanent);
    }

    #[test]
    fn test_pin_keeps_file_open() {
        let mut open = OpenFiles::new();
        open.open("a.yaml", false);
        assert!(open.pin(Path::new("a.yaml")));
        open.open("b.yaml", false);

        assert_eq!(paths(&open), vec!["a.yaml", "b.yaml"]);
        assert!(!open.pin(Path::new("zzz.yaml")));
    }

    #[test]
    fn test_close_active_selects_previous() {
        let mut open = three_pinned();
        open.activate(Path::new("b.yaml"));

        assert!(open.close(Path::new("b.yaml")));

        assert_eq!(open.active(), Some(Path::new("a.yaml")));
    }

    #[test]
    fn test_close_first_active_selects_last() {
        let mut open = three_pinned();
        open.activate(Path::new("a.yaml"));

        open.close(Path::new("a.yaml"));

        assert_eq!(open.active(), Some(Path::new("c.yaml")));
    }

    #[test]
    fn test_close_inactive_keeps_active() {
        let mut open = three_pinned();

        open.close(Path::new("a.yaml"));

        assert_eq!(open.active(), Some(Path::new("c.yaml")));
        assert!(!open.close(Path::new("a.yaml")));
    }

    #[test]
    fn test_close_last_file_clears_active() {
        let mut open = OpenFiles::new();
        open.open("a.yaml", true);

        open.close(Path::new("a.yaml"));

        assert_eq!(open.active(), None);
        assert!(open.files().is_empty());
    }

    #[test]
    fn test_renames_follow_files() {
        let mut open = OpenFiles::new();
        open.open("cfg/a.yaml", true);
        open.open("cfg/deep/b.yaml", true);
        open.open("cfgx/c.yaml", true);

        open.rename(Path::new("cfgx/c.yaml"), Path::new("cfgx/d.yaml"));
        open.rename_directory(Path::new("cfg"), Path::new("conf"));

        assert_eq!(paths(&open), vec!["conf/a.yaml", "conf/deep/b.yaml", "cfgx/d.yaml"]);
        assert_eq!(open.active(), Some(Path::new("cfgx/d.yaml")));

        open.close_all();
        assert!(open.files().is_empty());
        assert_eq!(open.active(), None);
    }
}
