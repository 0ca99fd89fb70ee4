//! Changelog documents as persisted on disk
//!
//! A document is only trusted after a structural check: it must be a JSON
//! object carrying `created`, `directory`, `modified` and an array `log`.
//! Anything else is treated exactly like a missing file.

use crate::error::{JournalError, Result};
use crate::record::CommitRecord;
use cowork_core::layout::{self, CHANGELOG_FILE};
use cowork_core::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogDocument {
    /// Unix milliseconds
    pub created: u64,
    pub directory: String,
    /// Unix milliseconds of the last append
    pub modified: u64,
    /// Oldest first
    pub log: Vec<CommitRecord>,
}

/// Path of the changelog file inside a root or snapshot directory
pub fn changelog_path(dir: &Path) -> PathBuf {
    dir.join(CHANGELOG_FILE)
}

impl ChangelogDocument {
    /// Empty document for `directory`, stamped now
    pub fn fresh(directory: &Path) -> Self {
        let now = layout::now_ms();
        Self {
            created: now,
            directory: directory.display().to_string(),
            modified: now,
            log: Vec::new(),
        }
    }

    /// Structural validity check applied before trusting on-disk content
    pub fn is_well_formed(value: &Value) -> bool {
        let Some(object) = value.as_object() else {
            return false;
        };
        object.get("created").is_some_and(Value::is_number)
            && object.get("directory").is_some_and(Value::is_string)
            && object.get("modified").is_some_and(Value::is_number)
            && object.get("log").is_some_and(Value::is_array)
    }

    /// Decode bytes, `None` if they are not a well-formed document
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(bytes).ok()?;
        if !Self::is_well_formed(&value) {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Read a document, `None` if the file is absent or malformed
    pub fn read(path: &Path) -> Result<Option<Self>> {
        match fs::read(path) {
            Ok(bytes) => {
                let parsed = Self::parse(&bytes);
                if parsed.is_none() {
                    debug!(path = %path.display(), "changelog is malformed");
                }
                Ok(parsed)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::io(path, e).into()),
        }
    }

    /// Atomically persist the document
    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec(self).map_err(|source| JournalError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        layout::atomic_write(path, &bytes)?;
        Ok(())
    }

    /// Load the live changelog of `root`, creating it when absent or malformed
    ///
    /// A malformed file is moved aside to `.changelog.malformed-<ms>` before
    /// being replaced.
    pub fn load_or_create(root: &Path) -> Result<Self> {
        let path = changelog_path(root);
        if let Some(document) = Self::read(&path)? {
            return Ok(document);
        }

        if path.exists() {
            let backup = root.join(format!("{CHANGELOG_FILE}.malformed-{}", layout::now_ms()));
            warn!(
                path = %path.display(),
                backup = %backup.display(),
                "replacing malformed changelog"
            );
            fs::rename(&path, &backup).map_err(|e| CoreError::io(&path, e))?;
        }

        let document = Self::fresh(root);
        document.write(&path)?;
        Ok(document)
    }
}
