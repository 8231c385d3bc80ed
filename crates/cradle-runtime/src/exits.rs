//! Persisted exit status of container processes.
//!
//! One file per container under the exits directory, named by full ID.
//! The file holds the decimal exit code; its modification time is the
//! exit time. A missing file means no exit has been recorded.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use cradle_common::error::{CradleError, Result};
use cradle_common::types::{ContainerId, ExitInfo};

/// Directory of exit-status files.
#[derive(Debug, Clone)]
pub struct ExitStore {
    dir: PathBuf,
}

impl ExitStore {
    /// Uses `dir` for exit-status files. The directory is created on the
    /// first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the exits directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the exit-status file path for a container.
    #[must_use]
    pub fn path(&self, id: &ContainerId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    /// Records an exit code, replacing any earlier record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn record(&self, id: &ContainerId, code: i32) -> Result<()> {
        cradle_common::fs::write_atomic(&self.path(id), code.to_string().as_bytes())?;
        tracing::debug!(id = %id, code, "exit status recorded");
        Ok(())
    }

    /// Reads the recorded exit, or `Ok(None)` if nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or does not
    /// hold an integer.
    pub fn read(&self, id: &ContainerId) -> Result<Option<ExitInfo>> {
        let path = self.path(id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CradleError::io(path, e)),
        };
        let code = content.trim().parse::<i32>().map_err(|e| CradleError::Config {
            message: format!("malformed exit file {}: {e}", path.display()),
        })?;
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(|e| CradleError::io(&path, e))?;
        Ok(Some(ExitInfo {
            code,
            exited_at: DateTime::<Utc>::from(modified),
        }))
    }

    /// Deletes the exit-status file.
    ///
    /// The raw I/O error is returned so the caller decides whether a
    /// missing file matters.
    ///
    /// # Errors
    ///
    /// Returns the error from `remove_file`, including `NotFound`.
    pub fn remove(&self, id: &ContainerId) -> io::Result<()> {
        std::fs::remove_file(self.path(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ExitStore::new(dir.path().join("exits"));
        let id = ContainerId::new("c1");

        store.record(&id, 137).expect("record");
        let info = store.read(&id).expect("read").expect("present");
        assert_eq!(info.code, 137);
        assert!(info.exited_at <= Utc::now());
    }

    #[test]
    fn read_of_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ExitStore::new(dir.path());
        assert!(store.read(&ContainerId::new("c1")).expect("read").is_none());
    }

    #[test]
    fn read_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ExitStore::new(dir.path());
        let id = ContainerId::new("c1");
        std::fs::write(store.path(&id), "not a number").expect("write");
        assert!(store.read(&id).is_err());
    }

    #[test]
    fn remove_reports_missing_file_as_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ExitStore::new(dir.path());
        let err = store.remove(&ContainerId::new("c1")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn path_is_dir_plus_full_id() {
        let store = ExitStore::new("/run/cradle/exits");
        assert_eq!(
            store.path(&ContainerId::new("abc")),
            PathBuf::from("/run/cradle/exits/abc")
        );
    }
}
