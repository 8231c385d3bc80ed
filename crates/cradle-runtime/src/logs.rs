//! Container output logs.
//!
//! The supervisor points a container's stdout and stderr at a log file
//! next to its runtime record.

use std::fs::File;
use std::path::{Path, PathBuf};

use cradle_common::error::{CradleError, Result};
use cradle_common::types::ContainerId;

const LOG_FILE_NAME: &str = "container.log";

/// Returns the log file path for a container under a runtime root.
#[must_use]
pub fn log_path(runtime_root: &Path, id: &ContainerId) -> PathBuf {
    runtime_root.join(id.as_str()).join(LOG_FILE_NAME)
}

/// Reads a container log.
///
/// Returns an empty string if the log file does not exist yet.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_logs(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(CradleError::io(path, e)),
    }
}

/// Opens a log file for appending, creating it and its directory.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created.
pub fn open_for_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CradleError::io(parent, e))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CradleError::io(path, e))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn log_path_is_constructed_correctly() {
        let p = log_path(Path::new("/var/lib/cradle/runtime"), &ContainerId::new("abc-123"));
        assert_eq!(
            p.to_str().unwrap(),
            "/var/lib/cradle/runtime/abc-123/container.log"
        );
    }

    #[test]
    fn read_logs_missing_file_returns_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let content = read_logs(&dir.path().join("absent.log")).expect("should succeed");
        assert!(content.is_empty());
    }

    #[test]
    fn append_and_read_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = log_path(dir.path(), &ContainerId::new("c1"));
        writeln!(open_for_append(&path).expect("open 1"), "line one").expect("write 1");
        writeln!(open_for_append(&path).expect("open 2"), "line two").expect("write 2");

        let content = read_logs(&path).expect("read");
        assert_eq!(content, "line one\nline two\n");
    }

    #[test]
    fn separate_containers_have_separate_logs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = log_path(dir.path(), &ContainerId::new("a"));
        let b = log_path(dir.path(), &ContainerId::new("b"));
        writeln!(open_for_append(&a).expect("open a"), "from a").expect("write a");
        writeln!(open_for_append(&b).expect("open b"), "from b").expect("write b");

        let a_logs = read_logs(&a).expect("read a");
        assert!(a_logs.contains("from a"));
        assert!(!a_logs.contains("from b"));
    }
}
