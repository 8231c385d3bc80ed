//! Small filesystem helpers shared by every on-disk store.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CradleError, Result};

/// Writes `contents` to `path` so readers never observe a partial file.
///
/// The data goes to a sibling temporary file first and is then renamed
/// over the target. Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if the directory, the temporary file, or the rename
/// fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CradleError::io(parent, e))?;
    }
    let tmp = temp_sibling(path);
    std::fs::write(&tmp, contents).map_err(|e| CradleError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        CradleError::io(path, e)
    })
}

/// Serializes `value` as pretty JSON and writes it atomically.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &body)
}

/// Reads a JSON document, returning `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CradleError::io(path, e)),
    }
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_sibling(path: &Path) -> PathBuf {
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp-{}-{seq}", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parents_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("value");
        write_atomic(&path, b"42").expect("write");

        assert_eq!(std::fs::read_to_string(&path).expect("read"), "42");
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .expect("read_dir")
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn read_json_of_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let value: Option<Vec<u32>> = read_json(&dir.path().join("absent.json")).expect("read");
        assert!(value.is_none());
    }

    #[test]
    fn json_survives_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("v.json");
        write_json(&path, &vec![1, 2]).expect("first write");
        write_json(&path, &vec![3]).expect("second write");
        let value: Option<Vec<u32>> = read_json(&path).expect("read");
        assert_eq!(value, Some(vec![3]));
    }
}
