//! Persistent state management.
//!
//! Keeps a JSON file of every live container so the registry, names, and
//! ID index can be rebuilt by a later process. Process state is not
//! stored here; the supervisor keeps its own records.

use std::path::Path;

use cradle_common::error::Result;
use serde::{Deserialize, Serialize};

use crate::container::Container;

/// Contents of the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    /// Every live container, oldest first.
    #[serde(default)]
    pub containers: Vec<Container>,
}

/// Loads the state file. A missing file is an empty state.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_state(path: &Path) -> Result<StateFile> {
    tracing::debug!(path = %path.display(), "loading state");
    Ok(cradle_common::fs::read_json(path)?.unwrap_or_default())
}

/// Writes the state file atomically.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_state(path: &Path, state: &StateFile) -> Result<()> {
    tracing::debug!(path = %path.display(), containers = state.containers.len(), "saving state");
    cradle_common::fs::write_json(path, state)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use cradle_common::types::ContainerId;

    use super::*;
    use crate::container::ContainerSpec;

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = load_state(&dir.path().join("state.json")).expect("load");
        assert!(state.containers.is_empty());
    }

    #[test]
    fn saved_state_loads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        let spec = ContainerSpec::new("web")
            .command(["sleep", "30"])
            .env("MODE", "test");
        let state = StateFile {
            containers: vec![Container::new(
                ContainerId::new("c1"),
                spec,
                PathBuf::from("/rootfs"),
            )],
        };
        save_state(&path, &state).expect("save");
        assert_eq!(load_state(&path).expect("load"), state);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").expect("write");
        assert!(load_state(&path).is_err());
    }
}
