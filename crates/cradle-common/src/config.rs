//! Global configuration model for the cradle daemon.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{CradleError, Result};

/// Backend used by the storage layer to materialise a container root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    /// Kernel `OverlayFS` mount of the image over a per-container diff.
    Overlay,
    /// Plain directories, no kernel mount. Works unprivileged.
    #[default]
    Vfs,
}

impl fmt::Display for StorageDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overlay => write!(f, "overlay"),
            Self::Vfs => write!(f, "vfs"),
        }
    }
}

/// Root configuration for the cradle daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CradleConfig {
    /// Base directory for all cradle state.
    pub root_dir: PathBuf,
    /// Path to the persisted container state file.
    pub state_file: PathBuf,
    /// Directory holding one exit-status file per container.
    pub exits_dir: PathBuf,
    /// Root of the storage layer's on-disk layout.
    pub storage_root: PathBuf,
    /// Root of the runtime supervisor's per-container records.
    pub runtime_root: PathBuf,
    /// Storage driver used for container root filesystems.
    pub storage_driver: StorageDriver,
    /// Grace period for explicit stops; zero or negative forces a kill.
    pub default_stop_timeout_secs: i64,
}

/// On-disk form of the configuration. Every field is optional and falls
/// back to the value derived from `root_dir`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    root_dir: Option<PathBuf>,
    state_file: Option<PathBuf>,
    exits_dir: Option<PathBuf>,
    storage_root: Option<PathBuf>,
    runtime_root: Option<PathBuf>,
    storage_driver: Option<StorageDriver>,
    default_stop_timeout_secs: Option<i64>,
}

impl CradleConfig {
    /// Derives every path from a single root directory.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root_dir = root.into();
        Self {
            state_file: root_dir.join(constants::STATE_FILE_NAME),
            exits_dir: root_dir.join(constants::EXITS_DIR_NAME),
            storage_root: root_dir.join(constants::STORAGE_DIR_NAME),
            runtime_root: root_dir.join(constants::RUNTIME_DIR_NAME),
            storage_driver: StorageDriver::default(),
            default_stop_timeout_secs: constants::DEFAULT_STOP_TIMEOUT_SECS,
            root_dir,
        }
    }

    /// Loads a JSON configuration file.
    ///
    /// Paths missing from the file are derived from its `root_dir`, or from
    /// the session data directory when `root_dir` is also absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// contains unknown keys.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CradleError::io(path, e))?;
        let file: ConfigFile = serde_json::from_str(&content)?;
        let config = Self::from_file(file);
        config.validate()?;
        Ok(config)
    }

    fn from_file(file: ConfigFile) -> Self {
        let root = file
            .root_dir
            .unwrap_or_else(|| constants::data_dir().clone());
        let mut config = Self::with_root(root);
        if let Some(p) = file.state_file {
            config.state_file = p;
        }
        if let Some(p) = file.exits_dir {
            config.exits_dir = p;
        }
        if let Some(p) = file.storage_root {
            config.storage_root = p;
        }
        if let Some(p) = file.runtime_root {
            config.runtime_root = p;
        }
        if let Some(driver) = file.storage_driver {
            config.storage_driver = driver;
        }
        if let Some(secs) = file.default_stop_timeout_secs {
            config.default_stop_timeout_secs = secs;
        }
        config
    }

    /// Checks that the directories the lifecycle core writes to are distinct.
    ///
    /// # Errors
    ///
    /// Returns [`CradleError::Config`] if two stores would share a directory.
    pub fn validate(&self) -> Result<()> {
        let dirs = [
            ("exits_dir", &self.exits_dir),
            ("storage_root", &self.storage_root),
            ("runtime_root", &self.runtime_root),
        ];
        for (i, (name, dir)) in dirs.iter().enumerate() {
            if let Some((other, _)) = dirs[i + 1..].iter().find(|(_, d)| d == dir) {
                return Err(CradleError::Config {
                    message: format!("{name} and {other} both point at {}", dir.display()),
                });
            }
        }
        Ok(())
    }
}

impl Default for CradleConfig {
    fn default() -> Self {
        Self::with_root(constants::data_dir().clone())
    }
}
