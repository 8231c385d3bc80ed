//! The container entity and its creation and status views.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cradle_common::types::{ContainerId, ContainerState, ExitInfo};
use serde::{Deserialize, Serialize};

/// A container known to this daemon.
///
/// Immutable once registered. Process state is owned by the runtime
/// supervisor and is not duplicated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Unique identifier.
    pub id: ContainerId,
    /// Human-readable name, unique among live containers.
    pub name: String,
    /// Image directory the root filesystem was seeded from.
    pub image: Option<PathBuf>,
    /// Command to execute inside the container.
    pub command: Vec<String>,
    /// Environment variables passed to the process.
    pub env: Vec<(String, String)>,
    /// Path the root filesystem is mounted at.
    pub rootfs: PathBuf,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Container {
    /// Builds the entity for a freshly provisioned container.
    #[must_use]
    pub fn new(id: ContainerId, spec: ContainerSpec, rootfs: PathBuf) -> Self {
        Self {
            id,
            name: spec.name,
            image: spec.image,
            command: spec.command,
            env: spec.env,
            rootfs,
            created_at: Utc::now(),
        }
    }
}

/// What a caller asks for when creating a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Requested name.
    pub name: String,
    /// Optional image directory to seed the root filesystem from.
    pub image: Option<PathBuf>,
    /// Command to execute inside the container.
    pub command: Vec<String>,
    /// Environment variables passed to the process.
    pub env: Vec<(String, String)>,
}

impl ContainerSpec {
    /// Creates a spec with the given name and nothing else set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the image directory.
    #[must_use]
    pub fn image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image = Some(path.into());
        self
    }

    /// Sets the command to run inside the container.
    #[must_use]
    pub fn command<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = cmd.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Point-in-time view of a container, as answered by a status query.
#[derive(Debug, Clone)]
pub struct ContainerStatus {
    /// The registered entity.
    pub container: Arc<Container>,
    /// Current process state, as reported by the supervisor.
    pub state: ContainerState,
    /// PID of the container process, while running.
    pub pid: Option<u32>,
    /// Last recorded exit, once the process has stopped.
    pub exit: Option<ExitInfo>,
    /// File the container's output is written to.
    pub log_path: Option<PathBuf>,
}
