//! Domain primitive types used across the cradle workspace.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length of the abbreviated ID shown in listings.
pub const SHORT_ID_LENGTH: usize = 12;

/// Unique identifier for a container instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from an existing string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random 64-character lowercase hex container ID.
    #[must_use]
    pub fn generate() -> Self {
        let high = uuid::Uuid::new_v4().simple().to_string();
        let low = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{high}{low}"))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the abbreviated form used in human-facing output.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..SHORT_ID_LENGTH).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-level lifecycle state of a container.
///
/// The authoritative value is owned by the runtime supervisor; other
/// components only read it to decide what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Container has been created but its process has not been started.
    Created,
    /// The supervised process is believed to be alive.
    Running,
    /// The process has exited or was stopped.
    Stopped,
    /// The supervisor holds no record for the container.
    Unknown,
}

impl ContainerState {
    /// Returns whether a stop is required before the container can be torn down.
    #[must_use]
    pub const fn needs_stop(self) -> bool {
        matches!(self, Self::Created | Self::Running)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// How long a stop request may wait before it is considered failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTimeout {
    /// Ask the process to terminate, then force-kill after the grace period.
    Bounded(Duration),
    /// Force-kill immediately and wait as long as the kill takes.
    Force,
}

impl StopTimeout {
    /// Converts a signed seconds value, where zero or less means [`Self::Force`].
    #[must_use]
    pub fn from_secs(secs: i64) -> Self {
        u64::try_from(secs)
            .ok()
            .filter(|s| *s > 0)
            .map_or(Self::Force, |s| Self::Bounded(Duration::from_secs(s)))
    }
}

impl fmt::Display for StopTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(d) => write!(f, "{}s", d.as_secs_f64()),
            Self::Force => write!(f, "force"),
        }
    }
}

/// Last known exit status of a container's process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    /// Exit code, `128 + signal` for processes killed by a signal.
    pub code: i32,
    /// When the exit was recorded.
    pub exited_at: DateTime<Utc>,
}
