//! Runtime supervisor abstraction over container process state.

pub mod process;

use std::path::{Path, PathBuf};

use cradle_common::types::{ContainerId, ContainerState, StopTimeout};

use crate::container::Container;
use crate::error::RuntimeError;

pub use process::ProcessSupervisor;

/// Owner of container process state and termination.
///
/// All calls are synchronous and may block: a stop waits for the process
/// to exit. Implementations do not retry. Calls for the same container
/// are serialized by the orchestrator; calls for different containers
/// may run concurrently.
pub trait RuntimeSupervisor: Send + Sync {
    /// Records a new container in state `Created` without running it.
    ///
    /// # Errors
    ///
    /// Returns an error if a record already exists or cannot be written.
    fn create(&self, container: &Container, rootfs: &Path) -> Result<(), RuntimeError>;

    /// Starts a created container's process and returns its PID.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown, not in `Created`
    /// state, or the process cannot be spawned.
    fn start(&self, id: &ContainerId) -> Result<u32, RuntimeError>;

    /// Returns the current process state.
    ///
    /// Never fails: a container the supervisor has no record of is
    /// [`ContainerState::Unknown`].
    fn status(&self, id: &ContainerId) -> ContainerState;

    /// Returns the PID of a running container.
    fn pid(&self, id: &ContainerId) -> Option<u32>;

    /// Stops the container's process.
    ///
    /// With [`StopTimeout::Bounded`] the process is asked to terminate and
    /// force-killed once the grace period passes. With
    /// [`StopTimeout::Force`] it is killed at once and the call waits as
    /// long as the kill takes. Stopping a container that is not running
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown or cannot be signalled.
    fn stop(&self, id: &ContainerId, timeout: StopTimeout) -> Result<(), RuntimeError>;

    /// Deletes the supervisor's record of a container that is not running.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown, still running, or
    /// its record cannot be removed.
    fn delete(&self, id: &ContainerId) -> Result<(), RuntimeError>;

    /// Returns the file the container's output is written to, if any.
    fn log_path(&self, _id: &ContainerId) -> Option<PathBuf> {
        None
    }
}
