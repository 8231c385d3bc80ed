//! Error types for the lifecycle core.
//!
//! [`LifecycleError`] is what callers of the orchestrator see. Its
//! teardown variants name the step that failed; the collaborator errors
//! ([`RuntimeError`], [`IndexError`], and the storage layer's
//! `StorageError`) are kept as their source.

use std::path::PathBuf;

use cradle_common::error::CradleError;
use cradle_common::types::{ContainerId, ContainerState};
use cradle_storage::StorageError;
use thiserror::Error;

/// Errors reported by a [`RuntimeSupervisor`](crate::supervisor::RuntimeSupervisor).
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The supervisor holds no record for the container.
    #[error("no runtime record for container {id}")]
    UnknownContainer {
        /// Container that was looked up.
        id: ContainerId,
    },

    /// A record already exists for the container.
    #[error("runtime record for container {id} already exists")]
    AlreadyExists {
        /// Container that was being created.
        id: ContainerId,
    },

    /// The operation is not valid in the container's current state.
    #[error("container {id} is {state}")]
    InvalidState {
        /// Container the operation targeted.
        id: ContainerId,
        /// State the container was in.
        state: ContainerState,
    },

    /// The container has no command to run.
    #[error("container {id} has an empty command")]
    EmptyCommand {
        /// Container being started.
        id: ContainerId,
    },

    /// The container process could not be spawned.
    #[error("failed to spawn process for container {id}: {source}")]
    Spawn {
        /// Container being started.
        id: ContainerId,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A filesystem, signal, or serialization operation failed.
    #[error(transparent)]
    Common(#[from] CradleError),
}

/// Errors reported by the name and ID index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// An empty ID or prefix was given.
    #[error("empty container ID or prefix")]
    Empty,

    /// The ID contains characters the index does not accept.
    #[error("invalid container ID {id:?}")]
    InvalidId {
        /// Rejected ID.
        id: String,
    },

    /// The ID is already indexed.
    #[error("container ID {id} is already indexed")]
    Duplicate {
        /// ID that was added twice.
        id: ContainerId,
    },

    /// No indexed ID matches.
    #[error("no container matches {prefix}")]
    NotFound {
        /// Prefix that was looked up.
        prefix: String,
    },

    /// More than one indexed ID starts with the prefix.
    #[error("container prefix {prefix} is ambiguous")]
    Ambiguous {
        /// Prefix that was looked up.
        prefix: String,
    },

    /// The ID to delete is not in the index.
    #[error("container ID {id} is not indexed")]
    NotIndexed {
        /// ID that was being deleted.
        id: ContainerId,
    },

    /// The container name does not match the allowed pattern.
    #[error("invalid container name {name:?}: must match [a-zA-Z0-9][a-zA-Z0-9_.-]*")]
    InvalidName {
        /// Rejected name.
        name: String,
    },

    /// The name is reserved by another container.
    #[error("name {name} is already in use by container {holder}")]
    NameInUse {
        /// Requested name.
        name: String,
        /// Container currently holding the name.
        holder: ContainerId,
    },
}

/// Errors surfaced by lifecycle operations.
///
/// Teardown variants are fatal: the operation stops at the step that
/// produced them and earlier steps are not rolled back.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No live container matches the identifier.
    #[error("container {id} not found")]
    NotFound {
        /// Identifier or prefix given by the caller.
        id: String,
    },

    /// The prefix matches more than one container.
    #[error("container ID prefix {prefix} is ambiguous")]
    Ambiguous {
        /// Prefix given by the caller.
        prefix: String,
    },

    /// The request was cancelled before it started.
    #[error("{operation} of {id} was cancelled before it started")]
    Cancelled {
        /// Operation that was cancelled.
        operation: &'static str,
        /// Identifier given by the caller.
        id: String,
    },

    /// The operation is not valid in the container's current state.
    #[error("cannot {operation} container {id}: it is {state}")]
    InvalidState {
        /// Operation that was refused.
        operation: &'static str,
        /// Container the operation targeted.
        id: ContainerId,
        /// State the container was in.
        state: ContainerState,
    },

    /// The requested name or the generated ID could not be reserved.
    #[error(transparent)]
    Reservation(IndexError),

    /// Storage for a new container could not be created.
    #[error("failed to create storage for container {id}: {source}")]
    StorageCreateFailed {
        /// Container being created.
        id: ContainerId,
        /// Storage layer error.
        source: StorageError,
    },

    /// The root filesystem of a new container could not be mounted.
    #[error("failed to mount container {id}: {source}")]
    MountFailed {
        /// Container being created.
        id: ContainerId,
        /// Storage layer error.
        source: StorageError,
    },

    /// The runtime supervisor rejected a new container.
    #[error("failed to create container {id}: {source}")]
    CreateFailed {
        /// Container being created.
        id: ContainerId,
        /// Supervisor error.
        source: RuntimeError,
    },

    /// The container process could not be started.
    #[error("failed to start container {id}: {source}")]
    StartFailed {
        /// Container being started.
        id: ContainerId,
        /// Supervisor error.
        source: RuntimeError,
    },

    /// The container process could not be terminated.
    #[error("failed to stop container {id}: {source}")]
    StopFailed {
        /// Container being stopped.
        id: ContainerId,
        /// Supervisor error.
        source: RuntimeError,
    },

    /// The container's root filesystem could not be unmounted.
    #[error("failed to unmount container {id}: {source}")]
    UnmountFailed {
        /// Container being removed.
        id: ContainerId,
        /// Storage layer error.
        source: StorageError,
    },

    /// The supervisor could not delete its record of the container.
    #[error("failed to delete container {id}: {source}")]
    DeleteFailed {
        /// Container being removed.
        id: ContainerId,
        /// Supervisor error.
        source: RuntimeError,
    },

    /// The exit-status file exists but could not be deleted.
    #[error("failed to remove container exit file {}: {source}", path.display())]
    ExitArtifactCleanupFailed {
        /// Container being removed.
        id: ContainerId,
        /// Exit-status file that could not be deleted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The container's storage could not be deleted after it was unregistered.
    #[error("failed to delete storage for container {id}: {source}")]
    StorageDeleteFailed {
        /// Container being removed.
        id: ContainerId,
        /// Storage layer error.
        source: StorageError,
    },

    /// The container ID could not be deleted from the index.
    #[error("failed to delete container {id} from the ID index: {source}")]
    IndexDeleteFailed {
        /// Container being removed.
        id: ContainerId,
        /// Index error.
        source: IndexError,
    },

    /// The storage layer could not be opened.
    #[error("failed to open storage at {}: {source}", root.display())]
    StorageOpenFailed {
        /// Configured storage root.
        root: PathBuf,
        /// Storage layer error.
        source: StorageError,
    },

    /// The storage layer could not enumerate container storage.
    #[error("failed to list container storage: {source}")]
    StorageListFailed {
        /// Storage layer error.
        source: StorageError,
    },

    /// Reading persisted state, exit status, or logs failed.
    #[error(transparent)]
    Common(#[from] CradleError),

    /// The worker running a request panicked or was aborted.
    #[error("worker running {operation} did not complete: {source}")]
    Worker {
        /// Operation the worker was running.
        operation: &'static str,
        /// Join failure.
        source: tokio::task::JoinError,
    },
}

impl LifecycleError {
    /// Returns whether the error means "no such container".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Maps an index lookup failure onto the caller-facing taxonomy.
    pub(crate) fn from_lookup(id: &str, err: IndexError) -> Self {
        match err {
            IndexError::Ambiguous { prefix } => Self::Ambiguous { prefix },
            _ => Self::NotFound { id: id.to_owned() },
        }
    }
}

/// Result alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;
