//! Storage layer error type.

use cradle_common::error::CradleError;
use cradle_common::types::ContainerId;
use thiserror::Error;

/// Errors reported by a [`StorageLayer`](crate::StorageLayer).
#[derive(Debug, Error)]
pub enum StorageError {
    /// No storage exists for the container.
    #[error("no storage for container {id}")]
    UnknownContainer {
        /// Container that was looked up.
        id: ContainerId,
    },

    /// Storage already exists for the container.
    #[error("storage for container {id} already exists")]
    AlreadyExists {
        /// Container that was being created.
        id: ContainerId,
    },

    /// The container's root is not mounted.
    ///
    /// Backends whose unmount is not naturally idempotent report this
    /// instead of succeeding; callers tearing a container down treat it
    /// as success.
    #[error("container {id} is not mounted")]
    NotMounted {
        /// Container that was being unmounted.
        id: ContainerId,
    },

    /// The container's root is still mounted.
    #[error("container {id} is still mounted")]
    StillMounted {
        /// Container that was being deleted.
        id: ContainerId,
    },

    /// A filesystem or mount operation failed.
    #[error(transparent)]
    Common(#[from] CradleError),
}

impl StorageError {
    /// Returns whether this error only says that nothing was mounted.
    #[must_use]
    pub const fn is_not_mounted(&self) -> bool {
        matches!(self, Self::NotMounted { .. })
    }
}

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
