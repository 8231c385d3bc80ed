//! # cradle-storage
//!
//! The storage layer of the cradle lifecycle core.
//!
//! Owns each container's root filesystem on disk, independently of the
//! container's process state:
//! - **Create**: lays out a writable diff seeded from an optional image.
//! - **Mount / unmount**: exposes the root at a stable path. Unmount is
//!   idempotent so an interrupted teardown can be retried.
//! - **Delete**: removes the container's storage for good. Not idempotent.
//! - **List**: enumerates containers that still have storage, which lets
//!   the orchestrator find storage leaked by a failed removal.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod error;
pub mod store;

use std::path::{Path, PathBuf};

use cradle_common::types::ContainerId;

pub use error::{Result, StorageError};
pub use store::LayerStore;

/// Operations the lifecycle orchestrator needs from a storage backend.
///
/// Implementations must be safe to call concurrently for different
/// containers. Calls for the same container are serialized by the caller.
pub trait StorageLayer: Send + Sync {
    /// Creates storage for a new container, seeded from `image` if given.
    ///
    /// # Errors
    ///
    /// Returns an error if storage already exists for `id` or cannot be
    /// created.
    fn create(&self, id: &ContainerId, image: Option<&Path>) -> Result<()>;

    /// Mounts the container's root filesystem and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the container has no storage or the mount fails.
    fn mount(&self, id: &ContainerId) -> Result<PathBuf>;

    /// Tears down the live mount. Succeeds if nothing is mounted.
    ///
    /// # Errors
    ///
    /// Returns an error if the container has no storage or the unmount
    /// itself fails.
    fn unmount(&self, id: &ContainerId) -> Result<()>;

    /// Deletes the container's storage, including its writable diff.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownContainer`] if the storage is already
    /// gone, or another error if it is still mounted or cannot be removed.
    fn delete(&self, id: &ContainerId) -> Result<()>;

    /// Lists every container that currently has storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage root cannot be read.
    fn list(&self) -> Result<Vec<ContainerId>>;
}
