//! Container removal.
//!
//! Removal runs [`RemovalStep::ORDER`] one step at a time and stops at
//! the first failure without undoing anything. The registry entry and the
//! ID index entry are the last things to go, so a container that looks
//! gone to callers never has a live process.

use std::fmt;
use std::io;

use cradle_common::types::StopTimeout;

use super::{Cancellation, Lifecycle};
use crate::container::Container;
use crate::error::{LifecycleError, Result};

/// One step of container removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalStep {
    /// Force-kill the process if it is created or running.
    Stop,
    /// Tear down the root filesystem mount.
    Unmount,
    /// Delete the supervisor's record.
    DeleteRecord,
    /// Delete the exit-status file.
    RemoveExitFile,
    /// Drop the registry entry.
    Unregister,
    /// Delete the container's storage.
    DeleteStorage,
    /// Make the name available again.
    ReleaseName,
    /// Drop the ID index entry.
    DeleteIndexEntry,
}

impl RemovalStep {
    /// Every step, in the order removal runs them.
    pub const ORDER: [Self; 8] = [
        Self::Stop,
        Self::Unmount,
        Self::DeleteRecord,
        Self::RemoveExitFile,
        Self::Unregister,
        Self::DeleteStorage,
        Self::ReleaseName,
        Self::DeleteIndexEntry,
    ];

    /// Runs this step for `container`.
    pub(crate) fn run(self, lifecycle: &Lifecycle, container: &Container) -> Result<()> {
        let id = &container.id;
        match self {
            Self::Stop => {
                let state = lifecycle.supervisor.status(id);
                if state.needs_stop() {
                    lifecycle
                        .supervisor
                        .stop(id, StopTimeout::Force)
                        .map_err(|source| LifecycleError::StopFailed {
                            id: id.clone(),
                            source,
                        })?;
                } else {
                    tracing::debug!(id = %id, %state, "no stop needed");
                }
            }
            Self::Unmount => match lifecycle.storage.unmount(id) {
                Ok(()) => {}
                Err(e) if e.is_not_mounted() => {
                    tracing::debug!(id = %id, "storage already unmounted");
                }
                Err(source) => {
                    return Err(LifecycleError::UnmountFailed {
                        id: id.clone(),
                        source,
                    });
                }
            },
            Self::DeleteRecord => {
                lifecycle
                    .supervisor
                    .delete(id)
                    .map_err(|source| LifecycleError::DeleteFailed {
                        id: id.clone(),
                        source,
                    })?;
            }
            Self::RemoveExitFile => match lifecycle.exits.remove(id) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(id = %id, "no exit file");
                }
                Err(source) => {
                    return Err(LifecycleError::ExitArtifactCleanupFailed {
                        id: id.clone(),
                        path: lifecycle.exits.path(id),
                        source,
                    });
                }
            },
            Self::Unregister => {
                let _ = lifecycle.registry.remove(id);
            }
            Self::DeleteStorage => {
                lifecycle
                    .storage
                    .delete(id)
                    .map_err(|source| LifecycleError::StorageDeleteFailed {
                        id: id.clone(),
                        source,
                    })?;
            }
            Self::ReleaseName => lifecycle.names.release(&container.name),
            Self::DeleteIndexEntry => {
                lifecycle
                    .ids
                    .delete(id)
                    .map_err(|source| LifecycleError::IndexDeleteFailed {
                        id: id.clone(),
                        source,
                    })?;
            }
        }
        tracing::debug!(id = %id, step = %self, "removal step done");
        Ok(())
    }
}

impl fmt::Display for RemovalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stop => "stop",
            Self::Unmount => "unmount",
            Self::DeleteRecord => "delete-record",
            Self::RemoveExitFile => "remove-exit-file",
            Self::Unregister => "unregister",
            Self::DeleteStorage => "delete-storage",
            Self::ReleaseName => "release-name",
            Self::DeleteIndexEntry => "delete-index-entry",
        };
        f.write_str(name)
    }
}

impl Lifecycle {
    /// Removes a container and everything it owns, killing it first if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`/`Ambiguous` for a bad identifier, or the error of
    /// the first removal step that failed. Steps completed before the
    /// failure are not undone.
    pub fn remove(&self, prefix: &str) -> Result<()> {
        self.remove_cancellable(prefix, &Cancellation::new())
    }

    /// Like [`Lifecycle::remove`], but gives up if `cancel` is set before
    /// the container is resolved.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Cancelled`] if cancelled in time, otherwise
    /// as [`Lifecycle::remove`].
    pub fn remove_cancellable(&self, prefix: &str, cancel: &Cancellation) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(LifecycleError::Cancelled {
                operation: "remove",
                id: prefix.to_owned(),
            });
        }
        let (container, guard) = self.resolve(prefix)?;
        for step in RemovalStep::ORDER {
            if let Err(e) = step.run(self, &container) {
                tracing::warn!(id = %container.id, %step, error = %e, "removal aborted");
                return Err(e);
            }
        }
        drop(guard);
        self.locks.forget(&container.id);
        tracing::info!(id = %container.id, name = %container.name, "container removed");
        Ok(())
    }
}
