//! The lifecycle orchestrator.
//!
//! [`Lifecycle`] owns the in-memory stores and drives the supervisor and
//! storage layer through create, start, stop, and remove. Every operation
//! on an existing container resolves the identifier and then holds that
//! container's lock until it finishes.

mod remove;
mod sweep;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cradle_common::config::CradleConfig;
use cradle_common::types::{ContainerId, ContainerState, StopTimeout};
use cradle_storage::{LayerStore, StorageLayer};

use crate::container::{Container, ContainerSpec, ContainerStatus};
use crate::error::{LifecycleError, Result};
use crate::exits::ExitStore;
use crate::index::{IdIndex, NameRegistry, validate_name};
use crate::locks::{ContainerGuard, LockTable};
use crate::logs;
use crate::registry::Registry;
use crate::supervisor::{ProcessSupervisor, RuntimeSupervisor};

pub use remove::RemovalStep;
pub use sweep::SweepReport;

/// Cancellation flag shared between a caller and a pending request.
///
/// Only honoured before an operation resolves its container. Once
/// teardown has begun it runs to the end.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// Creates a flag that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How far provisioning of a new container got, for compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Provisioned {
    Index,
    Storage,
    Mount,
}

/// Orchestrates container lifecycles across all backing stores.
pub struct Lifecycle {
    registry: Registry,
    ids: IdIndex,
    names: NameRegistry,
    locks: LockTable,
    exits: ExitStore,
    supervisor: Arc<dyn RuntimeSupervisor>,
    storage: Arc<dyn StorageLayer>,
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("containers", &self.registry.len())
            .field("exits", &self.exits)
            .finish_non_exhaustive()
    }
}

impl Lifecycle {
    /// Creates an orchestrator over the given collaborators with empty
    /// in-memory state.
    #[must_use]
    pub fn new(
        supervisor: Arc<dyn RuntimeSupervisor>,
        storage: Arc<dyn StorageLayer>,
        exits: ExitStore,
    ) -> Self {
        Self {
            registry: Registry::new(),
            ids: IdIndex::new(),
            names: NameRegistry::new(),
            locks: LockTable::new(),
            exits,
            supervisor,
            storage,
        }
    }

    /// Builds an orchestrator with the on-disk collaborators described by
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the storage
    /// root cannot be opened.
    pub fn open(config: &CradleConfig) -> Result<Self> {
        config.validate()?;
        let storage = LayerStore::open(&config.storage_root, config.storage_driver).map_err(
            |source| LifecycleError::StorageOpenFailed {
                root: config.storage_root.clone(),
                source,
            },
        )?;
        let exits = ExitStore::new(&config.exits_dir);
        let supervisor = ProcessSupervisor::new(&config.runtime_root, exits.clone());
        tracing::debug!(root = %config.root_dir.display(), "lifecycle opened");
        Ok(Self::new(Arc::new(supervisor), Arc::new(storage), exits))
    }

    /// The registry of live containers.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The ID index.
    #[must_use]
    pub const fn id_index(&self) -> &IdIndex {
        &self.ids
    }

    /// The name registry.
    #[must_use]
    pub const fn names(&self) -> &NameRegistry {
        &self.names
    }

    /// The exit-status store.
    #[must_use]
    pub const fn exits(&self) -> &ExitStore {
        &self.exits
    }

    /// Looks up a live container without taking its lock.
    fn lookup(&self, prefix: &str) -> Result<Arc<Container>> {
        let id = self
            .ids
            .get(prefix)
            .map_err(|e| LifecycleError::from_lookup(prefix, e))?;
        self.registry.get(&id).ok_or_else(|| LifecycleError::NotFound {
            id: prefix.to_owned(),
        })
    }

    /// Resolves an identifier and locks the container it names.
    ///
    /// The registry is checked again once the lock is held, so a request
    /// that waited behind a completed removal sees `NotFound`.
    fn resolve(&self, prefix: &str) -> Result<(Arc<Container>, ContainerGuard)> {
        let id = self
            .ids
            .get(prefix)
            .map_err(|e| LifecycleError::from_lookup(prefix, e))?;
        let guard = self.locks.lock(&id);
        let Some(container) = self.registry.get(&id) else {
            // Removed while we waited; the entry this lock call made is stale.
            drop(guard);
            self.locks.forget(&id);
            return Err(LifecycleError::NotFound {
                id: prefix.to_owned(),
            });
        };
        Ok((container, guard))
    }

    /// Creates a container without starting it.
    ///
    /// Nothing is visible to other callers until every step succeeded. On
    /// failure the completed steps are undone and the name is released.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Reservation`] for an invalid or taken
    /// name, or the error of the provisioning step that failed.
    pub fn create(&self, spec: ContainerSpec) -> Result<Arc<Container>> {
        validate_name(&spec.name).map_err(LifecycleError::Reservation)?;
        let id = ContainerId::generate();
        let _guard = self.locks.lock(&id);
        self.names
            .reserve(&spec.name, &id)
            .map_err(LifecycleError::Reservation)?;

        let name = spec.name.clone();
        match self.provision(&id, spec) {
            Ok(container) => {
                tracing::info!(id = %id, name = %name, "container created");
                Ok(container)
            }
            Err(e) => {
                self.names.release(&name);
                self.locks.forget(&id);
                tracing::warn!(id = %id, name = %name, error = %e, "container creation failed");
                Err(e)
            }
        }
    }

    fn provision(&self, id: &ContainerId, spec: ContainerSpec) -> Result<Arc<Container>> {
        self.ids.add(id).map_err(LifecycleError::Reservation)?;

        if let Err(source) = self.storage.create(id, spec.image.as_deref()) {
            self.discard(id, Provisioned::Index);
            return Err(LifecycleError::StorageCreateFailed {
                id: id.clone(),
                source,
            });
        }
        let rootfs = match self.storage.mount(id) {
            Ok(rootfs) => rootfs,
            Err(source) => {
                self.discard(id, Provisioned::Storage);
                return Err(LifecycleError::MountFailed {
                    id: id.clone(),
                    source,
                });
            }
        };

        let container = Arc::new(Container::new(id.clone(), spec, rootfs));
        if let Err(source) = self.supervisor.create(&container, &container.rootfs) {
            self.discard(id, Provisioned::Mount);
            return Err(LifecycleError::CreateFailed {
                id: id.clone(),
                source,
            });
        }
        self.registry.add(Arc::clone(&container));
        Ok(container)
    }

    /// Undoes provisioning steps up to and including `reached`.
    ///
    /// Failures are logged and left for [`Lifecycle::sweep`].
    fn discard(&self, id: &ContainerId, reached: Provisioned) {
        if reached >= Provisioned::Mount {
            if let Err(e) = self.storage.unmount(id) {
                tracing::warn!(id = %id, error = %e, "compensating unmount failed");
            }
        }
        if reached >= Provisioned::Storage {
            if let Err(e) = self.storage.delete(id) {
                tracing::warn!(id = %id, error = %e, "compensating storage delete failed");
            }
        }
        if let Err(e) = self.ids.delete(id) {
            tracing::warn!(id = %id, error = %e, "compensating index delete failed");
        }
    }

    /// Starts a created container and returns its PID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`/`Ambiguous` for a bad identifier,
    /// [`LifecycleError::InvalidState`] unless the container is `Created`,
    /// or [`LifecycleError::StartFailed`].
    pub fn start(&self, prefix: &str) -> Result<u32> {
        let (container, _guard) = self.resolve(prefix)?;
        let id = &container.id;
        let state = self.supervisor.status(id);
        if state != ContainerState::Created {
            return Err(LifecycleError::InvalidState {
                operation: "start",
                id: id.clone(),
                state,
            });
        }
        let pid = self
            .supervisor
            .start(id)
            .map_err(|source| LifecycleError::StartFailed {
                id: id.clone(),
                source,
            })?;
        tracing::info!(id = %id, pid, "started");
        Ok(pid)
    }

    /// Stops a container. Stopping one that is not running succeeds.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`/`Ambiguous` for a bad identifier or
    /// [`LifecycleError::StopFailed`].
    pub fn stop(&self, prefix: &str, timeout: StopTimeout) -> Result<()> {
        let (container, _guard) = self.resolve(prefix)?;
        let id = &container.id;
        let state = self.supervisor.status(id);
        if !state.needs_stop() {
            tracing::debug!(id = %id, %state, "already stopped");
            return Ok(());
        }
        self.supervisor
            .stop(id, timeout)
            .map_err(|source| LifecycleError::StopFailed {
                id: id.clone(),
                source,
            })?;
        tracing::info!(id = %id, %timeout, "stopped");
        Ok(())
    }

    /// Reports the current status of a container.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`/`Ambiguous` for a bad identifier, or an error if
    /// the exit-status file is unreadable.
    pub fn status(&self, prefix: &str) -> Result<ContainerStatus> {
        let container = self.lookup(prefix)?;
        self.describe(container)
    }

    /// Reports the status of every live container, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if an exit-status file is unreadable.
    pub fn list(&self) -> Result<Vec<ContainerStatus>> {
        self.registry
            .list()
            .into_iter()
            .map(|container| self.describe(container))
            .collect()
    }

    fn describe(&self, container: Arc<Container>) -> Result<ContainerStatus> {
        let id = &container.id;
        let state = self.supervisor.status(id);
        let pid = match state {
            ContainerState::Running => self.supervisor.pid(id),
            _ => None,
        };
        let exit = self.exits.read(id)?;
        let log_path = self.supervisor.log_path(id);
        Ok(ContainerStatus {
            container,
            state,
            pid,
            exit,
            log_path,
        })
    }

    /// Returns everything the container has written to its log.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`/`Ambiguous` for a bad identifier, or an error if
    /// the log exists but cannot be read.
    pub fn logs(&self, prefix: &str) -> Result<String> {
        let container = self.lookup(prefix)?;
        match self.supervisor.log_path(&container.id) {
            Some(path) => Ok(logs::read_logs(&path)?),
            None => Ok(String::new()),
        }
    }

    /// Re-registers containers persisted by an earlier process.
    ///
    /// Entries whose ID or name collides with one already known are
    /// skipped with a warning.
    pub fn restore(&self, containers: Vec<Container>) {
        for container in containers {
            let id = container.id.clone();
            if let Err(e) = self.ids.add(&id) {
                tracing::warn!(id = %id, error = %e, "skipping persisted container");
                continue;
            }
            if let Err(e) = self.names.reserve(&container.name, &id) {
                tracing::warn!(id = %id, error = %e, "skipping persisted container");
                let _ = self.ids.delete(&id);
                continue;
            }
            self.registry.add(Arc::new(container));
        }
        tracing::debug!(containers = self.registry.len(), "state restored");
    }

    /// Returns every live container, for persisting.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Container> {
        self.registry
            .list()
            .into_iter()
            .map(|c| Container::clone(&c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_shared_between_clones() {
        let flag = Cancellation::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn provisioning_stages_are_ordered() {
        assert!(Provisioned::Index < Provisioned::Storage);
        assert!(Provisioned::Storage < Provisioned::Mount);
    }
}
