//! Fault-injecting collaborators for lifecycle tests.
//!
//! [`FakeSupervisor`] and [`FakeStorage`] keep their state in memory,
//! append every call to a shared [`CallLog`], and fail on demand when a
//! [`Fault`] is injected.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cradle_common::error::CradleError;
use cradle_common::types::{ContainerId, ContainerState, StopTimeout};
use cradle_runtime::container::{Container, ContainerSpec};
use cradle_runtime::error::RuntimeError;
use cradle_runtime::exits::ExitStore;
use cradle_runtime::lifecycle::Lifecycle;
use cradle_runtime::supervisor::RuntimeSupervisor;
use cradle_storage::{StorageError, StorageLayer};
use parking_lot::Mutex;

/// A collaborator call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    SupervisorCreate,
    Stop,
    DeleteRecord,
    StorageCreate,
    Mount,
    Unmount,
    DeleteStorage,
    List,
    /// Stop hangs up for a short while before succeeding.
    SlowStop,
}

#[derive(Debug, Default)]
pub struct Faults(Mutex<HashSet<Fault>>);

impl Faults {
    pub fn inject(&self, fault: Fault) {
        let _ = self.0.lock().insert(fault);
    }

    pub fn clear(&self, fault: Fault) {
        let _ = self.0.lock().remove(&fault);
    }

    pub fn is_set(&self, fault: Fault) -> bool {
        self.0.lock().contains(&fault)
    }
}

#[derive(Debug, Default)]
pub struct CallLog(Mutex<Vec<String>>);

impl CallLog {
    fn record(&self, call: &str) {
        self.0.lock().push(call.to_owned());
    }

    /// Returns and clears the calls made so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

fn injected(what: &str) -> CradleError {
    CradleError::Config {
        message: format!("injected {what} failure"),
    }
}

#[derive(Debug)]
pub struct FakeSupervisor {
    states: Mutex<HashMap<ContainerId, ContainerState>>,
    faults: Arc<Faults>,
    calls: Arc<CallLog>,
}

impl FakeSupervisor {
    /// Sets the state the supervisor reports for `id`.
    pub fn set_state(&self, id: &ContainerId, state: ContainerState) {
        let _ = self.states.lock().insert(id.clone(), state);
    }

    pub fn has_record(&self, id: &ContainerId) -> bool {
        self.states.lock().contains_key(id)
    }
}

impl RuntimeSupervisor for FakeSupervisor {
    fn create(&self, container: &Container, _rootfs: &Path) -> Result<(), RuntimeError> {
        self.calls.record("supervisor.create");
        if self.faults.is_set(Fault::SupervisorCreate) {
            return Err(injected("create").into());
        }
        self.set_state(&container.id, ContainerState::Created);
        Ok(())
    }

    fn start(&self, id: &ContainerId) -> Result<u32, RuntimeError> {
        self.calls.record("supervisor.start");
        self.set_state(id, ContainerState::Running);
        Ok(4242)
    }

    fn status(&self, id: &ContainerId) -> ContainerState {
        self.states
            .lock()
            .get(id)
            .copied()
            .unwrap_or(ContainerState::Unknown)
    }

    fn pid(&self, id: &ContainerId) -> Option<u32> {
        (self.status(id) == ContainerState::Running).then_some(4242)
    }

    fn stop(&self, id: &ContainerId, timeout: StopTimeout) -> Result<(), RuntimeError> {
        self.calls.record(&format!("supervisor.stop({timeout})"));
        if self.faults.is_set(Fault::Stop) {
            return Err(injected("stop").into());
        }
        if self.faults.is_set(Fault::SlowStop) {
            std::thread::sleep(std::time::Duration::from_millis(200));
        }
        self.set_state(id, ContainerState::Stopped);
        Ok(())
    }

    fn delete(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        self.calls.record("supervisor.delete");
        if self.faults.is_set(Fault::DeleteRecord) {
            return Err(injected("delete").into());
        }
        match self.states.lock().remove(id) {
            Some(_) => Ok(()),
            None => Err(RuntimeError::UnknownContainer { id: id.clone() }),
        }
    }
}

#[derive(Debug)]
pub struct FakeStorage {
    /// Stored containers and whether each is mounted.
    stored: Mutex<HashMap<ContainerId, bool>>,
    faults: Arc<Faults>,
    calls: Arc<CallLog>,
}

impl FakeStorage {
    pub fn exists(&self, id: &ContainerId) -> bool {
        self.stored.lock().contains_key(id)
    }

    pub fn is_mounted(&self, id: &ContainerId) -> bool {
        self.stored.lock().get(id).copied().unwrap_or(false)
    }

    /// Tears down a mount behind the orchestrator's back.
    pub fn force_unmount(&self, id: &ContainerId) {
        if let Some(mounted) = self.stored.lock().get_mut(id) {
            *mounted = false;
        }
    }

    /// Plants storage that no container owns.
    pub fn plant(&self, id: &ContainerId) {
        let _ = self.stored.lock().insert(id.clone(), true);
    }
}

impl StorageLayer for FakeStorage {
    fn create(&self, id: &ContainerId, _image: Option<&Path>) -> cradle_storage::Result<()> {
        self.calls.record("storage.create");
        if self.faults.is_set(Fault::StorageCreate) {
            return Err(injected("storage create").into());
        }
        let mut stored = self.stored.lock();
        if stored.contains_key(id) {
            return Err(StorageError::AlreadyExists { id: id.clone() });
        }
        let _ = stored.insert(id.clone(), false);
        Ok(())
    }

    fn mount(&self, id: &ContainerId) -> cradle_storage::Result<PathBuf> {
        self.calls.record("storage.mount");
        if self.faults.is_set(Fault::Mount) {
            return Err(injected("mount").into());
        }
        let mut stored = self.stored.lock();
        let mounted = stored
            .get_mut(id)
            .ok_or_else(|| StorageError::UnknownContainer { id: id.clone() })?;
        *mounted = true;
        Ok(PathBuf::from("/fake/rootfs").join(id.as_str()))
    }

    fn unmount(&self, id: &ContainerId) -> cradle_storage::Result<()> {
        self.calls.record("storage.unmount");
        if self.faults.is_set(Fault::Unmount) {
            return Err(injected("unmount").into());
        }
        let mut stored = self.stored.lock();
        let mounted = stored
            .get_mut(id)
            .ok_or_else(|| StorageError::UnknownContainer { id: id.clone() })?;
        if !*mounted {
            return Err(StorageError::NotMounted { id: id.clone() });
        }
        *mounted = false;
        Ok(())
    }

    fn delete(&self, id: &ContainerId) -> cradle_storage::Result<()> {
        self.calls.record("storage.delete");
        if self.faults.is_set(Fault::DeleteStorage) {
            return Err(injected("storage delete").into());
        }
        let mut stored = self.stored.lock();
        match stored.get(id) {
            None => Err(StorageError::UnknownContainer { id: id.clone() }),
            Some(true) => Err(StorageError::StillMounted { id: id.clone() }),
            Some(false) => {
                let _ = stored.remove(id);
                Ok(())
            }
        }
    }

    fn list(&self) -> cradle_storage::Result<Vec<ContainerId>> {
        if self.faults.is_set(Fault::List) {
            return Err(injected("list").into());
        }
        let mut ids: Vec<_> = self.stored.lock().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

pub struct Fixture {
    pub lifecycle: Arc<Lifecycle>,
    pub supervisor: Arc<FakeSupervisor>,
    pub storage: Arc<FakeStorage>,
    pub exits: ExitStore,
    pub faults: Arc<Faults>,
    pub calls: Arc<CallLog>,
    _dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let faults = Arc::new(Faults::default());
        let calls = Arc::new(CallLog::default());
        let supervisor = Arc::new(FakeSupervisor {
            states: Mutex::new(HashMap::new()),
            faults: Arc::clone(&faults),
            calls: Arc::clone(&calls),
        });
        let storage = Arc::new(FakeStorage {
            stored: Mutex::new(HashMap::new()),
            faults: Arc::clone(&faults),
            calls: Arc::clone(&calls),
        });
        let exits = ExitStore::new(dir.path().join("exits"));
        let lifecycle = Arc::new(Lifecycle::new(
            Arc::clone(&supervisor) as Arc<dyn RuntimeSupervisor>,
            Arc::clone(&storage) as Arc<dyn StorageLayer>,
            exits.clone(),
        ));
        Self {
            lifecycle,
            supervisor,
            storage,
            exits,
            faults,
            calls,
            _dir: dir,
        }
    }

    /// Creates and starts a container named `name`.
    pub fn running(&self, name: &str) -> Arc<Container> {
        let container = self
            .lifecycle
            .create(ContainerSpec::new(name).command(["sleep", "30"]))
            .expect("create");
        let _ = self
            .lifecycle
            .start(container.id.as_str())
            .expect("start");
        let _ = self.calls.take();
        container
    }

    /// Returns whether every store still knows the container.
    pub fn fully_present(&self, container: &Container) -> bool {
        self.lifecycle.registry().contains(&container.id)
            && self.lifecycle.id_index().contains(&container.id)
            && self.lifecycle.names().holder(&container.name).as_ref() == Some(&container.id)
    }

    /// Returns whether no store knows the container any more.
    pub fn fully_gone(&self, container: &Container) -> bool {
        !self.lifecycle.registry().contains(&container.id)
            && !self.lifecycle.id_index().contains(&container.id)
            && self.lifecycle.names().holder(&container.name).is_none()
            && !self.storage.exists(&container.id)
            && !self.supervisor.has_record(&container.id)
    }
}
