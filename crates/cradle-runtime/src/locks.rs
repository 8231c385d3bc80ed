//! Per-container mutual exclusion.
//!
//! Every lifecycle operation holds its container's lock from resolution
//! until it finishes, so two requests for the same container never
//! interleave their steps. Requests for different containers never share
//! a mutex.

use std::collections::HashMap;
use std::sync::Arc;

use cradle_common::types::ContainerId;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

/// Owned guard for one container's lock.
pub type ContainerGuard = ArcMutexGuard<RawMutex, ()>;

/// Table of lazily created per-ID locks.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: Mutex<HashMap<ContainerId, Arc<Mutex<()>>>>,
}

impl LockTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the lock for `id` is acquired.
    ///
    /// The table itself is only held while looking up the entry, never
    /// while waiting for the container's lock.
    pub fn lock(&self, id: &ContainerId) -> ContainerGuard {
        let entry = Arc::clone(self.locks.lock().entry(id.clone()).or_default());
        entry.lock_arc()
    }

    /// Attempts to acquire the lock for `id` without blocking.
    pub fn try_lock(&self, id: &ContainerId) -> Option<ContainerGuard> {
        let entry = Arc::clone(self.locks.lock().entry(id.clone()).or_default());
        entry.try_lock_arc()
    }

    /// Drops the table entry for a container that no longer exists.
    ///
    /// Callers still waiting on the old lock acquire it normally and then
    /// observe that the container is gone.
    pub fn forget(&self, id: &ContainerId) {
        let _ = self.locks.lock().remove(id);
    }

    /// Number of containers with a lock entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Returns whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}
