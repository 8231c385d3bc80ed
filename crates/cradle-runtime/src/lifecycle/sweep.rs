//! Reclaiming what failed removals leave behind.
//!
//! A removal that fails after the registry entry is gone leaves storage,
//! an index entry, or a name reservation without an owner. A sweep finds
//! those and deletes them. Registered containers are never touched.

use std::collections::BTreeSet;

use cradle_common::types::ContainerId;
use cradle_storage::StorageError;

use super::Lifecycle;
use crate::error::{LifecycleError, Result};

/// What a sweep reclaimed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Containers whose orphaned storage was deleted.
    pub storage_deleted: Vec<ContainerId>,
    /// IDs dropped from the index.
    pub index_entries_deleted: Vec<ContainerId>,
    /// Names made available again.
    pub names_released: Vec<String>,
    /// Orphans that could not be reclaimed, with the reason.
    pub failures: Vec<(ContainerId, String)>,
}

impl SweepReport {
    /// Returns whether the sweep found nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage_deleted.is_empty()
            && self.index_entries_deleted.is_empty()
            && self.names_released.is_empty()
            && self.failures.is_empty()
    }
}

impl Lifecycle {
    /// Deletes storage, index entries, and name reservations that belong
    /// to no registered container.
    ///
    /// Each orphan is handled under its container's lock, so a sweep never
    /// races a removal of the same container.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::StorageListFailed`] if storage cannot be
    /// enumerated. Failures on individual orphans are collected in the
    /// report instead.
    pub fn sweep(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        let stored = self
            .storage
            .list()
            .map_err(|source| LifecycleError::StorageListFailed { source })?;
        for id in stored {
            let _guard = self.locks.lock(&id);
            if self.registry.contains(&id) {
                continue;
            }
            match self.reclaim_storage(&id) {
                Ok(true) => report.storage_deleted.push(id),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "could not reclaim storage");
                    report.failures.push((id, e.to_string()));
                }
            }
        }

        let mut orphans: BTreeSet<ContainerId> = BTreeSet::new();
        for id in self.ids.ids() {
            let _guard = self.locks.lock(&id);
            if self.registry.contains(&id) {
                continue;
            }
            // A concurrent removal may have finished in the meantime.
            if self.ids.delete(&id).is_ok() {
                report.index_entries_deleted.push(id.clone());
            }
            let _ = orphans.insert(id);
        }

        for (name, holder) in self.names.reservations() {
            let _guard = self.locks.lock(&holder);
            if self.registry.contains(&holder) || self.names.holder(&name).as_ref() != Some(&holder)
            {
                continue;
            }
            self.names.release(&name);
            report.names_released.push(name);
            let _ = orphans.insert(holder);
        }

        for id in &orphans {
            self.locks.forget(id);
        }
        tracing::info!(
            storage = report.storage_deleted.len(),
            index = report.index_entries_deleted.len(),
            names = report.names_released.len(),
            failures = report.failures.len(),
            "sweep finished"
        );
        Ok(report)
    }

    /// Unmounts and deletes orphaned storage. Returns `false` if it was
    /// already gone.
    fn reclaim_storage(&self, id: &ContainerId) -> std::result::Result<bool, StorageError> {
        match self.storage.unmount(id) {
            Ok(()) => {}
            Err(e) if e.is_not_mounted() => {}
            Err(StorageError::UnknownContainer { .. }) => return Ok(false),
            Err(e) => return Err(e),
        }
        match self.storage.delete(id) {
            Ok(()) => Ok(true),
            Err(StorageError::UnknownContainer { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
