//! In-memory table of the containers this daemon knows about.
//!
//! An ID is present here exactly as long as its container has not
//! completed removal.

use std::collections::HashMap;
use std::sync::Arc;

use cradle_common::types::ContainerId;
use parking_lot::RwLock;

use crate::container::Container;

/// Registry of live containers, keyed by full ID.
#[derive(Debug, Default)]
pub struct Registry {
    containers: RwLock<HashMap<ContainerId, Arc<Container>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a container, replacing any entry with the same ID.
    pub fn add(&self, container: Arc<Container>) {
        let _ = self
            .containers
            .write()
            .insert(container.id.clone(), container);
    }

    /// Looks up a container by full ID.
    #[must_use]
    pub fn get(&self, id: &ContainerId) -> Option<Arc<Container>> {
        self.containers.read().get(id).cloned()
    }

    /// Returns whether a container with this ID is registered.
    #[must_use]
    pub fn contains(&self, id: &ContainerId) -> bool {
        self.containers.read().contains_key(id)
    }

    /// Unregisters a container, returning its entry if it was present.
    pub fn remove(&self, id: &ContainerId) -> Option<Arc<Container>> {
        self.containers.write().remove(id)
    }

    /// Returns all registered containers, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<Container>> {
        let mut all: Vec<_> = self.containers.read().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Number of registered containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.read().len()
    }

    /// Returns whether no container is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::container::ContainerSpec;

    fn container(id: &str, name: &str) -> Arc<Container> {
        Arc::new(Container::new(
            ContainerId::new(id),
            ContainerSpec::new(name),
            PathBuf::from("/rootfs"),
        ))
    }

    #[test]
    fn add_get_remove() {
        let registry = Registry::new();
        registry.add(container("c1", "web"));
        assert!(registry.contains(&ContainerId::new("c1")));
        assert_eq!(
            registry.get(&ContainerId::new("c1")).map(|c| c.name.clone()),
            Some("web".to_string())
        );

        let removed = registry.remove(&ContainerId::new("c1"));
        assert!(removed.is_some());
        assert!(registry.get(&ContainerId::new("c1")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_of_absent_id_is_none() {
        let registry = Registry::new();
        assert!(registry.remove(&ContainerId::new("nope")).is_none());
    }

    #[test]
    fn list_is_ordered_by_creation() {
        let registry = Registry::new();
        let first = container("a", "first");
        let second = container("b", "second");
        registry.add(Arc::clone(&second));
        registry.add(Arc::clone(&first));
        let names: Vec<_> = registry.list().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(registry.len(), 2);
    }
}
