//! Uniqueness registries for container IDs and names.
//!
//! [`IdIndex`] resolves full IDs and unambiguous prefixes to full IDs.
//! [`NameRegistry`] maps human-readable names to the container holding
//! them. A name stays reserved until the final step of removal releases it.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use cradle_common::types::ContainerId;
use parking_lot::RwLock;

use crate::error::IndexError;

/// Index of full container IDs supporting unique-prefix lookup.
#[derive(Debug, Default)]
pub struct IdIndex {
    ids: RwLock<BTreeSet<String>>,
}

impl IdIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a full ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is empty, contains whitespace, or is
    /// already indexed.
    pub fn add(&self, id: &ContainerId) -> Result<(), IndexError> {
        let raw = id.as_str();
        if raw.is_empty() {
            return Err(IndexError::Empty);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(IndexError::InvalidId { id: raw.to_owned() });
        }
        if !self.ids.write().insert(raw.to_owned()) {
            return Err(IndexError::Duplicate { id: id.clone() });
        }
        Ok(())
    }

    /// Resolves a full ID or a unique prefix to the full ID.
    ///
    /// An exact match wins even when it is also a prefix of other IDs.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] when nothing matches and
    /// [`IndexError::Ambiguous`] when several IDs share the prefix.
    pub fn get(&self, prefix: &str) -> Result<ContainerId, IndexError> {
        if prefix.is_empty() {
            return Err(IndexError::Empty);
        }
        let ids = self.ids.read();
        if ids.contains(prefix) {
            return Ok(ContainerId::new(prefix));
        }
        let mut matches = ids
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|id| id.starts_with(prefix));
        let Some(first) = matches.next() else {
            return Err(IndexError::NotFound {
                prefix: prefix.to_owned(),
            });
        };
        if matches.next().is_some() {
            return Err(IndexError::Ambiguous {
                prefix: prefix.to_owned(),
            });
        }
        Ok(ContainerId::new(first.as_str()))
    }

    /// Deletes a full ID.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotIndexed`] if the ID is not present.
    pub fn delete(&self, id: &ContainerId) -> Result<(), IndexError> {
        if id.as_str().is_empty() {
            return Err(IndexError::Empty);
        }
        if !self.ids.write().remove(id.as_str()) {
            return Err(IndexError::NotIndexed { id: id.clone() });
        }
        Ok(())
    }

    /// Returns whether the exact ID is indexed.
    #[must_use]
    pub fn contains(&self, id: &ContainerId) -> bool {
        self.ids.read().contains(id.as_str())
    }

    /// Returns every indexed ID in sorted order.
    #[must_use]
    pub fn ids(&self) -> Vec<ContainerId> {
        self.ids.read().iter().map(ContainerId::new).collect()
    }
}

/// Checks a requested container name against `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
///
/// # Errors
///
/// Returns [`IndexError::InvalidName`] when the name does not match.
pub fn validate_name(name: &str) -> Result<(), IndexError> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(IndexError::InvalidName {
            name: name.to_owned(),
        })
    }
}

/// Registry of reserved container names.
#[derive(Debug, Default)]
pub struct NameRegistry {
    names: RwLock<HashMap<String, ContainerId>>,
}

impl NameRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `name` for container `id`.
    ///
    /// Reserving a name again for the container that already holds it
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NameInUse`] if another container holds the name.
    pub fn reserve(&self, name: &str, id: &ContainerId) -> Result<(), IndexError> {
        match self.names.write().entry(name.to_owned()) {
            Entry::Occupied(held) if held.get() == id => Ok(()),
            Entry::Occupied(held) => Err(IndexError::NameInUse {
                name: name.to_owned(),
                holder: held.get().clone(),
            }),
            Entry::Vacant(slot) => {
                let _ = slot.insert(id.clone());
                Ok(())
            }
        }
    }

    /// Makes `name` available again. Releasing a free name is a no-op.
    pub fn release(&self, name: &str) {
        let _ = self.names.write().remove(name);
    }

    /// Returns the container holding `name`, if any.
    #[must_use]
    pub fn holder(&self, name: &str) -> Option<ContainerId> {
        self.names.read().get(name).cloned()
    }

    /// Returns every reservation, sorted by name.
    #[must_use]
    pub fn reservations(&self) -> Vec<(String, ContainerId)> {
        let sorted: BTreeMap<_, _> = self
            .names
            .read()
            .iter()
            .map(|(name, id)| (name.clone(), id.clone()))
            .collect();
        sorted.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(ids: &[&str]) -> IdIndex {
        let index = IdIndex::new();
        for id in ids {
            index.add(&ContainerId::new(*id)).expect("add");
        }
        index
    }

    #[test]
    fn get_resolves_unique_prefix() {
        let index = index(&["abc123", "def456"]);
        assert_eq!(index.get("ab"), Ok(ContainerId::new("abc123")));
        assert_eq!(index.get("def456"), Ok(ContainerId::new("def456")));
    }

    #[test]
    fn get_reports_ambiguous_prefix() {
        let index = index(&["abc123", "abd456"]);
        assert_eq!(
            index.get("ab"),
            Err(IndexError::Ambiguous {
                prefix: "ab".into()
            })
        );
    }

    #[test]
    fn exact_match_beats_longer_ids() {
        let index = index(&["abc", "abcdef"]);
        assert_eq!(index.get("abc"), Ok(ContainerId::new("abc")));
    }

    #[test]
    fn get_of_unknown_or_empty_prefix_fails() {
        let index = index(&["abc123"]);
        assert_eq!(
            index.get("x"),
            Err(IndexError::NotFound { prefix: "x".into() })
        );
        assert_eq!(index.get(""), Err(IndexError::Empty));
    }

    #[test]
    fn add_rejects_duplicates_and_whitespace() {
        let index = index(&["abc"]);
        assert!(matches!(
            index.add(&ContainerId::new("abc")),
            Err(IndexError::Duplicate { .. })
        ));
        assert!(matches!(
            index.add(&ContainerId::new("a b")),
            Err(IndexError::InvalidId { .. })
        ));
        assert_eq!(index.add(&ContainerId::new("")), Err(IndexError::Empty));
    }

    #[test]
    fn delete_requires_presence() {
        let index = index(&["abc"]);
        index.delete(&ContainerId::new("abc")).expect("delete");
        assert!(!index.contains(&ContainerId::new("abc")));
        assert!(matches!(
            index.delete(&ContainerId::new("abc")),
            Err(IndexError::NotIndexed { .. })
        ));
    }

    #[test]
    fn names_are_exclusive_until_released() {
        let names = NameRegistry::new();
        let a = ContainerId::new("a");
        let b = ContainerId::new("b");
        names.reserve("web", &a).expect("reserve");
        names.reserve("web", &a).expect("same holder again");
        assert_eq!(
            names.reserve("web", &b),
            Err(IndexError::NameInUse {
                name: "web".into(),
                holder: a.clone()
            })
        );

        names.release("web");
        names.reserve("web", &b).expect("reserve after release");
        assert_eq!(names.holder("web"), Some(b));
    }

    #[test]
    fn name_validation() {
        for ok in ["web", "web-1", "a.b_c", "9lives"] {
            assert!(validate_name(ok).is_ok(), "{ok} should be valid");
        }
        for bad in ["", "-web", ".hidden", "has space", "slash/y"] {
            assert!(validate_name(bad).is_err(), "{bad} should be invalid");
        }
    }
}
