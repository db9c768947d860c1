//! # Registry Model
//!
//! Ordered, keyed collections of authoritative entries and the read-only
//! snapshot handed to the packer.
//!
//! A [`Registry<V>`] owns typed entries; [`RegistryView`] erases the value
//! type so heterogeneous registries can be iterated uniformly. Packing
//! never sees a live mutable registry — registries are moved into a
//! [`RegistrySnapshot`] first, and the snapshot is passed by reference
//! into each operation.

use crate::core::resource::ResourceId;
use crate::error::{ProtocolError, Result};
use crate::protocol::message::KnownPack;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// One registry entry: key, value, and registration metadata naming the
/// pack the entry came from, if any.
#[derive(Debug, Clone)]
pub struct RegistryEntry<V> {
    pub id: ResourceId,
    pub value: V,
    pub source: Option<KnownPack>,
}

/// An ordered, keyed collection of entries of one value type.
pub struct Registry<V> {
    key: ResourceId,
    entries: Vec<RegistryEntry<V>>,
    index: HashMap<ResourceId, usize>,
}

impl<V> Registry<V> {
    pub fn new(key: ResourceId) -> Self {
        Self {
            key,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn key(&self) -> &ResourceId {
        &self.key
    }

    /// Append an entry, preserving insertion order.
    ///
    /// # Errors
    /// Returns an error if the id is already present — ids are unique
    /// within one registry.
    pub fn insert(
        &mut self,
        id: ResourceId,
        value: V,
        source: Option<KnownPack>,
    ) -> Result<()> {
        if self.index.contains_key(&id) {
            return Err(ProtocolError::Custom(format!(
                "Duplicate entry '{id}' in registry '{}'",
                self.key
            )));
        }
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push(RegistryEntry { id, value, source });
        Ok(())
    }

    pub fn get(&self, id: &ResourceId) -> Option<&V> {
        self.index.get(id).map(|&i| &self.entries[i].value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry<V>> {
        self.entries.iter()
    }
}

impl<V> fmt::Debug for Registry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("key", &self.key)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// A borrowed entry with its value type erased, as seen by the packer.
pub struct PackableEntry<'a> {
    pub id: &'a ResourceId,
    pub source: Option<&'a KnownPack>,
    pub value: &'a (dyn Any + Send + Sync),
}

/// Type-erased, read-only view of one registry in iteration order.
pub trait RegistryView: Send + Sync {
    fn key(&self) -> &ResourceId;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in registry iteration order.
    fn entries(&self) -> Box<dyn Iterator<Item = PackableEntry<'_>> + '_>;
}

impl<V: Send + Sync + 'static> RegistryView for Registry<V> {
    fn key(&self) -> &ResourceId {
        &self.key
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = PackableEntry<'_>> + '_> {
        Box::new(self.entries.iter().map(|entry| PackableEntry {
            id: &entry.id,
            source: entry.source.as_ref(),
            value: &entry.value,
        }))
    }
}

/// Lookup of registries by key, consumed by the packer.
pub trait RegistryAccess: Send + Sync {
    fn get_registry(&self, key: &ResourceId) -> Option<&dyn RegistryView>;
}

/// Immutable set of registries captured for one synchronization pass.
pub struct RegistrySnapshot {
    registries: Vec<Box<dyn RegistryView>>,
    index: HashMap<ResourceId, usize>,
}

impl RegistrySnapshot {
    pub fn builder() -> RegistrySnapshotBuilder {
        RegistrySnapshotBuilder {
            registries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    /// Registries in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &dyn RegistryView> {
        self.registries.iter().map(|r| r.as_ref())
    }
}

impl RegistryAccess for RegistrySnapshot {
    fn get_registry(&self, key: &ResourceId) -> Option<&dyn RegistryView> {
        self.index.get(key).map(|&i| self.registries[i].as_ref())
    }
}

impl fmt::Debug for RegistrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySnapshot")
            .field("registries", &self.registries.len())
            .finish()
    }
}

/// Builder collecting registries into a snapshot.
pub struct RegistrySnapshotBuilder {
    registries: Vec<Box<dyn RegistryView>>,
    index: HashMap<ResourceId, usize>,
}

impl RegistrySnapshotBuilder {
    /// Move a registry into the snapshot.
    ///
    /// # Errors
    /// Returns an error if a registry with the same key was already added.
    pub fn add<V: Send + Sync + 'static>(mut self, registry: Registry<V>) -> Result<Self> {
        let key = registry.key().clone();
        if self.index.contains_key(&key) {
            return Err(ProtocolError::Custom(format!(
                "Registry '{key}' added to snapshot twice"
            )));
        }
        self.index.insert(key, self.registries.len());
        self.registries.push(Box::new(registry));
        Ok(self)
    }

    pub fn build(self) -> RegistrySnapshot {
        RegistrySnapshot {
            registries: self.registries,
            index: self.index,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn id(s: &str) -> ResourceId {
        ResourceId::parse(s).unwrap()
    }

    #[test]
    fn test_registry_preserves_insertion_order() {
        let mut registry = Registry::new(id("registry:widgets"));
        registry.insert(id("base:c"), 3u32, None).unwrap();
        registry.insert(id("base:a"), 1u32, None).unwrap();
        registry.insert(id("base:b"), 2u32, None).unwrap();

        let order: Vec<_> = registry.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(order, vec!["base:c", "base:a", "base:b"]);
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let mut registry = Registry::new(id("registry:widgets"));
        registry.insert(id("base:a"), 1u32, None).unwrap();
        assert!(registry.insert(id("base:a"), 2u32, None).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_by_id() {
        let mut registry = Registry::new(id("registry:widgets"));
        registry.insert(id("base:a"), 41u32, None).unwrap();
        assert_eq!(registry.get(&id("base:a")), Some(&41));
        assert_eq!(registry.get(&id("base:missing")), None);
    }

    #[test]
    fn test_view_erases_value_type() {
        let mut registry = Registry::new(id("registry:widgets"));
        registry
            .insert(id("base:a"), "hello".to_string(), None)
            .unwrap();

        let view: &dyn RegistryView = &registry;
        let entries: Vec<_> = view.entries().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].value.downcast_ref::<String>().map(String::as_str),
            Some("hello")
        );
    }

    #[test]
    fn test_snapshot_lookup_and_order() {
        let mut first = Registry::new(id("registry:widgets"));
        first.insert(id("base:a"), 1u32, None).unwrap();
        let second = Registry::<String>::new(id("registry:sounds"));

        let snapshot = RegistrySnapshot::builder()
            .add(first)
            .unwrap()
            .add(second)
            .unwrap()
            .build();

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get_registry(&id("registry:widgets")).is_some());
        assert!(snapshot.get_registry(&id("registry:missing")).is_none());

        let keys: Vec<_> = snapshot.iter().map(|r| r.key().to_string()).collect();
        assert_eq!(keys, vec!["registry:widgets", "registry:sounds"]);
    }

    #[test]
    fn test_snapshot_duplicate_registry_rejected() {
        let first = Registry::<u32>::new(id("registry:widgets"));
        let second = Registry::<u32>::new(id("registry:widgets"));
        let result = RegistrySnapshot::builder()
            .add(first)
            .unwrap()
            .add(second);
        assert!(result.is_err());
    }
}
