//! # Registry Snapshot Packer
//!
//! Walks a set of registries, diffing against the negotiated known-pack
//! set, and produces per-entry `(id, optional body)` records.
//!
//! An entry's body is elided exactly when its registration metadata names
//! a pack in the caller's known set — the id alone suffices, the peer
//! already holds an identical entry. Everything else is encoded with the
//! registry's element codec.
//!
//! The pass is deterministic and complete: every entry appears exactly
//! once, in registry iteration order, and a single encode failure aborts
//! the whole pass — partial registry state on the wire would be
//! unrecoverable.

use crate::core::resource::ResourceId;
use crate::core::serialization::SerializationFormat;
use crate::error::Result;
use crate::protocol::message::{KnownPack, PackedRegistryEntry};
use crate::protocol::payload::{ErasedCodec, PayloadCodec};
use crate::sync::access::RegistryAccess;
use crate::utils::metrics::global_metrics;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

/// Names one synchronizable registry and the codec for its element values.
#[derive(Debug, Clone)]
pub struct RegistryDescriptor {
    key: ResourceId,
    element: ErasedCodec,
}

impl RegistryDescriptor {
    /// Descriptor with an explicit element codec.
    pub fn new<T: Send + Sync + 'static>(key: ResourceId, codec: PayloadCodec<T>) -> Self {
        Self {
            key,
            element: ErasedCodec::of(codec),
        }
    }

    /// Descriptor whose elements are serde values in the given format.
    pub fn serde<V>(key: ResourceId, format: SerializationFormat) -> Self
    where
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Self::new(key, PayloadCodec::<V>::serde(format))
    }

    pub fn key(&self) -> &ResourceId {
        &self.key
    }

    pub fn element_codec(&self) -> &ErasedCodec {
        &self.element
    }
}

/// Pack every described registry against the known-pack set, emitting one
/// sink call per non-empty registry in descriptor order.
///
/// Registries the access provider cannot resolve are skipped; empty
/// registries produce no sink call.
///
/// # Errors
/// Fails on the first element that cannot be encoded, wrapping the error
/// with the registry key and entry id. The sink's own error aborts the
/// pass unchanged.
#[instrument(skip_all, fields(registries = descriptors.len(), known = known.len()))]
pub fn pack_registries(
    descriptors: &[RegistryDescriptor],
    access: &dyn RegistryAccess,
    known: &[KnownPack],
    mut sink: impl FnMut(&ResourceId, Vec<PackedRegistryEntry>) -> Result<()>,
) -> Result<()> {
    for descriptor in descriptors {
        let Some(view) = access.get_registry(&descriptor.key) else {
            debug!(registry = %descriptor.key, "Registry not present in snapshot, skipping");
            continue;
        };
        if view.is_empty() {
            continue;
        }

        let entries = pack_registry(descriptor, view, known)?;
        global_metrics().registry_packed(entries.len() as u64);
        debug!(
            registry = %descriptor.key,
            entries = entries.len(),
            "Registry packed"
        );
        sink(&descriptor.key, entries)?;
    }
    Ok(())
}

/// Pack one registry view into `(id, optional body)` records.
fn pack_registry(
    descriptor: &RegistryDescriptor,
    view: &dyn crate::sync::access::RegistryView,
    known: &[KnownPack],
) -> Result<Vec<PackedRegistryEntry>> {
    let mut packed = Vec::with_capacity(view.len());
    for entry in view.entries() {
        let elide = entry.source.is_some_and(|source| known.contains(source));
        let body = if elide {
            global_metrics().entry_elided();
            None
        } else {
            let body = descriptor
                .element
                .encode_value(entry.value)
                .map_err(|e| e.in_registry(&descriptor.key, entry.id))?;
            Some(body)
        };
        packed.push(PackedRegistryEntry {
            id: entry.id.clone(),
            body,
        });
    }
    Ok(packed)
}
