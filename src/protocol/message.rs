//! # Synchronization Messages
//!
//! The payload types exchanged during a registry synchronization pass and
//! their wire codecs.
//!
//! ## Flow
//! ```text
//! server                                client
//!   |-- registry:known_packs_request  -->|      (offered packs)
//!   |<- registry:known_packs_response ---|      (claimed packs)
//!   |-- registry:registry_data        -->|      (one per registry)
//!   |-- registry:update_tags          -->|      (always sent last)
//! ```
//!
//! `update_tags` is never elided, so the client can treat it as the
//! end-of-synchronization marker.

use crate::core::resource::ResourceId;
use crate::error::Result;
use crate::protocol::payload::{codecs, PayloadCodec};
use crate::protocol::registry::{FlowDirection, PayloadTypeRegistry, PayloadTypeRegistryBuilder};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace of the protocol's own payload types.
pub const PROTOCOL_NAMESPACE: &str = "registry";

/// A named, versioned content bundle a peer claims to already possess.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnownPack {
    pub namespace: String,
    pub version: String,
}

impl KnownPack {
    pub fn new(namespace: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            version: version.into(),
        }
    }

    pub fn codec() -> PayloadCodec<KnownPack> {
        PayloadCodec::composite2(
            codecs::string(),
            |p: &KnownPack| &p.namespace,
            codecs::string(),
            |p: &KnownPack| &p.version,
            KnownPack::new,
        )
    }
}

impl fmt::Display for KnownPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.namespace, self.version)
    }
}

/// Server request naming the packs it is willing to elide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownPacksRequest {
    pub packs: Vec<KnownPack>,
}

impl KnownPacksRequest {
    pub fn type_id() -> ResourceId {
        ResourceId::from_static(PROTOCOL_NAMESPACE, "known_packs_request")
    }

    pub fn codec() -> PayloadCodec<Self> {
        PayloadCodec::composite1(
            KnownPack::codec().list(),
            |m: &Self| &m.packs,
            |packs| Self { packs },
        )
    }
}

/// Client response claiming the packs it actually holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownPacksResponse {
    pub packs: Vec<KnownPack>,
}

impl KnownPacksResponse {
    pub fn type_id() -> ResourceId {
        ResourceId::from_static(PROTOCOL_NAMESPACE, "known_packs_response")
    }

    pub fn codec() -> PayloadCodec<Self> {
        PayloadCodec::composite1(
            KnownPack::codec().list(),
            |m: &Self| &m.packs,
            |packs| Self { packs },
        )
    }
}

/// One synchronized registry entry: id plus optional encoded body.
///
/// The body is absent exactly when the entry's owning pack is in the
/// negotiated known-pack intersection — the peer must already hold an
/// identical entry under that id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRegistryEntry {
    pub id: ResourceId,
    pub body: Option<Bytes>,
}

impl PackedRegistryEntry {
    pub fn codec() -> PayloadCodec<Self> {
        PayloadCodec::composite2(
            codecs::resource_id(),
            |e: &Self| &e.id,
            codecs::byte_blob().optional(),
            |e: &Self| &e.body,
            |id, body| Self { id, body },
        )
    }
}

/// Contents of one registry, in registry iteration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryData {
    pub registry: ResourceId,
    pub entries: Vec<PackedRegistryEntry>,
}

impl RegistryData {
    pub fn type_id() -> ResourceId {
        ResourceId::from_static(PROTOCOL_NAMESPACE, "registry_data")
    }

    pub fn codec() -> PayloadCodec<Self> {
        PayloadCodec::composite2(
            codecs::resource_id(),
            |m: &Self| &m.registry,
            PackedRegistryEntry::codec().list(),
            |m: &Self| &m.entries,
            |registry, entries| Self { registry, entries },
        )
    }
}

/// A named group of registry entries, possibly including other tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: ResourceId,
    pub elements: Vec<ResourceId>,
    /// Other tags in the same set whose elements this tag absorbs.
    pub includes: Vec<ResourceId>,
}

impl Tag {
    pub fn codec() -> PayloadCodec<Self> {
        PayloadCodec::composite3(
            codecs::resource_id(),
            |t: &Self| &t.name,
            codecs::resource_id().list(),
            |t: &Self| &t.elements,
            codecs::resource_id().list(),
            |t: &Self| &t.includes,
            |name, elements, includes| Self {
                name,
                elements,
                includes,
            },
        )
    }
}

/// All tags declared against one registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    pub registry: ResourceId,
    pub tags: Vec<Tag>,
}

impl TagSet {
    pub fn codec() -> PayloadCodec<Self> {
        PayloadCodec::composite2(
            codecs::resource_id(),
            |s: &Self| &s.registry,
            Tag::codec().list(),
            |s: &Self| &s.tags,
            |registry, tags| Self { registry, tags },
        )
    }
}

/// Supplementary tag payload, always sent after registry data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTags {
    pub sets: Vec<TagSet>,
}

impl UpdateTags {
    pub fn type_id() -> ResourceId {
        ResourceId::from_static(PROTOCOL_NAMESPACE, "update_tags")
    }

    pub fn codec() -> PayloadCodec<Self> {
        PayloadCodec::composite1(
            TagSet::codec().list(),
            |m: &Self| &m.sets,
            |sets| Self { sets },
        )
    }
}

/// Register the synchronization payload types appropriate for the
/// builder's direction.
///
/// # Errors
/// Propagates `DuplicatePayloadType` if any id is already bound.
pub fn register_sync_payloads(builder: &mut PayloadTypeRegistryBuilder) -> Result<()> {
    match builder.direction() {
        FlowDirection::Clientbound => {
            builder.register(KnownPacksRequest::type_id(), KnownPacksRequest::codec())?;
            builder.register(RegistryData::type_id(), RegistryData::codec())?;
            builder.register(UpdateTags::type_id(), UpdateTags::codec())?;
        }
        FlowDirection::Serverbound => {
            builder.register(KnownPacksResponse::type_id(), KnownPacksResponse::codec())?;
        }
    }
    Ok(())
}

/// Convenience constructor: clientbound registry with the sync payloads
/// and a discard fallback.
///
/// # Errors
/// Propagates registration failures.
pub fn clientbound_registry(fallback_max: usize) -> Result<PayloadTypeRegistry> {
    let mut builder = PayloadTypeRegistry::builder(FlowDirection::Clientbound);
    register_sync_payloads(&mut builder)?;
    builder.with_fallback(fallback_max);
    Ok(builder.build())
}

/// Convenience constructor: serverbound registry with the sync payloads
/// and a discard fallback.
///
/// # Errors
/// Propagates registration failures.
pub fn serverbound_registry(fallback_max: usize) -> Result<PayloadTypeRegistry> {
    let mut builder = PayloadTypeRegistry::builder(FlowDirection::Serverbound);
    register_sync_payloads(&mut builder)?;
    builder.with_fallback(fallback_max);
    Ok(builder.build())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_pack_codec_roundtrip() {
        let codec = KnownPack::codec();
        let pack = KnownPack::new("base", "2.1.0");
        let body = codec.encode_value(&pack).unwrap();
        assert_eq!(codec.decode_value(body).unwrap(), pack);
    }

    #[test]
    fn test_registry_data_roundtrip() {
        let codec = RegistryData::codec();
        let data = RegistryData {
            registry: ResourceId::parse("registry:widgets").unwrap(),
            entries: vec![
                PackedRegistryEntry {
                    id: ResourceId::parse("base:button").unwrap(),
                    body: Some(Bytes::from_static(&[1, 2, 3])),
                },
                PackedRegistryEntry {
                    id: ResourceId::parse("base:slider").unwrap(),
                    body: None,
                },
            ],
        };
        let body = codec.encode_value(&data).unwrap();
        assert_eq!(codec.decode_value(body).unwrap(), data);
    }

    #[test]
    fn test_update_tags_roundtrip() {
        let codec = UpdateTags::codec();
        let tags = UpdateTags {
            sets: vec![TagSet {
                registry: ResourceId::parse("registry:widgets").unwrap(),
                tags: vec![Tag {
                    name: ResourceId::parse("base:interactive").unwrap(),
                    elements: vec![ResourceId::parse("base:button").unwrap()],
                    includes: vec![ResourceId::parse("base:inputs").unwrap()],
                }],
            }],
        };
        let body = codec.encode_value(&tags).unwrap();
        assert_eq!(codec.decode_value(body).unwrap(), tags);
    }

    #[test]
    fn test_directions_register_disjoint_types() {
        let clientbound = clientbound_registry(1024).unwrap();
        let serverbound = serverbound_registry(1024).unwrap();

        assert!(clientbound.contains(&KnownPacksRequest::type_id()));
        assert!(clientbound.contains(&RegistryData::type_id()));
        assert!(clientbound.contains(&UpdateTags::type_id()));
        assert!(!clientbound.contains(&KnownPacksResponse::type_id()));

        assert!(serverbound.contains(&KnownPacksResponse::type_id()));
        assert!(!serverbound.contains(&KnownPacksRequest::type_id()));
    }
}
