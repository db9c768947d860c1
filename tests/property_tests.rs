//! Property-based tests using proptest
//!
//! These tests validate protocol invariants across a wide range of randomly
//! generated inputs, ensuring robust behavior under all conditions.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use registry_protocol::core::packet::Packet;
use registry_protocol::protocol::message::{
    clientbound_registry, KnownPack, KnownPacksRequest, PackedRegistryEntry, RegistryData,
};
use registry_protocol::protocol::payload::{codecs, Envelope};
use registry_protocol::sync::access::{Registry, RegistrySnapshot};
use registry_protocol::sync::packer::{pack_registries, RegistryDescriptor};
use registry_protocol::utils::compression::{compress, decompress, CompressionKind};
use registry_protocol::ResourceId;

// Strategy for a valid resource id half.
fn id_half() -> impl Strategy<Value = String> {
    "[a-z0-9_\\-.]{1,16}"
}

fn resource_id() -> impl Strategy<Value = ResourceId> {
    (id_half(), id_half())
        .prop_map(|(ns, path)| ResourceId::new(ns, path).expect("generated id is valid"))
}

fn known_pack() -> impl Strategy<Value = KnownPack> {
    (id_half(), "[0-9]{1,2}\\.[0-9]{1,2}").prop_map(|(ns, v)| KnownPack::new(ns, v))
}

// Property: Any packet roundtrips through its byte form
proptest! {
    #[test]
    fn prop_packet_roundtrip(payload in prop::collection::vec(any::<u8>(), 0..10000)) {
        let packet = Packet::plain(payload.clone());

        let serialized = packet.to_bytes();
        let deserialized = Packet::from_bytes(&serialized).expect("Deserialization should not fail");

        prop_assert_eq!(deserialized.payload, payload);
    }
}

// Property: Packet serialization is deterministic
proptest! {
    #[test]
    fn prop_packet_serialization_deterministic(payload in prop::collection::vec(any::<u8>(), 0..1000)) {
        let packet = Packet::plain(payload);

        let bytes1 = packet.to_bytes();
        let bytes2 = packet.to_bytes();

        prop_assert_eq!(bytes1, bytes2);
    }
}

// Property: Packet size calculation is accurate
proptest! {
    #[test]
    fn prop_packet_size_accurate(payload in prop::collection::vec(any::<u8>(), 0..10000)) {
        let packet = Packet::plain(payload.clone());
        let serialized = packet.to_bytes();

        // Size: 4 (magic) + 1 (version) + 1 (flags) + 4 (length) + payload
        prop_assert_eq!(serialized.len(), 10 + payload.len());
    }
}

// Property: Resource ids roundtrip through their string and wire forms
proptest! {
    #[test]
    fn prop_resource_id_roundtrip(id in resource_id()) {
        let parsed = ResourceId::parse(&id.to_string()).expect("display form parses");
        prop_assert_eq!(&parsed, &id);

        let codec = codecs::resource_id();
        let body = codec.encode_value(&id).expect("encode");
        let decoded = codec.decode_value(body).expect("decode");
        prop_assert_eq!(decoded, id);
    }
}

// Property: Known-pack lists roundtrip through their codec
proptest! {
    #[test]
    fn prop_known_pack_list_roundtrip(packs in prop::collection::vec(known_pack(), 0..20)) {
        let codec = KnownPack::codec().list();
        let body = codec.encode_value(&packs).expect("encode");
        let decoded = codec.decode_value(body).expect("decode");
        prop_assert_eq!(decoded, packs);
    }
}

// Property: Envelope encode/decode is the identity on registered payloads
proptest! {
    #[test]
    fn prop_envelope_roundtrip(packs in prop::collection::vec(known_pack(), 0..20)) {
        let registry = clientbound_registry(1024).unwrap();
        let message = KnownPacksRequest { packs };
        let envelope = Envelope::new(KnownPacksRequest::type_id(), message.clone());

        let frame = registry.encode(&envelope).expect("encode");
        let decoded = registry.decode(frame).expect("decode");
        prop_assert_eq!(decoded.downcast_ref::<KnownPacksRequest>(), Some(&message));
    }
}

// Property: LZ4 compression roundtrip preserves data
proptest! {
    #[test]
    fn prop_lz4_compression_roundtrip(data in prop::collection::vec(any::<u8>(), 0..50000)) {
        let compressed = compress(&data, &CompressionKind::Lz4).expect("Compression should not fail");
        let decompressed = decompress(&compressed, &CompressionKind::Lz4).expect("Decompression should not fail");

        prop_assert_eq!(decompressed, data);
    }
}

// Property: Zstd compression roundtrip preserves data
proptest! {
    #[test]
    fn prop_zstd_compression_roundtrip(data in prop::collection::vec(any::<u8>(), 0..50000)) {
        let compressed = compress(&data, &CompressionKind::Zstd).expect("Compression should not fail");
        let decompressed = decompress(&compressed, &CompressionKind::Zstd).expect("Decompression should not fail");

        prop_assert_eq!(decompressed, data);
    }
}

// Property: Decompression of invalid data returns error (doesn't panic)
proptest! {
    #[test]
    fn prop_decompression_invalid_data_returns_error(data in prop::collection::vec(any::<u8>(), 0..1000)) {
        let _ = decompress(&data, &CompressionKind::Lz4);
        let _ = decompress(&data, &CompressionKind::Zstd);

        prop_assert!(true);
    }
}

// Property: Envelope decoding of arbitrary bytes never panics
proptest! {
    #[test]
    fn prop_envelope_decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..2000)) {
        let registry = clientbound_registry(1024).unwrap();
        let _ = registry.decode(bytes::Bytes::from(data));

        prop_assert!(true);
    }
}

// Property: Packing is deterministic and elides exactly the known packs
proptest! {
    #[test]
    fn prop_packing_omission_dichotomy(
        entries in prop::collection::vec((resource_id(), any::<u32>(), prop::option::of(known_pack())), 1..20),
        known in prop::collection::vec(known_pack(), 0..5),
    ) {
        let mut registry = Registry::new(ResourceId::parse("registry:things").unwrap());
        let mut expected = Vec::new();
        for (id, value, source) in entries {
            if registry.insert(id.clone(), value, source.clone()).is_ok() {
                expected.push((id, source));
            }
        }
        let snapshot = RegistrySnapshot::builder().add(registry).unwrap().build();
        let descriptors = vec![RegistryDescriptor::new(
            ResourceId::parse("registry:things").unwrap(),
            codecs::u32(),
        )];

        let run = || {
            let mut out: Vec<RegistryData> = Vec::new();
            pack_registries(&descriptors, &snapshot, &known, |key, entries| {
                out.push(RegistryData { registry: key.clone(), entries });
                Ok(())
            })
            .expect("packing should not fail");
            out
        };

        let first = run();
        let second = run();
        prop_assert_eq!(&first, &second, "packing is deterministic");

        let packed: Vec<&PackedRegistryEntry> =
            first.iter().flat_map(|d| d.entries.iter()).collect();
        prop_assert_eq!(packed.len(), expected.len());
        for (packed_entry, (id, source)) in packed.iter().zip(expected.iter()) {
            prop_assert_eq!(&packed_entry.id, id);
            let should_elide = source.as_ref().is_some_and(|s| known.contains(s));
            prop_assert_eq!(packed_entry.body.is_none(), should_elide);
        }
    }
}
