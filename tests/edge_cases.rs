#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Comprehensive edge-case tests for production-grade reliability
//! Tests boundary conditions, error scenarios, resource limits, and
//! malformed wire input.

use bytes::{BufMut, BytesMut};
use registry_protocol::config::{MAGIC_BYTES, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
use registry_protocol::core::packet::Packet;
use registry_protocol::error::ProtocolError;
use registry_protocol::protocol::message::{clientbound_registry, Tag, TagSet};
use registry_protocol::sync::validation::{
    validate_tag_references, validate_tag_sets, ProblemCollector,
};
use registry_protocol::utils::compression::{decompress, CompressionKind};
use registry_protocol::ResourceId;

fn id(s: &str) -> ResourceId {
    ResourceId::parse(s).unwrap()
}

// ============================================================================
// PACKET EDGE CASES
// ============================================================================

#[test]
fn test_packet_empty_payload() {
    let packet = Packet::plain(vec![]);
    let bytes = packet.to_bytes();
    let decoded = Packet::from_bytes(&bytes).expect("Should decode empty payload");
    assert_eq!(decoded.payload.len(), 0);
    assert_eq!(decoded.version, PROTOCOL_VERSION);
}

#[test]
fn test_packet_max_payload_size() {
    let max_payload = vec![0xAB; MAX_PAYLOAD_SIZE];
    let packet = Packet::plain(max_payload);
    let bytes = packet.to_bytes();
    let decoded = Packet::from_bytes(&bytes).expect("Should decode max payload");
    assert_eq!(decoded.payload.len(), MAX_PAYLOAD_SIZE);
}

#[test]
fn test_packet_oversized_claim_rejected() {
    // Header claiming a size larger than MAX_PAYLOAD_SIZE, with almost no
    // actual data behind it.
    let mut bad_bytes = MAGIC_BYTES.to_vec();
    bad_bytes.push(PROTOCOL_VERSION);
    bad_bytes.push(0);
    bad_bytes.extend_from_slice(&(20_000_000u32).to_be_bytes());
    bad_bytes.extend_from_slice(&[0xFF; 10]);

    match Packet::from_bytes(&bad_bytes) {
        Err(ProtocolError::OversizedPacket(20_000_000)) => {}
        other => panic!("Unexpected result: {other:?}"),
    }
}

#[test]
fn test_packet_truncated_inputs() {
    for len in 0..9 {
        let bytes = vec![0x52; len];
        assert!(
            Packet::from_bytes(&bytes).is_err(),
            "{len}-byte input must be rejected"
        );
    }
}

#[test]
fn test_packet_header_only_zero_length() {
    let mut bytes = MAGIC_BYTES.to_vec();
    bytes.push(PROTOCOL_VERSION);
    bytes.push(0);
    bytes.extend_from_slice(&0u32.to_be_bytes());
    let decoded = Packet::from_bytes(&bytes).expect("zero-length payload is valid");
    assert!(decoded.payload.is_empty());
}

// ============================================================================
// RESOURCE ID EDGE CASES
// ============================================================================

#[test]
fn test_resource_id_single_characters() {
    let parsed = ResourceId::parse("a:b").unwrap();
    assert_eq!(parsed.namespace(), "a");
    assert_eq!(parsed.path(), "b");
}

#[test]
fn test_resource_id_deep_path() {
    let parsed = ResourceId::parse("pack:a/b/c/d/e").unwrap();
    assert_eq!(parsed.path(), "a/b/c/d/e");
}

#[test]
fn test_resource_id_rejects_uppercase_and_spaces() {
    for bad in ["Pack:thing", "pack:Thing", "pack:th ing", "pa ck:thing", "pack:thing!"] {
        assert!(ResourceId::parse(bad).is_err(), "{bad:?} must be rejected");
    }
}

#[test]
fn test_resource_id_slash_only_in_path() {
    assert!(ResourceId::parse("pack:a/b").is_ok());
    assert!(ResourceId::new("pa/ck", "thing").is_err());
}

// ============================================================================
// DECOMPRESSION BOMB PROTECTION
// ============================================================================

#[test]
fn test_lz4_bomb_payload_rejected() {
    // Claims to decompress to ~3GB.
    let malicious = vec![0x2b, 0x60, 0xbb, 0xbb];
    assert!(decompress(&malicious, &CompressionKind::Lz4).is_err());
}

#[test]
fn test_compressed_frame_with_corrupt_body_rejected() {
    use registry_protocol::core::packet::FLAG_COMPRESSED;
    let packet = Packet {
        version: PROTOCOL_VERSION,
        flags: FLAG_COMPRESSED,
        payload: vec![0xFF, 0xFE, 0xFD],
    };
    assert!(packet.into_payload().is_err());
}

// ============================================================================
// ENVELOPE LIMITS
// ============================================================================

#[test]
fn test_zero_size_fallback_bound() {
    let registry = clientbound_registry(0).unwrap();
    let mut frame = BytesMut::new();
    registry_protocol::core::wire::put_resource_id(&mut frame, &id("modded:thing"));

    // Empty body within a zero bound: allowed.
    let decoded = registry.decode(frame.clone().freeze()).unwrap();
    assert!(decoded
        .downcast_ref::<registry_protocol::protocol::registry::DiscardedPayload>()
        .is_some());

    // Any body at all: rejected.
    frame.put_u8(0);
    assert!(registry.decode(frame.freeze()).is_err());
}

#[test]
fn test_empty_frame_rejected() {
    let registry = clientbound_registry(1024).unwrap();
    assert!(registry.decode(BytesMut::new().freeze()).is_err());
}

// ============================================================================
// CYCLE DETECTION
// ============================================================================

fn tag(name: &str, includes: &[&str]) -> Tag {
    Tag {
        name: id(name),
        elements: vec![],
        includes: includes.iter().map(|s| id(s)).collect(),
    }
}

#[test]
fn test_two_tag_cycle_reports_exactly_one_problem() {
    let set = TagSet {
        registry: id("registry:widgets"),
        tags: vec![tag("base:a", &["base:b"]), tag("base:b", &["base:a"])],
    };
    let collector = ProblemCollector::new();
    let root = set.tags[0].clone();
    validate_tag_references(&set, &root, &collector);

    let problems = collector.into_problems();
    assert_eq!(problems.len(), 1);
    assert!(problems[0].message.contains("cycle"));
}

#[test]
fn test_long_cycle_detected_without_stack_overflow() {
    // t0 -> t1 -> ... -> t499 -> t0
    let mut tags = Vec::new();
    for i in 0..500 {
        let next = format!("base:t{}", (i + 1) % 500);
        tags.push(Tag {
            name: id(&format!("base:t{i}")),
            elements: vec![],
            includes: vec![id(&next)],
        });
    }
    let set = TagSet {
        registry: id("registry:widgets"),
        tags,
    };
    let collector = ProblemCollector::new();
    let root = set.tags[0].clone();
    validate_tag_references(&set, &root, &collector);
    assert_eq!(collector.len(), 1, "cycle reported once, walk terminated");
}

#[test]
fn test_full_set_validation_reports_per_root() {
    // Validating the whole set walks from both roots, so the a<->b cycle
    // is found once per entry point.
    let set = TagSet {
        registry: id("registry:widgets"),
        tags: vec![tag("base:a", &["base:b"]), tag("base:b", &["base:a"])],
    };
    let collector = ProblemCollector::new();
    validate_tag_sets(&[set], &collector);
    assert_eq!(collector.len(), 2);
}

#[test]
fn test_sibling_branches_do_not_share_visits() {
    // Both b and c include d; neither path revisits anything.
    let set = TagSet {
        registry: id("registry:widgets"),
        tags: vec![
            tag("base:a", &["base:b", "base:c"]),
            tag("base:b", &["base:d"]),
            tag("base:c", &["base:d"]),
            tag("base:d", &[]),
        ],
    };
    let collector = ProblemCollector::new();
    let root = set.tags[0].clone();
    validate_tag_references(&set, &root, &collector);
    assert!(collector.is_empty());
}

// ============================================================================
// SERVER CONTEXT GUARDS
// ============================================================================

#[test]
fn test_server_context_rejects_cyclic_tags() {
    use registry_protocol::config::TransportConfig;
    use registry_protocol::protocol::message::serverbound_registry;
    use registry_protocol::sync::access::RegistrySnapshot;
    use registry_protocol::transport::SyncServerContext;
    use std::sync::Arc;

    let result = SyncServerContext::new(
        vec![],
        Arc::new(RegistrySnapshot::builder().build()),
        vec![],
        vec![TagSet {
            registry: id("registry:widgets"),
            tags: vec![tag("base:a", &["base:a"])],
        }],
        clientbound_registry(1024).unwrap(),
        serverbound_registry(1024).unwrap(),
        TransportConfig::default(),
    );

    match result {
        Err(ProtocolError::ConfigError(message)) => {
            assert!(message.contains("cycle"));
        }
        Err(other) => panic!("Unexpected error: {other:?}"),
        Ok(_) => panic!("cyclic tags must be rejected"),
    }
}
