//! Concurrency tests: immutable codec registries require no locking, so
//! encode/decode from many tasks at once must behave identically to the
//! single-threaded case.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bytes::BytesMut;
use registry_protocol::core::codec::PacketCodec;
use registry_protocol::core::packet::Packet;
use registry_protocol::protocol::message::{clientbound_registry, KnownPack, KnownPacksRequest};
use registry_protocol::protocol::payload::Envelope;
use std::sync::Arc;
use tokio_util::codec::Encoder;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_encode_decode_heavy() {
    use tokio::task::JoinSet;

    let iterations = 5_000usize;
    let payload_sizes = [0usize, 64, 512, 4096];

    let mut tasks = JoinSet::new();
    for &size in &payload_sizes {
        tasks.spawn(async move {
            let mut buf = BytesMut::new();
            for i in 0..iterations {
                let payload = vec![((i + size) & 0xFF) as u8; size];
                let p = Packet::plain(payload);
                let mut c = PacketCodec;
                c.encode(p, &mut buf).unwrap();
                let decoded = Packet::from_bytes(&buf);
                assert!(decoded.is_ok());
                buf.clear();
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_envelope_dispatch_shares_one_registry() {
    use tokio::task::JoinSet;

    let registry = Arc::new(clientbound_registry(1024).unwrap());
    let mut tasks = JoinSet::new();

    for worker in 0..8u32 {
        let registry = Arc::clone(&registry);
        tasks.spawn(async move {
            for i in 0..2_000u32 {
                let message = KnownPacksRequest {
                    packs: vec![KnownPack::new("base", format!("{worker}.{i}"))],
                };
                let envelope = Envelope::new(KnownPacksRequest::type_id(), message.clone());
                let frame = registry.encode(&envelope).unwrap();
                let decoded = registry.decode(frame).unwrap();
                assert_eq!(decoded.downcast_ref::<KnownPacksRequest>(), Some(&message));
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }
}
