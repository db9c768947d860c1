#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use registry_protocol::protocol::message::clientbound_registry;

fuzz_target!(|data: &[u8]| {
    // Fuzz envelope dispatch with the fallback enabled - decoding must
    // never panic, whatever the type id or body looks like.
    if let Ok(registry) = clientbound_registry(4096) {
        let _ = registry.decode(Bytes::copy_from_slice(data));
    }
});
