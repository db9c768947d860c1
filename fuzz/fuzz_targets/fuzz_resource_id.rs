#![no_main]

use libfuzzer_sys::fuzz_target;
use registry_protocol::ResourceId;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(id) = ResourceId::parse(text) {
            // Parsed ids must survive the display/parse roundtrip.
            let reparsed = ResourceId::parse(&id.to_string()).expect("display form parses");
            assert_eq!(id, reparsed);
        }
    }
});
