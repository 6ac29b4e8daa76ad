#![no_main]

use libfuzzer_sys::fuzz_target;

use rebase_bridge::PoolPayload;

fuzz_target!(|data: &[u8]| {
    // Decoding must never panic, and anything that decodes re-encodes to the same bytes.
    if let Ok(payload) = PoolPayload::decode(data) {
        assert_eq!(payload.encode(), data);
    }
});
