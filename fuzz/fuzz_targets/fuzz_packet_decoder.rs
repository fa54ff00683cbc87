//! Fuzz target: `PacketDecoder::feed`
//!
//! Drives arbitrary byte sequences into the AS608 streaming decoder and
//! asserts that it never panics, never over-reports consumption, and never
//! yields a payload past the packet bound.
//!
//! cargo fuzz run fuzz_packet_decoder

#![no_main]

use biomark::drivers::as608::{MAX_PAYLOAD, PacketDecoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = PacketDecoder::new();

    let mut rest = data;
    while !rest.is_empty() {
        let (used, packet) = decoder.feed(rest);
        assert!(used <= rest.len(), "consumed more than fed");
        if let Some(p) = packet {
            assert!(p.payload.len() <= MAX_PAYLOAD, "payload exceeds MAX_PAYLOAD");
        }
        if used == 0 {
            break;
        }
        rest = &rest[used..];
    }

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    let _ = decoder.feed(data);
});
