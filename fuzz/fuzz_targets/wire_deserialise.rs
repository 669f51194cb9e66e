#![no_main]
use libfuzzer_sys::fuzz_target;

use dns_wire::types::Packet;

// Deserialising arbitrary octets must fail cleanly: no panics, no
// unbounded pointer chasing.
fuzz_target!(|data: &[u8]| {
    let _ = Packet::from_octets(data);
});
