#![no_main]

use libfuzzer_sys::fuzz_target;
use quic_packet_builder::open::{open_packet, OpenOptions};
use quic_packet_builder::packet::parse_initial_header;

fuzz_target!(|data: &[u8]| {
    if let Ok(hdr) = parse_initial_header(data) {
        assert!(hdr.pn_offset <= data.len());
        assert_eq!(hdr.dcid.len(), usize::from(data[5]));
    }

    // Arbitrary bytes must be rejected, never panic.
    let _ = open_packet(data, &OpenOptions::default());
});
