#![no_main]

use libfuzzer_sys::fuzz_target;
use quic_packet_builder::varint::{decode_varint, encode_varint, encode_varint_with_len, varint_len};

fuzz_target!(|data: &[u8]| {
    // Decode must never panic; anything decoded must re-encode to the same value.
    if let Ok((value, consumed)) = decode_varint(data) {
        let mut buf = [0u8; 8];
        let written = encode_varint(value, &mut buf).unwrap();
        let (value2, consumed2) = decode_varint(&buf[..written]).unwrap();
        assert_eq!(value, value2);
        assert_eq!(consumed2, written);
        assert!(written <= consumed);
        assert_eq!(written, varint_len(value));

        // Re-encoding at the width that was read reproduces the input.
        let written = encode_varint_with_len(value, consumed, &mut buf).unwrap();
        assert_eq!(&buf[..written], &data[..consumed]);
    }
});
