/// QUIC variable-length integer encoding (RFC 9000 §16).
///
/// | 2MSB | Length  | Usable Bits | Range                        |
/// |------|---------|-------------|------------------------------|
/// | 00   | 1 byte  | 6           | 0–63                         |
/// | 01   | 2 bytes | 14          | 0–16383                      |
/// | 10   | 4 bytes | 30          | 0–1073741823                 |
/// | 11   | 8 bytes | 62          | 0–4611686018427387903        |

use crate::error::Error;

/// Maximum value representable as a QUIC varint (2^62 - 1).
pub const MAX_VARINT: u64 = (1 << 62) - 1;

/// How many bytes are needed to encode `value`?
pub const fn varint_len(value: u64) -> usize {
    if value <= 63 {
        1
    } else if value <= 16383 {
        2
    } else if value <= 1_073_741_823 {
        4
    } else {
        8
    }
}

/// Largest value that fits a varint of `len` bytes.
const fn class_max(len: usize) -> u64 {
    match len {
        1 => 63,
        2 => 16383,
        4 => 1_073_741_823,
        _ => MAX_VARINT,
    }
}

/// Decode a QUIC variable-length integer from `buf`.
///
/// Returns `(value, bytes_consumed)` on success.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), Error> {
    let Some(&first) = buf.first() else {
        return Err(Error::TruncatedInput {
            needed: 1,
            available: 0,
        });
    };

    let len = 1 << (first >> 6);
    if buf.len() < len {
        return Err(Error::TruncatedInput {
            needed: len,
            available: buf.len(),
        });
    }

    let value = buf[1..len]
        .iter()
        .fold(u64::from(first & 0x3f), |acc, &b| (acc << 8) | u64::from(b));

    Ok((value, len))
}

/// Encode a QUIC variable-length integer into `buf` using the smallest class.
///
/// Returns the number of bytes written.
pub fn encode_varint(value: u64, buf: &mut [u8]) -> Result<usize, Error> {
    if value > MAX_VARINT {
        return Err(Error::ValueTooLarge {
            value,
            max: MAX_VARINT,
        });
    }
    encode_varint_with_len(value, varint_len(value), buf)
}

/// Encode `value` using exactly `len` bytes (1, 2, 4 or 8).
///
/// Non-minimal encodings are legal on the wire; this is how a caller forces a
/// wider class than [`encode_varint`] would pick.
pub fn encode_varint_with_len(value: u64, len: usize, buf: &mut [u8]) -> Result<usize, Error> {
    if !matches!(len, 1 | 2 | 4 | 8) {
        return Err(Error::InvalidFieldWidth {
            field: "varint length",
            expected: varint_len(value),
            actual: len,
        });
    }
    let max = class_max(len);
    if value > max {
        return Err(Error::ValueTooLarge { value, max });
    }
    if buf.len() < len {
        return Err(Error::TruncatedInput {
            needed: len,
            available: buf.len(),
        });
    }

    let bytes = value.to_be_bytes();
    buf[..len].copy_from_slice(&bytes[8 - len..]);
    // Length prefix: 00, 01, 10, 11 for 1, 2, 4, 8 bytes.
    buf[0] |= (len.trailing_zeros() as u8) << 6;

    Ok(len)
}

/// Append the minimal encoding of `value` to `out`.
pub fn put_varint(out: &mut Vec<u8>, value: u64) -> Result<usize, Error> {
    let mut buf = [0u8; 8];
    let len = encode_varint(value, &mut buf)?;
    out.extend_from_slice(&buf[..len]);
    Ok(len)
}

/// Append `value` to `out` using exactly `len` bytes.
pub fn put_varint_with_len(out: &mut Vec<u8>, value: u64, len: usize) -> Result<usize, Error> {
    let mut buf = [0u8; 8];
    let len = encode_varint_with_len(value, len, &mut buf)?;
    out.extend_from_slice(&buf[..len]);
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(v: u64, expected_len: usize) {
        let mut buf = [0u8; 8];
        let written = encode_varint(v, &mut buf).unwrap();
        assert_eq!(written, expected_len, "value {v}");
        let (decoded, consumed) = decode_varint(&buf[..written]).unwrap();
        assert_eq!(decoded, v);
        assert_eq!(consumed, expected_len);
    }

    #[test]
    fn roundtrip_each_class() {
        for v in 0..=63u64 {
            roundtrip(v, 1);
        }
        for v in [64, 100, 1000, 16383] {
            roundtrip(v, 2);
        }
        for v in [16384, 100_000, 1_073_741_823] {
            roundtrip(v, 4);
        }
        for v in [1_073_741_824, MAX_VARINT] {
            roundtrip(v, 8);
        }
    }

    /// RFC 9000 §A.1 test vectors.
    #[test]
    fn rfc_test_vectors() {
        let input = [0xc2, 0x19, 0x7c, 0x5e, 0xff, 0x14, 0xe8, 0x8c];
        assert_eq!(decode_varint(&input).unwrap(), (151_288_809_941_952_652, 8));

        let input = [0x9d, 0x7f, 0x3e, 0x7d];
        assert_eq!(decode_varint(&input).unwrap(), (494_878_333, 4));

        let input = [0x7b, 0xbd];
        assert_eq!(decode_varint(&input).unwrap(), (15293, 2));

        assert_eq!(decode_varint(&[0x25]).unwrap(), (37, 1));

        // Non-minimal two-byte encoding of 37.
        assert_eq!(decode_varint(&[0x40, 0x25]).unwrap(), (37, 2));
    }

    #[test]
    fn class_switch_at_64() {
        let mut buf = [0u8; 8];
        assert_eq!(encode_varint(63, &mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0x3f);
        assert_eq!(encode_varint(64, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[0x40, 0x40]);
    }

    #[test]
    fn varint_len_boundaries() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(63), 1);
        assert_eq!(varint_len(64), 2);
        assert_eq!(varint_len(16383), 2);
        assert_eq!(varint_len(16384), 4);
        assert_eq!(varint_len(1_073_741_823), 4);
        assert_eq!(varint_len(1_073_741_824), 8);
        assert_eq!(varint_len(MAX_VARINT), 8);
    }

    #[test]
    fn value_too_large() {
        let mut buf = [0u8; 8];
        assert_eq!(
            encode_varint(1 << 62, &mut buf),
            Err(Error::ValueTooLarge {
                value: 1 << 62,
                max: MAX_VARINT
            })
        );
    }

    #[test]
    fn forced_width() {
        let mut buf = [0u8; 8];
        assert_eq!(encode_varint_with_len(22, 2, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[0x40, 0x16]);
        assert_eq!(decode_varint(&buf[..2]).unwrap(), (22, 2));

        assert_eq!(encode_varint_with_len(5, 8, &mut buf).unwrap(), 8);
        assert_eq!(&buf[..8], &[0xc0, 0, 0, 0, 0, 0, 0, 5]);

        assert!(matches!(
            encode_varint_with_len(64, 1, &mut buf),
            Err(Error::ValueTooLarge { max: 63, .. })
        ));
        assert!(matches!(
            encode_varint_with_len(1, 3, &mut buf),
            Err(Error::InvalidFieldWidth { actual: 3, .. })
        ));
    }

    #[test]
    fn buffer_too_small_encode() {
        let mut buf = [0u8; 1];
        assert!(matches!(
            encode_varint(16384, &mut buf),
            Err(Error::TruncatedInput { needed: 4, .. })
        ));
    }

    #[test]
    fn truncated_decode() {
        assert_eq!(
            decode_varint(&[]),
            Err(Error::TruncatedInput {
                needed: 1,
                available: 0
            })
        );
        // 2-byte varint prefix but only 1 byte of data
        assert_eq!(
            decode_varint(&[0x40]),
            Err(Error::TruncatedInput {
                needed: 2,
                available: 1
            })
        );
        assert_eq!(
            decode_varint(&[0xc0, 0, 0, 0, 0, 0, 0]),
            Err(Error::TruncatedInput {
                needed: 8,
                available: 7
            })
        );
    }

    #[test]
    fn put_appends() {
        let mut out = vec![0xaa];
        put_varint(&mut out, 494_878_333).unwrap();
        put_varint_with_len(&mut out, 0, 2).unwrap();
        assert_eq!(out, [0xaa, 0x9d, 0x7f, 0x3e, 0x7d, 0x40, 0x00]);
    }

    proptest! {
        #[test]
        fn proptest_roundtrip_minimal(v in 0..=MAX_VARINT) {
            let mut buf = [0u8; 8];
            let written = encode_varint(v, &mut buf).unwrap();
            prop_assert_eq!(written, varint_len(v));
            prop_assert_eq!(decode_varint(&buf[..written]).unwrap(), (v, written));
        }

        #[test]
        fn proptest_out_of_range(v in (MAX_VARINT + 1)..=u64::MAX) {
            let mut buf = [0u8; 8];
            let is_too_large = matches!(encode_varint(v, &mut buf), Err(Error::ValueTooLarge { .. }));
            prop_assert!(is_too_large);
        }

        #[test]
        fn proptest_truncated_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..8)) {
            match decode_varint(&bytes) {
                Ok((_, consumed)) => prop_assert!(consumed <= bytes.len()),
                Err(Error::TruncatedInput { needed, available }) => {
                    prop_assert!(needed > available);
                    prop_assert_eq!(available, bytes.len());
                }
                Err(e) => prop_assert!(false, "unexpected error {e:?}"),
            }
        }
    }
}
