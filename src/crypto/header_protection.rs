//! Header protection sampling and masking (RFC 9001 §5.4).

use crate::error::Error;

/// Header protection samples are always 16 bytes.
pub const SAMPLE_LEN: usize = 16;

/// Where the header protection sample comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SampleSource {
    /// `ciphertext[4 - pn_len..][..16]`: the packet number is treated as
    /// 4 bytes wide and the sample starts right after it.
    #[default]
    Standard,
    /// Use these bytes verbatim.
    Raw(Vec<u8>),
    /// Take 16 bytes starting `offset` bytes after the start of the packet
    /// number field.
    Offset(usize),
}

/// Select the header protection sample from `ciphertext` (ciphertext ‖ tag,
/// starting immediately after the packet number).
///
/// Fails with `TruncatedInput` if the window runs past the ciphertext, or if
/// an offset points inside the packet number itself.
pub fn select_sample(
    source: &SampleSource,
    ciphertext: &[u8],
    pn_len: usize,
) -> Result<Vec<u8>, Error> {
    let start = match source {
        SampleSource::Raw(bytes) => {
            if bytes.len() != SAMPLE_LEN {
                return Err(Error::InvalidFieldWidth {
                    field: "sample",
                    expected: SAMPLE_LEN,
                    actual: bytes.len(),
                });
            }
            return Ok(bytes.clone());
        }
        SampleSource::Standard => 4usize.saturating_sub(pn_len),
        SampleSource::Offset(offset) => {
            offset
                .checked_sub(pn_len)
                .ok_or(Error::TruncatedInput {
                    needed: pn_len,
                    available: *offset,
                })?
        }
    };

    ciphertext
        .get(start..start + SAMPLE_LEN)
        .map(<[u8]>::to_vec)
        .ok_or(Error::TruncatedInput {
            needed: start + SAMPLE_LEN,
            available: ciphertext.len(),
        })
}

/// Bits of the first byte covered by header protection.
///
/// Long headers protect the reserved bits and packet number length (low 4
/// bits); short headers additionally protect the key phase (low 5 bits).
pub const fn first_byte_mask_bits(first_byte: u8) -> u8 {
    if first_byte & 0x80 != 0 {
        0x0f
    } else {
        0x1f
    }
}

/// Apply (or remove) header protection.
///
/// XORs the protected bits of `first_byte` with `mask[0]` and each
/// packet-number byte with the following mask byte. Applying the same mask
/// twice restores the input. Packet numbers longer than 4 bytes are rejected.
pub fn apply_mask(first_byte: u8, pn_bytes: &[u8], mask: &[u8; 5]) -> Result<(u8, Vec<u8>), Error> {
    if pn_bytes.is_empty() || pn_bytes.len() > 4 {
        return Err(Error::InvalidFieldWidth {
            field: "packet_number",
            expected: 4,
            actual: pn_bytes.len(),
        });
    }

    // The form bit is never protected, so the same bits are selected on
    // both the protect and unprotect passes.
    let protected_first = first_byte ^ (mask[0] & first_byte_mask_bits(first_byte));
    let protected_pn = pn_bytes
        .iter()
        .zip(&mask[1..])
        .map(|(b, m)| b ^ m)
        .collect();

    Ok((protected_first, protected_pn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn standard_sample_offset_per_pn_len() {
        let ciphertext: Vec<u8> = (0u8..40).collect();
        for pn_len in 1..=4usize {
            let sample = select_sample(&SampleSource::Standard, &ciphertext, pn_len).unwrap();
            let start = 4 - pn_len;
            assert_eq!(sample, &ciphertext[start..start + 16], "pn_len {pn_len}");
        }
    }

    #[test]
    fn offset_sample_counts_from_packet_number() {
        let ciphertext: Vec<u8> = (0u8..40).collect();
        // Offset 4 with a 1-byte packet number is the standard position.
        assert_eq!(
            select_sample(&SampleSource::Offset(4), &ciphertext, 1).unwrap(),
            select_sample(&SampleSource::Standard, &ciphertext, 1).unwrap()
        );
        assert_eq!(
            select_sample(&SampleSource::Offset(10), &ciphertext, 2).unwrap(),
            &ciphertext[8..24]
        );
    }

    #[test]
    fn offset_inside_packet_number_rejected() {
        let ciphertext = [0u8; 32];
        assert!(matches!(
            select_sample(&SampleSource::Offset(1), &ciphertext, 2),
            Err(Error::TruncatedInput { .. })
        ));
    }

    #[test]
    fn short_ciphertext_rejected() {
        // pn_len 1 needs 3 + 16 bytes of ciphertext
        let ciphertext = [0u8; 18];
        assert_eq!(
            select_sample(&SampleSource::Standard, &ciphertext, 1),
            Err(Error::TruncatedInput {
                needed: 19,
                available: 18
            })
        );
        assert!(select_sample(&SampleSource::Standard, &ciphertext, 4).is_ok());
    }

    #[test]
    fn raw_sample() {
        let raw = vec![0xaa; 16];
        assert_eq!(
            select_sample(&SampleSource::Raw(raw.clone()), &[], 1).unwrap(),
            raw
        );
        assert!(matches!(
            select_sample(&SampleSource::Raw(vec![0; 8]), &[], 1),
            Err(Error::InvalidFieldWidth { expected: 16, actual: 8, .. })
        ));
    }

    /// RFC 9001 §A.2: mask 437b9aec36 applied to c3 / 00000002.
    #[test]
    fn apply_mask_rfc9001_a2() {
        let mask = [0x43, 0x7b, 0x9a, 0xec, 0x36];
        let (first, pn) = apply_mask(0xc3, &[0x00, 0x00, 0x00, 0x02], &mask).unwrap();
        assert_eq!(first, 0xc0);
        assert_eq!(pn, [0x7b, 0x9a, 0xec, 0x34]);
    }

    #[test]
    fn long_header_keeps_high_nibble() {
        let (first, _) = apply_mask(0xc0, &[0], &[0xff; 5]).unwrap();
        assert_eq!(first, 0xcf);
        let (first, _) = apply_mask(0x40, &[0], &[0xff; 5]).unwrap();
        assert_eq!(first, 0x5f);
    }

    #[test]
    fn packet_number_width_checked() {
        assert!(apply_mask(0xc0, &[], &[0; 5]).is_err());
        assert!(apply_mask(0xc0, &[0; 5], &[0; 5]).is_err());
    }

    proptest! {
        #[test]
        fn apply_mask_is_involution(
            first in any::<u8>(),
            pn in proptest::collection::vec(any::<u8>(), 1..=4),
            mask in any::<[u8; 5]>(),
        ) {
            let (p_first, p_pn) = apply_mask(first, &pn, &mask).unwrap();
            let (u_first, u_pn) = apply_mask(p_first, &p_pn, &mask).unwrap();
            prop_assert_eq!(u_first, first);
            prop_assert_eq!(u_pn, pn);
            prop_assert_eq!(p_first & 0xe0, first & 0xe0);
        }
    }
}
