//! Packet number encoding (RFC 9000 §17.1).
//!
//! The packet number is written in exactly the number of bytes selected by
//! the packet number length bits, big-endian and zero-padded.

use crate::error::Error;
use crate::rng::Rng;

/// A packet number together with its encoded width (1-4 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketNumber {
    value: u32,
    len: usize,
}

impl PacketNumber {
    /// Encode `value` in `len` bytes. Fails if `value` does not fit.
    pub fn new(value: u32, len: usize) -> Result<Self, Error> {
        if !(1..=4).contains(&len) {
            return Err(Error::InvalidFieldWidth {
                field: "packet_number",
                expected: 4,
                actual: len,
            });
        }
        let max = if len == 4 {
            u64::from(u32::MAX)
        } else {
            (1u64 << (8 * len)) - 1
        };
        if u64::from(value) > max {
            return Err(Error::ValueTooLarge {
                value: u64::from(value),
                max,
            });
        }
        Ok(Self { value, len })
    }

    /// Take the width from the bytes themselves.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if !(1..=4).contains(&bytes.len()) {
            return Err(Error::InvalidFieldWidth {
                field: "packet_number",
                expected: 4,
                actual: bytes.len(),
            });
        }
        let value = bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
        Ok(Self {
            value,
            len: bytes.len(),
        })
    }

    /// A uniformly random packet number of `len` bytes.
    pub fn random(rng: &mut impl Rng, len: usize) -> Result<Self, Error> {
        let mut bytes = [0u8; 4];
        let bytes = bytes.get_mut(..len).ok_or(Error::InvalidFieldWidth {
            field: "packet_number",
            expected: 4,
            actual: len,
        })?;
        rng.fill(bytes);
        Self::from_bytes(bytes)
    }

    pub const fn value(&self) -> u32 {
        self.value
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    /// Big-endian bytes, exactly `len()` long.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.value.to_be_bytes()[4 - self.len..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SeededRng;

    #[test]
    fn zero_padded_big_endian() {
        assert_eq!(PacketNumber::new(0, 1).unwrap().to_bytes(), [0x00]);
        assert_eq!(PacketNumber::new(2, 4).unwrap().to_bytes(), [0, 0, 0, 2]);
        assert_eq!(PacketNumber::new(0x0102, 3).unwrap().to_bytes(), [0, 1, 2]);
        assert_eq!(
            PacketNumber::new(u32::MAX, 4).unwrap().to_bytes(),
            [0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn value_must_fit_width() {
        assert!(PacketNumber::new(255, 1).is_ok());
        assert_eq!(
            PacketNumber::new(256, 1),
            Err(Error::ValueTooLarge { value: 256, max: 255 })
        );
        assert!(PacketNumber::new(0x01_0000, 2).is_err());
        assert!(PacketNumber::new(0, 0).is_err());
        assert!(PacketNumber::new(0, 5).is_err());
    }

    #[test]
    fn from_bytes_keeps_width() {
        let pn = PacketNumber::from_bytes(&[0x00, 0x01]).unwrap();
        assert_eq!(pn.value(), 1);
        assert_eq!(pn.len(), 2);
        assert_eq!(pn.to_bytes(), [0x00, 0x01]);
        assert!(PacketNumber::from_bytes(&[]).is_err());
        assert!(PacketNumber::from_bytes(&[0; 5]).is_err());
    }

    #[test]
    fn random_has_requested_width() {
        let mut rng = SeededRng::new(3);
        for len in 1..=4 {
            let pn = PacketNumber::random(&mut rng, len).unwrap();
            assert_eq!(pn.len(), len);
            assert_eq!(pn.to_bytes().len(), len);
        }
        assert!(PacketNumber::random(&mut rng, 5).is_err());
    }
}
