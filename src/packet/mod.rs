//! QUIC long header data model and wire layout.
//!
//! This module only handles the unprotected header structure. Encryption and
//! header protection live in [`crate::crypto`]; the assembler in
//! [`crate::builder`] stitches the two together.

pub mod header;
pub mod number;

pub use header::{encode_long_header, parse_initial_header, InitialHeader, LongHeaderLayout};
pub use number::PacketNumber;

use crate::error::Error;
use crate::rng::Rng;

/// QUIC v1 version number (RFC 9000).
pub const QUIC_VERSION_1: u32 = 0x0000_0001;

/// Maximum connection ID length (RFC 9000).
pub const MAX_CID_LEN: usize = 20;

/// Minimum size of a client Initial datagram (RFC 9000 §14.1).
pub const MIN_INITIAL_PACKET_SIZE: usize = 1200;

/// Longest token that can be generated: the largest UDP payload.
pub const MAX_TOKEN_LEN: usize = 65527;

/// Check that `value` fits in `bits` bits.
fn check_width(field: &'static str, value: u8, bits: usize) -> Result<u8, Error> {
    let actual = 8 - value.leading_zeros() as usize;
    if actual > bits {
        return Err(Error::InvalidFieldWidth {
            field,
            expected: bits,
            actual,
        });
    }
    Ok(value)
}

/// The bit fields of the first byte plus the version.
///
/// ```text
/// +-+-+-+-+-+-+-+-+
/// |1|1|T T|R R|P P|
/// +-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderFields {
    header_form: u8,
    fixed_bit: u8,
    packet_type: u8,
    reserved_bits: u8,
    pn_len_bits: u8,
    version: u32,
}

impl HeaderFields {
    /// Validate each field's width and build the header fields.
    pub fn new(
        header_form: u8,
        fixed_bit: u8,
        packet_type: u8,
        reserved_bits: u8,
        pn_len_bits: u8,
        version: u32,
    ) -> Result<Self, Error> {
        Ok(Self {
            header_form: check_width("header_form", header_form, 1)?,
            fixed_bit: check_width("fixed_bit", fixed_bit, 1)?,
            packet_type: check_width("packet_type", packet_type, 2)?,
            reserved_bits: check_width("reserved_bits", reserved_bits, 2)?,
            pn_len_bits: check_width("pkt_num_len_bits", pn_len_bits, 2)?,
            version,
        })
    }

    /// A QUIC v1 client Initial with the given packet number length (1-4).
    pub fn initial(pn_len: usize) -> Result<Self, Error> {
        let bits = pn_len
            .checked_sub(1)
            .filter(|b| *b < 4)
            .ok_or(Error::InvalidFieldWidth {
                field: "packet number length",
                expected: 4,
                actual: pn_len,
            })?;
        Self::new(1, 1, 0, 0, bits as u8, QUIC_VERSION_1)
    }

    /// Compose the unprotected first byte.
    pub const fn first_byte(&self) -> u8 {
        (self.header_form << 7)
            | (self.fixed_bit << 6)
            | (self.packet_type << 4)
            | (self.reserved_bits << 2)
            | self.pn_len_bits
    }

    /// Packet number length in bytes selected by the two low bits.
    pub const fn pn_len(&self) -> usize {
        self.pn_len_bits as usize + 1
    }

    pub const fn version(&self) -> u32 {
        self.version
    }
}

impl Default for HeaderFields {
    fn default() -> Self {
        Self {
            header_form: 1,
            fixed_bit: 1,
            packet_type: 0,
            reserved_bits: 0,
            pn_len_bits: 0,
            version: QUIC_VERSION_1,
        }
    }
}

/// A connection ID of 0 to 20 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionId(Vec<u8>);

impl ConnectionId {
    pub fn new(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() > MAX_CID_LEN {
            return Err(Error::ConnectionIdTooLong(bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Draw a fresh connection ID of `len` bytes from `rng`.
    pub fn random(rng: &mut impl Rng, len: usize) -> Result<Self, Error> {
        if len > MAX_CID_LEN {
            return Err(Error::ConnectionIdTooLong(len));
        }
        let mut bytes = vec![0u8; len];
        rng.fill(&mut bytes);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An opaque address validation token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Token(Vec<u8>);

impl Token {
    pub fn new(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Draw a fresh token of `len` bytes. Fails above [`MAX_TOKEN_LEN`].
    pub fn random(rng: &mut impl Rng, len: usize) -> Result<Self, Error> {
        if len > MAX_TOKEN_LEN {
            return Err(Error::ValueTooLarge {
                value: len as u64,
                max: MAX_TOKEN_LEN as u64,
            });
        }
        let mut bytes = vec![0u8; len];
        rng.fill(&mut bytes);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
