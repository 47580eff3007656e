//! Packet opener: removes Initial packet protection.
//!
//! Used to check packets produced by the builder and to inspect Initial
//! packets lifted out of captures. Only the first packet in `buf` is read;
//! trailing bytes beyond its Length field are ignored.

use tracing::debug;

use crate::crypto::key_schedule::{derive_packet_keys, KNOWN_VERSIONS};
use crate::crypto::rustcrypto::Aes128GcmProvider;
use crate::crypto::{apply_mask, CryptoProvider, Direction, InitialVersion, KeyOverride, SAMPLE_LEN};
use crate::error::Error;
use crate::packet::{parse_initial_header, PacketNumber};

/// How to derive the keys for opening.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub direction: Direction,
    /// Derive keys from this DCID instead of the one in the packet.
    pub key_dcid: Option<Vec<u8>>,
    pub key_override: Option<KeyOverride>,
    pub versions: &'static [InitialVersion],
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Client,
            key_dcid: None,
            key_override: None,
            versions: KNOWN_VERSIONS,
        }
    }
}

/// A packet with protection removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPacket {
    /// First byte with header protection removed.
    pub first_byte: u8,
    pub version: u32,
    pub dcid: Vec<u8>,
    pub scid: Vec<u8>,
    pub token: Vec<u8>,
    pub length: u64,
    pub packet_number: PacketNumber,
    pub payload: Vec<u8>,
}

/// Open `buf` with the QUIC v1 Initial suite.
pub fn open_packet(buf: &[u8], options: &OpenOptions) -> Result<OpenedPacket, Error> {
    open_packet_with(&Aes128GcmProvider, buf, options)
}

/// Remove header protection, then authenticate and decrypt the payload.
pub fn open_packet_with<C: CryptoProvider>(
    provider: &C,
    buf: &[u8],
    options: &OpenOptions,
) -> Result<OpenedPacket, Error> {
    let hdr = parse_initial_header(buf)?;
    let pn_offset = hdr.pn_offset;

    let length = usize::try_from(hdr.length).unwrap_or(usize::MAX);
    let end = pn_offset.saturating_add(length);
    if end > buf.len() {
        return Err(Error::TruncatedInput {
            needed: end,
            available: buf.len(),
        });
    }

    let key_dcid = options.key_dcid.as_deref().unwrap_or(hdr.dcid);
    let keys = derive_packet_keys(
        provider,
        options.versions,
        key_dcid,
        hdr.version,
        options.direction,
        options.key_override.as_ref(),
    )?;

    // The sample always sits 4 bytes past the start of the packet number.
    let sample_start = pn_offset + 4;
    let sample = buf
        .get(sample_start..sample_start + SAMPLE_LEN)
        .filter(|_| sample_start + SAMPLE_LEN <= end)
        .ok_or(Error::TruncatedInput {
            needed: sample_start + SAMPLE_LEN,
            available: end,
        })?;
    let mask = keys.mask(sample)?;

    // Unmask the first byte to learn the packet number length, then the
    // packet number itself.
    let (first_byte, _) = apply_mask(hdr.first_byte, &[0], &mask)?;
    let pn_len = usize::from(first_byte & 0x03) + 1;
    let (_, pn_bytes) = apply_mask(hdr.first_byte, &buf[pn_offset..pn_offset + pn_len], &mask)?;
    let packet_number = PacketNumber::from_bytes(&pn_bytes)?;

    let mut aad = buf[..pn_offset + pn_len].to_vec();
    aad[0] = first_byte;
    aad[pn_offset..].copy_from_slice(&pn_bytes);

    let payload = keys.open(
        u64::from(packet_number.value()),
        &aad,
        &buf[pn_offset + pn_len..end],
    )?;

    debug!(
        pn = packet_number.value(),
        pn_len,
        payload_len = payload.len(),
        "opened packet"
    );

    Ok(OpenedPacket {
        first_byte,
        version: hdr.version,
        dcid: hdr.dcid.to_vec(),
        scid: hdr.scid.to_vec(),
        token: hdr.token.to_vec(),
        length: hdr.length,
        packet_number,
        payload,
    })
}
