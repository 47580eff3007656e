//! Packet assembler: lays out a long header field by field, protects it, and
//! produces the final packet bytes.
//!
//! Building is split in two stages. [`PacketSpec::assemble`] resolves every
//! unset field, computes the Length field and the associated data, and needs
//! no keys. [`AssembledPacket::protect`] derives the Initial keys, seals the
//! payload and applies header protection. Nothing is written into the final
//! packet until both AEAD sealing and the mask computation have succeeded.

use tracing::{debug, trace, warn};

use crate::crypto::key_schedule::{derive_packet_keys, KNOWN_VERSIONS};
use crate::crypto::rustcrypto::Aes128GcmProvider;
use crate::crypto::{
    apply_mask, select_sample, Aead, CryptoProvider, Direction, InitialVersion, KeyOverride,
    SampleSource,
};
use crate::error::Error;
use crate::packet::{
    encode_long_header, ConnectionId, HeaderFields, LongHeaderLayout, PacketNumber, Token,
    MIN_INITIAL_PACKET_SIZE,
};
use crate::rng::Rng;

/// Connection ID length used when an ID is generated without an explicit length.
pub const DEFAULT_CID_LEN: usize = 8;

/// How a connection ID is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CidSpec {
    /// Draw `len` random bytes.
    Random { len: usize },
    Given(ConnectionId),
}

impl Default for CidSpec {
    fn default() -> Self {
        CidSpec::Random {
            len: DEFAULT_CID_LEN,
        }
    }
}

impl CidSpec {
    fn resolve(&self, rng: &mut impl Rng) -> Result<ConnectionId, Error> {
        match self {
            CidSpec::Random { len } => ConnectionId::random(rng, *len),
            CidSpec::Given(cid) => Ok(cid.clone()),
        }
    }
}

/// How the token is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TokenSpec {
    #[default]
    Empty,
    /// Draw `len` random bytes.
    Random { len: usize },
    Given(Token),
}

impl TokenSpec {
    fn resolve(&self, rng: &mut impl Rng) -> Result<Token, Error> {
        match self {
            TokenSpec::Empty => Ok(Token::default()),
            TokenSpec::Random { len } => Token::random(rng, *len),
            TokenSpec::Given(token) => Ok(token.clone()),
        }
    }
}

/// Deliberate deviations from a well-formed packet.
///
/// Every field defaults to "compute the correct value".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Destination connection ID length byte written on the wire.
    pub dcid_len: Option<u8>,
    /// Source connection ID length byte written on the wire.
    pub scid_len: Option<u8>,
    /// Token length varint written on the wire.
    pub token_len: Option<u64>,
    /// Value of the Length field.
    pub length: Option<u64>,
    /// Varint width of the Length field (1, 2, 4 or 8).
    pub length_width: Option<usize>,
    /// Associated data for the AEAD instead of the unprotected header.
    pub aad: Option<Vec<u8>>,
    pub sample: SampleSource,
    /// Replace the version-keyed salt lookup.
    pub keys: Option<KeyOverride>,
    /// Derive keys from this connection ID instead of the packet's DCID.
    pub key_dcid: Option<ConnectionId>,
}

/// Every input needed to build one packet.
#[derive(Debug, Clone)]
pub struct PacketSpec {
    pub header: HeaderFields,
    pub dcid: CidSpec,
    pub scid: CidSpec,
    pub token: TokenSpec,
    /// Random if unset, with the width selected by the header.
    pub packet_number: Option<PacketNumber>,
    pub payload: Vec<u8>,
    pub direction: Direction,
    /// Salt table consulted for `header.version()`.
    pub versions: &'static [InitialVersion],
    pub overrides: Overrides,
}

impl Default for PacketSpec {
    fn default() -> Self {
        Self {
            header: HeaderFields::default(),
            dcid: CidSpec::default(),
            scid: CidSpec::default(),
            token: TokenSpec::default(),
            packet_number: None,
            payload: Vec::new(),
            direction: Direction::Client,
            versions: KNOWN_VERSIONS,
            overrides: Overrides::default(),
        }
    }
}

impl PacketSpec {
    /// Build and protect the packet with the QUIC v1 Initial suite.
    pub fn build(&self, rng: &mut impl Rng) -> Result<ProtectedPacket, Error> {
        self.build_with(&Aes128GcmProvider, rng)
    }

    /// Build and protect the packet with `provider`.
    pub fn build_with<C: CryptoProvider>(
        &self,
        provider: &C,
        rng: &mut impl Rng,
    ) -> Result<ProtectedPacket, Error> {
        self.assemble_with::<C>(rng)?.protect(provider)
    }

    /// Lay out the unprotected header for the QUIC v1 Initial suite.
    pub fn assemble(&self, rng: &mut impl Rng) -> Result<AssembledPacket, Error> {
        self.assemble_with::<Aes128GcmProvider>(rng)
    }

    /// Resolve unset fields and lay out the unprotected header.
    ///
    /// `C` only supplies the tag length for the Length field.
    pub fn assemble_with<C: CryptoProvider>(
        &self,
        rng: &mut impl Rng,
    ) -> Result<AssembledPacket, Error> {
        let pn_len = self.header.pn_len();

        let dcid = self.dcid.resolve(rng)?;
        let scid = self.scid.resolve(rng)?;
        let token = self.token.resolve(rng)?;
        let packet_number = match self.packet_number {
            Some(pn) if pn.len() != pn_len => {
                return Err(Error::InvalidFieldWidth {
                    field: "packet_number",
                    expected: pn_len,
                    actual: pn.len(),
                });
            }
            Some(pn) => pn,
            None => PacketNumber::random(rng, pn_len)?,
        };

        let tag_len = <C::Aead as Aead>::TAG_LEN;
        let computed_length = (pn_len + self.payload.len() + tag_len) as u64;
        let length = self.overrides.length.unwrap_or(computed_length);
        debug!(
            pn_len,
            payload_len = self.payload.len(),
            tag_len,
            length,
            overridden = self.overrides.length.is_some(),
            "computed length field"
        );
        if length != computed_length {
            warn!(length, computed_length, "Length field does not match packet contents");
        }

        let layout = LongHeaderLayout {
            first_byte: self.header.first_byte(),
            version: self.header.version(),
            dcid_len: self.overrides.dcid_len.unwrap_or(dcid.len() as u8),
            dcid: dcid.as_bytes(),
            scid_len: self.overrides.scid_len.unwrap_or(scid.len() as u8),
            scid: scid.as_bytes(),
            token_len: self.overrides.token_len.unwrap_or(token.len() as u64),
            token: token.as_bytes(),
            length,
            length_width: self.overrides.length_width,
        };

        let mut header = Vec::new();
        let pn_offset = encode_long_header(&layout, &mut header)?;
        header.extend_from_slice(&packet_number.to_bytes());

        let aad = match &self.overrides.aad {
            Some(aad) => {
                debug!(aad_len = aad.len(), "using caller-supplied associated data");
                aad.clone()
            }
            None => header.clone(),
        };

        debug!(
            first_byte = %format_args!("{:#04x}", layout.first_byte),
            dcid_len = dcid.len(),
            scid_len = scid.len(),
            token_len = token.len(),
            header_len = header.len(),
            "assembled unprotected header"
        );

        Ok(AssembledPacket {
            header,
            pn_offset,
            packet_number,
            aad,
            payload: self.payload.clone(),
            length,
            version: self.header.version(),
            direction: self.direction,
            key_dcid: self.overrides.key_dcid.clone().unwrap_or_else(|| dcid.clone()),
            dcid,
            scid,
            token,
            versions: self.versions,
            key_override: self.overrides.keys.clone(),
            sample: self.overrides.sample.clone(),
        })
    }
}

/// An unprotected packet: header laid out, keys not yet derived.
#[derive(Debug, Clone)]
pub struct AssembledPacket {
    header: Vec<u8>,
    pn_offset: usize,
    packet_number: PacketNumber,
    aad: Vec<u8>,
    payload: Vec<u8>,
    length: u64,
    version: u32,
    direction: Direction,
    key_dcid: ConnectionId,
    dcid: ConnectionId,
    scid: ConnectionId,
    token: Token,
    versions: &'static [InitialVersion],
    key_override: Option<KeyOverride>,
    sample: SampleSource,
}

impl AssembledPacket {
    /// Unprotected header bytes, first byte through packet number.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Associated data the payload will be sealed with.
    pub fn aad(&self) -> &[u8] {
        &self.aad
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn packet_number(&self) -> PacketNumber {
        self.packet_number
    }

    pub fn dcid(&self) -> &ConnectionId {
        &self.dcid
    }

    pub fn scid(&self) -> &ConnectionId {
        &self.scid
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Seal the payload and apply header protection.
    pub fn protect<C: CryptoProvider>(&self, provider: &C) -> Result<ProtectedPacket, Error> {
        let keys = derive_packet_keys(
            provider,
            self.versions,
            self.key_dcid.as_bytes(),
            self.version,
            self.direction,
            self.key_override.as_ref(),
        )?;

        let pn = self.packet_number;
        let ciphertext = keys.seal(u64::from(pn.value()), &self.aad, &self.payload)?;

        let sample = select_sample(&self.sample, &ciphertext, pn.len())?;
        let mask = keys.mask(&sample)?;
        trace!(sample = %hex::encode(&sample), mask = %hex::encode(mask), "header protection");

        let pn_bytes = &self.header[self.pn_offset..];
        let (first_byte, protected_pn) = apply_mask(self.header[0], pn_bytes, &mask)?;

        let mut bytes = Vec::with_capacity(self.header.len() + ciphertext.len());
        bytes.extend_from_slice(&self.header);
        bytes[0] = first_byte;
        bytes[self.pn_offset..].copy_from_slice(&protected_pn);
        bytes.extend_from_slice(&ciphertext);

        debug!(packet_len = bytes.len(), "protected packet");
        if self.direction == Direction::Client && bytes.len() < MIN_INITIAL_PACKET_SIZE {
            debug!(
                packet_len = bytes.len(),
                min = MIN_INITIAL_PACKET_SIZE,
                "client Initial shorter than the minimum datagram size"
            );
        }

        Ok(ProtectedPacket {
            bytes,
            aad: self.aad.clone(),
            sample,
            mask,
            length: self.length,
            pn_offset: self.pn_offset,
        })
    }
}

/// Final packet bytes plus the intermediate values used to produce them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedPacket {
    bytes: Vec<u8>,
    aad: Vec<u8>,
    sample: Vec<u8>,
    mask: [u8; 5],
    length: u64,
    pn_offset: usize,
}

impl ProtectedPacket {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn aad(&self) -> &[u8] {
        &self.aad
    }

    /// The 16-byte header protection sample.
    pub fn sample(&self) -> &[u8] {
        &self.sample
    }

    pub fn mask(&self) -> [u8; 5] {
        self.mask
    }

    /// Value written into the Length field.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Offset of the (protected) packet number in `bytes()`.
    pub fn pn_offset(&self) -> usize {
        self.pn_offset
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SAMPLE_LEN;
    use crate::packet::MAX_TOKEN_LEN;
    use crate::rng::SeededRng;
    use crate::varint::decode_varint;
    use hex_literal::hex;

    fn hello_spec() -> PacketSpec {
        PacketSpec {
            header: HeaderFields::new(1, 1, 0b00, 0b00, 0b00, 0x0000_0001).unwrap(),
            dcid: CidSpec::Given(ConnectionId::new(&hex!("aabbccdd")).unwrap()),
            scid: CidSpec::Given(ConnectionId::default()),
            token: TokenSpec::Empty,
            packet_number: Some(PacketNumber::new(0, 1).unwrap()),
            payload: b"Hello".to_vec(),
            ..PacketSpec::default()
        }
    }

    #[test]
    fn hello_length_is_22() {
        let assembled = hello_spec().assemble(&mut SeededRng::new(0)).unwrap();
        assert_eq!(assembled.length(), 1 + 5 + 16);
        assert_eq!(
            assembled.header(),
            hex!("c00000000104aabbccdd00001600")
        );
        assert_eq!(assembled.aad(), assembled.header());
    }

    #[test]
    fn hello_end_to_end() {
        let packet = hello_spec().build(&mut SeededRng::new(0)).unwrap();

        assert_eq!(packet.length(), 22);
        assert_eq!(packet.sample(), hex!("79cb0cc4fe8c88a951568cf8b0b9d5bb"));
        assert_eq!(packet.mask(), hex!("af55f5d356"));
        assert_eq!(
            packet.bytes(),
            hex!("cf0000000104aabbccdd000016556bbdc979cb0cc4fe8c88a951568cf8b0b9d5bb33e1")
        );

        // Only the low nibble of the first byte moves, by the mask's low nibble.
        let unprotected = 0xc0u8;
        assert_eq!(packet.bytes()[0] & 0xf0, unprotected & 0xf0);
        assert_eq!(packet.bytes()[0] ^ unprotected, packet.mask()[0] & 0x0f);

        // Length field sits right before the packet number.
        let (len, _) = decode_varint(&packet.bytes()[packet.pn_offset() - 1..]).unwrap();
        assert_eq!(len, 22);
        assert_eq!(packet.bytes().len(), packet.pn_offset() + 22);
    }

    #[test]
    fn sample_window_for_each_pn_len() {
        for pn_len in 1..=4usize {
            let mut spec = hello_spec();
            spec.header = HeaderFields::initial(pn_len).unwrap();
            spec.packet_number = Some(PacketNumber::new(1, pn_len).unwrap());
            spec.payload = vec![0u8; 32];

            let packet = spec.build(&mut SeededRng::new(0)).unwrap();
            let ciphertext = &packet.bytes()[packet.pn_offset() + pn_len..];
            let start = 4 - pn_len;
            assert_eq!(packet.sample(), &ciphertext[start..start + SAMPLE_LEN], "pn_len {pn_len}");
        }
    }

    #[test]
    fn packet_number_width_must_match_header() {
        let mut spec = hello_spec();
        spec.packet_number = Some(PacketNumber::new(0, 2).unwrap());
        assert!(matches!(
            spec.assemble(&mut SeededRng::new(0)),
            Err(Error::InvalidFieldWidth { field: "packet_number", expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn random_fields_are_seed_deterministic() {
        let spec = PacketSpec {
            token: TokenSpec::Random { len: 12 },
            payload: vec![0u8; 40],
            ..PacketSpec::default()
        };
        let a = spec.build(&mut SeededRng::new(9)).unwrap();
        let b = spec.build(&mut SeededRng::new(9)).unwrap();
        let c = spec.build(&mut SeededRng::new(10)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.bytes(), c.bytes());

        let assembled = spec.assemble(&mut SeededRng::new(9)).unwrap();
        assert_eq!(assembled.dcid().len(), DEFAULT_CID_LEN);
        assert_eq!(assembled.scid().len(), DEFAULT_CID_LEN);
        assert_eq!(assembled.token().len(), 12);
        assert_eq!(assembled.packet_number().len(), 1);
    }

    #[test]
    fn length_override_goes_into_header_and_aad() {
        let mut spec = hello_spec();
        spec.overrides.length = Some(1000);
        let assembled = spec.assemble(&mut SeededRng::new(0)).unwrap();
        assert_eq!(assembled.length(), 1000);
        assert_eq!(&assembled.header()[12..14], &[0x43, 0xe8]);

        let packet = spec.build(&mut SeededRng::new(0)).unwrap();
        assert_eq!(packet.length(), 1000);
        assert_ne!(
            packet.bytes()[packet.pn_offset() + 1..],
            hello_spec().build(&mut SeededRng::new(0)).unwrap().bytes()[14..]
        );
    }

    #[test]
    fn aad_override_changes_tag_only_via_aad() {
        let mut spec = hello_spec();
        spec.overrides.aad = Some(vec![0xde, 0xad]);
        let assembled = spec.assemble(&mut SeededRng::new(0)).unwrap();
        assert_eq!(assembled.aad(), [0xdeu8, 0xad]);
        assert_eq!(
            assembled.header(),
            hello_spec().assemble(&mut SeededRng::new(0)).unwrap().header()
        );

        let good = hello_spec().build(&mut SeededRng::new(0)).unwrap();
        let bad = spec.build(&mut SeededRng::new(0)).unwrap();
        // GCM ciphertext is independent of the AAD; only the tag differs.
        let body = good.pn_offset() + 1;
        assert_eq!(good.bytes()[body..body + 5], bad.bytes()[body..body + 5]);
        assert_ne!(good.bytes()[body + 5..], bad.bytes()[body + 5..]);
    }

    #[test]
    fn raw_sample_override() {
        let mut spec = hello_spec();
        spec.overrides.sample = SampleSource::Raw(vec![0u8; 16]);
        let packet = spec.build(&mut SeededRng::new(0)).unwrap();
        assert_eq!(packet.sample(), [0u8; 16]);
        assert_ne!(packet.mask(), hex!("af55f5d356"));
    }

    #[test]
    fn sample_past_end_fails_without_output() {
        let mut spec = hello_spec();
        spec.payload.clear();
        assert_eq!(
            spec.build(&mut SeededRng::new(0)),
            Err(Error::TruncatedInput {
                needed: 19,
                available: 16
            })
        );
    }

    #[test]
    fn unsupported_version() {
        let mut spec = hello_spec();
        spec.header = HeaderFields::new(1, 1, 0, 0, 0, 0x1a2a_3a4a).unwrap();
        assert_eq!(
            spec.build(&mut SeededRng::new(0)),
            Err(Error::UnsupportedVersion(0x1a2a_3a4a))
        );

        // AAD is still available without keys.
        assert!(spec.assemble(&mut SeededRng::new(0)).is_ok());

        spec.overrides.keys = Some(KeyOverride::AsVersion(1));
        let packet = spec.build(&mut SeededRng::new(0)).unwrap();
        assert_eq!(&packet.bytes()[1..5], &[0x1a, 0x2a, 0x3a, 0x4a]);
    }

    #[test]
    fn oversized_random_token_is_an_error() {
        let mut spec = hello_spec();
        spec.token = TokenSpec::Random {
            len: MAX_TOKEN_LEN + 1,
        };
        assert_eq!(
            spec.assemble(&mut SeededRng::new(0)).unwrap_err(),
            Error::ValueTooLarge {
                value: MAX_TOKEN_LEN as u64 + 1,
                max: MAX_TOKEN_LEN as u64
            }
        );

        spec.token = TokenSpec::Random { len: 300 };
        let assembled = spec.assemble(&mut SeededRng::new(0)).unwrap();
        assert_eq!(assembled.token().len(), 300);
    }

    #[test]
    fn wire_length_prefix_overrides() {
        let mut spec = hello_spec();
        spec.overrides.dcid_len = Some(20);
        spec.overrides.scid_len = Some(3);
        spec.overrides.token_len = Some(64);
        spec.overrides.length_width = Some(4);
        let assembled = spec.assemble(&mut SeededRng::new(0)).unwrap();
        assert_eq!(
            assembled.header(),
            hex!("c00000000114aabbccdd0340408000001600")
        );
    }
}
