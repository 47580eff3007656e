//! Initial packet key derivation (RFC 9001 §5.2, RFC 9369 §3.3).
//!
//! The Initial secret is `HKDF-Extract(salt, dcid)`, where the salt is a
//! constant fixed by the QUIC version. Per-direction secrets and the packet
//! protection keys are then expanded with HKDF-Expand-Label.

use tracing::debug;

use crate::crypto::{CryptoProvider, Hkdf, PacketKeys, NONCE_LEN};
use crate::error::Error;

/// Length of every Initial traffic secret (SHA-256 output).
pub const SECRET_LEN: usize = 32;

/// Which endpoint's Initial keys to derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Keys protecting packets sent by the client ("client in").
    #[default]
    Client,
    /// Keys protecting packets sent by the server ("server in").
    Server,
}

impl Direction {
    fn label(self) -> &'static [u8] {
        match self {
            Direction::Client => b"client in",
            Direction::Server => b"server in",
        }
    }
}

/// Initial key schedule parameters for one QUIC version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialVersion {
    pub version: u32,
    pub salt: &'static [u8],
    /// Label for the AEAD key, e.g. `quic key` or `quicv2 key`.
    pub key_label: &'static [u8],
    pub iv_label: &'static [u8],
    pub hp_label: &'static [u8],
}

/// QUIC v1 (RFC 9001 §5.2).
pub const QUIC_V1: InitialVersion = InitialVersion {
    version: 0x0000_0001,
    salt: &[
        0x38, 0x76, 0x2c, 0xf7, 0xf5, 0x59, 0x34, 0xb3, 0x4d, 0x17, 0x9a, 0xe6, 0xa4, 0xc8, 0x0c,
        0xad, 0xcc, 0xbb, 0x7f, 0x0a,
    ],
    key_label: b"quic key",
    iv_label: b"quic iv",
    hp_label: b"quic hp",
};

/// QUIC v2 (RFC 9369 §3.3).
pub const QUIC_V2: InitialVersion = InitialVersion {
    version: 0x6b33_43cf,
    salt: &[
        0x0d, 0xed, 0xe3, 0xde, 0xf7, 0x00, 0xa6, 0xdb, 0x81, 0x93, 0x81, 0xbe, 0x6e, 0x26, 0x9d,
        0xcb, 0xf9, 0xbd, 0x2e, 0xd9,
    ],
    key_label: b"quicv2 key",
    iv_label: b"quicv2 iv",
    hp_label: b"quicv2 hp",
};

/// draft-ietf-quic-tls-29, still seen in the wild.
pub const QUIC_DRAFT_29: InitialVersion = InitialVersion {
    version: 0xff00_001d,
    salt: &[
        0xaf, 0xbf, 0xec, 0x28, 0x99, 0x93, 0xd2, 0x4c, 0x9e, 0x97, 0x86, 0xf1, 0x9c, 0x61, 0x11,
        0xe0, 0x43, 0x90, 0xa8, 0x99,
    ],
    key_label: b"quic key",
    iv_label: b"quic iv",
    hp_label: b"quic hp",
};

/// Versions with a known Initial salt.
pub const KNOWN_VERSIONS: &[InitialVersion] = &[QUIC_V1, QUIC_V2, QUIC_DRAFT_29];

/// Look up the key schedule parameters for `version` in `table`.
pub fn lookup_version(table: &[InitialVersion], version: u32) -> Result<InitialVersion, Error> {
    table
        .iter()
        .find(|v| v.version == version)
        .copied()
        .ok_or(Error::UnsupportedVersion(version))
}

/// Replaces the version-keyed salt lookup.
///
/// Lets a packet carry a version with no published salt (or a deliberately
/// malformed one) while still being protected with well-defined keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOverride {
    /// Derive keys exactly as for this known version.
    AsVersion(u32),
    /// Use this salt with the QUIC v1 labels.
    Salt(Vec<u8>),
    /// Use this 32-byte traffic secret directly, skipping extract and the
    /// client/server expansion. QUIC v1 labels.
    Secret(Vec<u8>),
}

/// HKDF-Expand-Label as defined in RFC 8446 §7.1 with an empty context.
///
///   uint16 length = out.len()
///   opaque label<7..255> = "tls13 " + label
///   opaque context<0..255> = ""
pub fn hkdf_expand_label<H: Hkdf>(
    hkdf: &H,
    secret: &[u8],
    label: &[u8],
    out: &mut [u8],
) -> Result<(), Error> {
    const PREFIX: &[u8] = b"tls13 ";

    let full_label_len = PREFIX.len() + label.len();
    let full_label_len = u8::try_from(full_label_len).map_err(|_| Error::EncryptionFailure)?;
    let out_len = u16::try_from(out.len()).map_err(|_| Error::EncryptionFailure)?;

    let mut info = Vec::with_capacity(4 + usize::from(full_label_len));
    info.extend_from_slice(&out_len.to_be_bytes());
    info.push(full_label_len);
    info.extend_from_slice(PREFIX);
    info.extend_from_slice(label);
    info.push(0);

    hkdf.expand(secret, &info, out)
}

/// Derive the per-direction Initial traffic secret from a Destination
/// Connection ID and salt.
pub fn derive_initial_secret<H: Hkdf>(
    hkdf: &H,
    salt: &[u8],
    dcid: &[u8],
    direction: Direction,
) -> Result<[u8; SECRET_LEN], Error> {
    let mut initial_secret = [0u8; SECRET_LEN];
    hkdf.extract(salt, dcid, &mut initial_secret)?;

    let mut secret = [0u8; SECRET_LEN];
    hkdf_expand_label(hkdf, &initial_secret, direction.label(), &mut secret)?;
    Ok(secret)
}

/// Raw key material expanded from a traffic secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub key: Vec<u8>,
    pub iv: [u8; NONCE_LEN],
    pub hp_key: Vec<u8>,
}

/// Expand a traffic secret into AEAD key, IV and header protection key.
pub fn expand_key_material<H: Hkdf>(
    hkdf: &H,
    secret: &[u8],
    labels: &InitialVersion,
    key_len: usize,
    hp_key_len: usize,
) -> Result<KeyMaterial, Error> {
    let mut key = vec![0u8; key_len];
    let mut iv = [0u8; NONCE_LEN];
    let mut hp_key = vec![0u8; hp_key_len];
    hkdf_expand_label(hkdf, secret, labels.key_label, &mut key)?;
    hkdf_expand_label(hkdf, secret, labels.iv_label, &mut iv)?;
    hkdf_expand_label(hkdf, secret, labels.hp_label, &mut hp_key)?;
    Ok(KeyMaterial { key, iv, hp_key })
}

/// Derive the Initial key material for `dcid` and `version`.
///
/// Pure function of its inputs; nothing is cached between calls.
pub fn derive_key_material<C: CryptoProvider>(
    hkdf: &C::Hkdf,
    table: &[InitialVersion],
    dcid: &[u8],
    version: u32,
    direction: Direction,
    key_override: Option<&KeyOverride>,
) -> Result<KeyMaterial, Error> {
    let key_len = <C::Aead as crate::crypto::Aead>::KEY_LEN;
    let (secret, labels) = match key_override {
        None => {
            let params = lookup_version(table, version)?;
            debug!(version = %format_args!("{version:#010x}"), ?direction, "deriving initial keys");
            (derive_initial_secret(hkdf, params.salt, dcid, direction)?, params)
        }
        Some(KeyOverride::AsVersion(as_version)) => {
            let params = lookup_version(table, *as_version)?;
            debug!(
                version = %format_args!("{version:#010x}"),
                as_version = %format_args!("{as_version:#010x}"),
                ?direction,
                "deriving initial keys for substitute version"
            );
            (derive_initial_secret(hkdf, params.salt, dcid, direction)?, params)
        }
        Some(KeyOverride::Salt(salt)) => {
            debug!(salt_len = salt.len(), ?direction, "deriving initial keys from explicit salt");
            (derive_initial_secret(hkdf, salt, dcid, direction)?, QUIC_V1)
        }
        Some(KeyOverride::Secret(raw)) => {
            if raw.len() != SECRET_LEN {
                return Err(Error::InvalidFieldWidth {
                    field: "secret",
                    expected: SECRET_LEN,
                    actual: raw.len(),
                });
            }
            debug!("using explicit traffic secret");
            let mut secret = [0u8; SECRET_LEN];
            secret.copy_from_slice(raw);
            (secret, QUIC_V1)
        }
    };

    expand_key_material(hkdf, &secret, &labels, key_len, C::HP_KEY_LEN)
}

/// Derive ready-to-use packet keys with `provider`.
pub fn derive_packet_keys<C: CryptoProvider>(
    provider: &C,
    table: &[InitialVersion],
    dcid: &[u8],
    version: u32,
    direction: Direction,
    key_override: Option<&KeyOverride>,
) -> Result<PacketKeys<C::Aead, C::HeaderProtection>, Error> {
    let hkdf = provider.hkdf();
    let material =
        derive_key_material::<C>(&hkdf, table, dcid, version, direction, key_override)?;

    Ok(PacketKeys {
        aead: provider.aead(&material.key)?,
        header_protection: provider.header_protection(&material.hp_key)?,
        iv: material.iv,
    })
}
