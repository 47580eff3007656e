//! Cryptographic traits and implementations for QUIC Initial packet protection.
//!
//! Initial packets need three primitives: HKDF to derive keys from the
//! Destination Connection ID, an AEAD to seal the payload, and a block cipher
//! for header protection. The [`CryptoProvider`] trait bundles these together
//! so the assembler is not tied to one backend; [`rustcrypto`] provides the
//! QUIC v1 suite (AES-128-GCM, AES-128-ECB header protection, HKDF-SHA256).

pub mod header_protection;
pub mod key_schedule;
pub mod rustcrypto;

pub use header_protection::{apply_mask, select_sample, SampleSource, SAMPLE_LEN};
pub use key_schedule::{Direction, InitialVersion, KeyOverride};

use crate::error::Error;

/// Nonce length shared by every QUIC AEAD.
pub const NONCE_LEN: usize = 12;

/// Authenticated Encryption with Associated Data.
pub trait Aead {
    /// Key length in bytes.
    const KEY_LEN: usize;
    /// Authentication tag length in bytes.
    const TAG_LEN: usize;

    /// Encrypt `plaintext`, returning ciphertext with the tag appended.
    fn seal(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error>;

    /// Decrypt `ciphertext` (tag included), returning the plaintext.
    fn open(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error>;
}

/// HMAC-based Key Derivation Function (RFC 5869).
pub trait Hkdf {
    /// Hash output length in bytes (32 for SHA-256).
    const HASH_LEN: usize;

    /// HKDF-Extract. `prk` must be `HASH_LEN` bytes.
    fn extract(&self, salt: &[u8], ikm: &[u8], prk: &mut [u8]) -> Result<(), Error>;

    /// HKDF-Expand into `okm`.
    fn expand(&self, prk: &[u8], info: &[u8], okm: &mut [u8]) -> Result<(), Error>;
}

/// Header protection cipher.
///
/// The mask is a pure function of the key and a 16-byte sample of the
/// ciphertext.
pub trait HeaderProtection {
    /// Compute a 5-byte mask from a 16-byte sample.
    ///
    /// - `mask[0]` is XORed with the first byte of the packet header
    ///   (lower 4 bits for long headers, lower 5 bits for short headers)
    /// - `mask[1..5]` are XORed with the packet number bytes
    fn mask(&self, sample: &[u8]) -> Result<[u8; 5], Error>;
}

/// Bundle of cryptographic primitives for one cipher suite.
pub trait CryptoProvider {
    type Aead: Aead;
    type Hkdf: Hkdf;
    type HeaderProtection: HeaderProtection;

    /// Header protection key length in bytes.
    const HP_KEY_LEN: usize;

    /// Create an AEAD instance from a key.
    fn aead(&self, key: &[u8]) -> Result<Self::Aead, Error>;

    /// Get an HKDF instance for key derivation.
    fn hkdf(&self) -> Self::Hkdf;

    /// Create a header protection cipher from a key.
    fn header_protection(&self, key: &[u8]) -> Result<Self::HeaderProtection, Error>;
}

/// Keys for one direction of Initial packet protection.
///
/// Built fresh for every packet and dropped with it.
pub struct PacketKeys<A: Aead, H: HeaderProtection> {
    pub aead: A,
    pub header_protection: H,
    /// Nonce base, XORed with the packet number to form the per-packet nonce.
    pub iv: [u8; NONCE_LEN],
}

impl<A: Aead, H: HeaderProtection> PacketKeys<A, H> {
    /// Compute the AEAD nonce for a given packet number.
    ///
    /// The nonce is the IV XORed with the packet number, big-endian and
    /// left-padded to the IV length.
    pub fn nonce(&self, packet_number: u64) -> [u8; NONCE_LEN] {
        let mut nonce = self.iv;
        let pn_bytes = packet_number.to_be_bytes();
        for (n, p) in nonce[NONCE_LEN - 8..].iter_mut().zip(pn_bytes) {
            *n ^= p;
        }
        nonce
    }

    /// Seal `plaintext` for `packet_number`, returning ciphertext ‖ tag.
    pub fn seal(&self, packet_number: u64, aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        self.aead.seal(&self.nonce(packet_number), aad, plaintext)
    }

    /// Open ciphertext ‖ tag sealed for `packet_number`.
    pub fn open(&self, packet_number: u64, aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        self.aead.open(&self.nonce(packet_number), aad, ciphertext)
    }

    /// Header protection mask for `sample`.
    pub fn mask(&self, sample: &[u8]) -> Result<[u8; 5], Error> {
        self.header_protection.mask(sample)
    }
}
