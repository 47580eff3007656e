//! RustCrypto-backed implementations of the crypto traits: the QUIC v1
//! Initial suite.

use crate::crypto::{Aead, CryptoProvider, HeaderProtection, Hkdf, NONCE_LEN};
use crate::error::Error;

// ---- HKDF-SHA256 ----

/// HKDF using SHA-256 (via the `hkdf` crate).
pub struct HkdfSha256;

impl Hkdf for HkdfSha256 {
    const HASH_LEN: usize = 32;

    fn extract(&self, salt: &[u8], ikm: &[u8], prk: &mut [u8]) -> Result<(), Error> {
        if prk.len() != Self::HASH_LEN {
            return Err(Error::EncryptionFailure);
        }
        let (out, _) = hkdf::Hkdf::<sha2::Sha256>::extract(Some(salt), ikm);
        prk.copy_from_slice(&out);
        Ok(())
    }

    fn expand(&self, prk: &[u8], info: &[u8], okm: &mut [u8]) -> Result<(), Error> {
        let hk =
            hkdf::Hkdf::<sha2::Sha256>::from_prk(prk).map_err(|_| Error::EncryptionFailure)?;
        hk.expand(info, okm).map_err(|_| Error::EncryptionFailure)
    }
}

// ---- AES-128-GCM AEAD ----

/// AES-128-GCM AEAD implementation.
pub struct Aes128GcmAead {
    cipher: aes_gcm::Aes128Gcm,
}

impl Aead for Aes128GcmAead {
    const KEY_LEN: usize = 16;
    const TAG_LEN: usize = 16;

    fn seal(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        use aes_gcm::aead::{Aead as _, Payload};

        if nonce.len() != NONCE_LEN {
            return Err(Error::EncryptionFailure);
        }
        self.cipher
            .encrypt(
                aes_gcm::Nonce::from_slice(nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| Error::EncryptionFailure)
    }

    fn open(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        use aes_gcm::aead::{Aead as _, Payload};

        if nonce.len() != NONCE_LEN {
            return Err(Error::EncryptionFailure);
        }
        if ciphertext.len() < Self::TAG_LEN {
            return Err(Error::TruncatedInput {
                needed: Self::TAG_LEN,
                available: ciphertext.len(),
            });
        }
        self.cipher
            .decrypt(
                aes_gcm::Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| Error::DecryptionFailure)
    }
}

// ---- AES Header Protection ----

/// AES-128-ECB header protection.
pub struct AesHeaderProtection {
    cipher: aes::Aes128,
}

impl HeaderProtection for AesHeaderProtection {
    fn mask(&self, sample: &[u8]) -> Result<[u8; 5], Error> {
        use aes::cipher::BlockEncrypt;
        use aes::Block;

        if sample.len() != 16 {
            return Err(Error::InvalidFieldWidth {
                field: "sample",
                expected: 16,
                actual: sample.len(),
            });
        }
        let mut block = Block::clone_from_slice(sample);
        self.cipher.encrypt_block(&mut block);
        let mut mask = [0u8; 5];
        mask.copy_from_slice(&block[..5]);
        Ok(mask)
    }
}

// ---- CryptoProvider bundle ----

/// AES-128-GCM cipher suite provider, the suite mandated for Initial packets.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes128GcmProvider;

impl CryptoProvider for Aes128GcmProvider {
    type Aead = Aes128GcmAead;
    type Hkdf = HkdfSha256;
    type HeaderProtection = AesHeaderProtection;

    const HP_KEY_LEN: usize = 16;

    fn aead(&self, key: &[u8]) -> Result<Self::Aead, Error> {
        use aes_gcm::KeyInit;
        if key.len() != Aes128GcmAead::KEY_LEN {
            return Err(Error::EncryptionFailure);
        }
        let cipher =
            aes_gcm::Aes128Gcm::new_from_slice(key).map_err(|_| Error::EncryptionFailure)?;
        Ok(Aes128GcmAead { cipher })
    }

    fn hkdf(&self) -> Self::Hkdf {
        HkdfSha256
    }

    fn header_protection(&self, key: &[u8]) -> Result<Self::HeaderProtection, Error> {
        use aes::cipher::KeyInit;
        if key.len() != Self::HP_KEY_LEN {
            return Err(Error::EncryptionFailure);
        }
        let cipher = aes::Aes128::new_from_slice(key).map_err(|_| Error::EncryptionFailure)?;
        Ok(AesHeaderProtection { cipher })
    }
}
