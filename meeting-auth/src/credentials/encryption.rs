//! AES-256-GCM encryption for provider secrets stored at rest.
//!
//! An encrypted value is the [`ENCRYPTED_PREFIX`] tag followed by base64(nonce || ciphertext).
//! A stored value without the tag is legacy plaintext written before encryption was introduced;
//! it decrypts to itself and is encrypted on the next write of its record.
//!
//! The key is 32 bytes, supplied as a hex string (64 characters).

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;

use crate::error::{crypto_error, CryptoErrorKind, Error, ErrorKind};

/// Marks a stored value as ciphertext. Not secret.
pub const ENCRYPTED_PREFIX: &str = "enc:v1:";

/// 12-byte nonce size for AES-GCM
const NONCE_SIZE: usize = 12;

const KEY_SIZE: usize = 32;

/// Symmetric key used for every stored secret.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Parses a hex-encoded 32-byte key.
    pub fn from_hex(key_hex: &str) -> Result<Self, Error> {
        let bytes = hex::decode(key_hex.trim()).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Crypto(CryptoErrorKind::InvalidKey),
        })?;
        if bytes.len() != KEY_SIZE {
            return Err(crypto_error(
                CryptoErrorKind::InvalidKey,
                "encryption key must be 32 bytes (64 hex characters)",
            ));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }

    fn cipher(&self) -> Result<Aes256Gcm, Error> {
        Aes256Gcm::new_from_slice(&self.0)
            .map_err(|_| crypto_error(CryptoErrorKind::InvalidKey, "unusable encryption key"))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// A stored secret value, classified by its prefix tag.
#[derive(Clone, PartialEq, Eq)]
pub enum StoredSecret {
    Empty,
    /// Written before encryption existed.
    Plaintext(String),
    Encrypted {
        nonce: [u8; NONCE_SIZE],
        ciphertext: Vec<u8>,
    },
    /// Tagged as encrypted but the payload cannot be decoded.
    Malformed,
}

impl StoredSecret {
    pub fn parse(stored: &str) -> Self {
        if stored.is_empty() {
            return StoredSecret::Empty;
        }

        let Some(payload) = stored.strip_prefix(ENCRYPTED_PREFIX) else {
            return StoredSecret::Plaintext(stored.to_string());
        };

        match BASE64.decode(payload) {
            Ok(combined) if combined.len() > NONCE_SIZE => {
                let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
                let mut nonce = [0u8; NONCE_SIZE];
                nonce.copy_from_slice(nonce_bytes);
                StoredSecret::Encrypted {
                    nonce,
                    ciphertext: ciphertext.to_vec(),
                }
            }
            _ => StoredSecret::Malformed,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, StoredSecret::Encrypted { .. })
    }

    fn encode(nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> String {
        let mut combined = nonce.to_vec();
        combined.extend_from_slice(ciphertext);
        format!("{}{}", ENCRYPTED_PREFIX, BASE64.encode(combined))
    }
}

impl fmt::Debug for StoredSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredSecret::Empty => f.write_str("Empty"),
            StoredSecret::Plaintext(_) => f.write_str("Plaintext([REDACTED])"),
            StoredSecret::Encrypted { .. } => f.write_str("Encrypted([REDACTED])"),
            StoredSecret::Malformed => f.write_str("Malformed"),
        }
    }
}

/// Encrypts a stored value with a fresh random nonce.
///
/// A value that already carries [`ENCRYPTED_PREFIX`] is returned unchanged, so running this on
/// every write of a record never double-encrypts. Use [`seal`] for newly supplied secrets,
/// whose content may carry the prefix by accident.
pub fn encrypt(stored: &str, key: &EncryptionKey) -> Result<String, Error> {
    if stored.starts_with(ENCRYPTED_PREFIX) {
        return Ok(stored.to_string());
    }
    seal(stored, key)
}

/// Encrypts `plaintext` unconditionally.
pub fn seal(plaintext: &str, key: &EncryptionKey) -> Result<String, Error> {
    let cipher = key.cipher()?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| crypto_error(CryptoErrorKind::EncryptionFailed, "AES-GCM seal failed"))?;

    Ok(StoredSecret::encode(&nonce_bytes, &ciphertext))
}

/// Decrypts a stored value produced by [`encrypt`].
///
/// Legacy plaintext (no prefix tag) is returned as-is.
pub fn decrypt(stored: &str, key: &EncryptionKey) -> Result<String, Error> {
    match StoredSecret::parse(stored) {
        StoredSecret::Empty => Ok(String::new()),
        StoredSecret::Plaintext(value) => Ok(value),
        StoredSecret::Encrypted { nonce, ciphertext } => {
            let cipher = key.cipher()?;
            let plaintext_bytes = cipher
                .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
                .map_err(|_| {
                    crypto_error(
                        CryptoErrorKind::DecryptionFailed,
                        "data may be corrupted or the key is incorrect",
                    )
                })?;

            String::from_utf8(plaintext_bytes).map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Crypto(CryptoErrorKind::DecryptionFailed),
            })
        }
        StoredSecret::Malformed => Err(crypto_error(
            CryptoErrorKind::DecryptionFailed,
            "encrypted value is not valid base64 or is missing its nonce",
        )),
    }
}
