// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AES-256-CBC encryption for stored OAuth credentials.
//!
//! Every field is encrypted with a fresh random IV and stored as
//! `IV || ciphertext`. The key is a single static 256-bit key loaded from
//! configuration; there is no key rotation.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Size of the cipher key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// AES block size, also the IV length.
pub const BLOCK_SIZE: usize = 16;

/// Cipher failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    #[error("cipher key must be {KEY_SIZE} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("ciphertext is malformed ({0} bytes)")]
    Malformed(usize),

    #[error("invalid padding (wrong key or corrupted data)")]
    Padding,

    #[error("decrypted data is not valid UTF-8")]
    Utf8,

    #[error("invalid base64: {0}")]
    Base64(String),
}

/// Symmetric cipher for credential fields.
#[derive(Clone)]
pub struct DataCipher {
    key: [u8; KEY_SIZE],
}

impl std::fmt::Debug for DataCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCipher").finish_non_exhaustive()
    }
}

impl DataCipher {
    /// Create a cipher from raw key bytes. The key must be exactly 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        let key: [u8; KEY_SIZE] = key
            .try_into()
            .map_err(|_| CipherError::InvalidKeyLength(key.len()))?;
        Ok(Self { key })
    }

    /// Encrypt a plaintext string, returning `IV || ciphertext`.
    pub fn encrypt(&self, plaintext: &str) -> Vec<u8> {
        let mut iv = [0u8; BLOCK_SIZE];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut blob = Vec::with_capacity(BLOCK_SIZE + ciphertext.len());
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&ciphertext);
        blob
    }

    /// Decrypt an `IV || ciphertext` blob produced by [`DataCipher::encrypt`].
    pub fn decrypt(&self, blob: &[u8]) -> Result<String, CipherError> {
        // Need the IV plus at least one whole block
        if blob.len() < 2 * BLOCK_SIZE || blob.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::Malformed(blob.len()));
        }

        let (iv, ciphertext) = blob.split_at(BLOCK_SIZE);
        let iv: [u8; BLOCK_SIZE] = iv
            .try_into()
            .map_err(|_| CipherError::Malformed(blob.len()))?;

        let plaintext = Aes256CbcDec::new(&self.key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CipherError::Padding)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Utf8)
    }

    /// Encrypt and base64-encode a field for storage.
    pub fn encrypt_to_base64(&self, plaintext: &str) -> String {
        BASE64.encode(self.encrypt(plaintext))
    }

    /// Decode a base64 storage field and decrypt it.
    pub fn decrypt_from_base64(&self, encoded: &str) -> Result<String, CipherError> {
        let blob = BASE64
            .decode(encoded)
            .map_err(|e| CipherError::Base64(e.to_string()))?;
        self.decrypt(&blob)
    }
}

/// Deterministic one-way hash of a raw user id (SHA-256, lowercase hex).
///
/// This is the primary key of a credential record.
pub fn hash_user_id(raw_user_id: &str) -> String {
    hex::encode(Sha256::digest(raw_user_id.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_key_scenario() {
        let cipher = DataCipher::new(&[0u8; 32]).unwrap();
        let blob = cipher.encrypt("abc");

        // 16 bytes IV + one padded block
        assert_eq!(blob.len(), 32);
        assert_eq!(cipher.decrypt(&blob).unwrap(), "abc");
    }

    #[test]
    fn test_random_iv_per_call() {
        let cipher = DataCipher::new(&[7u8; 32]).unwrap();
        let a = cipher.encrypt("same-plaintext");
        let b = cipher.encrypt("same-plaintext");

        assert_ne!(a[..BLOCK_SIZE], b[..BLOCK_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_key_length() {
        assert_eq!(
            DataCipher::new(&[0u8; 16]).unwrap_err(),
            CipherError::InvalidKeyLength(16)
        );
        assert!(DataCipher::new(&[0u8; 64]).is_err());
    }

    #[test]
    fn test_round_trip_edge_plaintexts() {
        let cipher = DataCipher::new(&[3u8; 32]).unwrap();

        let empty = cipher.encrypt("");
        assert_eq!(empty.len(), 2 * BLOCK_SIZE);
        assert_eq!(cipher.decrypt(&empty).unwrap(), "");

        // A whole block of input gets a whole block of padding
        let full_block = "0123456789abcdef";
        let blob = cipher.encrypt(full_block);
        assert_eq!(blob.len(), 3 * BLOCK_SIZE);
        assert_eq!(cipher.decrypt(&blob).unwrap(), full_block);

        let text = "Grüße, 心拍数 ❤";
        assert_eq!(
            cipher
                .decrypt_from_base64(&cipher.encrypt_to_base64(text))
                .unwrap(),
            text
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let a = DataCipher::new(&[1u8; 32]).unwrap();
        let b = DataCipher::new(&[2u8; 32]).unwrap();

        // Random bytes pass the padding check about 1 time in 256; those then fail UTF-8
        for _ in 0..8 {
            let blob = a.encrypt("refresh-token-value");
            assert!(matches!(
                b.decrypt(&blob),
                Err(CipherError::Padding | CipherError::Utf8)
            ));
        }
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = hash_user_id("ABC123");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(hash, hash_user_id("ABC123"));
        assert_ne!(hash, hash_user_id("ABC124"));
    }
}
