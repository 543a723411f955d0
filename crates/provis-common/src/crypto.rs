//! External key encryption
//!
//! Devices may present their external key encrypted with the process-wide
//! bootstrap key. The wire format is hex(IV || AES-CFB(plaintext)), where the
//! IV is one AES block long and CFB runs with a full-block segment size, so no
//! padding is involved.

use aes::{Aes128, Aes192, Aes256};
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use rand::RngCore;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// AES block size, which is also the IV length
pub const IV_SIZE: usize = 16;

/// Error types for external key operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("hex decode error: {0}")]
    InvalidHex(String),

    #[error("ciphertext too short: {0} bytes")]
    CiphertextTooShort(usize),

    #[error("invalid UTF-8 in plaintext: {0}")]
    InvalidUtf8(String),
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Symmetric codec keyed by the process-wide bootstrap key
///
/// Immutable once built; share it by cloning.
#[derive(Clone)]
pub struct ExternalKeyCipher {
    key: Vec<u8>,
}

impl std::fmt::Debug for ExternalKeyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalKeyCipher")
            .field("key_len", &self.key.len())
            .finish()
    }
}

impl ExternalKeyCipher {
    /// Create a cipher from raw key bytes (16, 24 or 32 bytes)
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        match key.len() {
            16 | 24 | 32 => Ok(Self { key: key.to_vec() }),
            n => Err(CryptoError::InvalidKey(format!(
                "key must be 16, 24 or 32 bytes, got {}",
                n
            ))),
        }
    }

    /// Create a cipher from a hex-encoded key
    pub fn from_hex(key: &str) -> CryptoResult<Self> {
        let bytes = const_hex::decode(key.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::new(&bytes)
    }

    /// Generate a random 256-bit key
    pub fn generate_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        rand::rng().fill_bytes(&mut key);
        key
    }

    /// Key length in bytes
    pub fn key_len(&self) -> usize {
        self.key.len()
    }

    /// Decrypt hex-encoded ciphertext into raw bytes
    pub fn decrypt_bytes(&self, input: &str) -> CryptoResult<Vec<u8>> {
        let data = const_hex::decode(input).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        if data.len() < IV_SIZE {
            return Err(CryptoError::CiphertextTooShort(data.len()));
        }

        let (iv, ciphertext) = data.split_at(IV_SIZE);
        let mut buf = ciphertext.to_vec();
        self.apply(iv, &mut buf, Direction::Decrypt)?;
        Ok(buf)
    }

    /// Decrypt hex-encoded ciphertext into a UTF-8 string
    pub fn decrypt(&self, input: &str) -> CryptoResult<String> {
        let plaintext = self.decrypt_bytes(input)?;
        String::from_utf8(plaintext).map_err(|e| CryptoError::InvalidUtf8(e.to_string()))
    }

    /// Encrypt with a fresh random IV and return hex(IV || ciphertext)
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<String> {
        let mut iv = [0u8; IV_SIZE];
        rand::rng().fill_bytes(&mut iv);
        self.encrypt_with_iv(&iv, plaintext)
    }

    fn encrypt_with_iv(&self, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> CryptoResult<String> {
        let mut buf = plaintext.to_vec();
        self.apply(iv, &mut buf, Direction::Encrypt)?;

        let mut out = Vec::with_capacity(IV_SIZE + buf.len());
        out.extend_from_slice(iv);
        out.extend_from_slice(&buf);
        Ok(const_hex::encode(out))
    }

    fn apply(&self, iv: &[u8], buf: &mut [u8], direction: Direction) -> CryptoResult<()> {
        let invalid = |e: cfb_mode::cipher::InvalidLength| CryptoError::InvalidKey(e.to_string());
        match (self.key.len(), direction) {
            (16, Direction::Decrypt) => {
                cfb_mode::Decryptor::<Aes128>::new_from_slices(&self.key, iv)
                    .map_err(invalid)?
                    .decrypt(buf);
            }
            (16, Direction::Encrypt) => {
                cfb_mode::Encryptor::<Aes128>::new_from_slices(&self.key, iv)
                    .map_err(invalid)?
                    .encrypt(buf);
            }
            (24, Direction::Decrypt) => {
                cfb_mode::Decryptor::<Aes192>::new_from_slices(&self.key, iv)
                    .map_err(invalid)?
                    .decrypt(buf);
            }
            (24, Direction::Encrypt) => {
                cfb_mode::Encryptor::<Aes192>::new_from_slices(&self.key, iv)
                    .map_err(invalid)?
                    .encrypt(buf);
            }
            (32, Direction::Decrypt) => {
                cfb_mode::Decryptor::<Aes256>::new_from_slices(&self.key, iv)
                    .map_err(invalid)?
                    .decrypt(buf);
            }
            (32, Direction::Encrypt) => {
                cfb_mode::Encryptor::<Aes256>::new_from_slices(&self.key, iv)
                    .map_err(invalid)?
                    .encrypt(buf);
            }
            (n, _) => {
                return Err(CryptoError::InvalidKey(format!("unsupported key length {}", n)));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// Compare two secrets in time independent of where they differ
pub fn secrets_match(presented: &[u8], stored: &[u8]) -> bool {
    presented.ct_eq(stored).into()
}
