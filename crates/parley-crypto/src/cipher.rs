//! AES-CBC message envelopes.
//!
//! An envelope is the text-safe form of one encrypted message:
//!
//! ```text
//! base64( IV[16] || AES-CBC(key, IV, PKCS#7(utf8(plaintext))) )
//! ```
//!
//! Every call to [`SymmetricCipher::encrypt`] draws a fresh IV, so the same
//! plaintext never produces the same envelope twice.
//!
//! # Security
//!
//! Envelopes are confidential but NOT authenticated. Corrupting the
//! ciphertext usually surfaces as a padding or encoding error, but a
//! corrupted IV only flips the matching bits of the first plaintext block and
//! decrypts "successfully" to wrong text. Callers needing integrity must add
//! it at a higher layer.

use std::fmt;

use aes::{Aes128, Aes192, Aes256};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use cbc::cipher::{
    BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit, block_padding::Pkcs7,
};
use thiserror::Error;

use crate::{
    env::{EntropyError, Environment},
    key_agreement::DerivedKey,
};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Size of the per-message initialization vector.
pub const IV_SIZE: usize = 16;

/// Key length used when a cipher generates its own key.
pub const DEFAULT_KEY_SIZE: usize = 32;

/// AES variant, selected by key length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySize {
    /// 16-byte key.
    Aes128,
    /// 24-byte key.
    Aes192,
    /// 32-byte key.
    Aes256,
}

impl KeySize {
    /// Map a key length in bytes to its variant.
    pub fn from_key_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(Self::Aes128),
            24 => Some(Self::Aes192),
            32 => Some(Self::Aes256),
            _ => None,
        }
    }

    /// Key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    /// Key length in bits.
    pub fn bits(self) -> usize {
        self.key_len() * 8
    }
}

impl fmt::Display for KeySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AES-{}", self.bits())
    }
}

/// Errors from cipher construction, encryption and decryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// Key is not 16, 24 or 32 bytes long.
    #[error("invalid key length: {len} bytes (expected 16, 24 or 32)")]
    InvalidKeyLength {
        /// Length of the rejected key.
        len: usize,
    },

    /// Hex-encoded key could not be decoded.
    #[error("invalid key hex: {reason}")]
    InvalidKeyHex {
        /// Decoder diagnostic.
        reason: String,
    },

    /// Envelope is not valid base64 or has an impossible length.
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// What was wrong with the envelope.
        reason: String,
    },

    /// PKCS#7 padding was not well-formed after decryption.
    ///
    /// Usually means a wrong key or a corrupted ciphertext.
    #[error("invalid padding (wrong key or corrupted ciphertext)")]
    Padding,

    /// Decrypted bytes are not valid UTF-8.
    #[error("decrypted message is not valid UTF-8: {reason}")]
    Encoding {
        /// Decoder diagnostic.
        reason: String,
    },

    /// Randomness for a key or IV was unavailable.
    #[error(transparent)]
    Entropy(#[from] EntropyError),
}

impl CipherError {
    /// Returns true if the error concerns a single envelope rather than the
    /// cipher itself.
    ///
    /// Per-message errors leave the cipher usable for further messages.
    pub fn is_per_message(&self) -> bool {
        match self {
            Self::MalformedEnvelope { .. } | Self::Padding | Self::Encoding { .. } => true,

            Self::InvalidKeyLength { .. } | Self::InvalidKeyHex { .. } | Self::Entropy(_) => false,
        }
    }
}

/// Symmetric cipher holding one immutable session key.
///
/// All operations take `&self`; the key is never mutated after construction,
/// so one instance can be shared by any number of readers.
///
/// # Type Parameters
///
/// - `E`: Environment supplying randomness for keys and IVs
#[derive(Clone)]
pub struct SymmetricCipher<E: Environment> {
    env: E,
    key: Vec<u8>,
    key_size: KeySize,
}

impl<E: Environment> SymmetricCipher<E> {
    /// Create a cipher from an explicit key.
    ///
    /// # Errors
    ///
    /// `InvalidKeyLength` unless the key is 16, 24 or 32 bytes.
    pub fn new(env: E, key: &[u8]) -> Result<Self, CipherError> {
        let key_size = KeySize::from_key_len(key.len())
            .ok_or(CipherError::InvalidKeyLength { len: key.len() })?;
        Ok(Self { env, key: key.to_vec(), key_size })
    }

    /// Create a cipher with a random 32-byte key.
    pub fn generate(env: E) -> Result<Self, CipherError> {
        let key: [u8; DEFAULT_KEY_SIZE] = env.random_array()?;
        Self::new(env, &key)
    }

    /// Create an AES-256 cipher from a Diffie-Hellman derived key.
    pub fn from_derived_key(env: E, key: &DerivedKey) -> Self {
        Self { env, key: key.as_bytes().to_vec(), key_size: KeySize::Aes256 }
    }

    /// Create a cipher from a hex-encoded key.
    pub fn from_hex_key(env: E, hex_key: &str) -> Result<Self, CipherError> {
        let key = hex::decode(hex_key.trim())
            .map_err(|e| CipherError::InvalidKeyHex { reason: e.to_string() })?;
        Self::new(env, &key)
    }

    /// Key as lowercase hex, for display and interop.
    pub fn key_hex(&self) -> String {
        hex::encode(&self.key)
    }

    /// The AES variant in use.
    pub fn key_size(&self) -> KeySize {
        self.key_size
    }

    /// Encrypt `plaintext` into a base64 envelope under a fresh random IV.
    ///
    /// The empty string is valid input and yields one full padding block.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let iv: [u8; IV_SIZE] = self.env.random_array()?;
        self.seal(&iv, plaintext.as_bytes())
    }

    fn seal(&self, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Result<String, CipherError> {
        let ciphertext = match self.key_size {
            KeySize::Aes128 => cbc_encrypt::<Aes128>(&self.key, iv, plaintext)?,
            KeySize::Aes192 => cbc_encrypt::<Aes192>(&self.key, iv, plaintext)?,
            KeySize::Aes256 => cbc_encrypt::<Aes256>(&self.key, iv, plaintext)?,
        };

        let mut packed = Vec::with_capacity(IV_SIZE + ciphertext.len());
        packed.extend_from_slice(iv);
        packed.extend_from_slice(&ciphertext);

        tracing::trace!(
            "sealed {} plaintext bytes into {} envelope bytes",
            plaintext.len(),
            packed.len()
        );
        Ok(BASE64.encode(packed))
    }

    /// Decrypt a base64 envelope produced by [`encrypt`](Self::encrypt).
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// - `MalformedEnvelope`: not base64, or decoded length is not `16 + 16k`
    ///   with `k >= 1`
    /// - `Padding`: PKCS#7 padding invalid after decryption
    /// - `Encoding`: plaintext is not UTF-8
    pub fn decrypt(&self, envelope: &str) -> Result<String, CipherError> {
        let packed = BASE64.decode(envelope.trim()).map_err(|e| {
            CipherError::MalformedEnvelope { reason: format!("base64 decoding failed: {e}") }
        })?;

        if packed.len() < IV_SIZE + BLOCK_SIZE || packed.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::MalformedEnvelope {
                reason: format!(
                    "decoded length {} is not {IV_SIZE} + a positive multiple of {BLOCK_SIZE}",
                    packed.len()
                ),
            });
        }

        let (iv, ciphertext) = packed.split_at(IV_SIZE);
        let padded = match self.key_size {
            KeySize::Aes128 => cbc_decrypt::<Aes128>(&self.key, iv, ciphertext)?,
            KeySize::Aes192 => cbc_decrypt::<Aes192>(&self.key, iv, ciphertext)?,
            KeySize::Aes256 => cbc_decrypt::<Aes256>(&self.key, iv, ciphertext)?,
        };

        tracing::trace!("opened {} envelope bytes", packed.len());
        String::from_utf8(padded).map_err(|e| CipherError::Encoding { reason: e.to_string() })
    }
}

impl<E: Environment> fmt::Debug for SymmetricCipher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricCipher")
            .field("key_size", &self.key_size)
            .field("key", &format!("<redacted {} bytes>", self.key.len()))
            .finish_non_exhaustive()
    }
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CipherError>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CipherError::InvalidKeyLength { len: key.len() })?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CipherError>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CipherError::InvalidKeyLength { len: key.len() })?;
    decryptor.decrypt_padded_vec_mut::<Pkcs7>(ciphertext).map_err(|_| CipherError::Padding)
}
