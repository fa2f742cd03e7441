//! Session error types.

use parley_crypto::{CipherError, KeyAgreementError};
use thiserror::Error;

/// Errors from handshake and channel operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A key agreement step failed.
    #[error("key agreement failed: {0}")]
    KeyAgreement(#[from] KeyAgreementError),

    /// The two parties derived different keys.
    ///
    /// With correct arithmetic this only happens through a defect or a
    /// substituted public key.
    #[error("derived keys differ between party A and party B")]
    KeyMismatch,

    /// Encryption or decryption failed.
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),
}

impl SessionError {
    /// Returns true if this error ends the session.
    ///
    /// Fatal errors mean the channel cannot be trusted.
    /// Per-message errors are reported and the session continues.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::KeyAgreement(_) | Self::KeyMismatch => true,

            Self::Cipher(e) => !e.is_per_message(),
        }
    }
}
