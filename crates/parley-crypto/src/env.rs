//! Environment abstraction for randomness.
//!
//! The `Environment` trait decouples the cryptographic operations from the
//! source of entropy. Production code uses [`SystemEnv`] (OS CSPRNG), while
//! tests can plug in a seeded generator and reproduce every key, IV and
//! envelope bit-for-bit.
//!
//! # Invariants
//!
//! - Unpredictability in production: `random_bytes()` draws from a
//!   cryptographically secure source
//! - Determinism in tests: given the same seed, a simulated environment
//!   produces the same byte sequence
//! - Failure is loud: entropy errors are returned, never replaced with a
//!   predictable fill

use thiserror::Error;

/// The entropy source could not produce random bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("entropy source failed: {reason}")]
pub struct EntropyError {
    /// Description reported by the underlying source.
    pub reason: String,
}

/// Abstract environment providing randomness.
///
/// Implementations are cheap to clone and shareable across threads so a
/// single cipher instance can serve concurrent readers.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    ///
    /// # Security
    ///
    /// Production implementations MUST use the OS entropy pool
    /// (`getrandom`). A non-cryptographic generator here is a correctness
    /// defect: private exponents and IVs become predictable.
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError>;

    /// Returns a freshly filled fixed-size array.
    fn random_array<const N: usize>(&self) -> Result<[u8; N], EntropyError> {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes)?;
        Ok(bytes)
    }
}

/// Production environment backed by the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        getrandom::fill(buffer).map_err(|e| {
            tracing::error!("getrandom failed: {}", e);
            EntropyError { reason: e.to_string() }
        })
    }
}
