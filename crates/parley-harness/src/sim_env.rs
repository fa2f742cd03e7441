//! Seeded simulation environment.

use std::sync::{Arc, Mutex, PoisonError};

use parley_crypto::{EntropyError, Environment};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Deterministic environment backed by a seeded ChaCha20 generator.
///
/// Clones share one generator, so a cipher and the test driving it draw
/// from the same reproducible stream.
///
/// # Security
///
/// Test use only. The seed fully determines every private key and IV.
#[derive(Debug, Clone)]
pub struct SimEnv {
    seed: u64,
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SimEnv {
    /// Create an environment from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed, rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
    }

    /// The seed this environment was created with, for failure reports.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Environment for SimEnv {
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        // A poisoned lock only means another test thread panicked mid-draw;
        // the generator state is still valid.
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
        Ok(())
    }
}
