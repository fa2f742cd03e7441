//! Finite-field Diffie-Hellman key agreement.
//!
//! Each party draws a private exponent `a` uniformly from `[2, p-2]` and
//! publishes `g^a mod p`. Combining its own exponent with the peer's public
//! value yields the raw shared secret `g^(ab) mod p`, which is serialized as a
//! fixed 256-byte big-endian block and hashed with SHA-256 into the 32-byte
//! [`DerivedKey`].
//!
//! # Lifecycle
//!
//! ```text
//! generate() ──► KeysGenerated ──compute_shared_secret()──► SecretComputed
//! ```
//!
//! There is no transition back: an agreement is single-use for one peer.
//!
//! # Invariants
//!
//! - Agreement: two instances that exchange public keys derive identical keys
//! - Range: private exponents lie strictly inside `[2, p-2]`
//! - Secrecy: the private exponent and raw secret are never exposed or logged

use std::{fmt, sync::LazyLock};

use hex_literal::hex;
use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::env::{EntropyError, Environment};

/// Size of the group modulus in bytes (2048 bits).
pub const MODULUS_SIZE: usize = 256;

/// Size of the derived session key in bytes.
pub const DERIVED_KEY_SIZE: usize = 32;

/// Generator of the RFC 3526 group 14.
pub const GENERATOR: u32 = 2;

/// RFC 3526 2048-bit MODP group (group 14) safe prime, big-endian.
pub const MODP_2048_PRIME: [u8; MODULUS_SIZE] = hex!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74"
    "020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437"
    "4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED"
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05"
    "98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB"
    "9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B"
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718"
    "3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF"
);

/// Upper bound on rejection-sampling rounds when drawing a private key.
///
/// With the group 14 prime a single round is rejected with probability below
/// 2^-64, so exhausting this bound means the entropy source is broken.
const MAX_SAMPLING_ROUNDS: usize = 16;

/// Number of hex characters shown when a public key is logged.
const LOG_HEX_PREFIX: usize = 16;

static MODP_2048: LazyLock<Group> =
    LazyLock::new(|| Group::new(BigUint::from_bytes_be(&MODP_2048_PRIME), GENERATOR));

/// Returns the process-wide RFC 3526 group 14 parameters.
pub fn modp_2048() -> &'static Group {
    &MODP_2048
}

/// Public parameters of a finite-field Diffie-Hellman group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    modulus: BigUint,
    generator: BigUint,
    /// Number of valid private exponents, `p - 3` (the size of `[2, p-2]`).
    exponent_span: BigUint,
}

impl Group {
    fn new(modulus: BigUint, generator: u32) -> Self {
        let exponent_span = &modulus - 3u32;
        Self { modulus, generator: BigUint::from(generator), exponent_span }
    }

    /// The prime modulus `p`.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// The generator `g`.
    pub fn generator(&self) -> &BigUint {
        &self.generator
    }

    fn is_valid_private(&self, exponent: &BigUint) -> bool {
        *exponent >= BigUint::from(2u32) && *exponent <= &self.modulus - 2u32
    }

    /// `0`, `1` and `p-1` are inside the accepted range but confine the shared
    /// secret to a subgroup of order at most two.
    fn is_degenerate(&self, element: &BigUint) -> bool {
        *element <= BigUint::from(1u32) || *element == &self.modulus - 1u32
    }

    /// Serializes a group element as a fixed-width big-endian block.
    fn to_fixed_bytes(element: &BigUint) -> [u8; MODULUS_SIZE] {
        let bytes = element.to_bytes_be();
        let mut block = [0u8; MODULUS_SIZE];
        block[MODULUS_SIZE - bytes.len()..].copy_from_slice(&bytes);
        block
    }
}

/// Errors from key agreement operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyAgreementError {
    /// The derived key was requested before `compute_shared_secret` ran.
    #[error("derived key not ready: compute_shared_secret has not been called")]
    NotReady,

    /// The agreement already holds a derived key.
    #[error("shared secret already computed for this key agreement")]
    SecretAlreadyComputed,

    /// The peer's public key is not an element of the group.
    #[error("invalid peer public key: {reason}")]
    InvalidPublicKey {
        /// Why the key was rejected.
        reason: String,
    },

    /// A hex-encoded public key could not be parsed.
    #[error("invalid public key hex: {input:?}")]
    InvalidPublicKeyHex {
        /// The rejected input.
        input: String,
    },

    /// A supplied private exponent lies outside `[2, p-2]`.
    #[error("private key outside the range [2, p-2]")]
    PrivateKeyOutOfRange,

    /// Randomness for the private key was unavailable.
    #[error(transparent)]
    Entropy(#[from] EntropyError),
}

/// Progress of a single key agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Key pair exists, no peer key has been applied yet.
    KeysGenerated,
    /// The derived key has been computed and is fixed.
    SecretComputed,
}

/// A Diffie-Hellman public value, `g^a mod p`. Safe to transmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(BigUint);

impl PublicKey {
    /// Wrap an integer received from a peer. Range is checked when the key is
    /// used, not here.
    pub fn from_biguint(value: BigUint) -> Self {
        Self(value)
    }

    /// Parse a big-endian byte string of any width.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Self(BigUint::from_bytes_be(bytes))
    }

    /// Parse a hexadecimal public key, with or without a `0x` prefix.
    pub fn from_hex(input: &str) -> Result<Self, KeyAgreementError> {
        let trimmed = input.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        BigUint::parse_bytes(digits.as_bytes(), 16)
            .map(Self)
            .ok_or_else(|| KeyAgreementError::InvalidPublicKeyHex { input: input.to_string() })
    }

    /// The underlying integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Minimal lowercase hex, no prefix and no leading zeros.
    pub fn to_hex(&self) -> String {
        self.0.to_str_radix(16)
    }

    /// Fixed 256-byte big-endian encoding.
    ///
    /// Values wider than the modulus keep their full minimal encoding instead
    /// of being truncated.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let bytes = self.0.to_bytes_be();
        if bytes.len() >= MODULUS_SIZE {
            return bytes;
        }
        let mut padded = vec![0u8; MODULUS_SIZE - bytes.len()];
        padded.extend_from_slice(&bytes);
        padded
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The 32-byte session key, `SHA-256(raw_secret as 256-byte big-endian)`.
///
/// `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey([u8; DERIVED_KEY_SIZE]);

impl DerivedKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; DERIVED_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; DERIVED_KEY_SIZE] {
        &self.0
    }

    /// Lowercase hex of the key bytes, for display only.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivedKey(<redacted {DERIVED_KEY_SIZE} bytes>)")
    }
}

struct PrivateKey(BigUint);

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// One party's side of a Diffie-Hellman exchange.
#[derive(Debug)]
pub struct KeyAgreement {
    group: &'static Group,
    private_key: PrivateKey,
    public_key: PublicKey,
    derived_key: Option<DerivedKey>,
}

impl KeyAgreement {
    /// Generate a fresh key pair over the RFC 3526 group 14.
    ///
    /// The private exponent is drawn uniformly from `[2, p-2]` by rejection
    /// sampling 256-byte candidates from `env`.
    pub fn generate<E: Environment>(env: &E) -> Result<Self, KeyAgreementError> {
        let group = modp_2048();

        for _ in 0..MAX_SAMPLING_ROUNDS {
            let candidate: [u8; MODULUS_SIZE] = env.random_array()?;
            let offset = BigUint::from_bytes_be(&candidate);
            if offset < group.exponent_span {
                return Ok(Self::with_private_key(group, offset + 2u32));
            }
        }

        Err(EntropyError {
            reason: format!("no private key candidate accepted in {MAX_SAMPLING_ROUNDS} rounds"),
        }
        .into())
    }

    /// Build an agreement from a known private exponent.
    ///
    /// Intended for reproducible vectors; real sessions use [`generate`].
    ///
    /// [`generate`]: Self::generate
    pub fn from_private_key(private_key: BigUint) -> Result<Self, KeyAgreementError> {
        let group = modp_2048();
        if !group.is_valid_private(&private_key) {
            return Err(KeyAgreementError::PrivateKeyOutOfRange);
        }
        Ok(Self::with_private_key(group, private_key))
    }

    fn with_private_key(group: &'static Group, private_key: BigUint) -> Self {
        let public_key = PublicKey(group.generator.modpow(&private_key, &group.modulus));
        tracing::debug!("generated DH key pair, public key {}...", hex_prefix(&public_key));
        Self { group, private_key: PrivateKey(private_key), public_key, derived_key: None }
    }

    /// The group this agreement operates in.
    pub fn group(&self) -> &'static Group {
        self.group
    }

    /// Our public key, to be sent to the peer.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Our public key as minimal lowercase hex.
    pub fn public_key_hex(&self) -> String {
        self.public_key.to_hex()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HandshakeState {
        if self.derived_key.is_some() {
            HandshakeState::SecretComputed
        } else {
            HandshakeState::KeysGenerated
        }
    }

    /// Combine our private key with the peer's public key.
    ///
    /// Computes `raw = peer^a mod p`, serializes `raw` as a 256-byte
    /// big-endian block and stores `SHA-256(block)` as the derived key.
    ///
    /// # Errors
    ///
    /// - `InvalidPublicKey` if `peer >= p`
    /// - `SecretAlreadyComputed` if this agreement was already used
    pub fn compute_shared_secret(
        &mut self,
        peer: &PublicKey,
    ) -> Result<DerivedKey, KeyAgreementError> {
        if self.derived_key.is_some() {
            return Err(KeyAgreementError::SecretAlreadyComputed);
        }

        let peer_value = peer.as_biguint();
        if *peer_value >= self.group.modulus {
            return Err(KeyAgreementError::InvalidPublicKey {
                reason: format!(
                    "value has {} bits and is not below the {}-bit modulus",
                    peer_value.bits(),
                    self.group.modulus.bits()
                ),
            });
        }
        if self.group.is_degenerate(peer_value) {
            tracing::warn!("peer public key {} is a degenerate group element", hex_prefix(peer));
        }

        let raw = peer_value.modpow(&self.private_key.0, &self.group.modulus);
        let digest = Sha256::digest(Group::to_fixed_bytes(&raw));

        let mut key = [0u8; DERIVED_KEY_SIZE];
        key.copy_from_slice(&digest);
        let derived = DerivedKey(key);

        tracing::debug!("derived shared key from peer {}...", hex_prefix(peer));
        self.derived_key = Some(derived.clone());
        Ok(derived)
    }

    /// The derived key.
    ///
    /// # Errors
    ///
    /// `NotReady` until [`compute_shared_secret`](Self::compute_shared_secret)
    /// has succeeded.
    pub fn derived_key(&self) -> Result<&DerivedKey, KeyAgreementError> {
        self.derived_key.as_ref().ok_or(KeyAgreementError::NotReady)
    }

    /// The derived key as lowercase hex, for display.
    pub fn shared_key_hex(&self) -> Result<String, KeyAgreementError> {
        self.derived_key().map(DerivedKey::to_hex)
    }
}

fn hex_prefix(key: &PublicKey) -> String {
    let mut hex = key.to_hex();
    hex.truncate(LOG_HEX_PREFIX);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::SystemEnv;

    fn agreement(private_key: u64) -> KeyAgreement {
        KeyAgreement::from_private_key(BigUint::from(private_key)).unwrap()
    }

    #[test]
    fn group_constants_match_rfc3526() {
        let group = modp_2048();
        assert_eq!(group.modulus().bits(), 2048);
        assert_eq!(group.generator(), &BigUint::from(2u32));
        assert_eq!(&MODP_2048_PRIME[..8], &[0xFF; 8]);
        assert_eq!(&MODP_2048_PRIME[MODULUS_SIZE - 8..], &[0xFF; 8]);
    }

    #[test]
    fn generated_private_key_is_in_range() {
        let group = modp_2048();
        for _ in 0..8 {
            let agreement = KeyAgreement::generate(&SystemEnv).unwrap();
            assert!(group.is_valid_private(&agreement.private_key.0));
            assert_eq!(agreement.state(), HandshakeState::KeysGenerated);
        }
    }

    #[test]
    fn private_key_bounds_are_enforced() {
        let p = modp_2048().modulus().clone();

        assert_eq!(
            KeyAgreement::from_private_key(BigUint::from(1u32)).unwrap_err(),
            KeyAgreementError::PrivateKeyOutOfRange
        );
        assert_eq!(
            KeyAgreement::from_private_key(&p - 1u32).unwrap_err(),
            KeyAgreementError::PrivateKeyOutOfRange
        );
        assert!(KeyAgreement::from_private_key(BigUint::from(2u32)).is_ok());
        assert!(KeyAgreement::from_private_key(&p - 2u32).is_ok());
    }

    #[test]
    fn small_exponent_public_key_is_exact_power_of_two() {
        assert_eq!(agreement(5).public_key().as_biguint(), &BigUint::from(32u32));
        assert_eq!(agreement(7).public_key_hex(), "80");
    }

    #[test]
    fn derived_key_not_ready_before_compute() {
        let agreement = agreement(5);
        assert_eq!(agreement.derived_key().unwrap_err(), KeyAgreementError::NotReady);
        assert_eq!(agreement.shared_key_hex().unwrap_err(), KeyAgreementError::NotReady);
    }

    #[test]
    fn compute_is_single_use() {
        let mut alice = agreement(5);
        let bob = agreement(7);

        alice.compute_shared_secret(bob.public_key()).unwrap();
        assert_eq!(alice.state(), HandshakeState::SecretComputed);

        let err = alice.compute_shared_secret(bob.public_key()).unwrap_err();
        assert_eq!(err, KeyAgreementError::SecretAlreadyComputed);
    }

    #[test]
    fn peer_key_at_or_above_modulus_is_rejected() {
        let p = modp_2048().modulus().clone();
        let mut alice = agreement(5);

        let err = alice.compute_shared_secret(&PublicKey::from_biguint(p.clone())).unwrap_err();
        assert!(matches!(err, KeyAgreementError::InvalidPublicKey { .. }));

        let err = alice.compute_shared_secret(&PublicKey::from_biguint(p + 1u32)).unwrap_err();
        assert!(matches!(err, KeyAgreementError::InvalidPublicKey { .. }));

        // Rejection leaves the agreement usable
        assert_eq!(alice.state(), HandshakeState::KeysGenerated);
    }

    #[test]
    fn degenerate_peer_key_is_accepted() {
        let mut alice = agreement(5);
        let key = alice.compute_shared_secret(&PublicKey::from_biguint(BigUint::from(1u32)));

        let expected = Sha256::digest(Group::to_fixed_bytes(&BigUint::from(1u32)));
        assert_eq!(key.unwrap().as_bytes()[..], expected[..]);
    }

    #[test]
    fn public_key_hex_round_trip() {
        let alice = KeyAgreement::generate(&SystemEnv).unwrap();
        let parsed = PublicKey::from_hex(&alice.public_key_hex()).unwrap();
        assert_eq!(&parsed, alice.public_key());

        let prefixed = PublicKey::from_hex(&format!("0x{}", alice.public_key_hex())).unwrap();
        assert_eq!(&prefixed, alice.public_key());
    }

    #[test]
    fn public_key_hex_rejects_garbage() {
        let err = PublicKey::from_hex("not-hex").unwrap_err();
        assert_eq!(err, KeyAgreementError::InvalidPublicKeyHex { input: "not-hex".to_string() });
    }

    #[test]
    fn public_key_bytes_are_fixed_width() {
        let bytes = agreement(5).public_key().to_bytes_be();
        assert_eq!(bytes.len(), MODULUS_SIZE);
        assert_eq!(bytes[MODULUS_SIZE - 1], 32);
        assert!(bytes[..MODULUS_SIZE - 1].iter().all(|&b| b == 0));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let mut alice = agreement(5);
        let key = alice.compute_shared_secret(agreement(7).public_key()).unwrap();

        assert_eq!(format!("{key:?}"), "DerivedKey(<redacted 32 bytes>)");
        assert!(format!("{alice:?}").contains("PrivateKey(<redacted>)"));
    }
}
