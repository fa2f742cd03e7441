//! Parley Cryptographic Primitives
//!
//! This crate provides the two building blocks of a Parley session:
//!
//! - [`KeyAgreement`]: classic Diffie-Hellman over the RFC 3526 2048-bit MODP
//!   group, with the raw shared secret hashed by SHA-256 into a 32-byte
//!   [`DerivedKey`]
//! - [`SymmetricCipher`]: AES-CBC with PKCS#7 padding, producing base64
//!   envelopes of `IV || ciphertext`
//!
//! # Design
//!
//! Randomness is injected through the [`Environment`] trait. Production code
//! uses [`SystemEnv`]; tests can substitute a seeded generator and reproduce
//! every key and envelope.
//!
//! # Threat Model
//!
//! Passive eavesdroppers only. Public keys are not authenticated and
//! envelopes carry no MAC, so an active attacker can substitute keys or
//! tamper with messages undetected.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cipher;
pub mod env;
pub mod key_agreement;

pub use cipher::{BLOCK_SIZE, CipherError, DEFAULT_KEY_SIZE, IV_SIZE, KeySize, SymmetricCipher};
pub use env::{EntropyError, Environment, SystemEnv};
pub use key_agreement::{
    DERIVED_KEY_SIZE, DerivedKey, GENERATOR, Group, HandshakeState, KeyAgreement,
    KeyAgreementError, MODP_2048_PRIME, MODULUS_SIZE, PublicKey, modp_2048,
};
pub use num_bigint::BigUint;
