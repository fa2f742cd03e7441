//! Fuzz target for peer public key handling
//!
//! Arbitrary bytes are interpreted as a peer's public key.
//!
//! # Invariants
//!
//! - Keys below the modulus always derive a key
//! - Keys at or above the modulus always fail with `InvalidPublicKey`
//! - A rejected key leaves the agreement usable

#![no_main]

use libfuzzer_sys::fuzz_target;
use parley_crypto::{BigUint, HandshakeState, KeyAgreement, KeyAgreementError, PublicKey, modp_2048};

fuzz_target!(|data: &[u8]| {
    let Ok(mut agreement) = KeyAgreement::from_private_key(BigUint::from(0x1234_5678u32)) else {
        panic!("fixed private key rejected");
    };
    let peer = PublicKey::from_bytes_be(data);
    let in_group = peer.as_biguint() < modp_2048().modulus();

    match agreement.compute_shared_secret(&peer) {
        Ok(_) => {
            assert!(in_group, "accepted key outside the group");
            assert_eq!(agreement.state(), HandshakeState::SecretComputed);
        },
        Err(KeyAgreementError::InvalidPublicKey { .. }) => {
            assert!(!in_group, "rejected key inside the group");
            assert_eq!(agreement.state(), HandshakeState::KeysGenerated);
        },
        Err(other) => panic!("unexpected error: {other}"),
    }
});
