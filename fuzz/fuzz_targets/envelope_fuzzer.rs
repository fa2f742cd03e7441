//! Fuzz target for envelope decryption
//!
//! Feed arbitrary text to `SymmetricCipher::decrypt` under every key size.
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - Every failure is one of `MalformedEnvelope`, `Padding` or `Encoding`
//! - Anything accepted re-encrypts and decrypts to the same text

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parley_crypto::{CipherError, SymmetricCipher, SystemEnv};

#[derive(Debug, Arbitrary)]
struct Input {
    key_size: u8,
    key_byte: u8,
    envelope: String,
}

fuzz_target!(|input: Input| {
    let key_len = match input.key_size % 3 {
        0 => 16,
        1 => 24,
        _ => 32,
    };
    let Ok(cipher) = SymmetricCipher::new(SystemEnv, &vec![input.key_byte; key_len]) else {
        panic!("valid key length rejected");
    };

    match cipher.decrypt(&input.envelope) {
        Ok(text) => {
            let envelope = cipher.encrypt(&text).expect("encryption failed");
            assert_eq!(cipher.decrypt(&envelope).expect("round trip failed"), text);
        },
        Err(
            CipherError::MalformedEnvelope { .. }
            | CipherError::Padding
            | CipherError::Encoding { .. },
        ) => {},
        Err(other) => panic!("unexpected decrypt error: {other}"),
    }
});
