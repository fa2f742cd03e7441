//! Two-party Diffie-Hellman handshake.
//!
//! Both parties hold independent [`KeyAgreement`]s. Public keys cross over,
//! each side derives the session key on its own, and the two results must be
//! equal before the key is used. Equality stands in for "the channel is
//! correctly established": nothing is shared by aliasing.
//!
//! # Protocol Flow
//!
//! 1. Party A and party B each generate a key pair
//! 2. Public keys are exchanged (a same-process value pass, optionally
//!    routed through a caller-supplied carrier)
//! 3. A computes `K_a` from `(a, B_pub)`, B computes `K_b` from `(b, A_pub)`
//! 4. `K_a == K_b` or the handshake fails with [`SessionError::KeyMismatch`]

use parley_crypto::{DerivedKey, Environment, KeyAgreement, PublicKey};

use crate::{error::SessionError, event::PartyId};

/// Public values exchanged during a handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeTranscript {
    /// Public key sent by party A.
    pub a_public: PublicKey,
    /// Public key sent by party B.
    pub b_public: PublicKey,
}

impl HandshakeTranscript {
    /// Public key sent by `party`.
    pub fn public_key(&self, party: PartyId) -> &PublicKey {
        match party {
            PartyId::A => &self.a_public,
            PartyId::B => &self.b_public,
        }
    }
}

/// Outcome of a successful handshake.
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    /// Key both parties derived independently.
    pub shared_key: DerivedKey,
    /// Public values that produced it.
    pub transcript: HandshakeTranscript,
}

/// A handshake between two freshly generated parties.
#[derive(Debug)]
pub struct Handshake {
    a: KeyAgreement,
    b: KeyAgreement,
}

impl Handshake {
    /// Generate independent key pairs for both parties.
    pub fn generate<E: Environment>(env: &E) -> Result<Self, SessionError> {
        let a = KeyAgreement::generate(env)?;
        let b = KeyAgreement::generate(env)?;
        Ok(Self { a, b })
    }

    /// Run a handshake over caller-supplied agreements.
    pub fn from_parties(a: KeyAgreement, b: KeyAgreement) -> Self {
        Self { a, b }
    }

    /// Public key of `party`.
    pub fn public_key(&self, party: PartyId) -> &PublicKey {
        match party {
            PartyId::A => self.a.public_key(),
            PartyId::B => self.b.public_key(),
        }
    }

    /// Generate both parties and complete the exchange in one step.
    pub fn establish<E: Environment>(env: &E) -> Result<EstablishedSession, SessionError> {
        Self::generate(env)?.complete()
    }

    /// Exchange public keys directly and verify agreement.
    pub fn complete(self) -> Result<EstablishedSession, SessionError> {
        self.complete_via(|_, key| key)
    }

    /// Exchange public keys through `carry` and verify agreement.
    ///
    /// `carry(from, key)` returns what the peer of `from` receives. An
    /// honest carrier returns `key` unchanged; a substituting one makes the
    /// handshake fail with [`SessionError::KeyMismatch`] (or
    /// [`SessionError::KeyAgreement`] if the substitute is not a group
    /// element).
    pub fn complete_via<F>(mut self, mut carry: F) -> Result<EstablishedSession, SessionError>
    where
        F: FnMut(PartyId, PublicKey) -> PublicKey,
    {
        let transcript = HandshakeTranscript {
            a_public: self.a.public_key().clone(),
            b_public: self.b.public_key().clone(),
        };

        let received_by_b = carry(PartyId::A, transcript.a_public.clone());
        let received_by_a = carry(PartyId::B, transcript.b_public.clone());

        self.a.compute_shared_secret(&received_by_a)?;
        self.b.compute_shared_secret(&received_by_b)?;

        let shared_key = verify_agreement(&self.a, &self.b)?;
        tracing::debug!("handshake complete, derived keys match");

        Ok(EstablishedSession { shared_key, transcript })
    }
}

/// Check that both agreements hold the same derived key.
///
/// # Errors
///
/// - `KeyAgreement(NotReady)` if either side has not computed its secret
/// - `KeyMismatch` if the keys differ
pub fn verify_agreement(a: &KeyAgreement, b: &KeyAgreement) -> Result<DerivedKey, SessionError> {
    let a_key = a.derived_key()?;
    let b_key = b.derived_key()?;

    if a_key != b_key {
        tracing::error!("derived key mismatch between parties");
        return Err(SessionError::KeyMismatch);
    }
    Ok(a_key.clone())
}

#[cfg(test)]
mod tests {
    use parley_crypto::{BigUint, KeyAgreementError, SystemEnv};

    use super::*;

    fn party(private_key: u32) -> KeyAgreement {
        KeyAgreement::from_private_key(BigUint::from(private_key)).unwrap()
    }

    #[test]
    fn establish_produces_matching_keys() {
        let session = Handshake::establish(&SystemEnv).unwrap();
        assert_ne!(session.transcript.a_public, session.transcript.b_public);
    }

    #[test]
    fn transcript_records_exchanged_keys() {
        let handshake = Handshake::from_parties(party(5), party(7));
        let session = handshake.complete().unwrap();

        assert_eq!(session.transcript.public_key(PartyId::A).to_hex(), "20");
        assert_eq!(session.transcript.public_key(PartyId::B).to_hex(), "80");
    }

    #[test]
    fn substituted_key_is_mismatch() {
        let handshake = Handshake::from_parties(party(5), party(7));
        let mallory = party(11).public_key().clone();

        let result = handshake.complete_via(|from, key| match from {
            PartyId::A => mallory.clone(),
            PartyId::B => key,
        });
        assert_eq!(result.unwrap_err(), SessionError::KeyMismatch);
    }

    #[test]
    fn out_of_group_substitute_is_key_agreement_error() {
        let handshake = Handshake::from_parties(party(5), party(7));
        let modulus = parley_crypto::modp_2048().modulus().clone();

        let result = handshake.complete_via(|_, _| PublicKey::from_biguint(modulus.clone()));
        assert!(matches!(
            result,
            Err(SessionError::KeyAgreement(KeyAgreementError::InvalidPublicKey { .. }))
        ));
    }

    #[test]
    fn verify_requires_computed_secrets() {
        let err = verify_agreement(&party(5), &party(7)).unwrap_err();
        assert_eq!(err, SessionError::KeyAgreement(KeyAgreementError::NotReady));
    }
}
