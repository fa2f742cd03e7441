//! Shared-key channel state machine.
//!
//! The `Channel` holds the single session cipher both parties use and one
//! inbox per party. It is a pure state machine: the caller feeds
//! [`ChannelEvent`]s and executes the returned [`ChannelAction`]s (logging,
//! display, forwarding envelopes over a real transport).

use std::collections::VecDeque;

use parley_crypto::{Environment, SymmetricCipher};

use crate::{
    error::SessionError,
    event::{ChannelAction, ChannelEvent, LogLevel, PartyId},
    handshake::{EstablishedSession, Handshake, HandshakeTranscript},
};

/// Two-party channel over one shared session key.
///
/// # Type Parameters
///
/// - `E`: Environment supplying IV randomness
#[derive(Debug)]
pub struct Channel<E: Environment> {
    /// Session cipher, read-only after construction.
    cipher: SymmetricCipher<E>,

    /// Envelopes waiting to be decrypted, indexed by [`PartyId`].
    inboxes: [VecDeque<String>; 2],
}

impl<E: Environment> Channel<E> {
    /// Create a channel around an existing cipher.
    pub fn new(cipher: SymmetricCipher<E>) -> Self {
        Self { cipher, inboxes: [VecDeque::new(), VecDeque::new()] }
    }

    /// Create a channel keyed by a completed handshake.
    pub fn from_session(env: E, session: &EstablishedSession) -> Self {
        Self::new(SymmetricCipher::from_derived_key(env, &session.shared_key))
    }

    /// Run a fresh handshake and key a channel with its result.
    pub fn establish(env: E) -> Result<(Self, HandshakeTranscript), SessionError> {
        let session = Handshake::establish(&env)?;
        let channel = Self::from_session(env, &session);
        Ok((channel, session.transcript))
    }

    /// The session cipher.
    pub fn cipher(&self) -> &SymmetricCipher<E> {
        &self.cipher
    }

    /// Number of envelopes waiting for `party`.
    pub fn pending(&self, party: PartyId) -> usize {
        self.inboxes[party.index()].len()
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Cipher` when encryption or decryption fails.
    /// A failed envelope is consumed; the channel stays usable.
    pub fn handle(&mut self, event: ChannelEvent) -> Result<Vec<ChannelAction>, SessionError> {
        match event {
            ChannelEvent::Send { from, plaintext } => self.handle_send(from, &plaintext),
            ChannelEvent::Inject { to, envelope } => Ok(self.handle_inject(to, envelope)),
            ChannelEvent::Receive { to } => self.handle_receive(to),
        }
    }

    fn handle_send(
        &mut self,
        from: PartyId,
        plaintext: &str,
    ) -> Result<Vec<ChannelAction>, SessionError> {
        if plaintext.is_empty() {
            return Ok(vec![ChannelAction::log(
                LogLevel::Warn,
                format!("Party {from}: no message to encrypt"),
            )]);
        }

        let envelope = self.cipher.encrypt(plaintext)?;
        let to = from.peer();
        self.inboxes[to.index()].push_back(envelope.clone());

        Ok(vec![
            ChannelAction::log(
                LogLevel::Info,
                format!("Party {from}: encrypted and sent message to party {to}"),
            ),
            ChannelAction::Deliver { to, envelope },
        ])
    }

    fn handle_inject(&mut self, to: PartyId, envelope: String) -> Vec<ChannelAction> {
        self.inboxes[to.index()].push_back(envelope);
        vec![ChannelAction::log(LogLevel::Debug, format!("Party {to}: envelope queued"))]
    }

    fn handle_receive(&mut self, to: PartyId) -> Result<Vec<ChannelAction>, SessionError> {
        let Some(envelope) = self.inboxes[to.index()].pop_front() else {
            return Ok(vec![ChannelAction::log(
                LogLevel::Warn,
                format!("Party {to}: no message to decrypt"),
            )]);
        };

        match self.cipher.decrypt(&envelope) {
            Ok(text) => Ok(vec![
                ChannelAction::log(LogLevel::Info, format!("Party {to}: message decrypted")),
                ChannelAction::Plaintext { party: to, text },
            ]),
            Err(e) => {
                tracing::debug!("party {} failed to decrypt envelope: {}", to, e);
                Err(e.into())
            },
        }
    }
}
