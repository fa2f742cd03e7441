//! Events fed into a [`Channel`](crate::Channel) and the actions it returns.

use std::fmt;

/// One of the two simulated parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartyId {
    /// First party.
    A,
    /// Second party.
    B,
}

impl PartyId {
    /// The other party.
    pub fn peer(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// Severity of a [`ChannelAction::Log`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal progress.
    Info,
    /// Unusual but handled.
    Warn,
    /// Operation failed.
    Error,
}

/// Inputs to the channel state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Party encrypts `plaintext` and sends it to its peer.
    Send {
        /// Sending party.
        from: PartyId,
        /// Message text.
        plaintext: String,
    },

    /// Place raw text in a party's inbox as if it arrived over the wire.
    ///
    /// Used by hosts that carry envelopes themselves, and to model injected
    /// or corrupted traffic.
    Inject {
        /// Receiving party.
        to: PartyId,
        /// Envelope text (not validated on arrival).
        envelope: String,
    },

    /// Party decrypts the oldest envelope waiting in its inbox.
    Receive {
        /// Receiving party.
        to: PartyId,
    },
}

/// Outputs for the caller to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelAction {
    /// An envelope was placed in `to`'s inbox.
    Deliver {
        /// Recipient.
        to: PartyId,
        /// Base64 envelope.
        envelope: String,
    },

    /// A party recovered a plaintext.
    Plaintext {
        /// Party that decrypted.
        party: PartyId,
        /// Recovered text.
        text: String,
    },

    /// Human-readable progress for the host's log.
    Log {
        /// Severity.
        level: LogLevel,
        /// Message text.
        message: String,
    },
}

impl ChannelAction {
    pub(crate) fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log { level, message: message.into() }
    }
}
