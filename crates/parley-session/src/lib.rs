//! Parley Session
//!
//! Two-party session establishment and messaging on top of
//! `parley-crypto`.
//!
//! # Architecture
//!
//! - [`Handshake`]: two independent key agreements whose derived keys must
//!   match before anything is encrypted
//! - [`Channel`]: pure state machine holding the shared session cipher and
//!   one inbox per party; events in, actions out, the caller performs all
//!   I/O and logging
//!
//! # Components
//!
//! - [`ChannelEvent`]: Events fed into the channel
//! - [`ChannelAction`]: Actions produced by the channel
//! - [`SessionError`]: Errors, split into fatal and per-message

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod channel;
mod error;
mod event;
mod handshake;

pub use channel::Channel;
pub use error::SessionError;
pub use event::{ChannelAction, ChannelEvent, LogLevel, PartyId};
pub use handshake::{EstablishedSession, Handshake, HandshakeTranscript, verify_agreement};
pub use parley_crypto::{Environment, SystemEnv};
