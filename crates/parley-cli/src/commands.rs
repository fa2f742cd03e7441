//! Subcommand implementations.
//!
//! Each command writes its user-facing output to `out` and reports progress
//! through `tracing`. Channel actions are executed here: the session crate
//! only describes what happened.

use std::io::Write;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use parley_crypto::{Environment, IV_SIZE, SymmetricCipher, SystemEnv};
use parley_session::{
    Channel, ChannelAction, ChannelEvent, Handshake, LogLevel, PartyId, SessionError,
};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Hex characters shown for key material in the demo.
const KEY_PREFIX_LEN: usize = 32;

const DEFAULT_MESSAGES: [&str; 2] =
    ["Hello B, this message is encrypted.", "Hello A, received and replying."];

fn prefix(hex: &str) -> &str {
    hex.get(..KEY_PREFIX_LEN).unwrap_or(hex)
}

/// Run a complete two-party session.
pub fn demo(out: &mut impl Write, messages: &[String], tamper: bool) -> CommandResult {
    let env = SystemEnv::new();

    let handshake = Handshake::generate(&env)?;
    writeln!(out, "Party A public key: {}...", prefix(&handshake.public_key(PartyId::A).to_hex()))?;
    writeln!(out, "Party B public key: {}...", prefix(&handshake.public_key(PartyId::B).to_hex()))?;

    let session = handshake.complete()?;
    writeln!(out, "Shared key: {}... (both parties agree)", prefix(&session.shared_key.to_hex()))?;

    let mut channel = Channel::from_session(env, &session);
    tracing::info!("session established, {}", channel.cipher().key_size());

    let defaults: Vec<String> = DEFAULT_MESSAGES.iter().map(ToString::to_string).collect();
    let messages = if messages.is_empty() { &defaults[..] } else { messages };

    for (i, message) in messages.iter().enumerate() {
        let from = if i % 2 == 0 { PartyId::A } else { PartyId::B };
        step(out, &mut channel, ChannelEvent::Send { from, plaintext: message.clone() })?;
        step(out, &mut channel, ChannelEvent::Receive { to: from.peer() })?;
    }

    if tamper {
        tamper_demo(out, &mut channel)?;
    }

    Ok(())
}

/// Feed one event to the channel and execute its actions.
///
/// Per-message failures are printed and the session continues; fatal ones
/// are returned.
fn step<E: Environment>(
    out: &mut impl Write,
    channel: &mut Channel<E>,
    event: ChannelEvent,
) -> CommandResult {
    match channel.handle(event) {
        Ok(actions) => execute(out, actions),
        Err(e) if !e.is_fatal() => {
            writeln!(out, "  rejected: {e}")?;
            Ok(())
        },
        Err(e) => Err(e.into()),
    }
}

fn execute(out: &mut impl Write, actions: Vec<ChannelAction>) -> CommandResult {
    for action in actions {
        match action {
            ChannelAction::Deliver { to, envelope } => {
                writeln!(out, "  -> {to}: {envelope}")?;
            },
            ChannelAction::Plaintext { party, text } => {
                writeln!(out, "  {party} decrypted: {text}")?;
            },
            ChannelAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }
    Ok(())
}

/// Show how unauthenticated CBC reacts to corrupted traffic.
fn tamper_demo<E: Environment>(out: &mut impl Write, channel: &mut Channel<E>) -> CommandResult {
    let original = "Transfer 100 to account 42";
    let envelope = channel.cipher().encrypt(original)?;

    writeln!(out, "Tamper: flip one ciphertext byte")?;
    let corrupted = flip_byte(&envelope, IV_SIZE)?;
    step(out, channel, ChannelEvent::Inject { to: PartyId::B, envelope: corrupted })?;
    step(out, channel, ChannelEvent::Receive { to: PartyId::B })?;

    writeln!(out, "Tamper: flip one IV byte")?;
    let corrupted = flip_byte(&envelope, 0)?;
    match channel.cipher().decrypt(&corrupted) {
        Ok(text) if text != original => {
            writeln!(out, "  decrypted without error to {text:?} (silent corruption)")?;
        },
        Ok(_) => writeln!(out, "  decrypted unchanged")?,
        Err(e) => writeln!(out, "  rejected: {e}")?,
    }

    writeln!(out, "Tamper: inject non-envelope text")?;
    step(out, channel, ChannelEvent::Inject {
        to: PartyId::A,
        envelope: "HACKED MESSAGE".to_string(),
    })?;
    step(out, channel, ChannelEvent::Receive { to: PartyId::A })
}

/// XOR one byte of a decoded envelope with `0x01` and re-encode it.
fn flip_byte(envelope: &str, index: usize) -> Result<String, SessionError> {
    let mut packed = BASE64.decode(envelope).map_err(|e| {
        SessionError::Cipher(parley_crypto::CipherError::MalformedEnvelope {
            reason: e.to_string(),
        })
    })?;
    if let Some(byte) = packed.get_mut(index) {
        *byte ^= 0x01;
    }
    Ok(BASE64.encode(packed))
}

/// Print both public keys and the agreed key in full.
pub fn handshake(out: &mut impl Write) -> CommandResult {
    let session = Handshake::establish(&SystemEnv::new())?;

    writeln!(out, "Party A public key: {}", session.transcript.a_public)?;
    writeln!(out, "Party B public key: {}", session.transcript.b_public)?;
    writeln!(out, "Shared key: {}", session.shared_key.to_hex())?;
    Ok(())
}

/// Print a random key of `key_len` bytes as hex.
pub fn keygen(out: &mut impl Write, key_len: usize) -> CommandResult {
    let env = SystemEnv::new();
    let mut key = vec![0u8; key_len];
    env.random_bytes(&mut key)?;

    let cipher = SymmetricCipher::new(env, &key)?;
    writeln!(out, "{}", cipher.key_hex())?;
    Ok(())
}

/// Encrypt `plaintext` under a hex key.
pub fn encrypt(out: &mut impl Write, key: &str, plaintext: &str) -> CommandResult {
    let cipher = SymmetricCipher::from_hex_key(SystemEnv::new(), key)?;
    writeln!(out, "{}", cipher.encrypt(plaintext)?)?;
    Ok(())
}

/// Decrypt `envelope` under a hex key.
pub fn decrypt(out: &mut impl Write, key: &str, envelope: &str) -> CommandResult {
    let cipher = SymmetricCipher::from_hex_key(SystemEnv::new(), key)?;
    writeln!(out, "{}", cipher.decrypt(envelope)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_KEY: &str = "0000000000000000000000000000000000000000000000000000000000000000";

    fn run(command: impl FnOnce(&mut Vec<u8>) -> CommandResult) -> String {
        let mut out = Vec::new();
        command(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn encrypt_then_decrypt() {
        let envelope = run(|out| encrypt(out, ZERO_KEY, "test"));
        let text = run(|out| decrypt(out, ZERO_KEY, envelope.trim()));
        assert_eq!(text, "test\n");
    }

    #[test]
    fn decrypt_known_envelope() {
        let envelope = "AAAAAAAAAAAAAAAAAAAAANhweYhYIj9FZNNAsQP2Uns=";
        let text = run(|out| decrypt(out, ZERO_KEY, envelope));
        assert_eq!(text, "test\n");
    }

    #[test]
    fn encrypt_rejects_short_key() {
        let mut out = Vec::new();
        assert!(encrypt(&mut out, "00112233445566778899", "test").is_err());
    }

    #[test]
    fn keygen_lengths() {
        for len in [16, 24, 32] {
            let key = run(|out| keygen(out, len));
            assert_eq!(key.trim().len(), len * 2);
        }
    }

    #[test]
    fn handshake_prints_keys() {
        let output = run(|out| handshake(out));
        assert_eq!(output.lines().count(), 3);
        assert!(output.lines().nth(2).unwrap().starts_with("Shared key: "));
    }

    #[test]
    fn demo_delivers_every_message() {
        let messages = vec!["first".to_string(), "second".to_string(), "third".to_string()];
        let output = run(|out| demo(out, &messages, false));

        assert!(output.contains("B decrypted: first"));
        assert!(output.contains("A decrypted: second"));
        assert!(output.contains("B decrypted: third"));
    }

    #[test]
    fn demo_tamper_reports_rejections() {
        let output = run(|out| demo(out, &[], true));

        assert!(output.contains("B decrypted: Hello B"));
        assert!(output.contains("silent corruption"));
        assert!(output.contains("malformed envelope"));
    }

    #[test]
    fn step_reports_rejection_once_on_stdout() {
        let cipher = SymmetricCipher::generate(SystemEnv).unwrap();
        let mut channel = Channel::new(cipher);
        let garbage = ChannelEvent::Inject { to: PartyId::B, envelope: "HACKED".to_string() };

        let output = run(|out| {
            step(out, &mut channel, garbage)?;
            step(out, &mut channel, ChannelEvent::Receive { to: PartyId::B })
        });

        assert_eq!(output.lines().count(), 1);
        assert!(output.starts_with("  rejected: "));
        assert!(output.contains("malformed envelope"));
    }

    #[test]
    fn flip_byte_changes_one_byte() {
        let envelope = BASE64.encode([0u8; 32]);
        let flipped = BASE64.decode(flip_byte(&envelope, 3).unwrap()).unwrap();

        assert_eq!(flipped[3], 1);
        assert_eq!(flipped.iter().filter(|&&b| b != 0).count(), 1);
    }
}
