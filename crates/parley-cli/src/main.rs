//! Parley command-line host.
//!
//! # Usage
//!
//! ```bash
//! # Full two-party session: handshake, messages both ways, tamper checks
//! parley demo --message "Hello B" --message "Hello A" --tamper
//!
//! # Show the handshake values
//! parley handshake
//!
//! # Standalone cipher use with a known key
//! KEY=$(parley keygen --bits 256)
//! ENVELOPE=$(parley encrypt --key "$KEY" "secret")
//! parley decrypt --key "$KEY" "$ENVELOPE"
//! ```

mod commands;

use std::io;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Parley key exchange and encrypted messaging
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Diffie-Hellman key exchange and AES-CBC messaging between two parties")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Establish a session between parties A and B and exchange messages
    Demo {
        /// Messages to send, alternating A→B and B→A
        #[arg(short, long = "message")]
        messages: Vec<String>,

        /// Also demonstrate ciphertext, IV and injection tampering
        #[arg(long)]
        tamper: bool,
    },

    /// Run a handshake and print both public keys and the shared key
    Handshake,

    /// Print a random AES key as hex
    Keygen {
        /// Key strength
        #[arg(long, value_enum, default_value_t = KeyBits::Aes256)]
        bits: KeyBits,
    },

    /// Encrypt text under a hex key and print the envelope
    Encrypt {
        /// Key as hex (16, 24 or 32 bytes)
        #[arg(short, long)]
        key: String,

        /// Text to encrypt
        plaintext: String,
    },

    /// Decrypt an envelope under a hex key and print the text
    Decrypt {
        /// Key as hex (16, 24 or 32 bytes)
        #[arg(short, long)]
        key: String,

        /// Base64 envelope
        envelope: String,
    },
}

/// AES key strengths accepted by `keygen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KeyBits {
    #[value(name = "128")]
    Aes128,
    #[value(name = "192")]
    Aes192,
    #[value(name = "256")]
    Aes256,
}

impl KeyBits {
    fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let mut out = io::stdout().lock();
    match args.command {
        Command::Demo { messages, tamper } => commands::demo(&mut out, &messages, tamper)?,
        Command::Handshake => commands::handshake(&mut out)?,
        Command::Keygen { bits } => commands::keygen(&mut out, bits.key_len())?,
        Command::Encrypt { key, plaintext } => commands::encrypt(&mut out, &key, &plaintext)?,
        Command::Decrypt { key, envelope } => commands::decrypt(&mut out, &key, &envelope)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_demo_messages() {
        let args =
            Args::try_parse_from(["parley", "demo", "-m", "one", "--message", "two", "--tamper"])
                .unwrap();
        match args.command {
            Command::Demo { messages, tamper } => {
                assert_eq!(messages, vec!["one", "two"]);
                assert!(tamper);
            },
            other => panic!("expected demo, got {other:?}"),
        }
    }

    #[test]
    fn keygen_defaults_to_256() {
        let args = Args::try_parse_from(["parley", "keygen"]).unwrap();
        assert!(matches!(args.command, Command::Keygen { bits: KeyBits::Aes256 }));
    }

    #[test]
    fn keygen_rejects_unknown_strength() {
        assert!(Args::try_parse_from(["parley", "keygen", "--bits", "100"]).is_err());
        let args = Args::try_parse_from(["parley", "keygen", "--bits", "128"]).unwrap();
        assert!(matches!(args.command, Command::Keygen { bits: KeyBits::Aes128 }));
    }

    #[test]
    fn global_log_level() {
        let args = Args::try_parse_from(["parley", "handshake", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level, "debug");
    }
}
