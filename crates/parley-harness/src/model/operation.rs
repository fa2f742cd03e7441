//! Operations for model-based testing.
//!
//! Operations are generated randomly and applied to both the model and the
//! real channel.

use arbitrary::Arbitrary;
use parley_session::PartyId;

/// Characters used to build message content, including multi-byte UTF-8.
const ALPHABET: &[char] = &['a', 'b', 'q', 'z', ' ', '.', '7', 'é', 'ß', 'Ж', '中', '🙂'];

/// Operations that can be applied to the channel.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Party sends a message to its peer.
    Send {
        /// `true` for party A, `false` for party B.
        from_a: bool,
        /// Message content.
        content: SmallMessage,
    },

    /// Party decrypts its oldest pending envelope.
    Receive {
        /// `true` for party A, `false` for party B.
        to_a: bool,
    },

    /// Traffic that is not a valid envelope arrives at a party.
    Inject {
        /// `true` for party A, `false` for party B.
        to_a: bool,
        /// Kind of bad traffic.
        corruption: Corruption,
    },
}

/// Converts the `bool` encoding used by generated operations.
pub fn party(is_a: bool) -> PartyId {
    if is_a { PartyId::A } else { PartyId::B }
}

/// Bad traffic that must always be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Corruption {
    /// Plain text that is not base64.
    NotBase64,
    /// Valid base64 shorter than IV plus one block.
    Truncated,
    /// Valid base64 whose length is not block aligned.
    Unaligned,
}

impl Corruption {
    /// Render the corrupted traffic as text.
    pub fn render(self) -> String {
        match self {
            // Not base64: contains spaces and '!'
            Self::NotBase64 => "HACKED MESSAGE!".to_string(),
            // 10 decoded bytes
            Self::Truncated => "AAAAAAAAAAAAAA==".to_string(),
            // 33 decoded bytes
            Self::Unaligned => "A".repeat(44),
        }
    }
}

/// Compact message content, expanded deterministically from a seed.
#[derive(Debug, Clone, Arbitrary)]
pub struct SmallMessage {
    /// Content seed.
    pub seed: u8,
    /// Length hint (0-3 maps to empty/small/block-sized/large).
    pub size_class: u8,
}

impl SmallMessage {
    /// Expand to the message text.
    pub fn to_text(&self) -> String {
        let len = match self.size_class % 4 {
            0 => 0,
            1 => 5,
            2 => 16,
            _ => 100,
        };

        (0..len)
            .map(|i| ALPHABET[(usize::from(self.seed) + i) % ALPHABET.len()])
            .collect()
    }
}

/// Result of applying an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation completed with nothing to report.
    Ok,

    /// A party recovered this plaintext.
    Received(String),

    /// Operation failed with an expected error.
    Error(OperationError),
}

/// Expected errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Pending traffic was not a valid envelope.
    Rejected,
}
