//! Model world - the oracle for the two-party channel.

use std::collections::VecDeque;

use super::operation::{Operation, OperationError, OperationResult};

/// What the model believes is sitting in an inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEnvelope {
    /// A genuine message with this plaintext.
    Message(String),
    /// Traffic that must fail to decrypt.
    Garbage,
}

/// Observable state for oracle comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservableState {
    /// Pending envelope counts for party A and party B.
    pub pending: [usize; 2],
    /// Plaintexts received by party A, in order.
    pub received_by_a: Vec<String>,
    /// Plaintexts received by party B, in order.
    pub received_by_b: Vec<String>,
}

/// Reference implementation of the channel.
#[derive(Debug, Clone, Default)]
pub struct ModelWorld {
    inboxes: [VecDeque<ModelEnvelope>; 2],
    state: ObservableState,
}

impl ModelWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current observable state.
    pub fn observable_state(&self) -> ObservableState {
        let mut state = self.state.clone();
        state.pending = [self.inboxes[0].len(), self.inboxes[1].len()];
        state
    }

    /// Apply an operation and return the result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Send { from_a, content } => {
                let text = content.to_text();
                // Empty messages are refused with a warning, not sent
                if !text.is_empty() {
                    self.inbox(!*from_a).push_back(ModelEnvelope::Message(text));
                }
                OperationResult::Ok
            },
            Operation::Receive { to_a } => match self.inbox(*to_a).pop_front() {
                None => OperationResult::Ok,
                Some(ModelEnvelope::Garbage) => OperationResult::Error(OperationError::Rejected),
                Some(ModelEnvelope::Message(text)) => {
                    if *to_a {
                        self.state.received_by_a.push(text.clone());
                    } else {
                        self.state.received_by_b.push(text.clone());
                    }
                    OperationResult::Received(text)
                },
            },
            Operation::Inject { to_a, .. } => {
                self.inbox(*to_a).push_back(ModelEnvelope::Garbage);
                OperationResult::Ok
            },
        }
    }

    fn inbox(&mut self, is_a: bool) -> &mut VecDeque<ModelEnvelope> {
        &mut self.inboxes[usize::from(!is_a)]
    }
}
