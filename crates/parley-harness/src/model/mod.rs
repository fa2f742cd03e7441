//! Reference model for model-based testing.
//!
//! The model captures what the channel must do (deliver each non-empty
//! message to the peer, in order, and reject anything that is not an
//! envelope) without any of the cryptography.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Deterministic: Same operations produce same results

pub mod operation;
mod world;

pub use operation::{Corruption, Operation, OperationError, OperationResult, SmallMessage};
pub use world::{ModelEnvelope, ModelWorld, ObservableState};
