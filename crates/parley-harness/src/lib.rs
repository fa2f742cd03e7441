//! Deterministic test harness for Parley.
//!
//! Provides a seeded [`Environment`](parley_crypto::Environment)
//! implementation so that every key pair, IV and envelope in a test run is
//! reproducible from a single `u64`.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of the two-party
//! channel with no cryptography at all. Operations are applied to both the
//! model and the real [`Channel`](parley_session::Channel), and their
//! observable results are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_env;

pub use model::{
    Corruption, ModelEnvelope, ModelWorld, ObservableState, Operation, OperationError,
    OperationResult, SmallMessage,
};
pub use sim_env::SimEnv;
