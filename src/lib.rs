//! Client library for submitting transactions to an account-model chain and
//! confirming their inclusion.

pub mod blockchain;
pub mod config;
pub mod observability;

pub use blockchain::{ChainClient, ChainError, ChainErrorKind, ConfirmationError};
pub use config::ClientConfig;
