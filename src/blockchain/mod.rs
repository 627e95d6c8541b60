//! Transaction lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! caller
//!     → service.rs (composed ChainClient)
//!     → confirmation.rs (anchor, submit, poll blocks)
//!     → transaction.rs (TAPOS header, external signer, push)
//!     → info.rs / client.rs (node RPC with timeouts and failover)
//!     → errors.rs (classify every node failure)
//! ```
//!
//! # Constraints
//! - Key material never enters this crate; signing is delegated
//! - Submissions are never retried
//! - Block reads retry only while the block is not produced yet
//! - Confirmation means inclusion in a block, not finality

pub mod accounts;
pub mod client;
pub mod confirmation;
pub mod errors;
pub mod info;
pub mod rpc;
pub mod service;
pub mod signer;
pub mod transaction;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use accounts::{AccountName, AccountNameAllocator};
pub use client::HttpChainRpc;
pub use confirmation::{ConfirmationPoller, ConfirmationState};
pub use errors::{ChainError, ChainErrorKind};
pub use info::ChainInfoProvider;
pub use rpc::ChainRpc;
pub use service::ChainClient;
pub use signer::TransactionSigner;
pub use transaction::ActionSubmitter;
pub use types::{
    Action, ChainId, ConfirmationError, ConfirmationStatus, RpcError, SubmitOutcome,
    TransactionOptions, TransactionReceipt,
};
