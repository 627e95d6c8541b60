//! Transaction signing seam.
//!
//! # Security
//! - Key material never passes through this crate
//! - Serialization against contract ABIs and signing are done by the signer
//! - The chain id is provided so signatures cannot be replayed on another chain

use async_trait::async_trait;
use thiserror::Error;

use crate::blockchain::types::{ChainId, SignedTransaction, UnsignedTransaction};

/// Failure reported by an external signer.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SignerError(pub String);

impl SignerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// External signer (wallet, HSM, remote signing service).
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Serialize and sign a transaction for the given chain.
    async fn sign(
        &self,
        transaction: &UnsignedTransaction,
        chain_id: &ChainId,
    ) -> Result<SignedTransaction, SignerError>;
}
