//! Transaction building, signing and submission.
//!
//! # Responsibilities
//! - Pick the TAPOS reference block `blocks_behind` below head
//! - Set the expiration relative to the reference block time
//! - Hand the transaction to the external signer
//! - Push it, or return the signed envelope when not broadcasting
//!
//! Submissions are never retried here: a resent transaction may have side
//! effects twice.

use chrono::{Duration as ChronoDuration, NaiveDateTime};
use std::sync::Arc;

use crate::blockchain::info::ChainInfoProvider;
use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::signer::TransactionSigner;
use crate::blockchain::types::{
    Action, BlockHeaderState, SubmitError, SubmitOutcome, SubmitResult, TransactionOptions,
    UnsignedTransaction,
};
use crate::observability::metrics;

const NODE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const EXPIRATION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Sends a set of actions as one signed transaction.
pub struct ActionSubmitter {
    rpc: Arc<dyn ChainRpc>,
    info: Arc<ChainInfoProvider>,
    signer: Arc<dyn TransactionSigner>,
}

impl ActionSubmitter {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        info: Arc<ChainInfoProvider>,
        signer: Arc<dyn TransactionSigner>,
    ) -> Self {
        Self { rpc, info, signer }
    }

    /// Build the unsigned transaction with replay protection.
    ///
    /// # Arguments
    /// * `actions` - Actions to include, in order
    /// * `options` - TAPOS distance and validity window
    pub async fn build(
        &self,
        actions: &[Action],
        options: &TransactionOptions,
    ) -> SubmitResult<UnsignedTransaction> {
        let info = self.info.info().await?;
        let ref_block_num = info
            .head_block_num
            .saturating_sub(u64::from(options.blocks_behind));
        let ref_block = self.rpc.get_block_header_state(ref_block_num).await?;

        let tapos = Tapos::from_header(&ref_block, options.expire_seconds)?;

        Ok(UnsignedTransaction {
            expiration: tapos.expiration,
            ref_block_num: tapos.ref_block_num,
            ref_block_prefix: tapos.ref_block_prefix,
            max_net_usage_words: 0,
            max_cpu_usage_ms: 0,
            delay_sec: 0,
            context_free_actions: Vec::new(),
            actions: actions.to_vec(),
            transaction_extensions: Vec::new(),
        })
    }

    /// Build, sign and (when `options.broadcast`) push a transaction.
    pub async fn submit(
        &self,
        actions: &[Action],
        options: &TransactionOptions,
    ) -> SubmitResult<SubmitOutcome> {
        let transaction = self.build(actions, options).await?;
        let chain_id = self.info.chain_id().await?;

        let signed = self
            .signer
            .sign(&transaction, &chain_id)
            .await
            .map_err(|e| SubmitError::Signer(e.to_string()))?;

        if !options.broadcast {
            tracing::debug!(actions = actions.len(), "Transaction signed, not broadcast");
            metrics::record_submission("signed");
            return Ok(SubmitOutcome::Signed(signed));
        }

        match self.rpc.push_transaction(&signed).await {
            Ok(receipt) => {
                tracing::info!(
                    transaction_id = %receipt.transaction_id,
                    processed_block_num = ?receipt.processed_block_num,
                    actions = actions.len(),
                    "Transaction pushed"
                );
                metrics::record_submission("broadcast");
                Ok(SubmitOutcome::Broadcast(receipt))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Transaction push failed");
                metrics::record_submission("failed");
                Err(e.into())
            }
        }
    }
}

/// Reference block fields of a transaction header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Tapos {
    ref_block_num: u16,
    ref_block_prefix: u32,
    expiration: String,
}

impl Tapos {
    fn from_header(header: &BlockHeaderState, expire_seconds: u32) -> SubmitResult<Self> {
        let invalid = |reason: String| SubmitError::InvalidReferenceBlock {
            block_num: header.block_num,
            reason,
        };

        let id = hex::decode(&header.id).map_err(|e| invalid(format!("block id is not hex: {}", e)))?;
        let prefix_bytes: [u8; 4] = id
            .get(8..12)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| invalid(format!("block id too short ({} bytes)", id.len())))?;

        let timestamp = NaiveDateTime::parse_from_str(&header.header.timestamp, NODE_TIME_FORMAT)
            .map_err(|e| invalid(format!("bad timestamp '{}': {}", header.header.timestamp, e)))?;
        let expiration = timestamp + ChronoDuration::seconds(i64::from(expire_seconds));

        Ok(Self {
            ref_block_num: (header.block_num & 0xffff) as u16,
            ref_block_prefix: u32::from_le_bytes(prefix_bytes),
            expiration: expiration.format(EXPIRATION_FORMAT).to_string(),
        })
    }
}
