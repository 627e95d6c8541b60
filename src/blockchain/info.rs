//! Head-of-chain and chain id lookups with a last-seen cache.

use arc_swap::ArcSwapOption;
use std::sync::Arc;

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{ChainId, ChainInfo, ClientError, ClientResult, RpcResult};

/// Fetches `get_info` on demand and keeps the last response for other components.
pub struct ChainInfoProvider {
    rpc: Arc<dyn ChainRpc>,
    last_seen: ArcSwapOption<ChainInfo>,
}

impl ChainInfoProvider {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self {
            rpc,
            last_seen: ArcSwapOption::empty(),
        }
    }

    /// Fetch fresh chain info and cache it. Errors are returned unclassified.
    pub async fn info(&self) -> RpcResult<Arc<ChainInfo>> {
        let info = Arc::new(self.rpc.get_info().await?);
        self.last_seen.store(Some(info.clone()));
        tracing::trace!(head_block_num = info.head_block_num, "Chain info refreshed");
        Ok(info)
    }

    /// Current head block number (always fetched).
    pub async fn head_block_number(&self) -> RpcResult<u64> {
        Ok(self.info().await?.head_block_num)
    }

    /// Chain id; served from the cache when available since it never changes.
    pub async fn chain_id(&self) -> RpcResult<ChainId> {
        if let Some(info) = self.last_seen.load_full() {
            return Ok(info.chain_id.clone());
        }
        Ok(self.info().await?.chain_id.clone())
    }

    /// Last info seen by any caller, without a network call.
    pub fn cached(&self) -> Option<Arc<ChainInfo>> {
        self.last_seen.load_full()
    }

    /// Verify the connected chain matches the expected id.
    pub async fn verify_chain_id(&self, expected: &ChainId) -> ClientResult<()> {
        let actual = self.chain_id().await?;
        if !actual.0.eq_ignore_ascii_case(&expected.0) {
            return Err(ClientError::ChainMismatch {
                expected: expected.clone(),
                actual,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChainInfoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainInfoProvider")
            .field("last_seen", &self.last_seen.load())
            .finish()
    }
}
