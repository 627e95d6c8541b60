//! Composed chain client.
//!
//! Holds one instance of each lifecycle component, wired together at
//! construction, and exposes the caller-facing operations.

use serde_json::Value;
use std::sync::Arc;

use crate::blockchain::accounts::{AccountName, AccountNameAllocator};
use crate::blockchain::client::HttpChainRpc;
use crate::blockchain::confirmation::ConfirmationPoller;
use crate::blockchain::info::ChainInfoProvider;
use crate::blockchain::rpc::{ChainRpc, TableRowsQuery};
use crate::blockchain::signer::TransactionSigner;
use crate::blockchain::transaction::ActionSubmitter;
use crate::blockchain::types::{
    AccountResult, Action, ChainId, ClientResult, ConfirmationResult, RpcResult, SubmitOutcome,
    TransactionOptions,
};
use crate::config::ClientConfig;

/// Client for submitting and confirming transactions against one chain.
pub struct ChainClient {
    config: ClientConfig,
    rpc: Arc<dyn ChainRpc>,
    info: Arc<ChainInfoProvider>,
    submitter: Arc<ActionSubmitter>,
    poller: ConfirmationPoller,
    allocator: AccountNameAllocator,
}

impl ChainClient {
    /// Wire the components around an existing RPC implementation.
    pub fn new(
        config: ClientConfig,
        rpc: Arc<dyn ChainRpc>,
        signer: Arc<dyn TransactionSigner>,
    ) -> Self {
        let info = Arc::new(ChainInfoProvider::new(rpc.clone()));
        let submitter = Arc::new(ActionSubmitter::new(rpc.clone(), info.clone(), signer));
        let poller = ConfirmationPoller::new(
            rpc.clone(),
            info.clone(),
            submitter.clone(),
            config.confirmation.clone(),
        );
        let allocator =
            AccountNameAllocator::new(rpc.clone(), config.accounts.max_generation_attempts);

        Self {
            config,
            rpc,
            info,
            submitter,
            poller,
            allocator,
        }
    }

    /// Connect to the configured node over HTTP.
    ///
    /// A chain id mismatch or unreachable node is logged, not fatal.
    pub async fn connect(
        config: ClientConfig,
        signer: Arc<dyn TransactionSigner>,
    ) -> ClientResult<Self> {
        let rpc = Arc::new(HttpChainRpc::new(&config.node)?);
        let client = Self::new(config, rpc, signer);

        if let Some(expected) = client.config.node.chain_id.as_deref() {
            match client.info.verify_chain_id(&ChainId::from(expected)).await {
                Ok(()) => tracing::info!(chain_id = expected, "Chain client connected"),
                Err(e) => tracing::warn!(
                    error = %e,
                    "Chain client initialized but chain verification failed"
                ),
            }
        }

        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn info(&self) -> &ChainInfoProvider {
        &self.info
    }

    pub fn submitter(&self) -> &ActionSubmitter {
        &self.submitter
    }

    pub fn poller(&self) -> &ConfirmationPoller {
        &self.poller
    }

    pub fn allocator(&self) -> &AccountNameAllocator {
        &self.allocator
    }

    /// Submission options from configuration.
    pub fn default_options(&self) -> TransactionOptions {
        self.config.transaction.options()
    }

    /// Submit actions with the configured options, without waiting for inclusion.
    pub async fn transact(&self, actions: &[Action]) -> ConfirmationResult<SubmitOutcome> {
        self.poller
            .transact(actions, &self.default_options(), false)
            .await
    }

    /// Submit actions with the configured options and wait for inclusion.
    pub async fn await_transaction(&self, actions: &[Action]) -> ConfirmationResult<SubmitOutcome> {
        self.poller
            .await_transaction(actions, &self.default_options())
            .await
    }

    /// Submit with explicit options.
    pub async fn transact_with(
        &self,
        actions: &[Action],
        options: &TransactionOptions,
        confirm: bool,
    ) -> ConfirmationResult<SubmitOutcome> {
        self.poller.transact(actions, options, confirm).await
    }

    /// Generate an account name with the configured prefix.
    pub async fn generate_account_name(&self, check_on_chain: bool) -> AccountResult<AccountName> {
        self.allocator
            .generate(&self.config.accounts.name_prefix, check_on_chain)
            .await
    }

    /// Every row of a contract table.
    pub async fn get_all_table_rows(&self, query: &TableRowsQuery) -> RpcResult<Vec<Value>> {
        Ok(self.rpc.get_table_rows(query).await?.rows)
    }

    /// Whether `public_key` controls `account`, according to the history API.
    pub async fn check_pub_key_to_account(&self, account: &str, public_key: &str) -> RpcResult<bool> {
        let accounts = self.rpc.get_key_accounts(public_key).await?;
        Ok(accounts.iter().any(|a| a == account))
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("http_endpoint", &self.config.node.http_endpoint)
            .field("chain_id", &self.config.node.chain_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::accounts::is_valid_account_name;
    use crate::blockchain::testing::{self, FakeSigner, MockChain};
    use serde_json::json;

    fn client(chain: Arc<MockChain>) -> ChainClient {
        let mut config = ClientConfig::default();
        config.confirmation.check_interval_ms = 5;
        config.accounts.name_prefix = "ore".into();
        ChainClient::new(config, chain, Arc::new(FakeSigner::default()))
    }

    #[tokio::test]
    async fn test_await_transaction_uses_config() {
        let chain = Arc::new(MockChain::new(50));
        chain.set_push_result(Ok(testing::receipt("tx9", Some(52))));
        chain.include(52, "tx9");

        let outcome = client(chain.clone()).await_transaction(&[]).await.unwrap();
        assert_eq!(outcome.receipt().unwrap().transaction_id, "tx9");
        assert_eq!(chain.block_reads(), vec![51, 52]);
    }

    #[tokio::test]
    async fn test_transact_does_not_poll() {
        let chain = Arc::new(MockChain::new(50));
        client(chain.clone()).transact(&[]).await.unwrap();
        assert!(chain.block_reads().is_empty());
        assert_eq!(chain.pushed().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_account_name_uses_prefix() {
        let chain = Arc::new(MockChain::new(1));
        let name = client(chain).generate_account_name(true).await.unwrap();
        assert!(name.as_str().starts_with("ore"));
        assert!(is_valid_account_name(name.as_str()));
    }

    #[tokio::test]
    async fn test_get_all_table_rows() {
        let chain = Arc::new(MockChain::new(1));
        chain.set_table_rows(vec![json!({ "id": 1 }), json!({ "id": 2 })]);

        let rows = client(chain.clone())
            .get_all_table_rows(&TableRowsQuery::new("rights.ore", "rights"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(chain.table_queries()[0].table, "rights");
    }

    #[tokio::test]
    async fn test_check_pub_key_to_account() {
        let chain = Arc::new(MockChain::new(1));
        chain.set_key_accounts("EOS6MRy...", &["alice", "bob"]);
        let client = client(chain);

        assert!(client.check_pub_key_to_account("bob", "EOS6MRy...").await.unwrap());
        assert!(!client.check_pub_key_to_account("carol", "EOS6MRy...").await.unwrap());
        assert!(!client.check_pub_key_to_account("bob", "EOS5other").await.unwrap());
    }
}
