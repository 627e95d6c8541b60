//! Node RPC surface consumed by the lifecycle components.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blockchain::types::{
    Block, BlockHeaderState, ChainInfo, RpcResult, SignedTransaction, TransactionReceipt,
};

/// Parameters for `get_table_rows`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRowsQuery {
    pub code: String,
    pub table: String,
    /// Defaults to `code`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<Value>,
    /// `-1` returns every row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
}

impl TableRowsQuery {
    pub fn new(code: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            table: table.into(),
            ..Default::default()
        }
    }

    /// Request body with the defaults filled in.
    pub fn to_request(&self) -> Value {
        let mut body = serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()));
        if let Value::Object(map) = &mut body {
            map.insert("json".into(), Value::Bool(true));
            map.entry("scope").or_insert_with(|| Value::String(self.code.clone()));
            map.entry("lower_bound").or_insert_with(|| Value::from(0));
            map.entry("limit").or_insert_with(|| Value::from(-1));
        }
        body
    }
}

/// `get_table_rows` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRows {
    #[serde(default)]
    pub rows: Vec<Value>,
    #[serde(default)]
    pub more: Value,
}

/// Node RPC calls. Errors are raw; callers classify them.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn get_info(&self) -> RpcResult<ChainInfo>;

    /// Fails with an `unknown_block_exception` body when the block is not produced yet.
    async fn get_block(&self, block_num: u64) -> RpcResult<Block>;

    async fn get_block_header_state(&self, block_num: u64) -> RpcResult<BlockHeaderState>;

    async fn push_transaction(&self, transaction: &SignedTransaction) -> RpcResult<TransactionReceipt>;

    /// Fails when the account does not exist.
    async fn get_account(&self, name: &str) -> RpcResult<Value>;

    async fn get_table_rows(&self, query: &TableRowsQuery) -> RpcResult<TableRows>;

    /// History API: accounts controlled by a public key.
    async fn get_key_accounts(&self, public_key: &str) -> RpcResult<Vec<String>>;
}
