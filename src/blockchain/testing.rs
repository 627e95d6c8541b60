//! In-memory node and signer used by unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::blockchain::rpc::{ChainRpc, TableRows, TableRowsQuery};
use crate::blockchain::signer::{SignerError, TransactionSigner};
use crate::blockchain::types::{
    Block, BlockHeader, BlockHeaderState, BlockTransaction, BlockTrx, ChainId, ChainInfo,
    RpcError, RpcResult, SignedTransaction, TransactionReceipt, UnsignedTransaction,
};

pub const CHAIN_ID: &str = "cf057bbfb72640471fd910bcb67639c22df9f92470936cddc1ade0e2f2e7dc4f";

/// Block id whose bytes 8..12 read `0x78563412` as little-endian u32.
pub const REF_BLOCK_ID: &str = "0000006457e6a1b3123456780000000000000000000000000000000000000000";

pub fn node_error(name: &str, what: &str) -> RpcError {
    RpcError::from_response(
        500,
        json!({
            "code": 500,
            "message": "Internal Service Error",
            "error": { "code": 3000000, "name": name, "what": what, "details": [{ "message": what }] }
        }),
    )
}

pub fn unknown_block(block_num: u64) -> RpcError {
    node_error(
        "unknown_block_exception",
        &format!("Could not find block: {}", block_num),
    )
}

#[derive(Default)]
struct State {
    head: u64,
    info_calls: u32,
    fail_info: bool,
    /// Blocks above this number are "not produced yet".
    produced_up_to: u64,
    transactions: HashMap<u64, Vec<String>>,
    /// Remaining transient failures per block before it reads successfully.
    transient_failures: HashMap<u64, u32>,
    fatal_blocks: HashMap<u64, RpcError>,
    block_reads: Vec<u64>,
    push_result: Option<Result<TransactionReceipt, RpcError>>,
    pushed: Vec<SignedTransaction>,
    accounts: HashSet<String>,
    account_queries: Vec<String>,
    table_rows: Vec<Value>,
    table_queries: Vec<TableRowsQuery>,
    key_accounts: HashMap<String, Vec<String>>,
}

/// Scriptable in-memory node.
pub struct MockChain {
    state: Mutex<State>,
}

impl MockChain {
    pub fn new(head: u64) -> Self {
        Self {
            state: Mutex::new(State {
                head,
                produced_up_to: u64::MAX,
                ..Default::default()
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_head(&self, head: u64) {
        self.with(|s| s.head = head);
    }

    pub fn fail_info(&self, fail: bool) {
        self.with(|s| s.fail_info = fail);
    }

    pub fn info_calls(&self) -> u32 {
        self.with(|s| s.info_calls)
    }

    pub fn produced_up_to(&self, block_num: u64) {
        self.with(|s| s.produced_up_to = block_num);
    }

    pub fn include(&self, block_num: u64, transaction_id: &str) {
        self.with(|s| {
            s.transactions
                .entry(block_num)
                .or_default()
                .push(transaction_id.to_string())
        });
    }

    pub fn transient_failures(&self, block_num: u64, count: u32) {
        self.with(|s| s.transient_failures.insert(block_num, count));
    }

    pub fn fatal_block(&self, block_num: u64, error: RpcError) {
        self.with(|s| s.fatal_blocks.insert(block_num, error));
    }

    pub fn block_reads(&self) -> Vec<u64> {
        self.with(|s| s.block_reads.clone())
    }

    pub fn set_push_result(&self, result: Result<TransactionReceipt, RpcError>) {
        self.with(|s| s.push_result = Some(result));
    }

    pub fn pushed(&self) -> Vec<SignedTransaction> {
        self.with(|s| s.pushed.clone())
    }

    pub fn add_account(&self, name: &str) {
        self.with(|s| s.accounts.insert(name.to_string()));
    }

    pub fn account_queries(&self) -> Vec<String> {
        self.with(|s| s.account_queries.clone())
    }

    pub fn set_table_rows(&self, rows: Vec<Value>) {
        self.with(|s| s.table_rows = rows);
    }

    pub fn table_queries(&self) -> Vec<TableRowsQuery> {
        self.with(|s| s.table_queries.clone())
    }

    pub fn set_key_accounts(&self, public_key: &str, accounts: &[&str]) {
        self.with(|s| {
            s.key_accounts.insert(
                public_key.to_string(),
                accounts.iter().map(|a| a.to_string()).collect(),
            )
        });
    }
}

pub fn receipt(transaction_id: &str, block_num: Option<u64>) -> TransactionReceipt {
    TransactionReceipt {
        transaction_id: transaction_id.to_string(),
        processed_block_num: block_num,
        processed: block_num.map(|n| json!({ "id": transaction_id, "block_num": n })),
    }
}

#[async_trait]
impl ChainRpc for MockChain {
    async fn get_info(&self) -> RpcResult<ChainInfo> {
        self.with(|s| {
            s.info_calls += 1;
            if s.fail_info {
                return Err(RpcError::transport("connection refused"));
            }
            Ok(ChainInfo {
                server_version: "mock".into(),
                chain_id: ChainId::from(CHAIN_ID),
                head_block_num: s.head,
                last_irreversible_block_num: s.head.saturating_sub(10),
                head_block_id: String::new(),
                head_block_time: "2024-01-01T00:00:00.000".into(),
            })
        })
    }

    async fn get_block(&self, block_num: u64) -> RpcResult<Block> {
        self.with(|s| {
            s.block_reads.push(block_num);
            if let Some(err) = s.fatal_blocks.get(&block_num) {
                return Err(err.clone());
            }
            if let Some(remaining) = s.transient_failures.get_mut(&block_num) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(unknown_block(block_num));
                }
            }
            if block_num > s.produced_up_to {
                return Err(unknown_block(block_num));
            }
            let transactions = s
                .transactions
                .get(&block_num)
                .map(|ids| {
                    ids.iter()
                        .map(|id| BlockTransaction {
                            status: "executed".into(),
                            trx: BlockTrx::Packed { id: id.clone() },
                        })
                        .collect()
                })
                .unwrap_or_default();
            Ok(Block {
                block_num,
                id: String::new(),
                timestamp: String::new(),
                ref_block_prefix: 0,
                transactions,
            })
        })
    }

    async fn get_block_header_state(&self, block_num: u64) -> RpcResult<BlockHeaderState> {
        Ok(BlockHeaderState {
            block_num,
            id: REF_BLOCK_ID.to_string(),
            header: BlockHeader {
                timestamp: "2024-01-01T00:00:00.500".into(),
            },
        })
    }

    async fn push_transaction(&self, transaction: &SignedTransaction) -> RpcResult<TransactionReceipt> {
        self.with(|s| {
            s.pushed.push(transaction.clone());
            s.push_result
                .clone()
                .unwrap_or_else(|| Ok(receipt("mocktx", None)))
        })
    }

    async fn get_account(&self, name: &str) -> RpcResult<Value> {
        self.with(|s| {
            s.account_queries.push(name.to_string());
            if s.accounts.contains(name) {
                Ok(json!({ "account_name": name }))
            } else {
                Err(node_error("unknown_key", "unknown key"))
            }
        })
    }

    async fn get_table_rows(&self, query: &TableRowsQuery) -> RpcResult<TableRows> {
        self.with(|s| {
            s.table_queries.push(query.clone());
            Ok(TableRows {
                rows: s.table_rows.clone(),
                more: Value::Bool(false),
            })
        })
    }

    async fn get_key_accounts(&self, public_key: &str) -> RpcResult<Vec<String>> {
        self.with(|s| Ok(s.key_accounts.get(public_key).cloned().unwrap_or_default()))
    }
}

/// Signer that "packs" the transaction as hex-encoded JSON.
#[derive(Default)]
pub struct FakeSigner {
    signed: Mutex<Vec<(UnsignedTransaction, ChainId)>>,
    fail: bool,
}

impl FakeSigner {
    pub fn failing() -> Self {
        Self {
            signed: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn signed(&self) -> Vec<(UnsignedTransaction, ChainId)> {
        self.signed.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionSigner for FakeSigner {
    async fn sign(
        &self,
        transaction: &UnsignedTransaction,
        chain_id: &ChainId,
    ) -> Result<SignedTransaction, SignerError> {
        if self.fail {
            return Err(SignerError::new("key not available"));
        }
        self.signed
            .lock()
            .unwrap()
            .push((transaction.clone(), chain_id.clone()));
        let packed = serde_json::to_vec(transaction).map_err(|e| SignerError::new(e.to_string()))?;
        Ok(SignedTransaction {
            signatures: vec!["SIG_K1_fake".into()],
            compression: 0,
            packed_context_free_data: String::new(),
            packed_trx: hex::encode(packed),
        })
    }
}

/// Metrics recorder that remembers which counters were touched, as
/// `name{label=value,...}`.
#[derive(Default)]
pub struct CapturingRecorder {
    counters: Mutex<Vec<String>>,
}

impl CapturingRecorder {
    pub fn counters(&self) -> Vec<String> {
        self.counters.lock().unwrap().clone()
    }
}

impl metrics::Recorder for CapturingRecorder {
    fn describe_counter(&self, _: metrics::KeyName, _: Option<metrics::Unit>, _: metrics::SharedString) {}

    fn describe_gauge(&self, _: metrics::KeyName, _: Option<metrics::Unit>, _: metrics::SharedString) {}

    fn describe_histogram(&self, _: metrics::KeyName, _: Option<metrics::Unit>, _: metrics::SharedString) {}

    fn register_counter(&self, key: &metrics::Key, _: &metrics::Metadata<'_>) -> metrics::Counter {
        let labels: Vec<String> = key
            .labels()
            .map(|label| format!("{}={}", label.key(), label.value()))
            .collect();
        self.counters
            .lock()
            .unwrap()
            .push(format!("{}{{{}}}", key.name(), labels.join(",")));
        metrics::Counter::noop()
    }

    fn register_gauge(&self, _: &metrics::Key, _: &metrics::Metadata<'_>) -> metrics::Gauge {
        metrics::Gauge::noop()
    }

    fn register_histogram(&self, _: &metrics::Key, _: &metrics::Metadata<'_>) -> metrics::Histogram {
        metrics::Histogram::noop()
    }
}
