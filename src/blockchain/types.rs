//! Chain-specific types and error definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::blockchain::errors::ChainError;

// Re-export the confirmation settings from the config module to avoid duplication
pub use crate::config::schema::ConfirmationConfig;

/// Chain identifier (hex-encoded hash of the genesis state).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub String);

impl From<&str> for ChainId {
    fn from(id: &str) -> Self {
        Self(id.to_ascii_lowercase())
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authorization attached to an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: String,
    pub permission: String,
}

/// One unit of ledger intent. Never inspected by the lifecycle code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Contract account.
    pub account: String,
    /// Contract entry point.
    pub name: String,
    pub authorization: Vec<PermissionLevel>,
    pub data: Value,
}

/// Per-transaction submission parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Push to the node; when false the signed envelope is returned instead.
    pub broadcast: bool,
    /// Distance behind head of the TAPOS reference block.
    pub blocks_behind: u32,
    /// Validity window, counted from the reference block time.
    pub expire_seconds: u32,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            broadcast: true,
            blocks_behind: 3,
            expire_seconds: 30,
        }
    }
}

/// Subset of `get_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    #[serde(default)]
    pub server_version: String,
    pub chain_id: ChainId,
    pub head_block_num: u64,
    #[serde(default)]
    pub last_irreversible_block_num: u64,
    #[serde(default)]
    pub head_block_id: String,
    #[serde(default)]
    pub head_block_time: String,
}

/// Subset of `get_block`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub block_num: u64,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub ref_block_prefix: u64,
    #[serde(default)]
    pub transactions: Vec<BlockTransaction>,
}

impl Block {
    /// Whether a transaction with exactly this id is part of the block.
    pub fn has_transaction(&self, transaction_id: &str) -> bool {
        self.transactions
            .iter()
            .any(|tx| tx.trx.id() == transaction_id)
    }
}

/// A transaction receipt inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTransaction {
    #[serde(default)]
    pub status: String,
    pub trx: BlockTrx,
}

/// Blocks list deferred transactions by bare id and input transactions as objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTrx {
    Id(String),
    Packed { id: String },
}

impl BlockTrx {
    pub fn id(&self) -> &str {
        match self {
            BlockTrx::Id(id) => id,
            BlockTrx::Packed { id } => id,
        }
    }
}

/// Subset of `get_block_header_state`, used for TAPOS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderState {
    pub block_num: u64,
    pub id: String,
    pub header: BlockHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub timestamp: String,
}

/// Transaction body handed to the signer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub expiration: String,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub max_net_usage_words: u32,
    pub max_cpu_usage_ms: u8,
    pub delay_sec: u32,
    pub context_free_actions: Vec<Action>,
    pub actions: Vec<Action>,
    pub transaction_extensions: Vec<Value>,
}

/// Serialized and signed transaction, ready for `push_transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub signatures: Vec<String>,
    #[serde(default)]
    pub compression: u8,
    #[serde(default)]
    pub packed_context_free_data: String,
    pub packed_trx: String,
}

/// The node's acknowledgment of a pushed transaction.
///
/// `processed_block_num` is the block the node provisionally assigned; it is
/// not proof of inclusion, let alone finality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PushTransactionResponse")]
pub struct TransactionReceipt {
    pub transaction_id: String,
    pub processed_block_num: Option<u64>,
    /// Full action trace as returned by the node.
    pub processed: Option<Value>,
}

#[derive(Deserialize)]
struct PushTransactionResponse {
    transaction_id: String,
    #[serde(default)]
    processed: Option<Value>,
}

impl From<PushTransactionResponse> for TransactionReceipt {
    fn from(resp: PushTransactionResponse) -> Self {
        let processed_block_num = resp
            .processed
            .as_ref()
            .and_then(|p| p.get("block_num"))
            .and_then(Value::as_u64);
        Self {
            transaction_id: resp.transaction_id,
            processed_block_num,
            processed: resp.processed,
        }
    }
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Pushed to the node.
    Broadcast(TransactionReceipt),
    /// Signed but not pushed (`broadcast = false`).
    Signed(SignedTransaction),
}

impl SubmitOutcome {
    pub fn receipt(&self) -> Option<&TransactionReceipt> {
        match self {
            SubmitOutcome::Broadcast(receipt) => Some(receipt),
            SubmitOutcome::Signed(_) => None,
        }
    }
}

/// Raw error from the node or the transport in front of it.
///
/// `body` holds the decoded JSON error response when the node answered.
#[derive(Debug, Clone, Error)]
#[error("{name}: {message}")]
pub struct RpcError {
    pub name: String,
    pub message: String,
    pub body: Option<Value>,
}

impl RpcError {
    /// Connection-level failure; the node never answered.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            name: "TransportError".to_string(),
            message: message.into(),
            body: None,
        }
    }

    pub fn timeout(secs: u64) -> Self {
        Self {
            name: "TimeoutError".to_string(),
            message: format!("RPC timeout after {} seconds", secs),
            body: None,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            name: "DecodeError".to_string(),
            message: message.into(),
            body: None,
        }
    }

    /// Build from a non-2xx node response.
    ///
    /// Node error bodies look like
    /// `{"code":500,"error":{"name":"unknown_block_exception","what":"...","details":[{"message":"..."}]}}`.
    pub fn from_response(status: u16, body: Value) -> Self {
        let error = body.get("error");
        let name = error
            .and_then(|e| e.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("RpcError")
            .to_string();
        let message = error
            .and_then(|e| e.get("details"))
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str)
            .or_else(|| error.and_then(|e| e.get("what")).and_then(Value::as_str))
            .or_else(|| body.get("message").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP status {}", status));
        Self {
            name,
            message,
            body: Some(body),
        }
    }

    /// Whether the node itself answered, as opposed to a transport failure.
    pub fn is_node_error(&self) -> bool {
        self.body.is_some()
    }
}

/// Result type for raw RPC calls.
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors that can occur while building, signing or pushing a transaction.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Node or transport error.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The external signer refused or failed.
    #[error("Signer error: {0}")]
    Signer(String),

    /// The reference block could not be used for TAPOS.
    #[error("Invalid reference block {block_num}: {reason}")]
    InvalidReferenceBlock { block_num: u64, reason: String },
}

pub type SubmitResult<T> = Result<T, SubmitError>;

/// Terminal failures of a confirmation run.
#[derive(Debug, Error)]
pub enum ConfirmationError {
    /// Submission (or the pre-submission head read) failed; never retried.
    #[error("Transaction submission failed: {0}")]
    FailedSubmission(ChainError),

    /// The same block could not be read after the configured attempts.
    #[error("Failed to read block {block_num} after {attempts} attempts: {source}")]
    FailedBlockRead {
        block_num: u64,
        attempts: u32,
        source: ChainError,
    },

    /// A block read failed with a non-transient chain error.
    #[error("Block read failed at block {block_num}: {source}")]
    Chain { block_num: u64, source: ChainError },

    /// Inclusion could not be observed inside the window.
    #[error(
        "Transaction {transaction_id} not found in blocks {starting_block_num} to {last_block_num}. \
         This does not mean the transaction failed, only that it was not observed in a block before timeout"
    )]
    TimedOut {
        transaction_id: String,
        starting_block_num: u64,
        last_block_num: u64,
    },
}

impl ConfirmationError {
    /// Terminal status this error corresponds to.
    pub fn status(&self) -> ConfirmationStatus {
        match self {
            ConfirmationError::FailedSubmission(_) => ConfirmationStatus::FailedSubmission,
            ConfirmationError::FailedBlockRead { .. } | ConfirmationError::Chain { .. } => {
                ConfirmationStatus::FailedBlockRead
            }
            ConfirmationError::TimedOut { .. } => ConfirmationStatus::TimedOut,
        }
    }

    /// The classified chain error behind this failure, if any.
    pub fn chain_error(&self) -> Option<&ChainError> {
        match self {
            ConfirmationError::FailedSubmission(e) => Some(e),
            ConfirmationError::FailedBlockRead { source, .. } => Some(source),
            ConfirmationError::Chain { source, .. } => Some(source),
            ConfirmationError::TimedOut { .. } => None,
        }
    }
}

pub type ConfirmationResult<T> = Result<T, ConfirmationError>;

/// Confirmation run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmationStatus {
    /// Reading blocks.
    Polling,
    /// Transaction id observed in a block.
    Confirmed,
    FailedSubmission,
    FailedBlockRead,
    /// Window exhausted without observing the transaction.
    TimedOut,
}

impl ConfirmationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ConfirmationStatus::Polling)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfirmationStatus::Polling => "polling",
            ConfirmationStatus::Confirmed => "confirmed",
            ConfirmationStatus::FailedSubmission => "failed_submission",
            ConfirmationStatus::FailedBlockRead => "failed_block_read",
            ConfirmationStatus::TimedOut => "timed_out",
        }
    }
}

/// Errors from account name allocation.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid account name prefix '{0}': only a-z, 1-5 and '.' are allowed")]
    InvalidPrefix(String),

    /// Every candidate within the attempt bound already existed.
    #[error("No free account name found after {0} attempts")]
    NameSpaceExhausted(u32),
}

pub type AccountResult<T> = Result<T, AccountError>;

/// Errors from constructing a client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("Invalid node URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: ChainId, actual: ChainId },
}

pub type ClientResult<T> = Result<T, ClientError>;
