//! Classification of raw node errors into a closed taxonomy.
//!
//! Node error text is free-form and drifts between node versions, so
//! classification keys on stable tokens with a case-insensitive substring
//! search. The table is ordered: specific kinds first, the `Misc*` categories
//! after them, and the catch-all last. The first matching row wins.

use serde_json::Value;
use thiserror::Error;

use crate::blockchain::types::RpcError;

/// Classified chain error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainErrorKind {
    AccountCreationFailedAlreadyExists,
    /// Not all permissions or keys needed by the transaction were provided.
    AuthUnsatisfied,
    AuthMissing,
    /// The block has not been produced yet (or is unknown to the node).
    BlockDoesNotExist,
    /// CPU, NET or RAM limits.
    ResourceExceeded,
    PermissionAlreadyLinked,
    PermissionNotLinked,
    PermissionDeleteFailedInUse,
    MiscChainError,
    MiscBlockValidationError,
    MiscTransactionError,
    MiscActionValidationError,
    MiscContractError,
    MiscDatabaseError,
    MiscBlockProducerError,
    MiscWhitelistBlacklistError,
    MiscNodeError,
    UnknownError,
}

impl ChainErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChainErrorKind::AccountCreationFailedAlreadyExists => "AccountCreationFailedAlreadyExists",
            ChainErrorKind::AuthUnsatisfied => "AuthUnsatisfied",
            ChainErrorKind::AuthMissing => "AuthMissing",
            ChainErrorKind::BlockDoesNotExist => "BlockDoesNotExist",
            ChainErrorKind::ResourceExceeded => "ResourceExceeded",
            ChainErrorKind::PermissionAlreadyLinked => "PermissionAlreadyLinked",
            ChainErrorKind::PermissionNotLinked => "PermissionNotLinked",
            ChainErrorKind::PermissionDeleteFailedInUse => "PermissionDeleteFailedInUse",
            ChainErrorKind::MiscChainError => "MiscChainError",
            ChainErrorKind::MiscBlockValidationError => "MiscBlockValidationError",
            ChainErrorKind::MiscTransactionError => "MiscTransactionError",
            ChainErrorKind::MiscActionValidationError => "MiscActionValidationError",
            ChainErrorKind::MiscContractError => "MiscContractError",
            ChainErrorKind::MiscDatabaseError => "MiscDatabaseError",
            ChainErrorKind::MiscBlockProducerError => "MiscBlockProducerError",
            ChainErrorKind::MiscWhitelistBlacklistError => "MiscWhitelistBlacklistError",
            ChainErrorKind::MiscNodeError => "MiscNodeError",
            ChainErrorKind::UnknownError => "UnknownError",
        }
    }
}

impl std::fmt::Display for ChainErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered classification table. A row matches when any of its tokens occurs
/// in the search string; an empty token list matches everything.
pub const CLASSIFICATION_TABLE: &[(ChainErrorKind, &[&str])] = &[
    (
        ChainErrorKind::AccountCreationFailedAlreadyExists,
        &["account_name_exists_exception"],
    ),
    (ChainErrorKind::AuthUnsatisfied, &["unsatisfied_authorization"]),
    (ChainErrorKind::AuthMissing, &["missing_auth_exception"]),
    (ChainErrorKind::BlockDoesNotExist, &["unknown_block_exception"]),
    (ChainErrorKind::ResourceExceeded, &["_exceeded"]),
    (
        ChainErrorKind::PermissionAlreadyLinked,
        &["Attempting to update required authority, but new requirement is same as old"],
    ),
    (
        ChainErrorKind::PermissionNotLinked,
        &["Attempting to unlink authority, but no link found"],
    ),
    (
        ChainErrorKind::PermissionDeleteFailedInUse,
        &[
            "Cannot delete a linked authority. Unlink the authority first",
            "Cannot delete active authority",
            "Cannot delete owner authority",
        ],
    ),
    (ChainErrorKind::MiscChainError, &["chain_type_exception"]),
    (ChainErrorKind::MiscBlockValidationError, &["block_validate_exception"]),
    (ChainErrorKind::MiscTransactionError, &["transaction_exception"]),
    (ChainErrorKind::MiscActionValidationError, &["action_validate_exception"]),
    (ChainErrorKind::MiscContractError, &["contract_exception"]),
    (ChainErrorKind::MiscDatabaseError, &["database_exception"]),
    (ChainErrorKind::MiscBlockProducerError, &["producer_exception"]),
    (
        ChainErrorKind::MiscWhitelistBlacklistError,
        &["whitelist_blacklist_exception"],
    ),
    (
        ChainErrorKind::MiscNodeError,
        &[
            "misc_exception",
            "plugin_exception",
            "wallet_exception",
            "abi_exception",
            "reversible_blocks_exception",
            "block_log_exception",
            "contract_api_exception",
            "protocol_feature_exception",
            "mongo_db_exception",
        ],
    ),
    (ChainErrorKind::UnknownError, &[]),
];

/// A classified chain error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ChainError {
    pub kind: ChainErrorKind,
    pub message: String,
}

impl ChainError {
    pub fn new(kind: ChainErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Transient error expected near the chain tip.
    pub fn is_block_not_produced(&self) -> bool {
        self.kind == ChainErrorKind::BlockDoesNotExist
    }
}

impl From<&RpcError> for ChainError {
    fn from(err: &RpcError) -> Self {
        classify_rpc_error(err)
    }
}

impl From<RpcError> for ChainError {
    fn from(err: RpcError) -> Self {
        classify_rpc_error(&err)
    }
}

/// Find the kind for a search string. Always terminates on the catch-all row.
pub fn classify_str(search: &str) -> ChainErrorKind {
    let haystack = search.to_lowercase();
    CLASSIFICATION_TABLE
        .iter()
        .find(|(_, tokens)| {
            tokens.is_empty()
                || tokens
                    .iter()
                    .any(|token| haystack.contains(&token.to_lowercase()))
        })
        .map(|(kind, _)| *kind)
        .unwrap_or(ChainErrorKind::UnknownError)
}

/// Classify a free-form message; the message is kept as-is.
pub fn classify_message(message: &str) -> ChainError {
    ChainError::new(classify_str(message), message)
}

/// Classify a raw RPC error.
///
/// The search string covers the error name, its message and the full JSON
/// body. When a body is present it becomes the human message.
pub fn classify_rpc_error(err: &RpcError) -> ChainError {
    let (search, message) = match &err.body {
        Some(body) => {
            let body = body_to_string(body);
            (format!("{} {} {}", err.name, err.message, body), body)
        }
        None => {
            let text = format!("{} {}", err.name, err.message);
            (text.clone(), text)
        }
    };
    ChainError::new(classify_str(&search), message)
}

fn body_to_string(body: &Value) -> String {
    serde_json::to_string(body).unwrap_or_else(|_| body.to_string())
}
