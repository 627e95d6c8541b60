//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::blockchain::types::TransactionOptions;

/// Root client configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Node endpoints.
    pub node: NodeConfig,

    /// Default submission parameters.
    pub transaction: TransactionConfig,

    /// Confirmation polling.
    pub confirmation: ConfirmationConfig,

    /// Account name generation.
    pub accounts: AccountConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Node connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// HTTP API base URL (e.g., "http://127.0.0.1:8888").
    pub http_endpoint: String,

    /// Failover API base URLs.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Expected chain id (hex). Checked on connect when set.
    pub chain_id: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            http_endpoint: "http://127.0.0.1:8888".to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 10,
            chain_id: None,
        }
    }
}

/// Default transaction parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Push transactions to the node (false returns the signed envelope).
    pub broadcast: bool,

    /// TAPOS reference block distance behind head.
    pub blocks_behind: u32,

    /// Transaction validity window in seconds.
    pub expire_seconds: u32,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            broadcast: true,
            blocks_behind: 3,
            expire_seconds: 30,
        }
    }
}

impl TransactionConfig {
    pub fn options(&self) -> TransactionOptions {
        TransactionOptions {
            broadcast: self.broadcast,
            blocks_behind: self.blocks_behind,
            expire_seconds: self.expire_seconds,
        }
    }
}

/// Confirmation polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Blocks after the starting block to search before giving up.
    pub blocks_to_check: u64,

    /// Time between block reads in milliseconds.
    pub check_interval_ms: u64,

    /// Failed reads of one block before giving up.
    pub max_block_read_attempts: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            blocks_to_check: 20,
            check_interval_ms: 400,
            max_block_read_attempts: 10,
        }
    }
}

impl ConfirmationConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms.max(1))
    }

    /// Upper bound on how long a run can poll.
    pub fn worst_case_duration(&self) -> Duration {
        let ticks = (self.blocks_to_check + 1)
            .saturating_mul(u64::from(self.max_block_read_attempts.max(1)));
        Duration::from_millis(ticks.saturating_mul(self.check_interval_ms.max(1)))
    }
}

/// Account name generation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Prefix for generated names (a-z, 1-5, '.').
    pub name_prefix: String,

    /// Candidates to try before giving up on collisions.
    pub max_generation_attempts: u32,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            name_prefix: String::new(),
            max_generation_attempts: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint (CLI only).
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
