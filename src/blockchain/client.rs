//! HTTP node client with timeout and failover handling.
//!
//! # Responsibilities
//! - POST to `{endpoint}/v1/<api>/<method>` with a JSON body
//! - Decode node error bodies into `RpcError`
//! - Fail over to the next endpoint on transport errors and timeouts
//! - Never resend a pushed transaction once any node has received it

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use url::Url;

use crate::blockchain::rpc::{ChainRpc, TableRows, TableRowsQuery};
use crate::blockchain::types::{
    Block, BlockHeaderState, ChainInfo, ClientError, ClientResult, RpcError, RpcResult,
    SignedTransaction, TransactionReceipt,
};
use crate::config::NodeConfig;
use crate::observability::metrics;

/// How a call may be spread across endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failover {
    /// Reads: any transport failure moves on to the next endpoint.
    AnyTransportError,
    /// Writes: only move on when the request could not be delivered at all.
    ConnectErrorOnly,
}

/// Node RPC client over HTTP with failover support.
#[derive(Clone)]
pub struct HttpChainRpc {
    /// Primary endpoint first, then failovers.
    endpoints: Vec<Url>,
    http: reqwest::Client,
    timeout_duration: Duration,
}

impl HttpChainRpc {
    /// Create a new client.
    ///
    /// An invalid primary URL is an error; invalid failover URLs are skipped.
    pub fn new(config: &NodeConfig) -> ClientResult<Self> {
        let mut endpoints = Vec::new();

        let primary = parse_endpoint(&config.http_endpoint).map_err(|reason| {
            ClientError::InvalidUrl {
                url: config.http_endpoint.clone(),
                reason,
            }
        })?;
        endpoints.push(primary);

        for url_str in &config.failover_urls {
            match parse_endpoint(url_str) {
                Ok(url) => endpoints.push(url),
                Err(reason) => {
                    tracing::warn!(url = %url_str, reason = %reason, "Ignoring invalid failover node URL")
                }
            }
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RpcError::transport(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(
            http_endpoint = %config.http_endpoint,
            failovers = endpoints.len() - 1,
            timeout_secs = config.rpc_timeout_secs,
            "Node client initialized"
        );

        Ok(Self {
            endpoints,
            http,
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
        })
    }

    /// Configured endpoints, primary first.
    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        failover: Failover,
    ) -> RpcResult<T> {
        let started = Instant::now();
        let mut last_error = RpcError::transport("No node endpoints configured");

        for (i, endpoint) in self.endpoints.iter().enumerate() {
            let url = match endpoint.join(path) {
                Ok(url) => url,
                Err(e) => {
                    last_error = RpcError::transport(format!("Invalid request URL: {}", e));
                    continue;
                }
            };

            match timeout(self.timeout_duration, self.post(url, body)).await {
                Ok(Ok(result)) => {
                    metrics::record_rpc_request(path, "ok", started.elapsed());
                    return decode(result);
                }
                Ok(Err(CallError::Node(err))) => {
                    // The node answered; another node would answer the same
                    metrics::record_rpc_request(path, "node_error", started.elapsed());
                    return Err(err);
                }
                Ok(Err(CallError::Transport { error, connect })) => {
                    tracing::warn!(provider_idx = i, path = path, error = %error, "RPC error, trying next provider");
                    last_error = error;
                    if failover == Failover::ConnectErrorOnly && !connect {
                        break;
                    }
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, path = path, "RPC timeout, trying next provider");
                    last_error = RpcError::timeout(self.timeout_duration.as_secs());
                    if failover == Failover::ConnectErrorOnly {
                        break;
                    }
                }
            }
        }

        metrics::record_rpc_request(path, "transport_error", started.elapsed());
        Err(last_error)
    }

    async fn post(&self, url: Url, body: &Value) -> Result<Value, CallError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| CallError::Transport {
                connect: e.is_connect(),
                error: RpcError::transport(e.to_string()),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| CallError::Transport {
            connect: false,
            error: RpcError::transport(e.to_string()),
        })?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(CallError::Node(RpcError::from_response(status.as_u16(), body)));
        }

        serde_json::from_str(&text).map_err(|e| {
            CallError::Node(RpcError::decode(format!("Invalid JSON response: {}", e)))
        })
    }
}

enum CallError {
    Node(RpcError),
    Transport { error: RpcError, connect: bool },
}

fn decode<T: DeserializeOwned>(value: Value) -> RpcResult<T> {
    serde_json::from_value(value).map_err(|e| RpcError::decode(e.to_string()))
}

/// Endpoints are joined with relative paths, so they need a trailing slash.
fn parse_endpoint(raw: &str) -> Result<Url, String> {
    let mut url: Url = raw.parse().map_err(|e: url::ParseError| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("URL cannot be used as a base".to_string());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl ChainRpc for HttpChainRpc {
    async fn get_info(&self) -> RpcResult<ChainInfo> {
        self.call("v1/chain/get_info", &json!({}), Failover::AnyTransportError)
            .await
    }

    async fn get_block(&self, block_num: u64) -> RpcResult<Block> {
        self.call(
            "v1/chain/get_block",
            &json!({ "block_num_or_id": block_num }),
            Failover::AnyTransportError,
        )
        .await
    }

    async fn get_block_header_state(&self, block_num: u64) -> RpcResult<BlockHeaderState> {
        self.call(
            "v1/chain/get_block_header_state",
            &json!({ "block_num_or_id": block_num }),
            Failover::AnyTransportError,
        )
        .await
    }

    async fn push_transaction(&self, transaction: &SignedTransaction) -> RpcResult<TransactionReceipt> {
        let body = serde_json::to_value(transaction).map_err(|e| RpcError::decode(e.to_string()))?;
        self.call("v1/chain/push_transaction", &body, Failover::ConnectErrorOnly)
            .await
    }

    async fn get_account(&self, name: &str) -> RpcResult<Value> {
        self.call(
            "v1/chain/get_account",
            &json!({ "account_name": name }),
            Failover::AnyTransportError,
        )
        .await
    }

    async fn get_table_rows(&self, query: &TableRowsQuery) -> RpcResult<TableRows> {
        self.call(
            "v1/chain/get_table_rows",
            &query.to_request(),
            Failover::AnyTransportError,
        )
        .await
    }

    async fn get_key_accounts(&self, public_key: &str) -> RpcResult<Vec<String>> {
        #[derive(serde::Deserialize)]
        struct KeyAccounts {
            #[serde(default)]
            account_names: Vec<String>,
        }

        let accounts: KeyAccounts = self
            .call(
                "v1/history/get_key_accounts",
                &json!({ "public_key": public_key }),
                Failover::AnyTransportError,
            )
            .await?;
        Ok(accounts.account_names)
    }
}

impl std::fmt::Debug for HttpChainRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChainRpc")
            .field("endpoints", &self.endpoints)
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
