//! Shared utilities for integration testing against a mock node.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use chain_tx::blockchain::signer::{SignerError, TransactionSigner};
use chain_tx::blockchain::types::{ChainId, SignedTransaction, UnsignedTransaction};
use chain_tx::config::ClientConfig;

pub const CHAIN_ID: &str = "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906";

/// Block id whose bytes 8..12 read `0x78563412` as a little-endian prefix.
pub const REF_BLOCK_ID: &str = "0000006457e6a1b3123456780000000000000000000000000000000000000000";

/// Start a mock node on an ephemeral port.
///
/// `handler` receives the request path and JSON body and returns the status
/// code and JSON response body. Each connection serves one request.
pub async fn start_mock_node<F>(handler: F) -> SocketAddr
where
    F: Fn(&str, Value) -> (u16, Value) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        serve_one(socket, handler.as_ref()).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn serve_one<F>(mut socket: TcpStream, handler: &F)
where
    F: Fn(&str, Value) -> (u16, Value),
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let end = buf.len().min(body_start + content_length);
    let body = serde_json::from_slice(&buf[body_start..end]).unwrap_or(Value::Null);

    let (status, response) = handler(&path, body);
    let status_text = match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        _ => "200 OK",
    };
    let payload = response.to_string();
    let response_str = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        payload.len(),
        payload
    );
    let _ = socket.write_all(response_str.as_bytes()).await;
    let _ = socket.shutdown().await;
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Config pointing at `addr` with fast polling.
pub fn test_config(addr: SocketAddr) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.node.http_endpoint = format!("http://{}", addr);
    config.node.rpc_timeout_secs = 2;
    config.confirmation.check_interval_ms = 10;
    config.confirmation.blocks_to_check = 5;
    config.confirmation.max_block_read_attempts = 3;
    config
}

pub fn info_response(head: u64) -> Value {
    json!({
        "server_version": "d1bc8d3",
        "chain_id": CHAIN_ID,
        "head_block_num": head,
        "last_irreversible_block_num": head.saturating_sub(300),
        "head_block_id": REF_BLOCK_ID,
        "head_block_time": "2024-01-01T00:00:00.500"
    })
}

pub fn header_state_response(block_num: u64) -> Value {
    json!({
        "block_num": block_num,
        "id": REF_BLOCK_ID,
        "header": { "timestamp": "2024-01-01T00:00:00.500" }
    })
}

pub fn block_response(block_num: u64, transaction_ids: &[&str]) -> Value {
    let transactions: Vec<Value> = transaction_ids
        .iter()
        .map(|id| json!({ "status": "executed", "trx": { "id": id } }))
        .collect();
    json!({
        "block_num": block_num,
        "id": REF_BLOCK_ID,
        "timestamp": "2024-01-01T00:00:00.500",
        "ref_block_prefix": 305419896u64,
        "transactions": transactions
    })
}

pub fn push_response(transaction_id: &str, block_num: u64) -> Value {
    json!({
        "transaction_id": transaction_id,
        "processed": { "id": transaction_id, "block_num": block_num, "action_traces": [] }
    })
}

/// Error body in the shape the node returns for failed requests.
pub fn node_error(name: &str, what: &str, detail: &str) -> Value {
    json!({
        "code": 500,
        "message": "Internal Service Error",
        "error": {
            "code": 3000000,
            "name": name,
            "what": what,
            "details": [{ "message": detail, "file": "", "line_number": 0, "method": "" }]
        }
    })
}

pub fn unknown_block(block_num: u64) -> Value {
    node_error(
        "unknown_block_exception",
        "Unknown block",
        &format!("Could not find block: {}", block_num),
    )
}

/// Signer that "signs" by hex-encoding the JSON transaction.
#[derive(Default)]
pub struct TestSigner;

#[async_trait]
impl TransactionSigner for TestSigner {
    async fn sign(
        &self,
        transaction: &UnsignedTransaction,
        _chain_id: &ChainId,
    ) -> Result<SignedTransaction, SignerError> {
        let packed = serde_json::to_vec(transaction).map_err(|e| SignerError::new(e.to_string()))?;
        Ok(SignedTransaction {
            signatures: vec!["SIG_K1_test".to_string()],
            compression: 0,
            packed_context_free_data: String::new(),
            packed_trx: hex::encode(packed),
        })
    }
}
