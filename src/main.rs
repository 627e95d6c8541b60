//! Command-line access to the chain client.
//!
//! Read-only: node info, blocks, account name generation and error
//! classification. Submitting transactions needs a signer and is left to
//! library callers.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use chain_tx::blockchain::errors::{classify_message, CLASSIFICATION_TABLE};
use chain_tx::blockchain::{AccountNameAllocator, ChainInfoProvider, ChainRpc, HttpChainRpc};
use chain_tx::config::{load_config, ClientConfig};
use chain_tx::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "chain-tx")]
#[command(about = "Inspect a chain node and exercise the transaction client", long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults are used otherwise).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the node URL from the config.
    #[arg(short, long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show head block and chain id
    Info,
    /// Print a block and whether it contains a transaction
    Block {
        block_num: u64,
        #[arg(long)]
        transaction_id: Option<String>,
    },
    /// Generate an account name
    AccountName {
        #[arg(short, long)]
        prefix: Option<String>,
        /// Regenerate until no account holds the name
        #[arg(long)]
        check: bool,
    },
    /// Classify an error message
    Classify { message: String },
    /// List the error classification table in match order
    Taxonomy,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = cli.url {
        config.node.http_endpoint = url;
    }

    logging::init_logging(&config.observability);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.command {
        Commands::Info => {
            let rpc = Arc::new(HttpChainRpc::new(&config.node)?);
            let info = ChainInfoProvider::new(rpc).info().await?;
            print_json(&serde_json::to_value(info.as_ref())?)?;
        }
        Commands::Block {
            block_num,
            transaction_id,
        } => {
            let rpc = HttpChainRpc::new(&config.node)?;
            let block = rpc.get_block(block_num).await?;
            let mut out = json!({
                "block_num": block.block_num,
                "id": block.id,
                "timestamp": block.timestamp,
                "transactions": block.transactions.iter().map(|t| t.trx.id()).collect::<Vec<_>>(),
            });
            if let Some(id) = transaction_id {
                out["has_transaction"] = json!(block.has_transaction(&id));
            }
            print_json(&out)?;
        }
        Commands::AccountName { prefix, check } => {
            let rpc = Arc::new(HttpChainRpc::new(&config.node)?);
            let allocator = AccountNameAllocator::new(rpc, config.accounts.max_generation_attempts);
            let prefix = prefix.unwrap_or_else(|| config.accounts.name_prefix.clone());
            let name = allocator.generate(&prefix, check).await?;
            println!("{}", name);
        }
        Commands::Classify { message } => {
            let classified = classify_message(&message);
            println!("{}", classified.kind);
        }
        Commands::Taxonomy => {
            for (position, (kind, tokens)) in CLASSIFICATION_TABLE.iter().enumerate() {
                if tokens.is_empty() {
                    println!("{:>2}. {} (matches anything)", position + 1, kind);
                } else {
                    println!("{:>2}. {} ({})", position + 1, kind, tokens.join(" | "));
                }
            }
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
