//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts, intervals and attempt counts > 0)
//! - Check URLs and the account name prefix alphabet
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::blockchain::accounts::ACCOUNT_NAME_LENGTH;
use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn check_url(field: &'static str, raw: &str, errors: &mut Vec<ValidationError>) {
    match raw.parse::<url::Url>() {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}' in '{}'", url.scheme(), raw),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", raw, e))),
    }
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url("node.http_endpoint", &config.node.http_endpoint, &mut errors);
    for url in &config.node.failover_urls {
        check_url("node.failover_urls", url, &mut errors);
    }
    if config.node.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("node.rpc_timeout_secs", "must be greater than 0"));
    }
    if let Some(chain_id) = &config.node.chain_id {
        if chain_id.is_empty() || !chain_id.chars().all(|c| c.is_ascii_hexdigit()) {
            errors.push(ValidationError::new("node.chain_id", "must be a hex string"));
        }
    }

    if config.transaction.expire_seconds == 0 {
        errors.push(ValidationError::new("transaction.expire_seconds", "must be greater than 0"));
    }

    if config.confirmation.check_interval_ms == 0 {
        errors.push(ValidationError::new("confirmation.check_interval_ms", "must be greater than 0"));
    }
    if config.confirmation.max_block_read_attempts == 0 {
        errors.push(ValidationError::new(
            "confirmation.max_block_read_attempts",
            "must be greater than 0",
        ));
    }

    let prefix = &config.accounts.name_prefix;
    if !prefix
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '1'..='5' | '.'))
    {
        errors.push(ValidationError::new(
            "accounts.name_prefix",
            "only a-z, 1-5 and '.' are allowed",
        ));
    }
    if prefix.len() >= ACCOUNT_NAME_LENGTH {
        errors.push(ValidationError::new(
            "accounts.name_prefix",
            format!("must be shorter than {} characters", ACCOUNT_NAME_LENGTH),
        ));
    }
    if config.accounts.max_generation_attempts == 0 {
        errors.push(ValidationError::new(
            "accounts.max_generation_attempts",
            "must be greater than 0",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
