//! Account name generation.
//!
//! Account names are exactly 12 characters from `[a-z1-5.]`. Candidates are
//! the prefix, then the low-order digits of the current unix time in
//! milliseconds, then random digits, all in base 31 mapped onto the chain
//! alphabet. The space after the prefix is split between time and randomness,
//! so every candidate keeps at least one random character.

use rand::Rng;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{AccountError, AccountResult};

/// Fixed length of every account name.
pub const ACCOUNT_NAME_LENGTH: usize = 12;

/// Base 31 leaves out '.', which separates account scopes.
const BASE: u64 = 31;
const BASE31_DIGITS: &[u8; 31] = b"0123456789abcdefghijklmnopqrstu";
/// Most time digits kept; the lowest four wrap every ~15 minutes.
const MAX_TIME_DIGITS: usize = 4;

/// A validated account name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountName(String);

impl AccountName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for AccountName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_name_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '1'..='5' | '.')
}

/// Whether `name` is a full-length account name.
pub fn is_valid_account_name(name: &str) -> bool {
    name.len() == ACCOUNT_NAME_LENGTH && name.chars().all(is_name_char)
}

/// Map standard base-32 digits onto the chain alphabet (`0,6,7,8,9` → `v,w,x,y,z`).
///
/// Other characters pass through unchanged.
pub fn eos_base32(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '0' => 'v',
            '6' => 'w',
            '7' => 'x',
            '8' => 'y',
            '9' => 'z',
            other => other,
        })
        .collect()
}

fn to_base31(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE31_DIGITS[(n % BASE) as usize]);
        n /= BASE;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

/// Lowest `len` base-31 digits of the current time in milliseconds.
fn timestamp_component(len: usize) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let digits = to_base31(millis);
    let low = &digits[digits.len().saturating_sub(len)..];
    eos_base32(&format!("{:0>width$}", low, width = len))
}

fn random_digit<R: Rng>(rng: &mut R) -> char {
    char::from(BASE31_DIGITS[rng.gen_range(0..BASE31_DIGITS.len())])
}

fn random_component<R: Rng>(rng: &mut R, len: usize) -> String {
    let digits: String = (0..len).map(|_| random_digit(rng)).collect();
    eos_base32(&digits)
}

fn validate_prefix(prefix: &str) -> AccountResult<()> {
    if prefix.chars().all(is_name_char) {
        Ok(())
    } else {
        Err(AccountError::InvalidPrefix(prefix.to_string()))
    }
}

/// Build one candidate name without any chain lookup.
///
/// Prefixes longer than a name are cut to length.
pub fn generate_account_name_string(prefix: &str) -> AccountResult<AccountName> {
    validate_prefix(prefix)?;

    let mut name: String = prefix.chars().take(ACCOUNT_NAME_LENGTH).collect();
    let remaining = ACCOUNT_NAME_LENGTH - name.len();
    let time_digits = (remaining / 2).min(MAX_TIME_DIGITS);

    name.push_str(&timestamp_component(time_digits));
    let mut rng = rand::thread_rng();
    name.push_str(&random_component(&mut rng, remaining - time_digits));

    Ok(AccountName(name))
}

/// Generates account names that are free on chain.
pub struct AccountNameAllocator {
    rpc: Arc<dyn ChainRpc>,
    max_attempts: u32,
}

impl AccountNameAllocator {
    pub fn new(rpc: Arc<dyn ChainRpc>, max_attempts: u32) -> Self {
        Self {
            rpc,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Generate a name, optionally regenerating until no account holds it.
    ///
    /// Without `check_on_chain` no lookup is issued.
    pub async fn generate(&self, prefix: &str, check_on_chain: bool) -> AccountResult<AccountName> {
        if !check_on_chain {
            return generate_account_name_string(prefix);
        }

        for attempt in 1..=self.max_attempts {
            let candidate = generate_account_name_string(prefix)?;
            if !self.name_exists(candidate.as_str()).await {
                tracing::debug!(name = %candidate, attempt = attempt, "Account name allocated");
                return Ok(candidate);
            }
            tracing::debug!(name = %candidate, attempt = attempt, "Account name taken, regenerating");
        }

        tracing::warn!(prefix = prefix, attempts = self.max_attempts, "No free account name found");
        Err(AccountError::NameSpaceExhausted(self.max_attempts))
    }

    /// Whether an account with this name exists.
    ///
    /// Any lookup failure counts as "does not exist"; account creation is
    /// the final arbiter and fails with a classified error on collision.
    pub async fn name_exists(&self, name: &str) -> bool {
        match self.rpc.get_account(name).await {
            Ok(_) => true,
            Err(e) => {
                tracing::trace!(name = name, error = %e, "Account lookup failed");
                false
            }
        }
    }
}
