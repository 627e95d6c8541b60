//! Inclusion tracking for submitted transactions.
//!
//! # State Transitions
//! ```text
//! Init → Submitting → FailedSubmission
//!                   → Polling → Confirmed        (id found in a block)
//!                             → FailedBlockRead  (block never produced, or fatal read error)
//!                             → TimedOut         (window exhausted)
//! ```
//!
//! # Design Decisions
//! - The starting block is anchored before submission: the receipt's block
//!   minus one, else the head read BEFORE pushing. A head read after pushing
//!   can already be past the block holding the transaction.
//! - One interval per run, owned by the polling scope and dropped on every exit
//! - Reads are sequential; a slow read delays the next tick instead of overlapping it
//! - Inclusion is not finality

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval_at, Instant as TokioInstant, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::errors::{classify_message, classify_rpc_error, ChainError};
use crate::blockchain::info::ChainInfoProvider;
use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::transaction::ActionSubmitter;
use crate::blockchain::types::{
    Action, Block, ConfirmationConfig, ConfirmationError, ConfirmationResult, ConfirmationStatus,
    SubmitError, SubmitOutcome, TransactionOptions, TransactionReceipt,
};
use crate::observability::metrics;

/// What a single block read did to the run.
#[derive(Debug)]
pub enum Transition {
    /// Keep polling (same block after a transient failure, or the next one).
    Continue,
    Confirmed,
    Rejected(ConfirmationError),
}

/// Per-run polling state.
#[derive(Debug, Clone)]
pub struct ConfirmationState {
    transaction_id: String,
    starting_block_num: u64,
    current_block_num: u64,
    blocks_to_check: u64,
    check_interval: Duration,
    max_block_read_attempts: u32,
    block_read_attempt: u32,
    status: ConfirmationStatus,
}

impl ConfirmationState {
    pub fn new(
        transaction_id: impl Into<String>,
        starting_block_num: u64,
        config: &ConfirmationConfig,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            starting_block_num,
            current_block_num: starting_block_num,
            blocks_to_check: config.blocks_to_check,
            check_interval: config.check_interval(),
            max_block_read_attempts: config.max_block_read_attempts.max(1),
            block_read_attempt: 0,
            status: ConfirmationStatus::Polling,
        }
    }

    pub fn status(&self) -> ConfirmationStatus {
        self.status
    }

    pub fn starting_block_num(&self) -> u64 {
        self.starting_block_num
    }

    /// Time between block reads.
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Block number the next read targets.
    pub fn current_block_num(&self) -> u64 {
        self.current_block_num
    }

    /// Consecutive failed reads of the current block.
    pub fn block_read_attempt(&self) -> u32 {
        self.block_read_attempt
    }

    fn last_block_num(&self) -> u64 {
        self.starting_block_num.saturating_add(self.blocks_to_check)
    }

    /// Apply the outcome of reading `current_block_num`.
    ///
    /// Once terminal, further calls are ignored and return `Continue`.
    pub fn apply(&mut self, read: Result<Block, ChainError>) -> Transition {
        if self.status.is_terminal() {
            return Transition::Continue;
        }

        match read {
            Ok(block) if block.has_transaction(&self.transaction_id) => {
                self.status = ConfirmationStatus::Confirmed;
                return Transition::Confirmed;
            }
            Ok(_) => {
                self.block_read_attempt = 0;
                self.current_block_num += 1;
            }
            Err(err) if err.is_block_not_produced() => {
                self.block_read_attempt += 1;
                if self.block_read_attempt >= self.max_block_read_attempts {
                    self.status = ConfirmationStatus::FailedBlockRead;
                    return Transition::Rejected(ConfirmationError::FailedBlockRead {
                        block_num: self.current_block_num,
                        attempts: self.block_read_attempt,
                        source: err,
                    });
                }
            }
            Err(err) => {
                self.status = ConfirmationStatus::FailedBlockRead;
                return Transition::Rejected(ConfirmationError::Chain {
                    block_num: self.current_block_num,
                    source: err,
                });
            }
        }

        if self.current_block_num > self.last_block_num() {
            self.status = ConfirmationStatus::TimedOut;
            return Transition::Rejected(ConfirmationError::TimedOut {
                transaction_id: self.transaction_id.clone(),
                starting_block_num: self.starting_block_num,
                last_block_num: self.last_block_num(),
            });
        }

        Transition::Continue
    }
}

/// First block to check for a receipt.
///
/// Prefers the block before the one the node reported; otherwise the head
/// block number read before submission.
pub fn starting_block(receipt: &TransactionReceipt, pre_submission_head: u64) -> u64 {
    match receipt.processed_block_num {
        Some(block_num) => block_num.saturating_sub(1),
        None => pre_submission_head,
    }
}

/// Submits transactions and waits for them to show up in a block.
pub struct ConfirmationPoller {
    rpc: Arc<dyn ChainRpc>,
    info: Arc<ChainInfoProvider>,
    submitter: Arc<ActionSubmitter>,
    config: ConfirmationConfig,
}

impl ConfirmationPoller {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        info: Arc<ChainInfoProvider>,
        submitter: Arc<ActionSubmitter>,
        config: ConfirmationConfig,
    ) -> Self {
        Self {
            rpc,
            info,
            submitter,
            config,
        }
    }

    pub fn config(&self) -> &ConfirmationConfig {
        &self.config
    }

    /// Submit actions and, when `confirm` is set, wait for inclusion.
    ///
    /// Without `confirm`, or with `broadcast = false`, the outcome is returned
    /// right after submission and no block is read.
    pub async fn transact(
        &self,
        actions: &[Action],
        options: &TransactionOptions,
        confirm: bool,
    ) -> ConfirmationResult<SubmitOutcome> {
        if !confirm || !options.broadcast {
            return self
                .submitter
                .submit(actions, options)
                .await
                .map_err(|e| failed_submission(&e));
        }

        let pre_submission_head = self
            .info
            .head_block_number()
            .await
            .map_err(|e| rejected_run(failed_submission(&SubmitError::from(e))))?;

        let outcome = self
            .submitter
            .submit(actions, options)
            .await
            .map_err(|e| rejected_run(failed_submission(&e)))?;

        match outcome {
            SubmitOutcome::Broadcast(receipt) => {
                let start = starting_block(&receipt, pre_submission_head);
                let receipt = self.wait_for_inclusion(receipt, start).await?;
                Ok(SubmitOutcome::Broadcast(receipt))
            }
            signed @ SubmitOutcome::Signed(_) => Ok(signed),
        }
    }

    /// Submit actions and wait for inclusion.
    pub async fn await_transaction(
        &self,
        actions: &[Action],
        options: &TransactionOptions,
    ) -> ConfirmationResult<SubmitOutcome> {
        self.transact(actions, options, true).await
    }

    /// Poll blocks from `starting_block_num` until the receipt's transaction is seen.
    pub async fn wait_for_inclusion(
        &self,
        receipt: TransactionReceipt,
        starting_block_num: u64,
    ) -> ConfirmationResult<TransactionReceipt> {
        let span = tracing::info_span!(
            "confirmation",
            run_id = %Uuid::new_v4(),
            transaction_id = %receipt.transaction_id,
            starting_block_num = starting_block_num,
        );
        self.poll(receipt, starting_block_num).instrument(span).await
    }

    async fn poll(
        &self,
        receipt: TransactionReceipt,
        starting_block_num: u64,
    ) -> ConfirmationResult<TransactionReceipt> {
        let started = Instant::now();
        let mut state =
            ConfirmationState::new(receipt.transaction_id.clone(), starting_block_num, &self.config);

        let period = state.check_interval();
        let mut ticker = interval_at(TokioInstant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let block_num = state.current_block_num();
            let read = self
                .rpc
                .get_block(block_num)
                .await
                .map_err(|e| classify_rpc_error(&e));
            metrics::record_block_read(match &read {
                Ok(_) => "ok",
                Err(e) if e.is_block_not_produced() => "not_produced",
                Err(_) => "error",
            });

            match state.apply(read) {
                Transition::Continue => {
                    tracing::debug!(
                        block_num = block_num,
                        next_block_num = state.current_block_num(),
                        attempt = state.block_read_attempt(),
                        "Transaction not yet observed"
                    );
                }
                Transition::Confirmed => {
                    tracing::info!(block_num = block_num, "Transaction observed in block");
                    metrics::record_confirmation(state.status(), started.elapsed());
                    return Ok(receipt);
                }
                Transition::Rejected(err) => {
                    tracing::warn!(error = %err, status = state.status().as_str(), "Confirmation stopped");
                    metrics::record_confirmation(state.status(), started.elapsed());
                    return Err(err);
                }
            }
        }
    }
}

fn failed_submission(err: &SubmitError) -> ConfirmationError {
    let classified = match err {
        SubmitError::Rpc(rpc) => classify_rpc_error(rpc),
        other => classify_message(&other.to_string()),
    };
    ConfirmationError::FailedSubmission(classified)
}

/// Count a confirmation run that ended before polling started.
fn rejected_run(err: ConfirmationError) -> ConfirmationError {
    metrics::record_confirmation(err.status(), Duration::ZERO);
    err
}
