use alloy::primitives::Address;
use pilot_core::{account::Account, backoff::BackoffPolicy, chain::RotatingChain, error::ChainError};
use pilot_executors::submitter::{CallRequest, TransactionSubmitter, TxOutcome};
use pilot_http::client::RetryingHttpClient;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    config::{BotConfig, DelayRange},
    steps::{self, StepError, StepKind},
};

#[derive(Debug, Clone, Serialize)]
pub struct FailedStep {
    pub step: StepKind,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WalletReport {
    pub completed: Vec<StepKind>,
    pub failed: Option<FailedStep>,
    /// Unconfirmed transactions re-broadcast with a higher gas price.
    pub replaced: usize,
}

impl WalletReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_none()
    }
}

/// Everything one wallet needs for its pass through the steps.
///
/// Owns the wallet's submitter (and with it the nonce cache and endpoint
/// rotation state); borrows the cycle's HTTP client.
pub struct WalletSession<'a> {
    index: usize,
    config: &'a BotConfig,
    submitter: TransactionSubmitter<RotatingChain>,
    http: &'a mut RetryingHttpClient,
    backoff: BackoffPolicy,
}

impl<'a> WalletSession<'a> {
    pub fn new(
        index: usize,
        config: &'a BotConfig,
        submitter: TransactionSubmitter<RotatingChain>,
        http: &'a mut RetryingHttpClient,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            index,
            config,
            submitter,
            http,
            backoff,
        }
    }

    /// Builds the account, chain and submitter from configuration.
    pub fn open(
        index: usize,
        private_key: &str,
        config: &'a BotConfig,
        http: &'a mut RetryingHttpClient,
    ) -> Result<Self, ChainError> {
        let account = Account::from_private_key(private_key)?;
        let chain = RotatingChain::new(&config.chain)?;
        let backoff = BackoffPolicy::new(&config.backoff);
        let submitter = TransactionSubmitter::new(
            chain,
            account,
            config.submitter.clone(),
            config.gas.clone(),
            backoff.clone(),
            config.error_patterns.clone(),
        );
        Ok(Self::new(index, config, submitter, http, backoff))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn config(&self) -> &'a BotConfig {
        self.config
    }

    pub fn address(&self) -> Address {
        self.submitter.address()
    }

    pub fn submitter(&self) -> &TransactionSubmitter<RotatingChain> {
        &self.submitter
    }

    pub fn submitter_mut(&mut self) -> &mut TransactionSubmitter<RotatingChain> {
        &mut self.submitter
    }

    pub fn http(&mut self) -> &mut RetryingHttpClient {
        self.http
    }

    /// Submits and insists on a successful receipt.
    pub async fn submit_confirmed(&mut self, request: &CallRequest) -> Result<TxOutcome, StepError> {
        let outcome = self.submitter.submit(request).await?;
        match outcome {
            TxOutcome::Confirmed { .. } => Ok(outcome),
            TxOutcome::Reverted { tx_hash, .. } => Err(StepError::Reverted {
                label: request.label.clone(),
                tx_hash,
            }),
            TxOutcome::Unconfirmed { tx_hash, .. } => Err(StepError::Unconfirmed {
                label: request.label.clone(),
                tx_hash,
            }),
        }
    }

    pub async fn pause(&self, range: DelayRange) {
        let delay = range.sample();
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "Pausing");
            tokio::time::sleep(delay).await;
        }
    }

    pub async fn backoff_sleep(&self, attempt: u32, error: &StepError) {
        let class = error.class(&self.config.error_patterns);
        let delay = self.backoff.delay(attempt, class);
        info!(delay_ms = delay.as_millis() as u64, ?class, "Waiting before retry");
        tokio::time::sleep(delay).await;
    }

    pub async fn run_step(&mut self, step: StepKind) -> Result<(), StepError> {
        match step {
            StepKind::Faucet => steps::faucet::run(self).await,
            StepKind::Deploy => steps::deploy::run(self).await,
            StepKind::Transfer => steps::transfer::run(self).await,
            StepKind::Storage => steps::storage::run(self).await,
            StepKind::TokenOperations => steps::tokens::run(self).await,
            StepKind::Mint => steps::mint::run(self).await,
        }
    }

    /// Up to `steps.max_retries` attempts, backing off between them.
    #[tracing::instrument(skip_all, fields(step = %step))]
    pub async fn run_step_with_retries(&mut self, step: StepKind) -> Result<(), StepError> {
        let attempts = self.config.steps.max_retries.max(1);
        let mut attempt = 0;

        loop {
            info!(attempt = attempt + 1, attempts, "Running step");
            match self.run_step(step).await {
                Ok(()) => {
                    info!("Step completed");
                    return Ok(());
                }
                Err(e) => {
                    attempt += 1;
                    warn!(attempt, attempts, error = %e, "Step attempt failed");
                    if attempt >= attempts {
                        return Err(e);
                    }
                    self.backoff_sleep(attempt - 1, &e).await;
                }
            }
        }
    }

    /// Runs every enabled step in order. The first step that fails all its
    /// attempts ends the wallet. Unconfirmed transactions are replaced at the end.
    pub async fn run(&mut self) -> WalletReport {
        let mut report = WalletReport::default();

        for step in StepKind::ALL {
            if !step.enabled(&self.config.steps) {
                debug!(step = %step, "Step disabled");
                continue;
            }

            match self.run_step_with_retries(step).await {
                Ok(()) => report.completed.push(step),
                Err(e) => {
                    error!(step = %step, error = %e, "Step failed, abandoning wallet");
                    report.failed = Some(FailedStep {
                        step,
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        report.replaced = self.replace_pending().await;
        report
    }

    /// Best-effort replacement of everything left unconfirmed. Returns how
    /// many replacements were accepted.
    pub async fn replace_pending(&mut self) -> usize {
        if self.submitter.pending().is_empty() {
            return 0;
        }

        let factor = self.config.steps.replacement_gas_factor;
        let results = self.submitter.replace_pending(factor).await;
        let replaced = results.iter().filter(|r| r.is_ok()).count();
        for result in results.iter().filter_map(|r| r.as_ref().err()) {
            warn!(error = %result, "Could not replace pending transaction");
        }
        info!(replaced, total = results.len(), "Processed pending replacements");
        replaced
    }
}
