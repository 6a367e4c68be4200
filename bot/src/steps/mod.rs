use std::fmt;

use alloy::primitives::B256;
use pilot_core::{
    classify::{ErrorClass, ErrorPatterns},
    error::ChainError,
};
use pilot_executors::submitter::{CallRequest, SubmitterError};
use pilot_http::faucet::FaucetError;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::{config::StepsConfig, session::WalletSession};

pub mod deploy;
pub mod faucet;
pub mod mint;
pub mod storage;
pub mod tokens;
pub mod transfer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Faucet,
    Deploy,
    Transfer,
    Storage,
    TokenOperations,
    Mint,
}

impl StepKind {
    /// Execution order within a wallet.
    pub const ALL: [StepKind; 6] = [
        StepKind::Faucet,
        StepKind::Deploy,
        StepKind::Transfer,
        StepKind::Storage,
        StepKind::TokenOperations,
        StepKind::Mint,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Faucet => "faucet",
            StepKind::Deploy => "deploy",
            StepKind::Transfer => "transfer",
            StepKind::Storage => "storage",
            StepKind::TokenOperations => "token_operations",
            StepKind::Mint => "mint",
        }
    }

    pub fn enabled(&self, steps: &StepsConfig) -> bool {
        match self {
            StepKind::Faucet => steps.faucet.enabled,
            StepKind::Deploy => steps.deploy.enabled,
            StepKind::Transfer => steps.transfer.enabled,
            StepKind::Storage => steps.storage.enabled,
            StepKind::TokenOperations => steps.tokens.enabled(),
            StepKind::Mint => steps.mint.enabled(),
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Faucet(#[from] FaucetError),

    #[error(transparent)]
    Submit(#[from] SubmitterError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("{label} reverted in transaction {tx_hash}")]
    Reverted { label: String, tx_hash: B256 },

    #[error("{label} not confirmed in time, transaction {tx_hash} may still land")]
    Unconfirmed { label: String, tx_hash: B256 },

    #[error("Unexpected response for {label}: {message}")]
    InvalidResponse { label: String, message: String },

    #[error("Unknown token {symbol}")]
    UnknownToken { symbol: String },
}

impl StepError {
    /// Drives the backoff multiplier between step attempts.
    pub fn class(&self, patterns: &ErrorPatterns) -> ErrorClass {
        match self {
            StepError::Submit(e) => e.class(),
            StepError::Chain(e) => e.classify(patterns),
            StepError::Faucet(_) | StepError::Unconfirmed { .. } => ErrorClass::Transient,
            StepError::Reverted { .. }
            | StepError::InvalidResponse { .. }
            | StepError::UnknownToken { .. } => ErrorClass::Fatal,
        }
    }
}

/// Submits `request` up to `attempts` times with backoff in between.
/// Failures are logged, not returned: one bad item doesn't fail the step.
pub(crate) async fn submit_item(
    session: &mut WalletSession<'_>,
    request: &CallRequest,
    attempts: u32,
) -> bool {
    let attempts = attempts.max(1);
    for attempt in 0..attempts {
        match session.submit_confirmed(request).await {
            Ok(_) => return true,
            Err(e) => {
                warn!(
                    label = %request.label,
                    attempt = attempt + 1,
                    attempts,
                    error = %e,
                    "Transaction failed"
                );
                if attempt + 1 < attempts {
                    session.backoff_sleep(attempt, &e).await;
                }
            }
        }
    }
    false
}
