use std::time::Duration;

use alloy::primitives::{Address, B256, Bytes, TxKind, U256};
use pilot_core::{
    account::Account,
    backoff::BackoffPolicy,
    chain::{Chain, verify_chain_id},
    classify::ErrorPatterns,
    error::ChainError,
    rpc_clients::ReceiptSummary,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    events::{EventSink, SubmissionEvent},
    gas::{GasConfig, GasPriceOracle},
    nonce::NonceTracker,
    pending::PendingReplacements,
};

mod confirm;
pub mod error;
mod replace;
mod send;
mod transaction;

pub use error::{ReplaceError, SubmitterError};
pub use replace::{ReplaceOutcome, replacement_gas_price};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitterConfig {
    /// Resubmissions allowed after a mempool-class failure.
    pub max_retries: u32,
    pub poll_interval_ms: u64,
    pub poll_attempts: u32,
    /// Added on top of the node's gas estimate.
    pub gas_buffer_percent: u64,
    /// Used when estimation fails and the request carries no default of its own.
    pub default_gas_limit: u64,
    /// Gas price sent with the estimation probe. Some nodes inflate
    /// estimates when probed at a high price.
    pub estimate_probe_gwei: f64,
    pub rotate_on_estimate_failure: bool,
    pub rotate_on_mempool_error: bool,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            poll_interval_ms: 3_000,
            poll_attempts: 50,
            gas_buffer_percent: 20,
            default_gas_limit: 100_000,
            estimate_probe_gwei: 1.0,
            rotate_on_estimate_failure: true,
            rotate_on_mempool_error: true,
        }
    }
}

impl SubmitterConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// The caller-supplied part of a transaction. Nonce, gas and price are
/// filled in fresh for every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub label: String,
    /// `None` deploys `data` as contract creation code.
    pub to: Option<Address>,
    pub data: Bytes,
    pub value: U256,
    /// Skips estimation entirely.
    pub gas_limit: Option<u64>,
    /// Used instead of the submitter default when estimation fails.
    pub default_gas_limit: Option<u64>,
    pub poll_attempts: Option<u32>,
}

impl CallRequest {
    pub fn call(label: impl Into<String>, to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            label: label.into(),
            to: Some(to),
            data: data.into(),
            value: U256::ZERO,
            gas_limit: None,
            default_gas_limit: None,
            poll_attempts: None,
        }
    }

    pub fn create(label: impl Into<String>, init_code: impl Into<Bytes>) -> Self {
        Self {
            label: label.into(),
            to: None,
            data: init_code.into(),
            value: U256::ZERO,
            gas_limit: None,
            default_gas_limit: None,
            poll_attempts: None,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_default_gas_limit(mut self, gas_limit: u64) -> Self {
        self.default_gas_limit = Some(gas_limit);
        self
    }

    pub fn with_poll_attempts(mut self, attempts: u32) -> Self {
        self.poll_attempts = Some(attempts);
        self
    }

    pub fn kind(&self) -> TxKind {
        TxKind::from(self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxOutcome {
    /// Mined with status 1.
    Confirmed {
        tx_hash: B256,
        receipt: ReceiptSummary,
    },
    /// Mined with status 0. Resubmitting the same inputs would revert again.
    Reverted {
        tx_hash: B256,
        receipt: ReceiptSummary,
    },
    /// Not mined within the polling window. May still land.
    Unconfirmed {
        tx_hash: B256,
        nonce: u64,
        gas_price: u128,
    },
}

impl TxOutcome {
    pub fn tx_hash(&self) -> B256 {
        match self {
            TxOutcome::Confirmed { tx_hash, .. }
            | TxOutcome::Reverted { tx_hash, .. }
            | TxOutcome::Unconfirmed { tx_hash, .. } => *tx_hash,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Confirmed { .. })
    }

    pub fn receipt(&self) -> Option<&ReceiptSummary> {
        match self {
            TxOutcome::Confirmed { receipt, .. } | TxOutcome::Reverted { receipt, .. } => {
                Some(receipt)
            }
            TxOutcome::Unconfirmed { .. } => None,
        }
    }
}

/// Drives one account's transactions against a chain: nonce bookkeeping,
/// gas pricing, signing, raw broadcast, receipt polling and mempool retries.
///
/// Submissions for one account must go through a single submitter, one at a
/// time. Nonce assignment and gas escalation are not safe under concurrent
/// use, which `&mut self` on every entry point enforces.
pub struct TransactionSubmitter<C: Chain> {
    chain: C,
    account: Account,
    nonces: NonceTracker,
    gas: GasPriceOracle,
    backoff: BackoffPolicy,
    patterns: ErrorPatterns,
    config: SubmitterConfig,
    pending: PendingReplacements,
    events: EventSink,
    /// Endpoint whose chain id last matched the configured one.
    verified_rpc: Option<String>,
}

impl<C: Chain> TransactionSubmitter<C> {
    pub fn new(
        chain: C,
        account: Account,
        config: SubmitterConfig,
        gas: GasConfig,
        backoff: BackoffPolicy,
        patterns: ErrorPatterns,
    ) -> Self {
        Self {
            chain,
            account,
            nonces: NonceTracker::new(),
            gas: GasPriceOracle::new(gas),
            backoff,
            patterns,
            config,
            pending: PendingReplacements::default(),
            events: EventSink::default(),
            verified_rpc: None,
        }
    }

    pub fn with_events(mut self, sender: mpsc::UnboundedSender<SubmissionEvent>) -> Self {
        self.events = EventSink::new(sender);
        self
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn address(&self) -> Address {
        self.account.address()
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    pub fn gas_oracle(&self) -> &GasPriceOracle {
        &self.gas
    }

    pub fn patterns(&self) -> &ErrorPatterns {
        &self.patterns
    }

    pub fn pending(&self) -> &PendingReplacements {
        &self.pending
    }

    /// Current gas price for a first attempt, as the submitter would use it.
    pub async fn gas_price(&self) -> u128 {
        self.gas.price(&self.chain, 0).await
    }

    /// Forces the next submission to re-read the nonce from the network.
    pub fn reset_nonce(&mut self) {
        self.nonces.reset(self.account.address());
    }

    /// Checks the current endpoint's chain id once per endpoint. Only a
    /// confirmed mismatch fails; if the node can't be asked, signing goes
    /// ahead with the configured id and the check is repeated next time.
    pub async fn ensure_chain_id(&mut self) -> Result<(), ChainError> {
        let rpc_url = self.chain.rpc_url().to_string();
        if self.verified_rpc.as_deref() == Some(rpc_url.as_str()) {
            return Ok(());
        }

        match verify_chain_id(&self.chain).await {
            Ok(chain_id) => {
                tracing::debug!(chain_id, %rpc_url, "endpoint chain id verified");
                self.verified_rpc = Some(rpc_url);
                Ok(())
            }
            Err(error @ ChainError::ChainIdMismatch { .. }) => {
                tracing::error!(error = %error, "endpoint serves a different chain");
                Err(error)
            }
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    chain_id = self.chain.chain_id(),
                    "could not read endpoint chain id, using configured one"
                );
                Ok(())
            }
        }
    }

    /// Rotates to the next endpoint. Nonces cached against the previous
    /// endpoint are dropped when the rotation took effect.
    pub fn rotate_rpc(&mut self) -> bool {
        let rotated = self.chain.rotate_rpc();
        if rotated {
            self.nonces.reset_all();
        }
        rotated
    }
}
