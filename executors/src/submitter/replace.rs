use alloy::{consensus::TxLegacy, primitives::B256};
use pilot_core::{chain::Chain, error::AlloyRpcErrorToChainError};
use serde::{Deserialize, Serialize};

use crate::{
    events::SubmissionEvent,
    submitter::{ReplaceError, TransactionSubmitter},
};

/// Minimum bump most mempools require before accepting a replacement.
const MIN_REPLACEMENT_BUMP_PERCENT: u128 = 110;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceOutcome {
    pub old_tx_hash: B256,
    pub new_tx_hash: B256,
    pub gas_price: u128,
}

/// `max(original * factor, original * 1.1)`, and always strictly above
/// `original`.
pub fn replacement_gas_price(original: u128, increase_factor: f64) -> u128 {
    let factor_percent = (increase_factor.max(0.0) * 100.0).round() as u128;
    let by_factor = original.saturating_mul(factor_percent) / 100;
    let floor = original.saturating_mul(MIN_REPLACEMENT_BUMP_PERCENT) / 100;

    by_factor.max(floor).max(original.saturating_add(1))
}

impl<C: Chain> TransactionSubmitter<C> {
    /// Resubmits a pending transaction of this account with the same nonce,
    /// target and calldata at a higher gas price. Success means the node
    /// accepted the replacement for broadcast, not that it was mined.
    pub async fn replace(
        &mut self,
        tx_hash: B256,
        increase_factor: f64,
    ) -> Result<ReplaceOutcome, ReplaceError> {
        let account = self.account.address();

        let original = self
            .chain
            .rpc()
            .transaction_by_hash(tx_hash)
            .await
            .map_err(|e| {
                let inner_error = e.to_chain_error(&self.chain);
                ReplaceError::RpcError {
                    message: inner_error.to_string(),
                    inner_error,
                }
            })?
            .ok_or(ReplaceError::NotFound { tx_hash })?;

        if original.from != account {
            return Err(ReplaceError::NotOwned {
                tx_hash,
                from: original.from,
                account,
            });
        }

        if let Some(block_number) = original.block_number {
            return Err(ReplaceError::AlreadyConfirmed {
                tx_hash,
                block_number,
            });
        }

        if let Ok(Some(receipt)) = self.chain.rpc().transaction_receipt(tx_hash).await {
            if let Some(block_number) = receipt.block_number {
                return Err(ReplaceError::AlreadyConfirmed {
                    tx_hash,
                    block_number,
                });
            }
        }

        let original_price = original
            .gas_price
            .ok_or(ReplaceError::MissingGasPrice { tx_hash })?;
        let gas_price = replacement_gas_price(original_price, increase_factor);

        self.ensure_chain_id()
            .await
            .map_err(|inner_error| ReplaceError::WrongChain { inner_error })?;

        let signed = self
            .account
            .sign_legacy(TxLegacy {
                chain_id: Some(self.chain.chain_id()),
                nonce: original.nonce,
                gas_price,
                gas_limit: original.gas,
                to: original.to.into(),
                value: original.value,
                input: original.input,
            })
            .map_err(|e| ReplaceError::SigningError {
                message: e.to_string(),
                inner_error: e,
            })?;

        let new_tx_hash =
            self.broadcast(&signed)
                .await
                .map_err(|inner_error| ReplaceError::TransactionSendError {
                    message: inner_error.message().to_string(),
                    inner_error,
                })?;

        self.pending.remove(tx_hash);

        tracing::info!(
            old_tx_hash = %tx_hash,
            %new_tx_hash,
            nonce = original.nonce,
            original_gas_price = original_price,
            gas_price,
            "replacement transaction sent"
        );

        self.events.emit(SubmissionEvent::Replaced {
            old_tx_hash: tx_hash,
            new_tx_hash,
            gas_price,
        });

        Ok(ReplaceOutcome {
            old_tx_hash: tx_hash,
            new_tx_hash,
            gas_price,
        })
    }

    /// Best-effort replacement of every recorded unconfirmed transaction.
    /// The pending set is empty afterwards whatever the individual results.
    pub async fn replace_pending(
        &mut self,
        increase_factor: f64,
    ) -> Vec<Result<ReplaceOutcome, ReplaceError>> {
        let records = self.pending.take_all();
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let result = self.replace(record.tx_hash, increase_factor).await;
            match &result {
                Ok(outcome) => {
                    tracing::info!(
                        old_tx_hash = %outcome.old_tx_hash,
                        new_tx_hash = %outcome.new_tx_hash,
                        "replaced stuck transaction"
                    );
                }
                Err(ReplaceError::AlreadyConfirmed { tx_hash, .. }) => {
                    tracing::info!(%tx_hash, "stuck transaction landed in the meantime");
                }
                Err(e) => {
                    tracing::warn!(tx_hash = %record.tx_hash, nonce = record.nonce, error = %e, "failed to replace stuck transaction");
                }
            }
            results.push(result);
        }

        results
    }
}
