use alloy::primitives::B256;
use pilot_core::chain::Chain;

use crate::{
    events::SubmissionEvent,
    pending::PendingReplacement,
    submitter::{TransactionSubmitter, TxOutcome},
};

impl<C: Chain> TransactionSubmitter<C> {
    /// Polls for a mined receipt exactly `max_attempts` times, sleeping the
    /// poll interval between attempts. Receipt lookup failures count as
    /// "not yet". Running out of attempts records the transaction for
    /// replacement.
    pub(super) async fn wait_for_receipt(
        &mut self,
        label: &str,
        tx_hash: B256,
        nonce: u64,
        gas_price: u128,
        max_attempts: u32,
    ) -> TxOutcome {
        let interval = self.config.poll_interval();

        for attempt in 1..=max_attempts {
            match self.chain.rpc().transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) if receipt.is_mined() => {
                    let block_number = receipt.block_number.unwrap_or_default();
                    let success = receipt.is_success();

                    self.events.emit(SubmissionEvent::Confirmed {
                        label: label.to_string(),
                        tx_hash,
                        block_number,
                        success,
                    });

                    if success {
                        tracing::info!(%tx_hash, block_number, attempt, "transaction confirmed");
                        return TxOutcome::Confirmed { tx_hash, receipt };
                    }

                    tracing::error!(%tx_hash, block_number, "transaction reverted");
                    return TxOutcome::Reverted { tx_hash, receipt };
                }
                Ok(_) => {
                    tracing::debug!(%tx_hash, attempt, max_attempts, "receipt not available yet");
                }
                Err(e) => {
                    tracing::debug!(%tx_hash, attempt, error = %e, "receipt lookup failed");
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }

        tracing::warn!(
            %tx_hash,
            nonce,
            max_attempts,
            "transaction not confirmed in time, recording for replacement"
        );

        self.pending.record(PendingReplacement {
            tx_hash,
            nonce,
            gas_price,
        });

        self.events.emit(SubmissionEvent::Unconfirmed {
            label: label.to_string(),
            tx_hash,
            poll_attempts: max_attempts,
        });

        TxOutcome::Unconfirmed {
            tx_hash,
            nonce,
            gas_price,
        }
    }
}
