use alloy::primitives::B256;
use pilot_core::{
    account::SignedTransaction,
    chain::Chain,
    classify::ErrorClass,
    error::{AlloyRpcErrorToChainError, ChainError},
};
use tracing::Instrument;

use crate::{
    events::SubmissionEvent,
    submitter::{CallRequest, SubmitterError, TransactionSubmitter, TxOutcome},
};

impl<C: Chain> TransactionSubmitter<C> {
    /// Builds, signs, broadcasts and polls `request`.
    ///
    /// Mempool-class rejections are retried up to `max_retries` times, each
    /// time with backoff, an optional RPC rotation, a fresh nonce and a gas
    /// price escalated by the retry count. Anything else is returned to the
    /// caller as is. Reverted and unconfirmed transactions are outcomes, not
    /// errors.
    pub async fn submit(&mut self, request: &CallRequest) -> Result<TxOutcome, SubmitterError> {
        let span = tracing::info_span!(
            "submit",
            label = %request.label,
            to = ?request.to,
            from = %self.account.address()
        );
        self.submit_with_retries(request).instrument(span).await
    }

    async fn submit_with_retries(
        &mut self,
        request: &CallRequest,
    ) -> Result<TxOutcome, SubmitterError> {
        let mut attempt = 0;

        loop {
            let error = match self.submit_once(request, attempt).await {
                Ok(outcome) => return Ok(outcome),
                Err(error) => error,
            };

            // local and network nonce may have diverged
            self.reset_nonce();

            let class = error.class();
            self.events.emit(SubmissionEvent::SubmissionFailed {
                label: request.label.clone(),
                class,
                message: error.to_string(),
                attempt,
            });

            if !class.is_mempool() {
                tracing::error!(attempt, error = %error, "submission failed");
                return Err(error);
            }

            if attempt >= self.config.max_retries {
                tracing::error!(attempt, error = %error, "mempool retries exhausted");
                return Err(match error {
                    SubmitterError::TransactionSendError {
                        message,
                        inner_error,
                        ..
                    } => SubmitterError::MempoolRetriesExhausted {
                        attempts: attempt + 1,
                        message,
                        inner_error,
                    },
                    other => other,
                });
            }

            if let Some(status) = self.chain.rpc().txpool_status().await {
                tracing::info!(
                    pending = status.pending,
                    queued = status.queued,
                    "mempool status"
                );
            }

            let delay = self.backoff.delay(attempt, class);
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "mempool rejected transaction, retrying"
            );
            tokio::time::sleep(delay).await;

            let rotated = self.config.rotate_on_mempool_error && self.rotate_rpc();
            attempt += 1;

            self.events.emit(SubmissionEvent::Retrying {
                label: request.label.clone(),
                attempt,
                delay_ms: delay.as_millis() as u64,
                rotated,
            });
        }
    }

    async fn submit_once(
        &mut self,
        request: &CallRequest,
        attempt: u32,
    ) -> Result<TxOutcome, SubmitterError> {
        let from = self.account.address();

        // estimation may rotate the endpoint, so it runs before the nonce is read
        let gas_limit = self.resolve_gas_limit(request).await;

        let nonce = self
            .nonces
            .next(&self.chain, from)
            .await
            .map_err(|e| SubmitterError::NonceUnavailable {
                message: e.to_string(),
                inner_error: e,
            })?;

        let gas_price = self.gas.price(&self.chain, attempt).await;

        self.ensure_chain_id()
            .await
            .map_err(|inner_error| SubmitterError::WrongChain { inner_error })?;

        self.events.emit(SubmissionEvent::Building {
            label: request.label.clone(),
            nonce,
            gas_price,
            gas_limit,
            attempt,
        });

        let tx = self.build_transaction(request, nonce, gas_price, gas_limit);
        let signed = self.sign(tx)?;

        tracing::info!(tx_hash = %signed.hash, nonce, gas_limit, gas_price, "signed transaction");
        self.events.emit(SubmissionEvent::Signed {
            label: request.label.clone(),
            tx_hash: signed.hash,
            nonce,
        });

        self.nonces.advance(from);

        let tx_hash = self
            .broadcast(&signed)
            .await
            .map_err(|inner_error| SubmitterError::TransactionSendError {
                message: inner_error.message().to_string(),
                class: inner_error.classify(&self.patterns),
                inner_error,
            })?;

        tracing::info!(%tx_hash, "transaction sent");
        self.events.emit(SubmissionEvent::Submitted {
            label: request.label.clone(),
            tx_hash,
        });

        let poll_attempts = request.poll_attempts.unwrap_or(self.config.poll_attempts);
        Ok(self
            .wait_for_receipt(&request.label, tx_hash, nonce, gas_price, poll_attempts)
            .await)
    }

    /// `eth_sendRawTransaction` on the current endpoint.
    pub(super) async fn broadcast(&self, signed: &SignedTransaction) -> Result<B256, ChainError> {
        let tx_hash = self
            .chain
            .rpc()
            .send_raw_transaction(&signed.raw)
            .await
            .map_err(|e| e.to_chain_error(&self.chain))?;

        if tx_hash != signed.hash {
            tracing::warn!(
                local = %signed.hash,
                node = %tx_hash,
                "node returned a different transaction hash"
            );
        }

        Ok(tx_hash)
    }

    /// Classifies an arbitrary error message with this submitter's patterns.
    pub fn classify_message(&self, message: &str) -> ErrorClass {
        self.patterns.classify(message)
    }
}
