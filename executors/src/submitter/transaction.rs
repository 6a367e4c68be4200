use alloy::{
    consensus::TxLegacy,
    network::TransactionBuilder,
    providers::Provider,
    rpc::types::TransactionRequest as AlloyTransactionRequest,
};
use pilot_core::{
    account::SignedTransaction,
    chain::Chain,
    error::{AlloyRpcErrorToChainError, ChainError},
};

use crate::{
    gas::gwei_to_wei,
    submitter::{CallRequest, SubmitterError, TransactionSubmitter},
};

impl<C: Chain> TransactionSubmitter<C> {
    /// Gas limit for `request`: explicit limit, else a buffered estimate,
    /// else the configured default. Never fails.
    pub(super) async fn resolve_gas_limit(&mut self, request: &CallRequest) -> u64 {
        if let Some(gas_limit) = request.gas_limit {
            return gas_limit;
        }

        match self.estimate_gas(request).await {
            Ok(estimate) => return self.buffered(estimate),
            Err(error) => {
                tracing::warn!(label = %request.label, error = %error, "gas estimation failed");
            }
        }

        if self.config.rotate_on_estimate_failure && self.rotate_rpc() {
            match self.estimate_gas(request).await {
                Ok(estimate) => return self.buffered(estimate),
                Err(error) => {
                    tracing::warn!(
                        label = %request.label,
                        error = %error,
                        "gas estimation failed after RPC rotation"
                    );
                }
            }
        }

        let fallback = request
            .default_gas_limit
            .unwrap_or(self.config.default_gas_limit);
        tracing::warn!(label = %request.label, gas_limit = fallback, "using default gas limit");
        fallback
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ChainError> {
        let probe = AlloyTransactionRequest::default()
            .with_from(self.account.address())
            .with_value(request.value)
            .with_chain_id(self.chain.chain_id())
            .with_gas_price(gwei_to_wei(self.config.estimate_probe_gwei));

        let probe = match request.to {
            Some(to) => probe.with_to(to).with_input(request.data.clone()),
            None => probe.with_deploy_code(request.data.clone()),
        };

        self.chain
            .provider()
            .estimate_gas(probe)
            .await
            .map_err(|e| e.to_chain_error(&self.chain))
    }

    fn buffered(&self, estimate: u64) -> u64 {
        let gas_limit = estimate.saturating_mul(100 + self.config.gas_buffer_percent) / 100;
        tracing::debug!(estimate, gas_limit, "estimated gas");
        gas_limit
    }

    pub(super) fn build_transaction(
        &self,
        request: &CallRequest,
        nonce: u64,
        gas_price: u128,
        gas_limit: u64,
    ) -> TxLegacy {
        TxLegacy {
            chain_id: Some(self.chain.chain_id()),
            nonce,
            gas_price,
            gas_limit,
            to: request.kind(),
            value: request.value,
            input: request.data.clone(),
        }
    }

    pub(super) fn sign(&self, tx: TxLegacy) -> Result<SignedTransaction, SubmitterError> {
        self.account
            .sign_legacy(tx)
            .map_err(|e| SubmitterError::SigningError {
                message: e.to_string(),
                inner_error: e,
            })
    }
}
