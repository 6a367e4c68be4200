use alloy::{primitives::{Bytes, U256}, providers::Provider};
use pilot_core::{chain::Chain, error::AlloyRpcErrorToChainError};
use pilot_executors::submitter::CallRequest;
use tracing::info;

use super::StepError;
use crate::session::WalletSession;

/// `balance * percentage / 100` minus the fee for `gas_limit` at `gas_price`.
/// `None` when nothing would be left to send.
pub fn transfer_amount(balance: U256, percentage: u64, gas_limit: u64, gas_price: u128) -> Option<U256> {
    let share = balance * U256::from(percentage) / U256::from(100);
    let fee = U256::from(gas_limit) * U256::from(gas_price);
    share.checked_sub(fee).filter(|amount| !amount.is_zero())
}

pub async fn run(session: &mut WalletSession<'_>) -> Result<(), StepError> {
    let settings = &session.config().steps.transfer;
    let address = session.address();

    let chain = session.submitter().chain();
    let balance = chain
        .provider()
        .get_balance(address)
        .await
        .map_err(|e| e.to_chain_error(chain))?;

    if balance.is_zero() {
        info!("Balance is zero, nothing to transfer");
        return Ok(());
    }

    let gas_price = session.submitter().gas_price().await;
    let Some(amount) = transfer_amount(balance, settings.amount_percentage, settings.gas_limit, gas_price)
    else {
        info!(%balance, gas_price, "Balance does not cover the transfer fee, skipping");
        return Ok(());
    };

    let request = CallRequest::call("self transfer", address, Bytes::new())
        .with_value(amount)
        .with_gas_limit(settings.gas_limit);
    let outcome = session.submit_confirmed(&request).await?;

    info!(tx_hash = %outcome.tx_hash(), %amount, "Self transfer confirmed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_amount_subtracts_fee() {
        let balance = U256::from(1_000_000_000_000_000_000u128);
        let amount = transfer_amount(balance, 90, 21_000, 1_000_000_000).unwrap();
        assert_eq!(
            amount,
            U256::from(900_000_000_000_000_000u128 - 21_000_000_000_000u128)
        );
    }

    #[test]
    fn test_transfer_amount_none_when_fee_exceeds_share() {
        assert_eq!(transfer_amount(U256::from(10_000), 90, 21_000, 1), None);
        assert_eq!(transfer_amount(U256::from(21_000 * 100 / 90 + 1), 90, 21_000, 1), None);
        assert_eq!(transfer_amount(U256::ZERO, 90, 21_000, 1), None);
    }
}
