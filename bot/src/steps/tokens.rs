use std::time::{SystemTime, UNIX_EPOCH};

use alloy::{
    primitives::{Address, Bytes, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
};
use pilot_core::{chain::Chain, error::AlloyRpcErrorToChainError};
use pilot_executors::submitter::CallRequest;
use rand::Rng;
use tracing::{info, warn};

use super::{StepError, submit_item};
use crate::{
    config::{SwapPair, TokenConfig, TokenStepConfig},
    contracts::{
        allowance_calldata, approve_calldata, balance_of_calldata, decode_uint, mint_calldata,
        swap_calldata,
    },
    session::WalletSession,
};

/// Converts a decimal amount to base units, keeping `precision` decimals.
pub fn to_base_units(amount: f64, precision: u8, decimals: u8) -> U256 {
    let precision = precision.min(decimals);
    let scaled = (amount.max(0.0) * 10f64.powi(precision as i32)).round() as u128;
    U256::from(scaled) * U256::from(10u64).pow(U256::from(decimals - precision))
}

/// Uniform in `[min_amount, max_amount)`, rounded to the token's precision.
pub fn random_amount(token: &TokenConfig) -> U256 {
    let amount = if token.max_amount > token.min_amount {
        rand::rng().random_range(token.min_amount..token.max_amount)
    } else {
        token.min_amount
    };
    to_base_units(amount, token.precision, token.decimals)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapResult {
    Swapped,
    /// Nothing of the input token left. Remaining swaps of the pair are skipped.
    NoBalance,
}

fn token<'c>(settings: &'c TokenStepConfig, symbol: &str) -> Result<&'c TokenConfig, StepError> {
    settings.tokens.get(symbol).ok_or_else(|| StepError::UnknownToken {
        symbol: symbol.to_string(),
    })
}

fn deadline(offset_secs: u64) -> U256 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    U256::from(now + offset_secs)
}

/// Token faucet claims followed by the configured swaps. Individual claims
/// and swaps that fail are logged and skipped.
#[tracing::instrument(skip_all)]
pub async fn run(session: &mut WalletSession<'_>) -> Result<(), StepError> {
    let settings = &session.config().steps.tokens;
    session.submitter_mut().reset_nonce();

    if settings.enable_faucet {
        claim_tokens(session, settings).await?;
    }
    if settings.enable_swap {
        swap_tokens(session, settings).await?;
    }
    Ok(())
}

async fn claim_tokens(
    session: &mut WalletSession<'_>,
    settings: &TokenStepConfig,
) -> Result<(), StepError> {
    let total = settings.faucet_tokens.len();
    for (i, symbol) in settings.faucet_tokens.iter().enumerate() {
        let faucet = token(settings, symbol)?;
        let request = CallRequest::call(format!("{symbol} faucet"), faucet.address, mint_calldata());

        if submit_item(session, &request, settings.item_retries).await {
            info!(token = %symbol, "Token faucet claimed");
        } else {
            warn!(token = %symbol, "Token faucet claim failed, moving on");
        }

        if i + 1 < total {
            session.pause(settings.item_delay).await;
        }
    }
    Ok(())
}

async fn swap_tokens(
    session: &mut WalletSession<'_>,
    settings: &TokenStepConfig,
) -> Result<(), StepError> {
    for pair in &settings.swap_pairs {
        let from = token(settings, &pair.from)?;
        let to = token(settings, &pair.to)?;

        'pair: for n in 0..pair.count {
            let attempts = settings.item_retries.max(1);
            for attempt in 0..attempts {
                match swap_once(session, settings, pair, from, to.address).await {
                    Ok(SwapResult::Swapped) => break,
                    Ok(SwapResult::NoBalance) => {
                        warn!(from = %pair.from, "No balance left, skipping remaining swaps of the pair");
                        break 'pair;
                    }
                    Err(e) => {
                        warn!(
                            from = %pair.from,
                            to = %pair.to,
                            swap = n + 1,
                            attempt = attempt + 1,
                            attempts,
                            error = %e,
                            "Swap failed"
                        );
                        if attempt + 1 < attempts {
                            session.backoff_sleep(attempt, &e).await;
                        }
                    }
                }
            }

            session.pause(settings.item_delay).await;
        }
    }
    Ok(())
}

/// One swap of a random amount, shrunk to the balance when that is lower.
#[tracing::instrument(skip_all, fields(from = %pair.from, to = %pair.to))]
pub async fn swap_once(
    session: &mut WalletSession<'_>,
    settings: &TokenStepConfig,
    pair: &SwapPair,
    from: &TokenConfig,
    to: Address,
) -> Result<SwapResult, StepError> {
    let owner = session.address();
    let mut amount = random_amount(from);

    let balance = read_uint(session, "balanceOf", from.address, balance_of_calldata(owner)).await?;
    if balance < amount {
        if balance.is_zero() {
            return Ok(SwapResult::NoBalance);
        }
        info!(%balance, wanted = %amount, "Swapping the whole balance instead");
        amount = balance;
    }

    let allowance = read_uint(
        session,
        "allowance",
        from.address,
        allowance_calldata(owner, settings.router),
    )
    .await?;
    if allowance < amount {
        let approve = CallRequest::call(
            format!("approve {}", pair.from),
            from.address,
            approve_calldata(settings.router, U256::MAX),
        );
        session.submit_confirmed(&approve).await?;
        info!(token = %pair.from, "Router approved");
    }

    let swap = CallRequest::call(
        format!("swap {} to {}", pair.from, pair.to),
        settings.router,
        swap_calldata(
            from.address,
            to,
            settings.pool_fee,
            owner,
            deadline(settings.deadline_secs),
            amount,
        ),
    );
    let outcome = session.submit_confirmed(&swap).await?;
    info!(tx_hash = %outcome.tx_hash(), %amount, "Swap confirmed");
    Ok(SwapResult::Swapped)
}

async fn read_uint(
    session: &WalletSession<'_>,
    label: &str,
    to: Address,
    data: Bytes,
) -> Result<U256, StepError> {
    let chain = session.submitter().chain();
    let request = TransactionRequest::default().to(to).input(data.into());
    let result = chain
        .provider()
        .call(request)
        .await
        .map_err(|e| e.to_chain_error(chain))?;

    decode_uint(&result).ok_or_else(|| StepError::InvalidResponse {
        label: label.to_string(),
        message: format!("cannot decode {result} as uint256"),
    })
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;

    fn token_config(min: f64, max: f64, precision: u8) -> TokenConfig {
        TokenConfig {
            address: Address::ZERO,
            min_amount: min,
            max_amount: max,
            precision,
            decimals: 18,
        }
    }

    #[test]
    fn test_base_units_round_to_precision() {
        assert_eq!(
            to_base_units(0.012345678, 4, 18),
            U256::from(123u64) * U256::from(10u64).pow(U256::from(14))
        );
        assert_eq!(to_base_units(1.0, 0, 6), U256::from(1_000_000u64));
        assert_eq!(to_base_units(-1.0, 4, 18), U256::ZERO);
    }

    #[test]
    fn test_precision_capped_at_decimals() {
        assert_eq!(to_base_units(0.5, 10, 2), U256::from(50u64));
    }

    #[test]
    fn test_random_amount_within_bounds() {
        let usdt = token_config(0.01, 0.1, 4);
        let low = to_base_units(0.01, 4, 18);
        let high = to_base_units(0.1, 4, 18);
        for _ in 0..50 {
            let amount = random_amount(&usdt);
            assert!(amount >= low && amount <= high);
        }
    }

    #[test]
    fn test_degenerate_range_uses_min() {
        assert_eq!(random_amount(&token_config(0.5, 0.5, 2)), to_base_units(0.5, 2, 18));
    }
}
