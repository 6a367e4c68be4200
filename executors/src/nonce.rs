use std::collections::HashMap;

use alloy::{primitives::Address, providers::Provider};
use pilot_core::{
    chain::Chain,
    error::{AlloyRpcErrorToChainError, ChainError},
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, thiserror::Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "errorCode")]
pub enum NonceError {
    #[error("Failed to fetch transaction count for {address}: {inner_error}")]
    FetchFailed {
        address: Address,
        inner_error: ChainError,
    },
}

/// Locally cached "next nonce" per account.
///
/// Once an account's nonce is cached it is never re-queried until `reset`,
/// so back-to-back submissions don't race the node's view of pending
/// transactions.
#[derive(Debug, Default)]
pub struct NonceTracker {
    cache: HashMap<Address, u64>,
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached nonce, querying the chain's pending transaction
    /// count on first use.
    pub async fn next<C: Chain>(&mut self, chain: &C, address: Address) -> Result<u64, NonceError> {
        if let Some(nonce) = self.cache.get(&address) {
            tracing::debug!(%address, nonce, "using tracked nonce");
            return Ok(*nonce);
        }

        let nonce = chain
            .provider()
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| NonceError::FetchFailed {
                address,
                inner_error: e.to_chain_error(chain),
            })?;

        tracing::debug!(%address, nonce, "initial nonce from network");
        self.cache.insert(address, nonce);
        Ok(nonce)
    }

    /// Reserves the current slot. Call once per transaction actually broadcast.
    pub fn advance(&mut self, address: Address) -> Option<u64> {
        match self.cache.get_mut(&address) {
            Some(nonce) => {
                *nonce += 1;
                tracing::debug!(%address, nonce = *nonce, "incremented nonce");
                Some(*nonce)
            }
            None => {
                tracing::warn!(%address, "advance called on uninitialized nonce, ignoring");
                None
            }
        }
    }

    pub fn reset(&mut self, address: Address) {
        if self.cache.remove(&address).is_some() {
            tracing::debug!(%address, "nonce cache reset");
        }
    }

    pub fn reset_all(&mut self) {
        self.cache.clear();
    }

    pub fn cached(&self, address: Address) -> Option<u64> {
        self.cache.get(&address).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_without_cache_is_ignored() {
        let mut tracker = NonceTracker::new();
        assert_eq!(tracker.advance(Address::ZERO), None);
        assert_eq!(tracker.cached(Address::ZERO), None);
    }

    #[test]
    fn test_reset_clears_only_that_account() {
        let mut tracker = NonceTracker::new();
        let a = Address::repeat_byte(0xaa);
        let b = Address::repeat_byte(0xbb);
        tracker.cache.insert(a, 3);
        tracker.cache.insert(b, 9);

        tracker.reset(a);
        assert_eq!(tracker.cached(a), None);
        assert_eq!(tracker.cached(b), Some(9));

        tracker.reset_all();
        assert_eq!(tracker.cached(b), None);
    }
}
