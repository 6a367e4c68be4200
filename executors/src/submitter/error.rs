use alloy::primitives::{Address, B256};
use pilot_core::{classify::ErrorClass, error::ChainError};
use serde::{Deserialize, Serialize};

use crate::nonce::NonceError;

#[derive(Serialize, Deserialize, Debug, Clone, thiserror::Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "errorCode")]
pub enum SubmitterError {
    #[error("Nonce unavailable: {message}")]
    NonceUnavailable {
        message: String,
        inner_error: NonceError,
    },

    #[error("Transaction signing failed: {message}")]
    SigningError {
        message: String,
        inner_error: ChainError,
    },

    #[error("{inner_error}")]
    WrongChain { inner_error: ChainError },

    #[error("Error encountered when broadcasting transaction: {message}")]
    TransactionSendError {
        message: String,
        class: ErrorClass,
        inner_error: ChainError,
    },

    #[error("Mempool still rejecting after {attempts} attempts: {message}")]
    MempoolRetriesExhausted {
        attempts: u32,
        message: String,
        inner_error: ChainError,
    },
}

impl SubmitterError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SubmitterError::TransactionSendError { class, .. } => *class,
            SubmitterError::NonceUnavailable { .. } => ErrorClass::Transient,
            SubmitterError::SigningError { .. }
            | SubmitterError::WrongChain { .. }
            | SubmitterError::MempoolRetriesExhausted { .. } => ErrorClass::Fatal,
        }
    }

    pub fn chain_error(&self) -> Option<&ChainError> {
        match self {
            SubmitterError::SigningError { inner_error, .. }
            | SubmitterError::WrongChain { inner_error }
            | SubmitterError::TransactionSendError { inner_error, .. }
            | SubmitterError::MempoolRetriesExhausted { inner_error, .. } => Some(inner_error),
            SubmitterError::NonceUnavailable { .. } => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, thiserror::Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "errorCode")]
pub enum ReplaceError {
    #[error("Transaction not found: {tx_hash}")]
    NotFound { tx_hash: B256 },

    #[error("Transaction {tx_hash} belongs to {from}, not {account}")]
    NotOwned {
        tx_hash: B256,
        from: Address,
        account: Address,
    },

    #[error("Transaction {tx_hash} already confirmed in block {block_number}")]
    AlreadyConfirmed { tx_hash: B256, block_number: u64 },

    #[error("Transaction {tx_hash} has no legacy gas price")]
    MissingGasPrice { tx_hash: B256 },

    #[error("{inner_error}")]
    WrongChain { inner_error: ChainError },

    #[error("RPC error while inspecting transaction: {message}")]
    RpcError {
        message: String,
        inner_error: ChainError,
    },

    #[error("Replacement signing failed: {message}")]
    SigningError {
        message: String,
        inner_error: ChainError,
    },

    #[error("Error encountered when broadcasting replacement: {message}")]
    TransactionSendError {
        message: String,
        inner_error: ChainError,
    },
}
