use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    primitives::{Address, B256, Bytes},
    signers::{SignerSync, local::PrivateKeySigner},
};

use crate::error::ChainError;

/// A signing identity derived from a private key.
#[derive(Debug, Clone)]
pub struct Account {
    signer: PrivateKeySigner,
}

/// A locally signed transaction, ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: B256,
    pub raw: Bytes,
}

impl Account {
    /// Accepts hex keys with or without the `0x` prefix.
    pub fn from_private_key(key: &str) -> Result<Self, ChainError> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);

        let signer = key
            .parse::<PrivateKeySigner>()
            .map_err(|e| ChainError::InvalidPrivateKey {
                message: e.to_string(),
            })?;

        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn sign_legacy(&self, tx: TxLegacy) -> Result<SignedTransaction, ChainError> {
        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|e| ChainError::SigningError {
                message: e.to_string(),
            })?;

        let signed = tx.into_signed(signature);
        let hash = *signed.hash();
        let raw = TxEnvelope::Legacy(signed).encoded_2718();

        Ok(SignedTransaction {
            hash,
            raw: raw.into(),
        })
    }
}
