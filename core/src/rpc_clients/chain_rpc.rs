use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::rpc::client::RpcClient;
use alloy::transports::{IntoBoxTransport, TransportResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Raw JSON-RPC access to a chain endpoint.
///
/// Used for the calls where the engine wants full control over timing and
/// response shape: broadcasting signed bytes and polling for receipts.
/// Only the fields the engine reads are decoded, so nodes that return
/// non-standard receipts or transactions still parse.
#[derive(Debug, Clone)]
pub struct ChainRpc {
    inner: RpcClient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    pub transaction_hash: B256,
    #[serde(default, with = "alloy::serde::quantity::opt")]
    pub block_number: Option<u64>,
    #[serde(default, with = "alloy::serde::quantity::opt")]
    pub status: Option<u64>,
    #[serde(default, with = "alloy::serde::quantity::opt")]
    pub gas_used: Option<u64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
}

impl ReceiptSummary {
    /// A receipt only counts once it is anchored in a block.
    pub fn is_mined(&self) -> bool {
        self.block_number.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub hash: B256,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(with = "alloy::serde::quantity")]
    pub nonce: u64,
    #[serde(default, with = "alloy::serde::quantity::opt")]
    pub gas_price: Option<u128>,
    #[serde(with = "alloy::serde::quantity")]
    pub gas: u64,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub input: Bytes,
    #[serde(default, with = "alloy::serde::quantity::opt")]
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPoolStatus {
    #[serde(with = "alloy::serde::quantity")]
    pub pending: u64,
    #[serde(with = "alloy::serde::quantity")]
    pub queued: u64,
}

impl ChainRpc {
    pub fn new(transport: impl IntoBoxTransport) -> Self {
        let client = RpcClient::builder().transport(transport, false);

        Self { inner: client }
    }

    pub fn from_client(client: RpcClient) -> Self {
        Self { inner: client }
    }

    pub async fn send_raw_transaction(&self, raw: &Bytes) -> TransportResult<B256> {
        self.inner.request("eth_sendRawTransaction", (raw,)).await
    }

    pub async fn transaction_receipt(&self, hash: B256) -> TransportResult<Option<ReceiptSummary>> {
        self.inner
            .request("eth_getTransactionReceipt", (hash,))
            .await
    }

    pub async fn transaction_by_hash(&self, hash: B256) -> TransportResult<Option<TransactionView>> {
        self.inner
            .request("eth_getTransactionByHash", (hash,))
            .await
    }

    /// Mempool occupancy, if the node exposes the non-standard `txpool_status`.
    pub async fn txpool_status(&self) -> Option<TxPoolStatus> {
        match self.inner.request_noparams("txpool_status").await {
            Ok(status) => Some(status),
            Err(e) => {
                debug!(error = %e, "txpool_status not available");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_parses_minimal_node_response() {
        let receipt: ReceiptSummary = serde_json::from_value(serde_json::json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockNumber": "0x10",
            "status": "0x0",
            "gasUsed": "0x5208",
            "contractAddress": null,
            "logs": [],
            "someNodeSpecificField": 7
        }))
        .unwrap();

        assert!(receipt.is_mined());
        assert!(!receipt.is_success());
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(receipt.gas_used, Some(21_000));
    }

    #[test]
    fn test_pending_receipt_is_not_mined() {
        let receipt: ReceiptSummary = serde_json::from_value(serde_json::json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockNumber": null,
            "status": "0x1"
        }))
        .unwrap();

        assert!(!receipt.is_mined());
    }

    #[test]
    fn test_transaction_view_parses_legacy_transaction() {
        let tx: TransactionView = serde_json::from_value(serde_json::json!({
            "hash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "from": "0x00000000000000000000000000000000000000aa",
            "to": "0x00000000000000000000000000000000000000bb",
            "nonce": "0x7",
            "gasPrice": "0x3b9aca00",
            "gas": "0x186a0",
            "value": "0x0",
            "input": "0x1249c58b",
            "blockNumber": null,
            "type": "0x0"
        }))
        .unwrap();

        assert_eq!(tx.nonce, 7);
        assert_eq!(tx.gas_price, Some(1_000_000_000));
        assert_eq!(tx.gas, 100_000);
        assert_eq!(tx.input, Bytes::from_static(&[0x12, 0x49, 0xc5, 0x8b]));
        assert!(tx.block_number.is_none());
    }
}
