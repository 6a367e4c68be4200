#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use alloy::consensus::TxEnvelope;
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::Bytes;
use pilot_core::{backoff::BackoffConfig, chain::ChainConfig};
use pilot_executors::submitter::SubmitterConfig;
use serde_json::{Value, json};
use testnet_pilot::{
    config::{BotConfig, DelayRange},
    steps::StepKind,
};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

// anvil's first default account
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
pub const TX_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
pub const ONE_ETHER_HEX: &str = "0xde0b6b3a7640000";

// Setup tracing for tests
pub fn setup_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "testnet_pilot=debug,pilot_executors=debug,pilot_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// JSON-RPC responder keyed on method. The last queued reply repeats.
#[derive(Default)]
pub struct RpcMock {
    replies: Arc<Mutex<HashMap<String, VecDeque<Value>>>>,
}

impl RpcMock {
    /// Nonce 5, 1 gwei, 21000 gas, every receipt mined successfully.
    pub fn healthy_chain() -> Self {
        Self::default()
            .result("eth_chainId", json!("0x40d8"))
            .result("eth_getTransactionCount", json!("0x5"))
            .result("eth_gasPrice", json!("0x3b9aca00"))
            .result("eth_estimateGas", json!("0x5208"))
            .result("eth_sendRawTransaction", json!(TX_HASH))
            .result("eth_getTransactionReceipt", mined_receipt("0x1", None))
    }

    pub fn result(self, rpc_method: &str, value: Value) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(rpc_method.to_string())
            .or_default()
            .push_back(value);
        self
    }

    /// Replaces whatever is queued for `rpc_method`.
    pub fn set(self, rpc_method: &str, value: Value) -> Self {
        self.replies.lock().unwrap().remove(rpc_method);
        self.result(rpc_method, value)
    }

    pub async fn mount(self, server: &MockServer) {
        Mock::given(method("POST"))
            .respond_with(self)
            .mount(server)
            .await;
    }
}

impl Respond for RpcMock {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let id = body.get("id").cloned().unwrap_or(Value::Null);
        let rpc_method = body
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(&rpc_method) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        let payload = match reply {
            Some(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
            None => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": "the method does not exist"}
            }),
        };

        ResponseTemplate::new(200).set_body_json(payload)
    }
}

pub fn mined_receipt(status: &str, contract_address: Option<&str>) -> Value {
    json!({
        "transactionHash": TX_HASH,
        "blockNumber": "0x64",
        "status": status,
        "gasUsed": "0x5208",
        "contractAddress": contract_address,
        "logs": []
    })
}

/// ABI word holding `value`.
pub fn uint_word(value: u64) -> Value {
    json!(format!("0x{value:064x}"))
}

/// Decodes every transaction the server received via `eth_sendRawTransaction`.
pub async fn sent_transactions(server: &MockServer) -> Vec<TxEnvelope> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| {
            let body: Value = serde_json::from_slice(&request.body).ok()?;
            if body.get("method")?.as_str()? != "eth_sendRawTransaction" {
                return None;
            }
            let raw: Bytes = serde_json::from_value(body.get("params")?.get(0)?.clone()).ok()?;
            TxEnvelope::decode_2718(&mut raw.as_ref()).ok()
        })
        .collect()
}

/// Defaults with millisecond timings, pointed at `rpc`.
pub fn test_config(rpc: &MockServer) -> BotConfig {
    let mut config = BotConfig::default();
    config.chain = ChainConfig {
        chain_id: 16600,
        rpc_urls: vec![rpc.uri()],
        rotation_enabled: false,
        request_timeout_secs: 5,
    };
    config.submitter = SubmitterConfig {
        max_retries: 2,
        poll_interval_ms: 5,
        poll_attempts: 3,
        rotate_on_estimate_failure: false,
        rotate_on_mempool_error: false,
        ..SubmitterConfig::default()
    };
    config.backoff = BackoffConfig {
        base_wait_ms: 1,
        cap_ms: 5,
        mempool_multiplier: 2.0,
    };
    config.http.max_retries = 2;
    config.steps.max_retries = 2;
    config.steps.storage.file_delay = DelayRange::new(0, 0);
    config.steps.tokens.item_delay = DelayRange::new(0, 0);
    config.steps.mint.item_delay = DelayRange::new(0, 0);
    config.cycle.wallet_delay = DelayRange::new(0, 0);
    config
}

/// Turns off every step except `keep`.
pub fn only_step(config: &mut BotConfig, keep: StepKind) {
    let steps = &mut config.steps;
    steps.faucet.enabled = keep == StepKind::Faucet;
    steps.deploy.enabled = keep == StepKind::Deploy;
    steps.transfer.enabled = keep == StepKind::Transfer;
    steps.storage.enabled = keep == StepKind::Storage;
    let tokens = keep == StepKind::TokenOperations;
    steps.tokens.enable_faucet = tokens;
    steps.tokens.enable_swap = tokens;
    let mint = keep == StepKind::Mint;
    steps.mint.nft.enabled = mint;
    steps.mint.domain.enabled = mint;
}
