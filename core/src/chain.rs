use std::time::Duration;

use alloy::{
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::client::RpcClient,
    transports::http::reqwest::{ClientBuilder as HttpClientBuilder, Url},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{AlloyRpcErrorToChainError, ChainError},
    rpc_clients::{ChainRpc, transport::SharedClientTransportBuilder},
};

pub trait Chain: Send + Sync {
    fn chain_id(&self) -> u64;
    fn rpc_url(&self) -> Url;

    fn provider(&self) -> &RootProvider;
    fn rpc(&self) -> &ChainRpc;

    /// Switches to the next endpoint. Returns `false` when nothing changed,
    /// in which case the caller must not assume a fresh endpoint. Any nonce
    /// cached against the previous endpoint should be reset by the caller.
    fn rotate_rpc(&mut self) -> bool;
}

/// Asks the current endpoint which chain it serves. Fails with
/// `ChainIdMismatch` when that is not the configured chain, since every
/// transaction signed for the configured id would be rejected there.
pub async fn verify_chain_id<C: Chain>(chain: &C) -> Result<u64, ChainError> {
    let reported = chain
        .provider()
        .get_chain_id()
        .await
        .map_err(|e| e.to_chain_error(chain))?;

    if reported != chain.chain_id() {
        return Err(ChainError::ChainIdMismatch {
            configured: chain.chain_id(),
            reported,
            rpc_url: chain.rpc_url().to_string(),
        });
    }

    Ok(reported)
}

/// Ordered, interchangeable RPC endpoints with a round-robin cursor.
#[derive(Debug, Clone)]
pub struct RpcEndpoints {
    urls: Vec<Url>,
    current: usize,
    rotation_enabled: bool,
}

impl RpcEndpoints {
    pub fn new(urls: Vec<Url>, rotation_enabled: bool) -> Result<Self, ChainError> {
        if urls.is_empty() {
            return Err(ChainError::RpcConfigError {
                message: "at least one RPC url is required".to_string(),
            });
        }

        Ok(Self {
            urls,
            current: 0,
            rotation_enabled,
        })
    }

    pub fn parse<S: AsRef<str>>(urls: &[S], rotation_enabled: bool) -> Result<Self, ChainError> {
        let urls = urls
            .iter()
            .map(|url| {
                Url::parse(url.as_ref()).map_err(|e| ChainError::RpcConfigError {
                    message: format!("Failed to parse RPC URL {}: {e}", url.as_ref()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(urls, rotation_enabled)
    }

    pub fn current(&self) -> &Url {
        &self.urls[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Advances the cursor, wrapping to the first endpoint.
    /// Returns `None` when rotation is disabled or there is nothing to rotate to.
    pub fn rotate(&mut self) -> Option<&Url> {
        if !self.rotation_enabled || self.urls.len() < 2 {
            return None;
        }

        self.current = (self.current + 1) % self.urls.len();
        Some(&self.urls[self.current])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,
    pub rotation_enabled: bool,
    /// Per-request timeout for JSON-RPC calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 16600,
            rpc_urls: vec![
                "https://evmrpc-testnet.0g.ai".to_string(),
                "https://16600.rpc.thirdweb.com".to_string(),
            ],
            rotation_enabled: true,
            request_timeout_secs: 30,
        }
    }
}

struct EndpointClients {
    provider: RootProvider,
    rpc: ChainRpc,
}

/// A `Chain` backed by a pool of endpoints. Clients for every endpoint are
/// built up front and share one connection pool.
pub struct RotatingChain {
    chain_id: u64,
    endpoints: RpcEndpoints,
    clients: Vec<EndpointClients>,
}

impl RotatingChain {
    pub fn new(config: &ChainConfig) -> Result<Self, ChainError> {
        let endpoints = RpcEndpoints::parse(&config.rpc_urls, config.rotation_enabled)?;

        let reqwest_client = HttpClientBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ChainError::RpcConfigError {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        let transport_builder = SharedClientTransportBuilder::new(reqwest_client);

        let clients = endpoints
            .urls()
            .iter()
            .map(|url| {
                let rpc_client =
                    RpcClient::builder().transport(transport_builder.transport(url.clone()), false);

                EndpointClients {
                    provider: ProviderBuilder::new()
                        .disable_recommended_fillers()
                        .connect_client(rpc_client.clone()),
                    rpc: ChainRpc::from_client(rpc_client),
                }
            })
            .collect();

        info!(
            chain_id = config.chain_id,
            endpoints = endpoints.len(),
            rotation_enabled = config.rotation_enabled,
            "chain configured"
        );

        Ok(Self {
            chain_id: config.chain_id,
            endpoints,
            clients,
        })
    }

    pub fn endpoints(&self) -> &RpcEndpoints {
        &self.endpoints
    }

    fn current_clients(&self) -> &EndpointClients {
        &self.clients[self.endpoints.current_index()]
    }
}

impl Chain for RotatingChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn rpc_url(&self) -> Url {
        self.endpoints.current().clone()
    }

    fn provider(&self) -> &RootProvider {
        &self.current_clients().provider
    }

    fn rpc(&self) -> &ChainRpc {
        &self.current_clients().rpc
    }

    fn rotate_rpc(&mut self) -> bool {
        let previous = self.endpoints.current().clone();
        match self.endpoints.rotate() {
            Some(next) => {
                info!(from = %previous, to = %next, "rotated RPC endpoint");
                true
            }
            None => {
                warn!(rpc_url = %previous, "RPC rotation unavailable, staying on current endpoint");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> Vec<&'static str> {
        vec!["http://a.local/", "http://b.local/", "http://c.local/"]
    }

    #[test]
    fn test_rotation_wraps_around() {
        let mut endpoints = RpcEndpoints::parse(&urls(), true).unwrap();
        assert_eq!(endpoints.current().as_str(), "http://a.local/");
        assert_eq!(endpoints.rotate().unwrap().as_str(), "http://b.local/");
        assert_eq!(endpoints.rotate().unwrap().as_str(), "http://c.local/");
        assert_eq!(endpoints.rotate().unwrap().as_str(), "http://a.local/");
    }

    #[test]
    fn test_rotation_disabled_is_noop() {
        let mut endpoints = RpcEndpoints::parse(&urls(), false).unwrap();
        assert!(endpoints.rotate().is_none());
        assert_eq!(endpoints.current_index(), 0);
    }

    #[test]
    fn test_single_endpoint_does_not_rotate() {
        let mut endpoints = RpcEndpoints::parse(&["http://a.local/"], true).unwrap();
        assert!(endpoints.rotate().is_none());
    }

    #[test]
    fn test_empty_and_invalid_urls_are_rejected() {
        let empty: Vec<&str> = vec![];
        assert!(matches!(
            RpcEndpoints::parse(&empty, true),
            Err(ChainError::RpcConfigError { .. })
        ));
        assert!(RpcEndpoints::parse(&["not a url"], true).is_err());
    }

    #[test]
    fn test_rotating_chain_follows_endpoint_cursor() {
        let mut chain = RotatingChain::new(&ChainConfig {
            chain_id: 16600,
            rpc_urls: vec!["http://a.local/".into(), "http://b.local/".into()],
            rotation_enabled: true,
            request_timeout_secs: 5,
        })
        .unwrap();

        assert_eq!(chain.rpc_url().as_str(), "http://a.local/");
        assert!(chain.rotate_rpc());
        assert_eq!(chain.rpc_url().as_str(), "http://b.local/");
        assert!(chain.rotate_rpc());
        assert_eq!(chain.rpc_url().as_str(), "http://a.local/");
    }
}
