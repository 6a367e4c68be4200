#![allow(dead_code)]

use std::sync::Arc;

use pilot_core::backoff::{BackoffConfig, BackoffPolicy, FixedJitter};
use pilot_http::{
    captcha::{CaptchaConfig, ScrappeyCaptchaSolver},
    client::{HttpConfig, RetryingHttpClient},
    faucet::{FaucetClient, FaucetConfig},
    proxy::ProxyPool,
};
use wiremock::MockServer;

pub const CAPTCHA_PATH: &str = "/api/v1";
pub const FAUCET_PATH: &str = "/api/faucet";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

// Setup tracing for tests
pub fn setup_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pilot_http=debug,pilot_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

pub fn test_backoff() -> BackoffPolicy {
    BackoffPolicy::new(&BackoffConfig {
        base_wait_ms: 1,
        cap_ms: 5,
        mempool_multiplier: 2.0,
    })
    .with_jitter(Arc::new(FixedJitter(1.0)))
}

pub fn test_http_config(server: &MockServer, max_retries: u32) -> HttpConfig {
    HttpConfig {
        max_retries,
        default_timeout_secs: 5,
        extended_timeout_secs: 10,
        extended_timeout_urls: vec![format!("{}{FAUCET_PATH}", server.uri())],
        proxyless_urls: vec![format!("{}{CAPTCHA_PATH}", server.uri())],
        ..HttpConfig::default()
    }
}

pub fn test_client(server: &MockServer, max_retries: u32) -> RetryingHttpClient {
    RetryingHttpClient::new(
        test_http_config(server, max_retries),
        ProxyPool::default(),
        test_backoff(),
    )
}

pub fn test_solver(server: &MockServer) -> ScrappeyCaptchaSolver {
    ScrappeyCaptchaSolver::new(CaptchaConfig {
        api_url: format!("{}{CAPTCHA_PATH}", server.uri()),
        api_key: "test-key".to_string(),
        timeout_secs: 5,
        ..CaptchaConfig::default()
    })
}

pub fn test_faucet(server: &MockServer) -> FaucetClient<ScrappeyCaptchaSolver> {
    FaucetClient::new(
        FaucetConfig {
            url: format!("{}{FAUCET_PATH}", server.uri()),
            ..FaucetConfig::default()
        },
        test_solver(server),
    )
}

pub async fn requests_to(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == path)
        .count()
}
