use std::{collections::HashMap, time::Duration};

use pilot_core::{backoff::BackoffPolicy, classify::ErrorClass};
use reqwest::Method;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::{HttpClientError, SerializableReqwestError},
    proxy::{ProxyPool, normalize_proxy_url},
};

pub const FAUCET_URL: &str = "https://faucet.0g.ai/api/faucet";
pub const CAPTCHA_API_URL: &str = "https://publisher.scrappey.com/api/v1";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Total number of attempts per request.
    pub max_retries: u32,
    pub retryable_statuses: Vec<u16>,
    pub default_timeout_secs: u64,
    pub extended_timeout_secs: u64,
    /// Destinations that always use the extended timeout.
    pub extended_timeout_urls: Vec<String>,
    /// Destinations reached directly, never through a pool proxy.
    pub proxyless_urls: Vec<String>,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retryable_statuses: vec![408, 429, 500, 502, 503, 504],
            default_timeout_secs: 30,
            extended_timeout_secs: 180,
            extended_timeout_urls: vec![FAUCET_URL.to_string()],
            proxyless_urls: vec![CAPTCHA_API_URL.to_string()],
            user_agent: USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    json: Option<serde_json::Value>,
    timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Result of [`RetryingHttpClient::execute`].
///
/// `transport_completed` means an HTTP response with a non-retryable status was
/// received. It says nothing about whether the remote operation succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOutcome {
    pub response: Option<HttpResponse>,
    pub transport_completed: bool,
}

impl HttpOutcome {
    fn exhausted() -> Self {
        Self {
            response: None,
            transport_completed: false,
        }
    }
}

/// HTTP client that retries transport failures and retryable statuses,
/// drawing a fresh proxy from the pool before each retry.
#[derive(Debug)]
pub struct RetryingHttpClient {
    config: HttpConfig,
    proxies: ProxyPool,
    current_proxy: Option<String>,
    backoff: BackoffPolicy,
    // reqwest binds proxies at build time, so one client per proxy
    clients: HashMap<Option<String>, reqwest::Client>,
}

impl RetryingHttpClient {
    pub fn new(config: HttpConfig, proxies: ProxyPool, backoff: BackoffPolicy) -> Self {
        let current_proxy = proxies.random_proxy().map(str::to_string);
        Self {
            config,
            proxies,
            current_proxy,
            backoff,
            clients: HashMap::new(),
        }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    pub fn proxies(&self) -> &ProxyPool {
        &self.proxies
    }

    pub fn current_proxy(&self) -> Option<&str> {
        self.current_proxy.as_deref()
    }

    /// Replaces the pool, e.g. after the proxy file was reloaded.
    pub fn set_proxies(&mut self, proxies: ProxyPool) {
        self.proxies = proxies;
        self.current_proxy = self.proxies.random_proxy().map(str::to_string);
        self.clients.clear();
    }

    /// Draws a new proxy and makes it current.
    pub fn rotate_proxy(&mut self) -> Option<&str> {
        self.current_proxy = self.proxies.random_proxy().map(str::to_string);
        if let Some(proxy) = &self.current_proxy {
            debug!(proxy = %proxy, "Switched proxy");
        }
        self.current_proxy.as_deref()
    }

    pub fn timeout_for(&self, url: &str, requested: Option<Duration>) -> Duration {
        if matches_any(url, &self.config.extended_timeout_urls) {
            Duration::from_secs(self.config.extended_timeout_secs)
        } else {
            requested.unwrap_or(Duration::from_secs(self.config.default_timeout_secs))
        }
    }

    pub fn is_proxyless(&self, url: &str) -> bool {
        matches_any(url, &self.config.proxyless_urls)
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.config.retryable_statuses.contains(&status)
    }

    pub async fn get(&mut self, url: &str, options: RequestOptions) -> HttpOutcome {
        self.execute(Method::GET, url, options).await
    }

    pub async fn post(&mut self, url: &str, options: RequestOptions) -> HttpOutcome {
        self.execute(Method::POST, url, options).await
    }

    /// Sends the request, retrying up to `max_retries` total attempts.
    ///
    /// Never returns an error: exhaustion yields an outcome with no response.
    #[tracing::instrument(skip_all, fields(method = %method, url = %url))]
    pub async fn execute(&mut self, method: Method, url: &str, options: RequestOptions) -> HttpOutcome {
        let proxyless = self.is_proxyless(url);
        let timeout = self.timeout_for(url, options.timeout);
        let max_retries = self.config.max_retries;

        let mut attempt = 0;
        while attempt < max_retries {
            let proxy = if proxyless {
                None
            } else {
                self.current_proxy.clone()
            };

            match self.send_once(&method, url, &options, proxy, timeout).await {
                Ok(response) if !self.is_retryable_status(response.status) => {
                    debug!(status = response.status, attempt, "Received HTTP response");
                    return HttpOutcome {
                        response: Some(response),
                        transport_completed: true,
                    };
                }
                Ok(response) => {
                    warn!(
                        status = response.status,
                        attempt = attempt + 1,
                        max_retries,
                        "Retryable HTTP status"
                    );
                }
                Err(error) => {
                    warn!(
                        error = %error,
                        attempt = attempt + 1,
                        max_retries,
                        "HTTP request failed"
                    );
                }
            }

            attempt += 1;
            if attempt >= max_retries {
                break;
            }

            let delay = self.backoff.delay(attempt - 1, ErrorClass::Transient);
            tokio::time::sleep(delay).await;

            if !proxyless {
                self.rotate_proxy();
            }
        }

        warn!(attempts = attempt, "HTTP retries exhausted");
        HttpOutcome::exhausted()
    }

    async fn send_once(
        &mut self,
        method: &Method,
        url: &str,
        options: &RequestOptions,
        proxy: Option<String>,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpClientError> {
        let client = self.client_for(proxy)?;

        let mut request = client.request(method.clone(), url).timeout(timeout);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.json {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(SerializableReqwestError::from)?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(SerializableReqwestError::from)?;

        Ok(HttpResponse { status, body })
    }

    fn client_for(&mut self, proxy: Option<String>) -> Result<reqwest::Client, HttpClientError> {
        if let Some(client) = self.clients.get(&proxy) {
            return Ok(client.clone());
        }

        let mut builder = reqwest::Client::builder().user_agent(self.config.user_agent.clone());
        if let Some(proxy) = &proxy {
            let proxy_url = normalize_proxy_url(proxy);
            let reqwest_proxy =
                reqwest::Proxy::all(&proxy_url).map_err(|e| HttpClientError::InvalidProxy {
                    proxy: proxy.clone(),
                    message: e.to_string(),
                })?;
            builder = builder.proxy(reqwest_proxy);
        } else {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(HttpClientError::client_build)?;
        self.clients.insert(proxy, client.clone());
        Ok(client)
    }
}

/// Compares scheme, host, port and path; query strings are ignored.
fn matches_any(url: &str, candidates: &[String]) -> bool {
    let Some(target) = endpoint_key(url) else {
        return candidates.iter().any(|c| c == url);
    };
    candidates
        .iter()
        .filter_map(|c| endpoint_key(c))
        .any(|c| c == target)
}

fn endpoint_key(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some(parsed.as_str().trim_end_matches('/').to_string())
}
