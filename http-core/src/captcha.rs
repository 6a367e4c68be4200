use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::client::{CAPTCHA_API_URL, RequestOptions, RetryingHttpClient};

/// JSON pointers checked, in order, for the solved token.
pub const TOKEN_POINTERS: [&str; 5] = [
    "/solution/javascriptReturn/0",
    "/solution/token",
    "/solution/response",
    "/solution/captchaToken",
    "/token",
];

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptchaError {
    #[error("Captcha API key is not configured")]
    MissingApiKey,

    #[error("Captcha request to {url} did not complete")]
    RequestFailed { url: String },

    #[error("Captcha API returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Captcha API returned invalid JSON: {message}")]
    InvalidResponse { message: String },

    #[error("Captcha API response contained no token")]
    NoSolution,
}

/// Something that can produce an hCaptcha token for the faucet.
pub trait CaptchaSolver: Send + Sync {
    fn solve(
        &self,
        http: &mut RetryingHttpClient,
    ) -> impl Future<Output = Result<String, CaptchaError>> + Send;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    pub api_url: String,
    pub api_key: String,
    pub site_key: String,
    pub site_url: String,
    pub timeout_secs: u64,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            api_url: CAPTCHA_API_URL.to_string(),
            api_key: String::new(),
            site_key: "914e63b4-ac20-4c24-bc92-cdb6950ccfde".to_string(),
            site_url: "https://faucet.0g.ai".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Solves hCaptcha through the Scrappey browser API.
///
/// The request itself goes out directly; the pool proxy, if any, is passed in
/// the body so the remote browser uses it.
#[derive(Debug, Clone)]
pub struct ScrappeyCaptchaSolver {
    config: CaptchaConfig,
}

impl ScrappeyCaptchaSolver {
    pub fn new(config: CaptchaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptchaConfig {
        &self.config
    }

    pub fn request_body(&self, proxy: Option<&str>) -> Value {
        let mut body = json!({
            "cmd": "request.get",
            "url": self.config.site_url,
            "dontLoadMainSite": true,
            "filter": ["javascriptReturn"],
            "browserActions": [{
                "type": "solve_captcha",
                "captcha": "hcaptcha",
                "captchaData": { "sitekey": self.config.site_key }
            }]
        });
        if let (Some(proxy), Some(map)) = (proxy, body.as_object_mut()) {
            map.insert("proxy".to_string(), Value::String(proxy.to_string()));
        }
        body
    }
}

impl CaptchaSolver for ScrappeyCaptchaSolver {
    #[tracing::instrument(skip_all, name = "solve_captcha")]
    async fn solve(&self, http: &mut RetryingHttpClient) -> Result<String, CaptchaError> {
        if self.config.api_key.trim().is_empty() {
            return Err(CaptchaError::MissingApiKey);
        }

        let proxy = http.rotate_proxy().map(str::to_string);
        info!(proxied = proxy.is_some(), "Solving captcha");

        let options = RequestOptions::default()
            .query("key", self.config.api_key.clone())
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(self.request_body(proxy.as_deref()));

        let outcome = http.post(&self.config.api_url, options).await;
        let Some(response) = outcome.response else {
            return Err(CaptchaError::RequestFailed {
                url: self.config.api_url.clone(),
            });
        };

        if response.status != 200 {
            warn!(status = response.status, "Captcha API rejected request");
            return Err(CaptchaError::UnexpectedStatus {
                status: response.status,
                body: response.body,
            });
        }

        let value: Value = response
            .json()
            .map_err(|e| CaptchaError::InvalidResponse {
                message: e.to_string(),
            })?;

        let token = extract_token(&value).ok_or(CaptchaError::NoSolution)?;
        info!("Captcha solved");
        Ok(token)
    }
}

pub fn extract_token(value: &Value) -> Option<String> {
    TOKEN_POINTERS.iter().find_map(|pointer| {
        value
            .pointer(pointer)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}
