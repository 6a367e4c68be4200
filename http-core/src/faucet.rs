use pilot_core::classify::ErrorClass;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    captcha::{CaptchaError, CaptchaSolver},
    client::{FAUCET_URL, RequestOptions, RetryingHttpClient},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetConfig {
    pub url: String,
    pub origin: String,
    pub referer: String,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            url: FAUCET_URL.to_string(),
            origin: "https://faucet.0g.ai".to_string(),
            referer: "https://faucet.0g.ai/".to_string(),
        }
    }
}

/// What the faucet said about a claim, read from the `message` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum FaucetOutcome {
    Cooldown { message: String },
    Claimed { tx_hash: String },
    InvalidCaptcha { message: String },
    Rejected { message: String },
}

impl FaucetOutcome {
    pub fn from_message(message: Option<&str>) -> Self {
        let Some(message) = message else {
            return Self::Rejected {
                message: "missing message".to_string(),
            };
        };

        if message.contains("hour") {
            return Self::Cooldown {
                message: message.to_string(),
            };
        }
        if let Some((_, hash)) = message.split_once("hash:") {
            return Self::Claimed {
                tx_hash: hash.trim().to_string(),
            };
        }
        if message.starts_with("0x") {
            return Self::Claimed {
                tx_hash: message.trim().to_string(),
            };
        }
        if message.to_lowercase().contains("invalid captcha") {
            return Self::InvalidCaptcha {
                message: message.to_string(),
            };
        }

        Self::Rejected {
            message: message.to_string(),
        }
    }

    /// Cooldown counts: there is nothing to do until it expires.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Cooldown { .. } | Self::Claimed { .. })
    }
}

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaucetError {
    #[error("Faucet request to {url} did not complete")]
    RequestFailed { url: String },

    #[error("Captcha failed: {inner_error}")]
    Captcha { inner_error: CaptchaError },

    #[error("Faucet claim failed after {attempts} attempts: {last:?}")]
    AttemptsExhausted {
        attempts: u32,
        last: Option<FaucetOutcome>,
    },
}

impl From<CaptchaError> for FaucetError {
    fn from(inner_error: CaptchaError) -> Self {
        Self::Captcha { inner_error }
    }
}

#[derive(Debug, Clone)]
pub struct FaucetClient<S> {
    config: FaucetConfig,
    solver: S,
}

impl<S: CaptchaSolver> FaucetClient<S> {
    pub fn new(config: FaucetConfig, solver: S) -> Self {
        Self { config, solver }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Submits one claim with an already solved captcha token.
    #[tracing::instrument(skip_all, fields(address = %address))]
    pub async fn claim(
        &self,
        http: &mut RetryingHttpClient,
        address: &str,
        token: &str,
    ) -> Result<FaucetOutcome, FaucetError> {
        let options = RequestOptions::default()
            .header("Content-Type", "application/json")
            .header("Origin", self.config.origin.clone())
            .header("Referer", self.config.referer.clone())
            .json(json!({ "address": address, "hcaptchaToken": token }));

        let outcome = http.post(&self.config.url, options).await;
        let Some(response) = outcome.response else {
            return Err(FaucetError::RequestFailed {
                url: self.config.url.clone(),
            });
        };

        let message = response
            .json::<Value>()
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string));
        if message.is_none() {
            warn!(status = response.status, body = %response.body, "Faucet response has no message");
        }

        let result = FaucetOutcome::from_message(message.as_deref());
        match &result {
            FaucetOutcome::Claimed { tx_hash } => info!(tx_hash = %tx_hash, "Faucet claimed"),
            FaucetOutcome::Cooldown { message } => info!(message = %message, "Faucet on cooldown"),
            FaucetOutcome::InvalidCaptcha { message } => warn!(message = %message, "Faucet rejected captcha"),
            FaucetOutcome::Rejected { message } => {
                warn!(status = response.status, message = %message, "Faucet rejected claim")
            }
        }
        Ok(result)
    }

    /// Solves a fresh captcha for every attempt until a successful outcome.
    pub async fn claim_with_captcha(
        &self,
        http: &mut RetryingHttpClient,
        address: &str,
        attempts: u32,
    ) -> Result<FaucetOutcome, FaucetError> {
        let attempts = attempts.max(1);
        let mut last = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = http.backoff().delay(attempt - 1, ErrorClass::Transient);
                tokio::time::sleep(delay).await;
            }

            let token = match self.solver.solve(http).await {
                Ok(token) => token,
                Err(e) => {
                    error!(attempt = attempt + 1, error = %e, "Captcha solve failed");
                    if attempt + 1 == attempts {
                        return Err(e.into());
                    }
                    continue;
                }
            };

            let outcome = self.claim(http, address, &token).await?;
            if outcome.is_success() {
                return Ok(outcome);
            }
            last = Some(outcome);
        }

        Err(FaucetError::AttemptsExhausted { attempts, last })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_message() {
        let outcome =
            FaucetOutcome::from_message(Some("Please wait 6 hours before requesting again"));
        assert!(matches!(outcome, FaucetOutcome::Cooldown { .. }));
        assert!(outcome.is_success());
    }

    #[test]
    fn test_claimed_message() {
        assert_eq!(
            FaucetOutcome::from_message(Some("Sent! tx hash: 0xabc ")),
            FaucetOutcome::Claimed {
                tx_hash: "0xabc".to_string()
            }
        );
        assert_eq!(
            FaucetOutcome::from_message(Some("0xdef")),
            FaucetOutcome::Claimed {
                tx_hash: "0xdef".to_string()
            }
        );
    }

    #[test]
    fn test_failure_messages() {
        let outcome = FaucetOutcome::from_message(Some("Invalid Captcha"));
        assert!(matches!(outcome, FaucetOutcome::InvalidCaptcha { .. }));
        assert!(!outcome.is_success());

        assert!(matches!(
            FaucetOutcome::from_message(Some("Internal error")),
            FaucetOutcome::Rejected { .. }
        ));
        assert!(matches!(
            FaucetOutcome::from_message(None),
            FaucetOutcome::Rejected { .. }
        ));
    }
}
