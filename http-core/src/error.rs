use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single HTTP attempt produced no response. Retried by the client,
/// never surfaced past it.
#[derive(Error, Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HttpClientError {
    #[error("Failed to build HTTP client: {message}")]
    ClientBuild { message: String },

    #[error("Invalid proxy {proxy}: {message}")]
    InvalidProxy { proxy: String, message: String },

    #[error(transparent)]
    Transport {
        #[from]
        error: SerializableReqwestError,
    },
}

impl HttpClientError {
    pub fn client_build(error: reqwest::Error) -> Self {
        Self::ClientBuild {
            message: error.to_string(),
        }
    }
}

/// `reqwest::Error` flattened into something that can be cloned and logged
/// as structured data.
#[derive(Error, Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SerializableReqwestError {
    #[error("request timed out: {message}")]
    Timeout { message: String, url: Option<String> },

    #[error("connection failed: {message}")]
    Connect { message: String, url: Option<String> },

    #[error("request error: {message}")]
    Request { message: String, url: Option<String> },

    #[error("body error: {message}")]
    Body { message: String, url: Option<String> },

    #[error("redirect error: {message}")]
    Redirect { message: String, url: Option<String> },

    #[error("{message}")]
    Other { message: String, url: Option<String> },
}

impl From<reqwest::Error> for SerializableReqwestError {
    fn from(error: reqwest::Error) -> Self {
        let message = error.to_string();
        let url = error.url().map(|u| u.to_string());

        if error.is_timeout() {
            Self::Timeout { message, url }
        } else if error.is_connect() {
            Self::Connect { message, url }
        } else if error.is_body() || error.is_decode() {
            Self::Body { message, url }
        } else if error.is_redirect() {
            Self::Redirect { message, url }
        } else if error.is_request() {
            Self::Request { message, url }
        } else {
            Self::Other { message, url }
        }
    }
}
