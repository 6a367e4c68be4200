use alloy::transports::{RpcError as AlloyRpcError, TransportErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    chain::Chain,
    classify::{ErrorClass, ErrorPatterns},
};

#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcErrorKind {
    /// Server returned an error response.
    #[error("server returned an error response: {}", .0.as_display())]
    ErrorResp(RpcErrorResponse),

    /// Server returned a null response when a non-null response was expected.
    #[error("server returned a null response when a non-null response was expected")]
    NullResp,

    /// Rpc server returned an unsupported feature.
    #[error("unsupported feature: {message}")]
    UnsupportedFeature { message: String },

    /// Returned when a local pre-processing step fails.
    #[error("local usage error: {message}")]
    InternalError { message: String },

    #[error("serialization error: {message}")]
    SerError { message: String },

    #[error("deserialization error: {message}, text: {text}")]
    DeserError { message: String, text: String },

    #[error("HTTP error {status}")]
    TransportHttpError { status: u16, body: String },

    #[error("Other transport error: {message}")]
    OtherTransportError { message: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcErrorResponse {
    /// The error code.
    pub code: i64,
    /// The error message (if any).
    pub message: String,
    /// The error data (if any).
    pub data: Option<String>,
}

impl RpcErrorResponse {
    pub fn as_display(&self) -> String {
        format!(
            "code {}: {}{}",
            self.code,
            self.message,
            self.data
                .as_ref()
                .map(|data| format!(", data: {data}"))
                .unwrap_or_default()
        )
    }
}

#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainError {
    #[error("RPC error on chain {chain_id} ({rpc_url}): {message}")]
    RpcError {
        chain_id: u64,
        rpc_url: String,
        message: String,
        kind: RpcErrorKind,
    },

    #[error("RPC configuration error: {message}")]
    RpcConfigError { message: String },

    #[error("Endpoint {rpc_url} serves chain {reported}, configured chain is {configured}")]
    ChainIdMismatch {
        configured: u64,
        reported: u64,
        rpc_url: String,
    },

    #[error("Invalid private key: {message}")]
    InvalidPrivateKey { message: String },

    #[error("Signing failed: {message}")]
    SigningError { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl ChainError {
    /// The node-facing part of the error, used for pattern classification.
    pub fn message(&self) -> &str {
        match self {
            ChainError::RpcError { kind, message, .. } => match kind {
                RpcErrorKind::ErrorResp(resp) => &resp.message,
                _ => message,
            },
            ChainError::ChainIdMismatch { .. } => "chain id mismatch",
            ChainError::RpcConfigError { message }
            | ChainError::InvalidPrivateKey { message }
            | ChainError::SigningError { message }
            | ChainError::InternalError { message } => message,
        }
    }

    pub fn classify(&self, patterns: &ErrorPatterns) -> ErrorClass {
        match self {
            ChainError::RpcError { kind, .. } => match kind {
                RpcErrorKind::ErrorResp(resp) => patterns.classify(&resp.message),
                RpcErrorKind::TransportHttpError { status, body } => {
                    if matches!(status, 408 | 429 | 500 | 502 | 503 | 504) {
                        ErrorClass::Transient
                    } else {
                        patterns.classify(body)
                    }
                }
                RpcErrorKind::OtherTransportError { .. } | RpcErrorKind::NullResp => {
                    ErrorClass::Transient
                }
                RpcErrorKind::DeserError { text, .. } => patterns.classify(text),
                RpcErrorKind::UnsupportedFeature { .. }
                | RpcErrorKind::InternalError { .. }
                | RpcErrorKind::SerError { .. } => ErrorClass::Fatal,
            },
            _ => ErrorClass::Fatal,
        }
    }
}

pub trait AlloyRpcErrorToChainError {
    fn to_chain_error(&self, chain: &impl Chain) -> ChainError;
}

fn to_rpc_error_kind(err: &AlloyRpcError<TransportErrorKind>) -> RpcErrorKind {
    match err {
        AlloyRpcError::ErrorResp(err) => RpcErrorKind::ErrorResp(RpcErrorResponse {
            code: err.code,
            message: err.message.to_string(),
            data: err.data.as_ref().map(|data| data.to_string()),
        }),
        AlloyRpcError::NullResp => RpcErrorKind::NullResp,
        AlloyRpcError::UnsupportedFeature(feature) => RpcErrorKind::UnsupportedFeature {
            message: feature.to_string(),
        },
        AlloyRpcError::LocalUsageError(err) => RpcErrorKind::InternalError {
            message: err.to_string(),
        },
        AlloyRpcError::SerError(err) => RpcErrorKind::SerError {
            message: err.to_string(),
        },
        AlloyRpcError::DeserError { err, text } => RpcErrorKind::DeserError {
            message: err.to_string(),
            text: text.to_string(),
        },
        AlloyRpcError::Transport(err) => match err {
            TransportErrorKind::HttpError(err) => RpcErrorKind::TransportHttpError {
                status: err.status,
                body: err.body.to_string(),
            },
            _ => RpcErrorKind::OtherTransportError {
                message: err.to_string(),
            },
        },
    }
}

impl AlloyRpcErrorToChainError for AlloyRpcError<TransportErrorKind> {
    fn to_chain_error(&self, chain: &impl Chain) -> ChainError {
        ChainError::RpcError {
            chain_id: chain.chain_id(),
            rpc_url: chain.rpc_url().to_string(),
            message: self.to_string(),
            kind: to_rpc_error_kind(self),
        }
    }
}
