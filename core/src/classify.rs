use serde::{Deserialize, Serialize};

/// How the retry layers should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    /// Network hiccup; retry with backoff.
    Transient,
    /// The node refused the transaction because of mempool state (full pool,
    /// duplicate, stale nonce, underpriced). Retry with a fresh nonce and a
    /// higher gas price, possibly on another endpoint.
    MempoolCongested,
    /// Anything else. Reported to the caller.
    Fatal,
}

impl ErrorClass {
    pub fn is_mempool(&self) -> bool {
        matches!(self, ErrorClass::MempoolCongested)
    }
}

/// Substring table used to classify raw node and transport error messages.
///
/// Matching is case-insensitive. Mempool patterns take precedence over
/// transient ones, and a message matching neither is `Fatal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorPatterns {
    pub mempool: Vec<String>,
    pub transient: Vec<String>,
}

impl Default for ErrorPatterns {
    fn default() -> Self {
        Self {
            mempool: [
                "mempool is full",
                "already known",
                "nonce too low",
                "transaction underpriced",
                "replacement transaction underpriced",
                "txpool is full",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            transient: [
                "timeout",
                "timed out",
                "connection",
                "rate limit",
                "too many requests",
                "502",
                "503",
                "header not found",
                "eof",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl ErrorPatterns {
    /// Extends the default table with additional patterns.
    pub fn with_extra(mut self, mempool: &[String], transient: &[String]) -> Self {
        self.mempool.extend(mempool.iter().map(|p| p.to_lowercase()));
        self.transient.extend(transient.iter().map(|p| p.to_lowercase()));
        self
    }

    pub fn classify(&self, raw_message: &str) -> ErrorClass {
        let message = raw_message.to_lowercase();

        if self
            .mempool
            .iter()
            .any(|pattern| message.contains(&pattern.to_lowercase()))
        {
            return ErrorClass::MempoolCongested;
        }

        if self
            .transient
            .iter()
            .any(|pattern| message.contains(&pattern.to_lowercase()))
        {
            return ErrorClass::Transient;
        }

        ErrorClass::Fatal
    }

    pub fn is_mempool(&self, raw_message: &str) -> bool {
        self.classify(raw_message).is_mempool()
    }
}
