use std::path::Path;

use pilot_http::proxy::ProxyPool;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum WalletFileError {
    #[error("Failed to read private key file {path}: {message}")]
    Read { path: String, message: String },
}

/// Non-empty trimmed lines.
pub fn parse_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// One key per line. An unreadable file is fatal for the cycle.
pub async fn load_private_keys(path: impl AsRef<Path>) -> Result<Vec<String>, WalletFileError> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| WalletFileError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let keys = parse_lines(&contents);
    if keys.is_empty() {
        warn!(path = %path.display(), "Private key file contains no keys");
    } else {
        info!(count = keys.len(), "Loaded private keys");
    }
    Ok(keys)
}

/// One proxy per line. A missing file means direct connections.
pub async fn load_proxies(path: impl AsRef<Path>) -> ProxyPool {
    let path = path.as_ref();
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            let pool = ProxyPool::from_lines(&contents);
            info!(count = pool.len(), "Loaded proxies");
            pool
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Proxy file unavailable, connecting directly");
            ProxyPool::default()
        }
    }
}
