use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::client::{RequestOptions, RetryingHttpClient};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageUploadConfig {
    pub indexer_url: String,
    pub timeout_secs: u64,
}

impl Default for StorageUploadConfig {
    fn default() -> Self {
        Self {
            indexer_url: "https://indexer-storage-testnet-turbo.0g.ai".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageUploadError {
    #[error("Segment upload to {url} did not complete")]
    RequestFailed { url: String },

    #[error("Segment upload rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentUpload {
    pub root: String,
    pub index: u64,
    pub data: String,
    pub proof: Vec<String>,
}

impl SegmentUpload {
    /// Whole file as segment 0 with an empty proof.
    pub fn single(root: impl Into<String>, content: &[u8]) -> Self {
        Self {
            root: root.into(),
            index: 0,
            data: BASE64_STANDARD.encode(content),
            proof: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageUploadClient {
    config: StorageUploadConfig,
}

impl StorageUploadClient {
    pub fn new(config: StorageUploadConfig) -> Self {
        Self { config }
    }

    pub fn segment_url(&self) -> String {
        format!("{}/file/segment", self.config.indexer_url.trim_end_matches('/'))
    }

    #[tracing::instrument(skip_all, fields(root = %segment.root))]
    pub async fn upload_segment(
        &self,
        http: &mut RetryingHttpClient,
        segment: &SegmentUpload,
    ) -> Result<(), StorageUploadError> {
        let url = self.segment_url();
        let body = json!({
            "root": segment.root,
            "index": segment.index,
            "data": segment.data,
            "proof": segment.proof,
        });

        let options = RequestOptions::default()
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(body);

        let outcome = http.post(&url, options).await;
        let Some(response) = outcome.response else {
            return Err(StorageUploadError::RequestFailed { url });
        };

        if response.status != 200 {
            warn!(status = response.status, "Segment upload rejected");
            return Err(StorageUploadError::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        info!("Segment uploaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_segment_payload() {
        let segment = SegmentUpload::single("0xabc", b"hello");
        let value = serde_json::to_value(&segment).unwrap();
        assert_eq!(
            value,
            json!({ "root": "0xabc", "index": 0, "data": "aGVsbG8=", "proof": [] })
        );
    }

    #[test]
    fn test_segment_url() {
        let client = StorageUploadClient::new(StorageUploadConfig {
            indexer_url: "https://indexer.example/".to_string(),
            timeout_secs: 1,
        });
        assert_eq!(client.segment_url(), "https://indexer.example/file/segment");
    }
}
