use alloy::primitives::{B256, U256};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use pilot_executors::{gas::gwei_to_wei, submitter::CallRequest};
use pilot_http::storage::{SegmentUpload, StorageUploadClient, StorageUploadConfig};
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::StepError;
use crate::{config::CountRange, contracts::storage_submit_calldata, session::WalletSession};

/// A throwaway file: base64 text of random bytes, rooted at the sha256 of
/// that text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomFile {
    pub content: String,
    pub root: B256,
}

impl RandomFile {
    pub fn generate(min_bytes: usize, max_bytes: usize) -> Self {
        let mut rng = rand::rng();
        let len = rng.random_range(min_bytes..=max_bytes.max(min_bytes));
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        Self::from_content(BASE64_STANDARD.encode(bytes))
    }

    pub fn from_content(content: String) -> Self {
        let root = B256::from_slice(&Sha256::digest(content.as_bytes()));
        Self { content, root }
    }
}

#[tracing::instrument(skip_all)]
pub async fn run(session: &mut WalletSession<'_>) -> Result<(), StepError> {
    let settings = &session.config().steps.storage;
    let flow = settings.flow_contract();
    let fee = U256::from(gwei_to_wei(settings.fee_gwei));
    let uploader = StorageUploadClient::new(StorageUploadConfig {
        indexer_url: settings.indexer_url(),
        timeout_secs: settings.upload_timeout_secs,
    });

    let count = CountRange::new(settings.min_files, settings.max_files).sample();
    info!(count, flow = %flow, "Uploading files to storage");

    for i in 0..count {
        let file = RandomFile::generate(settings.min_file_bytes, settings.max_file_bytes);
        let request = CallRequest::call(
            format!("storage file {}", i + 1),
            flow,
            storage_submit_calldata(file.content.len(), file.root),
        )
        .with_value(fee)
        .with_gas_limit(settings.gas_limit);

        let outcome = session.submit_confirmed(&request).await?;
        info!(
            file = i + 1,
            root = %file.root,
            size = file.content.len(),
            tx_hash = %outcome.tx_hash(),
            "File submitted"
        );

        let segment = SegmentUpload::single(file.root.to_string(), file.content.as_bytes());
        match uploader.upload_segment(session.http(), &segment).await {
            Ok(()) => info!(root = %file.root, "Segment uploaded"),
            Err(e) => warn!(root = %file.root, error = %e, "Segment upload failed, file stays registered"),
        }

        if i + 1 < count {
            session.pause(settings.file_delay).await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::b256;

    use super::*;

    #[test]
    fn test_root_is_sha256_of_content_text() {
        let file = RandomFile::from_content("aGVsbG8=".to_string());
        assert_eq!(
            file.root,
            b256!("333d6b3a3c1f5db6c9bdda5939b136986d170f4649172a68368d54ecb44c2ff2")
        );
    }

    #[test]
    fn test_generated_content_is_base64_of_bounded_bytes() {
        for _ in 0..20 {
            let file = RandomFile::generate(10, 200);
            let decoded = BASE64_STANDARD.decode(&file.content).unwrap();
            assert!((10..=200).contains(&decoded.len()));
            assert_eq!(file, RandomFile::from_content(file.content.clone()));
        }
    }
}
