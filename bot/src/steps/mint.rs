use pilot_executors::submitter::CallRequest;
use rand::seq::IndexedRandom;
use tracing::{info, warn};

use super::{StepError, submit_item};
use crate::{
    config::{DomainMintConfig, MintStepConfig, NftMintConfig},
    contracts::{domain_mint_calldata, mint_calldata},
    session::WalletSession,
};

const NAME_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub fn random_name(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .filter_map(|_| NAME_ALPHABET.choose(&mut rng).map(|&c| c as char))
        .collect()
}

/// NFT mints then domain mints. A mint that keeps failing is logged and
/// skipped.
#[tracing::instrument(skip_all)]
pub async fn run(session: &mut WalletSession<'_>) -> Result<(), StepError> {
    let settings = &session.config().steps.mint;
    session.submitter_mut().reset_nonce();

    if settings.nft.enabled {
        mint_nfts(session, settings, &settings.nft).await;
    }
    if settings.domain.enabled {
        mint_domains(session, settings, &settings.domain).await;
    }
    Ok(())
}

async fn mint_nfts(session: &mut WalletSession<'_>, settings: &MintStepConfig, nft: &NftMintConfig) {
    if nft.contracts.is_empty() {
        warn!("No NFT contracts configured");
        return;
    }

    let count = nft.count.sample();
    info!(count, "Minting NFTs");

    for i in 0..count as usize {
        let contract = &nft.contracts[i % nft.contracts.len()];
        let request = CallRequest::call(format!("mint {}", contract.name), contract.address, mint_calldata())
            .with_default_gas_limit(nft.default_gas_limit);

        if submit_item(session, &request, settings.item_retries).await {
            info!(collection = %contract.name, n = i + 1, "NFT minted");
        }

        if i + 1 < count as usize {
            session.pause(settings.item_delay).await;
        }
    }
}

async fn mint_domains(
    session: &mut WalletSession<'_>,
    settings: &MintStepConfig,
    domain: &DomainMintConfig,
) {
    let count = domain.count.sample();
    info!(count, "Minting domains");

    for i in 0..count {
        let name = random_name(domain.name_length.sample() as usize);
        let request = CallRequest::call(
            format!("domain {name}"),
            domain.contract,
            domain_mint_calldata(&name),
        )
        .with_default_gas_limit(domain.default_gas_limit);

        if submit_item(session, &request, settings.item_retries).await {
            info!(domain = %name, "Domain minted");
        }

        if i + 1 < count {
            session.pause(settings.item_delay).await;
        }
    }
}
