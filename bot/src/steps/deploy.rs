use alloy::primitives::{Bytes, bytes};
use pilot_executors::submitter::CallRequest;
use tracing::info;

use super::StepError;
use crate::session::WalletSession;

/// Creation code of a minimal storage contract exposing `set(uint256)` and `get()`.
pub fn init_code() -> Bytes {
    bytes!(
        "608060405234801561001057600080fd5b50610150806100206000396000f3fe608060405234801561001057600080fd5b50600436106100365760003560e01c806360fe47b11461003b5780636d4ce63c14610057575b600080fd5b610055600480360381019061005091906100c3565b610075565b005b61005f61007f565b60405161006c91906100ff565b60405180910390f35b8060008190555050565b60008054905090565b600080fd5b6000819050919050565b6100a08161008d565b81146100ab57600080fd5b50565b6000813590506100bd81610097565b92915050565b6000602082840312156100d9576100d8610088565b5b60006100e7848285016100ae565b91505092915050565b6100f98161008d565b82525050565b600060208201905061011460008301846100f0565b9291505056fe"
    )
}

pub async fn run(session: &mut WalletSession<'_>) -> Result<(), StepError> {
    let request = CallRequest::create("contract deploy", init_code());
    let outcome = session.submit_confirmed(&request).await?;

    let contract = outcome.receipt().and_then(|receipt| receipt.contract_address);
    info!(tx_hash = %outcome.tx_hash(), contract = ?contract, "Contract deployed");
    Ok(())
}
