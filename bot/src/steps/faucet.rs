use pilot_http::{captcha::ScrappeyCaptchaSolver, faucet::FaucetClient};
use tracing::info;

use super::StepError;
use crate::session::WalletSession;

pub async fn run(session: &mut WalletSession<'_>) -> Result<(), StepError> {
    let config = session.config();
    let faucet = FaucetClient::new(
        config.faucet.clone(),
        ScrappeyCaptchaSolver::new(config.captcha.clone()),
    );

    let address = session.address().to_string();
    let outcome = faucet
        .claim_with_captcha(session.http(), &address, config.steps.faucet.captcha_attempts)
        .await?;

    info!(outcome = ?outcome, "Faucet step finished");
    Ok(())
}
