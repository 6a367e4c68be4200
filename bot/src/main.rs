use testnet_pilot::{
    config::{self, LogFormat},
    runner::CycleRunner,
};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::get_config()?;

    let subscriber = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "testnet_pilot=info,pilot_executors=info,pilot_http=info,pilot_core=info".into()
        }),
    );

    match config.logging.log_format {
        LogFormat::Json => subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => subscriber.with(tracing_subscriber::fmt::layer()).init(),
    }

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    tracing::info!(
        chain_id = config.chain.chain_id,
        rpc_urls = config.chain.rpc_urls.len(),
        "Configuration loaded"
    );

    let runner = CycleRunner::new(config);
    if let Err(e) = runner.run_forever().await {
        tracing::error!(error = %e, "Bot stopped");
        return Err(e.into());
    }

    Ok(())
}
