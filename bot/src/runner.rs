use std::time::Duration;

use pilot_core::backoff::BackoffPolicy;
use pilot_http::client::RetryingHttpClient;
use serde::Serialize;
use thiserror::Error;
use tracing::{Instrument, error, field, info, info_span, warn};

use crate::{
    config::BotConfig,
    session::WalletSession,
    wallets::{WalletFileError, load_private_keys, load_proxies},
};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Wallets(#[from] WalletFileError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletStatus {
    Succeeded,
    Failed,
    /// The key could not be turned into an account or chain client.
    Skipped,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl CycleReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    fn record(&mut self, status: WalletStatus) {
        match status {
            WalletStatus::Succeeded => self.succeeded += 1,
            WalletStatus::Failed => self.failed += 1,
            WalletStatus::Skipped => self.skipped += 1,
        }
    }
}

/// Processes every wallet in the key file, one at a time, then sleeps until
/// the next cycle.
pub struct CycleRunner {
    config: BotConfig,
}

impl CycleRunner {
    pub fn new(config: BotConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Only a key file read failure ends the loop.
    pub async fn run_forever(&self) -> Result<(), RunnerError> {
        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            let report = self
                .run_cycle()
                .instrument(info_span!("cycle", cycle))
                .await?;
            info!(
                cycle,
                total = report.total(),
                succeeded = report.succeeded,
                failed = report.failed,
                skipped = report.skipped,
                "Cycle finished"
            );
            self.wait_for_next_cycle().await;
        }
    }

    /// Keys and proxies are re-read every cycle so edits take effect
    /// without a restart.
    pub async fn run_cycle(&self) -> Result<CycleReport, RunnerError> {
        let keys = load_private_keys(&self.config.files.private_keys).await?;
        let proxies = load_proxies(&self.config.files.proxies).await;
        let mut http = RetryingHttpClient::new(
            self.config.http.clone(),
            proxies,
            BackoffPolicy::new(&self.config.backoff),
        );

        Ok(self.process_wallets(&keys, &mut http).await)
    }

    pub async fn process_wallets(&self, keys: &[String], http: &mut RetryingHttpClient) -> CycleReport {
        let mut report = CycleReport::default();
        info!(wallets = keys.len(), "Starting wallet batch");

        for (i, key) in keys.iter().enumerate() {
            let index = i + 1;
            let span = info_span!("wallet", index, address = field::Empty);
            let status = self.process_wallet(index, key, http).instrument(span).await;
            report.record(status);

            if index < keys.len() {
                let delay = self.config.cycle.wallet_delay.sample();
                info!(delay_secs = delay.as_secs(), "Waiting before next wallet");
                tokio::time::sleep(delay).await;
            }
        }

        report
    }

    pub async fn process_wallet(
        &self,
        index: usize,
        private_key: &str,
        http: &mut RetryingHttpClient,
    ) -> WalletStatus {
        if let Some(proxy) = http.rotate_proxy() {
            info!(proxy = %proxy, "Using proxy");
        }

        let mut session = match WalletSession::open(index, private_key, &self.config, http) {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Cannot set up wallet, skipping");
                return WalletStatus::Skipped;
            }
        };
        tracing::Span::current().record("address", field::display(session.address()));
        info!("Processing wallet");

        let report = session.run().await;
        if report.is_success() {
            info!(steps = report.completed.len(), replaced = report.replaced, "Wallet finished");
            WalletStatus::Succeeded
        } else {
            warn!(
                completed = report.completed.len(),
                failed = ?report.failed,
                replaced = report.replaced,
                "Wallet finished with a failed step"
            );
            WalletStatus::Failed
        }
    }

    /// Sleeps `cycle_hours`, logging the remaining time every
    /// `countdown_log_interval_secs`.
    pub async fn wait_for_next_cycle(&self) {
        let total = Duration::from_secs(self.config.cycle.cycle_hours.saturating_mul(3_600));
        let interval = Duration::from_secs(self.config.cycle.countdown_log_interval_secs.max(1));
        let mut remaining = total;

        info!(hours = self.config.cycle.cycle_hours, "Waiting for next cycle");
        while !remaining.is_zero() {
            let step = remaining.min(interval);
            tokio::time::sleep(step).await;
            remaining -= step;
            if !remaining.is_zero() {
                info!(remaining = %format_remaining(remaining), "Next cycle countdown");
            }
        }
    }
}

/// `HH:MM:SS`
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3_600, (secs % 3_600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(Duration::from_secs(25 * 3_600)), "25:00:00");
        assert_eq!(format_remaining(Duration::from_secs(3_661)), "01:01:01");
        assert_eq!(format_remaining(Duration::ZERO), "00:00:00");
    }

    #[test]
    fn test_report_counts() {
        let mut report = CycleReport::default();
        report.record(WalletStatus::Succeeded);
        report.record(WalletStatus::Failed);
        report.record(WalletStatus::Skipped);
        report.record(WalletStatus::Succeeded);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.total(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_next_cycle_sleeps_full_period() {
        let mut config = BotConfig::default();
        config.cycle.cycle_hours = 2;
        config.cycle.countdown_log_interval_secs = 1_800;
        let runner = CycleRunner::new(config);

        let start = tokio::time::Instant::now();
        runner.wait_for_next_cycle().await;
        assert_eq!(start.elapsed(), Duration::from_secs(2 * 3_600));
    }
}
