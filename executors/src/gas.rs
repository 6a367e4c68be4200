use alloy::providers::Provider;
use pilot_core::chain::Chain;
use serde::{Deserialize, Serialize};

const WEI_PER_GWEI: f64 = 1_000_000_000.0;

/// Used when the node can't be asked for a price and no minimum is configured.
pub const FALLBACK_GAS_PRICE_GWEI: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Applied to the network price on every call.
    pub multiplier: f64,
    /// Compounded once per retry attempt on top of `multiplier`.
    pub retry_increase: f64,
    pub min_gwei: Option<f64>,
    pub max_gwei: Option<f64>,
    /// Price used when the node can't be queried and `min_gwei` is unset.
    pub fallback_gwei: f64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            multiplier: 1.1,
            retry_increase: 1.3,
            min_gwei: None,
            max_gwei: None,
            fallback_gwei: FALLBACK_GAS_PRICE_GWEI,
        }
    }
}

pub fn gwei_to_wei(gwei: f64) -> u128 {
    (gwei.max(0.0) * WEI_PER_GWEI).round() as u128
}

pub fn wei_to_gwei(wei: u128) -> f64 {
    wei as f64 / WEI_PER_GWEI
}

/// Scale by a float factor with whole-percent precision.
fn scale(value: u128, factor: f64) -> u128 {
    let percent = (factor.max(0.0) * 100.0).round() as u128;
    value.saturating_mul(percent) / 100
}

#[derive(Debug, Clone)]
pub struct GasPriceOracle {
    config: GasConfig,
}

impl GasPriceOracle {
    pub fn new(config: GasConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GasConfig {
        &self.config
    }

    fn min_wei(&self) -> Option<u128> {
        self.config.min_gwei.map(gwei_to_wei)
    }

    fn max_wei(&self) -> Option<u128> {
        self.config.max_gwei.map(gwei_to_wei)
    }

    /// Network price adjusted for `retry_attempt`, or the fallback price if
    /// the node can't be queried. Never fails.
    pub async fn price<C: Chain>(&self, chain: &C, retry_attempt: u32) -> u128 {
        match chain.provider().get_gas_price().await {
            Ok(raw) => {
                let adjusted = self.adjust(raw, retry_attempt);
                tracing::debug!(
                    network_gwei = wei_to_gwei(raw),
                    adjusted_gwei = wei_to_gwei(adjusted),
                    retry_attempt,
                    "gas price"
                );
                adjusted
            }
            Err(e) => {
                let fallback = self.fallback_price();
                tracing::warn!(
                    error = %e,
                    fallback_gwei = wei_to_gwei(fallback),
                    "failed to fetch gas price, using fallback"
                );
                fallback
            }
        }
    }

    pub fn adjust(&self, raw: u128, retry_attempt: u32) -> u128 {
        let mut price = scale(raw, self.config.multiplier);
        for _ in 0..retry_attempt {
            price = scale(price, self.config.retry_increase);
        }
        self.clamp(price)
    }

    pub fn clamp(&self, price: u128) -> u128 {
        if let Some(max) = self.max_wei() {
            if price > max {
                tracing::info!(
                    price_gwei = wei_to_gwei(price),
                    max_gwei = wei_to_gwei(max),
                    "gas price above maximum, clamping down"
                );
                return self.min_wei().map_or(max, |min| max.max(min));
            }
        }

        if let Some(min) = self.min_wei() {
            if price < min {
                tracing::info!(
                    price_gwei = wei_to_gwei(price),
                    min_gwei = wei_to_gwei(min),
                    "gas price below minimum, clamping up"
                );
                return min;
            }
        }

        price
    }

    pub fn fallback_price(&self) -> u128 {
        self.min_wei()
            .unwrap_or_else(|| gwei_to_wei(self.config.fallback_gwei))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GWEI: u128 = 1_000_000_000;

    fn oracle(min_gwei: Option<f64>, max_gwei: Option<f64>) -> GasPriceOracle {
        GasPriceOracle::new(GasConfig {
            multiplier: 1.1,
            retry_increase: 1.3,
            min_gwei,
            max_gwei,
            ..GasConfig::default()
        })
    }

    #[test]
    fn test_multiplier_and_retry_escalation() {
        let oracle = oracle(None, None);
        assert_eq!(oracle.adjust(10 * GWEI, 0), 11 * GWEI);
        assert_eq!(oracle.adjust(10 * GWEI, 1), 14_300_000_000);
        assert_eq!(oracle.adjust(10 * GWEI, 2), 18_590_000_000);

        // 1.15 * 100 is 114.999.. in binary floating point
        assert_eq!(scale(10 * GWEI, 1.15), 11_500_000_000);
        assert_eq!(scale(100, 1.13), 113);
        assert_eq!(scale(100, 1.14), 114);

        let oracle = GasPriceOracle::new(GasConfig {
            multiplier: 1.15,
            retry_increase: 1.15,
            ..GasConfig::default()
        });
        assert_eq!(oracle.adjust(10 * GWEI, 0), 11_500_000_000);
        assert_eq!(oracle.adjust(10 * GWEI, 1), 13_225_000_000);
    }

    #[test]
    fn test_clamping_is_total() {
        let oracle = oracle(Some(2.0), Some(50.0));
        for raw in [0, 1, GWEI, 10 * GWEI, 1_000 * GWEI, u128::MAX / 1_000] {
            for attempt in 0..6 {
                let price = oracle.adjust(raw, attempt);
                assert!(price >= 2 * GWEI, "{raw} {attempt}");
                assert!(price <= 50 * GWEI, "{raw} {attempt}");
            }
        }
    }

    #[test]
    fn test_fallback_prefers_minimum() {
        assert_eq!(oracle(Some(3.0), None).fallback_price(), 3 * GWEI);
        assert_eq!(oracle(None, None).fallback_price(), GWEI);
    }

    #[test]
    fn test_fractional_gwei() {
        assert_eq!(gwei_to_wei(0.5), 500_000_000);
        assert_eq!(gwei_to_wei(-1.0), 0);
    }
}
