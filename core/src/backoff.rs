use std::{fmt::Debug, sync::Arc, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::classify::ErrorClass;

/// Source of the random multiplier applied to every backoff delay.
pub trait JitterSource: Debug + Send + Sync {
    /// Returns a multiplier in `[0.5, 1.5)`.
    fn sample(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn sample(&self) -> f64 {
        rand::rng().random_range(0.5..1.5)
    }
}

/// Always returns the same multiplier. Used to make delays deterministic.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Base delay for the first retry, in milliseconds.
    pub base_wait_ms: u64,
    /// Upper bound of the exponential part, in milliseconds.
    pub cap_ms: u64,
    /// Extra factor applied when the failure was mempool congestion.
    pub mempool_multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_wait_ms: 10_000,
            cap_ms: 300_000,
            mempool_multiplier: 3.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
    mempool_multiplier: f64,
    jitter: Arc<dyn JitterSource>,
}

impl BackoffPolicy {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            base: Duration::from_millis(config.base_wait_ms),
            cap: Duration::from_millis(config.cap_ms),
            mempool_multiplier: config.mempool_multiplier,
            jitter: Arc::new(RandomJitter),
        }
    }

    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// `min(cap, base * 2^attempt) * jitter`, floored at the base delay, then
    /// scaled by the mempool multiplier for mempool-class failures.
    pub fn delay(&self, attempt: u32, class: ErrorClass) -> Duration {
        let base_ms = self.base.as_millis() as f64;
        let cap_ms = self.cap.as_millis() as f64;

        let exponential = base_ms * 2f64.powi(attempt.min(64) as i32);
        let jittered = exponential.min(cap_ms) * self.jitter.sample();
        let mut delay_ms = jittered.max(base_ms);

        if class.is_mempool() {
            delay_ms *= self.mempool_multiplier.max(1.0);
        }

        Duration::from_millis(delay_ms.max(1.0) as u64)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(&BackoffConfig::default())
    }
}
