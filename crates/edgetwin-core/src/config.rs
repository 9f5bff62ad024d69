//! Per-twin configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default interval between two polls of a subscription
pub const DEFAULT_SUBSCRIBE_INTERVAL: Duration = Duration::from_secs(15);

/// Configuration for a twin's lifecycle and subscription engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwinConfig {
    /// How often each subscription samples its event
    pub subscribe_interval: Duration,

    /// Probability in [0, 1] that `start` fails with a simulated fault
    pub start_failure_probability: f64,

    /// Probability in [0, 1] that a health check reports `Exception`
    pub health_exception_probability: f64,
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            subscribe_interval: DEFAULT_SUBSCRIBE_INTERVAL,
            start_failure_probability: 0.0,
            health_exception_probability: 0.0,
        }
    }
}

impl TwinConfig {
    #[must_use]
    pub fn with_subscribe_interval(mut self, interval: Duration) -> Self {
        self.subscribe_interval = interval;
        self
    }

    #[must_use]
    pub fn with_start_failure_probability(mut self, p: f64) -> Self {
        self.start_failure_probability = clamp_probability(p);
        self
    }

    #[must_use]
    pub fn with_health_exception_probability(mut self, p: f64) -> Self {
        self.health_exception_probability = clamp_probability(p);
        self
    }

    /// Copy with probabilities clamped and a non-zero interval
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.start_failure_probability = clamp_probability(self.start_failure_probability);
        self.health_exception_probability =
            clamp_probability(self.health_exception_probability);
        if self.subscribe_interval.is_zero() {
            self.subscribe_interval = DEFAULT_SUBSCRIBE_INTERVAL;
        }
        self
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}
