//! Injectable random generator and simulated fault injection
//!
//! Twins never touch process-global random state. Each one holds a
//! [`SharedRng`], seeded once when it is created (from entropy, or from a
//! fixed seed in tests) and never reseeded afterwards.

use crate::error::{TwinError, TwinResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle to one seeded generator
#[derive(Clone)]
pub struct SharedRng {
    inner: Arc<Mutex<fastrand::Rng>>,
}

impl SharedRng {
    /// Generator seeded from entropy
    pub fn new() -> Self {
        Self::from_rng(fastrand::Rng::new())
    }

    /// Deterministic generator for tests and replays
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(fastrand::Rng::with_seed(seed))
    }

    fn from_rng(rng: fastrand::Rng) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rng)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, fastrand::Rng> {
        // A panic while drawing a number cannot leave the generator invalid
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Uniform float in [0, 1)
    pub fn f64(&self) -> f64 {
        self.lock().f64()
    }

    /// Uniform integer in [0, n); `n` must be positive
    pub fn below(&self, n: i64) -> i64 {
        self.lock().i64(0..n)
    }

    /// `true` with probability `p`
    pub fn chance(&self, p: f64) -> bool {
        p > 0.0 && self.f64() < p
    }
}

impl Default for SharedRng {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRng").finish_non_exhaustive()
    }
}

/// Simulated intermittent hardware faults for start and health checks
#[derive(Debug, Clone)]
pub struct FaultInjector {
    start_failure_probability: f64,
    health_exception_probability: f64,
    rng: SharedRng,
}

impl FaultInjector {
    pub fn new(
        start_failure_probability: f64,
        health_exception_probability: f64,
        rng: SharedRng,
    ) -> Self {
        Self {
            start_failure_probability,
            health_exception_probability,
            rng,
        }
    }

    /// Never injects anything
    pub fn disabled() -> Self {
        Self::new(0.0, 0.0, SharedRng::new())
    }

    /// Startup self-test; fails with a `DeviceTwin` error when a fault is drawn
    pub fn start_probe(&self) -> TwinResult<()> {
        if self.rng.chance(self.start_failure_probability) {
            return Err(TwinError::device_fault("simulation error"));
        }
        Ok(())
    }

    /// Whether this health check should report a transient exception
    pub fn health_exception(&self) -> bool {
        self.rng.chance(self.health_exception_probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let a = SharedRng::with_seed(7);
        let b = SharedRng::with_seed(7);
        let xs: Vec<i64> = (0..8).map(|_| a.below(100)).collect();
        let ys: Vec<i64> = (0..8).map(|_| b.below(100)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| (0..100).contains(x)));
    }

    #[test]
    fn test_fault_injector_forced_branches() {
        let always = FaultInjector::new(1.0, 1.0, SharedRng::with_seed(1));
        assert!(always.start_probe().is_err());
        assert!(always.health_exception());

        let never = FaultInjector::new(0.0, 0.0, SharedRng::with_seed(1));
        for _ in 0..100 {
            assert!(never.start_probe().is_ok());
            assert!(!never.health_exception());
        }
    }
}
