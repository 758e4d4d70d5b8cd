//! Metrics sources feeding the scanner.
//!
//! Real deployments implement [`MetricsProbe`] against live telemetry; the
//! bundled [`SimulatedProbe`] is a stand-in that generates plausible values.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::module::{ManagedModule, ModuleMetrics};

/// Capability sampling live metrics for a module.
#[async_trait]
pub trait MetricsProbe: Send + Sync {
    /// Samples the module's current metrics.
    async fn sample(&self, module: &ManagedModule) -> Result<ModuleMetrics>;
}

/// Synthetic probe producing values that hover around the healthy range
/// with occasional dips. A mock, not telemetry: swap in a real probe for
/// production use.
#[derive(Debug)]
pub struct SimulatedProbe {
    rng: Mutex<SmallRng>,
}

impl SimulatedProbe {
    /// Creates a probe seeded from entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(SmallRng::from_entropy()),
        }
    }

    /// Creates a reproducible probe for demos.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }
}

impl Default for SimulatedProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsProbe for SimulatedProbe {
    async fn sample(&self, _module: &ManagedModule) -> Result<ModuleMetrics> {
        let mut rng = self.rng.lock();
        Ok(ModuleMetrics {
            performance_score: rng.gen_range(55.0..100.0),
            accuracy: rng.gen_range(70.0..100.0),
            availability: rng.gen_range(0.95..1.0),
            resource_usage: rng.gen_range(0.3..0.98),
            latency_ms: rng.gen_range(50.0..700.0),
        })
    }
}

/// Probe returning a fixed sample; deterministic test double.
#[derive(Debug, Clone)]
pub struct FixedProbe {
    metrics: ModuleMetrics,
}

impl FixedProbe {
    /// Creates a probe that always returns the given metrics.
    #[must_use]
    pub const fn new(metrics: ModuleMetrics) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl MetricsProbe for FixedProbe {
    async fn sample(&self, _module: &ManagedModule) -> Result<ModuleMetrics> {
        Ok(self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleKind;

    #[tokio::test]
    async fn simulated_probe_stays_in_declared_ranges() {
        let probe = SimulatedProbe::seeded(7);
        let module = ManagedModule::new("route-optimizer", ModuleKind::Routing);
        for _ in 0..20 {
            let metrics = probe.sample(&module).await.unwrap();
            assert!((55.0..100.0).contains(&metrics.performance_score));
            assert!((0.95..1.0).contains(&metrics.availability));
        }
    }

    #[tokio::test]
    async fn fixed_probe_is_deterministic() {
        let probe = FixedProbe::new(ModuleMetrics::nominal());
        let module = ManagedModule::new("eta-forecaster", ModuleKind::Forecasting);
        let metrics = probe.sample(&module).await.unwrap();
        assert!((metrics.accuracy - 95.0).abs() < f64::EPSILON);
    }
}
