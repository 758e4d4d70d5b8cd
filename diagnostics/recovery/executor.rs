//! Recovery action execution adapters.
//!
//! Real deployments implement [`ActionExecutor`] against the platform's
//! control plane; the bundled [`SimulatedExecutor`] is a mock with a fixed
//! success probability and must be replaced for production use.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RecoveryActionItem;
use crate::module::ManagedModule;

/// Result of attempting one recovery action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Whether the action took effect.
    pub success: bool,
    /// Execution log lines.
    pub log: Vec<String>,
    /// Downtime actually incurred, in seconds.
    pub downtime_secs: u64,
    /// Estimated improvement delivered (0-1).
    pub improvement: f64,
}

/// Capability applying a recovery action to a module.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Applies the action; an `Err` is treated as a failed attempt.
    async fn execute(
        &self,
        module: &ManagedModule,
        action: &RecoveryActionItem,
    ) -> Result<ExecutionOutcome>;
}

/// Persistent record of one action attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryExecution {
    /// Unique identifier.
    pub id: Uuid,
    /// Plan the action belonged to.
    pub plan_id: Uuid,
    /// Action attempted.
    pub action_id: Uuid,
    /// Whether the action took effect.
    pub success: bool,
    /// Execution log lines.
    pub log: Vec<String>,
    /// Downtime actually incurred, in seconds.
    pub downtime_secs: u64,
    /// Estimated improvement delivered (0-1).
    pub improvement: f64,
    /// Attempt timestamp.
    pub executed_at: DateTime<Utc>,
}

/// Default success probability of the simulated executor.
pub const SIMULATED_SUCCESS_PROBABILITY: f64 = 0.9;

/// Mock executor that succeeds with a fixed probability. Non-deterministic
/// by construction; production deployments swap in a real adapter.
#[derive(Debug)]
pub struct SimulatedExecutor {
    success_probability: f64,
    rng: Mutex<SmallRng>,
}

impl SimulatedExecutor {
    /// Creates an executor with the default success probability.
    #[must_use]
    pub fn new() -> Self {
        Self::with_probability(SIMULATED_SUCCESS_PROBABILITY)
    }

    /// Creates an executor with a custom success probability.
    #[must_use]
    pub fn with_probability(success_probability: f64) -> Self {
        Self {
            success_probability: success_probability.clamp(0.0, 1.0),
            rng: Mutex::new(SmallRng::from_entropy()),
        }
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionExecutor for SimulatedExecutor {
    async fn execute(
        &self,
        module: &ManagedModule,
        action: &RecoveryActionItem,
    ) -> Result<ExecutionOutcome> {
        let (success, improvement) = {
            let mut rng = self.rng.lock();
            (
                rng.gen_bool(self.success_probability),
                rng.gen_range(0.1..0.6),
            )
        };
        Ok(ExecutionOutcome {
            success,
            log: vec![
                format!("{:?} on '{}': {}", action.kind, module.name, action.description),
                if success {
                    "completed".to_string()
                } else {
                    "did not take effect".to_string()
                },
            ],
            downtime_secs: action.estimated_downtime_secs,
            improvement: if success { improvement } else { 0.0 },
        })
    }
}

/// Deterministic executor for tests: every attempt succeeds or fails
/// according to one flag.
#[derive(Debug, Clone)]
pub struct ScriptedExecutor {
    succeed: bool,
}

impl ScriptedExecutor {
    /// Creates an executor with a fixed outcome.
    #[must_use]
    pub const fn new(succeed: bool) -> Self {
        Self { succeed }
    }
}

#[async_trait]
impl ActionExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        _module: &ManagedModule,
        action: &RecoveryActionItem,
    ) -> Result<ExecutionOutcome> {
        Ok(ExecutionOutcome {
            success: self.succeed,
            log: vec![format!("scripted {:?}", action.kind)],
            downtime_secs: action.estimated_downtime_secs,
            improvement: if self.succeed { 0.3 } else { 0.0 },
        })
    }
}
