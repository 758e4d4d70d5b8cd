//! Configuration records, triggers, actions, and validation types.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the reconfiguration controller.
#[derive(Debug, Error, Clone)]
pub enum ReconfigError {
    /// The referenced action does not exist.
    #[error("unknown reconfiguration action {0}")]
    UnknownAction(Uuid),
}

/// Compute and memory envelope granted to the decision stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    /// CPU cores reserved.
    pub cpu_cores: u32,
    /// Memory ceiling in megabytes.
    pub memory_mb: u64,
    /// Per-operation timeout in milliseconds.
    pub timeout_ms: u64,
    /// Token budget per inference call.
    pub max_tokens: u32,
}

/// Relative weighting of competing optimization goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityWeights {
    /// Weight on answer quality.
    pub accuracy: f64,
    /// Weight on responsiveness.
    pub speed: f64,
    /// Weight on operating cost.
    pub cost: f64,
}

/// A complete system configuration. The controller keeps one mutable
/// "current" pointer; every change appends the displaced value to an
/// append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfiguration {
    /// Unique identifier; every transform mints a fresh one.
    pub id: Uuid,
    /// Model selector.
    pub model: String,
    /// Free-form model parameters.
    pub parameters: IndexMap<String, serde_json::Value>,
    /// Strategy label.
    pub strategy: String,
    /// Resource envelope.
    pub resources: ResourceAllocation,
    /// Goal weighting.
    pub priority_weights: PriorityWeights,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl SystemConfiguration {
    /// The stock configuration the controller starts from.
    #[must_use]
    pub fn baseline() -> Self {
        let mut parameters = IndexMap::new();
        parameters.insert("temperature".to_string(), json!(0.7));
        parameters.insert("planning_depth".to_string(), json!(3));
        Self {
            id: Uuid::new_v4(),
            model: "helm-standard".to_string(),
            parameters,
            strategy: "balanced".to_string(),
            resources: ResourceAllocation {
                cpu_cores: 4,
                memory_mb: 8192,
                timeout_ms: 30_000,
                max_tokens: 4096,
            },
            priority_weights: PriorityWeights {
                accuracy: 0.4,
                speed: 0.3,
                cost: 0.3,
            },
            created_at: Utc::now(),
        }
    }

    /// Reads a numeric parameter if present.
    #[must_use]
    pub fn numeric_parameter(&self, key: &str) -> Option<f64> {
        self.parameters.get(key).and_then(serde_json::Value::as_f64)
    }
}

/// Live metrics fed into the monitor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Error rate over the observation window (0-1).
    pub error_rate: f64,
    /// Composite performance score (0-100).
    pub performance_score: f64,
    /// Resource saturation (0-1).
    pub resource_usage: f64,
    /// Mean response time in milliseconds.
    pub response_time_ms: f64,
    /// Consecutive failed operations.
    pub consecutive_failures: u32,
    /// Operations per second.
    pub throughput: f64,
}

/// What authorized a reconfiguration attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCause {
    /// Error rate breached its ceiling.
    FailureThresholdExceeded,
    /// Performance score fell below its floor.
    PerformanceDegradation,
    /// Resource saturation breached its ceiling.
    ResourceOverload,
    /// Too many consecutive failures.
    RepeatedErrors,
    /// Operator-requested adjustment.
    Manual,
    /// Scheduled maintenance adjustment.
    Scheduled,
}

impl TriggerCause {
    /// Short reason used in diffs and logs.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::FailureThresholdExceeded => "error rate over threshold; tightening safety margins",
            Self::PerformanceDegradation => "performance below floor; weighting quality and speed",
            Self::ResourceOverload => "resource saturation; shrinking allocation",
            Self::RepeatedErrors => "repeated failures; switching to safe fallback",
            Self::Manual => "operator-requested exploratory adjustment",
            Self::Scheduled => "scheduled exploratory adjustment",
        }
    }
}

/// A detected threshold breach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconfigTrigger {
    /// Unique identifier.
    pub id: Uuid,
    /// Why the trigger fired.
    pub cause: TriggerCause,
    /// Metrics at detection time.
    pub metrics: MetricsSnapshot,
    /// Threshold that was breached.
    pub threshold: f64,
    /// Observed value that breached it.
    pub observed: f64,
    /// Detection timestamp.
    pub fired_at: DateTime<Utc>,
}

impl ReconfigTrigger {
    /// Builds a manually raised trigger from the current metrics.
    #[must_use]
    pub fn manual(metrics: MetricsSnapshot) -> Self {
        Self {
            id: Uuid::new_v4(),
            cause: TriggerCause::Manual,
            metrics,
            threshold: 0.0,
            observed: 0.0,
            fired_at: Utc::now(),
        }
    }
}

/// One field-level difference between two configurations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldChange {
    /// Dotted field path (e.g. `resources.memory_mb`).
    pub field: String,
    /// Value before the change.
    pub old: serde_json::Value,
    /// Value after the change.
    pub new: serde_json::Value,
    /// Why the field moved.
    pub reason: String,
}

/// Lifecycle of a reconfiguration action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Computed but not yet applied.
    Pending,
    /// Applied as the current configuration.
    Applied,
    /// The apply step failed.
    Failed,
    /// Rolled back after a failed validation.
    Reverted,
}

/// An applied (or reverted) configuration change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconfigAction {
    /// Unique identifier.
    pub id: Uuid,
    /// Trigger that authorized the change.
    pub trigger_id: Uuid,
    /// Configuration before the change.
    pub before: SystemConfiguration,
    /// Configuration after the change.
    pub after: SystemConfiguration,
    /// Field-level differences.
    pub diff: Vec<FieldChange>,
    /// Current lifecycle state.
    pub status: ActionStatus,
    /// When the change was applied.
    pub executed_at: DateTime<Utc>,
}

/// Performance sample used by post-change validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerfSample {
    /// Accuracy (0-1).
    pub accuracy: f64,
    /// Mean response time in milliseconds.
    pub response_time_ms: f64,
    /// Error rate (0-1).
    pub error_rate: f64,
    /// Operations per second.
    pub throughput: f64,
}

/// Signed improvement deltas between two samples. Positive is better on
/// every axis (time and error improvements are computed before-minus-after).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImprovementDeltas {
    /// Accuracy change (after - before).
    pub accuracy: f64,
    /// Response-time improvement (before - after).
    pub response_time: f64,
    /// Error-rate improvement (before - after).
    pub error_rate: f64,
    /// Throughput change (after - before).
    pub throughput: f64,
}

impl ImprovementDeltas {
    /// Computes the four signed deltas.
    #[must_use]
    pub fn between(before: &PerfSample, after: &PerfSample) -> Self {
        Self {
            accuracy: after.accuracy - before.accuracy,
            response_time: before.response_time_ms - after.response_time_ms,
            error_rate: before.error_rate - after.error_rate,
            throughput: after.throughput - before.throughput,
        }
    }

    /// Number of axes that improved.
    #[must_use]
    pub fn positive_count(&self) -> usize {
        [self.accuracy, self.response_time, self.error_rate, self.throughput]
            .iter()
            .filter(|d| **d > 0.0)
            .count()
    }
}

/// Verdict of a post-change validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationVerdict {
    /// At least three of four axes improved.
    Success,
    /// Exactly two axes improved.
    Mixed,
    /// One or zero axes improved; the change is rolled back.
    Failure,
}

impl ValidationVerdict {
    /// Buckets an improved-axis count.
    #[must_use]
    pub const fn from_positive_count(count: usize) -> Self {
        if count >= 3 {
            Self::Success
        } else if count == 2 {
            Self::Mixed
        } else {
            Self::Failure
        }
    }
}

/// Recorded validation of one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceValidation {
    /// Unique identifier.
    pub id: Uuid,
    /// Action validated.
    pub action_id: Uuid,
    /// Sample before the change.
    pub before: PerfSample,
    /// Sample after the change.
    pub after: PerfSample,
    /// Signed improvement deltas.
    pub deltas: ImprovementDeltas,
    /// Verdict.
    pub verdict: ValidationVerdict,
    /// Validation timestamp.
    pub validated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_buckets_on_positive_count() {
        assert_eq!(ValidationVerdict::from_positive_count(4), ValidationVerdict::Success);
        assert_eq!(ValidationVerdict::from_positive_count(3), ValidationVerdict::Success);
        assert_eq!(ValidationVerdict::from_positive_count(2), ValidationVerdict::Mixed);
        assert_eq!(ValidationVerdict::from_positive_count(1), ValidationVerdict::Failure);
        assert_eq!(ValidationVerdict::from_positive_count(0), ValidationVerdict::Failure);
    }

    #[test]
    fn deltas_orient_every_axis_positive_is_better() {
        let before = PerfSample {
            accuracy: 0.8,
            response_time_ms: 200.0,
            error_rate: 0.2,
            throughput: 40.0,
        };
        let after = PerfSample {
            accuracy: 0.9,
            response_time_ms: 150.0,
            error_rate: 0.1,
            throughput: 50.0,
        };
        let deltas = ImprovementDeltas::between(&before, &after);
        assert_eq!(deltas.positive_count(), 4);
        assert!((deltas.response_time - 50.0).abs() < f64::EPSILON);
        assert!((deltas.error_rate - 0.1).abs() < 1e-9);
    }
}
