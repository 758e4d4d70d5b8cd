//! Managed modules, health thresholds, and anomaly records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the diagnostic-recovery engine.
#[derive(Debug, Error, Clone)]
pub enum DiagnosticError {
    /// The referenced module is not registered.
    #[error("unknown module {0}")]
    UnknownModule(Uuid),
    /// The module id is already registered.
    #[error("module {0} is already registered")]
    DuplicateModule(Uuid),
    /// The referenced scan does not exist.
    #[error("unknown scan {0}")]
    UnknownScan(Uuid),
    /// The scan reported no anomalies, so no plan can be built.
    #[error("scan {0} has no anomalies to recover from")]
    NoAnomalies(Uuid),
    /// A recovery plan already exists for the scan.
    #[error("scan {0} already has a recovery plan")]
    DuplicatePlanForScan(Uuid),
    /// The referenced plan does not exist.
    #[error("unknown recovery plan {0}")]
    UnknownPlan(Uuid),
    /// The plan has already completed or failed.
    #[error("recovery plan {0} is already terminal")]
    PlanAlreadyTerminal(Uuid),
    /// The metrics probe could not sample the module.
    #[error("metrics probe failed: {0}")]
    ProbeFailed(String),
    /// The diagnostic loop is already running.
    #[error("diagnostic loop is already running")]
    LoopAlreadyRunning,
}

/// Responsibility class of a managed module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// Voyage and passage routing.
    Routing,
    /// Weather and ETA forecasting.
    Forecasting,
    /// Asset and crew dispatch.
    Dispatch,
    /// Telemetry ingestion.
    Telemetry,
    /// Domain-specific module.
    Custom(String),
}

/// Health thresholds a module is scanned against. Floors apply to scores,
/// ceilings to saturation and latency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HealthThresholds {
    /// Minimum composite performance score (0-100).
    pub min_performance: f64,
    /// Minimum accuracy (0-100).
    pub min_accuracy: f64,
    /// Minimum availability (0-1).
    pub min_availability: f64,
    /// Maximum resource saturation (0-1).
    pub max_resource_usage: f64,
    /// Maximum mean latency in milliseconds.
    pub max_latency_ms: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            min_performance: 70.0,
            min_accuracy: 85.0,
            min_availability: 0.99,
            max_resource_usage: 0.85,
            max_latency_ms: 500.0,
        }
    }
}

/// A module registered with the diagnostic engine. Registered once; scans
/// reference it by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedModule {
    /// Unique identifier.
    pub id: Uuid,
    /// Operator-facing name.
    pub name: String,
    /// Responsibility class.
    pub kind: ModuleKind,
    /// Modules this one depends on.
    pub depends_on: Vec<Uuid>,
    /// Scan thresholds.
    pub thresholds: HealthThresholds,
    /// Registration timestamp.
    pub registered_at: DateTime<Utc>,
}

impl ManagedModule {
    /// Registers a module with default thresholds.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            depends_on: Vec::new(),
            thresholds: HealthThresholds::default(),
            registered_at: Utc::now(),
        }
    }

    /// Replaces the scan thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Declares a dependency on another module.
    #[must_use]
    pub fn with_dependency(mut self, module_id: Uuid) -> Self {
        self.depends_on.push(module_id);
        self
    }
}

/// One sampled set of module metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModuleMetrics {
    /// Composite performance score (0-100).
    pub performance_score: f64,
    /// Accuracy (0-100).
    pub accuracy: f64,
    /// Availability (0-1).
    pub availability: f64,
    /// Resource saturation (0-1).
    pub resource_usage: f64,
    /// Mean latency in milliseconds.
    pub latency_ms: f64,
}

impl ModuleMetrics {
    /// A sample comfortably inside the default thresholds.
    #[must_use]
    pub const fn nominal() -> Self {
        Self {
            performance_score: 90.0,
            accuracy: 95.0,
            availability: 1.0,
            resource_usage: 0.5,
            latency_ms: 100.0,
        }
    }
}

/// Metric family an anomaly belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Composite performance below floor.
    Performance,
    /// Accuracy below floor.
    Accuracy,
    /// Availability below floor.
    Availability,
    /// Resource saturation above ceiling.
    Resource,
    /// Latency above ceiling.
    Latency,
}

/// Severity bucket derived from relative deviation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    /// Deviation at or below 10%.
    Low,
    /// Deviation above 10%.
    Medium,
    /// Deviation above 30%.
    High,
    /// Deviation above 50%.
    Critical,
}

impl AnomalySeverity {
    /// Buckets a relative deviation (`|observed - threshold| / threshold`).
    #[must_use]
    pub fn from_deviation(deviation: f64) -> Self {
        if deviation > 0.5 {
            Self::Critical
        } else if deviation > 0.3 {
            Self::High
        } else if deviation > 0.1 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One metric-versus-threshold deviation found during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    /// Unique identifier.
    pub id: Uuid,
    /// Module the anomaly was observed on.
    pub module_id: Uuid,
    /// Metric family.
    pub kind: AnomalyKind,
    /// Severity bucket.
    pub severity: AnomalySeverity,
    /// Observed value.
    pub observed: f64,
    /// Threshold the value was held against.
    pub expected: f64,
    /// Relative deviation.
    pub deviation: f64,
    /// Detection timestamp.
    pub detected_at: DateTime<Utc>,
}

/// Overall module status derived from a scan's anomalies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// No anomalies.
    Healthy,
    /// At least one anomaly, none high or critical.
    Degraded,
    /// At least one high-severity anomaly.
    Failing,
    /// At least one critical anomaly.
    Critical,
}

impl ModuleStatus {
    /// Derives the status from a scan's anomalies.
    #[must_use]
    pub fn from_anomalies(anomalies: &[Anomaly]) -> Self {
        if anomalies
            .iter()
            .any(|a| a.severity == AnomalySeverity::Critical)
        {
            Self::Critical
        } else if anomalies.iter().any(|a| a.severity == AnomalySeverity::High) {
            Self::Failing
        } else if anomalies.is_empty() {
            Self::Healthy
        } else {
            Self::Degraded
        }
    }
}

/// Result of scanning one module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticScan {
    /// Unique identifier.
    pub id: Uuid,
    /// Module scanned.
    pub module_id: Uuid,
    /// Metrics sampled during the scan.
    pub metrics: ModuleMetrics,
    /// Anomalies found.
    pub anomalies: Vec<Anomaly>,
    /// Derived module status.
    pub status: ModuleStatus,
    /// Scan timestamp.
    pub scanned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_monotonic_in_deviation() {
        assert_eq!(AnomalySeverity::from_deviation(0.6), AnomalySeverity::Critical);
        assert_eq!(AnomalySeverity::from_deviation(0.35), AnomalySeverity::High);
        assert_eq!(AnomalySeverity::from_deviation(0.15), AnomalySeverity::Medium);
        assert_eq!(AnomalySeverity::from_deviation(0.05), AnomalySeverity::Low);
    }

    #[test]
    fn status_prefers_worst_anomaly() {
        let anomaly = |severity| Anomaly {
            id: Uuid::new_v4(),
            module_id: Uuid::new_v4(),
            kind: AnomalyKind::Latency,
            severity,
            observed: 700.0,
            expected: 500.0,
            deviation: 0.4,
            detected_at: Utc::now(),
        };
        assert_eq!(ModuleStatus::from_anomalies(&[]), ModuleStatus::Healthy);
        assert_eq!(
            ModuleStatus::from_anomalies(&[anomaly(AnomalySeverity::Low)]),
            ModuleStatus::Degraded
        );
        assert_eq!(
            ModuleStatus::from_anomalies(&[
                anomaly(AnomalySeverity::Low),
                anomaly(AnomalySeverity::High)
            ]),
            ModuleStatus::Failing
        );
        assert_eq!(
            ModuleStatus::from_anomalies(&[
                anomaly(AnomalySeverity::High),
                anomaly(AnomalySeverity::Critical)
            ]),
            ModuleStatus::Critical
        );
    }
}
