//! Version nodes, performance snapshots, and capability progress records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One node in the version tree. Versions form a parent-pointer tree, not
/// necessarily a linear chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Semantic version label (e.g. `2.3.0`).
    pub version: String,
    /// What this version is about.
    pub description: String,
    /// Individual changes shipped in this version.
    pub changes: Vec<String>,
    /// Parent version, absent for roots.
    pub parent: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Performance snapshot attached to a version. A version may carry many;
/// "latest" means last appended, so callers append in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Classification accuracy (0-1).
    pub accuracy: f64,
    /// Precision (0-1).
    pub precision: f64,
    /// Recall (0-1).
    pub recall: f64,
    /// F1 score (0-1).
    pub f1: f64,
    /// Mean decision latency in milliseconds.
    pub latency_ms: f64,
    /// Decision quality score (0-100).
    pub decision_quality: f64,
    /// Error rate (0-1); lower is better.
    pub error_rate: f64,
    /// Confidence calibration score (0-1).
    pub confidence_calibration: f64,
    /// Resource efficiency score (0-1).
    pub resource_efficiency: f64,
    /// Number of decisions behind this snapshot.
    pub sample_size: usize,
    /// Measurement timestamp.
    pub recorded_at: DateTime<Utc>,
}

impl PerformanceMetrics {
    /// Creates a snapshot stamped with the current time; scores default to
    /// zero and are set field-by-field by the caller.
    #[must_use]
    pub fn now() -> Self {
        Self {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
            latency_ms: 0.0,
            decision_quality: 0.0,
            error_rate: 0.0,
            confidence_calibration: 0.0,
            resource_efficiency: 0.0,
            sample_size: 0,
            recorded_at: Utc::now(),
        }
    }
}

/// Proficiency measurement for one capability under one version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveProgress {
    /// Unique identifier.
    pub id: Uuid,
    /// Version the measurement belongs to.
    pub version_id: Uuid,
    /// Capability name (e.g. `eta_prediction`).
    pub capability: String,
    /// Measured proficiency (0-100).
    pub proficiency: f64,
    /// Percent change versus the comparison version's same capability;
    /// zero when there is nothing to compare against.
    pub improvement_rate: f64,
    /// Version compared against, when one was named.
    pub compared_to: Option<Uuid>,
    /// Measurement timestamp.
    pub recorded_at: DateTime<Utc>,
}

/// Capability trend over accumulated progress snapshots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTrend {
    /// Average improvement rate above +5.
    Improving,
    /// Average improvement rate within +/-5.
    Stable,
    /// Average improvement rate below -5.
    Declining,
}

impl CapabilityTrend {
    /// Buckets an average improvement rate.
    #[must_use]
    pub fn from_average(average: f64) -> Self {
        if average > 5.0 {
            Self::Improving
        } else if average < -5.0 {
            Self::Declining
        } else {
            Self::Stable
        }
    }
}

/// Aggregated view of one capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitySummary {
    /// Capability name.
    pub capability: String,
    /// Mean improvement rate across snapshots.
    pub average_improvement_rate: f64,
    /// Bucketed trend.
    pub trend: CapabilityTrend,
    /// Number of snapshots aggregated.
    pub samples: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_buckets_use_five_point_band() {
        assert_eq!(CapabilityTrend::from_average(6.0), CapabilityTrend::Improving);
        assert_eq!(CapabilityTrend::from_average(5.0), CapabilityTrend::Stable);
        assert_eq!(CapabilityTrend::from_average(-5.0), CapabilityTrend::Stable);
        assert_eq!(CapabilityTrend::from_average(-5.1), CapabilityTrend::Declining);
    }
}
