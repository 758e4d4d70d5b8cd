//! Version-to-version metric comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::versions::PerformanceMetrics;

/// Percentage-delta magnitude above which a change counts as significant.
pub const SIGNIFICANCE_THRESHOLD: f64 = 5.0;

/// Mean-delta threshold above which deployment is recommended.
pub const DEPLOY_THRESHOLD: f64 = 10.0;

/// Change in one compared metric. Positive percent means improvement
/// (the error-rate delta is inverted so that lower reads as positive).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDelta {
    /// Metric name.
    pub metric: String,
    /// Value under the baseline version.
    pub baseline: f64,
    /// Value under the candidate version.
    pub candidate: f64,
    /// Signed absolute change.
    pub absolute: f64,
    /// Signed percentage change; positive is better.
    pub percent: f64,
    /// True when |percent| exceeds the significance threshold.
    pub significant: bool,
}

/// Rollout advice derived from the mean percentage delta. A heuristic
/// summary, not a statistical test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Mean delta above +10: deploy the candidate.
    Deploy,
    /// Mean delta in (0, 10]: consider after further validation.
    Consider,
    /// Mean delta at or below zero: keep the baseline.
    NotRecommended,
}

impl Recommendation {
    /// Buckets a mean percentage delta.
    #[must_use]
    pub fn from_mean_delta(mean: f64) -> Self {
        if mean > DEPLOY_THRESHOLD {
            Self::Deploy
        } else if mean > 0.0 {
            Self::Consider
        } else {
            Self::NotRecommended
        }
    }

    /// Operator-facing summary line.
    #[must_use]
    pub const fn summary(self) -> &'static str {
        match self {
            Self::Deploy => "Deploy: candidate outperforms baseline across compared metrics.",
            Self::Consider => "Consider: modest gains; validate further before rollout.",
            Self::NotRecommended => "Not recommended: no net improvement over baseline.",
        }
    }
}

/// Full comparison report between two versions' latest snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionComparison {
    /// Comparison identifier.
    pub id: Uuid,
    /// Baseline version.
    pub baseline_version: Uuid,
    /// Candidate version.
    pub candidate_version: Uuid,
    /// Per-metric deltas in fixed order.
    pub deltas: Vec<MetricDelta>,
    /// Names of metrics whose change is significant.
    pub significant_changes: Vec<String>,
    /// Mean percentage delta across all compared metrics.
    pub mean_percent_delta: f64,
    /// Bucketed advice.
    pub recommendation: Recommendation,
    /// Operator-facing summary.
    pub summary: String,
    /// Comparison timestamp.
    pub compared_at: DateTime<Utc>,
}

fn delta(metric: &str, baseline: f64, candidate: f64, invert: bool) -> MetricDelta {
    let absolute = candidate - baseline;
    let raw_percent = if baseline == 0.0 {
        0.0
    } else {
        absolute / baseline * 100.0
    };
    let percent = if invert { -raw_percent } else { raw_percent };
    MetricDelta {
        metric: metric.to_string(),
        baseline,
        candidate,
        absolute,
        percent,
        significant: percent.abs() > SIGNIFICANCE_THRESHOLD,
    }
}

/// Compares the six headline metrics of two snapshots. The error-rate delta
/// is inverted so that a reduction reads as a positive percentage.
#[must_use]
pub fn compare_snapshots(
    baseline_version: Uuid,
    candidate_version: Uuid,
    baseline: &PerformanceMetrics,
    candidate: &PerformanceMetrics,
) -> VersionComparison {
    let deltas = vec![
        delta("accuracy", baseline.accuracy, candidate.accuracy, false),
        delta("precision", baseline.precision, candidate.precision, false),
        delta("recall", baseline.recall, candidate.recall, false),
        delta("f1", baseline.f1, candidate.f1, false),
        delta(
            "decision_quality",
            baseline.decision_quality,
            candidate.decision_quality,
            false,
        ),
        delta("error_rate", baseline.error_rate, candidate.error_rate, true),
    ];
    #[allow(clippy::cast_precision_loss)]
    let mean_percent_delta =
        deltas.iter().map(|d| d.percent).sum::<f64>() / deltas.len() as f64;
    let significant_changes = deltas
        .iter()
        .filter(|d| d.significant)
        .map(|d| d.metric.clone())
        .collect();
    let recommendation = Recommendation::from_mean_delta(mean_percent_delta);
    VersionComparison {
        id: Uuid::new_v4(),
        baseline_version,
        candidate_version,
        deltas,
        significant_changes,
        mean_percent_delta,
        recommendation,
        summary: recommendation.summary().to_string(),
        compared_at: Utc::now(),
    }
}
