//! The evolution tracker: version tree, metric snapshots, capability
//! progress, and audit exports.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;
use shared_record_sink::EngineTelemetry;
use thiserror::Error;
use uuid::Uuid;

use crate::compare::{compare_snapshots, VersionComparison};
use crate::versions::{
    CapabilitySummary, CapabilityTrend, CognitiveProgress, PerformanceMetrics, VersionRecord,
};

/// Sink tables written by this engine.
const VERSIONS_TABLE: &str = "ai_versions";
const METRICS_TABLE: &str = "ai_performance_metrics";
const PROGRESS_TABLE: &str = "ai_cognitive_progress";
const COMPARISONS_TABLE: &str = "ai_version_comparisons";

/// Errors surfaced by the evolution tracker.
#[derive(Debug, Error, Clone)]
pub enum EvolutionError {
    /// The referenced version does not exist.
    #[error("unknown version {0}")]
    UnknownVersion(Uuid),
    /// The version has no metrics snapshot to compare.
    #[error("version {0} has no recorded metrics")]
    NoMetricsForVersion(Uuid),
}

/// One row of the evolution timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// The version node.
    pub version: VersionRecord,
    /// Number of metric snapshots attached.
    pub metric_snapshots: usize,
    /// Number of capability progress entries attached.
    pub progress_entries: usize,
    /// Whether this is the current version.
    pub is_current: bool,
}

/// Serializable dump of the tracker's full state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditExport {
    /// Every version node in creation order.
    pub versions: Vec<VersionRecord>,
    /// Metric snapshots keyed by version id (stringified for JSON).
    pub metrics: IndexMap<String, Vec<PerformanceMetrics>>,
    /// Capability progress entries, oldest first.
    pub progress: Vec<CognitiveProgress>,
    /// Comparison reports, oldest first.
    pub comparisons: Vec<VersionComparison>,
    /// Aggregate counts.
    pub summary: AuditSummary,
    /// Export timestamp.
    pub exported_at: DateTime<Utc>,
}

/// Aggregate counts included in an audit export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    /// Versions created.
    pub total_versions: usize,
    /// Metric snapshots recorded.
    pub total_metric_snapshots: usize,
    /// Progress entries recorded.
    pub total_progress_entries: usize,
    /// Comparisons performed.
    pub total_comparisons: usize,
    /// Current version pointer.
    pub current_version: Option<Uuid>,
}

#[derive(Default)]
struct TrackerState {
    versions: IndexMap<Uuid, VersionRecord>,
    metrics: IndexMap<Uuid, Vec<PerformanceMetrics>>,
    progress: Vec<CognitiveProgress>,
    comparisons: Vec<VersionComparison>,
    current: Option<Uuid>,
}

/// Versions the system's configuration/behavior and compares performance
/// across versions. Owns its version tree exclusively.
#[derive(Clone)]
pub struct EvolutionTracker {
    state: Arc<RwLock<TrackerState>>,
    telemetry: Option<EngineTelemetry>,
}

impl std::fmt::Debug for EvolutionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("EvolutionTracker")
            .field("versions", &state.versions.len())
            .field("current", &state.current)
            .finish()
    }
}

impl Default for EvolutionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl EvolutionTracker {
    /// Creates a tracker without telemetry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(TrackerState::default())),
            telemetry: None,
        }
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: EngineTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Appends an immutable version node and moves the current pointer to
    /// it. The parent, when given, must already exist.
    pub async fn create_version(
        &self,
        version: impl Into<String> + Send,
        description: impl Into<String> + Send,
        changes: Vec<String>,
        parent: Option<Uuid>,
    ) -> Result<VersionRecord, EvolutionError> {
        let record = {
            let mut state = self.state.write();
            if let Some(parent_id) = parent {
                if !state.versions.contains_key(&parent_id) {
                    return Err(EvolutionError::UnknownVersion(parent_id));
                }
            }
            let record = VersionRecord {
                id: Uuid::new_v4(),
                version: version.into(),
                description: description.into(),
                changes,
                parent,
                created_at: Utc::now(),
            };
            state.versions.insert(record.id, record.clone());
            state.current = Some(record.id);
            record
        };
        if let Some(tel) = &self.telemetry {
            tel.log(
                LogLevel::Info,
                "evolution.version.created",
                json!({ "version_id": record.id, "version": record.version }),
            );
            tel.persist(VERSIONS_TABLE, json!(record)).await;
        }
        Ok(record)
    }

    /// Appends a metrics snapshot to a version. "Latest" is last appended,
    /// so snapshots must be recorded in chronological order.
    pub async fn record_metrics(
        &self,
        version_id: Uuid,
        metrics: PerformanceMetrics,
    ) -> Result<(), EvolutionError> {
        {
            let mut state = self.state.write();
            if !state.versions.contains_key(&version_id) {
                return Err(EvolutionError::UnknownVersion(version_id));
            }
            state.metrics.entry(version_id).or_default().push(metrics.clone());
        }
        if let Some(tel) = &self.telemetry {
            tel.persist(
                METRICS_TABLE,
                json!({ "version_id": version_id, "metrics": metrics }),
            )
            .await;
        }
        Ok(())
    }

    /// Records a capability proficiency measurement, computing the
    /// improvement rate against the named comparison version's latest
    /// snapshot of the same capability. A missing comparison snapshot, or a
    /// zero prior proficiency, yields a 0% rate rather than an error.
    pub async fn track_progress(
        &self,
        version_id: Uuid,
        capability: impl Into<String> + Send,
        proficiency: f64,
        compared_to: Option<Uuid>,
    ) -> Result<CognitiveProgress, EvolutionError> {
        let capability = capability.into();
        let entry = {
            let mut state = self.state.write();
            if !state.versions.contains_key(&version_id) {
                return Err(EvolutionError::UnknownVersion(version_id));
            }
            if let Some(other) = compared_to {
                if !state.versions.contains_key(&other) {
                    return Err(EvolutionError::UnknownVersion(other));
                }
            }
            let previous = compared_to.and_then(|other| {
                state
                    .progress
                    .iter()
                    .filter(|p| p.version_id == other && p.capability == capability)
                    .next_back()
                    .map(|p| p.proficiency)
            });
            let improvement_rate = match previous {
                Some(old) if old != 0.0 => (proficiency - old) / old * 100.0,
                _ => 0.0,
            };
            let entry = CognitiveProgress {
                id: Uuid::new_v4(),
                version_id,
                capability,
                proficiency,
                improvement_rate,
                compared_to,
                recorded_at: Utc::now(),
            };
            state.progress.push(entry.clone());
            entry
        };
        if let Some(tel) = &self.telemetry {
            tel.persist(PROGRESS_TABLE, json!(entry)).await;
        }
        Ok(entry)
    }

    /// Compares the latest snapshots of two versions. Both must carry at
    /// least one snapshot.
    pub async fn compare_versions(
        &self,
        baseline: Uuid,
        candidate: Uuid,
    ) -> Result<VersionComparison, EvolutionError> {
        let comparison = {
            let state = self.state.read();
            for id in [baseline, candidate] {
                if !state.versions.contains_key(&id) {
                    return Err(EvolutionError::UnknownVersion(id));
                }
            }
            let baseline_metrics = state
                .metrics
                .get(&baseline)
                .and_then(|m| m.last())
                .ok_or(EvolutionError::NoMetricsForVersion(baseline))?;
            let candidate_metrics = state
                .metrics
                .get(&candidate)
                .and_then(|m| m.last())
                .ok_or(EvolutionError::NoMetricsForVersion(candidate))?;
            compare_snapshots(baseline, candidate, baseline_metrics, candidate_metrics)
        };
        self.state.write().comparisons.push(comparison.clone());
        if let Some(tel) = &self.telemetry {
            tel.log(
                LogLevel::Info,
                "evolution.versions.compared",
                json!({
                    "baseline": baseline,
                    "candidate": candidate,
                    "mean_percent_delta": comparison.mean_percent_delta,
                    "recommendation": comparison.recommendation,
                }),
            );
            tel.persist(COMPARISONS_TABLE, json!(comparison)).await;
        }
        Ok(comparison)
    }

    /// Current version pointer.
    #[must_use]
    pub fn current_version(&self) -> Option<VersionRecord> {
        let state = self.state.read();
        state.current.and_then(|id| state.versions.get(&id).cloned())
    }

    /// Chronological version list with attachment counts.
    #[must_use]
    pub fn get_evolution_timeline(&self) -> Vec<TimelineEntry> {
        let state = self.state.read();
        state
            .versions
            .values()
            .map(|version| TimelineEntry {
                metric_snapshots: state.metrics.get(&version.id).map_or(0, Vec::len),
                progress_entries: state
                    .progress
                    .iter()
                    .filter(|p| p.version_id == version.id)
                    .count(),
                is_current: state.current == Some(version.id),
                version: version.clone(),
            })
            .collect()
    }

    /// Per-capability trend summary over all progress entries, bucketed at
    /// +/-5 average improvement rate.
    #[must_use]
    pub fn get_cognitive_capabilities_summary(&self) -> Vec<CapabilitySummary> {
        let state = self.state.read();
        let mut grouped: IndexMap<String, Vec<f64>> = IndexMap::new();
        for entry in &state.progress {
            grouped
                .entry(entry.capability.clone())
                .or_default()
                .push(entry.improvement_rate);
        }
        grouped
            .into_iter()
            .map(|(capability, rates)| {
                #[allow(clippy::cast_precision_loss)]
                let average = rates.iter().sum::<f64>() / rates.len() as f64;
                CapabilitySummary {
                    capability,
                    average_improvement_rate: average,
                    trend: CapabilityTrend::from_average(average),
                    samples: rates.len(),
                }
            })
            .collect()
    }

    /// Exports the tracker's full state. Counts reconstruct the in-memory
    /// collections exactly.
    #[must_use]
    pub fn export_audit_data(&self) -> AuditExport {
        let state = self.state.read();
        let total_metric_snapshots = state.metrics.values().map(Vec::len).sum();
        AuditExport {
            versions: state.versions.values().cloned().collect(),
            metrics: state
                .metrics
                .iter()
                .map(|(id, snapshots)| (id.to_string(), snapshots.clone()))
                .collect(),
            progress: state.progress.clone(),
            comparisons: state.comparisons.clone(),
            summary: AuditSummary {
                total_versions: state.versions.len(),
                total_metric_snapshots,
                total_progress_entries: state.progress.len(),
                total_comparisons: state.comparisons.len(),
                current_version: state.current,
            },
            exported_at: Utc::now(),
        }
    }
}
