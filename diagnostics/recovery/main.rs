//! Recovery planning: a fixed anomaly-to-action playbook and prioritized,
//! auto-executable plans.

/// Action execution adapters.
pub mod executor;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::module::{Anomaly, AnomalyKind, AnomalySeverity, DiagnosticScan};

/// Corrective action class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryActionKind {
    /// Adjust parameters or allocation in place.
    Reconfigure,
    /// Restart the module.
    Restart,
    /// Switch to a fallback implementation.
    Fallback,
    /// Escalate to an operator; no automated change.
    Alert,
}

/// One corrective step inside a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryActionItem {
    /// Unique identifier.
    pub id: Uuid,
    /// Anomaly the action addresses.
    pub anomaly_id: Uuid,
    /// Severity inherited from the anomaly; drives execution order.
    pub severity: AnomalySeverity,
    /// Action class.
    pub kind: RecoveryActionKind,
    /// Operator-facing description.
    pub description: String,
    /// Expected downtime in seconds.
    pub estimated_downtime_secs: u64,
    /// Expected operational impact.
    pub estimated_impact: String,
}

/// Lifecycle of a recovery plan. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Built, awaiting execution.
    Proposed,
    /// Actions are being executed.
    Executing,
    /// Every action was attempted and succeeded.
    Completed,
    /// Execution failed or was aborted.
    Failed,
}

/// Ordered, priority-scored set of corrective actions generated from one
/// diagnostic scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryPlan {
    /// Unique identifier.
    pub id: Uuid,
    /// Module being recovered.
    pub module_id: Uuid,
    /// Scan the plan was generated from.
    pub scan_id: Uuid,
    /// Actions ordered by descending severity.
    pub actions: Vec<RecoveryActionItem>,
    /// Urgency score (0-10).
    pub priority_score: f64,
    /// Whether the plan may run without operator approval. Always false
    /// when any source anomaly is critical.
    pub auto_execute: bool,
    /// Lifecycle state.
    pub status: PlanStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl RecoveryPlan {
    /// True once the plan is completed or failed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, PlanStatus::Completed | PlanStatus::Failed)
    }
}

/// Fixed playbook mapping an anomaly to its corrective action. Performance
/// branches on severity; resource problems always get a zero-downtime
/// reconfigure; anything without a specific playbook escalates as an alert.
#[must_use]
pub fn action_for_anomaly(anomaly: &Anomaly) -> RecoveryActionItem {
    let (kind, description, downtime, impact) = match (anomaly.kind, anomaly.severity) {
        (AnomalyKind::Performance, AnomalySeverity::High | AnomalySeverity::Critical) => (
            RecoveryActionKind::Restart,
            "restart module to clear degraded state".to_string(),
            30,
            "module offline for the restart window".to_string(),
        ),
        (AnomalyKind::Performance, _) => (
            RecoveryActionKind::Reconfigure,
            "tune module parameters in place".to_string(),
            0,
            "no interruption".to_string(),
        ),
        (AnomalyKind::Accuracy, _) => (
            RecoveryActionKind::Fallback,
            "switch to fallback model pending retraining".to_string(),
            10,
            "reduced sophistication while the fallback serves".to_string(),
        ),
        (AnomalyKind::Availability, AnomalySeverity::High | AnomalySeverity::Critical) => (
            RecoveryActionKind::Restart,
            "restart module to restore availability".to_string(),
            30,
            "module offline for the restart window".to_string(),
        ),
        (AnomalyKind::Resource, _) => (
            RecoveryActionKind::Reconfigure,
            "shrink resource allocation in place".to_string(),
            0,
            "no interruption".to_string(),
        ),
        (AnomalyKind::Latency, _) => (
            RecoveryActionKind::Reconfigure,
            "reduce batch size and tighten timeouts".to_string(),
            5,
            "brief queuing while settings apply".to_string(),
        ),
        // No automated playbook: manual escalation, zero downtime.
        (AnomalyKind::Availability, _) => (
            RecoveryActionKind::Alert,
            "notify on-call operator for manual review".to_string(),
            0,
            "no automated change".to_string(),
        ),
    };
    RecoveryActionItem {
        id: Uuid::new_v4(),
        anomaly_id: anomaly.id,
        severity: anomaly.severity,
        kind,
        description,
        estimated_downtime_secs: downtime,
        estimated_impact: impact,
    }
}

const SEVERITY_WEIGHTS: [(AnomalySeverity, f64); 4] = [
    (AnomalySeverity::Low, 2.0),
    (AnomalySeverity::Medium, 4.0),
    (AnomalySeverity::High, 7.0),
    (AnomalySeverity::Critical, 9.0),
];

fn severity_weight(severity: AnomalySeverity) -> f64 {
    SEVERITY_WEIGHTS
        .iter()
        .find(|(s, _)| *s == severity)
        .map_or(2.0, |(_, w)| *w)
}

/// Urgency score: the worst anomaly's weight plus half a point for every
/// additional anomaly, capped at 10.
#[must_use]
pub fn priority_score(anomalies: &[Anomaly]) -> f64 {
    let worst = anomalies
        .iter()
        .map(|a| severity_weight(a.severity))
        .fold(0.0, f64::max);
    #[allow(clippy::cast_precision_loss)]
    let extra = anomalies.len().saturating_sub(1) as f64 * 0.5;
    (worst + extra).min(10.0)
}

/// Builds the single recovery plan for a scan. Returns `None` when the scan
/// found nothing to recover from. Actions are ordered by descending
/// severity; the plan may auto-execute only if no anomaly is critical.
#[must_use]
pub fn build_plan(scan: &DiagnosticScan) -> Option<RecoveryPlan> {
    if scan.anomalies.is_empty() {
        return None;
    }
    let mut actions: Vec<RecoveryActionItem> =
        scan.anomalies.iter().map(action_for_anomaly).collect();
    actions.sort_by(|a, b| b.severity.cmp(&a.severity));
    let has_critical = scan
        .anomalies
        .iter()
        .any(|a| a.severity == AnomalySeverity::Critical);
    Some(RecoveryPlan {
        id: Uuid::new_v4(),
        module_id: scan.module_id,
        scan_id: scan.id,
        actions,
        priority_score: priority_score(&scan.anomalies),
        auto_execute: !has_critical,
        status: PlanStatus::Proposed,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleStatus, ModuleMetrics};

    fn anomaly(kind: AnomalyKind, severity: AnomalySeverity) -> Anomaly {
        Anomaly {
            id: Uuid::new_v4(),
            module_id: Uuid::new_v4(),
            kind,
            severity,
            observed: 1.0,
            expected: 2.0,
            deviation: 0.5,
            detected_at: Utc::now(),
        }
    }

    fn scan_with(anomalies: Vec<Anomaly>) -> DiagnosticScan {
        DiagnosticScan {
            id: Uuid::new_v4(),
            module_id: Uuid::new_v4(),
            metrics: ModuleMetrics::nominal(),
            status: ModuleStatus::from_anomalies(&anomalies),
            anomalies,
            scanned_at: Utc::now(),
        }
    }

    #[test]
    fn resource_anomalies_get_zero_downtime_reconfigure() {
        let action = action_for_anomaly(&anomaly(AnomalyKind::Resource, AnomalySeverity::Critical));
        assert_eq!(action.kind, RecoveryActionKind::Reconfigure);
        assert_eq!(action.estimated_downtime_secs, 0);
    }

    #[test]
    fn performance_mapping_branches_on_severity() {
        let severe =
            action_for_anomaly(&anomaly(AnomalyKind::Performance, AnomalySeverity::High));
        assert_eq!(severe.kind, RecoveryActionKind::Restart);
        let mild = action_for_anomaly(&anomaly(AnomalyKind::Performance, AnomalySeverity::Low));
        assert_eq!(mild.kind, RecoveryActionKind::Reconfigure);
    }

    #[test]
    fn unhandled_availability_levels_escalate_as_alerts() {
        let action =
            action_for_anomaly(&anomaly(AnomalyKind::Availability, AnomalySeverity::Low));
        assert_eq!(action.kind, RecoveryActionKind::Alert);
        assert_eq!(action.estimated_downtime_secs, 0);
    }

    #[test]
    fn any_critical_anomaly_blocks_auto_execution() {
        let plan = build_plan(&scan_with(vec![
            anomaly(AnomalyKind::Latency, AnomalySeverity::Low),
            anomaly(AnomalyKind::Accuracy, AnomalySeverity::Critical),
            anomaly(AnomalyKind::Resource, AnomalySeverity::Medium),
        ]))
        .unwrap();
        assert!(!plan.auto_execute);
        assert_eq!(plan.status, PlanStatus::Proposed);

        let tame = build_plan(&scan_with(vec![anomaly(
            AnomalyKind::Latency,
            AnomalySeverity::High,
        )]))
        .unwrap();
        assert!(tame.auto_execute);
    }

    #[test]
    fn actions_ordered_by_descending_severity() {
        let plan = build_plan(&scan_with(vec![
            anomaly(AnomalyKind::Latency, AnomalySeverity::Low),
            anomaly(AnomalyKind::Performance, AnomalySeverity::Critical),
            anomaly(AnomalyKind::Accuracy, AnomalySeverity::Medium),
        ]))
        .unwrap();
        let severities: Vec<AnomalySeverity> =
            plan.actions.iter().map(|a| a.severity).collect();
        assert_eq!(
            severities,
            vec![
                AnomalySeverity::Critical,
                AnomalySeverity::Medium,
                AnomalySeverity::Low
            ]
        );
    }

    #[test]
    fn priority_score_caps_at_ten() {
        let many: Vec<Anomaly> = (0..8)
            .map(|_| anomaly(AnomalyKind::Latency, AnomalySeverity::Critical))
            .collect();
        assert!((priority_score(&many) - 10.0).abs() < f64::EPSILON);
        let single = vec![anomaly(AnomalyKind::Latency, AnomalySeverity::Medium)];
        assert!((priority_score(&single) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn healthy_scan_builds_no_plan() {
        assert!(build_plan(&scan_with(Vec::new())).is_none());
    }
}
