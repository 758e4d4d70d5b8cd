//! Anomaly detection against a module's declared thresholds.

use chrono::Utc;
use uuid::Uuid;

use crate::module::{
    Anomaly, AnomalyKind, AnomalySeverity, DiagnosticScan, ManagedModule, ModuleMetrics,
    ModuleStatus,
};

fn relative_deviation(observed: f64, threshold: f64) -> f64 {
    if threshold == 0.0 {
        return 0.0;
    }
    (observed - threshold).abs() / threshold
}

fn anomaly(module: &ManagedModule, kind: AnomalyKind, observed: f64, expected: f64) -> Anomaly {
    let deviation = relative_deviation(observed, expected);
    Anomaly {
        id: Uuid::new_v4(),
        module_id: module.id,
        kind,
        severity: AnomalySeverity::from_deviation(deviation),
        observed,
        expected,
        deviation,
        detected_at: Utc::now(),
    }
}

/// Compares a metrics sample against the module's thresholds. Floors flag
/// values below them, ceilings flag values above them; each breach yields
/// one anomaly whose severity is bucketed by relative deviation.
#[must_use]
pub fn detect_anomalies(module: &ManagedModule, metrics: &ModuleMetrics) -> Vec<Anomaly> {
    let thresholds = &module.thresholds;
    let mut anomalies = Vec::new();

    if metrics.performance_score < thresholds.min_performance {
        anomalies.push(anomaly(
            module,
            AnomalyKind::Performance,
            metrics.performance_score,
            thresholds.min_performance,
        ));
    }
    if metrics.accuracy < thresholds.min_accuracy {
        anomalies.push(anomaly(
            module,
            AnomalyKind::Accuracy,
            metrics.accuracy,
            thresholds.min_accuracy,
        ));
    }
    if metrics.availability < thresholds.min_availability {
        anomalies.push(anomaly(
            module,
            AnomalyKind::Availability,
            metrics.availability,
            thresholds.min_availability,
        ));
    }
    if metrics.resource_usage > thresholds.max_resource_usage {
        anomalies.push(anomaly(
            module,
            AnomalyKind::Resource,
            metrics.resource_usage,
            thresholds.max_resource_usage,
        ));
    }
    if metrics.latency_ms > thresholds.max_latency_ms {
        anomalies.push(anomaly(
            module,
            AnomalyKind::Latency,
            metrics.latency_ms,
            thresholds.max_latency_ms,
        ));
    }

    anomalies
}

/// Builds the scan record for a sampled module.
#[must_use]
pub fn build_scan(module: &ManagedModule, metrics: ModuleMetrics) -> DiagnosticScan {
    let anomalies = detect_anomalies(module, &metrics);
    DiagnosticScan {
        id: Uuid::new_v4(),
        module_id: module.id,
        metrics,
        status: ModuleStatus::from_anomalies(&anomalies),
        anomalies,
        scanned_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{HealthThresholds, ModuleKind};

    fn module_with_min_accuracy(min_accuracy: f64) -> ManagedModule {
        ManagedModule::new("eta-forecaster", ModuleKind::Forecasting).with_thresholds(
            HealthThresholds {
                min_accuracy,
                ..HealthThresholds::default()
            },
        )
    }

    #[test]
    fn accuracy_dip_yields_exactly_one_medium_anomaly() {
        let module = module_with_min_accuracy(90.0);
        let metrics = ModuleMetrics {
            accuracy: 80.0,
            ..ModuleMetrics::nominal()
        };
        let scan = build_scan(&module, metrics);
        assert_eq!(scan.anomalies.len(), 1);
        let anomaly = &scan.anomalies[0];
        assert_eq!(anomaly.kind, AnomalyKind::Accuracy);
        assert!((anomaly.deviation - (90.0 - 80.0) / 90.0).abs() < 1e-9);
        assert_eq!(anomaly.severity, AnomalySeverity::Medium);
        assert_eq!(scan.status, ModuleStatus::Degraded);
    }

    #[test]
    fn nominal_metrics_scan_healthy() {
        let module = ManagedModule::new("dispatcher", ModuleKind::Dispatch);
        let scan = build_scan(&module, ModuleMetrics::nominal());
        assert!(scan.anomalies.is_empty());
        assert_eq!(scan.status, ModuleStatus::Healthy);
    }

    #[test]
    fn every_threshold_breach_is_reported() {
        let module = ManagedModule::new("telemetry-ingest", ModuleKind::Telemetry);
        let metrics = ModuleMetrics {
            performance_score: 30.0,
            accuracy: 40.0,
            availability: 0.5,
            resource_usage: 0.99,
            latency_ms: 900.0,
        };
        let scan = build_scan(&module, metrics);
        assert_eq!(scan.anomalies.len(), 5);
        assert_eq!(scan.status, ModuleStatus::Critical);
    }

    #[test]
    fn high_severity_without_critical_is_failing() {
        let module = module_with_min_accuracy(90.0);
        // Deviation just over 0.3: high, not critical.
        let metrics = ModuleMetrics {
            accuracy: 60.0,
            ..ModuleMetrics::nominal()
        };
        let scan = build_scan(&module, metrics);
        assert_eq!(scan.anomalies[0].severity, AnomalySeverity::High);
        assert_eq!(scan.status, ModuleStatus::Failing);
    }
}
