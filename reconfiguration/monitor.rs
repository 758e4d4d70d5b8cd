//! Threshold monitoring over live metrics.

use chrono::Utc;
use uuid::Uuid;

use crate::module::{MetricsSnapshot, ReconfigTrigger, TriggerCause};

/// Error-rate ceiling.
pub const ERROR_RATE_THRESHOLD: f64 = 0.15;
/// Performance-score floor.
pub const PERFORMANCE_FLOOR: f64 = 60.0;
/// Resource-saturation ceiling.
pub const RESOURCE_CEILING: f64 = 0.90;
/// Consecutive-failure limit.
pub const CONSECUTIVE_FAILURE_LIMIT: u32 = 3;

/// Checks the four static conditions in fixed priority order and returns at
/// most one trigger — the first matching condition, even when several are
/// breached at once. Single-trigger-per-call is the explicit policy here:
/// one corrective change is applied and validated before another condition
/// is allowed to fire.
#[must_use]
pub fn monitor_and_trigger(metrics: &MetricsSnapshot) -> Option<ReconfigTrigger> {
    let breach = if metrics.error_rate > ERROR_RATE_THRESHOLD {
        Some((
            TriggerCause::FailureThresholdExceeded,
            ERROR_RATE_THRESHOLD,
            metrics.error_rate,
        ))
    } else if metrics.performance_score < PERFORMANCE_FLOOR {
        Some((
            TriggerCause::PerformanceDegradation,
            PERFORMANCE_FLOOR,
            metrics.performance_score,
        ))
    } else if metrics.resource_usage > RESOURCE_CEILING {
        Some((
            TriggerCause::ResourceOverload,
            RESOURCE_CEILING,
            metrics.resource_usage,
        ))
    } else if metrics.consecutive_failures >= CONSECUTIVE_FAILURE_LIMIT {
        Some((
            TriggerCause::RepeatedErrors,
            f64::from(CONSECUTIVE_FAILURE_LIMIT),
            f64::from(metrics.consecutive_failures),
        ))
    } else {
        None
    };

    breach.map(|(cause, threshold, observed)| ReconfigTrigger {
        id: Uuid::new_v4(),
        cause,
        metrics: *metrics,
        threshold,
        observed,
        fired_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> MetricsSnapshot {
        MetricsSnapshot {
            error_rate: 0.05,
            performance_score: 85.0,
            resource_usage: 0.5,
            response_time_ms: 100.0,
            consecutive_failures: 0,
            throughput: 50.0,
        }
    }

    #[test]
    fn healthy_metrics_fire_nothing() {
        assert!(monitor_and_trigger(&healthy()).is_none());
    }

    #[test]
    fn error_rate_breach_fires_failure_threshold() {
        let metrics = MetricsSnapshot {
            error_rate: 0.2,
            performance_score: 80.0,
            ..healthy()
        };
        let trigger = monitor_and_trigger(&metrics).unwrap();
        assert_eq!(trigger.cause, TriggerCause::FailureThresholdExceeded);
        assert!((trigger.observed - 0.2).abs() < f64::EPSILON);
        assert!((trigger.threshold - ERROR_RATE_THRESHOLD).abs() < f64::EPSILON);
    }

    #[test]
    fn first_matching_condition_wins_when_several_breach() {
        let metrics = MetricsSnapshot {
            error_rate: 0.2,
            performance_score: 40.0,
            resource_usage: 0.95,
            consecutive_failures: 5,
            ..healthy()
        };
        let trigger = monitor_and_trigger(&metrics).unwrap();
        assert_eq!(trigger.cause, TriggerCause::FailureThresholdExceeded);
    }

    #[test]
    fn remaining_conditions_fire_in_declared_order() {
        let degraded = MetricsSnapshot {
            performance_score: 40.0,
            resource_usage: 0.95,
            ..healthy()
        };
        assert_eq!(
            monitor_and_trigger(&degraded).unwrap().cause,
            TriggerCause::PerformanceDegradation
        );

        let overloaded = MetricsSnapshot {
            resource_usage: 0.95,
            consecutive_failures: 4,
            ..healthy()
        };
        assert_eq!(
            monitor_and_trigger(&overloaded).unwrap().cause,
            TriggerCause::ResourceOverload
        );

        let flapping = MetricsSnapshot {
            consecutive_failures: 3,
            ..healthy()
        };
        assert_eq!(
            monitor_and_trigger(&flapping).unwrap().cause,
            TriggerCause::RepeatedErrors
        );
    }
}
