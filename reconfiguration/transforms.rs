//! Cause-specific configuration transforms and field-level diffing.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::module::{FieldChange, SystemConfiguration, TriggerCause};

/// Ratio applied to memory and token budgets under resource overload.
const RESOURCE_SHRINK_RATIO: f64 = 0.75;

/// Temperature multiplier under a failure-threshold breach.
const CONSERVATIVE_TEMPERATURE_RATIO: f64 = 0.5;

/// Derives the next configuration for a trigger cause. The result always
/// carries a fresh id and timestamp, even when no field moved.
#[must_use]
pub fn transform_for_cause(current: &SystemConfiguration, cause: TriggerCause) -> SystemConfiguration {
    let mut next = current.clone();
    next.id = Uuid::new_v4();
    next.created_at = Utc::now();

    match cause {
        TriggerCause::FailureThresholdExceeded => {
            next.model = "helm-conservative".to_string();
            next.strategy = "conservative".to_string();
            let temperature = current.numeric_parameter("temperature").unwrap_or(0.7);
            next.parameters.insert(
                "temperature".to_string(),
                json!((temperature * CONSERVATIVE_TEMPERATURE_RATIO).max(0.1)),
            );
        }
        TriggerCause::PerformanceDegradation => {
            next.priority_weights.accuracy = (current.priority_weights.accuracy + 0.15).min(1.0);
            next.priority_weights.speed = (current.priority_weights.speed + 0.1).min(1.0);
        }
        TriggerCause::ResourceOverload => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
            {
                next.resources.memory_mb =
                    (current.resources.memory_mb as f64 * RESOURCE_SHRINK_RATIO) as u64;
                next.resources.max_tokens =
                    (f64::from(current.resources.max_tokens) * RESOURCE_SHRINK_RATIO) as u32;
            }
            next.priority_weights.cost = (current.priority_weights.cost + 0.2).min(1.0);
        }
        TriggerCause::RepeatedErrors => {
            next.model = "helm-fallback-safe".to_string();
            next.strategy = "fallback".to_string();
            next.parameters.clear();
            next.parameters.insert("temperature".to_string(), json!(0.1));
        }
        TriggerCause::Manual | TriggerCause::Scheduled => {
            // Small bounded exploratory nudge; deterministic by design.
            let temperature = current.numeric_parameter("temperature").unwrap_or(0.7);
            next.parameters.insert(
                "temperature".to_string(),
                json!((temperature + 0.05).min(1.0)),
            );
            let depth = current.numeric_parameter("planning_depth").unwrap_or(3.0);
            next.parameters.insert(
                "planning_depth".to_string(),
                json!((depth + 1.0).min(5.0)),
            );
        }
    }

    next
}

/// Computes the field-level diff between two configurations: a flat
/// comparison of the named fields plus a nested scan of the parameter map.
#[must_use]
pub fn diff_configurations(
    before: &SystemConfiguration,
    after: &SystemConfiguration,
    reason: &str,
) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    let mut push = |field: &str, old: serde_json::Value, new: serde_json::Value| {
        if old != new {
            changes.push(FieldChange {
                field: field.to_string(),
                old,
                new,
                reason: reason.to_string(),
            });
        }
    };

    push("model", json!(before.model), json!(after.model));
    push("strategy", json!(before.strategy), json!(after.strategy));
    push(
        "resources.cpu_cores",
        json!(before.resources.cpu_cores),
        json!(after.resources.cpu_cores),
    );
    push(
        "resources.memory_mb",
        json!(before.resources.memory_mb),
        json!(after.resources.memory_mb),
    );
    push(
        "resources.timeout_ms",
        json!(before.resources.timeout_ms),
        json!(after.resources.timeout_ms),
    );
    push(
        "resources.max_tokens",
        json!(before.resources.max_tokens),
        json!(after.resources.max_tokens),
    );
    push(
        "priority_weights.accuracy",
        json!(before.priority_weights.accuracy),
        json!(after.priority_weights.accuracy),
    );
    push(
        "priority_weights.speed",
        json!(before.priority_weights.speed),
        json!(after.priority_weights.speed),
    );
    push(
        "priority_weights.cost",
        json!(before.priority_weights.cost),
        json!(after.priority_weights.cost),
    );

    // Nested scan over the union of parameter keys.
    let mut keys: Vec<&String> = before.parameters.keys().collect();
    for key in after.parameters.keys() {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    for key in keys {
        let old = before.parameters.get(key).cloned().unwrap_or(json!(null));
        let new = after.parameters.get(key).cloned().unwrap_or(json!(null));
        push(&format!("parameters.{key}"), old, new);
    }

    changes
}
