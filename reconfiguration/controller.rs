//! The reconfiguration controller: watches metrics, applies cause-specific
//! configuration changes, validates them, and rolls back failures.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;
use shared_record_sink::EngineTelemetry;
use uuid::Uuid;

use crate::module::{
    ActionStatus, ImprovementDeltas, MetricsSnapshot, PerfSample, PerformanceValidation,
    ReconfigAction, ReconfigError, ReconfigTrigger, SystemConfiguration, ValidationVerdict,
};
use crate::monitor;
use crate::transforms::{diff_configurations, transform_for_cause};

/// Sink tables written by this engine.
const CONFIGURATIONS_TABLE: &str = "ai_configurations";
const TRIGGERS_TABLE: &str = "ai_reconfig_triggers";
const ACTIONS_TABLE: &str = "ai_reconfig_actions";
const VALIDATIONS_TABLE: &str = "ai_performance_validations";

/// Serializable dump of the controller's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconfigurationExport {
    /// Configuration currently in force.
    pub current: SystemConfiguration,
    /// Displaced configurations, oldest first.
    pub history: Vec<SystemConfiguration>,
    /// Fired triggers, oldest first.
    pub triggers: Vec<ReconfigTrigger>,
    /// Actions in creation order.
    pub actions: Vec<ReconfigAction>,
    /// Validations, oldest first.
    pub validations: Vec<PerformanceValidation>,
    /// Count of fired triggers.
    pub total_triggers: usize,
    /// Count of actions.
    pub total_actions: usize,
    /// Count of validations.
    pub total_validations: usize,
    /// Export timestamp.
    pub exported_at: DateTime<Utc>,
}

struct ControllerState {
    current: SystemConfiguration,
    history: Vec<SystemConfiguration>,
    triggers: Vec<ReconfigTrigger>,
    actions: IndexMap<Uuid, ReconfigAction>,
    validations: Vec<PerformanceValidation>,
}

/// Watches live metrics and reshapes the system configuration when static
/// thresholds are breached. Owns the current-configuration pointer and its
/// append-only history exclusively.
#[derive(Clone)]
pub struct ReconfigurationController {
    state: Arc<RwLock<ControllerState>>,
    telemetry: Option<EngineTelemetry>,
}

impl std::fmt::Debug for ReconfigurationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ReconfigurationController")
            .field("current", &state.current.id)
            .field("history", &state.history.len())
            .field("actions", &state.actions.len())
            .finish()
    }
}

impl Default for ReconfigurationController {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconfigurationController {
    /// Creates a controller running the stock baseline configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ControllerState {
                current: SystemConfiguration::baseline(),
                history: Vec::new(),
                triggers: Vec::new(),
                actions: IndexMap::new(),
                validations: Vec::new(),
            })),
            telemetry: None,
        }
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: EngineTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Installs a caller-supplied configuration as current, appending the
    /// displaced one to the history.
    pub async fn initialize(&self, configuration: SystemConfiguration) {
        {
            let mut state = self.state.write();
            let displaced = std::mem::replace(&mut state.current, configuration);
            state.history.push(displaced);
        }
        let current = self.get_current_configuration();
        if let Some(tel) = &self.telemetry {
            tel.log(
                LogLevel::Info,
                "reconfiguration.initialized",
                json!({ "configuration_id": current.id, "model": current.model }),
            );
            tel.persist(CONFIGURATIONS_TABLE, json!(current)).await;
        }
    }

    /// Checks the live metrics against the static thresholds. At most one
    /// trigger fires per call — the first breached condition in fixed
    /// priority order.
    pub async fn monitor_and_trigger(
        &self,
        metrics: &MetricsSnapshot,
    ) -> Option<ReconfigTrigger> {
        let trigger = monitor::monitor_and_trigger(metrics)?;
        self.state.write().triggers.push(trigger.clone());
        if let Some(tel) = &self.telemetry {
            tel.log(
                LogLevel::Warn,
                "reconfiguration.trigger.fired",
                json!({
                    "trigger_id": trigger.id,
                    "cause": trigger.cause,
                    "threshold": trigger.threshold,
                    "observed": trigger.observed,
                }),
            );
            tel.persist(TRIGGERS_TABLE, json!(trigger)).await;
        }
        Some(trigger)
    }

    /// Computes and applies the cause-specific configuration change. The new
    /// configuration always carries a fresh identity even when no field
    /// moved; the displaced one is appended to the history.
    pub async fn execute_reconfiguration(&self, trigger: &ReconfigTrigger) -> ReconfigAction {
        let action = {
            let mut state = self.state.write();
            let before = state.current.clone();
            let after = transform_for_cause(&before, trigger.cause);
            let diff = diff_configurations(&before, &after, trigger.cause.reason());
            let action = ReconfigAction {
                id: Uuid::new_v4(),
                trigger_id: trigger.id,
                before: before.clone(),
                after: after.clone(),
                diff,
                status: ActionStatus::Applied,
                executed_at: Utc::now(),
            };
            state.history.push(before);
            state.current = after;
            state.actions.insert(action.id, action.clone());
            action
        };
        if let Some(tel) = &self.telemetry {
            tel.log(
                LogLevel::Info,
                "reconfiguration.action.applied",
                json!({
                    "action_id": action.id,
                    "trigger_id": action.trigger_id,
                    "changes": action.diff.len(),
                }),
            );
            tel.persist(ACTIONS_TABLE, json!(action)).await;
            tel.persist(CONFIGURATIONS_TABLE, json!(action.after)).await;
        }
        action
    }

    /// Validates an applied action against before/after performance samples.
    /// A `Failure` verdict rolls the configuration back to the action's
    /// recorded before-state and marks the action reverted.
    pub async fn validate_performance(
        &self,
        action_id: Uuid,
        before: &PerfSample,
        after: &PerfSample,
    ) -> Result<PerformanceValidation, ReconfigError> {
        let deltas = ImprovementDeltas::between(before, after);
        let verdict = ValidationVerdict::from_positive_count(deltas.positive_count());
        let validation = {
            let mut state = self.state.write();
            if !state.actions.contains_key(&action_id) {
                return Err(ReconfigError::UnknownAction(action_id));
            }
            let validation = PerformanceValidation {
                id: Uuid::new_v4(),
                action_id,
                before: *before,
                after: *after,
                deltas,
                verdict,
                validated_at: Utc::now(),
            };
            state.validations.push(validation.clone());
            validation
        };

        if verdict == ValidationVerdict::Failure {
            self.revert_configuration(action_id).await?;
        }

        if let Some(tel) = &self.telemetry {
            tel.log(
                LogLevel::Info,
                "reconfiguration.validation.recorded",
                json!({
                    "validation_id": validation.id,
                    "action_id": action_id,
                    "verdict": verdict,
                }),
            );
            tel.persist(VALIDATIONS_TABLE, json!(validation)).await;
        }
        Ok(validation)
    }

    /// Restores an action's before-state as the current configuration and
    /// marks the action reverted.
    pub async fn revert_configuration(&self, action_id: Uuid) -> Result<(), ReconfigError> {
        let restored = {
            let mut state = self.state.write();
            let action = state
                .actions
                .get_mut(&action_id)
                .ok_or(ReconfigError::UnknownAction(action_id))?;
            action.status = ActionStatus::Reverted;
            let restored = action.before.clone();
            let displaced = std::mem::replace(&mut state.current, restored.clone());
            state.history.push(displaced);
            restored
        };
        if let Some(tel) = &self.telemetry {
            tel.log(
                LogLevel::Warn,
                "reconfiguration.action.reverted",
                json!({ "action_id": action_id, "restored_configuration": restored.id }),
            );
            tel.persist(CONFIGURATIONS_TABLE, json!(restored)).await;
        }
        Ok(())
    }

    /// Configuration currently in force.
    #[must_use]
    pub fn get_current_configuration(&self) -> SystemConfiguration {
        self.state.read().current.clone()
    }

    /// Exports the controller's full state. Counts reconstruct the in-memory
    /// collections exactly.
    #[must_use]
    pub fn export_logs(&self) -> ReconfigurationExport {
        let state = self.state.read();
        ReconfigurationExport {
            current: state.current.clone(),
            history: state.history.clone(),
            triggers: state.triggers.clone(),
            actions: state.actions.values().cloned().collect(),
            validations: state.validations.clone(),
            total_triggers: state.triggers.len(),
            total_actions: state.actions.len(),
            total_validations: state.validations.len(),
            exported_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::TriggerCause;

    fn degraded_metrics() -> MetricsSnapshot {
        MetricsSnapshot {
            error_rate: 0.2,
            performance_score: 80.0,
            resource_usage: 0.5,
            response_time_ms: 100.0,
            consecutive_failures: 0,
            throughput: 50.0,
        }
    }

    fn sample(accuracy: f64, response: f64, errors: f64, throughput: f64) -> PerfSample {
        PerfSample {
            accuracy,
            response_time_ms: response,
            error_rate: errors,
            throughput,
        }
    }

    #[tokio::test]
    async fn trigger_execute_apply_flow() {
        let controller = ReconfigurationController::new();
        let baseline_id = controller.get_current_configuration().id;
        let trigger = controller
            .monitor_and_trigger(&degraded_metrics())
            .await
            .unwrap();
        assert_eq!(trigger.cause, TriggerCause::FailureThresholdExceeded);

        let action = controller.execute_reconfiguration(&trigger).await;
        assert_eq!(action.status, ActionStatus::Applied);
        assert_eq!(action.before.id, baseline_id);
        assert_eq!(controller.get_current_configuration().id, action.after.id);
        assert!(!action.diff.is_empty());
    }

    #[tokio::test]
    async fn failed_validation_rolls_back_to_before_state() {
        let controller = ReconfigurationController::new();
        let trigger = controller
            .monitor_and_trigger(&degraded_metrics())
            .await
            .unwrap();
        let action = controller.execute_reconfiguration(&trigger).await;

        // Only throughput improves: one positive axis, a failure.
        let validation = controller
            .validate_performance(
                action.id,
                &sample(0.9, 100.0, 0.1, 40.0),
                &sample(0.8, 120.0, 0.2, 50.0),
            )
            .await
            .unwrap();
        assert_eq!(validation.verdict, ValidationVerdict::Failure);
        assert_eq!(controller.get_current_configuration().id, action.before.id);
        let export = controller.export_logs();
        assert_eq!(export.actions[0].status, ActionStatus::Reverted);
    }

    #[tokio::test]
    async fn two_positive_axes_is_mixed_and_keeps_configuration() {
        let controller = ReconfigurationController::new();
        let trigger = ReconfigTrigger::manual(degraded_metrics());
        let action = controller.execute_reconfiguration(&trigger).await;
        let validation = controller
            .validate_performance(
                action.id,
                &sample(0.8, 100.0, 0.1, 40.0),
                &sample(0.9, 90.0, 0.2, 30.0),
            )
            .await
            .unwrap();
        assert_eq!(validation.verdict, ValidationVerdict::Mixed);
        assert_eq!(controller.get_current_configuration().id, action.after.id);
    }

    #[tokio::test]
    async fn unknown_action_is_a_caller_error() {
        let controller = ReconfigurationController::new();
        let err = controller
            .validate_performance(
                Uuid::new_v4(),
                &sample(0.8, 100.0, 0.1, 40.0),
                &sample(0.9, 90.0, 0.05, 50.0),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReconfigError::UnknownAction(_)));
    }

    #[tokio::test]
    async fn history_grows_with_every_change() {
        let controller = ReconfigurationController::new();
        controller.initialize(SystemConfiguration::baseline()).await;
        let trigger = ReconfigTrigger::manual(degraded_metrics());
        controller.execute_reconfiguration(&trigger).await;
        let export = controller.export_logs();
        // One displaced by initialize, one by the action.
        assert_eq!(export.history.len(), 2);
        assert_eq!(export.total_actions, 1);
        assert_eq!(export.total_triggers, 0);
        assert_eq!(export.total_validations, 0);
    }
}
