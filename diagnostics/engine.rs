//! The diagnostic-recovery engine: module registry, scans, recovery plans,
//! and plan execution.

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
    DiagnosticError, DiagnosticScan, ManagedModule, ModuleStatus,
};
use crate::probes::{MetricsProbe, SimulatedProbe};
use crate::recovery::executor::{ActionExecutor, RecoveryExecution, SimulatedExecutor};
use crate::recovery::{build_plan, PlanStatus, RecoveryPlan};
use crate::scanner::build_scan;

/// Sink tables written by this engine.
const SCANS_TABLE: &str = "ai_diagnostic_scans";
const PLANS_TABLE: &str = "ai_recovery_plans";
const EXECUTIONS_TABLE: &str = "ai_recovery_executions";

/// Plans scoring above this abort on the first failed action.
const ABORT_PRIORITY_THRESHOLD: f64 = 7.0;

/// Health line for one module in the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleHealth {
    /// Module id.
    pub module_id: Uuid,
    /// Module name.
    pub name: String,
    /// Status from the latest scan; absent when never scanned.
    pub status: Option<ModuleStatus>,
    /// Anomalies in the latest scan.
    pub anomalies: usize,
    /// Latest scan timestamp.
    pub last_scanned_at: Option<DateTime<Utc>>,
}

/// Fleet-wide health summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleHealthSummary {
    /// Per-module health lines in registration order.
    pub modules: Vec<ModuleHealth>,
    /// Registered module count.
    pub total_modules: usize,
    /// Modules whose latest scan was healthy.
    pub healthy: usize,
    /// Modules whose latest scan found anomalies.
    pub unhealthy: usize,
    /// Summary timestamp.
    pub generated_at: DateTime<Utc>,
}

/// Serializable dump of the engine's diagnostic history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsExport {
    /// All scans, oldest first.
    pub scans: Vec<DiagnosticScan>,
    /// All plans in creation order.
    pub plans: Vec<RecoveryPlan>,
    /// All action executions, oldest first.
    pub executions: Vec<RecoveryExecution>,
    /// Count of scans.
    pub total_scans: usize,
    /// Count of plans.
    pub total_plans: usize,
    /// Count of executions.
    pub total_executions: usize,
    /// Export timestamp.
    pub exported_at: DateTime<Utc>,
}

#[derive(Default)]
struct EngineState {
    modules: IndexMap<Uuid, ManagedModule>,
    scans: Vec<DiagnosticScan>,
    plans: IndexMap<Uuid, RecoveryPlan>,
    plan_by_scan: IndexMap<Uuid, Uuid>,
    executions: Vec<RecoveryExecution>,
}

/// Scans registered modules for health anomalies, builds prioritized
/// recovery plans, and executes corrective actions. Owns its registry and
/// history exclusively.
#[derive(Clone)]
pub struct DiagnosticRecoveryEngine {
    state: Arc<RwLock<EngineState>>,
    probe: Arc<dyn MetricsProbe>,
    executor: Arc<dyn ActionExecutor>,
    telemetry: Option<EngineTelemetry>,
}

impl std::fmt::Debug for DiagnosticRecoveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("DiagnosticRecoveryEngine")
            .field("modules", &state.modules.len())
            .field("scans", &state.scans.len())
            .field("plans", &state.plans.len())
            .finish()
    }
}

impl Default for DiagnosticRecoveryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticRecoveryEngine {
    /// Creates an engine with the simulated probe and executor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(EngineState::default())),
            probe: Arc::new(SimulatedProbe::new()),
            executor: Arc::new(SimulatedExecutor::new()),
            telemetry: None,
        }
    }

    /// Swaps in a metrics probe (real telemetry or a deterministic fake).
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn MetricsProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Swaps in an action executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: EngineTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Registers a module. Each module registers exactly once.
    pub fn register_module(&self, module: ManagedModule) -> Result<Uuid, DiagnosticError> {
        let mut state = self.state.write();
        if state.modules.contains_key(&module.id) {
            return Err(DiagnosticError::DuplicateModule(module.id));
        }
        let id = module.id;
        state.modules.insert(id, module);
        Ok(id)
    }

    /// Ids of all registered modules, in registration order.
    #[must_use]
    pub fn module_ids(&self) -> Vec<Uuid> {
        self.state.read().modules.keys().copied().collect()
    }

    /// Samples a module's metrics and records a diagnostic scan.
    pub async fn scan_module(&self, module_id: Uuid) -> Result<DiagnosticScan, DiagnosticError> {
        let module = self
            .state
            .read()
            .modules
            .get(&module_id)
            .cloned()
            .ok_or(DiagnosticError::UnknownModule(module_id))?;
        let metrics = self
            .probe
            .sample(&module)
            .await
            .map_err(|err| DiagnosticError::ProbeFailed(err.to_string()))?;
        let scan = build_scan(&module, metrics);
        self.state.write().scans.push(scan.clone());
        if let Some(tel) = &self.telemetry {
            tel.log(
                LogLevel::Info,
                "diagnostics.scan.completed",
                json!({
                    "scan_id": scan.id,
                    "module": module.name,
                    "status": scan.status,
                    "anomalies": scan.anomalies.len(),
                }),
            );
            tel.persist(SCANS_TABLE, json!(scan)).await;
        }
        Ok(scan)
    }

    /// Builds the single recovery plan for a scan with anomalies. A healthy
    /// scan, or a scan that already has a plan, is a caller error.
    pub async fn create_recovery_plan(
        &self,
        scan_id: Uuid,
    ) -> Result<RecoveryPlan, DiagnosticError> {
        let plan = {
            let mut state = self.state.write();
            if state.plan_by_scan.contains_key(&scan_id) {
                return Err(DiagnosticError::DuplicatePlanForScan(scan_id));
            }
            let scan = state
                .scans
                .iter()
                .find(|s| s.id == scan_id)
                .ok_or(DiagnosticError::UnknownScan(scan_id))?;
            let plan = build_plan(scan).ok_or(DiagnosticError::NoAnomalies(scan_id))?;
            state.plan_by_scan.insert(scan_id, plan.id);
            state.plans.insert(plan.id, plan.clone());
            plan
        };
        if let Some(tel) = &self.telemetry {
            tel.log(
                LogLevel::Warn,
                "diagnostics.plan.created",
                json!({
                    "plan_id": plan.id,
                    "module_id": plan.module_id,
                    "actions": plan.actions.len(),
                    "priority_score": plan.priority_score,
                    "auto_execute": plan.auto_execute,
                }),
            );
            tel.persist(PLANS_TABLE, json!(plan)).await;
        }
        Ok(plan)
    }

    /// Executes a plan's actions in descending severity order. A failed
    /// action aborts the remainder when the plan's priority score exceeds
    /// the abort threshold; the plan completes only if every action was
    /// attempted and succeeded. Completed and failed plans are terminal.
    pub async fn execute_recovery_plan(
        &self,
        plan_id: Uuid,
    ) -> Result<Vec<RecoveryExecution>, DiagnosticError> {
        let (module, plan) = {
            let mut state = self.state.write();
            let plan = state
                .plans
                .get_mut(&plan_id)
                .ok_or(DiagnosticError::UnknownPlan(plan_id))?;
            if plan.is_terminal() {
                return Err(DiagnosticError::PlanAlreadyTerminal(plan_id));
            }
            plan.status = PlanStatus::Executing;
            let plan = plan.clone();
            let module = state
                .modules
                .get(&plan.module_id)
                .cloned()
                .ok_or(DiagnosticError::UnknownModule(plan.module_id))?;
            (module, plan)
        };

        let mut executions = Vec::new();
        let mut aborted = false;
        for action in &plan.actions {
            let outcome = match self.executor.execute(&module, action).await {
                Ok(outcome) => outcome,
                Err(err) => crate::recovery::executor::ExecutionOutcome {
                    success: false,
                    log: vec![format!("executor error: {err}")],
                    downtime_secs: 0,
                    improvement: 0.0,
                },
            };
            let execution = RecoveryExecution {
                id: Uuid::new_v4(),
                plan_id,
                action_id: action.id,
                success: outcome.success,
                log: outcome.log,
                downtime_secs: outcome.downtime_secs,
                improvement: outcome.improvement,
                executed_at: Utc::now(),
            };
            if let Some(tel) = &self.telemetry {
                tel.persist(EXECUTIONS_TABLE, json!(execution)).await;
            }
            let failed = !execution.success;
            executions.push(execution);
            if failed && plan.priority_score > ABORT_PRIORITY_THRESHOLD {
                aborted = true;
                break;
            }
        }

        let all_attempted = executions.len() == plan.actions.len();
        let all_succeeded = executions.iter().all(|e| e.success);
        let final_status = if !aborted && all_attempted && all_succeeded {
            PlanStatus::Completed
        } else {
            PlanStatus::Failed
        };
        {
            let mut state = self.state.write();
            if let Some(plan) = state.plans.get_mut(&plan_id) {
                plan.status = final_status;
            }
            state.executions.extend(executions.iter().cloned());
        }
        if let Some(tel) = &self.telemetry {
            tel.log(
                if final_status == PlanStatus::Completed {
                    LogLevel::Info
                } else {
                    LogLevel::Error
                },
                "diagnostics.plan.executed",
                json!({
                    "plan_id": plan_id,
                    "status": final_status,
                    "attempted": executions.len(),
                    "aborted_early": aborted,
                }),
            );
        }
        Ok(executions)
    }

    /// Scans every registered module, planning and (where allowed)
    /// executing recovery. One pass of the diagnostic loop.
    pub async fn run_diagnostic_cycle(&self) {
        for module_id in self.module_ids() {
            match self.scan_module(module_id).await {
                Ok(scan) if !scan.anomalies.is_empty() => {
                    match self.create_recovery_plan(scan.id).await {
                        Ok(plan) if plan.auto_execute => {
                            if let Err(err) = self.execute_recovery_plan(plan.id).await {
                                tracing::warn!(%err, "auto recovery failed");
                            }
                        }
                        Ok(_) => {}
                        Err(err) => tracing::warn!(%err, "recovery planning failed"),
                    }
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(%err, "module scan failed"),
            }
        }
    }

    /// Latest health line per module plus aggregate counts.
    #[must_use]
    pub fn get_module_health_summary(&self) -> ModuleHealthSummary {
        let state = self.state.read();
        let modules: Vec<ModuleHealth> = state
            .modules
            .values()
            .map(|module| {
                let latest = state
                    .scans
                    .iter()
                    .filter(|s| s.module_id == module.id)
                    .next_back();
                ModuleHealth {
                    module_id: module.id,
                    name: module.name.clone(),
                    status: latest.map(|s| s.status),
                    anomalies: latest.map_or(0, |s| s.anomalies.len()),
                    last_scanned_at: latest.map(|s| s.scanned_at),
                }
            })
            .collect();
        let healthy = modules
            .iter()
            .filter(|m| m.status == Some(ModuleStatus::Healthy))
            .count();
        let unhealthy = modules
            .iter()
            .filter(|m| m.status.is_some_and(|s| s != ModuleStatus::Healthy))
            .count();
        ModuleHealthSummary {
            total_modules: modules.len(),
            healthy,
            unhealthy,
            modules,
            generated_at: Utc::now(),
        }
    }

    /// Exports the engine's diagnostic history. Counts reconstruct the
    /// in-memory collections exactly.
    #[must_use]
    pub fn export_logs(&self) -> DiagnosticsExport {
        let state = self.state.read();
        DiagnosticsExport {
            scans: state.scans.clone(),
            plans: state.plans.values().cloned().collect(),
            executions: state.executions.clone(),
            total_scans: state.scans.len(),
            total_plans: state.plans.len(),
            total_executions: state.executions.len(),
            exported_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{AnomalyKind, AnomalySeverity, HealthThresholds, ModuleKind, ModuleMetrics};
    use crate::probes::FixedProbe;
    use crate::recovery::executor::ScriptedExecutor;

    fn forecaster_with_min_accuracy(min_accuracy: f64) -> ManagedModule {
        ManagedModule::new("eta-forecaster", ModuleKind::Forecasting).with_thresholds(
            HealthThresholds {
                min_accuracy,
                ..HealthThresholds::default()
            },
        )
    }

    fn engine_with(metrics: ModuleMetrics, succeed: bool) -> DiagnosticRecoveryEngine {
        DiagnosticRecoveryEngine::new()
            .with_probe(Arc::new(FixedProbe::new(metrics)))
            .with_executor(Arc::new(ScriptedExecutor::new(succeed)))
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let engine = DiagnosticRecoveryEngine::new();
        let module = ManagedModule::new("dispatcher", ModuleKind::Dispatch);
        engine.register_module(module.clone()).unwrap();
        let err = engine.register_module(module).unwrap_err();
        assert!(matches!(err, DiagnosticError::DuplicateModule(_)));
    }

    #[tokio::test]
    async fn accuracy_dip_scenario_end_to_end() {
        let metrics = ModuleMetrics {
            accuracy: 80.0,
            ..ModuleMetrics::nominal()
        };
        let engine = engine_with(metrics, true);
        let module_id = engine
            .register_module(forecaster_with_min_accuracy(90.0))
            .unwrap();
        let scan = engine.scan_module(module_id).await.unwrap();
        assert_eq!(scan.anomalies.len(), 1);
        assert_eq!(scan.anomalies[0].kind, AnomalyKind::Accuracy);
        assert_eq!(scan.anomalies[0].severity, AnomalySeverity::Medium);
        assert_eq!(scan.status, ModuleStatus::Degraded);

        let plan = engine.create_recovery_plan(scan.id).await.unwrap();
        assert!(plan.auto_execute);
        let executions = engine.execute_recovery_plan(plan.id).await.unwrap();
        assert_eq!(executions.len(), 1);
        assert!(executions[0].success);
        let export = engine.export_logs();
        assert_eq!(export.plans[0].status, PlanStatus::Completed);
    }

    #[tokio::test]
    async fn second_plan_for_same_scan_is_rejected() {
        let metrics = ModuleMetrics {
            accuracy: 80.0,
            ..ModuleMetrics::nominal()
        };
        let engine = engine_with(metrics, true);
        let module_id = engine
            .register_module(forecaster_with_min_accuracy(90.0))
            .unwrap();
        let scan = engine.scan_module(module_id).await.unwrap();
        engine.create_recovery_plan(scan.id).await.unwrap();
        let err = engine.create_recovery_plan(scan.id).await.unwrap_err();
        assert!(matches!(err, DiagnosticError::DuplicatePlanForScan(_)));
    }

    #[tokio::test]
    async fn high_priority_plan_aborts_on_first_failure() {
        // Accuracy far below floor (high severity) plus a latency breach:
        // priority 7.5, so a failed action stops the remainder.
        let metrics = ModuleMetrics {
            accuracy: 60.0,
            latency_ms: 600.0,
            ..ModuleMetrics::nominal()
        };
        let engine = engine_with(metrics, false);
        let module_id = engine
            .register_module(forecaster_with_min_accuracy(90.0))
            .unwrap();
        let scan = engine.scan_module(module_id).await.unwrap();
        assert_eq!(scan.anomalies.len(), 2);
        let plan = engine.create_recovery_plan(scan.id).await.unwrap();
        assert!(plan.priority_score > 7.0);
        let executions = engine.execute_recovery_plan(plan.id).await.unwrap();
        assert_eq!(executions.len(), 1);
        let export = engine.export_logs();
        assert_eq!(export.plans[0].status, PlanStatus::Failed);
    }

    #[tokio::test]
    async fn low_priority_plan_attempts_every_action() {
        // Two mild breaches: priority 4.5, failures do not abort the rest.
        let metrics = ModuleMetrics {
            accuracy: 76.0,
            latency_ms: 560.0,
            ..ModuleMetrics::nominal()
        };
        let engine = engine_with(metrics, false);
        let module_id = engine
            .register_module(forecaster_with_min_accuracy(90.0))
            .unwrap();
        let scan = engine.scan_module(module_id).await.unwrap();
        assert_eq!(scan.anomalies.len(), 2);
        let plan = engine.create_recovery_plan(scan.id).await.unwrap();
        assert!(plan.priority_score <= 7.0);
        let executions = engine.execute_recovery_plan(plan.id).await.unwrap();
        assert_eq!(executions.len(), 2);
        let export = engine.export_logs();
        assert_eq!(export.plans[0].status, PlanStatus::Failed);
    }

    #[tokio::test]
    async fn terminal_plans_cannot_rerun() {
        let metrics = ModuleMetrics {
            accuracy: 80.0,
            ..ModuleMetrics::nominal()
        };
        let engine = engine_with(metrics, true);
        let module_id = engine
            .register_module(forecaster_with_min_accuracy(90.0))
            .unwrap();
        let scan = engine.scan_module(module_id).await.unwrap();
        let plan = engine.create_recovery_plan(scan.id).await.unwrap();
        engine.execute_recovery_plan(plan.id).await.unwrap();
        let err = engine.execute_recovery_plan(plan.id).await.unwrap_err();
        assert!(matches!(err, DiagnosticError::PlanAlreadyTerminal(_)));
    }

    #[tokio::test]
    async fn health_summary_tracks_latest_scans() {
        let engine = engine_with(ModuleMetrics::nominal(), true);
        let healthy_id = engine
            .register_module(ManagedModule::new("dispatcher", ModuleKind::Dispatch))
            .unwrap();
        engine
            .register_module(ManagedModule::new("never-scanned", ModuleKind::Telemetry))
            .unwrap();
        engine.scan_module(healthy_id).await.unwrap();
        let summary = engine.get_module_health_summary();
        assert_eq!(summary.total_modules, 2);
        assert_eq!(summary.healthy, 1);
        assert_eq!(summary.unhealthy, 0);
        assert!(summary.modules[1].status.is_none());
    }

    #[tokio::test]
    async fn cycle_scans_plans_and_executes_automatically() {
        let metrics = ModuleMetrics {
            accuracy: 80.0,
            ..ModuleMetrics::nominal()
        };
        let engine = engine_with(metrics, true);
        engine
            .register_module(forecaster_with_min_accuracy(90.0))
            .unwrap();
        engine.run_diagnostic_cycle().await;
        let export = engine.export_logs();
        assert_eq!(export.total_scans, 1);
        assert_eq!(export.total_plans, 1);
        assert_eq!(export.total_executions, 1);
        assert_eq!(export.plans[0].status, PlanStatus::Completed);
    }
}
