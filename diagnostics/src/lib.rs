#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Diagnostic-recovery loop: periodic module health scans, prioritized
//! recovery plans, and corrective action execution.

/// The cancellable diagnostic loop.
#[path = "../cycle.rs"]
pub mod cycle;

/// The engine facade.
#[path = "../engine.rs"]
pub mod engine;

/// Modules, thresholds, and anomaly records.
#[path = "../module.rs"]
pub mod module;

/// Metrics probes.
#[path = "../probes.rs"]
pub mod probes;

/// Recovery planning and execution.
#[path = "../recovery/main.rs"]
pub mod recovery;

/// Anomaly detection.
#[path = "../scanner.rs"]
pub mod scanner;

pub use cycle::{DiagnosticLoop, DEFAULT_SCAN_INTERVAL};
pub use engine::{
    DiagnosticRecoveryEngine, DiagnosticsExport, ModuleHealth, ModuleHealthSummary,
};
pub use module::{
    Anomaly, AnomalyKind, AnomalySeverity, DiagnosticError, DiagnosticScan, HealthThresholds,
    ManagedModule, ModuleKind, ModuleMetrics, ModuleStatus,
};
pub use probes::{FixedProbe, MetricsProbe, SimulatedProbe};
pub use recovery::executor::{
    ActionExecutor, ExecutionOutcome, RecoveryExecution, ScriptedExecutor, SimulatedExecutor,
};
pub use recovery::{
    action_for_anomaly, build_plan, PlanStatus, RecoveryActionItem, RecoveryActionKind,
    RecoveryPlan,
};
