#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Reconfiguration controller: threshold-driven configuration changes with
//! post-change validation and rollback.

/// The controller facade.
#[path = "../controller.rs"]
pub mod controller;

/// Configuration, trigger, action, and validation records.
#[path = "../module.rs"]
pub mod module;

/// Threshold monitoring.
#[path = "../monitor.rs"]
pub mod monitor;

/// Cause-specific transforms and diffing.
#[path = "../transforms.rs"]
pub mod transforms;

pub use controller::{ReconfigurationController, ReconfigurationExport};
pub use module::{
    ActionStatus, FieldChange, ImprovementDeltas, MetricsSnapshot, PerfSample,
    PerformanceValidation, PriorityWeights, ReconfigAction, ReconfigError, ReconfigTrigger,
    ResourceAllocation, SystemConfiguration, TriggerCause, ValidationVerdict,
};
pub use transforms::{diff_configurations, transform_for_cause};
