#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Multi-tier decision coordinator for the autonomic core: strategic,
//! operational, and tactical decisions with cross-tier conflict arbitration.

/// Conflict detection and hierarchy-based resolution.
#[path = "../conflict.rs"]
pub mod conflict;

/// The coordinator facade and cycle orchestration.
#[path = "../coordinator.rs"]
pub mod coordinator;

/// Per-tier decision planning.
#[path = "../decision/main.rs"]
pub mod decision;

/// Core decision records and errors.
#[path = "../model.rs"]
pub mod model;

pub use conflict::{detect_conflict, resolve_conflict, ConflictCause};
pub use coordinator::{CoordinationReport, DecisionCoordinator, DecisionHierarchyExport};
pub use decision::TierPlanner;
pub use model::{
    ConfidenceLookup, ConflictResolution, CoordinationError, Decision, DecisionTier, Objective,
    TierContext,
};
