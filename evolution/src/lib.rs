#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Evolution tracker: versions the system's configuration/behavior, stores
//! performance snapshots per version, and produces comparison reports.

/// Version-to-version metric comparison.
pub mod compare;
/// The tracker facade.
pub mod tracker;
/// Version nodes, snapshots, and progress records.
pub mod versions;

pub use compare::{MetricDelta, Recommendation, VersionComparison};
pub use tracker::{AuditExport, AuditSummary, EvolutionError, EvolutionTracker, TimelineEntry};
pub use versions::{
    CapabilitySummary, CapabilityTrend, CognitiveProgress, PerformanceMetrics, VersionRecord,
};
