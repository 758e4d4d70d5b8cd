#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Reflection engine: records decision outcomes, mines error and success
//! patterns, and maintains per-strategy confidence ledgers.

/// Strategy confidence ledgers.
pub mod confidence;
/// Engine facade and reflection reports.
pub mod engine;
/// Pattern mining analyses.
pub mod patterns;
/// Decision outcome records and insights.
pub mod records;

pub use confidence::{ConfidenceAdjustment, StrategyConfidence, BASE_CONFIDENCE};
pub use engine::{LearningDataExport, MissionReflection, ReflectionEngine, ReflectionError};
pub use records::{DecisionOutcome, DecisionRecord, InsightKind, ReflectionInsight};
