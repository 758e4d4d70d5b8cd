//! Decision outcome records fed to the reflection engine.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Real-world result of a past decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// The decision achieved its objective.
    Success,
    /// The decision failed outright.
    Failure,
    /// The decision partially achieved its objective.
    Partial,
    /// The outcome could not be determined.
    Unknown,
}

/// Outcome record created by the caller once a decision's real-world effect
/// is known. Appended to the engine's history; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Mission the decision belonged to.
    pub mission_id: String,
    /// Decision type; doubles as the strategy name for confidence tracking.
    pub decision_type: String,
    /// Situation at decision time.
    pub context: IndexMap<String, serde_json::Value>,
    /// Action that was taken.
    pub chosen_action: String,
    /// Actions that were considered and rejected.
    pub alternatives: Vec<String>,
    /// Observed outcome.
    pub outcome: DecisionOutcome,
    /// Estimated impact of the decision (0-1).
    pub impact_score: f32,
    /// Confidence held at decision time (0-1).
    pub confidence: f32,
    /// Measured performance of the chosen action (0-100).
    pub actual_performance: f32,
    /// When the outcome was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl DecisionRecord {
    /// Creates a record with neutral scores; use the `with_` builders to
    /// fill in the measured values.
    #[must_use]
    pub fn new(
        mission_id: impl Into<String>,
        decision_type: impl Into<String>,
        chosen_action: impl Into<String>,
        outcome: DecisionOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            mission_id: mission_id.into(),
            decision_type: decision_type.into(),
            context: IndexMap::new(),
            chosen_action: chosen_action.into(),
            alternatives: Vec::new(),
            outcome,
            impact_score: 0.5,
            confidence: 0.5,
            actual_performance: 50.0,
            recorded_at: Utc::now(),
        }
    }

    /// Adds a rejected alternative.
    #[must_use]
    pub fn with_alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Adds a context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Sets the measured performance (0-100).
    #[must_use]
    pub fn with_performance(mut self, performance: f32) -> Self {
        self.actual_performance = performance.clamp(0.0, 100.0);
        self
    }

    /// Sets the impact score (0-1).
    #[must_use]
    pub fn with_impact(mut self, impact: f32) -> Self {
        self.impact_score = impact.clamp(0.0, 1.0);
        self
    }

    /// Sets the confidence held at decision time (0-1).
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// Kind of derived insight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// Repeated failures of one decision type.
    ErrorPattern,
    /// Repeated successes of one decision type.
    SuccessPattern,
    /// A low-performing decision that had better-looking alternatives.
    MissedOpportunity,
    /// A decision confirmed as the best available choice.
    OptimalChoice,
}

/// Derived learning artifact. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionInsight {
    /// Unique identifier.
    pub id: Uuid,
    /// Mission the insight was derived from.
    pub mission_id: String,
    /// Representative source decision.
    pub source_decision_id: Uuid,
    /// Strategy (decision type) the insight adjusts.
    pub strategy: String,
    /// Insight classification.
    pub kind: InsightKind,
    /// Narrative description.
    pub description: String,
    /// Alternative presumed better, when one was identified.
    pub recommended_alternative: Option<String>,
    /// Concrete takeaways.
    pub learning_points: Vec<String>,
    /// Confidence adjustment carried into the strategy ledger (-1..+1).
    pub confidence_delta: f32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
