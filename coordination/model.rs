//! Core decision records shared across the coordination crate.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the decision coordinator.
#[derive(Debug, Error, Clone)]
pub enum CoordinationError {
    /// The parent decision must come from a strictly higher tier.
    #[error("parent decision tier {parent} does not outrank {child}")]
    ParentTierMismatch {
        /// Tier of the offered parent decision.
        parent: DecisionTier,
        /// Tier being decided.
        child: DecisionTier,
    },
    /// An objective in the context is outside the 0-10 priority scale.
    #[error("objective '{description}' has out-of-scale priority {priority}")]
    InvalidObjective {
        /// Offending objective description.
        description: String,
        /// Declared priority.
        priority: u8,
    },
    /// Catch-all for internal coordination faults.
    #[error("internal coordination error: {0}")]
    Internal(String),
}

/// Decision horizon. Precedence for conflict resolution is strict:
/// strategic outranks operational outranks tactical.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DecisionTier {
    /// Voyage- and fleet-level direction.
    Strategic,
    /// Asset allocation across the current operating window.
    Operational,
    /// Immediate response on the water.
    Tactical,
}

impl DecisionTier {
    /// Rank used for conflict resolution; higher outranks lower.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Strategic => 3,
            Self::Operational => 2,
            Self::Tactical => 1,
        }
    }

    /// Base priority for decisions at this tier. Tactical is weighted
    /// highest because it represents immediate response.
    #[must_use]
    pub const fn base_priority(self) -> u8 {
        match self {
            Self::Strategic => 7,
            Self::Operational => 5,
            Self::Tactical => 8,
        }
    }

    /// Stable lowercase label (also the strategy name for confidence lookups).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strategic => "strategic",
            Self::Operational => "operational",
            Self::Tactical => "tactical",
        }
    }
}

impl fmt::Display for DecisionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending or completed objective supplied by upstream planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    /// Unique identifier.
    pub id: Uuid,
    /// Narrative description.
    pub description: String,
    /// Priority on the 0-10 scale.
    pub priority: u8,
    /// Whether the objective has already been fulfilled.
    pub completed: bool,
}

impl Objective {
    /// Creates a pending objective.
    #[must_use]
    pub fn new(description: impl Into<String>, priority: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            priority,
            completed: false,
        }
    }

    /// Marks the objective completed.
    #[must_use]
    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    /// Sentinel returned when a context has no pending objective. Selection
    /// never yields an absent value.
    #[must_use]
    pub fn holding_pattern() -> Self {
        Self {
            id: Uuid::nil(),
            description: "hold current posture".to_string(),
            priority: 0,
            completed: false,
        }
    }

    /// True for the holding-pattern sentinel.
    #[must_use]
    pub fn is_holding_pattern(&self) -> bool {
        self.id.is_nil()
    }
}

/// Per-tier input assembled by the caller before a coordination cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierContext {
    /// Candidate objectives for this tier.
    pub objectives: Vec<Objective>,
    /// Resources this tier intends to claim.
    pub resource_tags: IndexSet<String>,
    /// Declared constraints (`budget`, `max_budget`, `horizon_days`,
    /// `max_horizon_days`, plus free-form entries).
    pub constraints: IndexMap<String, serde_json::Value>,
}

impl TierContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an objective.
    #[must_use]
    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objectives.push(objective);
        self
    }

    /// Claims a resource tag.
    #[must_use]
    pub fn with_resource_tag(mut self, tag: impl Into<String>) -> Self {
        self.resource_tags.insert(tag.into());
        self
    }

    /// Declares a constraint value.
    #[must_use]
    pub fn with_constraint(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.constraints.insert(key.into(), value);
        self
    }

    /// Reads a numeric constraint if declared.
    #[must_use]
    pub fn numeric_constraint(&self, key: &str) -> Option<f64> {
        self.constraints.get(key).and_then(serde_json::Value::as_f64)
    }
}

/// An arbitrated decision. Immutable once stored in the coordinator's table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique identifier.
    pub id: Uuid,
    /// Horizon the decision belongs to.
    pub tier: DecisionTier,
    /// Priority on the 0-10 scale.
    pub priority: u8,
    /// Objective the decision addresses.
    pub objective: String,
    /// Chosen course of action.
    pub action: String,
    /// Resources the decision claims.
    pub resource_tags: IndexSet<String>,
    /// Declared constraints carried from the context.
    pub constraints: IndexMap<String, serde_json::Value>,
    /// Confidence in the chosen action (0-1).
    pub confidence: f32,
    /// Ids of decisions this one builds on (parent tiers).
    pub depends_on: Vec<Uuid>,
    /// Creation timestamp.
    pub decided_at: DateTime<Utc>,
}

impl Decision {
    /// Reads a numeric constraint declared on this decision.
    #[must_use]
    pub fn numeric_constraint(&self, key: &str) -> Option<f64> {
        self.constraints.get(key).and_then(serde_json::Value::as_f64)
    }
}

/// Outcome of arbitrating one detected conflict. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictResolution {
    /// Unique identifier.
    pub id: Uuid,
    /// The decisions that clashed.
    pub decision_ids: Vec<Uuid>,
    /// The decision that prevailed.
    pub winner: Decision,
    /// Templated explanation of the override.
    pub rationale: String,
    /// Tier whose decision was overridden.
    pub overridden_tier: DecisionTier,
    /// Resolution timestamp.
    pub resolved_at: DateTime<Utc>,
}

/// Confidence source consulted while planning. The reflection engine is
/// adapted to this trait by the caller; the engines themselves stay peers.
pub trait ConfidenceLookup: Send + Sync {
    /// Current confidence for the named strategy, in [0.1, 1.0].
    fn confidence(&self, strategy: &str) -> f32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_precedence_is_strict() {
        assert!(DecisionTier::Strategic.precedence() > DecisionTier::Operational.precedence());
        assert!(DecisionTier::Operational.precedence() > DecisionTier::Tactical.precedence());
    }

    #[test]
    fn holding_pattern_is_detectable() {
        let sentinel = Objective::holding_pattern();
        assert!(sentinel.is_holding_pattern());
        assert!(!Objective::new("refuel at Rotterdam", 5).is_holding_pattern());
    }

    #[test]
    fn context_reads_numeric_constraints() {
        let ctx = TierContext::new()
            .with_constraint("budget", serde_json::json!(120.0))
            .with_constraint("note", serde_json::json!("weather hold"));
        assert_eq!(ctx.numeric_constraint("budget"), Some(120.0));
        assert_eq!(ctx.numeric_constraint("note"), None);
    }
}
