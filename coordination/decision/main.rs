//! Per-tier decision planning.

/// Priority and objective selection rules.
pub mod planning;

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::model::{
    ConfidenceLookup, CoordinationError, Decision, DecisionTier, Objective, TierContext,
};
use planning::{compute_priority, select_objective};

/// Confidence assigned when no lookup is wired in.
const DEFAULT_STRATEGY_CONFIDENCE: f32 = 0.7;

/// Factor applied when a tier falls back to the holding-pattern sentinel.
const HOLDING_PATTERN_FACTOR: f32 = 0.7;

/// Produces one [`Decision`] per tier from the caller-assembled context.
#[derive(Default, Clone)]
pub struct TierPlanner {
    confidence: Option<Arc<dyn ConfidenceLookup>>,
}

impl std::fmt::Debug for TierPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierPlanner")
            .field("has_confidence_lookup", &self.confidence.is_some())
            .finish()
    }
}

impl TierPlanner {
    /// Creates a planner without a confidence source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wires in a strategy-confidence source (consulted, never enforced).
    #[must_use]
    pub fn with_confidence_lookup(mut self, lookup: Arc<dyn ConfidenceLookup>) -> Self {
        self.confidence = Some(lookup);
        self
    }

    /// Plans a decision for the tier. The parent, when given, must come from
    /// a strictly higher tier.
    pub fn plan(
        &self,
        tier: DecisionTier,
        context: &TierContext,
        parent: Option<&Decision>,
    ) -> Result<Decision, CoordinationError> {
        if let Some(parent) = parent {
            if parent.tier.precedence() <= tier.precedence() {
                return Err(CoordinationError::ParentTierMismatch {
                    parent: parent.tier,
                    child: tier,
                });
            }
        }
        for objective in &context.objectives {
            if objective.priority > 10 {
                return Err(CoordinationError::InvalidObjective {
                    description: objective.description.clone(),
                    priority: objective.priority,
                });
            }
        }

        let objective = select_objective(context);
        let priority = compute_priority(tier, context);
        let confidence = self.confidence_for(tier, &objective);
        let action = action_for(tier, &objective, parent);

        Ok(Decision {
            id: Uuid::new_v4(),
            tier,
            priority,
            objective: objective.description,
            action,
            resource_tags: context.resource_tags.clone(),
            constraints: context.constraints.clone(),
            confidence,
            depends_on: parent.map(|p| p.id).into_iter().collect(),
            decided_at: Utc::now(),
        })
    }

    fn confidence_for(&self, tier: DecisionTier, objective: &Objective) -> f32 {
        let base = self.confidence.as_ref().map_or(DEFAULT_STRATEGY_CONFIDENCE, |lookup| {
            lookup.confidence(tier.as_str())
        });
        let factor = if objective.is_holding_pattern() {
            HOLDING_PATTERN_FACTOR
        } else {
            1.0
        };
        (base * factor).clamp(0.0, 1.0)
    }
}

fn action_for(tier: DecisionTier, objective: &Objective, parent: Option<&Decision>) -> String {
    let lineage = parent.map_or_else(String::new, |p| format!(" (within '{}')", p.objective));
    match tier {
        DecisionTier::Strategic => format!("Set course: {}{lineage}", objective.description),
        DecisionTier::Operational => {
            format!("Allocate assets for: {}{lineage}", objective.description)
        }
        DecisionTier::Tactical => {
            format!("Execute immediate response: {}{lineage}", objective.description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Objective;

    struct FixedConfidence(f32);

    impl ConfidenceLookup for FixedConfidence {
        fn confidence(&self, _strategy: &str) -> f32 {
            self.0
        }
    }

    #[test]
    fn tactical_base_priority_is_highest() {
        let planner = TierPlanner::new();
        let ctx = TierContext::new().with_objective(Objective::new("avoid squall line", 5));
        let decision = planner.plan(DecisionTier::Tactical, &ctx, None).unwrap();
        assert_eq!(decision.priority, 8);
    }

    #[test]
    fn urgent_objective_raises_priority_capped_at_ten() {
        let planner = TierPlanner::new();
        let ctx = TierContext::new().with_objective(Objective::new("medevac transfer", 9));
        let decision = planner.plan(DecisionTier::Tactical, &ctx, None).unwrap();
        assert_eq!(decision.priority, 10);

        let strategic = planner.plan(DecisionTier::Strategic, &ctx, None).unwrap();
        assert_eq!(strategic.priority, 9);
    }

    #[test]
    fn empty_context_uses_holding_pattern_sentinel() {
        let planner = TierPlanner::new();
        let decision = planner
            .plan(DecisionTier::Operational, &TierContext::new(), None)
            .unwrap();
        assert_eq!(decision.objective, "hold current posture");
        assert!(decision.confidence < DEFAULT_STRATEGY_CONFIDENCE);
    }

    #[test]
    fn parent_must_outrank_child() {
        let planner = TierPlanner::new();
        let ctx = TierContext::new().with_objective(Objective::new("shift berth window", 4));
        let tactical = planner.plan(DecisionTier::Tactical, &ctx, None).unwrap();
        let err = planner
            .plan(DecisionTier::Strategic, &ctx, Some(&tactical))
            .unwrap_err();
        assert!(matches!(err, CoordinationError::ParentTierMismatch { .. }));
    }

    #[test]
    fn confidence_lookup_is_consulted() {
        let planner =
            TierPlanner::new().with_confidence_lookup(Arc::new(FixedConfidence(0.4)));
        let ctx = TierContext::new().with_objective(Objective::new("reroute via Skagen", 6));
        let decision = planner.plan(DecisionTier::Strategic, &ctx, None).unwrap();
        assert!((decision.confidence - 0.4).abs() < f32::EPSILON);
    }
}
