//! Cross-tier conflict detection and hierarchy-based resolution.

use chrono::Utc;
use uuid::Uuid;

use crate::model::{ConflictResolution, Decision};

/// Why two decisions clash.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictCause {
    /// Both decisions claim at least one common resource.
    ResourceOverlap(Vec<String>),
    /// Both decisions carry priority above the high-priority threshold.
    DualHighPriority,
    /// Declared budgets sum past the declared maximum.
    BudgetExceeded {
        /// Combined declared budget.
        total: f64,
        /// Declared maximum.
        max: f64,
    },
    /// Declared time horizons sum past the declared maximum.
    HorizonExceeded {
        /// Combined declared horizon in days.
        total: f64,
        /// Declared maximum horizon in days.
        max: f64,
    },
}

impl ConflictCause {
    fn describe(&self) -> String {
        match self {
            Self::ResourceOverlap(tags) => {
                format!("contested resources: {}", tags.join(", "))
            }
            Self::DualHighPriority => "both decisions demand high-priority execution".to_string(),
            Self::BudgetExceeded { total, max } => {
                format!("combined budget {total:.1} exceeds declared maximum {max:.1}")
            }
            Self::HorizonExceeded { total, max } => {
                format!("combined horizon {total:.1}d exceeds declared maximum {max:.1}d")
            }
        }
    }
}

/// Priorities above this value are treated as contention-prone.
const HIGH_PRIORITY_THRESHOLD: u8 = 8;

/// Pairwise conflict test. Checks, in order: resource overlap, simultaneous
/// high priority, then declared-constraint violations.
#[must_use]
pub fn detect_conflict(a: &Decision, b: &Decision) -> Option<ConflictCause> {
    let shared: Vec<String> = a
        .resource_tags
        .iter()
        .filter(|tag| b.resource_tags.contains(*tag))
        .cloned()
        .collect();
    if !shared.is_empty() {
        return Some(ConflictCause::ResourceOverlap(shared));
    }

    if a.priority > HIGH_PRIORITY_THRESHOLD && b.priority > HIGH_PRIORITY_THRESHOLD {
        return Some(ConflictCause::DualHighPriority);
    }

    if let Some(cause) = constraint_violation(a, b) {
        return Some(cause);
    }

    None
}

/// Budget and horizon checks over the pair's declared constraints. A check
/// only applies when both sides declare the value and at least one declares
/// the corresponding maximum.
fn constraint_violation(a: &Decision, b: &Decision) -> Option<ConflictCause> {
    if let (Some(budget_a), Some(budget_b)) =
        (a.numeric_constraint("budget"), b.numeric_constraint("budget"))
    {
        let max = a
            .numeric_constraint("max_budget")
            .or_else(|| b.numeric_constraint("max_budget"));
        if let Some(max) = max {
            let total = budget_a + budget_b;
            if total > max {
                return Some(ConflictCause::BudgetExceeded { total, max });
            }
        }
    }

    if let (Some(horizon_a), Some(horizon_b)) = (
        a.numeric_constraint("horizon_days"),
        b.numeric_constraint("horizon_days"),
    ) {
        let max = a
            .numeric_constraint("max_horizon_days")
            .or_else(|| b.numeric_constraint("max_horizon_days"));
        if let Some(max) = max {
            let total = horizon_a + horizon_b;
            if total > max {
                return Some(ConflictCause::HorizonExceeded { total, max });
            }
        }
    }

    None
}

/// Arbitrates a detected conflict: the decision from the higher tier wins.
/// This is a strict hierarchy override, not a cost-based negotiation —
/// a deliberate simplification.
///
/// Tiers are distinct within one coordination cycle, so ties cannot occur.
#[must_use]
pub fn resolve_conflict(a: &Decision, b: &Decision, cause: &ConflictCause) -> ConflictResolution {
    let (winner, loser) = if a.tier.precedence() >= b.tier.precedence() {
        (a, b)
    } else {
        (b, a)
    };
    ConflictResolution {
        id: Uuid::new_v4(),
        decision_ids: vec![a.id, b.id],
        winner: winner.clone(),
        rationale: rationale_for(winner, loser, cause),
        overridden_tier: loser.tier,
        resolved_at: Utc::now(),
    }
}

fn rationale_for(winner: &Decision, loser: &Decision, cause: &ConflictCause) -> String {
    format!(
        "{} decision '{}' supersedes {} decision '{}': {}",
        winner.tier,
        winner.objective,
        loser.tier,
        loser.objective,
        cause.describe()
    )
}

/// Helper resolving a tier triple pairwise: yields a resolution for every
/// conflicting pair not already covered by `seen`.
pub fn sweep_conflicts(
    decisions: &[&Decision],
    seen: &mut Vec<(Uuid, Uuid)>,
) -> Vec<ConflictResolution> {
    let mut resolutions = Vec::new();
    for (idx, a) in decisions.iter().enumerate() {
        for b in &decisions[idx + 1..] {
            let pair = pair_key(a.id, b.id);
            if seen.contains(&pair) {
                continue;
            }
            if let Some(cause) = detect_conflict(a, b) {
                seen.push(pair);
                resolutions.push(resolve_conflict(a, b, &cause));
            }
        }
    }
    resolutions
}

fn pair_key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::TierPlanner;
    use crate::model::{DecisionTier, Objective, TierContext};

    fn decision(tier: DecisionTier, ctx: &TierContext) -> Decision {
        TierPlanner::new().plan(tier, ctx, None).unwrap()
    }

    #[test]
    fn shared_resource_tags_conflict() {
        let a = decision(
            DecisionTier::Strategic,
            &TierContext::new()
                .with_objective(Objective::new("reposition fleet north", 5))
                .with_resource_tag("tug-alpha"),
        );
        let b = decision(
            DecisionTier::Tactical,
            &TierContext::new()
                .with_objective(Objective::new("assist berthing", 5))
                .with_resource_tag("tug-alpha"),
        );
        let cause = detect_conflict(&a, &b).unwrap();
        assert_eq!(cause, ConflictCause::ResourceOverlap(vec!["tug-alpha".into()]));
    }

    #[test]
    fn higher_tier_always_wins() {
        let strategic = decision(
            DecisionTier::Strategic,
            &TierContext::new()
                .with_objective(Objective::new("hold convoy schedule", 5))
                .with_resource_tag("pilot-boat"),
        );
        let tactical = decision(
            DecisionTier::Tactical,
            &TierContext::new()
                .with_objective(Objective::new("divert pilot boat", 5))
                .with_resource_tag("pilot-boat"),
        );
        let cause = detect_conflict(&tactical, &strategic).unwrap();
        let resolution = resolve_conflict(&tactical, &strategic, &cause);
        assert_eq!(resolution.winner.tier, DecisionTier::Strategic);
        assert_eq!(resolution.overridden_tier, DecisionTier::Tactical);
        assert!(resolution.rationale.contains("supersedes"));
    }

    #[test]
    fn dual_high_priority_conflicts_without_shared_resources() {
        let a = decision(
            DecisionTier::Tactical,
            &TierContext::new().with_objective(Objective::new("collision avoidance", 9)),
        );
        let b = decision(
            DecisionTier::Strategic,
            &TierContext::new().with_objective(Objective::new("storm rerouting", 9)),
        );
        assert_eq!(detect_conflict(&a, &b), Some(ConflictCause::DualHighPriority));
    }

    #[test]
    fn budget_sum_over_declared_max_conflicts() {
        let a = decision(
            DecisionTier::Operational,
            &TierContext::new()
                .with_objective(Objective::new("charter standby tug", 4))
                .with_constraint("budget", serde_json::json!(70.0))
                .with_constraint("max_budget", serde_json::json!(100.0)),
        );
        let b = decision(
            DecisionTier::Tactical,
            &TierContext::new()
                .with_objective(Objective::new("order extra linesmen", 4))
                .with_constraint("budget", serde_json::json!(50.0)),
        );
        assert!(matches!(
            detect_conflict(&a, &b),
            Some(ConflictCause::BudgetExceeded { .. })
        ));
    }

    #[test]
    fn sweep_skips_already_resolved_pairs() {
        let a = decision(
            DecisionTier::Strategic,
            &TierContext::new()
                .with_objective(Objective::new("fleet move", 5))
                .with_resource_tag("berth-12"),
        );
        let b = decision(
            DecisionTier::Operational,
            &TierContext::new()
                .with_objective(Objective::new("berth maintenance", 5))
                .with_resource_tag("berth-12"),
        );
        let mut seen = Vec::new();
        let first = sweep_conflicts(&[&a, &b], &mut seen);
        assert_eq!(first.len(), 1);
        let second = sweep_conflicts(&[&a, &b], &mut seen);
        assert!(second.is_empty());
    }
}
