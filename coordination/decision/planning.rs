//! Priority computation and objective selection.

use crate::model::{DecisionTier, Objective, TierContext};

/// Priority bonus applied when an urgent objective is pending.
const URGENT_OBJECTIVE_BONUS: u8 = 2;

/// Objectives above this priority count as urgent.
const URGENT_OBJECTIVE_THRESHOLD: u8 = 8;

/// Computes the tier priority: tier base, plus a bonus when any pending
/// objective is urgent, capped at 10.
#[must_use]
pub fn compute_priority(tier: DecisionTier, context: &TierContext) -> u8 {
    let urgent = context
        .objectives
        .iter()
        .any(|o| !o.completed && o.priority > URGENT_OBJECTIVE_THRESHOLD);
    let bonus = if urgent { URGENT_OBJECTIVE_BONUS } else { 0 };
    (tier.base_priority() + bonus).min(10)
}

/// Picks the highest-priority non-completed objective, falling back to the
/// holding-pattern sentinel when none is pending.
#[must_use]
pub fn select_objective(context: &TierContext) -> Objective {
    context
        .objectives
        .iter()
        .filter(|o| !o.completed)
        .max_by_key(|o| o.priority)
        .cloned()
        .unwrap_or_else(Objective::holding_pattern)
}
