//! Per-strategy confidence ledgers adjusted by accumulated insights.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Baseline confidence assigned to a strategy before any evidence arrives.
pub const BASE_CONFIDENCE: f32 = 0.7;

/// Floor and ceiling of the confidence scale.
pub const CONFIDENCE_FLOOR: f32 = 0.1;
/// Upper clamp of the confidence scale.
pub const CONFIDENCE_CEILING: f32 = 1.0;

/// One recorded adjustment in a strategy's ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceAdjustment {
    /// Why the adjustment was applied.
    pub reason: String,
    /// Signed delta (-1..+1).
    pub delta: f32,
    /// When the adjustment was applied.
    pub adjusted_at: DateTime<Utc>,
}

/// Ledger tracking confidence in one strategy (decision type). Mutated in
/// place as new insights arrive; the adjustment list is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfidence {
    /// Strategy name (decision type).
    pub strategy: String,
    /// Baseline before adjustments.
    pub base_confidence: f32,
    /// Ordered adjustment history.
    pub adjustments: Vec<ConfidenceAdjustment>,
    /// Number of recorded decisions using this strategy.
    pub usage_count: usize,
    /// Success rate from the most recent reflection (0-1).
    pub success_rate: f32,
}

impl StrategyConfidence {
    /// Creates a fresh ledger at the baseline.
    #[must_use]
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            base_confidence: BASE_CONFIDENCE,
            adjustments: Vec::new(),
            usage_count: 0,
            success_rate: 0.0,
        }
    }

    /// Appends an adjustment to the ledger.
    pub fn adjust(&mut self, reason: impl Into<String>, delta: f32) {
        self.adjustments.push(ConfidenceAdjustment {
            reason: reason.into(),
            delta,
            adjusted_at: Utc::now(),
        });
    }

    /// Current confidence: base plus every historical delta, clamped to
    /// [0.1, 1.0] no matter how much evidence accumulates.
    #[must_use]
    pub fn current_confidence(&self) -> f32 {
        let sum: f32 = self.adjustments.iter().map(|a| a.delta).sum();
        (self.base_confidence + sum).clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_baseline() {
        let ledger = StrategyConfidence::new("weather_routing");
        assert!((ledger.current_confidence() - BASE_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn confidence_never_leaves_band() {
        let mut ledger = StrategyConfidence::new("weather_routing");
        for _ in 0..50 {
            ledger.adjust("repeated error pattern", -0.2);
        }
        assert!((ledger.current_confidence() - CONFIDENCE_FLOOR).abs() < f32::EPSILON);

        let mut optimist = StrategyConfidence::new("berth_assignment");
        for _ in 0..50 {
            optimist.adjust("repeated success pattern", 0.1);
        }
        assert!((optimist.current_confidence() - CONFIDENCE_CEILING).abs() < f32::EPSILON);
    }

    #[test]
    fn adjustments_are_ordered() {
        let mut ledger = StrategyConfidence::new("anchorage_selection");
        ledger.adjust("first", -0.1);
        ledger.adjust("second", 0.05);
        assert_eq!(ledger.adjustments[0].reason, "first");
        assert_eq!(ledger.adjustments[1].reason, "second");
    }
}
