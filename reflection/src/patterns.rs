//! Pattern mining over a mission's decision records.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::records::{DecisionOutcome, DecisionRecord, InsightKind, ReflectionInsight};

/// Minimum group size for an error pattern.
const ERROR_PATTERN_MIN_OCCURRENCES: usize = 2;

/// Performance floor under which alternatives are reconsidered.
const MISSED_OPPORTUNITY_PERFORMANCE: f32 = 60.0;

/// Fixed penalty for a missed opportunity.
const MISSED_OPPORTUNITY_DELTA: f32 = -0.1;

fn group_by_type<'a>(
    records: &[&'a DecisionRecord],
    outcome: DecisionOutcome,
) -> IndexMap<String, Vec<&'a DecisionRecord>> {
    let mut groups: IndexMap<String, Vec<&DecisionRecord>> = IndexMap::new();
    for record in records {
        if record.outcome == outcome {
            groups
                .entry(record.decision_type.clone())
                .or_default()
                .push(record);
        }
    }
    groups
}

fn insight(
    mission_id: &str,
    source: &DecisionRecord,
    kind: InsightKind,
    description: String,
    recommended_alternative: Option<String>,
    learning_points: Vec<String>,
    confidence_delta: f32,
) -> ReflectionInsight {
    ReflectionInsight {
        id: Uuid::new_v4(),
        mission_id: mission_id.to_string(),
        source_decision_id: source.id,
        strategy: source.decision_type.clone(),
        kind,
        description,
        recommended_alternative,
        learning_points,
        confidence_delta: confidence_delta.clamp(-1.0, 1.0),
        created_at: chrono::Utc::now(),
    }
}

/// Groups failed decisions by type; groups of at least two occurrences
/// become error-pattern insights with delta `-0.2 x frequency/10`.
#[must_use]
pub fn mine_error_patterns(
    mission_id: &str,
    records: &[&DecisionRecord],
) -> Vec<ReflectionInsight> {
    group_by_type(records, DecisionOutcome::Failure)
        .into_iter()
        .filter(|(_, group)| group.len() >= ERROR_PATTERN_MIN_OCCURRENCES)
        .map(|(decision_type, group)| {
            let frequency = group.len();
            #[allow(clippy::cast_precision_loss)]
            let delta = -0.2 * (frequency as f32 / 10.0);
            insight(
                mission_id,
                group[0],
                InsightKind::ErrorPattern,
                format!("'{decision_type}' failed {frequency} times this mission"),
                None,
                vec![
                    format!("Review preconditions before applying '{decision_type}'"),
                    "Recurring failures indicate a systematic cause, not bad luck".to_string(),
                ],
                delta,
            )
        })
        .collect()
}

/// Groups successful decisions by type (no minimum size); each group becomes
/// a success-pattern insight with delta `+0.1 x frequency/10`.
#[must_use]
pub fn mine_success_patterns(
    mission_id: &str,
    records: &[&DecisionRecord],
) -> Vec<ReflectionInsight> {
    group_by_type(records, DecisionOutcome::Success)
        .into_iter()
        .map(|(decision_type, group)| {
            let frequency = group.len();
            #[allow(clippy::cast_precision_loss)]
            let delta = 0.1 * (frequency as f32 / 10.0);
            insight(
                mission_id,
                group[0],
                InsightKind::SuccessPattern,
                format!("'{decision_type}' succeeded {frequency} times this mission"),
                None,
                vec![format!("'{decision_type}' is holding up under current conditions")],
                delta,
            )
        })
        .collect()
}

/// Any decision that underperformed while alternatives were on the table
/// yields a missed-opportunity insight naming the first alternative.
#[must_use]
pub fn detect_missed_opportunities(
    mission_id: &str,
    records: &[&DecisionRecord],
) -> Vec<ReflectionInsight> {
    records
        .iter()
        .filter(|r| {
            r.actual_performance < MISSED_OPPORTUNITY_PERFORMANCE && !r.alternatives.is_empty()
        })
        .map(|record| {
            let alternative = record.alternatives[0].clone();
            insight(
                mission_id,
                record,
                InsightKind::MissedOpportunity,
                format!(
                    "'{}' scored {:.0}/100; '{}' was available",
                    record.chosen_action, record.actual_performance, alternative
                ),
                Some(alternative),
                vec!["Low performance with untried alternatives warrants a second look".to_string()],
                MISSED_OPPORTUNITY_DELTA,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(decision_type: &str) -> DecisionRecord {
        DecisionRecord::new("m-7", decision_type, "act", DecisionOutcome::Failure)
    }

    #[test]
    fn single_failure_is_not_a_pattern() {
        let record = failure("weather_routing");
        let insights = mine_error_patterns("m-7", &[&record]);
        assert!(insights.is_empty());
    }

    #[test]
    fn repeated_failures_become_a_pattern_with_scaled_delta() {
        let a = failure("weather_routing");
        let b = failure("weather_routing");
        let c = failure("berth_assignment");
        let insights = mine_error_patterns("m-7", &[&a, &b, &c]);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].strategy, "weather_routing");
        assert!((insights[0].confidence_delta - (-0.04)).abs() < 1e-6);
    }

    #[test]
    fn success_patterns_have_no_minimum() {
        let record =
            DecisionRecord::new("m-7", "pilot_booking", "book early", DecisionOutcome::Success);
        let insights = mine_success_patterns("m-7", &[&record]);
        assert_eq!(insights.len(), 1);
        assert!((insights[0].confidence_delta - 0.01).abs() < 1e-6);
    }

    #[test]
    fn missed_opportunity_names_first_alternative() {
        let record = DecisionRecord::new("m-7", "anchorage_selection", "anchor east", DecisionOutcome::Partial)
            .with_performance(45.0)
            .with_alternative("anchor west")
            .with_alternative("stand off");
        let insights = detect_missed_opportunities("m-7", &[&record]);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].recommended_alternative.as_deref(), Some("anchor west"));
        assert!((insights[0].confidence_delta - (-0.1)).abs() < 1e-6);
    }

    #[test]
    fn adequate_performance_is_not_flagged() {
        let record = DecisionRecord::new("m-7", "anchorage_selection", "anchor east", DecisionOutcome::Success)
            .with_performance(82.0)
            .with_alternative("anchor west");
        assert!(detect_missed_opportunities("m-7", &[&record]).is_empty());
    }
}
