//! The reflection engine: records outcomes, mines patterns, and maintains
//! strategy confidence consumed by future planning.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;
use shared_record_sink::EngineTelemetry;
use thiserror::Error;
use uuid::Uuid;

use crate::confidence::{StrategyConfidence, BASE_CONFIDENCE};
use crate::patterns::{detect_missed_opportunities, mine_error_patterns, mine_success_patterns};
use crate::records::{DecisionOutcome, DecisionRecord, ReflectionInsight};

/// Sink tables written by this engine.
const DECISION_HISTORY_TABLE: &str = "ai_decision_history";
const REPORTS_TABLE: &str = "ai_reflection_reports";
const INSIGHTS_TABLE: &str = "ai_reflection_insights";

/// Errors surfaced by the reflection engine.
#[derive(Debug, Error, Clone)]
pub enum ReflectionError {
    /// A required field of the submitted record is empty.
    #[error("incomplete decision record: {field} is required")]
    IncompleteRecord {
        /// Name of the missing field.
        field: &'static str,
    },
    /// No decisions have been recorded for the mission.
    #[error("no decisions recorded for mission '{0}'")]
    NoDecisionsForMission(String),
}

/// Result of reflecting over one mission's decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionReflection {
    /// Report identifier.
    pub id: Uuid,
    /// Mission analyzed.
    pub mission_id: String,
    /// Number of decision records analyzed.
    pub decisions_analyzed: usize,
    /// Share of analyzed decisions that succeeded (0-1).
    pub success_rate: f32,
    /// Insights derived by this reflection.
    pub insights: Vec<ReflectionInsight>,
    /// Advisory narrative; not a control signal.
    pub overall_learning: String,
    /// Generation timestamp.
    pub generated_at: DateTime<Utc>,
}

/// Serializable dump of everything the engine has learned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningDataExport {
    /// All recorded decisions, oldest first.
    pub records: Vec<DecisionRecord>,
    /// All derived insights, oldest first.
    pub insights: Vec<ReflectionInsight>,
    /// Strategy ledgers in first-seen order.
    pub strategies: Vec<StrategyConfidence>,
    /// Count of recorded decisions.
    pub total_records: usize,
    /// Count of derived insights.
    pub total_insights: usize,
    /// Count of tracked strategies.
    pub total_strategies: usize,
    /// Export timestamp.
    pub exported_at: DateTime<Utc>,
}

#[derive(Default)]
struct EngineState {
    records: Vec<DecisionRecord>,
    insights: Vec<ReflectionInsight>,
    strategies: IndexMap<String, StrategyConfidence>,
}

/// Learns from decision outcomes fed in out-of-band by the caller. Owns its
/// history exclusively; the coordinator consults confidence by name only.
#[derive(Clone)]
pub struct ReflectionEngine {
    state: Arc<RwLock<EngineState>>,
    telemetry: Option<EngineTelemetry>,
}

impl std::fmt::Debug for ReflectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ReflectionEngine")
            .field("records", &state.records.len())
            .field("insights", &state.insights.len())
            .field("strategies", &state.strategies.len())
            .finish()
    }
}

impl Default for ReflectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflectionEngine {
    /// Creates an engine without telemetry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(EngineState::default())),
            telemetry: None,
        }
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: EngineTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Appends an outcome record. The mission id and decision type are
    /// required; an empty value is a caller error.
    pub async fn record_decision(
        &self,
        record: DecisionRecord,
    ) -> Result<Uuid, ReflectionError> {
        if record.mission_id.trim().is_empty() {
            return Err(ReflectionError::IncompleteRecord { field: "mission_id" });
        }
        if record.decision_type.trim().is_empty() {
            return Err(ReflectionError::IncompleteRecord {
                field: "decision_type",
            });
        }

        let id = record.id;
        {
            let mut state = self.state.write();
            state
                .strategies
                .entry(record.decision_type.clone())
                .or_insert_with(|| StrategyConfidence::new(record.decision_type.clone()))
                .usage_count += 1;
            state.records.push(record.clone());
        }
        if let Some(tel) = &self.telemetry {
            tel.persist(DECISION_HISTORY_TABLE, json!(record)).await;
        }
        Ok(id)
    }

    /// Reflects over every recorded decision of the mission: error patterns,
    /// success patterns, and missed opportunities. Each insight adjusts the
    /// matching strategy ledger.
    pub async fn reflect_on_mission(
        &self,
        mission_id: &str,
    ) -> Result<MissionReflection, ReflectionError> {
        let mission_records: Vec<DecisionRecord> = {
            let state = self.state.read();
            state
                .records
                .iter()
                .filter(|r| r.mission_id == mission_id)
                .cloned()
                .collect()
        };
        if mission_records.is_empty() {
            return Err(ReflectionError::NoDecisionsForMission(
                mission_id.to_string(),
            ));
        }

        let refs: Vec<&DecisionRecord> = mission_records.iter().collect();
        let mut insights = mine_error_patterns(mission_id, &refs);
        insights.extend(mine_success_patterns(mission_id, &refs));
        insights.extend(detect_missed_opportunities(mission_id, &refs));

        let success_rate = Self::outcome_rate(&mission_records, DecisionOutcome::Success);

        {
            let mut state = self.state.write();
            for insight in &insights {
                let ledger = state
                    .strategies
                    .entry(insight.strategy.clone())
                    .or_insert_with(|| StrategyConfidence::new(insight.strategy.clone()));
                ledger.adjust(insight.description.clone(), insight.confidence_delta);
            }
            for (strategy, rate) in Self::per_type_success_rates(&mission_records) {
                if let Some(ledger) = state.strategies.get_mut(&strategy) {
                    ledger.success_rate = rate;
                }
            }
            state.insights.extend(insights.iter().cloned());
        }

        let reflection = MissionReflection {
            id: Uuid::new_v4(),
            mission_id: mission_id.to_string(),
            decisions_analyzed: mission_records.len(),
            success_rate,
            overall_learning: Self::narrate(success_rate, &insights),
            insights,
            generated_at: Utc::now(),
        };

        if let Some(tel) = &self.telemetry {
            tel.log(
                LogLevel::Info,
                "reflection.mission.analyzed",
                json!({
                    "mission_id": mission_id,
                    "decisions": reflection.decisions_analyzed,
                    "insights": reflection.insights.len(),
                    "success_rate": reflection.success_rate,
                }),
            );
            tel.persist(REPORTS_TABLE, json!(reflection)).await;
            for insight in &reflection.insights {
                tel.persist(INSIGHTS_TABLE, json!(insight)).await;
            }
        }

        Ok(reflection)
    }

    /// Current confidence for a strategy; 0.7 when never observed.
    #[must_use]
    pub fn get_strategy_confidence(&self, strategy: &str) -> f32 {
        self.state
            .read()
            .strategies
            .get(strategy)
            .map_or(BASE_CONFIDENCE, StrategyConfidence::current_confidence)
    }

    /// Snapshot of one strategy's ledger, if tracked.
    #[must_use]
    pub fn strategy_ledger(&self, strategy: &str) -> Option<StrategyConfidence> {
        self.state.read().strategies.get(strategy).cloned()
    }

    /// Exports everything the engine has learned. Counts reconstruct the
    /// in-memory state exactly.
    #[must_use]
    pub fn export_learning_data(&self) -> LearningDataExport {
        let state = self.state.read();
        LearningDataExport {
            records: state.records.clone(),
            insights: state.insights.clone(),
            strategies: state.strategies.values().cloned().collect(),
            total_records: state.records.len(),
            total_insights: state.insights.len(),
            total_strategies: state.strategies.len(),
            exported_at: Utc::now(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn outcome_rate(records: &[DecisionRecord], outcome: DecisionOutcome) -> f32 {
        if records.is_empty() {
            return 0.0;
        }
        let hits = records.iter().filter(|r| r.outcome == outcome).count();
        hits as f32 / records.len() as f32
    }

    fn per_type_success_rates(records: &[DecisionRecord]) -> Vec<(String, f32)> {
        let mut grouped: IndexMap<String, Vec<&DecisionRecord>> = IndexMap::new();
        for record in records {
            grouped
                .entry(record.decision_type.clone())
                .or_default()
                .push(record);
        }
        grouped
            .into_iter()
            .map(|(strategy, group)| {
                #[allow(clippy::cast_precision_loss)]
                let rate = group
                    .iter()
                    .filter(|r| r.outcome == DecisionOutcome::Success)
                    .count() as f32
                    / group.len() as f32;
                (strategy, rate)
            })
            .collect()
    }

    fn narrate(success_rate: f32, insights: &[ReflectionInsight]) -> String {
        use crate::records::InsightKind;
        let errors = insights
            .iter()
            .filter(|i| i.kind == InsightKind::ErrorPattern)
            .count();
        let successes = insights
            .iter()
            .filter(|i| i.kind == InsightKind::SuccessPattern)
            .count();
        let missed = insights
            .iter()
            .filter(|i| i.kind == InsightKind::MissedOpportunity)
            .count();
        let verdict = if success_rate >= 0.75 {
            "Current strategies are holding; keep reinforcing what works."
        } else if success_rate >= 0.4 {
            "Mixed results; tighten the weakest strategies before the next mission."
        } else {
            "Outcomes ran well below expectations; revisit strategy selection."
        };
        format!(
            "{:.0}% of decisions succeeded. Identified {errors} error pattern(s), \
             {successes} success pattern(s), {missed} missed opportunity(ies). {verdict}",
            success_rate * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_record_sink::MemoryRecordSink;
    use std::sync::Arc as StdArc;

    fn record(
        mission: &str,
        decision_type: &str,
        outcome: DecisionOutcome,
    ) -> DecisionRecord {
        DecisionRecord::new(mission, decision_type, "act", outcome)
    }

    #[tokio::test]
    async fn rejects_incomplete_records() {
        let engine = ReflectionEngine::new();
        let err = engine
            .record_decision(record("", "weather_routing", DecisionOutcome::Success))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReflectionError::IncompleteRecord { field: "mission_id" }
        ));
        let err = engine
            .record_decision(record("m-1", "  ", DecisionOutcome::Success))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReflectionError::IncompleteRecord {
                field: "decision_type"
            }
        ));
    }

    #[tokio::test]
    async fn reflection_requires_matching_records() {
        let engine = ReflectionEngine::new();
        let err = engine.reflect_on_mission("ghost").await.unwrap_err();
        assert!(matches!(err, ReflectionError::NoDecisionsForMission(_)));
    }

    #[tokio::test]
    async fn repeated_failures_lower_confidence() {
        let engine = ReflectionEngine::new();
        for _ in 0..2 {
            engine
                .record_decision(record("m-1", "weather_routing", DecisionOutcome::Failure))
                .await
                .unwrap();
        }
        let reflection = engine.reflect_on_mission("m-1").await.unwrap();
        assert_eq!(reflection.decisions_analyzed, 2);
        assert!(engine.get_strategy_confidence("weather_routing") < BASE_CONFIDENCE);
    }

    #[tokio::test]
    async fn confidence_floor_holds_under_sustained_failure() {
        let engine = ReflectionEngine::new();
        for cycle in 0..25 {
            let mission = format!("m-{cycle}");
            for _ in 0..4 {
                engine
                    .record_decision(record(&mission, "weather_routing", DecisionOutcome::Failure))
                    .await
                    .unwrap();
            }
            engine.reflect_on_mission(&mission).await.unwrap();
        }
        let confidence = engine.get_strategy_confidence("weather_routing");
        assert!((confidence - 0.1).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn unknown_strategy_defaults_to_baseline() {
        let engine = ReflectionEngine::new();
        assert!((engine.get_strategy_confidence("never_seen") - 0.7).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn success_rate_tracked_per_strategy() {
        let engine = ReflectionEngine::new();
        engine
            .record_decision(record("m-2", "pilot_booking", DecisionOutcome::Success))
            .await
            .unwrap();
        engine
            .record_decision(record("m-2", "pilot_booking", DecisionOutcome::Failure))
            .await
            .unwrap();
        engine.reflect_on_mission("m-2").await.unwrap();
        let ledger = engine.strategy_ledger("pilot_booking").unwrap();
        assert!((ledger.success_rate - 0.5).abs() < f32::EPSILON);
        assert_eq!(ledger.usage_count, 2);
    }

    #[tokio::test]
    async fn export_and_sink_reconstruct_counts() {
        let sink = StdArc::new(MemoryRecordSink::new());
        let telemetry = shared_record_sink::EngineTelemetry::builder("reflection")
            .record_sink(sink.clone())
            .build()
            .unwrap();
        let engine = ReflectionEngine::new().with_telemetry(telemetry);
        engine
            .record_decision(
                record("m-3", "anchorage_selection", DecisionOutcome::Partial)
                    .with_performance(40.0)
                    .with_alternative("stand off"),
            )
            .await
            .unwrap();
        let reflection = engine.reflect_on_mission("m-3").await.unwrap();
        let export = engine.export_learning_data();
        assert_eq!(export.total_records, 1);
        assert_eq!(export.total_insights, reflection.insights.len());
        assert_eq!(export.total_strategies, 1);
        assert_eq!(sink.table_len("ai_decision_history"), 1);
        assert_eq!(sink.table_len("ai_reflection_reports"), 1);
        assert_eq!(
            sink.table_len("ai_reflection_insights"),
            reflection.insights.len()
        );
    }
}
