//! The decision coordinator: runs the three tiers in order, arbitrates
//! conflicts, and degrades to a tactical-only answer when a cycle fails.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;
use shared_record_sink::EngineTelemetry;
use tracing::instrument;
use uuid::Uuid;

use crate::conflict::sweep_conflicts;
use crate::decision::TierPlanner;
use crate::model::{
    ConfidenceLookup, ConflictResolution, CoordinationError, Decision, DecisionTier, Objective,
    TierContext,
};

/// Sink table receiving coordination events.
const COORDINATION_LOG: &str = "coordination_log";

/// Result of one full coordination cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationReport {
    /// Cycle identifier.
    pub cycle_id: Uuid,
    /// Mission goals supplied by the caller.
    pub goals: Vec<String>,
    /// Strategic-tier decision.
    pub strategic: Decision,
    /// Operational-tier decision.
    pub operational: Decision,
    /// Tactical-tier decision.
    pub tactical: Decision,
    /// Conflicts arbitrated during the cycle.
    pub conflicts: Vec<ConflictResolution>,
    /// True when the cycle degraded to a tactical-only fallback.
    pub degraded: bool,
    /// Reason for the fallback, when degraded.
    pub fallback_reason: Option<String>,
    /// Completion timestamp.
    pub completed_at: DateTime<Utc>,
}

/// Serializable snapshot of the coordinator's full state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionHierarchyExport {
    /// Decisions grouped by tier label, insertion order preserved.
    pub decisions_by_tier: IndexMap<String, Vec<Decision>>,
    /// All arbitrated conflicts, oldest first.
    pub conflicts: Vec<ConflictResolution>,
    /// Total decisions across tiers.
    pub total_decisions: usize,
    /// Total conflicts arbitrated.
    pub total_conflicts: usize,
    /// Export timestamp.
    pub exported_at: DateTime<Utc>,
}

#[derive(Default)]
struct CoordinatorState {
    decisions: IndexMap<Uuid, Decision>,
    conflicts: Vec<ConflictResolution>,
}

/// Arbitrates decisions proposed at the strategic, operational, and tactical
/// horizons. Owns its decision table exclusively; other engines see ids only.
#[derive(Clone)]
pub struct DecisionCoordinator {
    planner: TierPlanner,
    state: Arc<RwLock<CoordinatorState>>,
    telemetry: Option<EngineTelemetry>,
}

impl std::fmt::Debug for DecisionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("DecisionCoordinator")
            .field("decisions", &state.decisions.len())
            .field("conflicts", &state.conflicts.len())
            .finish()
    }
}

impl Default for DecisionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionCoordinator {
    /// Creates a coordinator with no telemetry and no confidence source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            planner: TierPlanner::new(),
            state: Arc::new(RwLock::new(CoordinatorState::default())),
            telemetry: None,
        }
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: EngineTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Wires in a strategy-confidence source.
    #[must_use]
    pub fn with_confidence_lookup(mut self, lookup: Arc<dyn ConfidenceLookup>) -> Self {
        self.planner = self.planner.clone().with_confidence_lookup(lookup);
        self
    }

    /// Plans and stores a decision for one tier.
    pub async fn decide(
        &self,
        tier: DecisionTier,
        context: &TierContext,
        parent: Option<&Decision>,
    ) -> Result<Decision, CoordinationError> {
        let decision = self.planner.plan(tier, context, parent)?;
        self.store_decision(&decision).await;
        Ok(decision)
    }

    /// Runs all three tiers strictly in order (each later tier referencing
    /// the earlier decision), arbitrating conflicts after every tier and
    /// again across the final triple. Any internal failure degrades the call
    /// to a tactical-only decision reported for all three tiers; the failure
    /// is logged as a `fallback` event, never silently dropped.
    #[instrument(skip_all, fields(goals = goals.len()))]
    pub async fn coordinate(
        &self,
        strategic_ctx: &TierContext,
        operational_ctx: &TierContext,
        tactical_ctx: &TierContext,
        goals: &[String],
    ) -> CoordinationReport {
        let cycle_id = Uuid::new_v4();
        match self
            .run_tiers(strategic_ctx, operational_ctx, tactical_ctx)
            .await
        {
            Ok((strategic, operational, tactical, conflicts)) => {
                let report = CoordinationReport {
                    cycle_id,
                    goals: goals.to_vec(),
                    strategic,
                    operational,
                    tactical,
                    conflicts,
                    degraded: false,
                    fallback_reason: None,
                    completed_at: Utc::now(),
                };
                self.emit(
                    LogLevel::Info,
                    "coordination.cycle.completed",
                    json!({
                        "cycle_id": report.cycle_id,
                        "conflicts": report.conflicts.len(),
                        "goals": report.goals,
                    }),
                )
                .await;
                report
            }
            Err(err) => self.fallback(cycle_id, tactical_ctx, goals, &err).await,
        }
    }

    async fn run_tiers(
        &self,
        strategic_ctx: &TierContext,
        operational_ctx: &TierContext,
        tactical_ctx: &TierContext,
    ) -> Result<
        (Decision, Decision, Decision, Vec<ConflictResolution>),
        CoordinationError,
    > {
        let mut seen_pairs = Vec::new();
        let mut conflicts = Vec::new();

        let strategic = self
            .decide(DecisionTier::Strategic, strategic_ctx, None)
            .await?;

        let operational = self
            .decide(DecisionTier::Operational, operational_ctx, Some(&strategic))
            .await?;
        conflicts.extend(sweep_conflicts(&[&strategic, &operational], &mut seen_pairs));

        let tactical = self
            .decide(DecisionTier::Tactical, tactical_ctx, Some(&operational))
            .await?;
        conflicts.extend(sweep_conflicts(&[&operational, &tactical], &mut seen_pairs));

        // Final pass across the whole triple; pairs arbitrated earlier in
        // the cycle are skipped.
        conflicts.extend(sweep_conflicts(
            &[&strategic, &operational, &tactical],
            &mut seen_pairs,
        ));

        self.store_conflicts(&conflicts).await;
        Ok((strategic, operational, tactical, conflicts))
    }

    async fn fallback(
        &self,
        cycle_id: Uuid,
        tactical_ctx: &TierContext,
        goals: &[String],
        err: &CoordinationError,
    ) -> CoordinationReport {
        let decision = self.degraded_tactical_decision(tactical_ctx);
        self.store_decision(&decision).await;
        self.emit(
            LogLevel::Error,
            "coordination.cycle.fallback",
            json!({
                "cycle_id": cycle_id,
                "error": err.to_string(),
                "decision_id": decision.id,
            }),
        )
        .await;
        CoordinationReport {
            cycle_id,
            goals: goals.to_vec(),
            strategic: decision.clone(),
            operational: decision.clone(),
            tactical: decision,
            conflicts: Vec::new(),
            degraded: true,
            fallback_reason: Some(err.to_string()),
            completed_at: Utc::now(),
        }
    }

    /// Builds the degraded tactical answer without any fallible step, so the
    /// fallback path itself cannot fail.
    fn degraded_tactical_decision(&self, context: &TierContext) -> Decision {
        let objective = context
            .objectives
            .iter()
            .filter(|o| !o.completed && o.priority <= 10)
            .max_by_key(|o| o.priority)
            .cloned()
            .unwrap_or_else(Objective::holding_pattern);
        Decision {
            id: Uuid::new_v4(),
            tier: DecisionTier::Tactical,
            priority: DecisionTier::Tactical.base_priority(),
            objective: objective.description,
            action: "Execute immediate response under degraded coordination".to_string(),
            resource_tags: context.resource_tags.clone(),
            constraints: context.constraints.clone(),
            confidence: 0.4,
            depends_on: Vec::new(),
            decided_at: Utc::now(),
        }
    }

    /// Returns stored decisions, optionally filtered by tier.
    #[must_use]
    pub fn get_decisions(&self, tier: Option<DecisionTier>) -> Vec<Decision> {
        self.state
            .read()
            .decisions
            .values()
            .filter(|d| tier.map_or(true, |t| d.tier == t))
            .cloned()
            .collect()
    }

    /// Returns all arbitrated conflicts, oldest first.
    #[must_use]
    pub fn get_conflicts(&self) -> Vec<ConflictResolution> {
        self.state.read().conflicts.clone()
    }

    /// Exports the full decision hierarchy. Counts reconstruct the in-memory
    /// state exactly.
    #[must_use]
    pub fn export_hierarchy(&self) -> DecisionHierarchyExport {
        let state = self.state.read();
        let mut by_tier: IndexMap<String, Vec<Decision>> = IndexMap::new();
        for tier in [
            DecisionTier::Strategic,
            DecisionTier::Operational,
            DecisionTier::Tactical,
        ] {
            by_tier.insert(tier.as_str().to_string(), Vec::new());
        }
        for decision in state.decisions.values() {
            by_tier
                .entry(decision.tier.as_str().to_string())
                .or_default()
                .push(decision.clone());
        }
        DecisionHierarchyExport {
            total_decisions: state.decisions.len(),
            total_conflicts: state.conflicts.len(),
            decisions_by_tier: by_tier,
            conflicts: state.conflicts.clone(),
            exported_at: Utc::now(),
        }
    }

    async fn store_decision(&self, decision: &Decision) {
        self.state
            .write()
            .decisions
            .insert(decision.id, decision.clone());
        self.emit(
            LogLevel::Info,
            "coordination.decision.recorded",
            json!({
                "decision_id": decision.id,
                "tier": decision.tier.as_str(),
                "priority": decision.priority,
                "objective": decision.objective,
            }),
        )
        .await;
    }

    async fn store_conflicts(&self, conflicts: &[ConflictResolution]) {
        if conflicts.is_empty() {
            return;
        }
        self.state.write().conflicts.extend_from_slice(conflicts);
        for conflict in conflicts {
            self.emit(
                LogLevel::Warn,
                "coordination.conflict.resolved",
                json!({
                    "conflict_id": conflict.id,
                    "winner_tier": conflict.winner.tier.as_str(),
                    "overridden_tier": conflict.overridden_tier.as_str(),
                    "rationale": conflict.rationale,
                }),
            )
            .await;
        }
    }

    async fn emit(&self, level: LogLevel, event: &str, payload: serde_json::Value) {
        if let Some(tel) = &self.telemetry {
            tel.log(level, event, payload.clone());
            tel.persist(COORDINATION_LOG, json!({ "event": event, "payload": payload }))
                .await;
        }
    }
}
