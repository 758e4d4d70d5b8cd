//! Demo console: wires the five autonomic engines against one in-memory
//! record sink and walks a full decide / learn / evolve / reconfigure /
//! recover cycle, printing JSON summaries along the way.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use pelorus_coordination::{
    ConfidenceLookup, DecisionCoordinator, Objective, TierContext,
};
use pelorus_diagnostics::{
    DiagnosticLoop, DiagnosticRecoveryEngine, HealthThresholds, ManagedModule, ModuleKind,
    SimulatedProbe,
};
use pelorus_evolution::{EvolutionTracker, PerformanceMetrics};
use pelorus_reconfiguration::{
    MetricsSnapshot, PerfSample, ReconfigurationController,
};
use pelorus_reflection::{DecisionOutcome, DecisionRecord, ReflectionEngine};
use serde_json::json;
use shared_record_sink::{EngineTelemetry, MemoryRecordSink, RecordSink};

/// Adapts the reflection engine to the coordinator's confidence lookup.
struct ReflectionConfidence(ReflectionEngine);

impl ConfidenceLookup for ReflectionConfidence {
    fn confidence(&self, strategy: &str) -> f32 {
        self.0.get_strategy_confidence(strategy)
    }
}

fn telemetry(sink: &Arc<MemoryRecordSink>, engine: &str) -> Result<EngineTelemetry> {
    EngineTelemetry::builder(engine)
        .log_path(format!("logs/console/{engine}.log.jsonl"))
        .record_sink(Arc::clone(sink) as Arc<dyn RecordSink>)
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    let sink = Arc::new(MemoryRecordSink::new());

    let reflection = ReflectionEngine::new().with_telemetry(telemetry(&sink, "reflection")?);
    let coordinator = DecisionCoordinator::new()
        .with_telemetry(telemetry(&sink, "coordination")?)
        .with_confidence_lookup(Arc::new(ReflectionConfidence(reflection.clone())));

    // 1. Coordinate one convoy cycle across the three tiers.
    let report = coordinator
        .coordinate(
            &TierContext::new()
                .with_objective(Objective::new("open the northern convoy lane", 7))
                .with_resource_tag("icebreaker-1"),
            &TierContext::new()
                .with_objective(Objective::new("stage tugs at the outer anchorage", 6)),
            &TierContext::new()
                .with_objective(Objective::new("escort the stuck barge clear", 6))
                .with_resource_tag("icebreaker-1"),
            &["deliver convoy 42 on schedule".to_string()],
        )
        .await;
    println!(
        "coordination: {}",
        json!({
            "degraded": report.degraded,
            "conflicts": report.conflicts.len(),
            "tactical_action": report.tactical.action,
        })
    );

    // 2. Feed outcomes back and reflect on the mission.
    reflection
        .record_decision(
            DecisionRecord::new(
                "convoy-42",
                "tactical",
                &report.tactical.action,
                DecisionOutcome::Success,
            )
            .with_performance(88.0),
        )
        .await?;
    reflection
        .record_decision(
            DecisionRecord::new(
                "convoy-42",
                "operational",
                &report.operational.action,
                DecisionOutcome::Partial,
            )
            .with_performance(55.0)
            .with_alternative("hold tugs at the inner basin"),
        )
        .await?;
    let mission = reflection.reflect_on_mission("convoy-42").await?;
    println!("reflection: {}", mission.overall_learning);

    // 3. Version the configuration and compare performance.
    let evolution = EvolutionTracker::new().with_telemetry(telemetry(&sink, "evolution")?);
    let v1 = evolution
        .create_version("1.0.0", "baseline routing stack", vec!["initial".into()], None)
        .await?;
    let v2 = evolution
        .create_version(
            "1.1.0",
            "retrained ETA model",
            vec!["retrain on winter data".into()],
            Some(v1.id),
        )
        .await?;
    evolution
        .record_metrics(
            v1.id,
            PerformanceMetrics {
                accuracy: 0.78,
                precision: 0.75,
                recall: 0.72,
                f1: 0.73,
                decision_quality: 64.0,
                error_rate: 0.18,
                sample_size: 4200,
                ..PerformanceMetrics::now()
            },
        )
        .await?;
    evolution
        .record_metrics(
            v2.id,
            PerformanceMetrics {
                accuracy: 0.86,
                precision: 0.84,
                recall: 0.81,
                f1: 0.82,
                decision_quality: 74.0,
                error_rate: 0.11,
                sample_size: 3900,
                ..PerformanceMetrics::now()
            },
        )
        .await?;
    evolution
        .track_progress(v2.id, "eta_prediction", 74.0, Some(v1.id))
        .await?;
    let comparison = evolution.compare_versions(v1.id, v2.id).await?;
    println!(
        "evolution: mean delta {:.1}% -> {}",
        comparison.mean_percent_delta, comparison.summary
    );

    // 4. React to degraded live metrics, validate, and keep or revert.
    let controller =
        ReconfigurationController::new().with_telemetry(telemetry(&sink, "reconfiguration")?);
    let degraded = MetricsSnapshot {
        error_rate: 0.22,
        performance_score: 71.0,
        resource_usage: 0.62,
        response_time_ms: 240.0,
        consecutive_failures: 1,
        throughput: 38.0,
    };
    if let Some(trigger) = controller.monitor_and_trigger(&degraded).await {
        let action = controller.execute_reconfiguration(&trigger).await;
        let validation = controller
            .validate_performance(
                action.id,
                &PerfSample {
                    accuracy: 0.78,
                    response_time_ms: 240.0,
                    error_rate: 0.22,
                    throughput: 38.0,
                },
                &PerfSample {
                    accuracy: 0.83,
                    response_time_ms: 190.0,
                    error_rate: 0.12,
                    throughput: 41.0,
                },
            )
            .await?;
        println!(
            "reconfiguration: {:?} -> verdict {:?}, model now '{}'",
            trigger.cause,
            validation.verdict,
            controller.get_current_configuration().model
        );
    }

    // 5. Diagnose the managed modules and let the loop self-heal.
    let diagnostics = DiagnosticRecoveryEngine::new()
        .with_probe(Arc::new(SimulatedProbe::seeded(42)))
        .with_telemetry(telemetry(&sink, "diagnostics")?);
    diagnostics.register_module(ManagedModule::new("route-optimizer", ModuleKind::Routing))?;
    diagnostics.register_module(
        ManagedModule::new("eta-forecaster", ModuleKind::Forecasting).with_thresholds(
            HealthThresholds {
                min_accuracy: 90.0,
                ..HealthThresholds::default()
            },
        ),
    )?;
    let diagnostic_loop = DiagnosticLoop::new(diagnostics.clone());
    diagnostic_loop.start_with_interval(Duration::from_millis(50))?;
    tokio::time::sleep(Duration::from_millis(180)).await;
    diagnostic_loop.stop_diagnostic_loop().await;
    let summary = diagnostics.get_module_health_summary();
    println!(
        "diagnostics: {}",
        json!({
            "modules": summary.total_modules,
            "healthy": summary.healthy,
            "unhealthy": summary.unhealthy,
            "scans": diagnostics.export_logs().total_scans,
        })
    );

    // 6. Show what reached the external sink.
    println!("sink tables:");
    for (table, count) in sink.table_counts() {
        println!("  {table}: {count}");
    }

    Ok(())
}
