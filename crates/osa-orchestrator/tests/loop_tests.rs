//! Orchestration loop behavior against the offline backend

use osa_backend::{OfflineBackend, PromptKind, Scripted};
use osa_context::fallback::synthesize;
use osa_orchestrator::Orchestrator;
use osa_test_utils::{offline_gateway, recording_sink, retail_growth_org};
use osa_types::{
    BackendFailure, BucketName, Confidence, ContextBucket, ContextBuckets, OrchestratorConfig,
    PipelineError, RunCancellation, Scenario, TelemetryEvent,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn all_buckets() -> ContextBuckets {
    let org = retail_growth_org();
    ContextBuckets::from_entries(
        BucketName::ALL
            .into_iter()
            .map(|b| (b, ContextBucket::fallback(synthesize(b, &org)))),
    )
}

fn config(max_passes: u32, threshold: f64) -> OrchestratorConfig {
    OrchestratorConfig::for_scenario(Scenario::Quality)
        .with_max_passes(max_passes)
        .with_threshold(threshold)
}

#[tokio::test]
async fn zero_threshold_makes_two_backend_calls() {
    let backend = Arc::new(OfflineBackend::new());
    let sink = recording_sink();
    let orchestrator = Orchestrator::new(offline_gateway(&backend), sink.clone());

    let result = orchestrator
        .run(&retail_growth_org(), &all_buckets(), &config(3, 0.0), &RunCancellation::new())
        .await;

    assert!(result.success);
    assert_eq!(backend.calls(), 2);
    assert_eq!(backend.kinds(), vec![PromptKind::Initial, PromptKind::Consistency]);
    assert_eq!(result.generation_passes(), 1);
    assert!(result.consistency.is_some());
    assert_eq!(
        result.trace,
        vec!["init", "generate", "score", "consistency_check", "done"]
    );
    assert_eq!(sink.count("pass_completed"), 1);
    assert_eq!(sink.count("consistency_checked"), 1);
    assert_eq!(sink.count("run_finished"), 1);
    assert_eq!(sink.count("fallback_used"), 0);

    let pass = &result.passes[0];
    let reported = sink
        .events()
        .into_iter()
        .find_map(|event| match event {
            TelemetryEvent::PassCompleted {
                index,
                dimensions,
                backend,
                latency_ms,
                ..
            } => Some((index, dimensions, backend, latency_ms)),
            _ => None,
        })
        .unwrap();
    assert_eq!(reported.0, 1);
    assert_eq!(&reported.1, pass.score.dimensions());
    assert_eq!(reported.2, "offline/offline-v1");
    assert_eq!(reported.2, pass.backend);
    assert_eq!(reported.3, pass.latency_ms);
}

#[tokio::test]
async fn unreachable_threshold_uses_every_pass_then_one_consistency_pass() {
    for max_passes in 1..=5 {
        let backend = Arc::new(OfflineBackend::new());
        let orchestrator = Orchestrator::new(offline_gateway(&backend), recording_sink());

        let result = orchestrator
            .run(
                &retail_growth_org(),
                &all_buckets(),
                &config(max_passes, 5.0),
                &RunCancellation::new(),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.generation_passes(), max_passes as usize);
        assert_eq!(backend.calls(), max_passes as usize + 1);
        let kinds = backend.kinds();
        assert_eq!(kinds.first(), Some(&PromptKind::Initial));
        assert_eq!(kinds.last(), Some(&PromptKind::Consistency));
        assert_eq!(
            kinds.iter().filter(|k| **k == PromptKind::Consistency).count(),
            1
        );
        let indexes: Vec<u32> = result.passes.iter().map(|p| p.index).collect();
        assert_eq!(indexes, (1..=max_passes).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn refinement_improves_the_offline_document() {
    let backend = Arc::new(OfflineBackend::new());
    let orchestrator = Orchestrator::new(offline_gateway(&backend), recording_sink());

    let result = orchestrator
        .run(&retail_growth_org(), &all_buckets(), &config(3, 5.0), &RunCancellation::new())
        .await;

    let first = result.passes[0].score.overall();
    let last = result.passes[2].score.overall();
    assert!(last > first, "pass 3 ({last}) should beat pass 1 ({first})");
    assert!(result.passes[1].buckets_used.len() <= BucketName::ALL.len());
    assert!(!result.passes[1].buckets_used.is_empty());
    // three passes cap confidence at medium
    assert!(result.confidence <= Confidence::Medium);
}

#[tokio::test]
async fn exhausted_retries_fall_back_with_low_confidence() {
    let backend = Arc::new(OfflineBackend::failing(Scripted::Status(503)));
    let sink = recording_sink();
    let orchestrator = Orchestrator::new(offline_gateway(&backend), sink.clone());

    let result = orchestrator
        .run(&retail_growth_org(), &all_buckets(), &config(3, 3.8), &RunCancellation::new())
        .await;

    assert!(!result.success);
    assert_eq!(result.confidence, Confidence::Low);
    assert!(!result.document.is_empty());
    assert!(result.passes.is_empty());
    assert_eq!(backend.calls(), 3);
    match &result.errors[..] {
        [PipelineError::Backend(e)] => {
            assert_eq!(e.attempt, 3);
            assert_eq!(e.http_status, Some(503));
            assert_eq!(e.kind, BackendFailure::Status);
        }
        other => panic!("unexpected errors: {other:?}"),
    }
    assert_eq!(
        result.trace,
        vec!["init", "generate", "failed", "fallback", "done"]
    );
    assert_eq!(sink.count("fallback_used"), 1);
}

#[tokio::test]
async fn failure_during_refinement_keeps_earlier_passes() {
    let backend = Arc::new(
        OfflineBackend::new()
            .with_script([Scripted::Succeed])
            .otherwise(Scripted::Status(500)),
    );
    let orchestrator = Orchestrator::new(offline_gateway(&backend), recording_sink());

    let result = orchestrator
        .run(&retail_growth_org(), &all_buckets(), &config(3, 5.0), &RunCancellation::new())
        .await;

    assert!(!result.success);
    assert_eq!(result.generation_passes(), 1);
    assert_eq!(backend.calls(), 4);
    assert!(result.document.title.contains("baseline"));
}

#[tokio::test]
async fn unparsable_response_is_not_retried() {
    let backend = Arc::new(OfflineBackend::failing(Scripted::Garbage));
    let orchestrator = Orchestrator::new(offline_gateway(&backend), recording_sink());

    let result = orchestrator
        .run(&retail_growth_org(), &all_buckets(), &config(3, 3.8), &RunCancellation::new())
        .await;

    assert!(!result.success);
    assert_eq!(backend.calls(), 1);
    assert!(matches!(result.errors[..], [PipelineError::Validation(_)]));
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_in_flight_call() {
    let backend = Arc::new(OfflineBackend::failing(Scripted::Delay(Duration::from_secs(600))));
    let orchestrator = Orchestrator::new(offline_gateway(&backend), recording_sink());
    let cancel = RunCancellation::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let result = orchestrator
        .run(&retail_growth_org(), &all_buckets(), &config(3, 3.8), &cancel)
        .await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!result.success);
    assert_eq!(result.confidence, Confidence::Low);
    assert_eq!(
        result.errors,
        vec![PipelineError::Cancelled {
            stage: "generate".to_string()
        }]
    );
}

#[tokio::test]
async fn cancelled_before_start_never_calls_backend() {
    let backend = Arc::new(OfflineBackend::new());
    let orchestrator = Orchestrator::new(offline_gateway(&backend), recording_sink());
    let cancel = RunCancellation::new();
    cancel.cancel();

    let result = orchestrator
        .run(&retail_growth_org(), &all_buckets(), &config(3, 3.8), &cancel)
        .await;

    assert_eq!(backend.calls(), 0);
    assert!(!result.success);
    assert!(!result.document.is_empty());
}

#[tokio::test]
async fn empty_context_still_succeeds() {
    let backend = Arc::new(OfflineBackend::new());
    let orchestrator = Orchestrator::new(offline_gateway(&backend), recording_sink());

    let result = orchestrator
        .run(
            &retail_growth_org(),
            &ContextBuckets::empty(),
            &config(2, 5.0),
            &RunCancellation::new(),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.generation_passes(), 2);
    assert!(result.passes.iter().all(|p| p.buckets_used.is_empty()));
}
