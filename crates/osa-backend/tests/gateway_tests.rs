use osa_backend::{
    Gateway, GenerationRequest, OfflineBackend, PromptKind, RetryPolicy, Scripted,
};
use osa_types::{BackendFailure, GenerationError, MaturityPhase, OrgMeta, RunCancellation};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn request() -> GenerationRequest {
    let org = OrgMeta::new("Acme", "Retail").with_phase(MaturityPhase::Growth);
    GenerationRequest::new(PromptKind::Initial, org, 1).with_prompt("system", "prompt")
}

fn policy() -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(3)
        .with_base_delay(Duration::from_millis(100))
        .with_jitter(false)
}

fn gateway(backend: &Arc<OfflineBackend>) -> Gateway {
    Gateway::new(backend.clone())
        .with_retry(policy())
        .with_timeout(Duration::from_secs(1))
}

#[tokio::test(start_paused = true)]
async fn server_errors_exhaust_all_attempts() {
    let backend = Arc::new(OfflineBackend::failing(Scripted::Status(503)));
    let started = Instant::now();

    let err = gateway(&backend)
        .generate(&request(), &RunCancellation::new())
        .await
        .unwrap_err();

    assert_eq!(backend.calls(), 3);
    let GenerationError::Backend(err) = err else {
        panic!("expected backend error, got {err:?}");
    };
    assert_eq!(err.attempt, 3);
    assert_eq!(err.http_status, Some(503));
    assert_eq!(err.kind, BackendFailure::Status);

    // 100ms after attempt 1, 200ms after attempt 2
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(300), "waited {waited:?}");
    assert!(waited < Duration::from_millis(400), "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn transient_failure_then_success() {
    let backend = Arc::new(OfflineBackend::new().with_script([Scripted::Network, Scripted::Timeout]));
    let output = gateway(&backend)
        .generate(&request(), &RunCancellation::new())
        .await
        .unwrap();
    assert!(!output.content.is_empty());
    assert_eq!(backend.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn client_errors_are_not_retried() {
    let backend = Arc::new(OfflineBackend::failing(Scripted::Status(401)));
    let err = gateway(&backend)
        .generate(&request(), &RunCancellation::new())
        .await
        .unwrap_err();
    assert_eq!(backend.calls(), 1);
    assert!(matches!(err, GenerationError::Backend(e) if e.http_status == Some(401)));
}

#[tokio::test(start_paused = true)]
async fn rate_limits_are_retried() {
    let backend = Arc::new(OfflineBackend::new().with_script([Scripted::Status(429)]));
    assert!(gateway(&backend)
        .generate(&request(), &RunCancellation::new())
        .await
        .is_ok());
    assert_eq!(backend.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn validation_errors_are_not_retried() {
    let backend = Arc::new(OfflineBackend::failing(Scripted::Invalid));
    let err = gateway(&backend)
        .generate(&request(), &RunCancellation::new())
        .await
        .unwrap_err();
    assert_eq!(backend.calls(), 1);
    assert!(matches!(err, GenerationError::Validation(_)));
}

#[tokio::test(start_paused = true)]
async fn hard_timeout_counts_as_failed_attempt() {
    let backend = Arc::new(OfflineBackend::failing(Scripted::Delay(Duration::from_secs(60))));
    let err = gateway(&backend)
        .generate(&request(), &RunCancellation::new())
        .await
        .unwrap_err();
    assert_eq!(backend.calls(), 3);
    assert!(matches!(err, GenerationError::Backend(e) if e.kind == BackendFailure::Timeout));
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_in_flight_call() {
    let backend = Arc::new(OfflineBackend::failing(Scripted::Delay(Duration::from_millis(800))));
    let cancel = RunCancellation::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = gateway(&backend).generate(&request(), &cancel).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(backend.calls(), 1);
    assert!(started.elapsed() < Duration::from_millis(800));
}

#[tokio::test]
async fn already_cancelled_makes_no_call() {
    let backend = Arc::new(OfflineBackend::new());
    let cancel = RunCancellation::new();
    cancel.cancel();
    let err = gateway(&backend).generate(&request(), &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(backend.calls(), 0);
}
