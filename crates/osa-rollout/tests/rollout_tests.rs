//! Rollout safeguard behavior across assignment, metrics and comparison

use osa_rollout::{
    AbTestConfig, AssignmentReason, MetricSample, RolloutSafeguard, SafeguardThresholds,
    SubjectContext, Variant,
};
use osa_types::{MaturityPhase, MemorySink};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;

fn guard_with(config: AbTestConfig) -> (Arc<RolloutSafeguard>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let guard = RolloutSafeguard::new(sink.clone());
    guard.register(config).unwrap();
    (Arc::new(guard), sink)
}

fn strict_bounds() -> SafeguardThresholds {
    SafeguardThresholds {
        max_error_rate: 0.10,
        max_latency_ms: 30_000,
        min_requests: 5,
    }
}

proptest! {
    #[test]
    fn assignment_is_stable(
        subject in "[a-z0-9-]{1,24}",
        pct in 0u8..=100,
        phase in prop::sample::select(MaturityPhase::ALL.to_vec()),
    ) {
        let (guard, _) = guard_with(AbTestConfig::new("homepage-v2", pct));
        let ctx = SubjectContext::now().with_phase(phase).with_industry("retail");
        let first = guard.assign_variant("homepage-v2", &subject, None, &ctx);
        let second = guard.assign_variant("homepage-v2", &subject, None, &ctx);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn hash_assignment_respects_percentage_edges(subject in "[a-z0-9]{1,16}") {
        let (guard, _) = guard_with(AbTestConfig::new("edge", 0));
        let a = guard.assign_variant("edge", &subject, None, &SubjectContext::now());
        prop_assert_eq!(a.variant, Variant::Control);
        prop_assert!(a.assigned);
        prop_assert_eq!(a.reason, AssignmentReason::HashControl);
    }
}

#[test]
fn treatment_errors_trip_safeguards_until_reset() {
    let config = AbTestConfig::new("refine-loop", 100)
        .including(["pilot"])
        .with_safeguards(strict_bounds());
    let (guard, sink) = guard_with(config);
    let ctx = SubjectContext::now();

    assert!(guard.assign_variant("refine-loop", "acme", Some("pilot"), &ctx).is_treatment());

    for _ in 0..4 {
        guard.record_metrics("refine-loop", Variant::Treatment, MetricSample::failure(1_200));
    }
    assert!(guard.check_safeguards("refine-loop").is_ok(), "below min_requests");

    guard.record_metrics("refine-loop", Variant::Treatment, MetricSample::failure(1_200));
    let err = guard.check_safeguards("refine-loop").unwrap_err();
    assert_eq!(err.test_id, "refine-loop");
    assert!(err.reason.contains("error rate"));

    for subject in ["acme", "globex", "initech"] {
        let a = guard.assign_variant("refine-loop", subject, Some("pilot"), &ctx);
        assert_eq!(a.variant, Variant::Control);
        assert!(!a.assigned);
        assert_eq!(a.reason, AssignmentReason::SafeguardsTriggered);
    }

    // successes do not un-trip
    for _ in 0..200 {
        guard.record_metrics("refine-loop", Variant::Treatment, MetricSample::success(800, 4.1));
    }
    assert!(guard.snapshot("refine-loop").unwrap().tripped);
    assert_eq!(sink.count("safeguard_tripped"), 1);

    assert!(guard.reset_metrics("refine-loop"));
    let snapshot = guard.snapshot("refine-loop").unwrap();
    assert!(!snapshot.tripped);
    assert_eq!(snapshot.treatment.requests, 0);
    let a = guard.assign_variant("refine-loop", "acme", Some("pilot"), &ctx);
    assert_eq!(a.reason, AssignmentReason::ExplicitlyIncluded);
}

#[test]
fn control_errors_never_trip() {
    let (guard, _) = guard_with(AbTestConfig::new("t", 50).with_safeguards(strict_bounds()));
    for _ in 0..50 {
        guard.record_metrics("t", Variant::Control, MetricSample::failure(100));
    }
    assert!(guard.check_safeguards("t").is_ok());
}

#[test]
fn slow_treatment_trips_on_latency() {
    let (guard, _) = guard_with(AbTestConfig::new("t", 50).with_safeguards(strict_bounds()));
    for _ in 0..5 {
        guard.record_metrics("t", Variant::Treatment, MetricSample::success(45_000, 4.0));
    }
    let err = guard.check_safeguards("t").unwrap_err();
    assert!(err.reason.contains("latency"));
}

#[test]
fn outside_window_is_control() {
    use chrono::{Duration, Utc};
    use osa_rollout::TestWindow;

    let now = Utc::now();
    let config = AbTestConfig::new("t", 100).with_window(TestWindow {
        start: Some(now + Duration::days(1)),
        end: None,
    });
    let (guard, _) = guard_with(config);
    let a = guard.assign_variant("t", "s", None, &SubjectContext::at(now));
    assert_eq!(a.reason, AssignmentReason::OutsideWindow);
    assert!(!a.assigned);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_recording_loses_nothing() {
    let (guard, _) = guard_with(AbTestConfig::new("load", 50));

    let tasks: Vec<_> = (0..8)
        .map(|worker| {
            let guard = Arc::clone(&guard);
            tokio::spawn(async move {
                for i in 0..250u64 {
                    let variant = if worker % 2 == 0 { Variant::Control } else { Variant::Treatment };
                    guard.record_metrics("load", variant, MetricSample::success(i % 10, 4.0));
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let snapshot = guard.snapshot("load").unwrap();
    assert_eq!(snapshot.control.requests, 1_000);
    assert_eq!(snapshot.treatment.requests, 1_000);
    assert_eq!(snapshot.treatment.errors, 0);
    assert!(!snapshot.tripped);
}

#[test]
fn compare_variants_reports_significant_lift() {
    let (guard, _) = guard_with(AbTestConfig::new("cmp", 50));
    for i in 0..100 {
        let control = if i < 40 { MetricSample::success(500, 3.5) } else { MetricSample::failure(500) };
        let treatment = if i < 55 { MetricSample::success(700, 4.0) } else { MetricSample::failure(700) };
        guard.record_metrics("cmp", Variant::Control, control);
        guard.record_metrics("cmp", Variant::Treatment, treatment);
    }
    // a 45% error rate trips the default bounds, which the report surfaces
    let report = guard.compare_variants("cmp").unwrap();
    assert!((report.lift - 0.15).abs() < 1e-9);
    assert!((report.relative_lift.unwrap() - 0.375).abs() < 1e-9);
    assert!((report.z - 2.124).abs() < 0.01);
    assert!((report.p_value - 0.0337).abs() < 0.002);
    assert!(report.significant);
    assert!(report.tripped);
    assert!((report.treatment.avg_latency_ms - 700.0).abs() < 1e-9);
}

#[test]
fn compare_variants_without_data_is_inconclusive() {
    let (guard, _) = guard_with(AbTestConfig::new("empty", 50));
    let report = guard.compare_variants("empty").unwrap();
    assert_eq!(report.z, 0.0);
    assert_eq!(report.p_value, 1.0);
    assert!(!report.significant);
    assert_eq!(report.relative_lift, None);
}
