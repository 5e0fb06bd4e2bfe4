//! Telemetry sinks
//!
//! Components report lifecycle events through an injected [`TelemetrySink`]
//! instead of reaching for a global. [`TracingSink`] is the production sink;
//! [`MemorySink`] records events for assertions.

use crate::quality::{DimensionScores, QualityDimension};
use crate::run::{Confidence, PassKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Observable pipeline and rollout events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// A generation pass was scored
    PassCompleted {
        /// Run identifier
        run_id: String,
        /// 1-based pass index
        index: u32,
        /// Pass kind
        kind: PassKind,
        /// Overall score of the pass
        overall: f64,
        /// Per-dimension scores of the pass
        dimensions: DimensionScores,
        /// Backend label (`provider/model`)
        backend: String,
        /// Backend latency
        latency_ms: u64,
    },
    /// The consistency pass finished
    ConsistencyChecked {
        /// Run identifier
        run_id: String,
        /// Contradictions found by the local pre-check
        contradictions: usize,
        /// Overall score of the harmonized document
        overall: f64,
    },
    /// The fallback generator produced the final document
    FallbackUsed {
        /// Run identifier
        run_id: String,
        /// Error that forced the fallback
        reason: String,
    },
    /// A run finished
    RunFinished {
        /// Run identifier
        run_id: String,
        /// Generation passes used
        passes: usize,
        /// Confidence of the final document
        confidence: Confidence,
        /// False when the fallback was used
        success: bool,
        /// Wall-clock duration
        duration_ms: u64,
    },
    /// A rollout assignment was made
    RolloutDecision {
        /// Test identifier
        test_id: String,
        /// Assigned variant name
        variant: String,
        /// Reason code
        reason: String,
    },
    /// Safeguards disabled treatment for a test
    SafeguardTripped {
        /// Test identifier
        test_id: String,
        /// Breached bound
        reason: String,
    },
}

impl TelemetryEvent {
    /// Stable event name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PassCompleted { .. } => "pass_completed",
            Self::ConsistencyChecked { .. } => "consistency_checked",
            Self::FallbackUsed { .. } => "fallback_used",
            Self::RunFinished { .. } => "run_finished",
            Self::RolloutDecision { .. } => "rollout_decision",
            Self::SafeguardTripped { .. } => "safeguard_tripped",
        }
    }
}

/// Destination for telemetry events
pub trait TelemetrySink: Send + Sync {
    /// Record one event
    fn record(&self, event: TelemetryEvent);
}

/// Shared sink handle
pub type SharedSink = Arc<dyn TelemetrySink>;

/// Emits structured `tracing` events plus `metrics` counters and histograms
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    #[allow(clippy::cast_precision_loss)]
    fn record(&self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::PassCompleted {
                run_id,
                index,
                kind,
                overall,
                dimensions,
                backend,
                latency_ms,
            } => {
                tracing::info!(
                    %run_id,
                    index,
                    ?kind,
                    overall,
                    specificity = dimensions.specificity,
                    stack_alignment = dimensions.stack_alignment,
                    maturity_fit = dimensions.maturity_fit,
                    measurement_rigor = dimensions.measurement_rigor,
                    actionability = dimensions.actionability,
                    %backend,
                    latency_ms,
                    "pass completed"
                );
                metrics::counter!("osa_passes_total", "backend" => backend).increment(1);
                metrics::histogram!("osa_pass_latency_ms").record(latency_ms as f64);
                metrics::histogram!("osa_pass_quality").record(overall);
                for dimension in QualityDimension::ALL {
                    metrics::histogram!("osa_pass_dimension", "dimension" => dimension.as_str())
                        .record(dimensions.get(dimension));
                }
            }
            TelemetryEvent::ConsistencyChecked {
                run_id,
                contradictions,
                overall,
            } => {
                tracing::info!(%run_id, contradictions, overall, "consistency checked");
                metrics::counter!("osa_consistency_checks_total").increment(1);
            }
            TelemetryEvent::FallbackUsed { run_id, reason } => {
                tracing::warn!(%run_id, %reason, "fallback document used");
                metrics::counter!("osa_fallbacks_total").increment(1);
            }
            TelemetryEvent::RunFinished {
                run_id,
                passes,
                confidence,
                success,
                duration_ms,
            } => {
                tracing::info!(%run_id, passes, %confidence, success, duration_ms, "run finished");
                metrics::counter!("osa_runs_total", "success" => success.to_string()).increment(1);
                metrics::histogram!("osa_run_duration_ms").record(duration_ms as f64);
            }
            TelemetryEvent::RolloutDecision {
                test_id,
                variant,
                reason,
            } => {
                tracing::debug!(%test_id, %variant, %reason, "rollout decision");
                metrics::counter!("osa_rollout_assignments_total", "variant" => variant).increment(1);
            }
            TelemetryEvent::SafeguardTripped { test_id, reason } => {
                tracing::warn!(%test_id, %reason, "rollout safeguards tripped");
                metrics::counter!("osa_safeguard_trips_total").increment(1);
            }
        }
    }
}

/// In-memory sink for tests and CLI reports
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    /// Create empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all recorded events
    #[must_use]
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }

    /// Number of events with the given name
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl TelemetrySink for MemorySink {
    fn record(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_counts_by_name() {
        let sink = MemorySink::new();
        sink.record(TelemetryEvent::FallbackUsed {
            run_id: "r1".into(),
            reason: "timeout".into(),
        });
        sink.record(TelemetryEvent::SafeguardTripped {
            test_id: "t".into(),
            reason: "error rate".into(),
        });
        assert_eq!(sink.count("fallback_used"), 1);
        assert_eq!(sink.count("pass_completed"), 0);
        assert_eq!(sink.events().len(), 2);

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn tracing_sink_accepts_every_event() {
        let sink = TracingSink;
        sink.record(TelemetryEvent::PassCompleted {
            run_id: "r1".into(),
            index: 1,
            kind: PassKind::Initial,
            overall: 3.0,
            dimensions: DimensionScores::default(),
            backend: "offline/offline-v1".into(),
            latency_ms: 12,
        });
        sink.record(TelemetryEvent::RunFinished {
            run_id: "r1".into(),
            passes: 2,
            confidence: Confidence::Medium,
            success: true,
            duration_ms: 10,
        });
        sink.record(TelemetryEvent::RolloutDecision {
            test_id: "t".into(),
            variant: "treatment".into(),
            reason: "hash_bucket".into(),
        });
    }

    #[test]
    fn events_serialize_with_tag() {
        let value = serde_json::to_value(TelemetryEvent::FallbackUsed {
            run_id: "r".into(),
            reason: "x".into(),
        })
        .unwrap();
        assert_eq!(value["event"], "fallback_used");

        let value = serde_json::to_value(TelemetryEvent::PassCompleted {
            run_id: "r".into(),
            index: 2,
            kind: PassKind::Refinement,
            overall: 2.0,
            dimensions: DimensionScores {
                specificity: 4.0,
                ..DimensionScores::default()
            },
            backend: "openai/gpt-4o-mini".into(),
            latency_ms: 5,
        })
        .unwrap();
        assert_eq!(value["dimensions"]["specificity"], 4.0);
        assert_eq!(value["backend"], "openai/gpt-4o-mini");
    }
}
