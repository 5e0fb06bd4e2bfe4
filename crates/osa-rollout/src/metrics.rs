//! Per-test safeguard metrics
//!
//! Running totals per variant, updated with lock-free atomic adds. Counters
//! only grow; an operator reset replaces the whole [`SafeguardMetrics`].

use crate::assignment::Variant;
use crate::config::SafeguardThresholds;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// One observed pipeline outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Whether the run succeeded
    pub success: bool,
    /// End-to-end latency
    pub latency_ms: u64,
    /// Final overall quality, when a document was scored
    pub quality_score: Option<f64>,
}

impl MetricSample {
    /// Successful sample
    #[inline]
    #[must_use]
    pub fn success(latency_ms: u64, quality_score: f64) -> Self {
        Self {
            success: true,
            latency_ms,
            quality_score: Some(quality_score),
        }
    }

    /// Failed sample
    #[inline]
    #[must_use]
    pub fn failure(latency_ms: u64) -> Self {
        Self {
            success: false,
            latency_ms,
            quality_score: None,
        }
    }
}

/// Atomic running totals for one variant
#[derive(Debug, Default)]
struct VariantCounters {
    requests: AtomicU64,
    successes: AtomicU64,
    errors: AtomicU64,
    latency_ms_total: AtomicU64,
    /// Quality scores stored in thousandths
    quality_milli_total: AtomicU64,
    quality_samples: AtomicU64,
}

impl VariantCounters {
    fn record(&self, sample: MetricSample) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if sample.success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_ms_total
            .fetch_add(sample.latency_ms, Ordering::Relaxed);
        if let Some(quality) = sample.quality_score.filter(|q| q.is_finite()) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let milli = (quality.clamp(0.0, 5.0) * 1000.0).round() as u64;
            self.quality_milli_total.fetch_add(milli, Ordering::Relaxed);
            self.quality_samples.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn snapshot(&self) -> VariantSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let successes = self.successes.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        let latency = self.latency_ms_total.load(Ordering::Relaxed);
        let quality = self.quality_milli_total.load(Ordering::Relaxed);
        let quality_samples = self.quality_samples.load(Ordering::Relaxed);

        let per_request = |total: f64| if requests == 0 { 0.0 } else { total / requests as f64 };
        VariantSnapshot {
            requests,
            successes,
            errors,
            success_rate: per_request(successes as f64),
            error_rate: per_request(errors as f64),
            avg_latency_ms: per_request(latency as f64),
            avg_quality: if quality_samples == 0 {
                None
            } else {
                Some(quality as f64 / 1000.0 / quality_samples as f64)
            },
        }
    }
}

/// Point-in-time view of one variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariantSnapshot {
    /// Samples recorded
    pub requests: u64,
    /// Successful samples
    pub successes: u64,
    /// Failed samples
    pub errors: u64,
    /// `successes / requests`
    pub success_rate: f64,
    /// `errors / requests`
    pub error_rate: f64,
    /// Mean latency
    pub avg_latency_ms: f64,
    /// Mean quality over samples that carried one
    pub avg_quality: Option<f64>,
}

/// Point-in-time view of one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Test identifier
    pub test_id: String,
    /// Control arm
    pub control: VariantSnapshot,
    /// Treatment arm
    pub treatment: VariantSnapshot,
    /// Whether safeguards have disabled treatment
    pub tripped: bool,
}

/// Running totals for one test, with a latched trip flag
#[derive(Debug, Default)]
pub struct SafeguardMetrics {
    control: VariantCounters,
    treatment: VariantCounters,
    tripped: AtomicBool,
}

impl SafeguardMetrics {
    /// Fresh, untripped metrics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sample
    pub fn record(&self, variant: Variant, sample: MetricSample) {
        match variant {
            Variant::Control => self.control.record(sample),
            Variant::Treatment => self.treatment.record(sample),
        }
    }

    /// Snapshot of one variant
    #[must_use]
    pub fn variant(&self, variant: Variant) -> VariantSnapshot {
        match variant {
            Variant::Control => self.control.snapshot(),
            Variant::Treatment => self.treatment.snapshot(),
        }
    }

    /// True once the safeguards have tripped
    #[inline]
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Evaluate the treatment arm against `thresholds`
    ///
    /// Returns the breach description the first time the bounds are
    /// exceeded; the trip then stays latched and later calls return `None`.
    pub fn evaluate(&self, thresholds: &SafeguardThresholds) -> Option<String> {
        if self.is_tripped() {
            return None;
        }
        let treatment = self.treatment.snapshot();
        if treatment.requests < thresholds.min_requests.max(1) {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let breach = if treatment.error_rate > thresholds.max_error_rate {
            Some(format!(
                "treatment error rate {:.3} exceeds {:.3}",
                treatment.error_rate, thresholds.max_error_rate
            ))
        } else if treatment.avg_latency_ms > thresholds.max_latency_ms as f64 {
            Some(format!(
                "treatment average latency {:.0}ms exceeds {}ms",
                treatment.avg_latency_ms, thresholds.max_latency_ms
            ))
        } else {
            None
        };

        let reason = breach?;
        self.tripped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| reason)
    }

    /// Snapshot of the whole test
    #[must_use]
    pub fn snapshot(&self, test_id: &str) -> MetricsSnapshot {
        MetricsSnapshot {
            test_id: test_id.to_string(),
            control: self.control.snapshot(),
            treatment: self.treatment.snapshot(),
            tripped: self.is_tripped(),
        }
    }
}
