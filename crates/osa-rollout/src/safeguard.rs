//! Rollout safeguard service
//!
//! Holds registered tests and their running metrics. Assignment is computed
//! fresh on every call from the test definition, the subject and the current
//! trip state; nothing about a subject is stored.

use crate::assignment::{hash_bucket, AbAssignment, AssignmentReason, SubjectContext, Variant};
use crate::config::AbTestConfig;
use crate::metrics::{MetricSample, MetricsSnapshot, SafeguardMetrics, VariantSnapshot};
use crate::stats::two_proportion_z_test;
use dashmap::DashMap;
use osa_types::{ConfigError, SafeguardTrippedError, SharedSink, TelemetryEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Significance level used by [`RolloutSafeguard::compare_variants`]
pub const SIGNIFICANCE_ALPHA: f64 = 0.05;

/// Control vs treatment report for one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantComparison {
    /// Test identifier
    pub test_id: String,
    /// Control arm
    pub control: VariantSnapshot,
    /// Treatment arm
    pub treatment: VariantSnapshot,
    /// Treatment success rate minus control success rate
    pub lift: f64,
    /// `lift / control success rate`; `None` when control has no successes
    pub relative_lift: Option<f64>,
    /// z statistic
    pub z: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// `p_value < 0.05`
    pub significant: bool,
    /// Whether safeguards have disabled treatment
    pub tripped: bool,
}

/// A/B assignment with automatic safety disable
pub struct RolloutSafeguard {
    tests: DashMap<String, AbTestConfig>,
    metrics: DashMap<String, Arc<SafeguardMetrics>>,
    trip_reasons: DashMap<String, String>,
    sink: SharedSink,
}

impl fmt::Debug for RolloutSafeguard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RolloutSafeguard")
            .field("tests", &self.tests.len())
            .field("tripped", &self.trip_reasons.len())
            .finish_non_exhaustive()
    }
}

impl RolloutSafeguard {
    /// Create an empty safeguard reporting to `sink`
    #[must_use]
    pub fn new(sink: SharedSink) -> Self {
        Self {
            tests: DashMap::new(),
            metrics: DashMap::new(),
            trip_reasons: DashMap::new(),
            sink,
        }
    }

    /// Register or replace a test definition
    ///
    /// Existing metrics for the test id are kept.
    ///
    /// # Errors
    /// [`ConfigError`] when the definition does not validate.
    pub fn register(&self, config: AbTestConfig) -> Result<(), ConfigError> {
        config.validate()?;
        info!(
            test_id = %config.test_id,
            treatment_percentage = config.treatment_percentage,
            "registered rollout test"
        );
        self.metrics
            .entry(config.test_id.clone())
            .or_insert_with(|| Arc::new(SafeguardMetrics::new()));
        self.tests.insert(config.test_id.clone(), config);
        Ok(())
    }

    /// Registered definition
    #[must_use]
    pub fn config(&self, test_id: &str) -> Option<AbTestConfig> {
        self.tests.get(test_id).map(|c| c.value().clone())
    }

    /// Registered test ids, sorted
    #[must_use]
    pub fn test_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tests.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    fn metrics_for(&self, test_id: &str) -> Option<Arc<SafeguardMetrics>> {
        self.metrics.get(test_id).map(|m| Arc::clone(m.value()))
    }

    /// Assign a subject to a variant
    ///
    /// `subject_group` is matched against the include and exclude lists
    /// alongside the subject id. Unknown tests and ineligible subjects get
    /// control with `assigned = false`.
    pub fn assign_variant(
        &self,
        test_id: &str,
        subject_id: &str,
        subject_group: Option<&str>,
        ctx: &SubjectContext,
    ) -> AbAssignment {
        let (variant, assigned, reason) = match self.config(test_id) {
            None => (Variant::Control, false, AssignmentReason::UnknownTest),
            Some(config) => self.decide(&config, subject_id, subject_group, ctx),
        };

        debug!(test_id, subject_id, %variant, %reason, "rollout assignment");
        self.sink.record(TelemetryEvent::RolloutDecision {
            test_id: test_id.to_string(),
            variant: variant.as_str().to_string(),
            reason: reason.as_str().to_string(),
        });

        AbAssignment {
            subject_id: subject_id.to_string(),
            test_id: test_id.to_string(),
            variant,
            assigned,
            reason,
        }
    }

    fn decide(
        &self,
        config: &AbTestConfig,
        subject_id: &str,
        subject_group: Option<&str>,
        ctx: &SubjectContext,
    ) -> (Variant, bool, AssignmentReason) {
        let ineligible = |reason| (Variant::Control, false, reason);

        if self.evaluate(config) {
            return ineligible(AssignmentReason::SafeguardsTriggered);
        }
        if !config.window.contains(ctx.now) {
            return ineligible(AssignmentReason::OutsideWindow);
        }

        let listed = |list: &[String]| {
            list.iter()
                .any(|entry| entry == subject_id || subject_group.is_some_and(|g| entry == g))
        };
        if listed(&config.exclude) {
            return ineligible(AssignmentReason::ExplicitlyExcluded);
        }
        if listed(&config.include) {
            return (Variant::Treatment, true, AssignmentReason::ExplicitlyIncluded);
        }

        if !config.allowed_phases.is_empty()
            && !ctx
                .maturity_phase
                .is_some_and(|p| config.allowed_phases.contains(&p))
        {
            return ineligible(AssignmentReason::PhaseNotEligible);
        }
        if !config.allowed_industries.is_empty()
            && !ctx.industry.as_deref().is_some_and(|industry| {
                config
                    .allowed_industries
                    .iter()
                    .any(|allowed| allowed.trim().eq_ignore_ascii_case(industry.trim()))
            })
        {
            return ineligible(AssignmentReason::IndustryNotEligible);
        }

        if hash_bucket(&config.test_id, subject_id) < config.treatment_percentage {
            (Variant::Treatment, true, AssignmentReason::HashTreatment)
        } else {
            (Variant::Control, true, AssignmentReason::HashControl)
        }
    }

    /// Evaluate the trip rule; true when treatment is disabled
    fn evaluate(&self, config: &AbTestConfig) -> bool {
        let Some(metrics) = self.metrics_for(&config.test_id) else {
            return false;
        };
        if let Some(reason) = metrics.evaluate(&config.safeguards) {
            warn!(test_id = %config.test_id, %reason, "rollout safeguards tripped");
            self.trip_reasons.insert(config.test_id.clone(), reason.clone());
            self.sink.record(TelemetryEvent::SafeguardTripped {
                test_id: config.test_id.clone(),
                reason,
            });
        }
        metrics.is_tripped()
    }

    /// Check whether treatment is still enabled for a test
    ///
    /// Unknown tests pass.
    ///
    /// # Errors
    /// [`SafeguardTrippedError`] once the safeguards have tripped.
    pub fn check_safeguards(&self, test_id: &str) -> Result<(), SafeguardTrippedError> {
        let Some(config) = self.config(test_id) else {
            return Ok(());
        };
        if self.evaluate(&config) {
            let reason = self
                .trip_reasons
                .get(test_id)
                .map_or_else(|| "safeguards tripped".to_string(), |r| r.value().clone());
            return Err(SafeguardTrippedError {
                test_id: test_id.to_string(),
                reason,
            });
        }
        Ok(())
    }

    /// Record one outcome; treatment samples re-evaluate the trip rule
    pub fn record_metrics(&self, test_id: &str, variant: Variant, sample: MetricSample) {
        let Some(metrics) = self.metrics_for(test_id) else {
            warn!(test_id, "metrics for unknown rollout test dropped");
            return;
        };
        metrics.record(variant, sample);
        if variant == Variant::Treatment {
            if let Some(config) = self.config(test_id) {
                self.evaluate(&config);
            }
        }
    }

    /// Current metrics for a test
    #[must_use]
    pub fn snapshot(&self, test_id: &str) -> Option<MetricsSnapshot> {
        self.metrics_for(test_id).map(|m| m.snapshot(test_id))
    }

    /// Operator reset: fresh counters and an untripped state
    ///
    /// Returns false for unknown tests.
    pub fn reset_metrics(&self, test_id: &str) -> bool {
        if !self.tests.contains_key(test_id) {
            return false;
        }
        self.metrics
            .insert(test_id.to_string(), Arc::new(SafeguardMetrics::new()));
        self.trip_reasons.remove(test_id);
        info!(test_id, "rollout metrics reset");
        true
    }

    /// Compare success rates of the two arms
    #[must_use]
    pub fn compare_variants(&self, test_id: &str) -> Option<VariantComparison> {
        let snapshot = self.snapshot(test_id)?;
        let (control, treatment) = (snapshot.control, snapshot.treatment);

        let test = two_proportion_z_test(
            control.successes,
            control.requests,
            treatment.successes,
            treatment.requests,
        );
        let lift = treatment.success_rate - control.success_rate;
        let relative_lift = (control.success_rate > 0.0).then(|| lift / control.success_rate);

        Some(VariantComparison {
            test_id: snapshot.test_id,
            control,
            treatment,
            lift,
            relative_lift,
            z: test.z,
            p_value: test.p_value,
            significant: test.significant(SIGNIFICANCE_ALPHA),
            tripped: snapshot.tripped,
        })
    }
}
