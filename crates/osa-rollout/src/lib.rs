//! OSA Rollout - stable A/B assignment with automatic safety disable
//!
//! [`RolloutSafeguard`] decides whether a caller is routed to the treatment
//! pipeline, records per-variant outcomes, and disables treatment for a test
//! once its error rate or latency breaches the configured bounds.

pub mod assignment;
pub mod config;
pub mod metrics;
pub mod safeguard;
pub mod stats;

pub use assignment::{hash_bucket, AbAssignment, AssignmentReason, SubjectContext, Variant};
pub use config::{AbTestConfig, SafeguardThresholds, TestWindow};
pub use metrics::{MetricSample, MetricsSnapshot, SafeguardMetrics, VariantSnapshot};
pub use safeguard::{RolloutSafeguard, VariantComparison, SIGNIFICANCE_ALPHA};
pub use stats::{normal_cdf, two_proportion_z_test, ZTest};

/// Version of the rollout crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
