//! OSA Types - shared data model for the strategy recommendation orchestrator
//!
//! Everything that crosses a crate boundary lives here:
//! - [`OrgMeta`] and [`MaturityPhase`]: the run input
//! - [`ContextBuckets`]: the four context buckets a run is conditioned on
//! - [`RecommendationDocument`]: the structured output
//! - [`QualityScore`]: deterministic five-dimension assessment
//! - [`RunResult`]: passes, confidence and recorded errors of one run
//! - error taxonomy, cancellation and telemetry sinks
//!
//! # Example
//!
//! ```rust
//! use osa_types::{MaturityPhase, OrchestratorConfig, OrgMeta, Scenario};
//!
//! let org = OrgMeta::new("Acme Outfitters", "Retail")
//!     .with_phase(MaturityPhase::Growth)
//!     .with_kpis(["conversion rate", "average order value"]);
//!
//! let config = OrchestratorConfig::for_scenario(Scenario::Quality);
//! assert!(config.validate().is_ok());
//! assert_eq!(org.industry_key(), "retail");
//! ```

pub mod cancel;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod org;
pub mod quality;
pub mod run;
pub mod telemetry;

pub use cancel::RunCancellation;
pub use config::{OrchestratorConfig, Scenario};
pub use context::{BucketName, ContextBucket, ContextBuckets, Origin};
pub use document::{KpiTarget, RecommendationDocument, Section, SectionKind};
pub use error::{
    BackendError, BackendFailure, ConfigError, ConnectorError, GenerationError, PipelineError,
    SafeguardTrippedError, ValidationError,
};
pub use org::{MaturityPhase, OrgMeta, ParsePhaseError};
pub use quality::{DimensionScores, QualityDimension, QualityScore, MAX_DIMENSION_SCORE};
pub use run::{Confidence, ConsistencyRecord, GenerationPass, PassKind, RunId, RunResult};
pub use telemetry::{MemorySink, SharedSink, TelemetryEvent, TelemetrySink, TracingSink};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with OSA types
    pub use crate::{
        BucketName, ContextBuckets, MaturityPhase, OrchestratorConfig, OrgMeta,
        QualityDimension, QualityScore, RecommendationDocument, RunCancellation, RunResult,
        Scenario, SectionKind,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
