//! OSA Orchestrator - quality-gated generation loop and pipeline entry
//!
//! - [`Orchestrator`]: initial pass, bounded refinement, one consistency
//!   pass, fallback on unrecoverable failure
//! - [`Pipeline`]: context building plus the loop, with a rollout-gated
//!   [`Pipeline::route`]
//! - [`PipelineSettings`]: TOML settings validated at startup
//!
//! # Example
//!
//! ```rust
//! use osa_orchestrator::{Pipeline, PipelineSettings};
//! use osa_backend::BackendCache;
//! use osa_context::ConnectorRegistry;
//! use osa_types::{OrgMeta, TracingSink};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), osa_types::ConfigError> {
//! let pipeline = Pipeline::from_settings(
//!     &PipelineSettings::default(),
//!     ConnectorRegistry::new(),
//!     &BackendCache::default(),
//!     Arc::new(TracingSink),
//! )
//! .await?;
//!
//! let result = pipeline.run_pipeline(&OrgMeta::new("Acme", "Retail"), None).await;
//! assert!(!result.document.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod consistency;
pub mod fallback;
pub mod orchestrator;
pub mod pipeline;
pub mod prompt;
pub mod settings;
pub mod state;

pub use consistency::find_contradictions;
pub use fallback::fallback_document;
pub use orchestrator::Orchestrator;
pub use pipeline::{Pipeline, RouteRequest, RoutedRun, DEFAULT_TEST_ID};
pub use settings::{ContextSettings, LoopSettings, PipelineSettings, RolloutSettings};
pub use state::{allowed_transitions, validate_transition, LoopState, StateTrace, TransitionError};

/// Version of the orchestrator crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
