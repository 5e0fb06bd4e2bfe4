//! OSA Context - builds the four context buckets a run is conditioned on
//!
//! - [`ContextBuilder`]: concurrent per-bucket fetch with independent timeouts
//! - [`DataConnector`]: outbound fetch seam
//! - [`fallback::synthesize`]: deterministic per-industry, per-phase payloads
//! - [`coverage`] and [`select_context_for_next_pass`]: pure helpers used by
//!   the refinement loop

pub mod builder;
pub mod connector;
pub mod coverage;
pub mod fallback;

pub use builder::{ContextBuilder, DEFAULT_CONNECTOR_TIMEOUT};
pub use connector::{validate_payload, ConnectorRegistry, DataConnector, StaticConnector};
pub use coverage::{buckets_for_dimension, coverage, select_context_for_next_pass, Coverage};
