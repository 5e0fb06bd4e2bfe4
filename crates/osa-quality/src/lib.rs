//! OSA Quality - deterministic quality scoring of recommendation documents
//!
//! Five independent heuristics (specificity, stack alignment, maturity fit,
//! measurement rigor, actionability) each produce a value in `[0, 5]`; the
//! overall score is their unweighted mean. The same document and metadata
//! always produce a bit-identical score.

pub mod analysis;
pub mod dimensions;
pub mod scorer;

pub use analysis::{analyze_content, ContentAnalysis, DATA_INDICATORS, GENERIC_INDICATORS};
pub use scorer::{QualityScorer, ScorerConfig, DEFAULT_ISSUE_THRESHOLD};
