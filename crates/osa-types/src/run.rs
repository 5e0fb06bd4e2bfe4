//! Run records
//!
//! Passes accumulate in an append-only list; the final [`RunResult`] is what
//! the pipeline hands back to its caller.

use crate::config::Scenario;
use crate::context::BucketName;
use crate::document::RecommendationDocument;
use crate::error::PipelineError;
use crate::quality::QualityScore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique run identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generation pass kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// First pass over all available context
    Initial,
    /// Refinement of the previous document
    Refinement,
}

/// One generate + score cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationPass {
    /// 1-based pass index
    pub index: u32,
    /// Pass kind
    pub kind: PassKind,
    /// Document produced
    pub document: RecommendationDocument,
    /// Score of that document
    pub score: QualityScore,
    /// Buckets the pass was conditioned on
    pub buckets_used: Vec<BucketName>,
    /// Backend that produced the document
    pub backend: String,
    /// Backend latency in milliseconds
    pub latency_ms: u64,
    /// When the pass completed
    pub timestamp: DateTime<Utc>,
}

/// The single consistency-check pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyRecord {
    /// Contradictions found before harmonizing
    pub contradictions: Vec<String>,
    /// Score of the harmonized document
    pub score: QualityScore,
    /// Backend used
    pub backend: String,
    /// Backend latency in milliseconds
    pub latency_ms: u64,
    /// When the check completed
    pub timestamp: DateTime<Utc>,
}

/// Confidence in the final document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Fallback output or weak score
    Low,
    /// Acceptable
    Medium,
    /// Strong score reached quickly
    High,
}

impl Confidence {
    /// Overall score needed for `high`
    pub const HIGH_SCORE: f64 = 4.0;
    /// Overall score needed for `medium`
    pub const MEDIUM_SCORE: f64 = 3.0;
    /// Pass count from which confidence is capped at `medium`
    pub const SLOW_CONVERGENCE_PASSES: usize = 3;

    /// Derive confidence from the final overall score and generation pass count
    ///
    /// Score sets the base level; a document that needed
    /// [`Self::SLOW_CONVERGENCE_PASSES`] or more passes is capped at `medium`.
    #[must_use]
    pub fn assess(overall: f64, pass_count: usize) -> Self {
        let base = if overall >= Self::HIGH_SCORE {
            Confidence::High
        } else if overall >= Self::MEDIUM_SCORE {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        if pass_count >= Self::SLOW_CONVERGENCE_PASSES {
            base.min(Confidence::Medium)
        } else {
            base
        }
    }

    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Run identifier
    pub run_id: RunId,
    /// Scenario preset the run used
    pub scenario: Scenario,
    /// Final document (never empty)
    pub document: RecommendationDocument,
    /// Generation passes in order
    pub passes: Vec<GenerationPass>,
    /// Consistency pass, when reached
    pub consistency: Option<ConsistencyRecord>,
    /// Confidence in `document`
    pub confidence: Confidence,
    /// False when the fallback generator produced `document`
    pub success: bool,
    /// Errors that degraded the run
    pub errors: Vec<PipelineError>,
    /// Loop states visited, in order
    pub trace: Vec<String>,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Finish time
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    /// Number of generation passes (consistency check excluded)
    #[inline]
    #[must_use]
    pub fn generation_passes(&self) -> usize {
        self.passes.len()
    }

    /// Score of the last generation pass
    #[inline]
    #[must_use]
    pub fn last_score(&self) -> Option<&QualityScore> {
        self.passes.last().map(|p| &p.score)
    }

    /// Best available overall score (consistency pass first)
    #[must_use]
    pub fn final_overall(&self) -> Option<f64> {
        self.consistency
            .as_ref()
            .map(|c| c.score.overall())
            .or_else(|| self.last_score().map(QualityScore::overall))
    }

    /// Wall-clock duration in milliseconds
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        u64::try_from((self.finished_at - self.started_at).num_milliseconds()).unwrap_or(0)
    }
}
