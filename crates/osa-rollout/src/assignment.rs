//! Variant assignments

use chrono::{DateTime, Utc};
use osa_types::MaturityPhase;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Experiment arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Existing behavior
    Control,
    /// New pipeline
    Treatment,
}

impl Variant {
    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Control => "control",
            Variant::Treatment => "treatment",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a subject got its variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentReason {
    /// No such test is registered
    UnknownTest,
    /// Safeguards disabled treatment
    SafeguardsTriggered,
    /// Outside the test window
    OutsideWindow,
    /// Subject or group on the exclude list
    ExplicitlyExcluded,
    /// Subject or group on the include list
    ExplicitlyIncluded,
    /// Maturity phase not allowed
    PhaseNotEligible,
    /// Industry not allowed
    IndustryNotEligible,
    /// Stable hash fell inside the treatment share
    HashTreatment,
    /// Stable hash fell outside the treatment share
    HashControl,
}

impl AssignmentReason {
    /// Snake-case reason code
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownTest => "unknown_test",
            Self::SafeguardsTriggered => "safeguards_triggered",
            Self::OutsideWindow => "outside_window",
            Self::ExplicitlyExcluded => "explicitly_excluded",
            Self::ExplicitlyIncluded => "explicitly_included",
            Self::PhaseNotEligible => "phase_not_eligible",
            Self::IndustryNotEligible => "industry_not_eligible",
            Self::HashTreatment => "hash_treatment",
            Self::HashControl => "hash_control",
        }
    }
}

impl fmt::Display for AssignmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of the subject being assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectContext {
    /// Subject's maturity phase, when known
    pub maturity_phase: Option<MaturityPhase>,
    /// Subject's industry, when known
    pub industry: Option<String>,
    /// Evaluation instant (window checks)
    pub now: DateTime<Utc>,
}

impl SubjectContext {
    /// Context with no attributes, evaluated now
    #[must_use]
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Context with no attributes, evaluated at `now`
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            maturity_phase: None,
            industry: None,
            now,
        }
    }

    /// With maturity phase
    #[inline]
    #[must_use]
    pub fn with_phase(mut self, phase: MaturityPhase) -> Self {
        self.maturity_phase = Some(phase);
        self
    }

    /// With industry
    #[inline]
    #[must_use]
    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }
}

/// Result of one assignment (computed fresh per call)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbAssignment {
    /// Subject identifier
    pub subject_id: String,
    /// Test identifier
    pub test_id: String,
    /// Assigned arm
    pub variant: Variant,
    /// True when the subject is enrolled in the experiment
    pub assigned: bool,
    /// Reason code
    pub reason: AssignmentReason,
}

impl AbAssignment {
    /// True for the treatment arm
    #[inline]
    #[must_use]
    pub fn is_treatment(&self) -> bool {
        self.variant == Variant::Treatment
    }
}

/// Stable bucket in `0..100` for a subject within a test
#[must_use]
pub fn hash_bucket(test_id: &str, subject_id: &str) -> u8 {
    let digest = blake3::hash(format!("{test_id}:{subject_id}").as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    u8::try_from(u64::from_le_bytes(prefix) % 100).unwrap_or(0)
}
