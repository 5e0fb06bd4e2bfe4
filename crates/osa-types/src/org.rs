//! Organization metadata
//!
//! [`OrgMeta`] is the immutable input to a pipeline run. It carries the
//! organization's identity, its maturity phase and the goals, KPIs and
//! platform stack the generated recommendations must respect.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Digital maturity phase (ordered: seed < growth < scale < advanced)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MaturityPhase {
    /// Establishing foundations
    #[default]
    Seed,
    /// Expanding proven programs
    Growth,
    /// Operating at scale
    Scale,
    /// Predictive, fully orchestrated
    Advanced,
}

impl MaturityPhase {
    /// All phases in ascending order
    pub const ALL: [MaturityPhase; 4] = [
        MaturityPhase::Seed,
        MaturityPhase::Growth,
        MaturityPhase::Scale,
        MaturityPhase::Advanced,
    ];

    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MaturityPhase::Seed => "seed",
            MaturityPhase::Growth => "growth",
            MaturityPhase::Scale => "scale",
            MaturityPhase::Advanced => "advanced",
        }
    }

    /// Numeric rank (0 = seed)
    #[inline]
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            MaturityPhase::Seed => 0,
            MaturityPhase::Growth => 1,
            MaturityPhase::Scale => 2,
            MaturityPhase::Advanced => 3,
        }
    }

    /// Distance between two phases on the maturity ladder
    #[inline]
    #[must_use]
    pub fn distance(&self, other: MaturityPhase) -> u8 {
        self.rank().abs_diff(other.rank())
    }
}

impl fmt::Display for MaturityPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown maturity phase
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown maturity phase: {0}")]
pub struct ParsePhaseError(pub String);

impl FromStr for MaturityPhase {
    type Err = ParsePhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seed" => Ok(MaturityPhase::Seed),
            "growth" => Ok(MaturityPhase::Growth),
            "scale" => Ok(MaturityPhase::Scale),
            "advanced" => Ok(MaturityPhase::Advanced),
            other => Err(ParsePhaseError(other.to_string())),
        }
    }
}

/// Organization metadata (immutable run input)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMeta {
    /// Organization display name
    pub org_name: String,
    /// Industry vertical (free text, e.g. "Retail")
    pub industry: String,
    /// Operating region
    #[serde(default)]
    pub region: String,
    /// Current maturity phase
    #[serde(default)]
    pub maturity_phase: MaturityPhase,
    /// Primary goals, most important first
    #[serde(default)]
    pub primary_goals: Vec<String>,
    /// Primary KPIs, most important first
    #[serde(default)]
    pub primary_kpis: Vec<String>,
    /// Declared platform stack
    #[serde(default)]
    pub platform_stack: BTreeSet<String>,
}

impl OrgMeta {
    /// Create metadata with name and industry
    #[inline]
    #[must_use]
    pub fn new(org_name: impl Into<String>, industry: impl Into<String>) -> Self {
        Self {
            org_name: org_name.into(),
            industry: industry.into(),
            region: String::new(),
            maturity_phase: MaturityPhase::default(),
            primary_goals: Vec::new(),
            primary_kpis: Vec::new(),
            platform_stack: BTreeSet::new(),
        }
    }

    /// With region
    #[inline]
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// With maturity phase
    #[inline]
    #[must_use]
    pub fn with_phase(mut self, phase: MaturityPhase) -> Self {
        self.maturity_phase = phase;
        self
    }

    /// With primary goals
    #[must_use]
    pub fn with_goals<I, S>(mut self, goals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_goals = goals.into_iter().map(Into::into).collect();
        self
    }

    /// With primary KPIs
    #[must_use]
    pub fn with_kpis<I, S>(mut self, kpis: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_kpis = kpis.into_iter().map(Into::into).collect();
        self
    }

    /// With declared platform stack
    #[must_use]
    pub fn with_stack<I, S>(mut self, stack: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platform_stack = stack.into_iter().map(Into::into).collect();
        self
    }

    /// Industry normalized for template lookups
    #[inline]
    #[must_use]
    pub fn industry_key(&self) -> String {
        self.industry.trim().to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_ordered() {
        assert!(MaturityPhase::Seed < MaturityPhase::Growth);
        assert!(MaturityPhase::Growth < MaturityPhase::Scale);
        assert!(MaturityPhase::Scale < MaturityPhase::Advanced);
        assert_eq!(MaturityPhase::Seed.distance(MaturityPhase::Advanced), 3);
    }

    #[test]
    fn phase_parse_is_case_insensitive() {
        assert_eq!("Growth".parse::<MaturityPhase>(), Ok(MaturityPhase::Growth));
        assert_eq!(" ADVANCED ".parse::<MaturityPhase>(), Ok(MaturityPhase::Advanced));
        assert!("mature".parse::<MaturityPhase>().is_err());
    }

    #[test]
    fn org_meta_builder() {
        let org = OrgMeta::new("Acme", "Retail")
            .with_phase(MaturityPhase::Growth)
            .with_kpis(["conversion rate", "AOV"])
            .with_stack(["CMS", "Web Experimentation"]);

        assert_eq!(org.primary_kpis, vec!["conversion rate", "AOV"]);
        assert!(org.platform_stack.contains("CMS"));
        assert_eq!(org.industry_key(), "retail");
    }

    #[test]
    fn org_meta_deserializes_with_defaults() {
        let org: OrgMeta =
            serde_json::from_str(r#"{"org_name":"Acme","industry":"Retail","maturity_phase":"scale"}"#)
                .unwrap();
        assert_eq!(org.maturity_phase, MaturityPhase::Scale);
        assert!(org.primary_goals.is_empty());
    }
}
