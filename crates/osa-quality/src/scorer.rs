//! Quality scorer

use crate::dimensions::{self, ScoringInput};
use osa_types::{
    BucketName, DimensionScores, OrgMeta, QualityDimension, QualityScore, RecommendationDocument,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default bound below which a dimension is reported as an issue
pub const DEFAULT_ISSUE_THRESHOLD: f64 = 3.5;

/// Scorer configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// Dimensions below this value produce an issue
    pub issue_threshold: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            issue_threshold: DEFAULT_ISSUE_THRESHOLD,
        }
    }
}

/// Deterministic five-dimension document scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityScorer {
    config: ScorerConfig,
}

impl QualityScorer {
    /// Create scorer with default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With issue threshold
    #[inline]
    #[must_use]
    pub fn with_issue_threshold(mut self, threshold: f64) -> Self {
        self.config.issue_threshold = threshold;
        self
    }

    /// Configuration in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Score a document
    ///
    /// `supplied` lists the buckets the generating pass was given; the ones
    /// the document does not reference become `missing_areas`.
    #[must_use]
    pub fn score(
        &self,
        document: &RecommendationDocument,
        org: &OrgMeta,
        supplied: &[BucketName],
    ) -> QualityScore {
        let input = ScoringInput::new(document, org);
        let raw = DimensionScores {
            specificity: dimensions::specificity(&input),
            stack_alignment: dimensions::stack_alignment(&input),
            maturity_fit: dimensions::maturity_fit(&input),
            measurement_rigor: dimensions::measurement_rigor(&input),
            actionability: dimensions::actionability(&input),
        };
        let clamped = raw.clamped();

        let mut missing: Vec<BucketName> = supplied
            .iter()
            .copied()
            .filter(|b| !document.referenced_buckets.contains(b))
            .collect();
        missing.sort();
        missing.dedup();

        let mut issues = Vec::new();
        let mut recommendations = Vec::new();
        for dimension in QualityDimension::ALL {
            let value = clamped.get(dimension);
            if value < self.config.issue_threshold {
                issues.push(format!(
                    "{dimension} scored {value:.2}, below {:.2}",
                    self.config.issue_threshold
                ));
                recommendations.push(advice(dimension).to_string());
            }
        }
        for phrase in &input.analysis.generic_phrases {
            issues.push(format!("generic phrasing detected: \"{phrase}\""));
        }
        for bucket in &missing {
            recommendations.push(format!("Draw on the {bucket} context, which the document ignores"));
        }

        let score = QualityScore::new(clamped, issues, missing, recommendations);
        debug!(
            overall = score.overall(),
            issues = score.issues().len(),
            missing = score.missing_areas().len(),
            "document scored"
        );
        score
    }
}

fn advice(dimension: QualityDimension) -> &'static str {
    match dimension {
        QualityDimension::Specificity => {
            "Name the organization, its industry and goals, and quantify each recommendation"
        }
        QualityDimension::StackAlignment => {
            "Tie recommendations to the tools in the declared platform stack"
        }
        QualityDimension::MaturityFit => {
            "Match the ambition of each recommendation to the current maturity phase"
        }
        QualityDimension::MeasurementRigor => {
            "Give every primary KPI a target, a timeframe and a review cadence"
        }
        QualityDimension::Actionability => {
            "Phrase recommendations as concrete actions with owners and deadlines"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osa_types::{MaturityPhase, Section, SectionKind};

    fn org() -> OrgMeta {
        OrgMeta::new("Acme", "Retail")
            .with_phase(MaturityPhase::Growth)
            .with_kpis(["conversion rate"])
    }

    #[test]
    fn empty_document_scores_low_with_issues() {
        let doc = RecommendationDocument::new("Plan");
        let score = QualityScorer::new().score(&doc, &org(), &BucketName::ALL);
        assert!(score.overall() < 3.0);
        assert!(!score.issues().is_empty());
        assert_eq!(score.missing_areas(), &BucketName::ALL);
    }

    #[test]
    fn missing_areas_exclude_referenced() {
        let doc = RecommendationDocument::new("Plan")
            .with_section(Section::new(SectionKind::StrategicPriorities).recommend("Launch"))
            .referencing([BucketName::Content, BucketName::Strategy]);
        let score = QualityScorer::new().score(
            &doc,
            &org(),
            &[BucketName::Strategy, BucketName::Analytics],
        );
        assert_eq!(score.missing_areas(), &[BucketName::Analytics]);
        assert!(score
            .recommendations()
            .iter()
            .any(|r| r.contains("analytics")));
    }

    #[test]
    fn zero_threshold_reports_no_dimension_issues() {
        let doc = RecommendationDocument::new("Plan");
        let score = QualityScorer::new()
            .with_issue_threshold(0.0)
            .score(&doc, &org(), &[]);
        assert!(score.issues().is_empty());
    }

    #[test]
    fn generic_phrases_raise_issues() {
        let doc = RecommendationDocument::new("Plan").with_section(
            Section::new(SectionKind::ContentRecommendations).recommend("Use sample content"),
        );
        let score = QualityScorer::new().score(&doc, &org(), &[]);
        assert!(score.issues().iter().any(|i| i.contains("sample content")));
    }
}
