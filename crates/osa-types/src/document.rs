//! Recommendation documents
//!
//! The pipeline's output is a four-section recommendation document. Backends
//! return it as JSON; [`RecommendationDocument::parse`] turns a raw completion
//! into the typed form and rejects shapes that cannot be used.

use crate::context::BucketName;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Output section kinds (in document order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Strategic priorities for the next planning horizon
    StrategicPriorities,
    /// Content recommendations
    ContentRecommendations,
    /// Experimentation / personalization plan
    ExperimentationPlan,
    /// KPIs, targets and measurement cadence
    MeasurementFramework,
}

impl SectionKind {
    /// All sections in document order
    pub const ALL: [SectionKind; 4] = [
        SectionKind::StrategicPriorities,
        SectionKind::ContentRecommendations,
        SectionKind::ExperimentationPlan,
        SectionKind::MeasurementFramework,
    ];

    /// Stable snake_case name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::StrategicPriorities => "strategic_priorities",
            SectionKind::ContentRecommendations => "content_recommendations",
            SectionKind::ExperimentationPlan => "experimentation_plan",
            SectionKind::MeasurementFramework => "measurement_framework",
        }
    }

    /// Human-readable heading
    #[inline]
    #[must_use]
    pub fn heading(&self) -> &'static str {
        match self {
            SectionKind::StrategicPriorities => "Strategic Priorities",
            SectionKind::ContentRecommendations => "Content Recommendations",
            SectionKind::ExperimentationPlan => "Experimentation Plan",
            SectionKind::MeasurementFramework => "Measurement Framework",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A KPI with a stated target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiTarget {
    /// KPI name
    pub kpi: String,
    /// Target expression (e.g. "+12% in 2 quarters")
    pub target: String,
}

impl KpiTarget {
    /// Create new target
    #[inline]
    #[must_use]
    pub fn new(kpi: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kpi: kpi.into(),
            target: target.into(),
        }
    }
}

/// One document section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section kind
    pub kind: SectionKind,
    /// Short narrative summary
    #[serde(default)]
    pub summary: String,
    /// Recommendation bullets
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// KPI targets claimed in this section
    #[serde(default)]
    pub kpi_targets: Vec<KpiTarget>,
}

impl Section {
    /// Create empty section
    #[inline]
    #[must_use]
    pub fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            summary: String::new(),
            recommendations: Vec::new(),
            kpi_targets: Vec::new(),
        }
    }

    /// With summary
    #[inline]
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Add recommendation
    #[inline]
    #[must_use]
    pub fn recommend(mut self, item: impl Into<String>) -> Self {
        self.recommendations.push(item.into());
        self
    }

    /// Add KPI target
    #[inline]
    #[must_use]
    pub fn target(mut self, kpi: impl Into<String>, target: impl Into<String>) -> Self {
        self.kpi_targets.push(KpiTarget::new(kpi, target));
        self
    }

    /// True when the section says nothing
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.summary.trim().is_empty() && self.recommendations.iter().all(|r| r.trim().is_empty())
    }
}

/// Structured multi-section recommendation document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationDocument {
    /// Document title
    pub title: String,
    /// Sections in document order
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Context buckets the document draws on
    #[serde(default)]
    pub referenced_buckets: BTreeSet<BucketName>,
}

impl RecommendationDocument {
    /// Create document with title and no sections
    #[inline]
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
            referenced_buckets: BTreeSet::new(),
        }
    }

    /// Add or replace a section
    #[must_use]
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.retain(|s| s.kind != section.kind);
        self.sections.push(section);
        self.sections.sort_by_key(|s| s.kind);
        self
    }

    /// Record referenced buckets
    #[must_use]
    pub fn referencing<I>(mut self, buckets: I) -> Self
    where
        I: IntoIterator<Item = BucketName>,
    {
        self.referenced_buckets.extend(buckets);
        self
    }

    /// Parse a backend completion into a document
    ///
    /// Accepts bare JSON or JSON wrapped in a fenced code block.
    ///
    /// # Errors
    /// Returns [`ValidationError`] when the content is not a document-shaped
    /// JSON object or carries no usable section.
    pub fn parse(content: &str, provider: &str) -> Result<Self, ValidationError> {
        let body = strip_code_fence(content);
        let mut document: RecommendationDocument = serde_json::from_str(body)
            .map_err(|e| ValidationError::new(provider, format!("document is not valid JSON: {e}")))?;

        let mut seen = BTreeSet::new();
        for section in &document.sections {
            if !seen.insert(section.kind) {
                return Err(ValidationError::new(
                    provider,
                    format!("duplicate section: {}", section.kind),
                ));
            }
        }
        document.sections.sort_by_key(|s| s.kind);

        if document.is_empty() {
            return Err(ValidationError::new(provider, "document has no usable sections"));
        }
        Ok(document)
    }

    /// Serialize to compact JSON
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Get a section
    #[inline]
    #[must_use]
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// True when no section carries content
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(Section::is_blank)
    }

    /// All recommendation bullets in document order
    pub fn recommendations(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|s| s.recommendations.iter().map(String::as_str))
    }

    /// All KPI targets with their owning section
    pub fn kpi_targets(&self) -> impl Iterator<Item = (SectionKind, &KpiTarget)> {
        self.sections
            .iter()
            .flat_map(|s| s.kpi_targets.iter().map(move |t| (s.kind, t)))
    }

    /// Flattened text used for scoring
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(512);
        out.push_str(&self.title);
        for section in &self.sections {
            out.push('\n');
            out.push_str(section.kind.heading());
            out.push('\n');
            out.push_str(&section.summary);
            for item in &section.recommendations {
                out.push_str("\n- ");
                out.push_str(item);
            }
            for target in &section.kpi_targets {
                out.push_str("\n* ");
                out.push_str(&target.kpi);
                out.push_str(": ");
                out.push_str(&target.target);
            }
        }
        out
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecommendationDocument {
        RecommendationDocument::new("Plan")
            .with_section(
                Section::new(SectionKind::MeasurementFramework)
                    .with_summary("Track conversion")
                    .target("conversion rate", "+10%"),
            )
            .with_section(
                Section::new(SectionKind::StrategicPriorities)
                    .with_summary("Grow")
                    .recommend("Launch loyalty program"),
            )
            .referencing([BucketName::Analytics])
    }

    #[test]
    fn sections_are_kept_in_document_order() {
        let doc = sample();
        assert_eq!(doc.sections[0].kind, SectionKind::StrategicPriorities);
        assert_eq!(doc.sections[1].kind, SectionKind::MeasurementFramework);
    }

    #[test]
    fn parse_accepts_fenced_json() {
        let raw = format!("```json\n{}\n```", sample().to_json());
        let parsed = RecommendationDocument::parse(&raw, "offline").unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn parse_rejects_non_json() {
        let err = RecommendationDocument::parse("Here is your plan!", "openai").unwrap_err();
        assert_eq!(err.provider, "openai");
    }

    #[test]
    fn parse_rejects_empty_document() {
        let err = RecommendationDocument::parse(r#"{"title":"x","sections":[]}"#, "offline").unwrap_err();
        assert!(err.reason.contains("no usable sections"));
    }

    #[test]
    fn parse_rejects_duplicate_sections() {
        let raw = r#"{"title":"x","sections":[
            {"kind":"experimentation_plan","summary":"a"},
            {"kind":"experimentation_plan","summary":"b"}]}"#;
        assert!(RecommendationDocument::parse(raw, "offline").is_err());
    }

    #[test]
    fn text_flattens_all_parts() {
        let text = sample().text();
        assert!(text.contains("Launch loyalty program"));
        assert!(text.contains("conversion rate: +10%"));
    }
}
