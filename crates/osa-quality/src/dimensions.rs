//! The five dimension heuristics
//!
//! Each function reads a [`ScoringInput`] and returns a raw value; the scorer
//! clamps into `[0, 5]`. Nothing here consults a clock, a random source or a
//! hash-ordered collection.

use crate::analysis::ContentAnalysis;
use once_cell::sync::Lazy;
use osa_types::{MaturityPhase, OrgMeta, RecommendationDocument, SectionKind};
use regex::Regex;

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?%?").expect("valid regex"));

static TIMELINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d+\s*(?:days?|weeks?|months?|quarters?)|q[1-4]|within|by end of|next \d+)\b")
        .expect("valid regex")
});

const ACTION_VERBS: &[&str] = &[
    "launch", "run", "test", "build", "create", "refresh", "publish", "prioritize", "develop",
    "implement", "review", "track", "measure", "set", "optimize", "introduce", "expand", "audit",
    "migrate", "consolidate",
];

const CADENCE_WORDS: &[&str] = &["weekly", "monthly", "quarterly", "dashboard", "baseline"];

/// Pre-computed view of the document being scored
#[derive(Debug)]
pub struct ScoringInput<'a> {
    /// Document
    pub document: &'a RecommendationDocument,
    /// Organization
    pub org: &'a OrgMeta,
    /// Lowercased flattened text
    pub text: String,
    /// Indicator phrases
    pub analysis: ContentAnalysis,
}

impl<'a> ScoringInput<'a> {
    /// Prepare input for scoring
    #[must_use]
    pub fn new(document: &'a RecommendationDocument, org: &'a OrgMeta) -> Self {
        let text = document.text().to_lowercase();
        let analysis = crate::analysis::analyze_content(&text);
        Self {
            document,
            org,
            text,
            analysis,
        }
    }

    fn mentions(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        !needle.is_empty() && self.text.contains(&needle)
    }

    fn mention_ratio(&self, items: &[&str]) -> Option<f64> {
        if items.is_empty() {
            return None;
        }
        let hits = items.iter().filter(|i| self.mentions(i)).count();
        Some(ratio(hits, items.len()))
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[allow(clippy::cast_precision_loss)]
fn capped(count: usize, step: f64, cap: f64) -> f64 {
    (count as f64 * step).min(cap)
}

/// Concrete, organization-specific content
#[must_use]
pub fn specificity(input: &ScoringInput<'_>) -> f64 {
    let org = input.org;
    let mut score = 1.0;

    score += capped(NUMBER.find_iter(&input.text).count(), 0.25, 1.5);
    if input.mentions(&org.org_name) {
        score += 0.75;
    }
    if input.mentions(&org.industry) {
        score += 0.5;
    }
    if input.mentions(&org.region) {
        score += 0.25;
    }
    let goals: Vec<&str> = org.primary_goals.iter().map(String::as_str).collect();
    score += input.mention_ratio(&goals).unwrap_or(0.0) * 0.75;

    score += capped(input.analysis.data_phrases.len(), 0.25, 0.5);
    #[allow(clippy::cast_precision_loss)]
    let generic_penalty = input.analysis.generic_phrases.len() as f64 * 0.5;
    score - generic_penalty
}

/// Fit with the declared platform stack
///
/// Neutral 3.0 when no stack is declared.
#[must_use]
pub fn stack_alignment(input: &ScoringInput<'_>) -> f64 {
    let stack: Vec<&str> = input.org.platform_stack.iter().map(String::as_str).collect();
    input.mention_ratio(&stack).map_or(3.0, |r| 5.0 * r)
}

fn phase_keywords(phase: MaturityPhase) -> &'static [&'static str] {
    match phase {
        MaturityPhase::Seed => &["foundation", "baseline", "establish", "basic", "first"],
        MaturityPhase::Growth => &["expand", "segment", "proven", "grow", "scale winning"],
        MaturityPhase::Scale => &["standardize", "automate", "across channels", "operationalize", "center of excellence"],
        MaturityPhase::Advanced => &["predictive", "real-time", "machine learning", "orchestration", "ai-driven"],
    }
}

/// Fit with the organization's maturity phase
///
/// Rewards the phase's own vocabulary, tolerates adjacent phases and
/// penalizes vocabulary two or more phases away.
#[must_use]
pub fn maturity_fit(input: &ScoringInput<'_>) -> f64 {
    let phase = input.org.maturity_phase;
    let mut score = 2.0;

    let own = phase_keywords(phase).iter().filter(|k| input.mentions(k)).count();
    score += capped(own, 0.75, 2.25);
    if input.mentions(phase.as_str()) {
        score += 0.75;
    }

    for other in MaturityPhase::ALL {
        if other == phase {
            continue;
        }
        let hits = phase_keywords(other).iter().filter(|k| input.mentions(k)).count();
        match phase.distance(other) {
            1 => score += capped(hits, 0.25, 0.5),
            _ => score -= capped(hits, 1.0, 2.0),
        }
    }
    score
}

/// KPIs, targets and measurement cadence
#[must_use]
pub fn measurement_rigor(input: &ScoringInput<'_>) -> f64 {
    let doc = input.document;
    let targets = doc.kpi_targets().count();
    let mut score = 0.5;

    let measurement = doc.section(SectionKind::MeasurementFramework);
    if measurement.is_some_and(|s| !s.is_blank() || !s.kpi_targets.is_empty()) {
        score += 1.5;
    }
    score += capped(targets, 0.5, 1.5);

    let kpis: Vec<&str> = input.org.primary_kpis.iter().map(String::as_str).collect();
    score += match input.mention_ratio(&kpis) {
        Some(r) => 1.0 * r,
        None if targets > 0 => 0.5,
        None => 0.0,
    };

    if CADENCE_WORDS.iter().any(|w| input.mentions(w)) {
        score += 0.5;
    }
    score
}

/// Concrete next steps
#[must_use]
pub fn actionability(input: &ScoringInput<'_>) -> f64 {
    let doc = input.document;
    let recommendations: Vec<String> = doc.recommendations().map(str::to_lowercase).collect();
    let mut score = 0.5;

    score += capped(recommendations.len(), 0.3, 2.0);

    let imperative = recommendations
        .iter()
        .filter(|r| {
            r.split_whitespace()
                .next()
                .is_some_and(|w| ACTION_VERBS.contains(&w))
        })
        .count();
    score += ratio(imperative, recommendations.len()) * 1.5;

    if TIMELINE.is_match(&input.text) {
        score += 0.5;
    }
    if !doc.sections.is_empty() && doc.sections.iter().all(|s| !s.recommendations.is_empty()) {
        score += 0.5;
    }
    score
}
