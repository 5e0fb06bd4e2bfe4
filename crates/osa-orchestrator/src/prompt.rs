//! Prompt construction
//!
//! Prompts carry the organization metadata and the selected context as JSON
//! so that backends can ground every recommendation. The response contract
//! (a JSON document with the four sections) is stated in the system prompt.

use osa_types::{ContextBuckets, OrgMeta, QualityScore, RecommendationDocument, SectionKind};
use std::fmt::Write as _;

const RESPONSE_CONTRACT: &str = "Respond with a single JSON object with fields \
`title`, `sections` and `referenced_buckets`. Each section has `kind` (one of \
strategic_priorities, content_recommendations, experimentation_plan, \
measurement_framework), `summary`, `recommendations` (list of strings) and \
`kpi_targets` (list of {kpi, target}). `referenced_buckets` lists the context \
buckets (content, analytics, experience, strategy) your recommendations draw on.";

/// System prompt for initial and refinement passes
#[must_use]
pub fn generation_system() -> String {
    format!(
        "You are a digital strategy advisor. Produce specific, measurable \
         recommendations grounded in the supplied organization context. Use \
         the organization's declared platform stack and match the advice to \
         its maturity phase. {RESPONSE_CONTRACT}"
    )
}

/// System prompt for the consistency pass
#[must_use]
pub fn consistency_system() -> String {
    format!(
        "You are reviewing a strategy document for internal consistency. Keep \
         its content, resolve conflicting KPI targets so each KPI has one \
         target, and return the harmonized document. {RESPONSE_CONTRACT}"
    )
}

fn org_block(org: &OrgMeta) -> String {
    serde_json::to_string_pretty(org).unwrap_or_else(|_| org.org_name.clone())
}

fn context_block(buckets: &ContextBuckets) -> String {
    if buckets.is_empty() {
        return "No context data is available; rely on the organization profile.".to_string();
    }
    let mut out = String::new();
    for (name, bucket) in buckets.iter() {
        let payload = serde_json::to_string_pretty(&bucket.payload).unwrap_or_default();
        let _ = writeln!(out, "### {name} ({:?})\n{payload}", bucket.origin);
    }
    out
}

/// User prompt for the first pass
#[must_use]
pub fn initial_prompt(org: &OrgMeta, buckets: &ContextBuckets) -> String {
    let sections: Vec<&str> = SectionKind::ALL.iter().map(SectionKind::heading).collect();
    format!(
        "Organization:\n{}\n\nContext:\n{}\n\nWrite a recommendation document with \
         these sections: {}.",
        org_block(org),
        context_block(buckets),
        sections.join(", ")
    )
}

/// User prompt for a refinement pass
///
/// Carries the prior document, what the scorer flagged, and only the context
/// subset selected for this pass.
#[must_use]
pub fn refinement_prompt(
    org: &OrgMeta,
    prior: &RecommendationDocument,
    score: &QualityScore,
    subset: &ContextBuckets,
) -> String {
    let mut feedback = String::new();
    for issue in score.issues() {
        let _ = writeln!(feedback, "- issue: {issue}");
    }
    for rec in score.recommendations() {
        let _ = writeln!(feedback, "- improve: {rec}");
    }
    if feedback.is_empty() {
        feedback.push_str("- no specific issues; sharpen targets and next steps\n");
    }

    format!(
        "Organization:\n{}\n\nPrevious document (overall {:.2}/5):\n{}\n\nReviewer \
         feedback:\n{}\nAdditional context:\n{}\n\nRevise the document to address \
         the feedback. Keep what already works.",
        org_block(org),
        score.overall(),
        prior.to_json(),
        feedback,
        context_block(subset)
    )
}

/// User prompt for the consistency pass
#[must_use]
pub fn consistency_prompt(document: &RecommendationDocument, contradictions: &[String]) -> String {
    let findings = if contradictions.is_empty() {
        "No conflicting KPI targets were detected; check tone and overlap only.".to_string()
    } else {
        contradictions
            .iter()
            .map(|c| format!("- {c}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "Document:\n{}\n\nDetected contradictions:\n{findings}\n\nReturn the \
         harmonized document.",
        document.to_json()
    )
}
