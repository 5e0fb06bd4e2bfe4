//! Network-free fallback document
//!
//! Used when the backend cannot produce a document. Built only from the
//! organization metadata and the names of the available buckets, so it is
//! deterministic and always non-empty.

use osa_types::{
    BucketName, ContextBuckets, MaturityPhase, OrgMeta, RecommendationDocument, Section,
    SectionKind,
};

fn phase_focus(phase: MaturityPhase) -> (&'static str, &'static str) {
    match phase {
        MaturityPhase::Seed => ("establish baseline tracking", "monthly"),
        MaturityPhase::Growth => ("scale the channels that already convert", "bi-weekly"),
        MaturityPhase::Scale => ("standardize experimentation and reporting", "weekly"),
        MaturityPhase::Advanced => ("optimize journeys with predictive signals", "weekly"),
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value.trim()
    }
}

/// Build the fallback document for `org`
#[must_use]
pub fn fallback_document(org: &OrgMeta, buckets: &ContextBuckets) -> RecommendationDocument {
    let name = or_default(&org.org_name, "The organization");
    let industry = or_default(&org.industry, "its industry");
    let (focus, cadence) = phase_focus(org.maturity_phase);

    let mut strategic = Section::new(SectionKind::StrategicPriorities).with_summary(format!(
        "{name} ({industry}, {} phase) should {focus}.",
        org.maturity_phase
    ));
    if org.primary_goals.is_empty() {
        strategic = strategic.recommend(format!("Define two measurable goals for {name} this quarter"));
    }
    for goal in org.primary_goals.iter().take(3) {
        strategic = strategic.recommend(format!("Prioritize {goal} with a named owner and a quarterly milestone"));
    }

    let content = Section::new(SectionKind::ContentRecommendations)
        .with_summary(format!("Focus content on the questions {industry} buyers ask most."))
        .recommend("Audit existing pages and retire content with no traffic in 90 days")
        .recommend("Publish one in-depth guide per month on the highest-intent topic");

    let mut experiments = Section::new(SectionKind::ExperimentationPlan)
        .with_summary("Start with low-cost experiments on high-traffic pages.".to_string());
    match org.platform_stack.iter().next() {
        Some(tool) => {
            experiments = experiments.recommend(format!("Run one A/B test per month in {tool}"));
        }
        None => {
            experiments = experiments.recommend("Test one headline variant per month on the homepage");
        }
    }

    let mut measurement = Section::new(SectionKind::MeasurementFramework)
        .with_summary(format!("Review KPIs on a {cadence} cadence."))
        .recommend(format!("Set up a {cadence} KPI review with baseline values"));
    for kpi in org.primary_kpis.iter().take(3) {
        measurement = measurement.target(kpi.as_str(), "baseline this quarter, then +5%");
    }

    let referenced: Vec<BucketName> = buckets.names();
    RecommendationDocument::new(format!("{name} Strategy Recommendations (baseline)"))
        .with_section(strategic)
        .with_section(content)
        .with_section(experiments)
        .with_section(measurement)
        .referencing(referenced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_org_still_yields_content() {
        let doc = fallback_document(&OrgMeta::new("", ""), &ContextBuckets::empty());
        assert!(!doc.is_empty());
        assert_eq!(doc.sections.len(), 4);
        assert!(doc.title.starts_with("The organization"));
    }

    #[test]
    fn deterministic() {
        let org = OrgMeta::new("Acme", "Retail")
            .with_goals(["grow repeat purchases"])
            .with_kpis(["repeat purchase rate"])
            .with_stack(["Braze"]);
        let a = fallback_document(&org, &ContextBuckets::empty());
        assert_eq!(a, fallback_document(&org, &ContextBuckets::empty()));
        assert!(a.text().contains("Braze"));
        assert_eq!(a.kpi_targets().count(), 1);
    }
}
