//! Deterministic in-process backend
//!
//! Produces documents from the organization metadata without any network
//! access. Later passes produce richer documents, and consistency requests
//! harmonize the prior document. Failures can be scripted per call for
//! exercising retry and fallback paths.

use crate::backend::{
    AttemptError, GenerationBackend, GenerationOutput, GenerationRequest, PromptKind, TokenUsage,
};
use async_trait::async_trait;
use osa_types::{MaturityPhase, OrgMeta, RecommendationDocument, Section, SectionKind, ValidationError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const PROVIDER: &str = "offline";

/// Scripted outcome of one call
#[derive(Debug, Clone, PartialEq)]
pub enum Scripted {
    /// Return a generated document
    Succeed,
    /// Fail with an HTTP status
    Status(u16),
    /// Fail with a transport error
    Network,
    /// Fail with a transport timeout
    Timeout,
    /// Sleep, then succeed
    Delay(Duration),
    /// Fail with a response-shape error
    Invalid,
    /// Succeed with text that is not a document
    Garbage,
}

/// Deterministic backend with scriptable failures
#[derive(Debug)]
pub struct OfflineBackend {
    model: String,
    script: Mutex<VecDeque<Scripted>>,
    otherwise: Scripted,
    calls: AtomicUsize,
    kinds: Mutex<Vec<PromptKind>>,
}

impl OfflineBackend {
    /// Backend that always succeeds
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: "offline-v1".to_string(),
            script: Mutex::new(VecDeque::new()),
            otherwise: Scripted::Succeed,
            calls: AtomicUsize::new(0),
            kinds: Mutex::new(Vec::new()),
        }
    }

    /// Backend that fails every call the same way
    #[must_use]
    pub fn failing(outcome: Scripted) -> Self {
        Self::new().otherwise(outcome)
    }

    /// With model name
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Outcomes for the next calls, in order
    #[must_use]
    pub fn with_script<I>(self, outcomes: I) -> Self
    where
        I: IntoIterator<Item = Scripted>,
    {
        self.script.lock().extend(outcomes);
        self
    }

    /// Outcome once the script is exhausted
    #[inline]
    #[must_use]
    pub fn otherwise(mut self, outcome: Scripted) -> Self {
        self.otherwise = outcome;
        self
    }

    /// Number of `complete` calls so far
    #[inline]
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Request kinds seen, in call order
    #[must_use]
    pub fn kinds(&self) -> Vec<PromptKind> {
        self.kinds.lock().clone()
    }

    fn next_outcome(&self) -> Scripted {
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.otherwise.clone())
    }
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for OfflineBackend {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationOutput, AttemptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.kinds.lock().push(request.kind);

        match self.next_outcome() {
            Scripted::Succeed => {}
            Scripted::Delay(delay) => tokio::time::sleep(delay).await,
            Scripted::Status(status) => {
                return Err(AttemptError::Status {
                    status,
                    body: "scripted failure".to_string(),
                })
            }
            Scripted::Network => return Err(AttemptError::Network("connection reset".to_string())),
            Scripted::Timeout => return Err(AttemptError::Timeout),
            Scripted::Invalid => {
                return Err(ValidationError::new(PROVIDER, "response has no choices").into())
            }
            Scripted::Garbage => {
                return Ok(output(
                    request,
                    "I'm sorry, I can't produce a plan right now.".to_string(),
                ))
            }
        }

        let document = match (request.kind, &request.prior_document) {
            (PromptKind::Consistency, Some(prior)) => harmonize(prior),
            _ => compose(request),
        };
        Ok(output(request, document.to_json()))
    }
}

fn output(request: &GenerationRequest, content: String) -> GenerationOutput {
    let count = |s: &str| u32::try_from(s.split_whitespace().count()).unwrap_or(u32::MAX);
    GenerationOutput {
        usage: TokenUsage {
            prompt_tokens: count(&request.system).saturating_add(count(&request.prompt)),
            completion_tokens: count(&content),
        },
        content,
        finish_reason: "stop".to_string(),
    }
}

fn horizon(phase: MaturityPhase) -> &'static str {
    match phase {
        MaturityPhase::Seed => "90 days",
        MaturityPhase::Growth => "6 months",
        MaturityPhase::Scale => "12 months",
        MaturityPhase::Advanced => "18 months",
    }
}

fn phase_theme(phase: MaturityPhase) -> &'static str {
    match phase {
        MaturityPhase::Seed => "build foundational tracking and a baseline content calendar",
        MaturityPhase::Growth => "expand proven programs and segment audiences",
        MaturityPhase::Scale => "standardize experimentation across channels and automate reporting",
        MaturityPhase::Advanced => "apply predictive models and real-time journey orchestration",
    }
}

/// Build a document for an initial or refinement request
///
/// Richness grows with the pass index, capped at the third pass.
fn compose(request: &GenerationRequest) -> RecommendationDocument {
    let org = &request.org;
    let level = request.pass_index.clamp(1, 3);
    let phase = org.maturity_phase;
    let goals: Vec<&str> = if org.primary_goals.is_empty() {
        vec!["grow qualified demand"]
    } else {
        org.primary_goals.iter().map(String::as_str).collect()
    };
    let kpis: Vec<&str> = if org.primary_kpis.is_empty() {
        vec!["conversion rate", "engagement rate"]
    } else {
        org.primary_kpis.iter().map(String::as_str).collect()
    };

    let mut strategic = Section::new(SectionKind::StrategicPriorities).with_summary(format!(
        "{} ({}, {} phase) should {} over the next {}.",
        org.org_name,
        org.industry,
        phase,
        phase_theme(phase),
        horizon(phase)
    ));
    for goal in goals.iter().take(3) {
        strategic = strategic.recommend(format!(
            "Prioritize {goal} for {} over the next {}",
            org.org_name,
            horizon(phase)
        ));
    }

    let mut content = Section::new(SectionKind::ContentRecommendations)
        .with_summary(format!("Content for {} audiences in {}.", org.industry, market(org)));
    content = if level == 1 {
        content.recommend(format!("Develop content around core {} topics", org.industry))
    } else {
        content
            .recommend(format!(
                "Launch 3 {} pillar pages within 30 days, based on your data about top-performing topics",
                org.industry
            ))
            .recommend(format!("Refresh the 10 lowest-converting pages to lift {}", kpis[0]))
    };

    let mut experiments = Section::new(SectionKind::ExperimentationPlan)
        .with_summary(format!("Experiments sized for the {phase} phase."));
    if level == 1 || org.platform_stack.is_empty() {
        experiments = experiments.recommend("Test homepage messaging against the current baseline");
    } else {
        for tool in &org.platform_stack {
            experiments = experiments.recommend(format!(
                "Run 2 A/B tests per month in {tool} targeting {}",
                kpis[0]
            ));
        }
    }

    let mut measurement = Section::new(SectionKind::MeasurementFramework)
        .with_summary(format!("Track {} KPIs with a monthly review.", kpis.len()));
    let tracked = if level == 1 { 1 } else { kpis.len() };
    for (i, kpi) in kpis.iter().take(tracked).enumerate() {
        measurement = measurement.target(*kpi, format!("+{}% within 2 quarters", 5 * (i + 1)));
    }
    if level >= 3 {
        measurement = measurement
            .recommend("Review a weekly dashboard from your analytics and set quarterly baselines");
    }

    let referenced: Vec<_> = if level == 1 {
        request.buckets.iter().copied().take(2).collect()
    } else {
        request.buckets.clone()
    };
    let prior_refs = request
        .prior_document
        .as_ref()
        .map(|d| d.referenced_buckets.iter().copied().collect::<Vec<_>>())
        .unwrap_or_default();

    RecommendationDocument::new(format!("{} Strategy Recommendations", org.org_name))
        .with_section(strategic)
        .with_section(content)
        .with_section(experiments)
        .with_section(measurement)
        .referencing(referenced)
        .referencing(prior_refs)
}

/// Give every KPI the first target stated for it
fn harmonize(prior: &RecommendationDocument) -> RecommendationDocument {
    let mut canonical: BTreeMap<String, String> = BTreeMap::new();
    for (_, target) in prior.kpi_targets() {
        canonical
            .entry(target.kpi.trim().to_lowercase())
            .or_insert_with(|| target.target.clone());
    }

    let mut document = prior.clone();
    for section in &mut document.sections {
        for target in &mut section.kpi_targets {
            if let Some(value) = canonical.get(&target.kpi.trim().to_lowercase()) {
                target.target.clone_from(value);
            }
        }
    }
    document
}

fn market(org: &OrgMeta) -> &str {
    if org.region.trim().is_empty() {
        "its core market"
    } else {
        &org.region
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osa_types::BucketName;

    fn request(kind: PromptKind, pass: u32) -> GenerationRequest {
        let org = OrgMeta::new("Acme", "Retail")
            .with_phase(MaturityPhase::Growth)
            .with_kpis(["conversion rate", "average order value"])
            .with_stack(["Optimizely"]);
        GenerationRequest::new(kind, org, pass).with_buckets(BucketName::ALL.to_vec())
    }

    #[tokio::test]
    async fn output_parses_as_document() {
        let backend = OfflineBackend::new();
        let out = backend.complete(&request(PromptKind::Initial, 1)).await.unwrap();
        let doc = RecommendationDocument::parse(&out.content, "offline").unwrap();
        assert_eq!(doc.sections.len(), 4);
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn later_passes_are_richer() {
        let first = compose(&request(PromptKind::Initial, 1));
        let second = compose(&request(PromptKind::Refinement, 2));
        assert!(second.kpi_targets().count() > first.kpi_targets().count());
        assert!(second.referenced_buckets.len() > first.referenced_buckets.len());
        assert!(second.text().contains("Optimizely"));
    }

    #[test]
    fn composition_is_deterministic() {
        let req = request(PromptKind::Refinement, 3);
        assert_eq!(compose(&req), compose(&req));
    }

    #[test]
    fn harmonize_unifies_targets() {
        let doc = RecommendationDocument::new("x")
            .with_section(Section::new(SectionKind::StrategicPriorities).target("Conversion Rate", "+5%"))
            .with_section(Section::new(SectionKind::MeasurementFramework).target("conversion rate", "+20%"));
        let fixed = harmonize(&doc);
        let targets: Vec<_> = fixed.kpi_targets().map(|(_, t)| t.target.as_str()).collect();
        assert_eq!(targets, vec!["+5%", "+5%"]);
    }

    #[tokio::test]
    async fn script_runs_in_order_then_defaults() {
        let backend = OfflineBackend::new().with_script([Scripted::Status(503), Scripted::Network]);
        let req = request(PromptKind::Initial, 1);
        assert!(matches!(
            backend.complete(&req).await,
            Err(AttemptError::Status { status: 503, .. })
        ));
        assert!(matches!(backend.complete(&req).await, Err(AttemptError::Network(_))));
        assert!(backend.complete(&req).await.is_ok());
        assert_eq!(backend.kinds(), vec![PromptKind::Initial; 3]);
    }
}
