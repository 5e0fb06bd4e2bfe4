//! Quality-gated refinement loop
//!
//! One run walks the [`LoopState`] machine: an initial pass over all
//! available context, refinement passes conditioned on the prior document
//! and a selected context subset until the threshold or the pass budget is
//! reached, then exactly one consistency pass. Any backend or validation
//! failure, and cancellation, ends in the fallback document.

use crate::consistency::find_contradictions;
use crate::fallback::fallback_document;
use crate::prompt;
use crate::state::{LoopState, StateTrace};
use chrono::Utc;
use osa_backend::{GenerateOptions, Gateway, GenerationRequest, PromptKind};
use osa_context::select_context_for_next_pass;
use osa_quality::QualityScorer;
use osa_types::{
    BucketName, Confidence, ConsistencyRecord, ContextBuckets, GenerationError, GenerationPass,
    OrchestratorConfig, OrgMeta, PassKind, PipelineError, QualityScore, RecommendationDocument,
    RunCancellation, RunId, RunResult, SharedSink, TelemetryEvent,
};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Drives generation, scoring, refinement and the consistency pass
#[derive(Clone)]
pub struct Orchestrator {
    gateway: Gateway,
    scorer: QualityScorer,
    options: GenerateOptions,
    sink: SharedSink,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("gateway", &self.gateway)
            .field("scorer", &self.scorer)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Mutable bookkeeping of one run
struct LoopRun {
    run_id: RunId,
    trace: StateTrace,
    passes: Vec<GenerationPass>,
    consistency: Option<ConsistencyRecord>,
}

/// A document returned by the backend and parsed
struct Generated {
    document: RecommendationDocument,
    latency_ms: u64,
}

impl Orchestrator {
    /// Create orchestrator over a gateway, reporting to `sink`
    #[must_use]
    pub fn new(gateway: Gateway, sink: SharedSink) -> Self {
        Self {
            gateway,
            scorer: QualityScorer::new(),
            options: GenerateOptions::default(),
            sink,
        }
    }

    /// With scorer
    #[inline]
    #[must_use]
    pub fn with_scorer(mut self, scorer: QualityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// With sampling options
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Underlying gateway
    #[inline]
    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Execute one run over pre-built context
    ///
    /// Never fails: an unrecoverable error yields the fallback document with
    /// `success = false`, low confidence and the error recorded.
    pub async fn run(
        &self,
        org: &OrgMeta,
        buckets: &ContextBuckets,
        config: &OrchestratorConfig,
        cancel: &RunCancellation,
    ) -> RunResult {
        let started_at = Utc::now();
        let mut run = LoopRun {
            run_id: RunId::new(),
            trace: StateTrace::new(),
            passes: Vec::new(),
            consistency: None,
        };
        let gateway = self.gateway.clone().with_timeout(config.backend_timeout());

        info!(
            run_id = %run.run_id,
            org = %org.org_name,
            scenario = %config.scenario,
            max_passes = config.max_passes,
            threshold = config.quality_threshold,
            buckets = buckets.len(),
            provider = gateway.provider(),
            "run started"
        );

        let (document, success, errors) =
            match self.drive(&gateway, &mut run, org, buckets, config, cancel).await {
                Ok(document) => (document, true, Vec::new()),
                Err(failure) => {
                    warn!(
                        run_id = %run.run_id,
                        state = %run.trace.current(),
                        error = %failure,
                        "run failed, using fallback document"
                    );
                    self.sink.record(TelemetryEvent::FallbackUsed {
                        run_id: run.run_id.to_string(),
                        reason: failure.to_string(),
                    });
                    enter_fallback(&mut run.trace);
                    (fallback_document(org, buckets), false, vec![failure])
                }
            };

        let mut result = RunResult {
            run_id: run.run_id,
            scenario: config.scenario,
            document,
            passes: run.passes,
            consistency: run.consistency,
            confidence: Confidence::Low,
            success,
            errors,
            trace: run.trace.names(),
            started_at,
            finished_at: Utc::now(),
        };
        if success {
            result.confidence =
                Confidence::assess(result.final_overall().unwrap_or(0.0), result.passes.len());
        }

        info!(
            run_id = %result.run_id,
            passes = result.passes.len(),
            confidence = %result.confidence,
            success,
            "run finished"
        );
        self.sink.record(TelemetryEvent::RunFinished {
            run_id: result.run_id.to_string(),
            passes: result.passes.len(),
            confidence: result.confidence,
            success,
            duration_ms: result.duration_ms(),
        });
        result
    }

    async fn drive(
        &self,
        gateway: &Gateway,
        run: &mut LoopRun,
        org: &OrgMeta,
        buckets: &ContextBuckets,
        config: &OrchestratorConfig,
        cancel: &RunCancellation,
    ) -> Result<RecommendationDocument, PipelineError> {
        let max_passes = config.max_passes.max(1);
        let all = buckets.names();

        run.trace.advance(LoopState::Generate)?;
        let request = GenerationRequest::new(PromptKind::Initial, org.clone(), 1)
            .with_prompt(prompt::generation_system(), prompt::initial_prompt(org, buckets))
            .with_buckets(all.clone())
            .with_options(self.options);
        let generated = self.generate(gateway, &request, cancel, LoopState::Generate).await?;

        run.trace.advance(LoopState::Score)?;
        let mut index = 1;
        let mut document = generated.document.clone();
        let mut score = self.record_pass(run, org, gateway, index, PassKind::Initial, generated, all.clone());
        check_cancel(cancel, LoopState::Score)?;

        while score.overall() < config.quality_threshold && index < max_passes {
            run.trace.advance(LoopState::Refine)?;
            let subset =
                select_context_for_next_pass(score.missing_areas(), &score.lowest_dimensions(), buckets);
            index += 1;
            debug!(
                run_id = %run.run_id,
                pass = index,
                overall = score.overall(),
                subset = ?subset.names(),
                "refining"
            );

            run.trace.advance(LoopState::Generate)?;
            let request = GenerationRequest::new(PromptKind::Refinement, org.clone(), index)
                .with_prompt(
                    prompt::generation_system(),
                    prompt::refinement_prompt(org, &document, &score, &subset),
                )
                .with_buckets(subset.names())
                .with_prior(document.clone())
                .with_options(self.options);
            let generated = self.generate(gateway, &request, cancel, LoopState::Generate).await?;

            run.trace.advance(LoopState::Score)?;
            document = generated.document.clone();
            score = self.record_pass(run, org, gateway, index, PassKind::Refinement, generated, subset.names());
            check_cancel(cancel, LoopState::Score)?;
        }

        run.trace.advance(LoopState::ConsistencyCheck)?;
        let contradictions = find_contradictions(&document);
        let request = GenerationRequest::new(PromptKind::Consistency, org.clone(), index)
            .with_prompt(
                prompt::consistency_system(),
                prompt::consistency_prompt(&document, &contradictions),
            )
            .with_buckets(all.clone())
            .with_prior(document)
            .with_contradictions(contradictions.clone())
            .with_options(self.options);
        let generated = self
            .generate(gateway, &request, cancel, LoopState::ConsistencyCheck)
            .await?;

        let harmonized_score = self.scorer.score(&generated.document, org, &all);
        self.sink.record(TelemetryEvent::ConsistencyChecked {
            run_id: run.run_id.to_string(),
            contradictions: contradictions.len(),
            overall: harmonized_score.overall(),
        });
        run.consistency = Some(ConsistencyRecord {
            contradictions,
            score: harmonized_score,
            backend: backend_label(gateway),
            latency_ms: generated.latency_ms,
            timestamp: Utc::now(),
        });

        run.trace.advance(LoopState::Done)?;
        Ok(generated.document)
    }

    async fn generate(
        &self,
        gateway: &Gateway,
        request: &GenerationRequest,
        cancel: &RunCancellation,
        stage: LoopState,
    ) -> Result<Generated, PipelineError> {
        let started = tokio::time::Instant::now();
        let output = gateway
            .generate(request, cancel)
            .await
            .map_err(|e| stage_error(e, stage))?;
        let latency_ms = millis(started.elapsed());
        let document = RecommendationDocument::parse(&output.content, gateway.provider())
            .map_err(PipelineError::Validation)?;
        Ok(Generated { document, latency_ms })
    }

    #[allow(clippy::too_many_arguments)]
    fn record_pass(
        &self,
        run: &mut LoopRun,
        org: &OrgMeta,
        gateway: &Gateway,
        index: u32,
        kind: PassKind,
        generated: Generated,
        buckets_used: Vec<BucketName>,
    ) -> QualityScore {
        let score = self.scorer.score(&generated.document, org, &buckets_used);
        let backend = backend_label(gateway);
        self.sink.record(TelemetryEvent::PassCompleted {
            run_id: run.run_id.to_string(),
            index,
            kind,
            overall: score.overall(),
            dimensions: *score.dimensions(),
            backend: backend.clone(),
            latency_ms: generated.latency_ms,
        });
        run.passes.push(GenerationPass {
            index,
            kind,
            document: generated.document,
            score: score.clone(),
            buckets_used,
            backend,
            latency_ms: generated.latency_ms,
            timestamp: Utc::now(),
        });
        score
    }
}

fn check_cancel(cancel: &RunCancellation, stage: LoopState) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled {
            stage: stage.to_string(),
        });
    }
    Ok(())
}

fn stage_error(error: GenerationError, stage: LoopState) -> PipelineError {
    if error.is_cancelled() {
        PipelineError::Cancelled {
            stage: stage.to_string(),
        }
    } else {
        error.into()
    }
}

fn enter_fallback(trace: &mut StateTrace) {
    for state in [LoopState::Failed, LoopState::Fallback, LoopState::Done] {
        if let Err(e) = trace.advance(state) {
            error!(error = %e, "fallback transition rejected");
        }
    }
}

fn backend_label(gateway: &Gateway) -> String {
    format!("{}/{}", gateway.provider(), gateway.model())
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
