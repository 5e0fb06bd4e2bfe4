//! Pipeline entry points
//!
//! [`Pipeline::run_pipeline`] builds the context and runs the loop.
//! [`Pipeline::route`] puts the rollout safeguard in front: treatment runs
//! the configured refinement loop, control runs the single-pass baseline,
//! and enrolled outcomes are recorded against the test.

use crate::orchestrator::Orchestrator;
use crate::settings::PipelineSettings;
use osa_backend::{BackendCache, GenerateOptions, Gateway};
use osa_context::{ConnectorRegistry, ContextBuilder};
use osa_rollout::{AbAssignment, MetricSample, RolloutSafeguard, SubjectContext};
use osa_types::{
    ConfigError, OrchestratorConfig, OrgMeta, RunCancellation, RunResult, Scenario, SharedSink,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Test id used when none is configured
pub const DEFAULT_TEST_ID: &str = "osa-refinement";

/// Caller routed through the rollout safeguard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Stable subject identifier (hash input)
    pub subject_id: String,
    /// Optional group matched against include/exclude lists
    pub subject_group: Option<String>,
    /// Organization to generate for
    pub org: OrgMeta,
    /// Scenario for the treatment arm; the configured one when `None`
    pub scenario: Option<Scenario>,
}

impl RouteRequest {
    /// Create request for a subject
    #[must_use]
    pub fn new(subject_id: impl Into<String>, org: OrgMeta) -> Self {
        Self {
            subject_id: subject_id.into(),
            subject_group: None,
            org,
            scenario: None,
        }
    }

    /// With subject group
    #[inline]
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.subject_group = Some(group.into());
        self
    }

    /// With treatment scenario
    #[inline]
    #[must_use]
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = Some(scenario);
        self
    }
}

/// Outcome of a routed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedRun {
    /// Rollout decision
    pub assignment: AbAssignment,
    /// Run executed for the assigned arm
    pub result: RunResult,
}

/// Context builder, loop and rollout safeguard wired together
#[derive(Debug, Clone)]
pub struct Pipeline {
    context: ContextBuilder,
    orchestrator: Orchestrator,
    rollout: Arc<RolloutSafeguard>,
    config: OrchestratorConfig,
    backend_timeout: Option<Duration>,
    test_id: String,
}

impl Pipeline {
    /// Wire a pipeline from constructed services
    ///
    /// # Errors
    /// [`ConfigError`] when `config` does not validate.
    pub fn new(
        context: ContextBuilder,
        orchestrator: Orchestrator,
        rollout: Arc<RolloutSafeguard>,
        config: OrchestratorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            context,
            orchestrator,
            rollout,
            config,
            backend_timeout: None,
            test_id: DEFAULT_TEST_ID.to_string(),
        })
    }

    /// Build every service from settings
    ///
    /// Validates the settings, resolves the backend through `cache` and
    /// registers the rollout test.
    ///
    /// # Errors
    /// [`ConfigError`] for invalid settings or an unbuildable backend.
    pub async fn from_settings(
        settings: &PipelineSettings,
        registry: ConnectorRegistry,
        cache: &BackendCache,
        sink: SharedSink,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let gateway = Gateway::connect(cache, &settings.backend).await?;
        let orchestrator = Orchestrator::new(gateway, Arc::clone(&sink)).with_options(GenerateOptions {
            temperature: settings.backend.temperature,
            max_tokens: settings.backend.max_tokens,
        });
        let context = ContextBuilder::new(registry).with_timeout(settings.connector_timeout());

        let rollout = Arc::new(RolloutSafeguard::new(sink));
        rollout.register(settings.ab_test())?;

        let mut pipeline = Self::new(context, orchestrator, rollout, settings.orchestrator_config())?
            .with_test_id(settings.rollout.test_id.clone());
        if let Some(timeout) = settings.backend_timeout() {
            pipeline = pipeline.with_backend_timeout(timeout);
        }
        Ok(pipeline)
    }

    /// Backend timeout applied to every scenario, replacing the preset's
    #[inline]
    #[must_use]
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = Some(timeout);
        self.config = self.config.with_backend_timeout(timeout);
        self
    }

    /// With rollout test id
    #[inline]
    #[must_use]
    pub fn with_test_id(mut self, test_id: impl Into<String>) -> Self {
        self.test_id = test_id.into();
        self
    }

    /// Default loop configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Rollout safeguard
    #[inline]
    #[must_use]
    pub fn rollout(&self) -> &Arc<RolloutSafeguard> {
        &self.rollout
    }

    /// Rollout test id
    #[inline]
    #[must_use]
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    /// Loop configuration for a scenario
    ///
    /// The configured scenario keeps its settings overrides; other scenarios
    /// use their preset. A configured backend timeout applies to all of them.
    #[must_use]
    pub fn config_for(&self, scenario: Option<Scenario>) -> OrchestratorConfig {
        match scenario {
            Some(s) if s != self.config.scenario => self.preset(s),
            _ => self.config.clone(),
        }
    }

    fn preset(&self, scenario: Scenario) -> OrchestratorConfig {
        let config = OrchestratorConfig::for_scenario(scenario);
        match self.backend_timeout {
            Some(timeout) => config.with_backend_timeout(timeout),
            None => config,
        }
    }

    /// Build context and run the loop
    pub async fn run_pipeline(&self, org: &OrgMeta, scenario: Option<Scenario>) -> RunResult {
        self.run_with_cancel(org, scenario, &RunCancellation::new()).await
    }

    /// Build context and run the loop under a caller-held cancellation
    pub async fn run_with_cancel(
        &self,
        org: &OrgMeta,
        scenario: Option<Scenario>,
        cancel: &RunCancellation,
    ) -> RunResult {
        let config = self.config_for(scenario);
        self.execute(org, &config, cancel).await
    }

    async fn execute(
        &self,
        org: &OrgMeta,
        config: &OrchestratorConfig,
        cancel: &RunCancellation,
    ) -> RunResult {
        let buckets = self.context.build(org).await;
        self.orchestrator.run(org, &buckets, config, cancel).await
    }

    /// Rollout-gated entry
    ///
    /// Treatment runs the refinement loop; control runs the single-pass
    /// baseline. Outcomes of enrolled subjects are recorded as metrics, and
    /// a tripped safeguard sends everyone to control.
    pub async fn route(&self, request: RouteRequest) -> RoutedRun {
        let mut subject = SubjectContext::now()
            .with_phase(request.org.maturity_phase)
            .with_industry(request.org.industry.clone());
        if request.org.industry.trim().is_empty() {
            subject.industry = None;
        }

        let assignment = self.rollout.assign_variant(
            &self.test_id,
            &request.subject_id,
            request.subject_group.as_deref(),
            &subject,
        );

        let config = if assignment.is_treatment() {
            self.config_for(request.scenario)
        } else {
            self.preset(Scenario::Speed)
        };
        info!(
            test_id = %self.test_id,
            subject_id = %request.subject_id,
            variant = %assignment.variant,
            reason = %assignment.reason,
            scenario = %config.scenario,
            "routing run"
        );

        let result = self
            .execute(&request.org, &config, &RunCancellation::new())
            .await;

        if assignment.assigned {
            let sample = if result.success {
                MetricSample::success(result.duration_ms(), result.final_overall().unwrap_or(0.0))
            } else {
                MetricSample::failure(result.duration_ms())
            };
            self.rollout
                .record_metrics(&self.test_id, assignment.variant, sample);
        }

        RoutedRun { assignment, result }
    }
}
