//! Pipeline settings
//!
//! One TOML file covers the backend, the loop, the connectors and the
//! rollout test. Every table and field is optional; missing values take the
//! compiled defaults. Credentials may be left out of the file and supplied
//! through `OSA_OPENAI_API_KEY` / `OSA_ANTHROPIC_API_KEY`.
//!
//! The per-call backend timeout is `[orchestrator] backend_timeout_ms` when
//! set, else `[backend] timeout_ms`, else the scenario preset's value. It
//! applies to every scenario a pipeline runs.
//!
//! ```toml
//! [backend]
//! provider = "openai"
//! model = "gpt-4o-mini"
//! timeout_ms = 30000
//!
//! [backend.retry]
//! max_attempts = 3
//! base_delay_ms = 500
//!
//! [orchestrator]
//! scenario = "quality"
//! quality_threshold = 4.0
//!
//! [rollout]
//! test_id = "osa-refinement"
//! treatment_percentage = 20
//!
//! [rollout.safeguards]
//! max_error_rate = 0.05
//! ```

use osa_backend::BackendConfig;
use osa_rollout::{AbTestConfig, SafeguardThresholds};
use osa_types::{ConfigError, OrchestratorConfig, Scenario};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Loop overrides on top of the scenario preset
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Scenario preset
    pub scenario: Scenario,
    /// Overrides the preset's pass budget
    pub max_passes: Option<u32>,
    /// Overrides the preset's threshold
    pub quality_threshold: Option<f64>,
    /// Overrides `[backend] timeout_ms` and the preset's backend timeout
    pub backend_timeout_ms: Option<u64>,
}

/// Connector settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// Per-connector timeout
    pub connector_timeout_ms: u64,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            connector_timeout_ms: 10_000,
        }
    }
}

/// Rollout test settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutSettings {
    /// Test identifier
    pub test_id: String,
    /// Share of eligible subjects routed to treatment
    pub treatment_percentage: u8,
    /// Subjects or groups always routed to treatment
    pub include: Vec<String>,
    /// Subjects or groups never enrolled
    pub exclude: Vec<String>,
    /// Safeguard bounds
    pub safeguards: SafeguardThresholds,
}

impl Default for RolloutSettings {
    fn default() -> Self {
        Self {
            test_id: crate::pipeline::DEFAULT_TEST_ID.to_string(),
            treatment_percentage: 10,
            include: Vec::new(),
            exclude: Vec::new(),
            safeguards: SafeguardThresholds::default(),
        }
    }
}

/// Complete settings for one deployment
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Backend selection and call parameters
    pub backend: BackendConfig,
    /// Loop overrides
    pub orchestrator: LoopSettings,
    /// Connectors
    pub context: ContextSettings,
    /// Rollout test
    pub rollout: RolloutSettings,
}

impl PipelineSettings {
    /// Parse settings from TOML text
    ///
    /// # Errors
    /// [`ConfigError::Load`] for malformed TOML or mistyped fields.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Read settings from a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Load`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Fill missing backend credentials from the environment
    #[must_use]
    pub fn with_env_credentials(mut self) -> Self {
        self.backend = self.backend.with_env_credentials();
        self
    }

    /// Backend timeout that replaces every scenario preset's, if configured
    #[must_use]
    pub fn backend_timeout(&self) -> Option<Duration> {
        self.orchestrator
            .backend_timeout_ms
            .map(Duration::from_millis)
            .or_else(|| self.backend.timeout())
    }

    /// Loop configuration: the scenario preset with overrides applied
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let loop_settings = &self.orchestrator;
        let mut config = OrchestratorConfig::for_scenario(loop_settings.scenario);
        if let Some(max_passes) = loop_settings.max_passes {
            config = config.with_max_passes(max_passes);
        }
        if let Some(threshold) = loop_settings.quality_threshold {
            config = config.with_threshold(threshold);
        }
        if let Some(timeout) = self.backend_timeout() {
            config = config.with_backend_timeout(timeout);
        }
        config
    }

    /// Rollout test definition
    #[must_use]
    pub fn ab_test(&self) -> AbTestConfig {
        let rollout = &self.rollout;
        AbTestConfig::new(rollout.test_id.clone(), rollout.treatment_percentage)
            .including(rollout.include.iter().cloned())
            .excluding(rollout.exclude.iter().cloned())
            .with_safeguards(rollout.safeguards)
    }

    /// Per-connector timeout
    #[inline]
    #[must_use]
    pub fn connector_timeout(&self) -> Duration {
        Duration::from_millis(self.context.connector_timeout_ms)
    }

    /// Validate every section
    ///
    /// # Errors
    /// The first [`ConfigError`] found, checking backend, loop, connectors
    /// and rollout in that order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.validate()?;
        self.orchestrator_config().validate()?;
        if self.context.connector_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout("connector"));
        }
        self.ab_test().validate()
    }
}
