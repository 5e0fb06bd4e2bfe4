//! Orchestrator configuration and scenario presets

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Scenario preset selecting pass budget, threshold and backend timeout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Single pass, short timeout
    Speed,
    /// Balanced refinement (default)
    #[default]
    Quality,
    /// Most passes, highest bar, longest timeout
    Comprehensive,
}

impl Scenario {
    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Speed => "speed",
            Scenario::Quality => "quality",
            Scenario::Comprehensive => "comprehensive",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "speed" => Ok(Scenario::Speed),
            "quality" => Ok(Scenario::Quality),
            "comprehensive" => Ok(Scenario::Comprehensive),
            other => Err(ConfigError::InvalidValue {
                field: "scenario",
                value: other.to_string(),
            }),
        }
    }
}

/// Orchestration loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Scenario the values came from
    #[serde(default)]
    pub scenario: Scenario,
    /// Maximum generation passes (consistency check excluded)
    pub max_passes: u32,
    /// Overall score that stops refinement
    pub quality_threshold: f64,
    /// Hard per-call backend timeout in milliseconds
    pub backend_timeout_ms: u64,
}

impl OrchestratorConfig {
    /// Preset for a scenario
    #[must_use]
    pub fn for_scenario(scenario: Scenario) -> Self {
        match scenario {
            Scenario::Speed => Self {
                scenario,
                max_passes: 1,
                quality_threshold: 3.0,
                backend_timeout_ms: 20_000,
            },
            Scenario::Quality => Self {
                scenario,
                max_passes: 3,
                quality_threshold: 3.8,
                backend_timeout_ms: 45_000,
            },
            Scenario::Comprehensive => Self {
                scenario,
                max_passes: 5,
                quality_threshold: 4.2,
                backend_timeout_ms: 90_000,
            },
        }
    }

    /// With max passes
    #[inline]
    #[must_use]
    pub fn with_max_passes(mut self, max_passes: u32) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// With quality threshold
    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }

    /// With backend timeout
    #[inline]
    #[must_use]
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Backend timeout as a duration
    #[inline]
    #[must_use]
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// - [`ConfigError::InvalidMaxPasses`] when `max_passes < 1`
    /// - [`ConfigError::InvalidThreshold`] when the threshold is outside `[0, 5]`
    /// - [`ConfigError::InvalidTimeout`] when the timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_passes < 1 {
            return Err(ConfigError::InvalidMaxPasses(self.max_passes));
        }
        if !(0.0..=5.0).contains(&self.quality_threshold) {
            return Err(ConfigError::InvalidThreshold(self.quality_threshold));
        }
        if self.backend_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout("backend"));
        }
        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::for_scenario(Scenario::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid_and_ordered() {
        let speed = OrchestratorConfig::for_scenario(Scenario::Speed);
        let quality = OrchestratorConfig::for_scenario(Scenario::Quality);
        let comprehensive = OrchestratorConfig::for_scenario(Scenario::Comprehensive);

        for config in [&speed, &quality, &comprehensive] {
            assert!(config.validate().is_ok());
        }
        assert!(speed.max_passes < quality.max_passes);
        assert!(quality.max_passes < comprehensive.max_passes);
        assert!(speed.backend_timeout() < comprehensive.backend_timeout());
    }

    #[test]
    fn zero_passes_fail_fast() {
        let config = OrchestratorConfig::default().with_max_passes(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxPasses(0)));
    }

    #[test]
    fn threshold_out_of_range_fails() {
        let config = OrchestratorConfig::default().with_threshold(5.5);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThreshold(_))));
    }

    #[test]
    fn scenario_default_is_quality() {
        assert_eq!(Scenario::default(), Scenario::Quality);
        assert_eq!(OrchestratorConfig::default().scenario, Scenario::Quality);
    }

    #[test]
    fn scenario_parse() {
        assert_eq!("Comprehensive".parse::<Scenario>(), Ok(Scenario::Comprehensive));
        assert!("fast".parse::<Scenario>().is_err());
    }
}
