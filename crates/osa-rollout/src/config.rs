//! A/B test configuration

use chrono::{DateTime, Utc};
use osa_types::{ConfigError, MaturityPhase};
use serde::{Deserialize, Serialize};

/// Optional test window; `end` is exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestWindow {
    /// First instant the test is live
    pub start: Option<DateTime<Utc>>,
    /// First instant the test is over
    pub end: Option<DateTime<Utc>>,
}

impl TestWindow {
    /// True when `now` falls inside the window
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| now >= s) && self.end.map_or(true, |e| now < e)
    }
}

/// Bounds that disable treatment when breached
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeguardThresholds {
    /// Highest tolerated treatment error rate, in `[0, 1]`
    pub max_error_rate: f64,
    /// Highest tolerated treatment average latency
    pub max_latency_ms: u64,
    /// Treatment samples required before the bounds apply
    pub min_requests: u64,
}

impl Default for SafeguardThresholds {
    fn default() -> Self {
        Self {
            max_error_rate: 0.10,
            max_latency_ms: 60_000,
            min_requests: 1,
        }
    }
}

/// One A/B test definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbTestConfig {
    /// Test identifier (hash salt)
    pub test_id: String,
    /// Share of eligible subjects sent to treatment, `0..=100`
    pub treatment_percentage: u8,
    /// Subjects or groups always sent to treatment
    #[serde(default)]
    pub include: Vec<String>,
    /// Subjects or groups never enrolled
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Eligible maturity phases; empty allows all
    #[serde(default)]
    pub allowed_phases: Vec<MaturityPhase>,
    /// Eligible industries (case-insensitive); empty allows all
    #[serde(default)]
    pub allowed_industries: Vec<String>,
    /// Test window
    #[serde(default)]
    pub window: TestWindow,
    /// Safeguard bounds
    #[serde(default)]
    pub safeguards: SafeguardThresholds,
}

impl AbTestConfig {
    /// Create test with a treatment share and default bounds
    #[must_use]
    pub fn new(test_id: impl Into<String>, treatment_percentage: u8) -> Self {
        Self {
            test_id: test_id.into(),
            treatment_percentage,
            include: Vec::new(),
            exclude: Vec::new(),
            allowed_phases: Vec::new(),
            allowed_industries: Vec::new(),
            window: TestWindow::default(),
            safeguards: SafeguardThresholds::default(),
        }
    }

    /// With forced-treatment subjects or groups
    #[must_use]
    pub fn including<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(ids.into_iter().map(Into::into));
        self
    }

    /// With excluded subjects or groups
    #[must_use]
    pub fn excluding<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(ids.into_iter().map(Into::into));
        self
    }

    /// With eligible phases
    #[must_use]
    pub fn with_phases<I>(mut self, phases: I) -> Self
    where
        I: IntoIterator<Item = MaturityPhase>,
    {
        self.allowed_phases = phases.into_iter().collect();
        self
    }

    /// With eligible industries
    #[must_use]
    pub fn with_industries<I, S>(mut self, industries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_industries = industries.into_iter().map(Into::into).collect();
        self
    }

    /// With test window
    #[inline]
    #[must_use]
    pub fn with_window(mut self, window: TestWindow) -> Self {
        self.window = window;
        self
    }

    /// With safeguard bounds
    #[inline]
    #[must_use]
    pub fn with_safeguards(mut self, safeguards: SafeguardThresholds) -> Self {
        self.safeguards = safeguards;
        self
    }

    /// Validate the definition
    ///
    /// # Errors
    /// [`ConfigError`] for an empty id, a share above 100, an error rate
    /// outside `[0, 1]` or a zero latency bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.test_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "test_id",
                value: self.test_id.clone(),
            });
        }
        if self.treatment_percentage > 100 {
            return Err(ConfigError::InvalidPercentage(self.treatment_percentage));
        }
        let rate = self.safeguards.max_error_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::InvalidErrorRate(rate));
        }
        if self.safeguards.max_latency_ms == 0 {
            return Err(ConfigError::InvalidTimeout("safeguard latency"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn window_bounds() {
        let now = Utc::now();
        let window = TestWindow {
            start: Some(now - Duration::hours(1)),
            end: Some(now + Duration::hours(1)),
        };
        assert!(window.contains(now));
        assert!(!window.contains(now + Duration::hours(1)));
        assert!(!window.contains(now - Duration::hours(2)));
        assert!(TestWindow::default().contains(now));
    }

    #[test]
    fn validation() {
        assert!(AbTestConfig::new("t", 50).validate().is_ok());
        assert_eq!(
            AbTestConfig::new("t", 101).validate(),
            Err(ConfigError::InvalidPercentage(101))
        );
        let bad_rate = AbTestConfig::new("t", 10).with_safeguards(SafeguardThresholds {
            max_error_rate: 1.5,
            ..SafeguardThresholds::default()
        });
        assert!(matches!(bad_rate.validate(), Err(ConfigError::InvalidErrorRate(_))));
        assert!(AbTestConfig::new(" ", 10).validate().is_err());
    }
}
