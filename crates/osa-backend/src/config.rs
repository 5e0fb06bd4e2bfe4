//! Backend configuration

use osa_types::ConfigError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Generation provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions
    OpenAi,
    /// Anthropic messages
    Anthropic,
    /// Deterministic in-process backend (no network)
    #[default]
    Offline,
}

impl ProviderKind {
    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Offline => "offline",
        }
    }

    /// Model used when none is configured
    #[inline]
    #[must_use]
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-sonnet-latest",
            ProviderKind::Offline => "offline-v1",
        }
    }

    /// Endpoint base used when none is configured
    #[inline]
    #[must_use]
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Offline => "",
        }
    }

    /// Environment variable holding the credential
    #[inline]
    #[must_use]
    pub fn credential_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OSA_OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("OSA_ANTHROPIC_API_KEY"),
            ProviderKind::Offline => None,
        }
    }

    /// True when the provider talks to the network
    #[inline]
    #[must_use]
    pub fn is_network(&self) -> bool {
        !matches!(self, ProviderKind::Offline)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "offline" => Ok(ProviderKind::Offline),
            other => Err(ConfigError::InvalidValue {
                field: "provider",
                value: other.to_string(),
            }),
        }
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay_ms: u64,
    /// Backoff ceiling
    pub max_delay_ms: u64,
    /// Randomize each delay within `[delay/2, delay]`
    pub jitter: bool,
}

impl RetryPolicy {
    /// Policy with no waiting between attempts
    #[inline]
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter: false,
        }
    }

    /// With attempt budget
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// With base delay
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With jitter toggle
    #[inline]
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Un-jittered delay after failed attempt `attempt` (1-based)
    ///
    /// `base_delay * 2^(attempt-1)`, capped at `max_delay`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Delay to sleep after failed attempt `attempt`, jitter applied
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.backoff(attempt);
        if self.jitter && !delay.is_zero() {
            delay.mul_f64(rand::rng().random_range(0.5..=1.0))
        } else {
            delay
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            jitter: true,
        }
    }
}

/// Backend selection and call parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Provider strategy
    pub provider: ProviderKind,
    /// Model name; empty means the provider default
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: u32,
    /// Hard per-call timeout; the scenario preset's timeout applies when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Retry policy
    pub retry: RetryPolicy,
    /// API key for network providers
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Endpoint override
    pub base_url: Option<String>,
}

impl BackendConfig {
    /// Config for a provider with its defaults
    #[must_use]
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    /// With model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// With API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// With endpoint override
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// With per-call timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Effective model name
    #[must_use]
    pub fn model_name(&self) -> &str {
        if self.model.trim().is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    /// Effective endpoint base without trailing slash
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    /// Configured per-call timeout, if any
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Fill a missing credential from the provider's environment variable
    #[must_use]
    pub fn with_env_credentials(mut self) -> Self {
        let missing = self.api_key.as_deref().map_or(true, |k| k.trim().is_empty());
        if missing {
            if let Some(var) = self.provider.credential_env() {
                self.api_key = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
            }
        }
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// - [`ConfigError::MissingCredential`] for a network provider without key
    /// - [`ConfigError::InvalidRetryAttempts`] for a zero attempt budget
    /// - [`ConfigError::InvalidTimeout`] for a zero timeout
    /// - [`ConfigError::InvalidValue`] for an out-of-range temperature or zero token cap
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.is_network()
            && self.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(ConfigError::MissingCredential {
                provider: self.provider.to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryAttempts);
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::InvalidTimeout("backend"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "temperature",
                value: self.temperature.to_string(),
            });
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_tokens",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: String::new(),
            temperature: 0.4,
            max_tokens: 4_096,
            timeout_ms: None,
            retry: RetryPolicy::default(),
            api_key: None,
            base_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 350,
            jitter: false,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(40), Duration::from_millis(350));
    }

    #[test]
    fn jitter_stays_within_half_to_full_delay() {
        let policy = RetryPolicy::default();
        for attempt in 1..=4 {
            let full = policy.backoff(attempt);
            let delay = policy.delay_for(attempt);
            assert!(delay <= full);
            assert!(delay >= full / 2);
        }
    }

    #[test]
    fn network_provider_requires_credential() {
        let config = BackendConfig::new(ProviderKind::OpenAi);
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingCredential {
                provider: "openai".to_string()
            })
        );
        assert!(config.with_api_key("sk-test").validate().is_ok());
    }

    #[test]
    fn offline_needs_no_credential() {
        assert!(BackendConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_attempts_rejected() {
        let config = BackendConfig::default().with_retry(RetryPolicy::immediate(0));
        assert_eq!(config.validate(), Err(ConfigError::InvalidRetryAttempts));
    }

    #[test]
    fn model_and_endpoint_defaults() {
        let config = BackendConfig::new(ProviderKind::Anthropic).with_base_url("http://localhost:9000/");
        assert_eq!(config.model_name(), "claude-3-5-sonnet-latest");
        assert_eq!(config.endpoint(), "http://localhost:9000");
    }

    #[test]
    fn timeout_is_optional_but_never_zero() {
        let config = BackendConfig::default();
        assert_eq!(config.timeout(), None);
        assert_eq!(ProviderKind::default(), ProviderKind::Offline);

        let config = config.with_timeout(Duration::from_millis(250));
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));

        let config = config.with_timeout(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout("backend")));
    }

    #[test]
    fn provider_parse() {
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert!("mistral".parse::<ProviderKind>().is_err());
    }
}
