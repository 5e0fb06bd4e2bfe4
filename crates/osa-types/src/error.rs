//! Error types for OSA
//!
//! Taxonomy:
//! - [`ConnectorError`]: per-bucket fetch failure, always absorbed by fallback
//! - [`BackendError`]: provider failure after retries are exhausted
//! - [`ValidationError`]: malformed provider response, never retried
//! - [`SafeguardTrippedError`]: rollout disabled, absorbed by downgrading to control
//! - [`ConfigError`]: bad configuration, fails fast at startup
//!
//! [`GenerationError`] is what the backend gateway returns; [`PipelineError`]
//! is what a run records in its result.

use crate::context::BucketName;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-bucket data connector failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectorError {
    /// Connector did not answer within its timeout
    #[error("connector for {bucket} timed out after {timeout_ms}ms")]
    Timeout {
        /// Bucket being fetched
        bucket: BucketName,
        /// Timeout applied
        timeout_ms: u64,
    },

    /// Connector answered with an unusable payload
    #[error("connector for {bucket} returned a malformed payload: {reason}")]
    Malformed {
        /// Bucket being fetched
        bucket: BucketName,
        /// What was wrong
        reason: String,
    },

    /// No connector, or the connector reported itself unavailable
    #[error("connector for {bucket} unavailable: {reason}")]
    Unavailable {
        /// Bucket being fetched
        bucket: BucketName,
        /// Why
        reason: String,
    },
}

impl ConnectorError {
    /// Bucket the error belongs to
    #[inline]
    #[must_use]
    pub fn bucket(&self) -> BucketName {
        match self {
            Self::Timeout { bucket, .. }
            | Self::Malformed { bucket, .. }
            | Self::Unavailable { bucket, .. } => *bucket,
        }
    }

    /// Timeout error helper
    #[inline]
    #[must_use]
    pub fn timeout(bucket: BucketName, timeout: Duration) -> Self {
        Self::Timeout {
            bucket,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Why a backend call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendFailure {
    /// Hard per-call timeout elapsed
    Timeout,
    /// Transport-level failure (connect, TLS, reset)
    Network,
    /// Non-2xx HTTP status
    Status,
    /// Run cancelled while the call was in flight
    Cancelled,
}

/// Generation provider failure after the retry policy is exhausted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("backend {provider} failed on attempt {attempt} ({kind:?}{}): {message}", status_suffix(.http_status))]
pub struct BackendError {
    /// Provider name
    pub provider: String,
    /// HTTP status when one was received
    pub http_status: Option<u16>,
    /// Attempt number (1-based) of the last failure
    pub attempt: u32,
    /// Failure class of the last attempt
    pub kind: BackendFailure,
    /// Detail message
    pub message: String,
}

impl BackendError {
    /// Create new backend error
    #[inline]
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        kind: BackendFailure,
        attempt: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            http_status: None,
            attempt,
            kind,
            message: message.into(),
        }
    }

    /// With HTTP status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(", HTTP {s}")).unwrap_or_default()
}

/// Malformed provider response (treated as a non-retryable backend failure)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("invalid response from {provider}: {reason}")]
pub struct ValidationError {
    /// Provider name
    pub provider: String,
    /// What was wrong with the shape
    pub reason: String,
}

impl ValidationError {
    /// Create new validation error
    #[inline]
    #[must_use]
    pub fn new(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

/// Rollout treatment disabled by safeguards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("safeguards tripped for test {test_id}: {reason}")]
pub struct SafeguardTrippedError {
    /// Test identifier
    pub test_id: String,
    /// Breached bound
    pub reason: String,
}

/// Result of a gateway `generate` call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Retries exhausted or cancelled
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Response shape mismatch
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl GenerationError {
    /// True when the run was cancelled mid-call
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Backend(e) if e.kind == BackendFailure::Cancelled)
    }
}

/// Error recorded in a run result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineError {
    /// Backend failure that escalated to the loop
    #[error(transparent)]
    Backend(BackendError),

    /// Malformed backend response
    #[error(transparent)]
    Validation(ValidationError),

    /// Run cancelled by the caller
    #[error("run cancelled during {stage}")]
    Cancelled {
        /// Loop stage that was interrupted
        stage: String,
    },

    /// The loop attempted a transition its state machine forbids
    #[error("illegal loop transition {from} -> {to}")]
    InvalidTransition {
        /// State the loop was in
        from: String,
        /// State it tried to enter
        to: String,
    },
}

impl From<GenerationError> for PipelineError {
    fn from(error: GenerationError) -> Self {
        match error {
            GenerationError::Backend(e) => Self::Backend(e),
            GenerationError::Validation(e) => Self::Validation(e),
        }
    }
}

/// Configuration errors (fail fast at startup)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `max_passes` below 1
    #[error("max_passes must be at least 1 (got {0})")]
    InvalidMaxPasses(u32),

    /// Threshold outside `[0, 5]`
    #[error("quality_threshold must be within [0, 5] (got {0})")]
    InvalidThreshold(f64),

    /// Network provider without credentials
    #[error("missing credentials for provider {provider}")]
    MissingCredential {
        /// Provider name
        provider: String,
    },

    /// Retry policy with zero attempts
    #[error("retry max_attempts must be at least 1")]
    InvalidRetryAttempts,

    /// Zero timeout
    #[error("{0} timeout must be greater than zero")]
    InvalidTimeout(&'static str),

    /// Treatment percentage above 100
    #[error("treatment percentage must be within [0, 100] (got {0})")]
    InvalidPercentage(u8),

    /// Error rate outside `[0, 1]`
    #[error("max_error_rate must be within [0, 1] (got {0})")]
    InvalidErrorRate(f64),

    /// Unknown provider / scenario / value
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// Settings file could not be read or parsed
    #[error("failed to load settings: {0}")]
    Load(String),
}
