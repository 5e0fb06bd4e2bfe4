//! Backend gateway
//!
//! Wraps one [`GenerationBackend`] with the retry policy, a hard per-call
//! timeout and cooperative cancellation.

use crate::backend::{AttemptError, GenerationBackend, GenerationOutput, GenerationRequest};
use crate::cache::BackendCache;
use crate::config::{BackendConfig, RetryPolicy};
use osa_types::{BackendError, BackendFailure, ConfigError, GenerationError, RunCancellation};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default hard per-call timeout
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(45);

/// Retrying, cancellable front for a backend strategy
#[derive(Clone)]
pub struct Gateway {
    backend: Arc<dyn GenerationBackend>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl Gateway {
    /// Create gateway over a backend with the default policy
    #[must_use]
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            retry: RetryPolicy::default(),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Resolve the configured backend through the cache
    ///
    /// The gateway keeps [`DEFAULT_CALL_TIMEOUT`] unless `config` sets one.
    ///
    /// # Errors
    /// [`ConfigError`] when the backend cannot be constructed.
    pub async fn connect(cache: &BackendCache, config: &BackendConfig) -> Result<Self, ConfigError> {
        let backend = cache.get_or_build(config).await?;
        let gateway = Self::new(backend).with_retry(config.retry.clone());
        Ok(match config.timeout() {
            Some(timeout) => gateway.with_timeout(timeout),
            None => gateway,
        })
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// With hard per-call timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Provider name of the wrapped backend
    #[inline]
    #[must_use]
    pub fn provider(&self) -> &str {
        self.backend.provider()
    }

    /// Model name of the wrapped backend
    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Retry policy in effect
    #[inline]
    #[must_use]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Per-call timeout in effect
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generate with bounded retries
    ///
    /// # Errors
    /// - [`GenerationError::Validation`] on the first response-shape error
    /// - [`GenerationError::Backend`] when a non-retryable status is returned,
    ///   the attempt budget is exhausted, or `cancel` fires
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &RunCancellation,
    ) -> Result<GenerationOutput, GenerationError> {
        let provider = self.backend.provider().to_string();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last = AttemptError::Timeout;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(cancelled(&provider, attempt).into());
            }

            let call = tokio::time::timeout(self.timeout, self.backend.complete(request));
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled(&provider, attempt).into()),
                result = call => result.unwrap_or(Err(AttemptError::Timeout)),
            };

            match outcome {
                Ok(output) => {
                    debug!(
                        provider = %provider,
                        attempt,
                        completion_tokens = output.usage.completion_tokens,
                        "generation attempt succeeded"
                    );
                    return Ok(output);
                }
                Err(AttemptError::Validation(error)) => {
                    warn!(provider = %provider, attempt, error = %error, "invalid backend response");
                    return Err(error.into());
                }
                Err(error) if !error.is_retryable() => {
                    warn!(provider = %provider, attempt, error = %error, "non-retryable backend failure");
                    return Err(backend_error(&provider, attempt, error).into());
                }
                Err(error) => {
                    warn!(
                        provider = %provider,
                        attempt,
                        max_attempts,
                        error = %error,
                        "generation attempt failed"
                    );
                    last = error;
                    if attempt < max_attempts {
                        let delay = self.retry.delay_for(attempt);
                        debug!(provider = %provider, ?delay, "backing off");
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => return Err(cancelled(&provider, attempt).into()),
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }

        Err(backend_error(&provider, max_attempts, last).into())
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("provider", &self.backend.provider())
            .field("model", &self.backend.model())
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn cancelled(provider: &str, attempt: u32) -> BackendError {
    BackendError::new(provider, BackendFailure::Cancelled, attempt, "run cancelled")
}

fn backend_error(provider: &str, attempt: u32, error: AttemptError) -> BackendError {
    match error {
        AttemptError::Timeout => {
            BackendError::new(provider, BackendFailure::Timeout, attempt, "request timed out")
        }
        AttemptError::Network(message) => {
            BackendError::new(provider, BackendFailure::Network, attempt, message)
        }
        AttemptError::Status { status, body } => {
            BackendError::new(provider, BackendFailure::Status, attempt, body).with_status(status)
        }
        AttemptError::Validation(e) => {
            BackendError::new(provider, BackendFailure::Status, attempt, e.reason)
        }
    }
}
