//! Backend strategy seam
//!
//! A [`GenerationBackend`] performs exactly one attempt; retries, timeouts and
//! cancellation are the [`crate::Gateway`]'s job.

use async_trait::async_trait;
use osa_types::{BucketName, OrgMeta, RecommendationDocument, ValidationError};
use serde::{Deserialize, Serialize};

/// What a request asks the backend to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// First pass over all available context
    Initial,
    /// Improve the prior document using a context subset
    Refinement,
    /// Harmonize the prior document
    Consistency,
}

/// Sampling options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_tokens: 4_096,
        }
    }
}

/// One generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Request kind
    pub kind: PromptKind,
    /// System instructions
    pub system: String,
    /// User prompt
    pub prompt: String,
    /// Organization the document is for
    pub org: OrgMeta,
    /// Buckets the prompt carries
    pub buckets: Vec<BucketName>,
    /// Document being refined or harmonized
    pub prior_document: Option<RecommendationDocument>,
    /// Contradictions to resolve (consistency requests)
    #[serde(default)]
    pub contradictions: Vec<String>,
    /// 1-based pass index
    pub pass_index: u32,
    /// Sampling options
    pub options: GenerateOptions,
}

impl GenerationRequest {
    /// Create request with empty prompt text
    #[must_use]
    pub fn new(kind: PromptKind, org: OrgMeta, pass_index: u32) -> Self {
        Self {
            kind,
            system: String::new(),
            prompt: String::new(),
            org,
            buckets: Vec::new(),
            prior_document: None,
            contradictions: Vec::new(),
            pass_index,
            options: GenerateOptions::default(),
        }
    }

    /// With system and user prompt
    #[inline]
    #[must_use]
    pub fn with_prompt(mut self, system: impl Into<String>, prompt: impl Into<String>) -> Self {
        self.system = system.into();
        self.prompt = prompt.into();
        self
    }

    /// With carried buckets
    #[inline]
    #[must_use]
    pub fn with_buckets(mut self, buckets: Vec<BucketName>) -> Self {
        self.buckets = buckets;
        self
    }

    /// With prior document
    #[inline]
    #[must_use]
    pub fn with_prior(mut self, document: RecommendationDocument) -> Self {
        self.prior_document = Some(document);
        self
    }

    /// With contradictions to resolve
    #[inline]
    #[must_use]
    pub fn with_contradictions(mut self, contradictions: Vec<String>) -> Self {
        self.contradictions = contradictions;
        self
    }

    /// With sampling options
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }
}

/// Token accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
}

/// Raw completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Completion text (expected to be a JSON document)
    pub content: String,
    /// Token usage
    pub usage: TokenUsage,
    /// Provider stop reason
    pub finish_reason: String,
}

/// Failure of a single attempt
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttemptError {
    /// Transport timeout
    #[error("request timed out")]
    Timeout,

    /// Transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx status
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Truncated response body
        body: String,
    },

    /// Response shape mismatch
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AttemptError {
    /// Whether another attempt may succeed
    ///
    /// Client errors other than 408 and 429 and shape mismatches are final.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Timeout | AttemptError::Network(_) => true,
            AttemptError::Status { status, .. } => {
                !(400..500).contains(status) || *status == 408 || *status == 429
            }
            AttemptError::Validation(_) => false,
        }
    }
}

/// A generation provider strategy
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Provider name
    fn provider(&self) -> &str;

    /// Model name
    fn model(&self) -> &str;

    /// Perform one attempt
    ///
    /// # Errors
    /// [`AttemptError`] describing why the attempt failed.
    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationOutput, AttemptError>;
}

/// Shorten a response body for error messages
pub(crate) fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 200;
    if body.chars().count() <= LIMIT {
        body.to_string()
    } else {
        let cut: String = body.chars().take(LIMIT).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        assert!(AttemptError::Timeout.is_retryable());
        assert!(AttemptError::Network("reset".into()).is_retryable());
        for status in [408, 429, 500, 503] {
            assert!(AttemptError::Status { status, body: String::new() }.is_retryable());
        }
        for status in [400, 401, 403, 404, 422] {
            assert!(!AttemptError::Status { status, body: String::new() }.is_retryable());
        }
        assert!(!AttemptError::Validation(ValidationError::new("openai", "no choices")).is_retryable());
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        assert_eq!(truncate_body(&body).len(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
