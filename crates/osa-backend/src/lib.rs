//! OSA Backend - generation backend gateway
//!
//! - [`GenerationBackend`]: one-attempt provider strategy
//!   ([`OpenAiBackend`], [`AnthropicBackend`], [`OfflineBackend`])
//! - [`Gateway`]: bounded retries with exponential backoff, hard per-call
//!   timeout and cancellation
//! - [`BackendCache`]: one client per `(provider, model)`
//!
//! # Example
//!
//! ```rust
//! use osa_backend::{BackendCache, BackendConfig, Gateway};
//!
//! # async fn example() -> Result<(), osa_types::ConfigError> {
//! let cache = BackendCache::default();
//! let gateway = Gateway::connect(&cache, &BackendConfig::default()).await?;
//! assert_eq!(gateway.provider(), "offline");
//! # Ok(())
//! # }
//! ```

pub mod anthropic;
pub mod backend;
pub mod cache;
pub mod config;
pub mod gateway;
pub mod offline;
pub mod openai;

pub use anthropic::AnthropicBackend;
pub use backend::{
    AttemptError, GenerateOptions, GenerationBackend, GenerationOutput, GenerationRequest,
    PromptKind, TokenUsage,
};
pub use cache::{build_backend, BackendCache};
pub use config::{BackendConfig, ProviderKind, RetryPolicy};
pub use gateway::{Gateway, DEFAULT_CALL_TIMEOUT};
pub use offline::{OfflineBackend, Scripted};
pub use openai::OpenAiBackend;
