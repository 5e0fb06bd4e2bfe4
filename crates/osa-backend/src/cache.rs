//! Backend client cache
//!
//! One backend instance per `(provider, model)` for the cache's lifetime. The
//! cache is a constructed service handed to whoever needs a backend.

use crate::anthropic::AnthropicBackend;
use crate::backend::GenerationBackend;
use crate::config::{BackendConfig, ProviderKind};
use crate::offline::OfflineBackend;
use crate::openai::OpenAiBackend;
use moka::future::Cache;
use osa_types::ConfigError;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

type CacheKey = (ProviderKind, String);

/// Shared backend instances keyed by provider and model
#[derive(Clone)]
pub struct BackendCache {
    inner: Cache<CacheKey, Arc<dyn GenerationBackend>>,
    builds: Arc<AtomicUsize>,
}

impl BackendCache {
    /// Create cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
            builds: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Backend for `config`, building it on first use
    ///
    /// # Errors
    /// [`ConfigError`] when the configuration is invalid.
    pub async fn get_or_build(
        &self,
        config: &BackendConfig,
    ) -> Result<Arc<dyn GenerationBackend>, ConfigError> {
        let key = (config.provider, config.model_name().to_string());
        self.inner
            .try_get_with(key, async {
                let backend = build_backend(config)?;
                self.builds.fetch_add(1, Ordering::SeqCst);
                info!(
                    provider = %config.provider,
                    model = %config.model_name(),
                    "backend client created"
                );
                Ok::<_, ConfigError>(backend)
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Pre-seed an instance (custom or test backends)
    pub async fn insert(&self, provider: ProviderKind, backend: Arc<dyn GenerationBackend>) {
        let key = (provider, backend.model().to_string());
        self.inner.insert(key, backend).await;
    }

    /// Number of backends constructed by this cache
    #[inline]
    #[must_use]
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Drop every cached backend
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for BackendCache {
    fn default() -> Self {
        Self::new(16)
    }
}

impl fmt::Debug for BackendCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCache")
            .field("entries", &self.inner.entry_count())
            .field("builds", &self.builds())
            .finish()
    }
}

/// Construct the backend strategy selected by `config.provider`
///
/// # Errors
/// [`ConfigError`] when the configuration is invalid.
pub fn build_backend(config: &BackendConfig) -> Result<Arc<dyn GenerationBackend>, ConfigError> {
    config.validate()?;
    let backend: Arc<dyn GenerationBackend> = match config.provider {
        ProviderKind::OpenAi => Arc::new(OpenAiBackend::new(config)?),
        ProviderKind::Anthropic => Arc::new(AnthropicBackend::new(config)?),
        ProviderKind::Offline => Arc::new(OfflineBackend::new().with_model(config.model_name())),
    };
    Ok(backend)
}
