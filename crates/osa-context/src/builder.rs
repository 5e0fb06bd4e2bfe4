//! Context builder
//!
//! Fans out one task per bucket, each with its own timeout, and joins them.
//! Any per-bucket failure is replaced by [`crate::fallback::synthesize`];
//! `build` itself never fails.

use crate::connector::{validate_payload, ConnectorRegistry, DataConnector};
use crate::fallback;
use osa_types::{BucketName, ConnectorError, ContextBucket, ContextBuckets, OrgMeta};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default per-connector timeout
pub const DEFAULT_CONNECTOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the four context buckets for a run
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    /// `None` when the connector subsystem is unavailable
    registry: Option<ConnectorRegistry>,
    timeout: Duration,
}

impl ContextBuilder {
    /// Create builder over a connector registry
    #[inline]
    #[must_use]
    pub fn new(registry: ConnectorRegistry) -> Self {
        Self {
            registry: Some(registry),
            timeout: DEFAULT_CONNECTOR_TIMEOUT,
        }
    }

    /// Builder for a deployment with no connector subsystem
    ///
    /// [`ContextBuilder::build`] returns an empty map; runs proceed with zero
    /// context.
    #[inline]
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            registry: None,
            timeout: DEFAULT_CONNECTOR_TIMEOUT,
        }
    }

    /// With per-connector timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-connector timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch all buckets concurrently, falling back per bucket
    pub async fn build(&self, org: &OrgMeta) -> ContextBuckets {
        let Some(registry) = &self.registry else {
            warn!(org = %org.org_name, "connector subsystem unavailable, running without context");
            return ContextBuckets::empty();
        };

        let handles: Vec<_> = BucketName::ALL
            .into_iter()
            .map(|bucket| {
                let connector = registry.get(bucket);
                let org = org.clone();
                let timeout = self.timeout;
                tokio::spawn(async move { fetch_one(connector, bucket, &org, timeout).await })
            })
            .collect();

        let joined = futures::future::join_all(handles).await;

        let entries = BucketName::ALL.into_iter().zip(joined).map(|(bucket, joined)| {
            let outcome = joined.unwrap_or_else(|e| {
                Err(ConnectorError::Unavailable {
                    bucket,
                    reason: format!("fetch task failed: {e}"),
                })
            });
            let entry = match outcome {
                Ok(payload) => {
                    debug!(%bucket, "bucket fetched");
                    ContextBucket::live(payload)
                }
                Err(error) => {
                    warn!(%bucket, error = %error, "bucket fetch failed, using fallback");
                    ContextBucket::fallback(fallback::synthesize(bucket, org))
                }
            };
            (bucket, entry)
        });

        let buckets = ContextBuckets::from_entries(entries);
        info!(
            org = %org.org_name,
            live = buckets.count_origin(osa_types::Origin::Live),
            fallback = buckets.count_origin(osa_types::Origin::Fallback),
            "context built"
        );
        buckets
    }
}

async fn fetch_one(
    connector: Option<Arc<dyn DataConnector>>,
    bucket: BucketName,
    org: &OrgMeta,
    timeout: Duration,
) -> Result<Value, ConnectorError> {
    let connector = connector.ok_or_else(|| ConnectorError::Unavailable {
        bucket,
        reason: "no connector registered".to_string(),
    })?;

    let payload = tokio::time::timeout(timeout, connector.fetch_bucket(bucket, org))
        .await
        .map_err(|_| ConnectorError::timeout(bucket, timeout))??;

    validate_payload(bucket, &payload)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::StaticConnector;
    use osa_types::{MaturityPhase, Origin};
    use serde_json::json;

    fn org() -> OrgMeta {
        OrgMeta::new("Acme", "Retail").with_phase(MaturityPhase::Growth)
    }

    #[tokio::test]
    async fn unavailable_subsystem_yields_empty_map() {
        let buckets = ContextBuilder::unavailable().build(&org()).await;
        assert!(buckets.is_empty());
    }

    #[tokio::test]
    async fn empty_registry_falls_back_everywhere() {
        let buckets = ContextBuilder::new(ConnectorRegistry::new()).build(&org()).await;
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets.count_origin(Origin::Fallback), 4);
    }

    #[tokio::test]
    async fn live_and_fallback_mix() {
        let connector = StaticConnector::new()
            .with_payload(BucketName::Content, json!({"pillars": ["guides"]}))
            .with_payload(BucketName::Analytics, json!({}));
        let registry = ConnectorRegistry::new().with_all(Arc::new(connector));

        let buckets = ContextBuilder::new(registry).build(&org()).await;
        assert_eq!(buckets.get(BucketName::Content).map(|b| b.origin), Some(Origin::Live));
        // Empty object is malformed.
        assert_eq!(
            buckets.get(BucketName::Analytics).map(|b| b.origin),
            Some(Origin::Fallback)
        );
        assert_eq!(buckets.count_origin(Origin::Fallback), 3);
    }
}
