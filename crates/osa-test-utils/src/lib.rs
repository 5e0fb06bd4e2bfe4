//! Testing utilities for OSA workspace
//!
//! Shared fixtures: organizations, connectors, gateways and sinks.

#![allow(missing_docs)]

use async_trait::async_trait;
use osa_backend::{Gateway, OfflineBackend, RetryPolicy};
use osa_context::{ConnectorRegistry, DataConnector, StaticConnector};
use osa_types::{BucketName, ConnectorError, MaturityPhase, MemorySink, OrgMeta};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Retail organization in the growth phase with goals, KPIs and a stack
pub fn retail_growth_org() -> OrgMeta {
    OrgMeta::new("Acme Outfitters", "Retail")
        .with_region("North America")
        .with_phase(MaturityPhase::Growth)
        .with_goals(["increase repeat purchases", "grow organic traffic"])
        .with_kpis(["conversion rate", "average order value"])
        .with_stack(["Shopify", "Optimizely", "GA4"])
}

/// Organization with nothing beyond a name and industry
pub fn bare_org() -> OrgMeta {
    OrgMeta::new("Initech", "Software")
}

/// Connector that is always unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingConnector;

#[async_trait]
impl DataConnector for FailingConnector {
    async fn fetch_bucket(&self, bucket: BucketName, _org: &OrgMeta) -> Result<Value, ConnectorError> {
        Err(ConnectorError::Unavailable {
            bucket,
            reason: "connector offline".to_string(),
        })
    }
}

/// Registry whose every connector fails
pub fn failing_registry() -> ConnectorRegistry {
    ConnectorRegistry::new().with_all(Arc::new(FailingConnector))
}

/// Registry answering every bucket with a small live payload
pub fn live_registry() -> ConnectorRegistry {
    let connector = StaticConnector::new()
        .with_payload(BucketName::Content, json!({"top_topics": ["sustainable fabrics", "fit guides"]}))
        .with_payload(BucketName::Analytics, json!({"sessions_30d": 182_000, "conversion_rate": 0.021}))
        .with_payload(BucketName::Experience, json!({"tests_running": 2, "personalization": "rules"}))
        .with_payload(BucketName::Strategy, json!({"horizon": "6 months", "budget_band": "mid"}));
    ConnectorRegistry::new().with_all(Arc::new(connector))
}

/// Three immediate attempts
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::immediate(3)
}

/// Gateway over a shared offline backend with [`fast_retry`]
///
/// Direct `generate` calls time out after one second. An orchestrator run
/// replaces that with its config's `backend_timeout_ms`.
pub fn offline_gateway(backend: &Arc<OfflineBackend>) -> Gateway {
    Gateway::new(backend.clone())
        .with_retry(fast_retry())
        .with_timeout(Duration::from_secs(1))
}

/// Sink recording every event
pub fn recording_sink() -> Arc<MemorySink> {
    Arc::new(MemorySink::default())
}
