//! Data connectors
//!
//! A [`DataConnector`] serves one or more context buckets. The
//! [`ConnectorRegistry`] maps each bucket to the connector responsible for it.

use async_trait::async_trait;
use osa_types::{BucketName, ConnectorError, OrgMeta};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Outbound fetch of one context bucket
#[async_trait]
pub trait DataConnector: Send + Sync {
    /// Fetch the payload for `bucket`
    ///
    /// # Errors
    /// Any [`ConnectorError`]; the builder absorbs it with fallback data.
    async fn fetch_bucket(&self, bucket: BucketName, org: &OrgMeta)
        -> Result<Value, ConnectorError>;
}

/// Check that a payload is a non-empty JSON object
///
/// # Errors
/// [`ConnectorError::Malformed`] otherwise.
pub fn validate_payload(bucket: BucketName, payload: &Value) -> Result<(), ConnectorError> {
    match payload {
        Value::Object(map) if !map.is_empty() => Ok(()),
        Value::Object(_) => Err(ConnectorError::Malformed {
            bucket,
            reason: "empty object".to_string(),
        }),
        other => Err(ConnectorError::Malformed {
            bucket,
            reason: format!("expected object, got {}", json_kind(other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Bucket → connector routing table
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: BTreeMap<BucketName, Arc<dyn DataConnector>>,
}

impl ConnectorRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one bucket to a connector
    #[must_use]
    pub fn with_connector(mut self, bucket: BucketName, connector: Arc<dyn DataConnector>) -> Self {
        self.connectors.insert(bucket, connector);
        self
    }

    /// Route every bucket to the same connector
    #[must_use]
    pub fn with_all(mut self, connector: Arc<dyn DataConnector>) -> Self {
        for bucket in BucketName::ALL {
            self.connectors.insert(bucket, Arc::clone(&connector));
        }
        self
    }

    /// Connector for a bucket
    #[inline]
    #[must_use]
    pub fn get(&self, bucket: BucketName) -> Option<Arc<dyn DataConnector>> {
        self.connectors.get(&bucket).cloned()
    }

    /// Buckets with a connector
    #[must_use]
    pub fn buckets(&self) -> Vec<BucketName> {
        self.connectors.keys().copied().collect()
    }
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("buckets", &self.buckets())
            .finish()
    }
}

/// Connector serving fixed payloads (operator-supplied files, tests)
#[derive(Debug, Clone, Default)]
pub struct StaticConnector {
    payloads: BTreeMap<BucketName, Value>,
}

impl StaticConnector {
    /// Create connector with no payloads
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With payload for a bucket
    #[must_use]
    pub fn with_payload(mut self, bucket: BucketName, payload: Value) -> Self {
        self.payloads.insert(bucket, payload);
        self
    }

    /// Build from a JSON object keyed by bucket name
    ///
    /// Unknown keys are ignored.
    #[must_use]
    pub fn from_json(document: &Value) -> Self {
        let payloads = document
            .as_object()
            .map(|map| {
                map.iter()
                    .filter_map(|(key, value)| {
                        key.parse::<BucketName>().ok().map(|b| (b, value.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { payloads }
    }
}

#[async_trait]
impl DataConnector for StaticConnector {
    async fn fetch_bucket(
        &self,
        bucket: BucketName,
        _org: &OrgMeta,
    ) -> Result<Value, ConnectorError> {
        self.payloads
            .get(&bucket)
            .cloned()
            .ok_or_else(|| ConnectorError::Unavailable {
                bucket,
                reason: "no payload configured".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_validation() {
        assert!(validate_payload(BucketName::Content, &json!({"a": 1})).is_ok());
        assert!(matches!(
            validate_payload(BucketName::Content, &json!({})),
            Err(ConnectorError::Malformed { .. })
        ));
        let err = validate_payload(BucketName::Analytics, &json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn static_connector_from_json_ignores_unknown_keys() {
        let connector = StaticConnector::from_json(&json!({
            "content": {"pillars": ["guides"]},
            "weather": {"sunny": true}
        }));
        assert_eq!(connector.payloads.len(), 1);
    }

    #[tokio::test]
    async fn static_connector_reports_missing_bucket() {
        let connector = StaticConnector::new().with_payload(BucketName::Content, json!({"a": 1}));
        let org = OrgMeta::new("Acme", "Retail");
        assert!(connector.fetch_bucket(BucketName::Content, &org).await.is_ok());
        assert!(matches!(
            connector.fetch_bucket(BucketName::Strategy, &org).await,
            Err(ConnectorError::Unavailable { .. })
        ));
    }

    #[test]
    fn registry_with_all_routes_every_bucket() {
        let registry = ConnectorRegistry::new().with_all(Arc::new(StaticConnector::new()));
        assert_eq!(registry.buckets(), BucketName::ALL.to_vec());
    }
}
