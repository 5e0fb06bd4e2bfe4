//! Context buckets
//!
//! A run is conditioned on up to four named context buckets. Each bucket
//! carries an arbitrary JSON payload and records whether it came from a live
//! data connector or from deterministic fallback synthesis.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Fixed context bucket names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketName {
    /// Content performance signals
    Content,
    /// Analytics signals
    Analytics,
    /// Experience / experimentation tactics
    Experience,
    /// Organizational strategy
    Strategy,
}

impl BucketName {
    /// All buckets in canonical order
    pub const ALL: [BucketName; 4] = [
        BucketName::Content,
        BucketName::Analytics,
        BucketName::Experience,
        BucketName::Strategy,
    ];

    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketName::Content => "content",
            BucketName::Analytics => "analytics",
            BucketName::Experience => "experience",
            BucketName::Strategy => "strategy",
        }
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" => Ok(BucketName::Content),
            "analytics" => Ok(BucketName::Analytics),
            "experience" => Ok(BucketName::Experience),
            "strategy" => Ok(BucketName::Strategy),
            other => Err(format!("unknown bucket: {other}")),
        }
    }
}

/// Where a bucket's payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Fetched from a live data connector
    Live,
    /// Synthesized from organization metadata
    Fallback,
}

/// One context bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBucket {
    /// Payload origin
    pub origin: Origin,
    /// Structured payload
    pub payload: serde_json::Value,
}

impl ContextBucket {
    /// Bucket with a live payload
    #[inline]
    #[must_use]
    pub fn live(payload: serde_json::Value) -> Self {
        Self {
            origin: Origin::Live,
            payload,
        }
    }

    /// Bucket with a fallback payload
    #[inline]
    #[must_use]
    pub fn fallback(payload: serde_json::Value) -> Self {
        Self {
            origin: Origin::Fallback,
            payload,
        }
    }
}

/// Context buckets for one run
///
/// Read-only once built: the only way to add buckets is
/// [`ContextBuckets::from_entries`], and [`ContextBuckets::subset`] returns a
/// new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextBuckets {
    buckets: BTreeMap<BucketName, ContextBucket>,
}

impl ContextBuckets {
    /// Empty bucket map (zero context)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from entries; later duplicates replace earlier ones
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (BucketName, ContextBucket)>,
    {
        Self {
            buckets: entries.into_iter().collect(),
        }
    }

    /// Get a bucket
    #[inline]
    #[must_use]
    pub fn get(&self, name: BucketName) -> Option<&ContextBucket> {
        self.buckets.get(&name)
    }

    /// Check presence
    #[inline]
    #[must_use]
    pub fn contains(&self, name: BucketName) -> bool {
        self.buckets.contains_key(&name)
    }

    /// Present bucket names in canonical order
    #[must_use]
    pub fn names(&self) -> Vec<BucketName> {
        self.buckets.keys().copied().collect()
    }

    /// Iterate in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (BucketName, &ContextBucket)> {
        self.buckets.iter().map(|(name, bucket)| (*name, bucket))
    }

    /// Number of present buckets
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when no context is available
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// New map holding only the requested buckets that are present
    #[must_use]
    pub fn subset(&self, names: &[BucketName]) -> Self {
        Self {
            buckets: self
                .buckets
                .iter()
                .filter(|(name, _)| names.contains(name))
                .map(|(name, bucket)| (*name, bucket.clone()))
                .collect(),
        }
    }

    /// Count of buckets with the given origin
    #[must_use]
    pub fn count_origin(&self, origin: Origin) -> usize {
        self.buckets.values().filter(|b| b.origin == origin).count()
    }
}
