//! Context coverage and next-pass selection

use osa_types::{BucketName, ContextBuckets, QualityDimension};
use serde::{Deserialize, Serialize};

/// How much of the four-bucket context is present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    /// Present buckets / 4, in `[0, 1]`
    pub ratio: f64,
    /// Buckets that are absent
    pub missing_areas: Vec<BucketName>,
}

/// Compute coverage; fallback buckets count as present
#[must_use]
pub fn coverage(buckets: &ContextBuckets) -> Coverage {
    let missing_areas: Vec<BucketName> = BucketName::ALL
        .into_iter()
        .filter(|b| !buckets.contains(*b))
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let ratio = buckets.len() as f64 / BucketName::ALL.len() as f64;
    Coverage {
        ratio,
        missing_areas,
    }
}

/// Buckets that feed a quality dimension
#[must_use]
pub fn buckets_for_dimension(dimension: QualityDimension) -> &'static [BucketName] {
    match dimension {
        QualityDimension::Specificity => &[BucketName::Content, BucketName::Analytics],
        QualityDimension::StackAlignment => &[BucketName::Experience, BucketName::Strategy],
        QualityDimension::MaturityFit => &[BucketName::Strategy],
        QualityDimension::MeasurementRigor => &[BucketName::Analytics],
        QualityDimension::Actionability => &[BucketName::Experience, BucketName::Content],
    }
}

/// Context subset for the next refinement pass
///
/// Union of the buckets feeding the lowest-scoring dimensions and the
/// missing areas, restricted to buckets present in `buckets`. When that
/// union is empty the full map is returned, so the result is never empty
/// unless `buckets` is.
#[must_use]
pub fn select_context_for_next_pass(
    missing_areas: &[BucketName],
    lowest_dimensions: &[QualityDimension],
    buckets: &ContextBuckets,
) -> ContextBuckets {
    let mut wanted: Vec<BucketName> = lowest_dimensions
        .iter()
        .flat_map(|d| buckets_for_dimension(*d).iter().copied())
        .chain(missing_areas.iter().copied())
        .collect();
    wanted.sort();
    wanted.dedup();

    let subset = buckets.subset(&wanted);
    if subset.is_empty() {
        buckets.clone()
    } else {
        subset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osa_types::ContextBucket;
    use serde_json::json;

    fn buckets(names: &[BucketName]) -> ContextBuckets {
        ContextBuckets::from_entries(
            names
                .iter()
                .map(|n| (*n, ContextBucket::live(json!({"k": n.as_str()})))),
        )
    }

    #[test]
    fn full_coverage() {
        let cov = coverage(&buckets(&BucketName::ALL));
        assert!((cov.ratio - 1.0).abs() < f64::EPSILON);
        assert!(cov.missing_areas.is_empty());
    }

    #[test]
    fn partial_coverage() {
        let cov = coverage(&buckets(&[BucketName::Content]));
        assert!((cov.ratio - 0.25).abs() < f64::EPSILON);
        assert_eq!(
            cov.missing_areas,
            vec![BucketName::Analytics, BucketName::Experience, BucketName::Strategy]
        );
    }

    #[test]
    fn empty_coverage() {
        let cov = coverage(&ContextBuckets::empty());
        assert_eq!(cov.ratio, 0.0);
        assert_eq!(cov.missing_areas.len(), 4);
    }

    #[test]
    fn selection_targets_weak_dimension() {
        let all = buckets(&BucketName::ALL);
        let next = select_context_for_next_pass(&[], &[QualityDimension::MeasurementRigor], &all);
        assert_eq!(next.names(), vec![BucketName::Analytics]);
    }

    #[test]
    fn selection_adds_missing_areas() {
        let all = buckets(&BucketName::ALL);
        let next = select_context_for_next_pass(
            &[BucketName::Content],
            &[QualityDimension::MaturityFit],
            &all,
        );
        assert_eq!(next.names(), vec![BucketName::Content, BucketName::Strategy]);
    }

    #[test]
    fn selection_falls_back_to_everything() {
        let only_content = buckets(&[BucketName::Content]);
        let next = select_context_for_next_pass(&[], &[QualityDimension::MaturityFit], &only_content);
        assert_eq!(next, only_content);
    }

    #[test]
    fn selection_of_empty_is_empty() {
        let next = select_context_for_next_pass(
            &[BucketName::Analytics],
            &QualityDimension::ALL,
            &ContextBuckets::empty(),
        );
        assert!(next.is_empty());
    }
}
