//! Quality scores
//!
//! A [`QualityScore`] is computed once per generated document and never
//! mutated afterwards. `overall` is the unweighted arithmetic mean of the five
//! dimensions.

use crate::context::BucketName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of every dimension
pub const MAX_DIMENSION_SCORE: f64 = 5.0;

/// Scored quality dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityDimension {
    /// Concrete, organization-specific content
    Specificity,
    /// Fit with the declared platform stack
    StackAlignment,
    /// Fit with the organization's maturity phase
    MaturityFit,
    /// KPIs, targets and measurement cadence
    MeasurementRigor,
    /// Concrete next steps
    Actionability,
}

impl QualityDimension {
    /// All dimensions in canonical order
    pub const ALL: [QualityDimension; 5] = [
        QualityDimension::Specificity,
        QualityDimension::StackAlignment,
        QualityDimension::MaturityFit,
        QualityDimension::MeasurementRigor,
        QualityDimension::Actionability,
    ];

    /// Stable snake_case name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityDimension::Specificity => "specificity",
            QualityDimension::StackAlignment => "stack_alignment",
            QualityDimension::MaturityFit => "maturity_fit",
            QualityDimension::MeasurementRigor => "measurement_rigor",
            QualityDimension::Actionability => "actionability",
        }
    }
}

impl fmt::Display for QualityDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw dimension values, each in `[0, 5]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DimensionScores {
    /// Specificity
    pub specificity: f64,
    /// Stack alignment
    pub stack_alignment: f64,
    /// Maturity fit
    pub maturity_fit: f64,
    /// Measurement rigor
    pub measurement_rigor: f64,
    /// Actionability
    pub actionability: f64,
}

impl DimensionScores {
    /// Value of one dimension
    #[inline]
    #[must_use]
    pub fn get(&self, dimension: QualityDimension) -> f64 {
        match dimension {
            QualityDimension::Specificity => self.specificity,
            QualityDimension::StackAlignment => self.stack_alignment,
            QualityDimension::MaturityFit => self.maturity_fit,
            QualityDimension::MeasurementRigor => self.measurement_rigor,
            QualityDimension::Actionability => self.actionability,
        }
    }

    /// Copy clamped into `[0, 5]`; NaN becomes 0
    #[must_use]
    pub fn clamped(self) -> Self {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, MAX_DIMENSION_SCORE) };
        Self {
            specificity: clamp(self.specificity),
            stack_alignment: clamp(self.stack_alignment),
            maturity_fit: clamp(self.maturity_fit),
            measurement_rigor: clamp(self.measurement_rigor),
            actionability: clamp(self.actionability),
        }
    }

    /// Unweighted arithmetic mean of the five dimensions
    #[inline]
    #[must_use]
    pub fn mean(&self) -> f64 {
        (self.specificity
            + self.stack_alignment
            + self.maturity_fit
            + self.measurement_rigor
            + self.actionability)
            / 5.0
    }
}

/// Immutable quality assessment of one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    dimensions: DimensionScores,
    overall: f64,
    issues: Vec<String>,
    missing_areas: Vec<BucketName>,
    recommendations: Vec<String>,
}

impl QualityScore {
    /// Assemble a score; dimensions are clamped and `overall` derived
    #[must_use]
    pub fn new(
        dimensions: DimensionScores,
        issues: Vec<String>,
        missing_areas: Vec<BucketName>,
        recommendations: Vec<String>,
    ) -> Self {
        let dimensions = dimensions.clamped();
        Self {
            overall: dimensions.mean(),
            dimensions,
            issues,
            missing_areas,
            recommendations,
        }
    }

    /// Dimension values
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> &DimensionScores {
        &self.dimensions
    }

    /// Value of one dimension
    #[inline]
    #[must_use]
    pub fn dimension(&self, dimension: QualityDimension) -> f64 {
        self.dimensions.get(dimension)
    }

    /// Mean of the five dimensions
    #[inline]
    #[must_use]
    pub fn overall(&self) -> f64 {
        self.overall
    }

    /// Issues found
    #[inline]
    #[must_use]
    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    /// Supplied buckets the document does not draw on
    #[inline]
    #[must_use]
    pub fn missing_areas(&self) -> &[BucketName] {
        &self.missing_areas
    }

    /// Improvement recommendations
    #[inline]
    #[must_use]
    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// Dimensions sharing the minimum value
    #[must_use]
    pub fn lowest_dimensions(&self) -> Vec<QualityDimension> {
        let min = QualityDimension::ALL
            .iter()
            .map(|d| self.dimension(*d))
            .fold(f64::INFINITY, f64::min);
        QualityDimension::ALL
            .into_iter()
            .filter(|d| (self.dimension(*d) - min).abs() < f64::EPSILON)
            .collect()
    }

    /// Dimensions strictly below `threshold`
    #[must_use]
    pub fn dimensions_below(&self, threshold: f64) -> Vec<QualityDimension> {
        QualityDimension::ALL
            .into_iter()
            .filter(|d| self.dimension(*d) < threshold)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(values: [f64; 5]) -> DimensionScores {
        DimensionScores {
            specificity: values[0],
            stack_alignment: values[1],
            maturity_fit: values[2],
            measurement_rigor: values[3],
            actionability: values[4],
        }
    }

    #[test]
    fn overall_is_unweighted_mean() {
        let score = QualityScore::new(dims([1.0, 2.0, 3.0, 4.0, 5.0]), vec![], vec![], vec![]);
        assert!((score.overall() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dimensions_are_clamped() {
        let score = QualityScore::new(dims([-1.0, 9.0, f64::NAN, 2.5, 2.5]), vec![], vec![], vec![]);
        assert_eq!(score.dimension(QualityDimension::Specificity), 0.0);
        assert_eq!(score.dimension(QualityDimension::StackAlignment), 5.0);
        assert_eq!(score.dimension(QualityDimension::MaturityFit), 0.0);
        assert!((score.overall() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lowest_dimensions_returns_ties() {
        let score = QualityScore::new(dims([2.0, 4.0, 2.0, 3.0, 5.0]), vec![], vec![], vec![]);
        assert_eq!(
            score.lowest_dimensions(),
            vec![QualityDimension::Specificity, QualityDimension::MaturityFit]
        );
    }

    #[test]
    fn dimensions_below_threshold() {
        let score = QualityScore::new(dims([3.4, 3.5, 3.6, 0.0, 5.0]), vec![], vec![], vec![]);
        assert_eq!(
            score.dimensions_below(3.5),
            vec![QualityDimension::Specificity, QualityDimension::MeasurementRigor]
        );
    }
}
