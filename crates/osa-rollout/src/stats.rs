//! Two-proportion significance test

use serde::{Deserialize, Serialize};

/// Outcome of a two-proportion z-test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZTest {
    /// z statistic (treatment minus control)
    pub z: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

impl ZTest {
    /// True when `p_value < alpha`
    #[inline]
    #[must_use]
    pub fn significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Pooled two-proportion z-test on success counts
///
/// Returns `z = 0, p = 1` when either sample is empty or the pooled variance
/// is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn two_proportion_z_test(
    control_successes: u64,
    control_total: u64,
    treatment_successes: u64,
    treatment_total: u64,
) -> ZTest {
    let inconclusive = ZTest { z: 0.0, p_value: 1.0 };
    if control_total == 0 || treatment_total == 0 {
        return inconclusive;
    }

    let (n1, n2) = (control_total as f64, treatment_total as f64);
    let p1 = control_successes as f64 / n1;
    let p2 = treatment_successes as f64 / n2;
    let pooled = (control_successes + treatment_successes) as f64 / (n1 + n2);
    let se = (pooled * (1.0 - pooled) * (1.0 / n1 + 1.0 / n2)).sqrt();
    if se <= f64::EPSILON {
        return inconclusive;
    }

    let z = (p2 - p1) / se;
    let p_value = (2.0 * (1.0 - normal_cdf(z.abs()))).clamp(0.0, 1.0);
    ZTest { z, p_value }
}

/// Standard normal CDF
#[must_use]
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Error function (Abramowitz & Stegun 7.1.26, |error| < 1.5e-7)
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-4);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 1e-4);
    }

    #[test]
    fn identical_rates_are_not_significant() {
        let test = two_proportion_z_test(80, 100, 80, 100);
        assert!(test.z.abs() < 1e-12);
        assert!(!test.significant(0.05));
    }

    #[test]
    fn large_difference_is_significant() {
        // 50% vs 65% on 1000 samples each: z ≈ 6.8
        let test = two_proportion_z_test(500, 1000, 650, 1000);
        assert!(test.z > 6.0);
        assert!(test.significant(0.05));
    }

    #[test]
    fn known_value() {
        // 40/100 vs 55/100: pooled 0.475, se ≈ 0.0706, z ≈ 2.124, p ≈ 0.0337
        let test = two_proportion_z_test(40, 100, 55, 100);
        assert!((test.z - 2.124).abs() < 0.01);
        assert!((test.p_value - 0.0337).abs() < 0.002);
    }

    #[test]
    fn empty_samples_are_inconclusive() {
        let test = two_proportion_z_test(0, 0, 5, 10);
        assert_eq!(test.p_value, 1.0);
        let all_success = two_proportion_z_test(10, 10, 10, 10);
        assert_eq!(all_success.p_value, 1.0);
    }
}
