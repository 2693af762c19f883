//! Normal-theory confidence intervals.
//!
//! Each score family assumes an appropriate sampling distribution:
//! proportions get Wilson intervals, means get t/z intervals, standard
//! deviations get two-sided chi-square intervals, correlations go through
//! the Fisher z-transform, Hanssen-Kuipers uses the Seaman variance over
//! the four cell counts, and the odds ratio uses Woolf's formula on the
//! log odds.

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};

use crate::types::{is_bad, is_eq, BAD_DATA, LARGE_SAMPLE_THRESHOLD};

/// A statistic value with its per-alpha confidence bounds.
///
/// Normal-theory bounds are allocated iff alpha values were requested;
/// bootstrap bounds iff the bootstrap was requested.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct CiValue {
    pub v: f64,
    /// Normal-theory lower/upper bounds, one slot per alpha.
    pub ncl: Vec<f64>,
    pub ncu: Vec<f64>,
    /// Bootstrap lower/upper bounds, one slot per alpha.
    pub bcl: Vec<f64>,
    pub bcu: Vec<f64>,
}

impl CiValue {
    pub fn new(n_alpha: usize) -> Self {
        Self {
            v: BAD_DATA,
            ncl: vec![BAD_DATA; n_alpha],
            ncu: vec![BAD_DATA; n_alpha],
            bcl: Vec::new(),
            bcu: Vec::new(),
        }
    }

    /// Add bootstrap bound slots.
    pub fn allocate_boot(&mut self, n_alpha: usize) {
        self.bcl = vec![BAD_DATA; n_alpha];
        self.bcu = vec![BAD_DATA; n_alpha];
    }

    pub fn set_bad_data(&mut self) {
        self.v = BAD_DATA;
        for b in self
            .ncl
            .iter_mut()
            .chain(self.ncu.iter_mut())
            .chain(self.bcl.iter_mut())
            .chain(self.bcu.iter_mut())
        {
            *b = BAD_DATA;
        }
    }
}

/// Standard normal quantile.
pub fn normal_quantile(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return BAD_DATA;
    }
    match Normal::new(0.0, 1.0) {
        Ok(d) => d.inverse_cdf(p),
        Err(_) => BAD_DATA,
    }
}

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(d) => d.cdf(z),
        Err(_) => BAD_DATA,
    }
}

/// Student's t quantile with `df` degrees of freedom.
pub fn students_t_quantile(p: f64, df: f64) -> f64 {
    if df <= 0.0 || !(0.0..=1.0).contains(&p) {
        return BAD_DATA;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(d) => d.inverse_cdf(p),
        Err(_) => BAD_DATA,
    }
}

/// Chi-square quantile with `df` degrees of freedom.
pub fn chi2_quantile(p: f64, df: f64) -> f64 {
    if df <= 0.0 || !(0.0..=1.0).contains(&p) {
        return BAD_DATA;
    }
    match ChiSquared::new(df) {
        Ok(d) => d.inverse_cdf(p),
        Err(_) => BAD_DATA,
    }
}

/// Two-sided critical values for a mean: normal z for large samples,
/// Student's t below [`LARGE_SAMPLE_THRESHOLD`].
pub fn mean_critical_values(alpha: f64, n: usize) -> (f64, f64) {
    if n >= LARGE_SAMPLE_THRESHOLD {
        (
            normal_quantile(alpha / 2.0),
            normal_quantile(1.0 - alpha / 2.0),
        )
    } else {
        let df = (n - 1) as f64;
        (
            students_t_quantile(alpha / 2.0, df),
            students_t_quantile(1.0 - alpha / 2.0, df),
        )
    }
}

/// Wilson interval for a proportion observed on `n` trials.
pub fn compute_proportion_ci(p: f64, n: usize, alpha: f64) -> (f64, f64) {
    if is_bad(p) || n == 0 {
        return (BAD_DATA, BAD_DATA);
    }
    let z = normal_quantile(1.0 - alpha / 2.0);
    if is_bad(z) {
        return (BAD_DATA, BAD_DATA);
    }
    let nf = n as f64;
    let denom = 1.0 + z * z / nf;
    let center = (p + z * z / (2.0 * nf)) / denom;
    let half = z * (p * (1.0 - p) / nf + z * z / (4.0 * nf * nf)).sqrt() / denom;
    ((center - half).max(0.0), (center + half).min(1.0))
}

/// t/z interval for a mean given the sample standard deviation.
pub fn compute_mean_ci(mean: f64, stdev: f64, n: usize, alpha: f64) -> (f64, f64) {
    if is_bad(mean) || is_bad(stdev) || n <= 1 {
        return (BAD_DATA, BAD_DATA);
    }
    let (cv_l, cv_u) = mean_critical_values(alpha, n);
    if is_bad(cv_l) || is_bad(cv_u) {
        return (BAD_DATA, BAD_DATA);
    }
    let se = stdev / (n as f64).sqrt();
    (mean + cv_l * se, mean + cv_u * se)
}

/// Two-sided chi-square interval for a standard deviation. Negative
/// round-off residuals come out missing.
pub fn compute_stdev_ci(stdev: f64, n: usize, alpha: f64) -> (f64, f64) {
    if is_bad(stdev) || n <= 1 {
        return (BAD_DATA, BAD_DATA);
    }
    let df = (n - 1) as f64;
    let cv_l = chi2_quantile(alpha / 2.0, df);
    let cv_u = chi2_quantile(1.0 - alpha / 2.0, df);
    if is_bad(cv_l) || is_bad(cv_u) || is_eq(cv_l, 0.0) || is_eq(cv_u, 0.0) {
        return (BAD_DATA, BAD_DATA);
    }
    let bound = |cv: f64| -> f64 {
        let v = df * stdev * stdev / cv;
        if v < 0.0 {
            BAD_DATA
        } else {
            v.sqrt()
        }
    };
    (bound(cv_u), bound(cv_l))
}

/// Fisher z-transform interval for a Pearson correlation. Requires `n > 3`.
pub fn compute_corr_ci(r: f64, n: usize, alpha: f64) -> (f64, f64) {
    if is_bad(r) || n <= 3 || r.abs() >= 1.0 {
        return (BAD_DATA, BAD_DATA);
    }
    let (cv_l, cv_u) = (
        normal_quantile(alpha / 2.0),
        normal_quantile(1.0 - alpha / 2.0),
    );
    if is_bad(cv_l) || is_bad(cv_u) {
        return (BAD_DATA, BAD_DATA);
    }
    let z = 0.5 * ((1.0 + r) / (1.0 - r)).ln();
    let se = 1.0 / ((n - 3) as f64).sqrt();
    let back = |zz: f64| ((2.0 * zz).exp() - 1.0) / ((2.0 * zz).exp() + 1.0);
    (back(z + cv_l * se), back(z + cv_u * se))
}

/// Seaman variance interval for the Hanssen-Kuipers discriminant, built
/// from the binomial variances of POD and POFD over the four cell counts.
pub fn compute_hk_ci(
    hk: f64,
    alpha: f64,
    fy_oy: u64,
    fy_on: u64,
    fn_oy: u64,
    fn_on: u64,
) -> (f64, f64) {
    if is_bad(hk) {
        return (BAD_DATA, BAD_DATA);
    }
    let oy = (fy_oy + fn_oy) as f64;
    let on = (fy_on + fn_on) as f64;
    if oy <= 0.0 || on <= 0.0 {
        return (BAD_DATA, BAD_DATA);
    }
    let h = fy_oy as f64 / oy;
    let f = fy_on as f64 / on;
    let var = h * (1.0 - h) / oy + f * (1.0 - f) / on;
    let z = normal_quantile(1.0 - alpha / 2.0);
    if is_bad(z) || var < 0.0 {
        return (BAD_DATA, BAD_DATA);
    }
    let half = z * var.sqrt();
    (hk - half, hk + half)
}

/// Woolf interval for the odds ratio: normal on the log odds with variance
/// `1/a + 1/b + 1/c + 1/d`.
pub fn compute_woolf_ci(
    odds: f64,
    alpha: f64,
    fy_oy: u64,
    fy_on: u64,
    fn_oy: u64,
    fn_on: u64,
) -> (f64, f64) {
    if is_bad(odds) || odds <= 0.0 {
        return (BAD_DATA, BAD_DATA);
    }
    if fy_oy == 0 || fy_on == 0 || fn_oy == 0 || fn_on == 0 {
        return (BAD_DATA, BAD_DATA);
    }
    let z = normal_quantile(1.0 - alpha / 2.0);
    if is_bad(z) {
        return (BAD_DATA, BAD_DATA);
    }
    let se = (1.0 / fy_oy as f64
        + 1.0 / fy_on as f64
        + 1.0 / fn_oy as f64
        + 1.0 / fn_on as f64)
        .sqrt();
    let log_odds = odds.ln();
    ((log_odds - z * se).exp(), (log_odds + z * se).exp())
}

/// Sample standard deviation from a running sum and sum of squares, guarded
/// against negative floating-point residuals.
pub fn compute_stdev(sum: f64, sum_sq: f64, n: usize) -> f64 {
    if n <= 1 {
        return BAD_DATA;
    }
    let nf = n as f64;
    let v = (sum_sq - sum * sum / nf) / (nf - 1.0);
    if v < 0.0 {
        BAD_DATA
    } else {
        v.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_quantile_symmetry() {
        let z = normal_quantile(0.975);
        assert!((z - 1.959964).abs() < 1e-4);
        assert!((normal_quantile(0.025) + z).abs() < 1e-9);
    }

    #[test]
    fn test_proportion_ci_contains_value() {
        let (lo, hi) = compute_proportion_ci(0.3, 100, 0.05);
        assert!(lo < 0.3 && 0.3 < hi);
        assert!(lo >= 0.0 && hi <= 1.0);
    }

    #[test]
    fn test_proportion_ci_extreme_p_stays_bounded() {
        let (lo, hi) = compute_proportion_ci(1.0, 50, 0.05);
        assert!(lo > 0.8 && lo < 1.0);
        assert!((hi - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_ci_small_sample_wider() {
        // Student's t inflates the small-sample interval.
        let (lo_small, hi_small) = compute_mean_ci(10.0, 2.0, 10, 0.05);
        let (lo_big, hi_big) = compute_mean_ci(10.0, 2.0, 1000, 0.05);
        assert!(lo_small < 10.0 && hi_small > 10.0);
        let width_small = (hi_small - lo_small) * (10.0f64).sqrt();
        let width_big = (hi_big - lo_big) * (1000.0f64).sqrt();
        assert!(width_small > width_big);
    }

    #[test]
    fn test_stdev_ci_brackets_estimate() {
        let (lo, hi) = compute_stdev_ci(2.0, 30, 0.05);
        assert!(lo < 2.0 && 2.0 < hi);
    }

    #[test]
    fn test_corr_ci_requires_n_gt_3() {
        assert_eq!(compute_corr_ci(0.5, 3, 0.05), (BAD_DATA, BAD_DATA));
        let (lo, hi) = compute_corr_ci(0.5, 50, 0.05);
        assert!(lo < 0.5 && 0.5 < hi);
        assert!(lo > -1.0 && hi < 1.0);
    }

    #[test]
    fn test_hk_ci_brackets() {
        // A strong table: POD 0.8, POFD 0.2.
        let (lo, hi) = compute_hk_ci(0.6, 0.05, 80, 20, 20, 80);
        assert!(lo < 0.6 && 0.6 < hi);
    }

    #[test]
    fn test_woolf_ci_brackets_odds() {
        let odds = (80.0 * 80.0) / (20.0 * 20.0);
        let (lo, hi) = compute_woolf_ci(odds, 0.05, 80, 20, 20, 80);
        assert!(lo < odds && odds < hi);
        assert!(lo > 0.0);
    }

    #[test]
    fn test_woolf_ci_zero_cell_missing() {
        assert_eq!(
            compute_woolf_ci(2.0, 0.05, 10, 0, 5, 5),
            (BAD_DATA, BAD_DATA)
        );
    }

    #[test]
    fn test_compute_stdev_guard() {
        assert!(is_bad(compute_stdev(5.0, 5.0, 1)));
        // Tiny negative residual from cancellation becomes missing, not NaN.
        let s = compute_stdev(3.0, 3.0 * 3.0 / 4.0 - 1e-13, 4);
        assert!(is_bad(s) || s >= 0.0);
        // Known case: values 1..5.
        let s = compute_stdev(15.0, 55.0, 5);
        assert!((s - (2.5f64).sqrt()).abs() < 1e-12);
    }
}
