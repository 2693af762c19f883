//! Horizontal and vertical interpolation operators.
//!
//! The horizontal operators consume a field, the lower-left corner of a
//! `width x width` footprint, and a validity-fraction threshold; missing
//! samples are skipped, and the result is missing when too few valid
//! samples remain. The single vertical operator interpolates in log
//! pressure.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};
use crate::field::RasterField;
use crate::types::{is_bad, BAD_DATA};

/// Exponent used by the distance-weighted mean.
pub const DW_MEAN_POW: i32 = 2;

/// Distance below which the distance-weighted mean returns the sample
/// value exactly.
const DW_MEAN_SINGULAR_DIST: f64 = 0.001;

/// Horizontal interpolation methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpMethod {
    Min,
    Max,
    Median,
    UwMean,
    DwMean,
    LsFit,
    Bilin,
}

impl InterpMethod {
    pub fn abbr(self) -> &'static str {
        match self {
            InterpMethod::Min => "MIN",
            InterpMethod::Max => "MAX",
            InterpMethod::Median => "MEDIAN",
            InterpMethod::UwMean => "UW_MEAN",
            InterpMethod::DwMean => "DW_MEAN",
            InterpMethod::LsFit => "LS_FIT",
            InterpMethod::Bilin => "BILIN",
        }
    }
}

impl fmt::Display for InterpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbr())
    }
}

impl FromStr for InterpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MIN" => Ok(InterpMethod::Min),
            "MAX" => Ok(InterpMethod::Max),
            "MEDIAN" => Ok(InterpMethod::Median),
            "UW_MEAN" => Ok(InterpMethod::UwMean),
            "DW_MEAN" => Ok(InterpMethod::DwMean),
            "LS_FIT" => Ok(InterpMethod::LsFit),
            "BILIN" => Ok(InterpMethod::Bilin),
            other => Err(format!("unknown interpolation method {other:?}")),
        }
    }
}

/// Lower-left corner of the interpolation footprint around fractional
/// observation coordinates. Odd widths center on the nearest grid point;
/// even widths straddle the observation.
pub fn footprint_ll(obs_x: f64, obs_y: f64, width: usize) -> (i64, i64) {
    let w = width as i64;
    if w % 2 == 1 {
        (
            obs_x.round() as i64 - (w - 1) / 2,
            obs_y.round() as i64 - (w - 1) / 2,
        )
    } else {
        (
            obs_x.floor() as i64 - (w / 2 - 1),
            obs_y.floor() as i64 - (w / 2 - 1),
        )
    }
}

/// Collect the valid samples of a footprint. Returns the values and the
/// valid count; off-grid and missing cells are skipped.
fn footprint_samples(
    field: &RasterField,
    x_ll: i64,
    y_ll: i64,
    width: usize,
    mut visit: impl FnMut(i64, i64, f64),
) -> usize {
    let w = width as i64;
    let mut count = 0;
    for x in x_ll..x_ll + w {
        if x < 0 || x >= field.nx() as i64 {
            continue;
        }
        for y in y_ll..y_ll + w {
            if y < 0 || y >= field.ny() as i64 {
                continue;
            }
            if field.is_bad(x as usize, y as usize) {
                continue;
            }
            visit(x, y, field.get(x as usize, y as usize));
            count += 1;
        }
    }
    count
}

#[inline]
fn enough_valid(count: usize, width: usize, vld_thresh: f64) -> bool {
    count > 0 && (count as f64) / ((width * width) as f64) >= vld_thresh
}

/// Minimum over the footprint.
pub fn interp_min(field: &RasterField, x_ll: i64, y_ll: i64, width: usize, vld_thresh: f64) -> f64 {
    let mut min_v = f64::INFINITY;
    let count = footprint_samples(field, x_ll, y_ll, width, |_, _, v| {
        if v < min_v {
            min_v = v;
        }
    });
    if enough_valid(count, width, vld_thresh) {
        min_v
    } else {
        BAD_DATA
    }
}

/// Maximum over the footprint.
pub fn interp_max(field: &RasterField, x_ll: i64, y_ll: i64, width: usize, vld_thresh: f64) -> f64 {
    let mut max_v = f64::NEG_INFINITY;
    let count = footprint_samples(field, x_ll, y_ll, width, |_, _, v| {
        if v > max_v {
            max_v = v;
        }
    });
    if enough_valid(count, width, vld_thresh) {
        max_v
    } else {
        BAD_DATA
    }
}

/// Median over the footprint.
pub fn interp_median(
    field: &RasterField,
    x_ll: i64,
    y_ll: i64,
    width: usize,
    vld_thresh: f64,
) -> f64 {
    let mut data = Vec::with_capacity(width * width);
    let count = footprint_samples(field, x_ll, y_ll, width, |_, _, v| data.push(v));
    if !enough_valid(count, width, vld_thresh) {
        return BAD_DATA;
    }
    data.sort_by(f64::total_cmp);
    percentile_sorted(&data, 0.50)
}

/// Unweighted mean over the footprint.
pub fn interp_uw_mean(
    field: &RasterField,
    x_ll: i64,
    y_ll: i64,
    width: usize,
    vld_thresh: f64,
) -> f64 {
    let mut sum = 0.0;
    let count = footprint_samples(field, x_ll, y_ll, width, |_, _, v| sum += v);
    if enough_valid(count, width, vld_thresh) {
        sum / count as f64
    } else {
        BAD_DATA
    }
}

/// Inverse-distance-weighted mean (Shepard's method) at `(obs_x, obs_y)`.
/// A sample within [`DW_MEAN_SINGULAR_DIST`] of the query point is returned
/// exactly.
pub fn interp_dw_mean(
    field: &RasterField,
    x_ll: i64,
    y_ll: i64,
    width: usize,
    obs_x: f64,
    obs_y: f64,
    pow: i32,
    vld_thresh: f64,
) -> f64 {
    let mut data = Vec::with_capacity(width * width);
    let count = footprint_samples(field, x_ll, y_ll, width, |x, y, v| {
        let dist = ((obs_x - x as f64).powi(2) + (obs_y - y as f64).powi(2)).sqrt();
        data.push((dist, v));
    });
    if !enough_valid(count, width, vld_thresh) {
        return BAD_DATA;
    }

    if let Some(&(_, v)) = data.iter().find(|(d, _)| *d <= DW_MEAN_SINGULAR_DIST) {
        return v;
    }

    let wght_sum: f64 = data.iter().map(|(d, _)| d.powi(-pow)).sum();
    data.iter()
        .map(|(d, v)| d.powi(-pow) / wght_sum * v)
        .sum()
}

/// Least-squares plane `z = A*u + B*v + C` over the footprint, evaluated at
/// the query point, with `(u, v)` centered on the footprint center.
/// Requires `width >= 2`.
pub fn interp_ls_fit(
    field: &RasterField,
    x_ll: i64,
    y_ll: i64,
    width: usize,
    obs_x: f64,
    obs_y: f64,
    vld_thresh: f64,
) -> Result<f64> {
    if width < 2 {
        return Err(VerifyError::InterpWidthTooSmall {
            method: InterpMethod::LsFit.to_string(),
            width,
            min: 2,
        });
    }

    let n = width as f64;
    let n2 = n * n;
    let alpha = n2 * (n2 - 1.0) / 12.0;
    let beta = 0.5 * (n - 1.0);
    let x_center = x_ll as f64 + beta;
    let y_center = y_ll as f64 + beta;

    let mut suz = 0.0;
    let mut svz = 0.0;
    let mut sz = 0.0;
    let count = footprint_samples(field, x_ll, y_ll, width, |x, y, z| {
        let u = x as f64 - x_center;
        let v = y as f64 - y_center;
        suz += u * z;
        svz += v * z;
        sz += z;
    });
    if !enough_valid(count, width, vld_thresh) {
        return Ok(BAD_DATA);
    }

    let a = suz / alpha;
    let b = svz / alpha;
    let c = sz / n2;
    Ok(a * (obs_x - x_center) + b * (obs_y - y_center) + c)
}

/// Classic 2x2 bilinear interpolation at `(obs_x, obs_y)`. Missing when any
/// corner is off-grid or missing.
pub fn interp_bilin(field: &RasterField, obs_x: f64, obs_y: f64) -> f64 {
    let x0 = obs_x.floor() as i64;
    let y0 = obs_y.floor() as i64;
    if x0 < 0 || y0 < 0 || x0 + 1 >= field.nx() as i64 || y0 + 1 >= field.ny() as i64 {
        return BAD_DATA;
    }
    let (xu, yu) = (x0 as usize, y0 as usize);
    let corners = [
        field.get(xu, yu),
        field.get(xu + 1, yu),
        field.get(xu, yu + 1),
        field.get(xu + 1, yu + 1),
    ];
    if corners.iter().any(|&v| is_bad(v)) {
        return BAD_DATA;
    }
    let fx = obs_x - x0 as f64;
    let fy = obs_y - y0 as f64;
    corners[0] * (1.0 - fx) * (1.0 - fy)
        + corners[1] * fx * (1.0 - fy)
        + corners[2] * (1.0 - fx) * fy
        + corners[3] * fx * fy
}

/// Apply a horizontal method at fractional observation coordinates,
/// resolving the footprint origin by the odd/even width rule.
pub fn horizontal_interp(
    field: &RasterField,
    obs_x: f64,
    obs_y: f64,
    method: InterpMethod,
    width: usize,
    vld_thresh: f64,
) -> Result<f64> {
    let (x_ll, y_ll) = footprint_ll(obs_x, obs_y, width);
    Ok(match method {
        InterpMethod::Min => interp_min(field, x_ll, y_ll, width, vld_thresh),
        InterpMethod::Max => interp_max(field, x_ll, y_ll, width, vld_thresh),
        InterpMethod::Median => interp_median(field, x_ll, y_ll, width, vld_thresh),
        InterpMethod::UwMean => interp_uw_mean(field, x_ll, y_ll, width, vld_thresh),
        InterpMethod::DwMean => interp_dw_mean(
            field, x_ll, y_ll, width, obs_x, obs_y, DW_MEAN_POW, vld_thresh,
        ),
        InterpMethod::LsFit => {
            interp_ls_fit(field, x_ll, y_ll, width, obs_x, obs_y, vld_thresh)?
        }
        InterpMethod::Bilin => interp_bilin(field, obs_x, obs_y),
    })
}

/// Interpolate between values `v1` at pressure `p1` and `v2` at `p2` to the
/// target pressure, linearly in log pressure. All pressures must be
/// strictly positive.
pub fn vertical_pinterp(v1: f64, p1: f64, v2: f64, p2: f64, to_p: f64) -> Result<f64> {
    if p1 <= 0.0 || p2 <= 0.0 || to_p <= 0.0 {
        return Err(VerifyError::NonPositivePressure {
            p1,
            p2,
            target: to_p,
        });
    }
    Ok(v1 + (v2 - v1) * (p1 / to_p).ln() / (p1 / p2).ln())
}

/// Percentile of an ascending-sorted slice with linear interpolation
/// between order statistics.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return BAD_DATA;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(nx: usize, ny: usize) -> RasterField {
        let values: Vec<f64> = (0..nx * ny)
            .map(|n| (n % nx) as f64 + 10.0 * (n / nx) as f64)
            .collect();
        RasterField::from_values(nx, ny, &values)
    }

    #[test]
    fn test_footprint_origin_rule() {
        // Odd width centers on the nearest grid point.
        assert_eq!(footprint_ll(5.4, 5.4, 3), (4, 4));
        assert_eq!(footprint_ll(5.6, 5.6, 3), (5, 5));
        // Even width straddles the observation.
        assert_eq!(footprint_ll(5.4, 5.4, 2), (5, 5));
        assert_eq!(footprint_ll(5.9, 5.9, 4), (4, 4));
    }

    #[test]
    fn test_min_max_median_mean() {
        let field = gradient(6, 6);
        // 3x3 footprint at (1..4, 1..4): values x + 10y.
        let min_v = interp_min(&field, 1, 1, 3, 1.0);
        let max_v = interp_max(&field, 1, 1, 3, 1.0);
        let med_v = interp_median(&field, 1, 1, 3, 1.0);
        let mean_v = interp_uw_mean(&field, 1, 1, 3, 1.0);
        let tol = field.m();
        assert!((min_v - 11.0).abs() <= tol);
        assert!((max_v - 33.0).abs() <= tol);
        assert!((med_v - 22.0).abs() <= tol);
        assert!((mean_v - 22.0).abs() <= tol);
    }

    #[test]
    fn test_validity_threshold_rejects_sparse_window() {
        let mut field = gradient(4, 4);
        for x in 0..4 {
            for y in 0..4 {
                if x > 0 || y > 0 {
                    field.put(BAD_DATA, x, y);
                }
            }
        }
        field.calc_moments();
        // One valid sample in a 3x3 window is 1/9 of it.
        assert!(is_bad(interp_uw_mean(&field, 0, 0, 3, 0.5)));
        assert!(!is_bad(interp_uw_mean(&field, 0, 0, 3, 0.1)));
    }

    #[test]
    fn test_dw_mean_returns_exact_on_grid_point() {
        let field = gradient(6, 6);
        let v = interp_dw_mean(&field, 1, 1, 3, 2.0, 2.0, DW_MEAN_POW, 1.0);
        assert!((v - field.get(2, 2)).abs() < 1e-9);
    }

    #[test]
    fn test_dw_mean_weights_follow_distance() {
        let field = gradient(8, 8);
        // Off-center query: result must land between the footprint extremes
        // and closer to the near corner's value.
        let v = interp_dw_mean(&field, 2, 2, 3, 2.2, 2.2, DW_MEAN_POW, 1.0);
        let near = field.get(2, 2);
        let far = field.get(4, 4);
        assert!(v > near && v < far);
        assert!((v - near).abs() < (v - far).abs());
    }

    #[test]
    fn test_ls_fit_recovers_plane() {
        // Exact plane: z = 2x + 3y + 5 quantized finely.
        let values: Vec<f64> = (0..100)
            .map(|n| 2.0 * (n % 10) as f64 + 3.0 * (n / 10) as f64 + 5.0)
            .collect();
        let field = RasterField::from_values(10, 10, &values);
        let v = interp_ls_fit(&field, 2, 2, 3, 3.5, 3.25, 1.0).unwrap();
        let expect = 2.0 * 3.5 + 3.0 * 3.25 + 5.0;
        assert!((v - expect).abs() < 0.05, "{v} vs {expect}");
    }

    #[test]
    fn test_ls_fit_width_one_rejected() {
        let field = gradient(4, 4);
        assert!(matches!(
            interp_ls_fit(&field, 0, 0, 1, 0.5, 0.5, 1.0),
            Err(VerifyError::InterpWidthTooSmall { .. })
        ));
    }

    #[test]
    fn test_bilinear_center_of_cell() {
        let field = RasterField::from_values(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        let v = interp_bilin(&field, 0.5, 0.5);
        assert!((v - 1.5).abs() <= field.m() + 1e-9);
        // Off-grid corner.
        assert!(is_bad(interp_bilin(&field, 1.5, 0.5)));
    }

    #[test]
    fn test_bilinear_missing_corner() {
        let mut field = RasterField::from_values(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        field.put(BAD_DATA, 1, 1);
        field.calc_moments();
        assert!(is_bad(interp_bilin(&field, 0.5, 0.5)));
    }

    #[test]
    fn test_log_pressure_interp() {
        // Halfway in log pressure between 1000 and 500 hPa.
        let v = vertical_pinterp(10.0, 1000.0, 20.0, 500.0, 707.107).unwrap();
        assert!((v - 15.0).abs() < 1e-4, "{v}");
    }

    #[test]
    fn test_log_pressure_rejects_non_positive() {
        assert!(vertical_pinterp(1.0, -1000.0, 2.0, 500.0, 700.0).is_err());
        assert!(vertical_pinterp(1.0, 1000.0, 2.0, 0.0, 700.0).is_err());
    }

    #[test]
    fn test_percentile_sorted() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&data, 0.0), 1.0);
        assert_eq!(percentile_sorted(&data, 0.5), 3.0);
        assert_eq!(percentile_sorted(&data, 1.0), 5.0);
        assert!((percentile_sorted(&data, 0.25) - 2.0).abs() < 1e-12);
    }
}
