//! Neighborhood verification (NBRCTS / NBRCNT) over fractional-coverage
//! fields.

use crate::error::{Result, VerifyError};
use crate::field::{fractional_coverage, RasterField};
use crate::types::{is_bad, is_eq, Threshold, BAD_DATA};

use super::ci::CiValue;
use super::cts::CtsInfo;

/// Neighborhood categorical statistics: a 2x2 table built by thresholding
/// the coverage fields.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NbrCtsInfo {
    pub width: usize,
    pub raw_fcst_thresh: Threshold,
    pub raw_obs_thresh: Threshold,
    pub frac_thresh: Threshold,
    pub cts_info: CtsInfo,
}

impl NbrCtsInfo {
    pub fn new(
        width: usize,
        raw_fcst_thresh: Threshold,
        raw_obs_thresh: Threshold,
        frac_thresh: Threshold,
        alpha: &[f64],
    ) -> Self {
        Self {
            width,
            raw_fcst_thresh,
            raw_obs_thresh,
            frac_thresh,
            cts_info: CtsInfo::new(frac_thresh, frac_thresh, alpha),
        }
    }
}

/// Neighborhood continuous statistics: fractions Brier score and fractions
/// skill score.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NbrCntInfo {
    pub width: usize,
    pub raw_fcst_thresh: Threshold,
    pub raw_obs_thresh: Threshold,
    pub alpha: Vec<f64>,

    pub n: usize,
    pub ffbar: f64,
    pub oobar: f64,
    pub fobar: f64,

    pub fbs: CiValue,
    pub fss: CiValue,
}

/// Number of bootstrap-resampled statistics per block.
pub const N_NBRCNT_STATS: usize = 2;

impl NbrCntInfo {
    pub fn new(
        width: usize,
        raw_fcst_thresh: Threshold,
        raw_obs_thresh: Threshold,
        alpha: &[f64],
    ) -> Self {
        Self {
            width,
            raw_fcst_thresh,
            raw_obs_thresh,
            alpha: alpha.to_vec(),
            n: 0,
            ffbar: BAD_DATA,
            oobar: BAD_DATA,
            fobar: BAD_DATA,
            fbs: CiValue::new(alpha.len()),
            fss: CiValue::new(alpha.len()),
        }
    }

    pub fn allocate_boot(&mut self) {
        let n = self.alpha.len();
        self.fbs.allocate_boot(n);
        self.fss.allocate_boot(n);
    }

    /// FBS and FSS from the accumulated product means.
    pub fn compute_stats(&mut self) {
        if self.n == 0 {
            self.fbs.v = BAD_DATA;
            self.fss.v = BAD_DATA;
            return;
        }
        self.fbs.v = self.ffbar + self.oobar - 2.0 * self.fobar;
        let den = self.ffbar + self.oobar;
        self.fss.v = if is_eq(den, 0.0) {
            BAD_DATA
        } else {
            1.0 - self.fbs.v / den
        };
    }

    pub fn stat_values(&self) -> [f64; N_NBRCNT_STATS] {
        [self.fbs.v, self.fss.v]
    }

    pub fn set_boot_bounds(&mut self, i_stat: usize, i_alpha: usize, lower: f64, upper: f64) {
        let v = if i_stat == 0 { &mut self.fbs } else { &mut self.fss };
        v.bcl[i_alpha] = lower;
        v.bcu[i_alpha] = upper;
    }
}

/// Accumulate the neighborhood product means from coverage pair values
/// selected by `indices`.
pub fn compute_nbrcntinfo(
    f: &[f64],
    o: &[f64],
    indices: &[usize],
    nbrcnt_flag: bool,
    info: &mut NbrCntInfo,
) -> Result<()> {
    if f.len() != o.len() || f.is_empty() {
        return Err(VerifyError::PairLengthMismatch {
            f_len: f.len(),
            o_len: o.len(),
        });
    }

    let mut ff_sum = 0.0;
    let mut oo_sum = 0.0;
    let mut fo_sum = 0.0;
    for &j in indices {
        ff_sum += f[j] * f[j];
        oo_sum += o[j] * o[j];
        fo_sum += f[j] * o[j];
    }

    info.n = indices.len();
    if info.n > 0 {
        let n = info.n as f64;
        info.ffbar = ff_sum / n;
        info.oobar = oo_sum / n;
        info.fobar = fo_sum / n;
    }

    if nbrcnt_flag {
        info.compute_stats();
    }
    Ok(())
}

/// Matched coverage values from a forecast/observation field pair: the
/// inputs to both neighborhood score families.
pub struct CoveragePairs {
    pub f: Vec<f64>,
    pub o: Vec<f64>,
}

/// Replace the raw fields with their fractional-coverage counterparts at
/// `width` and the raw thresholds, then collect the cells where both
/// coverages are valid.
pub fn coverage_pairs(
    fcst: &RasterField,
    obs: &RasterField,
    width: usize,
    raw_fcst_thresh: Threshold,
    raw_obs_thresh: Threshold,
    vld_thresh: f64,
) -> Result<CoveragePairs> {
    if fcst.nx() != obs.nx() || fcst.ny() != obs.ny() {
        return Err(VerifyError::GridMismatch {
            nx1: fcst.nx(),
            ny1: fcst.ny(),
            nx2: obs.nx(),
            ny2: obs.ny(),
        });
    }

    let f_cov = fractional_coverage(fcst, width, raw_fcst_thresh, vld_thresh)?;
    let o_cov = fractional_coverage(obs, width, raw_obs_thresh, vld_thresh)?;

    let mut f = Vec::new();
    let mut o = Vec::new();
    for y in 0..fcst.ny() {
        for x in 0..fcst.nx() {
            let fv = f_cov.get(x, y);
            let ov = o_cov.get(x, y);
            if is_bad(fv) || is_bad(ov) {
                continue;
            }
            f.push(fv);
            o.push(ov);
        }
    }
    Ok(CoveragePairs { f, o })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::cts::compute_ctsinfo;
    use crate::types::ThreshCmp;

    fn step_field(nx: usize, ny: usize, split_x: usize) -> RasterField {
        let values: Vec<f64> = (0..nx * ny)
            .map(|n| if n % nx >= split_x { 10.0 } else { 0.0 })
            .collect();
        RasterField::from_values(nx, ny, &values)
    }

    #[test]
    fn test_identical_fields_perfect_fss() {
        let field = step_field(12, 12, 6);
        let t = Threshold::new(ThreshCmp::Gt, 5.0);
        let pairs = coverage_pairs(&field, &field, 3, t, t, 0.0).unwrap();

        let mut info = NbrCntInfo::new(3, t, t, &[]);
        let idx: Vec<usize> = (0..pairs.f.len()).collect();
        compute_nbrcntinfo(&pairs.f, &pairs.o, &idx, true, &mut info).unwrap();
        assert!(info.fbs.v.abs() < 1e-9, "FBS {}", info.fbs.v);
        assert!((info.fss.v - 1.0).abs() < 1e-9, "FSS {}", info.fss.v);
    }

    #[test]
    fn test_displaced_fields_partial_skill() {
        let fcst = step_field(16, 16, 7);
        let obs = step_field(16, 16, 9);
        let t = Threshold::new(ThreshCmp::Gt, 5.0);

        // A wider neighborhood forgives displacement: FSS must not drop.
        let mut prev = -1.0;
        for width in [1usize, 5, 9] {
            let pairs = coverage_pairs(&fcst, &obs, width, t, t, 0.0).unwrap();
            let mut info = NbrCntInfo::new(width, t, t, &[]);
            let idx: Vec<usize> = (0..pairs.f.len()).collect();
            compute_nbrcntinfo(&pairs.f, &pairs.o, &idx, true, &mut info).unwrap();
            assert!(
                info.fss.v >= prev - 1e-9,
                "FSS at width {width} regressed: {} < {prev}",
                info.fss.v
            );
            prev = info.fss.v;
        }
    }

    #[test]
    fn test_nbrcts_from_coverage() {
        let fcst = step_field(10, 10, 5);
        let obs = step_field(10, 10, 5);
        let raw = Threshold::new(ThreshCmp::Gt, 5.0);
        let frac = Threshold::new(ThreshCmp::Ge, 0.5);
        let pairs = coverage_pairs(&fcst, &obs, 3, raw, raw, 0.0).unwrap();

        let mut info = NbrCtsInfo::new(3, raw, raw, frac, &[]);
        let idx: Vec<usize> = (0..pairs.f.len()).collect();
        compute_ctsinfo(&pairs.f, &pairs.o, &idx, true, false, &mut info.cts_info).unwrap();
        assert_eq!(info.cts_info.acc.v, 1.0);
    }

    #[test]
    fn test_grid_mismatch_fatal() {
        let a = step_field(8, 8, 4);
        let b = step_field(9, 8, 4);
        let t = Threshold::new(ThreshCmp::Gt, 5.0);
        assert!(matches!(
            coverage_pairs(&a, &b, 3, t, t, 0.0),
            Err(VerifyError::GridMismatch { .. })
        ));
    }
}
