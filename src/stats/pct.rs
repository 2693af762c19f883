//! Probabilistic verification (PCT / PSTD / PJC / PRC).

use crate::error::{Result, VerifyError};
use crate::types::{is_bad, Threshold, BAD_DATA};

use super::ci::CiValue;
use super::contingency::ProbContingencyTable;

/// Probabilistic contingency-table statistics for one observation
/// threshold.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PctInfo {
    /// Ascending probability thresholds partitioning `[0, 1]` into bins.
    pub fcst_thresholds: Vec<f64>,
    /// Event predicate applied to the scalar observation.
    pub obs_thresh: Threshold,
    pub alpha: Vec<f64>,

    pub pct: ProbContingencyTable,

    pub brier: CiValue,
    pub reliability: f64,
    pub resolution: f64,
    pub uncertainty: f64,
}

impl PctInfo {
    pub fn new(fcst_thresholds: Vec<f64>, obs_thresh: Threshold, alpha: &[f64]) -> Result<Self> {
        let pct = ProbContingencyTable::new(fcst_thresholds.clone())?;
        Ok(Self {
            fcst_thresholds,
            obs_thresh,
            alpha: alpha.to_vec(),
            pct,
            brier: CiValue::new(alpha.len()),
            reliability: BAD_DATA,
            resolution: BAD_DATA,
            uncertainty: BAD_DATA,
        })
    }

    pub fn allocate_boot(&mut self) {
        self.brier.allocate_boot(self.alpha.len());
    }

    pub fn compute_stats(&mut self) {
        self.brier.v = self.pct.brier_score();
        let (rel, res, unc) = self.pct.brier_partition();
        self.reliability = rel;
        self.resolution = res;
        self.uncertainty = unc;
    }

    /// Closed-form normal interval for the Brier score.
    pub fn compute_ci(&mut self) {
        for i in 0..self.alpha.len() {
            let halfwidth = self.pct.brier_ci_halfwidth(self.alpha[i]);
            if is_bad(self.brier.v) || is_bad(halfwidth) {
                self.brier.ncl[i] = BAD_DATA;
                self.brier.ncu[i] = BAD_DATA;
            } else {
                self.brier.ncl[i] = self.brier.v - halfwidth;
                self.brier.ncu[i] = self.brier.v + halfwidth;
            }
        }
    }

    /// ROC points for the PRC output line.
    pub fn roc_points(&self) -> Vec<(f64, f64, f64)> {
        self.pct.roc_points()
    }

    /// Calibration and refinement points for the PJC output line.
    pub fn calibration_points(&self) -> Vec<(f64, f64, f64)> {
        self.pct.calibration_points()
    }

    /// Likelihood and base-rate points for the PJC output line.
    pub fn likelihood_points(&self) -> Vec<(f64, f64, f64)> {
        self.pct.likelihood_points()
    }
}

/// Fill the Nx2 table from probability forecasts and scalar observations,
/// then derive the statistics when requested.
pub fn compute_pctinfo(
    f: &[f64],
    o: &[f64],
    pstd_flag: bool,
    info: &mut PctInfo,
) -> Result<()> {
    if f.len() != o.len() {
        return Err(VerifyError::PairLengthMismatch {
            f_len: f.len(),
            o_len: o.len(),
        });
    }

    info.pct = ProbContingencyTable::new(info.fcst_thresholds.clone())?;
    for i in 0..f.len() {
        if info.obs_thresh.check(o[i]) {
            info.pct.inc_event(f[i]);
        } else {
            info.pct.inc_nonevent(f[i]);
        }
    }

    if pstd_flag {
        info.compute_stats();
        info.compute_ci();
    }
    Ok(())
}
