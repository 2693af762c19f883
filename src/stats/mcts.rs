//! Multi-category contingency-table statistics (MCTS).

use crate::error::{Result, VerifyError};
use crate::types::Threshold;

use super::ci::{compute_proportion_ci, CiValue};
use super::contingency::MctsTable;

/// Scores derived from a KxK table over a sorted threshold list.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MctsInfo {
    pub fcst_thresholds: Vec<Threshold>,
    pub obs_thresholds: Vec<Threshold>,
    pub alpha: Vec<f64>,
    pub table: MctsTable,

    pub acc: CiValue,
    pub hk: CiValue,
    pub hss: CiValue,
    pub gerrity: CiValue,
}

/// Number of bootstrap-resampled statistics per table.
pub const N_MCTS_STATS: usize = 4;

impl MctsInfo {
    /// The threshold lists must be ascending in operand; each list of
    /// length K-1 defines K categories.
    pub fn new(
        fcst_thresholds: Vec<Threshold>,
        obs_thresholds: Vec<Threshold>,
        alpha: &[f64],
    ) -> Self {
        let edges: Vec<f64> = fcst_thresholds.iter().map(|t| t.value).collect();
        let ci = || CiValue::new(alpha.len());
        Self {
            fcst_thresholds,
            obs_thresholds,
            alpha: alpha.to_vec(),
            table: MctsTable::new(edges),
            acc: ci(),
            hk: ci(),
            hss: ci(),
            gerrity: ci(),
        }
    }

    pub fn allocate_boot(&mut self) {
        let n = self.alpha.len();
        self.acc.allocate_boot(n);
        self.hk.allocate_boot(n);
        self.hss.allocate_boot(n);
        self.gerrity.allocate_boot(n);
    }

    pub fn compute_stats(&mut self) {
        self.acc.v = self.table.accuracy();
        self.hk.v = self.table.hk();
        self.hss.v = self.table.hss();
        self.gerrity.v = self.table.gerrity();
    }

    /// Normal intervals: accuracy is a proportion; the skill scores carry
    /// bootstrap intervals only.
    pub fn compute_ci(&mut self) {
        let n = self.table.n() as usize;
        for i in 0..self.alpha.len() {
            let (lo, hi) = compute_proportion_ci(self.acc.v, n, self.alpha[i]);
            self.acc.ncl[i] = lo;
            self.acc.ncu[i] = hi;
        }
    }

    pub fn stat_values(&self) -> [f64; N_MCTS_STATS] {
        [self.acc.v, self.hk.v, self.hss.v, self.gerrity.v]
    }

    pub fn set_boot_bounds(&mut self, i_stat: usize, i_alpha: usize, lower: f64, upper: f64) {
        let v = match i_stat {
            0 => &mut self.acc,
            1 => &mut self.hk,
            2 => &mut self.hss,
            _ => &mut self.gerrity,
        };
        v.bcl[i_alpha] = lower;
        v.bcu[i_alpha] = upper;
    }
}

/// Fill the KxK table from the pair values selected by `indices`, then
/// derive the scores as requested.
pub fn compute_mctsinfo(
    f: &[f64],
    o: &[f64],
    indices: &[usize],
    mcts_flag: bool,
    normal_ci_flag: bool,
    info: &mut MctsInfo,
) -> Result<()> {
    if f.len() != o.len() {
        return Err(VerifyError::PairLengthMismatch {
            f_len: f.len(),
            o_len: o.len(),
        });
    }
    if info.fcst_thresholds.len() != info.obs_thresholds.len() {
        return Err(VerifyError::ThresholdListMismatch {
            f_len: info.fcst_thresholds.len(),
            o_len: info.obs_thresholds.len(),
        });
    }

    let edges: Vec<f64> = info.fcst_thresholds.iter().map(|t| t.value).collect();
    info.table = MctsTable::new(edges);
    for &j in indices {
        // Each value falls into the category counting the thresholds it
        // exceeds, forecast and observation lists independently.
        let f_bin = info.fcst_thresholds.iter().filter(|t| f[j] > t.value).count();
        let o_bin = info.obs_thresholds.iter().filter(|t| o[j] > t.value).count();
        info.table.inc_bins(f_bin, o_bin);
    }

    if mcts_flag {
        info.compute_stats();
        if normal_ci_flag {
            info.compute_ci();
        }
    }
    Ok(())
}
