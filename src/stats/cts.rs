//! Categorical contingency-table statistics (CTS).

use crate::error::{Result, VerifyError};
use crate::types::Threshold;

use super::ci::{
    compute_hk_ci, compute_proportion_ci, compute_woolf_ci, CiValue,
};
use super::contingency::TTContingencyTable;

/// Scores derived from a 2x2 table at one threshold pair, with their
/// confidence bounds.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CtsInfo {
    pub fcst_thresh: Threshold,
    pub obs_thresh: Threshold,
    pub alpha: Vec<f64>,
    pub cts: TTContingencyTable,

    pub baser: CiValue,
    pub fmean: CiValue,
    pub acc: CiValue,
    pub fbias: CiValue,
    pub pody: CiValue,
    pub podn: CiValue,
    pub pofd: CiValue,
    pub far: CiValue,
    pub csi: CiValue,
    pub gss: CiValue,
    pub hk: CiValue,
    pub hss: CiValue,
    pub odds: CiValue,
}

/// Number of bootstrap-resampled statistics per table.
pub const N_CTS_STATS: usize = 13;

impl CtsInfo {
    pub fn new(fcst_thresh: Threshold, obs_thresh: Threshold, alpha: &[f64]) -> Self {
        let ci = || CiValue::new(alpha.len());
        Self {
            fcst_thresh,
            obs_thresh,
            alpha: alpha.to_vec(),
            cts: TTContingencyTable::default(),
            baser: ci(),
            fmean: ci(),
            acc: ci(),
            fbias: ci(),
            pody: ci(),
            podn: ci(),
            pofd: ci(),
            far: ci(),
            csi: ci(),
            gss: ci(),
            hk: ci(),
            hss: ci(),
            odds: ci(),
        }
    }

    /// Add bootstrap bound slots to every score.
    pub fn allocate_boot(&mut self) {
        let n = self.alpha.len();
        for v in self.values_mut() {
            v.allocate_boot(n);
        }
    }

    fn values_mut(&mut self) -> [&mut CiValue; N_CTS_STATS] {
        [
            &mut self.baser,
            &mut self.fmean,
            &mut self.acc,
            &mut self.fbias,
            &mut self.pody,
            &mut self.podn,
            &mut self.pofd,
            &mut self.far,
            &mut self.csi,
            &mut self.gss,
            &mut self.hk,
            &mut self.hss,
            &mut self.odds,
        ]
    }

    /// Derive every score from the table.
    pub fn compute_stats(&mut self) {
        self.baser.v = self.cts.baser();
        self.fmean.v = self.cts.fmean();
        self.acc.v = self.cts.accuracy();
        self.fbias.v = self.cts.fbias();
        self.pody.v = self.cts.pod_yes();
        self.podn.v = self.cts.pod_no();
        self.pofd.v = self.cts.pofd();
        self.far.v = self.cts.far();
        self.csi.v = self.cts.csi();
        self.gss.v = self.cts.gss();
        self.hk.v = self.cts.hk();
        self.hss.v = self.cts.hss();
        self.odds.v = self.cts.odds();
    }

    /// Normal-theory intervals for every alpha.
    ///
    /// The proportion scores get Wilson intervals, Hanssen-Kuipers the
    /// Seaman variance, the odds ratio Woolf's formula. No interval is
    /// defined for GSS or the frequency bias.
    pub fn compute_ci(&mut self) {
        let n = self.cts.n() as usize;
        let (a, b, c, d) = (
            self.cts.fy_oy,
            self.cts.fy_on,
            self.cts.fn_oy,
            self.cts.fn_on,
        );
        for i in 0..self.alpha.len() {
            let alpha = self.alpha[i];

            for (value, slot_l, slot_u) in [
                (self.baser.v, &mut self.baser.ncl[i], &mut self.baser.ncu[i]),
                (self.fmean.v, &mut self.fmean.ncl[i], &mut self.fmean.ncu[i]),
                (self.acc.v, &mut self.acc.ncl[i], &mut self.acc.ncu[i]),
                (self.pody.v, &mut self.pody.ncl[i], &mut self.pody.ncu[i]),
                (self.podn.v, &mut self.podn.ncl[i], &mut self.podn.ncu[i]),
                (self.pofd.v, &mut self.pofd.ncl[i], &mut self.pofd.ncu[i]),
                (self.far.v, &mut self.far.ncl[i], &mut self.far.ncu[i]),
                (self.csi.v, &mut self.csi.ncl[i], &mut self.csi.ncu[i]),
            ] {
                let (lo, hi) = compute_proportion_ci(value, n, alpha);
                *slot_l = lo;
                *slot_u = hi;
            }

            let (lo, hi) = compute_hk_ci(self.hk.v, alpha, a, b, c, d);
            self.hk.ncl[i] = lo;
            self.hk.ncu[i] = hi;

            let (lo, hi) = compute_woolf_ci(self.odds.v, alpha, a, b, c, d);
            self.odds.ncl[i] = lo;
            self.odds.ncu[i] = hi;
        }
    }

    /// Snapshot of the score values in bootstrap order.
    pub fn stat_values(&self) -> [f64; N_CTS_STATS] {
        [
            self.baser.v,
            self.fmean.v,
            self.acc.v,
            self.fbias.v,
            self.pody.v,
            self.podn.v,
            self.pofd.v,
            self.far.v,
            self.csi.v,
            self.gss.v,
            self.hk.v,
            self.hss.v,
            self.odds.v,
        ]
    }

    /// Store bootstrap bounds for statistic `i_stat` at alpha `i_alpha`.
    pub fn set_boot_bounds(&mut self, i_stat: usize, i_alpha: usize, lower: f64, upper: f64) {
        let mut values = self.values_mut();
        let v = &mut values[i_stat];
        v.bcl[i_alpha] = lower;
        v.bcu[i_alpha] = upper;
    }
}

/// Fill the 2x2 table of a [`CtsInfo`] from the pair values selected by
/// `indices`, then derive the scores and normal intervals as requested.
pub fn compute_ctsinfo(
    f: &[f64],
    o: &[f64],
    indices: &[usize],
    cts_flag: bool,
    normal_ci_flag: bool,
    info: &mut CtsInfo,
) -> Result<()> {
    if f.len() != o.len() {
        return Err(VerifyError::PairLengthMismatch {
            f_len: f.len(),
            o_len: o.len(),
        });
    }

    info.cts.zero_out();
    for &j in indices {
        info.cts
            .inc(info.fcst_thresh.check(f[j]), info.obs_thresh.check(o[j]));
    }

    if cts_flag {
        info.compute_stats();
        if normal_ci_flag {
            info.compute_ci();
        }
    }
    Ok(())
}
