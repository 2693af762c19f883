//! Continuous statistics (CNT): means, errors, correlations, and error
//! percentiles.

use crate::error::{Result, VerifyError};
use crate::interp::percentile_sorted;
use crate::types::{codes, is_eq, BAD_DATA};

use super::ci::{
    compute_corr_ci, compute_mean_ci, compute_stdev, compute_stdev_ci, CiValue,
};
use super::sums::Sl1l2Info;

/// Nonzero cutoff for the precipitation trivial-agreement filter.
const PRECIP_ZERO_EPS: f64 = 1.0e-4;

/// Continuous statistics for one pair set.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CntInfo {
    pub alpha: Vec<f64>,
    pub n: usize,

    pub fbar: CiValue,
    pub fstdev: CiValue,
    pub obar: CiValue,
    pub ostdev: CiValue,

    pub pr_corr: CiValue,
    pub sp_corr: CiValue,
    pub kt_corr: CiValue,

    pub me: CiValue,
    pub estdev: CiValue,
    pub mbias: CiValue,
    pub mae: CiValue,
    pub mse: CiValue,
    pub bcmse: CiValue,
    pub rmse: CiValue,

    pub e10: CiValue,
    pub e25: CiValue,
    pub e50: CiValue,
    pub e75: CiValue,
    pub e90: CiValue,

    pub n_ranks: usize,
    pub frank_ties: usize,
    pub orank_ties: usize,

    /// Product means kept alongside the scores so neighborhood statistics
    /// and the SL1L2 derivation can share this block.
    pub fobar: f64,
    pub ffbar: f64,
    pub oobar: f64,
}

/// Number of bootstrap-resampled statistics per block.
pub const N_CNT_STATS: usize = 19;

impl CntInfo {
    pub fn new(alpha: &[f64]) -> Self {
        let ci = || CiValue::new(alpha.len());
        Self {
            alpha: alpha.to_vec(),
            n: 0,
            fbar: ci(),
            fstdev: ci(),
            obar: ci(),
            ostdev: ci(),
            pr_corr: ci(),
            sp_corr: ci(),
            kt_corr: ci(),
            me: ci(),
            estdev: ci(),
            mbias: ci(),
            mae: ci(),
            mse: ci(),
            bcmse: ci(),
            rmse: ci(),
            e10: ci(),
            e25: ci(),
            e50: ci(),
            e75: ci(),
            e90: ci(),
            n_ranks: 0,
            frank_ties: 0,
            orank_ties: 0,
            fobar: BAD_DATA,
            ffbar: BAD_DATA,
            oobar: BAD_DATA,
        }
    }

    pub fn allocate_boot(&mut self) {
        let n = self.alpha.len();
        for v in self.values_mut() {
            v.allocate_boot(n);
        }
    }

    fn values_mut(&mut self) -> [&mut CiValue; N_CNT_STATS] {
        [
            &mut self.fbar,
            &mut self.fstdev,
            &mut self.obar,
            &mut self.ostdev,
            &mut self.pr_corr,
            &mut self.sp_corr,
            &mut self.kt_corr,
            &mut self.me,
            &mut self.estdev,
            &mut self.mbias,
            &mut self.mae,
            &mut self.mse,
            &mut self.bcmse,
            &mut self.rmse,
            &mut self.e10,
            &mut self.e25,
            &mut self.e50,
            &mut self.e75,
            &mut self.e90,
        ]
    }

    pub fn stat_values(&self) -> [f64; N_CNT_STATS] {
        [
            self.fbar.v,
            self.fstdev.v,
            self.obar.v,
            self.ostdev.v,
            self.pr_corr.v,
            self.sp_corr.v,
            self.kt_corr.v,
            self.me.v,
            self.estdev.v,
            self.mbias.v,
            self.mae.v,
            self.mse.v,
            self.bcmse.v,
            self.rmse.v,
            self.e10.v,
            self.e25.v,
            self.e50.v,
            self.e75.v,
            self.e90.v,
        ]
    }

    pub fn set_boot_bounds(&mut self, i_stat: usize, i_alpha: usize, lower: f64, upper: f64) {
        let mut values = self.values_mut();
        let v = &mut values[i_stat];
        v.bcl[i_alpha] = lower;
        v.bcu[i_alpha] = upper;
    }

    /// Normal-theory intervals: t/z for the means, chi-square for the
    /// standard deviations, Fisher z for the Pearson correlation. Spatial
    /// correlation between points is ignored; whether the normality
    /// assumptions suit the field is the caller's judgment.
    pub fn compute_ci(&mut self) {
        let n = self.n;
        for i in 0..self.alpha.len() {
            let alpha = self.alpha[i];

            if n <= 1 {
                continue;
            }

            let (lo, hi) = compute_mean_ci(self.fbar.v, self.fstdev.v, n, alpha);
            self.fbar.ncl[i] = lo;
            self.fbar.ncu[i] = hi;

            let (lo, hi) = compute_stdev_ci(self.fstdev.v, n, alpha);
            self.fstdev.ncl[i] = lo;
            self.fstdev.ncu[i] = hi;

            let (lo, hi) = compute_mean_ci(self.obar.v, self.ostdev.v, n, alpha);
            self.obar.ncl[i] = lo;
            self.obar.ncu[i] = hi;

            let (lo, hi) = compute_stdev_ci(self.ostdev.v, n, alpha);
            self.ostdev.ncl[i] = lo;
            self.ostdev.ncu[i] = hi;

            let (lo, hi) = compute_corr_ci(self.pr_corr.v, n, alpha);
            self.pr_corr.ncl[i] = lo;
            self.pr_corr.ncu[i] = hi;

            let (lo, hi) = compute_mean_ci(self.me.v, self.estdev.v, n, alpha);
            self.me.ncl[i] = lo;
            self.me.ncu[i] = hi;

            let (lo, hi) = compute_stdev_ci(self.estdev.v, n, alpha);
            self.estdev.ncl[i] = lo;
            self.estdev.ncu[i] = hi;
        }
    }
}

/// Fractional (average) ranks of a data slice. Returns the ranks and the
/// count of values involved in ties.
pub fn rank_with_ties(data: &[f64]) -> (Vec<f64>, usize) {
    let n = data.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| data[a].total_cmp(&data[b]));

    let mut ranks = vec![0.0; n];
    let mut ties = 0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && data[order[j + 1]] == data[order[i]] {
            j += 1;
        }
        // Average rank over the tied run; ranks are 1-based.
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = avg;
        }
        if j > i {
            ties += j - i + 1;
        }
        i = j + 1;
    }
    (ranks, ties)
}

fn pearson_from_sums(n: f64, sx: f64, sy: f64, sxx: f64, syy: f64, sxy: f64) -> f64 {
    let v = (n * sxx - sx * sx) * (n * syy - sy * sy);
    if v < 0.0 || is_eq(v, 0.0) {
        return BAD_DATA;
    }
    let r = (n * sxy - sx * sy) / v.sqrt();
    // Round-off can push a perfect correlation just past one; anything
    // further out signals inconsistent sums.
    if r.abs() <= 1.0 {
        r
    } else if r.abs() < 1.0 + 1.0e-10 {
        r.signum()
    } else {
        BAD_DATA
    }
}

/// Compute the continuous statistics from the pair values selected by
/// `indices`.
///
/// `cnt_flag` gates everything beyond the partial sums; `rank_flag` adds
/// Spearman and Kendall rank correlations, masking trivial zero pairs
/// first when both variable codes are precipitation.
#[allow(clippy::too_many_arguments)]
pub fn compute_cntinfo(
    f: &[f64],
    o: &[f64],
    indices: &[usize],
    fcst_code: i32,
    obs_code: i32,
    cnt_flag: bool,
    rank_flag: bool,
    normal_ci_flag: bool,
    info: &mut CntInfo,
) -> Result<()> {
    if f.len() != o.len() || f.is_empty() {
        return Err(VerifyError::PairLengthMismatch {
            f_len: f.len(),
            o_len: o.len(),
        });
    }

    let n = indices.len();
    let mut f_sum = 0.0;
    let mut o_sum = 0.0;
    let mut ff_sum = 0.0;
    let mut oo_sum = 0.0;
    let mut fo_sum = 0.0;
    let mut err_sum = 0.0;
    let mut abs_err_sum = 0.0;
    let mut err_sq_sum = 0.0;
    let mut errs = Vec::with_capacity(n);

    for &j in indices {
        let (fv, ov) = (f[j], o[j]);
        let err = fv - ov;
        errs.push(err);
        f_sum += fv;
        o_sum += ov;
        ff_sum += fv * fv;
        oo_sum += ov * ov;
        fo_sum += fv * ov;
        err_sum += err;
        abs_err_sum += err.abs();
        err_sq_sum += err * err;
    }

    info.n = n;
    if n == 0 {
        return Ok(());
    }
    let nf = n as f64;

    info.fbar.v = f_sum / nf;
    info.fstdev.v = compute_stdev(f_sum, ff_sum, n);
    info.obar.v = o_sum / nf;
    info.ostdev.v = compute_stdev(o_sum, oo_sum, n);
    info.fobar = fo_sum / nf;
    info.ffbar = ff_sum / nf;
    info.oobar = oo_sum / nf;

    if !cnt_flag {
        return Ok(());
    }

    info.mbias.v = if is_eq(info.obar.v, 0.0) {
        BAD_DATA
    } else {
        info.fbar.v / info.obar.v
    };

    info.pr_corr.v = pearson_from_sums(nf, f_sum, o_sum, ff_sum, oo_sum, fo_sum);

    errs.sort_by(f64::total_cmp);
    info.e10.v = percentile_sorted(&errs, 0.10);
    info.e25.v = percentile_sorted(&errs, 0.25);
    info.e50.v = percentile_sorted(&errs, 0.50);
    info.e75.v = percentile_sorted(&errs, 0.75);
    info.e90.v = percentile_sorted(&errs, 0.90);

    info.me.v = err_sum / nf;
    info.estdev.v = compute_stdev(err_sum, err_sq_sum, n);
    info.mae.v = abs_err_sum / nf;
    info.mse.v = err_sq_sum / nf;
    info.bcmse.v = info.mse.v - (info.fbar.v - info.obar.v).powi(2);
    info.rmse.v = info.mse.v.sqrt();

    if rank_flag {
        compute_rank_correlations(f, o, indices, fcst_code, obs_code, info);
    }

    if normal_ci_flag {
        info.compute_ci();
    }
    Ok(())
}

/// Spearman and Kendall correlations over fractional ranks.
fn compute_rank_correlations(
    f: &[f64],
    o: &[f64],
    indices: &[usize],
    fcst_code: i32,
    obs_code: i32,
    info: &mut CntInfo,
) {
    // For precipitation, drop the pairs where both values sit at zero:
    // trivial agreement that would swamp the rank statistics.
    let mask_zeros = codes::is_precip(fcst_code) && codes::is_precip(obs_code);
    let mut f2 = Vec::with_capacity(indices.len());
    let mut o2 = Vec::with_capacity(indices.len());
    for &j in indices {
        let (fv, ov) = (f[j], o[j]);
        if mask_zeros && fv <= PRECIP_ZERO_EPS && ov <= PRECIP_ZERO_EPS {
            continue;
        }
        f2.push(fv);
        o2.push(ov);
    }

    let (f_rank, f_ties) = rank_with_ties(&f2);
    let (o_rank, o_ties) = rank_with_ties(&o2);
    let n = f_rank.len();

    info.n_ranks = n;
    info.frank_ties = f_ties;
    info.orank_ties = o_ties;
    if n == 0 {
        info.sp_corr.v = BAD_DATA;
        info.kt_corr.v = BAD_DATA;
        return;
    }

    // Spearman: Pearson over the ranks.
    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for i in 0..n {
        let (a, b) = (f_rank[i], o_rank[i]);
        sx += a;
        sy += b;
        sxx += a * a;
        syy += b * b;
        sxy += a * b;
    }
    info.sp_corr.v = pearson_from_sums(n as f64, sx, sy, sxx, syy, sxy);

    // Kendall tau-b: concordant and discordant pair comparisons, with the
    // one-sided ties feeding the denominator.
    let mut concordant = 0u64;
    let mut discordant = 0u64;
    let mut extra_f = 0u64;
    let mut extra_o = 0u64;
    for i in 0..n {
        for j in i + 1..n {
            let df = f_rank[i] - f_rank[j];
            let do_ = o_rank[i] - o_rank[j];
            if (df > 0.0 && do_ > 0.0) || (df < 0.0 && do_ < 0.0) {
                concordant += 1;
            } else if (df > 0.0 && do_ < 0.0) || (df < 0.0 && do_ > 0.0) {
                discordant += 1;
            } else if df == 0.0 && do_ != 0.0 {
                extra_o += 1;
            } else if df != 0.0 && do_ == 0.0 {
                extra_f += 1;
            }
        }
    }
    let den = ((concordant + discordant + extra_f) as f64).sqrt()
        * ((concordant + discordant + extra_o) as f64).sqrt();
    info.kt_corr.v = if is_eq(den, 0.0) {
        BAD_DATA
    } else {
        (concordant as f64 - discordant as f64) / den
    };
}

/// Leave-one-out variant used by the BCa jackknife.
pub fn compute_i_cntinfo(
    f: &[f64],
    o: &[f64],
    skip: usize,
    fcst_code: i32,
    obs_code: i32,
    rank_flag: bool,
    info: &mut CntInfo,
) -> Result<()> {
    let indices: Vec<usize> = (0..f.len()).filter(|&i| i != skip).collect();
    compute_cntinfo(
        f, o, &indices, fcst_code, obs_code, true, rank_flag, false, info,
    )
}

/// Derive a continuous-statistics block from scalar partial sums alone.
/// Rank statistics, MAE, and the error percentiles cannot be recovered and
/// stay missing. With `anomaly_flag` the anomaly sums are used.
pub fn compute_cntinfo_from_sums(s: &Sl1l2Info, anomaly_flag: bool, info: &mut CntInfo) {
    let (n, fbar, obar, fobar, ffbar, oobar) = if anomaly_flag {
        (s.sacount, s.fabar, s.oabar, s.foabar, s.ffabar, s.ooabar)
    } else {
        (s.scount, s.fbar, s.obar, s.fobar, s.ffbar, s.oobar)
    };

    info.n = n;
    info.sp_corr.set_bad_data();
    info.kt_corr.set_bad_data();
    info.mae.set_bad_data();
    info.e10.set_bad_data();
    info.e25.set_bad_data();
    info.e50.set_bad_data();
    info.e75.set_bad_data();
    info.e90.set_bad_data();
    info.n_ranks = 0;
    info.frank_ties = 0;
    info.orank_ties = 0;

    if n == 0 {
        info.fbar.set_bad_data();
        info.obar.set_bad_data();
        info.fstdev.set_bad_data();
        info.ostdev.set_bad_data();
        info.pr_corr.set_bad_data();
        info.me.set_bad_data();
        info.estdev.set_bad_data();
        info.mbias.set_bad_data();
        info.mse.set_bad_data();
        info.bcmse.set_bad_data();
        info.rmse.set_bad_data();
        return;
    }
    let nf = n as f64;

    info.fbar.v = fbar;
    info.fstdev.v = compute_stdev(fbar * nf, ffbar * nf, n);
    info.obar.v = obar;
    info.ostdev.v = compute_stdev(obar * nf, oobar * nf, n);
    info.fobar = fobar;
    info.ffbar = ffbar;
    info.oobar = oobar;

    info.mbias.v = if is_eq(obar, 0.0) {
        BAD_DATA
    } else {
        fbar / obar
    };
    info.pr_corr.v = pearson_from_sums(
        nf,
        fbar * nf,
        obar * nf,
        ffbar * nf,
        oobar * nf,
        fobar * nf,
    );

    info.me.v = fbar - obar;
    info.mse.v = ffbar + oobar - 2.0 * fobar;
    info.estdev.v = compute_stdev(info.me.v * nf, info.mse.v * nf, n);
    info.bcmse.v = info.mse.v - (fbar - obar).powi(2);
    info.rmse.v = if info.mse.v < 0.0 {
        BAD_DATA
    } else {
        info.mse.v.sqrt()
    };

    info.compute_ci();
}
