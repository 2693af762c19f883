//! Scalar and vector partial sums (SL1L2 / SAL1L2 / VL1L2 / VAL1L2).
//!
//! Partial sums are stored as count-weighted means so that blocks merge by
//! a count-weighted average; a pair without climatology contributes to the
//! plain sums only.

use std::ops::AddAssign;

use crate::error::{Result, VerifyError};
use crate::types::{is_bad, Threshold, BAD_DATA};

/// Scalar partial sums and their anomaly counterparts.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Sl1l2Info {
    // SL1L2
    pub fbar: f64,
    pub obar: f64,
    pub fobar: f64,
    pub ffbar: f64,
    pub oobar: f64,
    pub scount: usize,

    // SAL1L2
    pub fabar: f64,
    pub oabar: f64,
    pub foabar: f64,
    pub ffabar: f64,
    pub ooabar: f64,
    pub sacount: usize,
}

impl Default for Sl1l2Info {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl Sl1l2Info {
    pub fn zeroed() -> Self {
        Self {
            fbar: 0.0,
            obar: 0.0,
            fobar: 0.0,
            ffbar: 0.0,
            oobar: 0.0,
            scount: 0,
            fabar: 0.0,
            oabar: 0.0,
            foabar: 0.0,
            ffabar: 0.0,
            ooabar: 0.0,
            sacount: 0,
        }
    }

    /// Accumulate the sums over matched `(forecast, climatology,
    /// observation)` triples, skipping pairs with a missing forecast or
    /// observation. Pairs lacking climatology feed the plain sums only.
    pub fn from_pairs(f: &[f64], c: &[f64], o: &[f64]) -> Result<Self> {
        if f.len() != o.len() {
            return Err(VerifyError::PairLengthMismatch {
                f_len: f.len(),
                o_len: o.len(),
            });
        }

        let mut sums = [0.0f64; 5];
        let mut asums = [0.0f64; 5];
        let mut scount = 0usize;
        let mut sacount = 0usize;

        for i in 0..f.len() {
            let (fv, ov) = (f[i], o[i]);
            if is_bad(fv) || is_bad(ov) {
                continue;
            }
            sums[0] += fv;
            sums[1] += ov;
            sums[2] += fv * ov;
            sums[3] += fv * fv;
            sums[4] += ov * ov;
            scount += 1;

            let cv = c.get(i).copied().unwrap_or(BAD_DATA);
            if !is_bad(cv) {
                let (fa, oa) = (fv - cv, ov - cv);
                asums[0] += fa;
                asums[1] += oa;
                asums[2] += fa * oa;
                asums[3] += fa * fa;
                asums[4] += oa * oa;
                sacount += 1;
            }
        }

        let mut out = Self::zeroed();
        out.scount = scount;
        if scount > 0 {
            let n = scount as f64;
            out.fbar = sums[0] / n;
            out.obar = sums[1] / n;
            out.fobar = sums[2] / n;
            out.ffbar = sums[3] / n;
            out.oobar = sums[4] / n;
        }
        out.sacount = sacount;
        if sacount > 0 {
            let n = sacount as f64;
            out.fabar = asums[0] / n;
            out.oabar = asums[1] / n;
            out.foabar = asums[2] / n;
            out.ffabar = asums[3] / n;
            out.ooabar = asums[4] / n;
        } else {
            out.fabar = BAD_DATA;
            out.oabar = BAD_DATA;
            out.foabar = BAD_DATA;
            out.ffabar = BAD_DATA;
            out.ooabar = BAD_DATA;
        }
        Ok(out)
    }
}

/// Count-weighted average of two block means. A zero-count side carries no
/// weight, so its sentinel value drops out.
fn weighted_mean(a: f64, na: usize, b: f64, nb: usize) -> f64 {
    let n = na + nb;
    if n == 0 {
        return BAD_DATA;
    }
    let va = if na > 0 { a } else { 0.0 };
    let vb = if nb > 0 { b } else { 0.0 };
    (va * na as f64 + vb * nb as f64) / n as f64
}

impl AddAssign for Sl1l2Info {
    /// Count-weighted merge of two partial-sum blocks.
    fn add_assign(&mut self, rhs: Self) {
        let lhs = *self;

        self.scount = lhs.scount + rhs.scount;
        if self.scount > 0 {
            self.fbar = weighted_mean(lhs.fbar, lhs.scount, rhs.fbar, rhs.scount);
            self.obar = weighted_mean(lhs.obar, lhs.scount, rhs.obar, rhs.scount);
            self.fobar = weighted_mean(lhs.fobar, lhs.scount, rhs.fobar, rhs.scount);
            self.ffbar = weighted_mean(lhs.ffbar, lhs.scount, rhs.ffbar, rhs.scount);
            self.oobar = weighted_mean(lhs.oobar, lhs.scount, rhs.oobar, rhs.scount);
        }

        self.sacount = lhs.sacount + rhs.sacount;
        if self.sacount > 0 {
            self.fabar = weighted_mean(lhs.fabar, lhs.sacount, rhs.fabar, rhs.sacount);
            self.oabar = weighted_mean(lhs.oabar, lhs.sacount, rhs.oabar, rhs.sacount);
            self.foabar = weighted_mean(lhs.foabar, lhs.sacount, rhs.foabar, rhs.sacount);
            self.ffabar = weighted_mean(lhs.ffabar, lhs.sacount, rhs.ffabar, rhs.sacount);
            self.ooabar = weighted_mean(lhs.ooabar, lhs.sacount, rhs.ooabar, rhs.sacount);
        }
    }
}

/// Vector (u, v) partial sums under wind-speed thresholds, with anomaly
/// counterparts.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Vl1l2Info {
    pub wind_fcst_thresh: Threshold,
    pub wind_obs_thresh: Threshold,

    // VL1L2
    pub ufbar: f64,
    pub vfbar: f64,
    pub uobar: f64,
    pub vobar: f64,
    pub uvfobar: f64,
    pub uvffbar: f64,
    pub uvoobar: f64,
    pub vcount: usize,

    // VAL1L2
    pub ufabar: f64,
    pub vfabar: f64,
    pub uoabar: f64,
    pub voabar: f64,
    pub uvfoabar: f64,
    pub uvffabar: f64,
    pub uvooabar: f64,
    pub vacount: usize,
}

impl Vl1l2Info {
    pub fn new(wind_fcst_thresh: Threshold, wind_obs_thresh: Threshold) -> Self {
        Self {
            wind_fcst_thresh,
            wind_obs_thresh,
            ufbar: 0.0,
            vfbar: 0.0,
            uobar: 0.0,
            vobar: 0.0,
            uvfobar: 0.0,
            uvffbar: 0.0,
            uvoobar: 0.0,
            vcount: 0,
            ufabar: 0.0,
            vfabar: 0.0,
            uoabar: 0.0,
            voabar: 0.0,
            uvfoabar: 0.0,
            uvffabar: 0.0,
            uvooabar: 0.0,
            vacount: 0,
        }
    }

    /// Accumulate vector sums from synchronized u and v pair columns.
    ///
    /// The columns must have equal length; the wind-speed thresholds that
    /// are present must pass for a pair to count. Pairs with any missing
    /// component are skipped; the anomaly sums additionally require both
    /// climatology components.
    #[allow(clippy::too_many_arguments)]
    pub fn from_pairs(
        &mut self,
        uf: &[f64],
        vf: &[f64],
        uc: &[f64],
        vc: &[f64],
        uo: &[f64],
        vo: &[f64],
    ) -> Result<()> {
        if uf.len() != vf.len() || uo.len() != vo.len() || uf.len() != uo.len() {
            return Err(VerifyError::VectorPairMismatch {
                u_pairs: uf.len(),
                v_pairs: vf.len().min(vo.len()),
            });
        }

        let mut sums = [0.0f64; 7];
        let mut asums = [0.0f64; 7];
        let mut vcount = 0usize;
        let mut vacount = 0usize;

        for i in 0..uf.len() {
            let (ufv, vfv, uov, vov) = (uf[i], vf[i], uo[i], vo[i]);
            if is_bad(ufv) || is_bad(vfv) || is_bad(uov) || is_bad(vov) {
                continue;
            }
            let fwind = (ufv * ufv + vfv * vfv).sqrt();
            let owind = (uov * uov + vov * vov).sqrt();

            // Apply whichever wind-speed thresholds are present.
            let f_na = self.wind_fcst_thresh.is_na();
            let o_na = self.wind_obs_thresh.is_na();
            if !f_na && !self.wind_fcst_thresh.check(fwind) {
                continue;
            }
            if !o_na && !self.wind_obs_thresh.check(owind) {
                continue;
            }

            sums[0] += ufv;
            sums[1] += vfv;
            sums[2] += uov;
            sums[3] += vov;
            sums[4] += ufv * uov + vfv * vov;
            sums[5] += ufv * ufv + vfv * vfv;
            sums[6] += uov * uov + vov * vov;
            vcount += 1;

            let ucv = uc.get(i).copied().unwrap_or(BAD_DATA);
            let vcv = vc.get(i).copied().unwrap_or(BAD_DATA);
            if !is_bad(ucv) && !is_bad(vcv) {
                let (ufa, vfa, uoa, voa) = (ufv - ucv, vfv - vcv, uov - ucv, vov - vcv);
                asums[0] += ufa;
                asums[1] += vfa;
                asums[2] += uoa;
                asums[3] += voa;
                asums[4] += ufa * uoa + vfa * voa;
                asums[5] += ufa * ufa + vfa * vfa;
                asums[6] += uoa * uoa + voa * voa;
                vacount += 1;
            }
        }

        self.vcount = vcount;
        if vcount > 0 {
            let n = vcount as f64;
            self.ufbar = sums[0] / n;
            self.vfbar = sums[1] / n;
            self.uobar = sums[2] / n;
            self.vobar = sums[3] / n;
            self.uvfobar = sums[4] / n;
            self.uvffbar = sums[5] / n;
            self.uvoobar = sums[6] / n;
        } else {
            self.ufbar = BAD_DATA;
            self.vfbar = BAD_DATA;
            self.uobar = BAD_DATA;
            self.vobar = BAD_DATA;
            self.uvfobar = BAD_DATA;
            self.uvffbar = BAD_DATA;
            self.uvoobar = BAD_DATA;
        }

        self.vacount = vacount;
        if vacount > 0 {
            let n = vacount as f64;
            self.ufabar = asums[0] / n;
            self.vfabar = asums[1] / n;
            self.uoabar = asums[2] / n;
            self.voabar = asums[3] / n;
            self.uvfoabar = asums[4] / n;
            self.uvffabar = asums[5] / n;
            self.uvooabar = asums[6] / n;
        } else {
            self.ufabar = BAD_DATA;
            self.vfabar = BAD_DATA;
            self.uoabar = BAD_DATA;
            self.voabar = BAD_DATA;
            self.uvfoabar = BAD_DATA;
            self.uvffabar = BAD_DATA;
            self.uvooabar = BAD_DATA;
        }
        Ok(())
    }
}

impl AddAssign for Vl1l2Info {
    /// Count-weighted merge of two vector partial-sum blocks.
    fn add_assign(&mut self, rhs: Self) {
        let lhs = *self;

        self.vcount = lhs.vcount + rhs.vcount;
        if self.vcount > 0 {
            self.ufbar = weighted_mean(lhs.ufbar, lhs.vcount, rhs.ufbar, rhs.vcount);
            self.vfbar = weighted_mean(lhs.vfbar, lhs.vcount, rhs.vfbar, rhs.vcount);
            self.uobar = weighted_mean(lhs.uobar, lhs.vcount, rhs.uobar, rhs.vcount);
            self.vobar = weighted_mean(lhs.vobar, lhs.vcount, rhs.vobar, rhs.vcount);
            self.uvfobar = weighted_mean(lhs.uvfobar, lhs.vcount, rhs.uvfobar, rhs.vcount);
            self.uvffbar = weighted_mean(lhs.uvffbar, lhs.vcount, rhs.uvffbar, rhs.vcount);
            self.uvoobar = weighted_mean(lhs.uvoobar, lhs.vcount, rhs.uvoobar, rhs.vcount);
        }

        self.vacount = lhs.vacount + rhs.vacount;
        if self.vacount > 0 {
            self.ufabar = weighted_mean(lhs.ufabar, lhs.vacount, rhs.ufabar, rhs.vacount);
            self.vfabar = weighted_mean(lhs.vfabar, lhs.vacount, rhs.vfabar, rhs.vacount);
            self.uoabar = weighted_mean(lhs.uoabar, lhs.vacount, rhs.uoabar, rhs.vacount);
            self.voabar = weighted_mean(lhs.voabar, lhs.vacount, rhs.voabar, rhs.vacount);
            self.uvfoabar = weighted_mean(lhs.uvfoabar, lhs.vacount, rhs.uvfoabar, rhs.vacount);
            self.uvffabar = weighted_mean(lhs.uvffabar, lhs.vacount, rhs.uvffabar, rhs.vacount);
            self.uvooabar = weighted_mean(lhs.uvooabar, lhs.vacount, rhs.uvooabar, rhs.vacount);
        }
    }
}
