//! Intensity-scale verification (ISC): a dyadic Haar decomposition of the
//! thresholded forecast-minus-observation field.

use crate::error::{Result, VerifyError};
use crate::field::RasterField;
use crate::types::{is_bad, is_eq, Threshold, BAD_DATA};

use super::contingency::TTContingencyTable;

/// Intensity-scale statistics over one power-of-two tile.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IscInfo {
    pub cts: TTContingencyTable,
    pub fcst_thresh: Threshold,
    pub obs_thresh: Threshold,

    pub tile_dim: usize,
    pub tile_xll: usize,
    pub tile_yll: usize,

    /// Number of detail scales; the decomposition has `n_scale + 1`
    /// components including the field mean.
    pub n_scale: usize,

    pub total: u64,
    pub baser: f64,
    pub fbias: f64,

    pub mse: f64,
    pub isc: f64,
    pub fen: f64,
    pub oen: f64,

    pub mse_scale: Vec<f64>,
    pub isc_scale: Vec<f64>,
    pub fen_scale: Vec<f64>,
    pub oen_scale: Vec<f64>,
}

impl IscInfo {
    /// Intensity-scale skill from the stored MSEs and the contingency
    /// table: `1 - MSE / den` with the denominator split evenly across the
    /// `n_scale + 1` components for the per-scale skills.
    pub fn compute_isc(&mut self) {
        self.total = self.cts.n();
        self.baser = self.cts.baser();
        self.fbias = self.cts.fbias();

        let den = if is_bad(self.baser) || is_bad(self.fbias) {
            BAD_DATA
        } else {
            self.fbias * self.baser * (1.0 - self.baser)
                + self.baser * (1.0 - self.fbias * self.baser)
        };

        self.isc = if is_bad(den) || is_bad(self.mse) || is_eq(den, 0.0) {
            BAD_DATA
        } else {
            1.0 - self.mse / den
        };

        let den_scale = if is_bad(den) {
            BAD_DATA
        } else {
            den / (self.n_scale as f64 + 1.0)
        };
        for i in 0..=self.n_scale {
            self.isc_scale[i] =
                if is_bad(den_scale) || is_bad(self.mse_scale[i]) || is_eq(den_scale, 0.0) {
                    BAD_DATA
                } else {
                    1.0 - self.mse_scale[i] / den_scale
                };
        }
    }
}

/// 2-D Haar father-wavelet pyramid: block means of the field at block size
/// `2^level`, evaluated on the full-resolution lattice.
fn block_mean_field(values: &[f64], dim: usize, block: usize) -> Vec<f64> {
    let n_block = dim / block;
    let mut means = vec![0.0; n_block * n_block];
    for by in 0..n_block {
        for bx in 0..n_block {
            let mut sum = 0.0;
            for y in 0..block {
                for x in 0..block {
                    sum += values[(by * block + y) * dim + bx * block + x];
                }
            }
            means[by * n_block + bx] = sum / (block * block) as f64;
        }
    }
    let mut out = vec![0.0; dim * dim];
    for y in 0..dim {
        for x in 0..dim {
            out[y * dim + x] = means[(y / block) * n_block + x / block];
        }
    }
    out
}

/// Decompose a `dim x dim` tile into `n_scale + 1` orthogonal components:
/// detail fields from the finest to the coarsest dyadic scale, then the
/// tile mean. The components sum to the original tile.
pub fn haar_components(values: &[f64], dim: usize) -> Result<Vec<Vec<f64>>> {
    if dim == 0 || !dim.is_power_of_two() {
        return Err(VerifyError::BadTileDimension { dim });
    }
    let n_scale = dim.trailing_zeros() as usize;

    let mut components = Vec::with_capacity(n_scale + 1);
    let mut approx = values.to_vec();
    for level in 1..=n_scale {
        let coarser = block_mean_field(values, dim, 1 << level);
        let detail: Vec<f64> = approx
            .iter()
            .zip(coarser.iter())
            .map(|(a, c)| a - c)
            .collect();
        components.push(detail);
        approx = coarser;
    }
    components.push(approx);
    Ok(components)
}

/// Mean square of a component field.
fn energy(component: &[f64]) -> f64 {
    component.iter().map(|v| v * v).sum::<f64>() / component.len() as f64
}

/// Compute the intensity-scale statistics for a tile of the forecast and
/// observation fields.
///
/// The tile at `(tile_xll, tile_yll)` with power-of-two dimension
/// `tile_dim` is thresholded into binary event fields (missing samples
/// count as non-events), the difference field is decomposed across dyadic
/// scales, and the per-scale skills follow from the 2x2 table of the
/// thresholded tiles.
pub fn compute_iscinfo(
    fcst: &RasterField,
    obs: &RasterField,
    tile_xll: usize,
    tile_yll: usize,
    tile_dim: usize,
    fcst_thresh: Threshold,
    obs_thresh: Threshold,
) -> Result<IscInfo> {
    if fcst.nx() != obs.nx() || fcst.ny() != obs.ny() {
        return Err(VerifyError::GridMismatch {
            nx1: fcst.nx(),
            ny1: fcst.ny(),
            nx2: obs.nx(),
            ny2: obs.ny(),
        });
    }
    if tile_dim == 0 || !tile_dim.is_power_of_two() {
        return Err(VerifyError::BadTileDimension { dim: tile_dim });
    }
    if tile_xll + tile_dim > fcst.nx() || tile_yll + tile_dim > fcst.ny() {
        return Err(VerifyError::GridMismatch {
            nx1: fcst.nx(),
            ny1: fcst.ny(),
            nx2: tile_xll + tile_dim,
            ny2: tile_yll + tile_dim,
        });
    }

    let n_scale = tile_dim.trailing_zeros() as usize;
    let mut f_bin = vec![0.0; tile_dim * tile_dim];
    let mut o_bin = vec![0.0; tile_dim * tile_dim];
    let mut cts = TTContingencyTable::default();

    for y in 0..tile_dim {
        for x in 0..tile_dim {
            let fv = fcst.get(tile_xll + x, tile_yll + y);
            let ov = obs.get(tile_xll + x, tile_yll + y);
            let f_on = !is_bad(fv) && fcst_thresh.check(fv);
            let o_on = !is_bad(ov) && obs_thresh.check(ov);
            f_bin[y * tile_dim + x] = f64::from(f_on as u8);
            o_bin[y * tile_dim + x] = f64::from(o_on as u8);
            cts.inc(f_on, o_on);
        }
    }

    let diff: Vec<f64> = f_bin
        .iter()
        .zip(o_bin.iter())
        .map(|(f, o)| f - o)
        .collect();

    let f_comp = haar_components(&f_bin, tile_dim)?;
    let o_comp = haar_components(&o_bin, tile_dim)?;
    let d_comp = haar_components(&diff, tile_dim)?;

    let mut info = IscInfo {
        cts,
        fcst_thresh,
        obs_thresh,
        tile_dim,
        tile_xll,
        tile_yll,
        n_scale,
        total: 0,
        baser: BAD_DATA,
        fbias: BAD_DATA,
        mse: energy(&diff),
        isc: BAD_DATA,
        fen: energy(&f_bin),
        oen: energy(&o_bin),
        mse_scale: d_comp.iter().map(|c| energy(c)).collect(),
        isc_scale: vec![BAD_DATA; n_scale + 1],
        fen_scale: f_comp.iter().map(|c| energy(c)).collect(),
        oen_scale: o_comp.iter().map(|c| energy(c)).collect(),
    };
    info.compute_isc();
    Ok(info)
}
