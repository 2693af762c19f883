//! Neighborhood transforms: fractional coverage and smoothing.

use crate::error::{Result, VerifyError};
use crate::interp::{self, InterpMethod};
use crate::types::{is_bad, Threshold, BAD_DATA};

use super::RasterField;

/// Per-window sample state for the sliding coverage box.
#[derive(Debug, Clone, Copy, PartialEq)]
enum BoxSample {
    Missing,
    Off,
    On,
}

/// Fractional coverage: at each cell, the fraction of valid samples in the
/// `width x width` neighborhood satisfying the threshold. Missing when
/// fewer than `vld_thresh` of the window is valid.
///
/// The window is maintained with a row update (drop one row, add one row)
/// per cell step, keeping the scan `O(width * nx * ny)`.
pub fn fractional_coverage(
    field: &RasterField,
    width: usize,
    t: Threshold,
    vld_thresh: f64,
) -> Result<RasterField> {
    if width < 1 {
        return Err(VerifyError::BadCoverageWidth { width });
    }

    let nx = field.nx() as i64;
    let ny = field.ny() as i64;
    let w = width as i64;
    let half = (w - 1) / 2;

    // Coverage values live in [0, 1].
    let mut out = RasterField::new(field.nx(), field.ny());
    out.copy_header_from(field);
    out.set_range(0.0, 1.0);

    let classify = |xx: i64, yy: i64| -> BoxSample {
        if xx < 0 || xx >= nx || yy < 0 || yy >= ny {
            return BoxSample::Missing;
        }
        let v = field.get(xx as usize, yy as usize);
        if is_bad(v) {
            BoxSample::Missing
        } else if t.check(v) {
            BoxSample::On
        } else {
            BoxSample::Off
        }
    };

    let mut boxbuf = vec![BoxSample::Missing; (w * w) as usize];
    let mut count_vld: i64 = 0;
    let mut count_thr: i64 = 0;

    for x in 0..nx {
        let x_ll = x - half;
        for y in 0..ny {
            let y_ll = y - half;
            let y_ur = y + half;

            if y == 0 {
                // Fresh column: fill the whole box.
                count_vld = 0;
                count_thr = 0;
                for i in 0..w {
                    let xx = x_ll + i;
                    for j in 0..w {
                        let yy = y_ll + j;
                        let s = classify(xx, yy);
                        boxbuf[(j * w + i) as usize] = s;
                        match s {
                            BoxSample::On => {
                                count_vld += 1;
                                count_thr += 1;
                            }
                            BoxSample::Off => count_vld += 1,
                            BoxSample::Missing => {}
                        }
                    }
                }
            } else {
                // Replace the row that slid out of the window with the row
                // that slid in.
                let j = (y - 1).rem_euclid(w);
                for i in 0..w {
                    let n = (j * w + i) as usize;
                    match boxbuf[n] {
                        BoxSample::On => {
                            count_vld -= 1;
                            count_thr -= 1;
                        }
                        BoxSample::Off => count_vld -= 1,
                        BoxSample::Missing => {}
                    }
                    let s = classify(x_ll + i, y_ur);
                    boxbuf[n] = s;
                    match s {
                        BoxSample::On => {
                            count_vld += 1;
                            count_thr += 1;
                        }
                        BoxSample::Off => count_vld += 1,
                        BoxSample::Missing => {}
                    }
                }
            }

            let v = if count_vld == 0 || (count_vld as f64) / ((w * w) as f64) < vld_thresh {
                BAD_DATA
            } else {
                count_thr as f64 / count_vld as f64
            };
            out.put(v, x as usize, y as usize);
        }
    }

    out.calc_moments();
    Ok(out)
}

/// Reference implementation of [`fractional_coverage`] that rescans the
/// full window at every cell. Used to cross-check the sliding window.
pub fn fractional_coverage_naive(
    field: &RasterField,
    width: usize,
    t: Threshold,
    vld_thresh: f64,
) -> Result<RasterField> {
    if width < 1 {
        return Err(VerifyError::BadCoverageWidth { width });
    }
    let nx = field.nx() as i64;
    let ny = field.ny() as i64;
    let w = width as i64;
    let half = (w - 1) / 2;

    let mut out = RasterField::new(field.nx(), field.ny());
    out.copy_header_from(field);
    out.set_range(0.0, 1.0);

    for x in 0..nx {
        for y in 0..ny {
            let mut vld = 0i64;
            let mut thr = 0i64;
            for xx in (x - half)..(x - half + w) {
                for yy in (y - half)..(y - half + w) {
                    if xx < 0 || xx >= nx || yy < 0 || yy >= ny {
                        continue;
                    }
                    let v = field.get(xx as usize, yy as usize);
                    if is_bad(v) {
                        continue;
                    }
                    vld += 1;
                    if t.check(v) {
                        thr += 1;
                    }
                }
            }
            let v = if vld == 0 || (vld as f64) / ((w * w) as f64) < vld_thresh {
                BAD_DATA
            } else {
                thr as f64 / vld as f64
            };
            out.put(v, x as usize, y as usize);
        }
    }
    out.calc_moments();
    Ok(out)
}

/// Replace each cell with the neighborhood statistic of its `width x width`
/// footprint. Width 1 or less is the identity. Only the footprint-wide
/// methods apply; point methods (distance-weighted, least-squares,
/// bilinear) are rejected.
pub fn smooth_field(
    field: &RasterField,
    method: InterpMethod,
    width: usize,
    vld_thresh: f64,
) -> Result<RasterField> {
    if width <= 1 {
        return Ok(field.clone());
    }
    match method {
        InterpMethod::Min | InterpMethod::Max | InterpMethod::Median | InterpMethod::UwMean => {}
        other => {
            return Err(VerifyError::UnsupportedInterp {
                method: other.to_string(),
                context: "field smoothing".into(),
            })
        }
    }

    let mut out = field.clone();
    let half = (width as i64 - 1) / 2;
    for x in 0..field.nx() as i64 {
        for y in 0..field.ny() as i64 {
            let x_ll = x - half;
            let y_ll = y - half;
            let v = match method {
                InterpMethod::Min => interp::interp_min(field, x_ll, y_ll, width, vld_thresh),
                InterpMethod::Max => interp::interp_max(field, x_ll, y_ll, width, vld_thresh),
                InterpMethod::Median => interp::interp_median(field, x_ll, y_ll, width, vld_thresh),
                InterpMethod::UwMean => {
                    interp::interp_uw_mean(field, x_ll, y_ll, width, vld_thresh)
                }
                _ => unreachable!("rejected above"),
            };
            out.put(v, x as usize, y as usize);
        }
    }
    out.calc_moments();
    Ok(out)
}

/// Every finite coverage value lies in `[0, 1]` by construction; exposed for
/// the property tests.
pub fn coverage_in_bounds(field: &RasterField) -> bool {
    for y in 0..field.ny() {
        for x in 0..field.nx() {
            if field.is_bad(x, y) {
                continue;
            }
            let v = field.get(x, y);
            if !(0.0..=1.0).contains(&v) {
                return false;
            }
        }
    }
    true
}
