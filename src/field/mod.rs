//! Quantized 2-D scalar fields and the transforms the score engine runs on
//! them: combining, thresholding, rescaling, morphology, connected-component
//! labeling, boundary geometry, and neighborhood coverage.

mod boundary;
mod coverage;
mod moments;
mod partition;
mod split;

pub use boundary::{BoundaryDir, Polyline};
pub use coverage::{coverage_in_bounds, fractional_coverage, fractional_coverage_naive, smooth_field};
pub use moments::Moments;
pub use partition::{Cell, Partition, MAX_CELLS};
pub use split::{combine_split, select, split, threshold_area};

use chrono::{DateTime, Utc};

use crate::error::{Result, VerifyError};
use crate::types::{is_bad, BAD_DATA, BAD_DATA_CODE, FIELD_CODE_MAX};

/// How [`combine`] merges its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOp {
    Max,
    Min,
    Sum,
}

/// Bounding box of the on region of a field, in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x_ll: usize,
    pub y_ll: usize,
    pub x_ur: usize,
    pub y_ur: usize,
}

impl BoundingBox {
    pub fn width(&self) -> usize {
        self.x_ur - self.x_ll
    }

    pub fn height(&self) -> usize {
        self.y_ur - self.y_ll
    }
}

/// A rectangular `nx x ny` grid of fixed-point samples.
///
/// Each sample is an unsigned 16-bit code `k` decoding to `m*k + b` with
/// `m > 0`; the reserved code [`BAD_DATA_CODE`] marks missing samples and
/// never participates in arithmetic. Indexing is `n = y*nx + x`.
///
/// Fields are built once on ingest and treated as immutable during scoring;
/// derived fields come from the functional transforms below, each of which
/// returns a new field with its moment cache already refreshed.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterField {
    data: Vec<u16>,
    nx: usize,
    ny: usize,
    m: f64,
    b: f64,
    valid_time: Option<DateTime<Utc>>,
    lead_secs: i64,
    accum_secs: i64,
    units: String,
    grid_name: String,
    mom: Moments,
}

impl RasterField {
    /// A zeroed field with identity quantization.
    pub fn new(nx: usize, ny: usize) -> Self {
        Self {
            data: vec![0; nx * ny],
            nx,
            ny,
            m: 1.0,
            b: 0.0,
            valid_time: None,
            lead_secs: 0,
            accum_secs: 0,
            units: String::new(),
            grid_name: String::new(),
            mom: Moments::default(),
        }
    }

    /// Build a field from decoded values in row-major (`y*nx + x`) order,
    /// choosing `m` and `b` so the expressed value range maps onto the full
    /// code range. Missing inputs keep the bad-data code.
    pub fn from_values(nx: usize, ny: usize, values: &[f64]) -> Self {
        assert_eq!(values.len(), nx * ny, "value count must match grid size");

        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in values {
            if is_bad(v) {
                continue;
            }
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }

        let mut field = Self::new(nx, ny);
        if lo.is_finite() {
            field.set_range(lo, hi);
        }
        for (n, &v) in values.iter().enumerate() {
            field.data[n] = field.encode(v);
        }
        field.calc_moments();
        field
    }

    /// Set `m` and `b` so decoded values span `[min_v, max_v]`. A degenerate
    /// range keeps `m = 1`.
    pub fn set_range(&mut self, min_v: f64, max_v: f64) {
        self.b = min_v;
        self.m = if max_v > min_v {
            (max_v - min_v) / f64::from(FIELD_CODE_MAX)
        } else {
            1.0
        };
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn m(&self) -> f64 {
        self.m
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn valid_time(&self) -> Option<DateTime<Utc>> {
        self.valid_time
    }

    pub fn lead_secs(&self) -> i64 {
        self.lead_secs
    }

    pub fn accum_secs(&self) -> i64 {
        self.accum_secs
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn grid_name(&self) -> &str {
        &self.grid_name
    }

    pub fn set_valid_time(&mut self, t: DateTime<Utc>) {
        self.valid_time = Some(t);
    }

    pub fn set_lead_secs(&mut self, secs: i64) {
        self.lead_secs = secs;
    }

    pub fn set_accum_secs(&mut self, secs: i64) {
        self.accum_secs = secs;
    }

    pub fn set_units(&mut self, units: impl Into<String>) {
        self.units = units.into();
    }

    pub fn set_grid_name(&mut self, name: impl Into<String>) {
        self.grid_name = name.into();
    }

    /// Copy header attributes (times, units, grid name) from another field.
    pub fn copy_header_from(&mut self, other: &RasterField) {
        self.valid_time = other.valid_time;
        self.lead_secs = other.lead_secs;
        self.accum_secs = other.accum_secs;
        self.units = other.units.clone();
        self.grid_name = other.grid_name.clone();
    }

    #[inline]
    fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.nx && y < self.ny);
        y * self.nx + x
    }

    /// Decode a sample code.
    #[inline]
    pub fn decode(&self, k: u16) -> f64 {
        if k == BAD_DATA_CODE {
            BAD_DATA
        } else {
            self.m * f64::from(k) + self.b
        }
    }

    /// Encode a decoded value, clamping into the valid code range.
    #[inline]
    pub fn encode(&self, v: f64) -> u16 {
        if is_bad(v) {
            return BAD_DATA_CODE;
        }
        let k = ((v - self.b) / self.m).round();
        if k < 0.0 {
            0
        } else if k > f64::from(FIELD_CODE_MAX) {
            FIELD_CODE_MAX
        } else {
            k as u16
        }
    }

    #[inline]
    pub fn get_code(&self, x: usize, y: usize) -> u16 {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn put_code(&mut self, k: u16, x: usize, y: usize) {
        let n = self.idx(x, y);
        self.data[n] = k;
    }

    /// Decoded value at `(x, y)`; the bad-data sentinel for missing samples.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.decode(self.get_code(x, y))
    }

    /// Encode and store a decoded value.
    ///
    /// Callers filling a field incrementally should finish with
    /// [`RasterField::calc_moments`].
    #[inline]
    pub fn put(&mut self, v: f64, x: usize, y: usize) {
        let k = self.encode(v);
        self.put_code(k, x, y);
    }

    #[inline]
    pub fn is_bad(&self, x: usize, y: usize) -> bool {
        self.get_code(x, y) == BAD_DATA_CODE
    }

    #[inline]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        self.get_code(x, y) <= FIELD_CODE_MAX
    }

    /// Structural "on" predicate: a valid, non-zero code. Off-grid
    /// coordinates are off; the boundary walker leans on that.
    #[inline]
    pub fn s_is_on(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.nx as i64 || y >= self.ny as i64 {
            return false;
        }
        let k = self.get_code(x as usize, y as usize);
        k > 0 && k <= FIELD_CODE_MAX
    }

    /// Fat "on" predicate: on at `(x, y)` or any of the three lower-left
    /// neighbors. Gives objects the right topological boundary.
    #[inline]
    pub fn f_is_on(&self, x: i64, y: i64) -> bool {
        self.s_is_on(x, y)
            || self.s_is_on(x - 1, y)
            || self.s_is_on(x - 1, y - 1)
            || self.s_is_on(x, y - 1)
    }

    /// Decoded min and max over the valid samples. `None` when every sample
    /// is missing.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &k in &self.data {
            if k == BAD_DATA_CODE {
                continue;
            }
            let v = self.decode(k);
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
        if lo.is_finite() {
            Some((lo, hi))
        } else {
            None
        }
    }

    //
    // Moments and derived geometry
    //

    /// Recompute the cached moments over the fat-on cells.
    pub fn calc_moments(&mut self) {
        let mut mom = Moments::default();
        for x in 0..self.nx as i64 {
            for y in 0..self.ny as i64 {
                if self.f_is_on(x, y) {
                    mom.add(x as f64, y as f64);
                }
            }
        }
        self.mom = mom;
    }

    pub fn moments(&self) -> &Moments {
        &self.mom
    }

    /// Fat-on cell count.
    pub fn area(&self) -> f64 {
        self.mom.area as f64
    }

    /// Structural-on cell count (independent of the moment cache).
    pub fn s_area(&self) -> usize {
        let mut count = 0;
        for x in 0..self.nx as i64 {
            for y in 0..self.ny as i64 {
                if self.s_is_on(x, y) {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn centroid(&self) -> Option<(f64, f64)> {
        self.mom.centroid()
    }

    pub fn angle_degrees(&self) -> Option<f64> {
        self.mom.angle_degrees()
    }

    pub fn curvature(&self) -> Option<(f64, f64, f64)> {
        self.mom.curvature()
    }

    /// Extents of the object along and across its principal axis, longest
    /// first.
    pub fn length_width(&self) -> Option<(f64, f64)> {
        let angle = self.angle_degrees()?.to_radians();
        let (e1x, e1y) = (angle.cos(), angle.sin());
        let (e2x, e2y) = (
            (angle + std::f64::consts::FRAC_PI_2).cos(),
            (angle + std::f64::consts::FRAC_PI_2).sin(),
        );

        let mut u_min = f64::INFINITY;
        let mut u_max = f64::NEG_INFINITY;
        let mut v_min = f64::INFINITY;
        let mut v_max = f64::NEG_INFINITY;
        let mut any = false;

        for x in 0..self.nx as i64 {
            for y in 0..self.ny as i64 {
                if !self.f_is_on(x, y) {
                    continue;
                }
                any = true;
                let (xx, yy) = (x as f64, y as f64);
                let u = e1x * xx + e1y * yy;
                let v = e2x * xx + e2y * yy;
                u_min = u_min.min(u);
                u_max = u_max.max(u);
                v_min = v_min.min(v);
                v_max = v_max.max(v);
            }
        }
        if !any {
            return None;
        }
        let u_extent = u_max - u_min;
        let v_extent = v_max - v_min;
        if u_extent >= v_extent {
            Some((u_extent, v_extent))
        } else {
            Some((v_extent, u_extent))
        }
    }

    /// Bounding box of the fat-on region. `None` for an empty field.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bb: Option<BoundingBox> = None;
        for x in 0..self.nx as i64 {
            for y in 0..self.ny as i64 {
                if !self.f_is_on(x, y) {
                    continue;
                }
                let (xu, yu) = (x as usize, y as usize);
                bb = Some(match bb {
                    None => BoundingBox {
                        x_ll: xu,
                        y_ll: yu,
                        x_ur: xu,
                        y_ur: yu,
                    },
                    Some(mut b) => {
                        b.x_ll = b.x_ll.min(xu);
                        b.y_ll = b.y_ll.min(yu);
                        b.x_ur = b.x_ur.max(xu);
                        b.y_ur = b.y_ur.max(yu);
                        b
                    }
                });
            }
        }
        bb
    }

    //
    // Functional transforms
    //

    /// Produce the 0/1 mask of samples satisfying the threshold. Missing
    /// samples come out 0.
    pub fn threshold(&self, t: crate::types::Threshold) -> RasterField {
        let mut out = RasterField::new(self.nx, self.ny);
        out.copy_header_from(self);
        for n in 0..self.data.len() {
            let k = self.data[n];
            let on = k != BAD_DATA_CODE && t.check(self.decode(k));
            out.data[n] = u16::from(on);
        }
        out.calc_moments();
        out
    }

    /// Re-quantize so decoded values span `[min_v, max_v]`, preserving the
    /// missing sentinel.
    pub fn rescale(&self, min_v: f64, max_v: f64) -> RasterField {
        let mut out = self.clone();
        out.set_range(min_v, max_v);
        for n in 0..self.data.len() {
            let k = self.data[n];
            out.data[n] = if k == BAD_DATA_CODE {
                BAD_DATA_CODE
            } else {
                out.encode(self.decode(k))
            };
        }
        out.calc_moments();
        out
    }

    /// Re-quantize a probability field onto `[0, 1]`.
    pub fn rescale_probability(&self) -> RasterField {
        self.rescale(0.0, 1.0)
    }

    /// Morphological dilation: each output code is the maximum input code
    /// within Chebyshev distance `radius`.
    pub fn expand(&self, radius: usize) -> RasterField {
        let mut out = self.clone();
        let r = radius as i64;
        for x in 0..self.nx as i64 {
            for y in 0..self.ny as i64 {
                let mut best = 0u16;
                for xx in (x - r)..=(x + r) {
                    for yy in (y - r)..=(y + r) {
                        if xx < 0 || yy < 0 || xx >= self.nx as i64 || yy >= self.ny as i64 {
                            continue;
                        }
                        let k = self.get_code(xx as usize, yy as usize);
                        if k != BAD_DATA_CODE && k > best {
                            best = k;
                        }
                    }
                }
                out.put_code(best, x as usize, y as usize);
            }
        }
        out.calc_moments();
        out
    }

    /// Zero the codes within `k` cells of each edge.
    pub fn zero_border(&self, k: usize) -> RasterField {
        self.border_value(k, 0)
    }

    /// Set the codes within `k` cells of each edge to `code`.
    pub fn border_value(&self, k: usize, code: u16) -> RasterField {
        let mut out = self.clone();
        for x in 0..self.nx {
            for y in 0..self.ny {
                if x < k || y < k || x + k >= self.nx || y + k >= self.ny {
                    out.put_code(code, x, y);
                }
            }
        }
        out.calc_moments();
        out
    }

    /// Shift by `(dx, dy)` cells with zero fill.
    pub fn translate(&self, dx: i64, dy: i64) -> RasterField {
        let mut out = RasterField::new(self.nx, self.ny);
        out.m = self.m;
        out.b = self.b;
        out.copy_header_from(self);
        for x in 0..self.nx as i64 {
            for y in 0..self.ny as i64 {
                let sx = x - dx;
                let sy = y - dy;
                if sx < 0 || sy < 0 || sx >= self.nx as i64 || sy >= self.ny as i64 {
                    continue;
                }
                let k = self.get_code(sx as usize, sy as usize);
                out.put_code(k, x as usize, y as usize);
            }
        }
        out.calc_moments();
        out
    }
}

/// Combine fields under an operation with strict missing-propagation: any
/// missing input at `(x, y)` makes the output missing there.
///
/// The output is re-quantized: with `raw_field_max` supplied the range is
/// `[0, raw_field_max]`; otherwise the range of the combined values is used.
pub fn combine(
    fields: &[RasterField],
    op: CombineOp,
    raw_field_max: Option<f64>,
) -> Result<RasterField> {
    let first = fields.first().ok_or(VerifyError::EmptyCombine)?;
    let (nx, ny) = (first.nx, first.ny);
    for f in &fields[1..] {
        if f.nx != nx || f.ny != ny {
            return Err(VerifyError::GridMismatch {
                nx1: nx,
                ny1: ny,
                nx2: f.nx,
                ny2: f.ny,
            });
        }
    }

    let mut cells = vec![BAD_DATA; nx * ny];
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;

    for n in 0..nx * ny {
        let mut acc = BAD_DATA;
        let mut missing = false;
        for f in fields {
            let k = f.data[n];
            if k == BAD_DATA_CODE {
                missing = true;
                break;
            }
            let v = f.decode(k);
            acc = if is_bad(acc) {
                v
            } else {
                match op {
                    CombineOp::Max => acc.max(v),
                    CombineOp::Min => acc.min(v),
                    CombineOp::Sum => acc + v,
                }
            };
        }
        if !missing && !is_bad(acc) {
            lo = lo.min(acc);
            hi = hi.max(acc);
            cells[n] = acc;
        }
    }

    let mut out = RasterField::new(nx, ny);
    out.copy_header_from(first);
    match raw_field_max {
        Some(max) => out.set_range(0.0, max),
        None if lo.is_finite() => out.set_range(lo, hi),
        None => {}
    }
    for n in 0..nx * ny {
        out.data[n] = out.encode(cells[n]);
    }
    out.calc_moments();
    Ok(out)
}
