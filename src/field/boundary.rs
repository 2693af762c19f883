//! Boundary tracing, convex hulls, and outline extraction for labeled
//! objects.
//!
//! The boundary walker travels clockwise along cell corners. At each step it
//! inspects the four cells adjacent to the corner in the traveling frame
//! (lower-left, lower-right, upper-right, upper-left) and steers by the
//! legal on/off combinations; the illegal combinations indicate a labeling
//! bug and abort the walk.

use crate::error::{Result, VerifyError};

use super::RasterField;

/// Direction of travel along the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryDir {
    PlusX,
    PlusY,
    MinusX,
    MinusY,
}

impl BoundaryDir {
    fn turn_left(self) -> Self {
        match self {
            BoundaryDir::PlusX => BoundaryDir::PlusY,
            BoundaryDir::PlusY => BoundaryDir::MinusX,
            BoundaryDir::MinusX => BoundaryDir::MinusY,
            BoundaryDir::MinusY => BoundaryDir::PlusX,
        }
    }

    fn turn_right(self) -> Self {
        match self {
            BoundaryDir::PlusX => BoundaryDir::MinusY,
            BoundaryDir::MinusY => BoundaryDir::MinusX,
            BoundaryDir::MinusX => BoundaryDir::PlusY,
            BoundaryDir::PlusY => BoundaryDir::PlusX,
        }
    }
}

/// An ordered list of `(u, v)` vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyline {
    pub points: Vec<(f64, f64)>,
}

impl Polyline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point(&mut self, u: f64, v: f64) {
        self.points.push((u, v));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Reverse the vertex order, inverting the orientation.
    pub fn reversed(&self) -> Polyline {
        let mut points = self.points.clone();
        points.reverse();
        Polyline { points }
    }

    /// Shoelace signed area of the closed polygon. Positive for
    /// counter-clockwise orientation.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let (x1, y1) = self.points[i];
            let (x2, y2) = self.points[(i + 1) % n];
            sum += x1 * y2 - x2 * y1;
        }
        0.5 * sum
    }
}

/// Distance between two points.
fn point_dist(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
}

/// Minimum distance from `(px, py)` to the segment `(x1, y1)-(x2, y2)`.
fn min_dist_linesegment(x1: f64, y1: f64, x2: f64, y2: f64, px: f64, py: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    let len2 = dx * dx + dy * dy;
    if len2 <= f64::EPSILON {
        return point_dist(x1, y1, px, py);
    }
    let t = (((px - x1) * dx + (py - y1) * dy) / len2).clamp(0.0, 1.0);
    point_dist(x1 + t * dx, y1 + t * dy, px, py)
}

/// One step of the clockwise boundary walk. Advances the corner position and
/// returns the outgoing direction.
fn boundary_step(
    field: &RasterField,
    x: &mut i64,
    y: &mut i64,
    dir: BoundaryDir,
) -> Result<BoundaryDir> {
    // Corner cells in the traveling frame.
    let (lr, ur, ul, ll) = match dir {
        BoundaryDir::PlusX => {
            let t = (
                field.s_is_on(*x, *y - 1),
                field.s_is_on(*x + 1, *y - 1),
                field.s_is_on(*x + 1, *y),
                field.s_is_on(*x, *y),
            );
            *x += 1;
            t
        }
        BoundaryDir::PlusY => {
            let t = (
                field.s_is_on(*x, *y),
                field.s_is_on(*x, *y + 1),
                field.s_is_on(*x - 1, *y + 1),
                field.s_is_on(*x - 1, *y),
            );
            *y += 1;
            t
        }
        BoundaryDir::MinusX => {
            let t = (
                field.s_is_on(*x - 1, *y),
                field.s_is_on(*x - 2, *y),
                field.s_is_on(*x - 2, *y - 1),
                field.s_is_on(*x - 1, *y - 1),
            );
            *x -= 1;
            t
        }
        BoundaryDir::MinusY => {
            let t = (
                field.s_is_on(*x - 1, *y - 1),
                field.s_is_on(*x - 1, *y - 2),
                field.s_is_on(*x, *y - 2),
                field.s_is_on(*x, *y - 1),
            );
            *y -= 1;
            t
        }
    };

    // Steer by the legal corner combinations; single-corner cases turn in
    // toward the body, opposite diagonals continue straight, three-corner
    // cases turn the remaining way.
    match (lr, ur, ul, ll) {
        (false, false, false, true) // lower-left only
        | (true, false, true, false) // lower-right + upper-left
        | (true, true, true, false) // all but lower-left
            => Ok(dir.turn_left()),
        (true, false, false, false) // lower-right only
        | (false, true, false, true) // upper-right + lower-left
        | (false, true, true, true) // all but lower-right
            => Ok(dir.turn_right()),
        (false, false, true, true) // upper-left + lower-left
        | (true, true, false, false) // lower-right + upper-right
            => Ok(dir),
        _ => Err(VerifyError::BadBoundaryStep {
            x: *x,
            y: *y,
            lr,
            ur,
            ul,
            ll,
        }),
    }
}

impl RasterField {
    /// First fat-on cell in x-major scan order. The walk starts here
    /// traveling `+x`.
    fn first_on_cell(&self) -> Option<(i64, i64)> {
        for x in 0..self.nx() as i64 {
            for y in 0..self.ny() as i64 {
                if self.f_is_on(x, y) {
                    return Some((x, y));
                }
            }
        }
        None
    }

    /// Clockwise boundary of a single labeled object, keeping only the
    /// corners where the direction changes.
    pub fn single_boundary(&self) -> Result<Polyline> {
        self.single_boundary_offset(false, true, 0.0)
    }

    /// Boundary of a single labeled object.
    ///
    /// `all_points` keeps every corner instead of only direction changes;
    /// `clockwise = false` reverses the polyline; `offset` shifts each vertex
    /// by `(d, d)`, letting callers pick which grid-box corner a cell
    /// represents (`-0.5` centers the box on the cell).
    pub fn single_boundary_offset(
        &self,
        all_points: bool,
        clockwise: bool,
        offset: f64,
    ) -> Result<Polyline> {
        let (x0, y0) = self.first_on_cell().ok_or(VerifyError::EmptyObject {
            operation: "single_boundary".into(),
        })?;

        let mut boundary = Polyline::new();
        boundary.add_point(x0 as f64 + offset, y0 as f64 + offset);

        // Due to the search order the initial direction is +x.
        let mut dir = BoundaryDir::PlusX;
        let (mut xn, mut yn) = (x0, y0);
        // Any legal walk visits each corner at most once per direction.
        let step_cap = 4 * self.nx() * self.ny() + 8;

        for step in 0.. {
            if step > step_cap {
                return Err(VerifyError::BadBoundaryStep {
                    x: xn,
                    y: yn,
                    lr: false,
                    ur: false,
                    ul: false,
                    ll: false,
                });
            }
            let new_dir = boundary_step(self, &mut xn, &mut yn, dir)?;
            let closed = xn == x0 && yn == y0;
            if !closed && (all_points || new_dir != dir) {
                boundary.add_point(xn as f64 + offset, yn as f64 + offset);
            }
            dir = new_dir;
            if closed {
                break;
            }
        }

        Ok(if clockwise {
            boundary
        } else {
            boundary.reversed()
        })
    }

    /// Boundaries of every object in a field, one polyline per connected
    /// component, all with the same orientation.
    pub fn composite_boundary(&self, all_points: bool, clockwise: bool) -> Result<Vec<Polyline>> {
        let (labels, n) = super::split(self)?;
        let mut out = Vec::with_capacity(n);
        for i in 1..=n as u16 {
            let single = super::select(&labels, i);
            out.push(single.single_boundary_offset(all_points, clockwise, 0.0)?);
        }
        Ok(out)
    }

    /// Leftmost fat-on x in row `y`.
    fn x_left(&self, y: i64) -> Option<i64> {
        (0..self.nx() as i64).find(|&x| self.f_is_on(x, y))
    }

    /// Rightmost fat-on x in row `y`.
    fn x_right(&self, y: i64) -> Option<i64> {
        (0..self.nx() as i64).rev().find(|&x| self.f_is_on(x, y))
    }

    /// Convex hull of the on region: gift-wrapping over the left- and
    /// right-most cells of each scan row, starting from the lowest point and
    /// sweeping the tangent angle through `[0, 360)`.
    pub fn convex_hull(&self) -> Result<Polyline> {
        if self.area() <= 0.0 {
            return Err(VerifyError::EmptyObject {
                operation: "convex_hull".into(),
            });
        }

        // Row extremes are the only candidate hull points.
        let mut outline = Polyline::new();
        for y in 0..self.ny() as i64 {
            let Some(l) = self.x_left(y) else { continue };
            outline.add_point(l as f64, y as f64);
            if let Some(r) = self.x_right(y) {
                if r != l {
                    outline.add_point(r as f64, y as f64);
                }
            }
        }

        // Start from the lowest point.
        let start = outline
            .points
            .iter()
            .enumerate()
            .min_by(|a, b| a.1 .1.total_cmp(&b.1 .1))
            .map(|(i, _)| i)
            .ok_or(VerifyError::EmptyObject {
                operation: "convex_hull".into(),
            })?;

        let mut index = vec![start];
        let (mut e1u, mut e1v) = (1.0f64, 0.0f64);

        loop {
            let (e2u, e2v) = (-e1v, e1u);
            let last = *index.last().unwrap_or(&start);
            let (p1u, p1v) = outline.points[last];

            let mut angle_low = f64::INFINITY;
            let mut j_best: Option<usize> = None;
            for (k, &(p2u, p2v)) in outline.points.iter().enumerate() {
                if k == last {
                    continue;
                }
                let alpha = (p2u - p1u) * e1u + (p2v - p1v) * e1v;
                let beta = (p2u - p1u) * e2u + (p2v - p1v) * e2v;
                let mut angle = beta.atan2(alpha).to_degrees();
                angle -= 360.0 * (angle / 360.0).floor();
                if angle > 359.9999 {
                    angle = 0.0;
                }
                if angle < angle_low {
                    angle_low = angle;
                    j_best = Some(k);
                }
            }
            let j = j_best.ok_or(VerifyError::EmptyObject {
                operation: "convex_hull".into(),
            })?;

            let (p2u, p2v) = outline.points[j];
            let t = point_dist(p1u, p1v, p2u, p2v);
            e1u = (p2u - p1u) / t;
            e1v = (p2v - p1v) / t;
            index.push(j);

            if index.len() >= 3 && index[index.len() - 1] == index[0] {
                break;
            }
        }

        index.pop();
        let mut hull = Polyline::new();
        for &i in &index {
            let (u, v) = outline.points[i];
            hull.add_point(u, v);
        }
        Ok(hull)
    }

    /// `(hull area - object area) / hull area`, in `[0, 1)`; zero for convex
    /// objects.
    pub fn complexity(&self) -> Result<f64> {
        let count = self.s_area();
        if count == 0 {
            return Err(VerifyError::EmptyObject {
                operation: "complexity".into(),
            });
        }
        let hull = self.convex_hull()?.signed_area().abs();
        Ok((hull - count as f64) / hull)
    }

    /// `n` outline points equally spaced in arc length along the boundary,
    /// starting at the orientation-axis intersection.
    pub fn outline_dist(&self, n: usize) -> Result<Polyline> {
        let (xc, yc) = self.centroid().ok_or(VerifyError::EmptyObject {
            operation: "outline_dist".into(),
        })?;
        let boundary = self.single_boundary_offset(true, true, 0.0)?;
        let step = boundary.len() as f64 / n as f64;

        let angle = self.angle_degrees().unwrap_or(0.0);
        let start = self
            .outline_point(angle, xc, yc, &boundary, true)
            .ok_or(VerifyError::EmptyObject {
                operation: "outline_dist".into(),
            })?;

        let mut outline = Polyline::new();
        for i in 0..n {
            let j = ((start as f64 + i as f64 * step).round() as usize) % boundary.len();
            let (u, v) = boundary.points[j];
            outline.add_point(u, v);
        }
        Ok(outline)
    }

    /// Outline points spaced a fixed number of boundary corners apart.
    pub fn outline_step(&self, step: usize) -> Result<Polyline> {
        let (xc, yc) = self.centroid().ok_or(VerifyError::EmptyObject {
            operation: "outline_step".into(),
        })?;
        let boundary = self.single_boundary_offset(true, true, 0.0)?;

        let angle = self.angle_degrees().unwrap_or(0.0);
        let start = self
            .outline_point(angle, xc, yc, &boundary, true)
            .ok_or(VerifyError::EmptyObject {
                operation: "outline_step".into(),
            })?;

        let mut outline = Polyline::new();
        for i in 0..(boundary.len() / step) {
            let j = (start + i * step) % boundary.len();
            let (u, v) = boundary.points[j];
            outline.add_point(u, v);
        }
        Ok(outline)
    }

    /// `n` outline points at equal rotation-angle increments about the
    /// centroid, measured clockwise from the orientation axis. A ray that
    /// misses the boundary is resolved by testing the opposite ray and
    /// taking the nearest intersection instead of the farthest.
    pub fn outline_angle(&self, n: usize) -> Result<Polyline> {
        let (xc, yc) = self.centroid().ok_or(VerifyError::EmptyObject {
            operation: "outline_angle".into(),
        })?;
        let boundary = self.single_boundary_offset(true, true, 0.0)?;

        let axis = self.angle_degrees().unwrap_or(0.0);
        let step = 360.0 / n as f64;

        let mut index = Vec::with_capacity(n);
        for i in 0..n {
            let rot = axis + i as f64 * step;
            let hit = self
                .outline_point(rot, xc, yc, &boundary, true)
                .or_else(|| self.outline_point(rot + 180.0, xc, yc, &boundary, false))
                .ok_or(VerifyError::EmptyObject {
                    operation: "outline_angle".into(),
                })?;
            index.push(hit);
        }

        // Present the points in boundary order, starting from the axis hit.
        let start_i = index[0];
        index.sort_unstable();
        let start_pos = index.iter().position(|&i| i == start_i).unwrap_or(0);

        let mut outline = Polyline::new();
        for j in 0..n {
            let (u, v) = boundary.points[index[(start_pos + j) % n]];
            outline.add_point(u, v);
        }
        Ok(outline)
    }

    /// Index of the boundary point intersected by the ray from `(xc, yc)` at
    /// `angle` degrees: among points within half a cell of the ray, the one
    /// farthest from the centroid (`max`) or nearest (`!max`).
    fn outline_point(
        &self,
        angle: f64,
        xc: f64,
        yc: f64,
        boundary: &Polyline,
        max: bool,
    ) -> Option<usize> {
        let e1x = angle.to_radians().cos();
        let e1y = angle.to_radians().sin();

        // March the ray to the grid edge.
        let (mut x, mut y) = (xc, yc);
        while x >= 0.0 && x < self.nx() as f64 && y >= 0.0 && y < self.ny() as f64 {
            x += e1x;
            y += e1y;
        }
        let mm = if e1x.abs() < f64::EPSILON {
            0.0
        } else {
            e1y / e1x
        };
        let (xb, yb) = if x >= self.nx() as f64 {
            let xb = self.nx() as f64;
            (xb, mm * (xb - xc) + yc)
        } else if y >= self.ny() as f64 {
            let yb = self.ny() as f64;
            (if mm == 0.0 { xc } else { (yb - yc) / mm + xc }, yb)
        } else if x < 0.0 {
            (0.0, mm * (0.0 - xc) + yc)
        } else {
            let yb = 0.0;
            (if mm == 0.0 { xc } else { (yb - yc) / mm + xc }, yb)
        };
        let mut best: Option<usize> = None;
        let mut extreme = if max { f64::NEG_INFINITY } else { f64::INFINITY };
        for (i, &(u, v)) in boundary.points.iter().enumerate() {
            if min_dist_linesegment(xc, yc, xb, yb, u, v) <= 0.5 {
                let cd = point_dist(xc, yc, u, v);
                if (max && cd >= extreme) || (!max && cd <= extreme) {
                    extreme = cd;
                    best = Some(i);
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_field(nx: usize, ny: usize, x0: usize, y0: usize, w: usize, h: usize) -> RasterField {
        let mut values = vec![0.0; nx * ny];
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                values[y * nx + x] = 1.0;
            }
        }
        RasterField::from_values(nx, ny, &values)
    }

    #[test]
    fn test_boundary_of_square_block() {
        let field = block_field(8, 8, 2, 2, 3, 3);
        let boundary = field.single_boundary().unwrap();
        // A rectangle's direction-change boundary is its four corners.
        assert_eq!(boundary.len(), 4);
        // The walker's native orientation carries positive signed area in
        // the y-up corner frame.
        assert!(boundary.signed_area() > 0.0);
    }

    #[test]
    fn test_boundary_closure_and_reversal() {
        let field = block_field(10, 10, 1, 3, 5, 4);
        let all = field.single_boundary_offset(true, true, 0.0).unwrap();
        assert!(all.len() <= 4 * 10);

        let ccw = field.single_boundary_offset(true, false, 0.0).unwrap();
        let mut rev = ccw.points.clone();
        rev.reverse();
        assert_eq!(all.points, rev);
    }

    #[test]
    fn test_boundary_empty_field_fails() {
        let field = RasterField::new(4, 4);
        assert!(matches!(
            field.single_boundary(),
            Err(VerifyError::EmptyObject { .. })
        ));
    }

    #[test]
    fn test_boundary_single_cell() {
        let field = block_field(5, 5, 2, 2, 1, 1);
        let boundary = field.single_boundary_offset(true, true, 0.0).unwrap();
        // A single cell traces its four corners.
        assert_eq!(boundary.len(), 4);
    }

    #[test]
    fn test_convex_hull_of_block() {
        let field = block_field(10, 10, 2, 2, 4, 4);
        let hull = field.convex_hull().unwrap();
        assert!(hull.len() >= 4);
        let area = hull.signed_area().abs();
        // Row-extreme hull of fat cells spans a 4x4 corner lattice.
        assert!((area - 16.0).abs() <= 2.0, "hull area {area}");
    }

    #[test]
    fn test_complexity_convex_is_low() {
        let field = block_field(12, 12, 3, 3, 5, 5);
        let c = field.complexity().unwrap();
        assert!(c >= 0.0 && c < 0.4, "complexity {c}");
    }

    #[test]
    fn test_complexity_l_shape_exceeds_block() {
        let block = block_field(12, 12, 2, 2, 6, 6);
        // L-shape: remove the upper-right quadrant of the block.
        let mut values = vec![0.0; 144];
        for y in 2..8 {
            for x in 2..8 {
                if !(x >= 5 && y >= 5) {
                    values[y * 12 + x] = 1.0;
                }
            }
        }
        let ell = RasterField::from_values(12, 12, &values);
        assert!(ell.complexity().unwrap() > block.complexity().unwrap());
    }

    #[test]
    fn test_outline_dist_points_on_boundary() {
        let field = block_field(12, 12, 3, 3, 5, 4);
        let boundary = field.single_boundary_offset(true, true, 0.0).unwrap();
        let outline = field.outline_dist(8).unwrap();
        assert_eq!(outline.len(), 8);
        for p in &outline.points {
            assert!(boundary.points.contains(p));
        }
    }

    #[test]
    fn test_outline_angle_count() {
        let field = block_field(16, 16, 4, 4, 6, 6);
        let outline = field.outline_angle(12).unwrap();
        assert_eq!(outline.len(), 12);
    }

    #[test]
    fn test_composite_boundary_per_object() {
        let mut values = vec![0.0; 100];
        for y in 1..3 {
            for x in 1..3 {
                values[y * 10 + x] = 1.0;
            }
        }
        for y in 6..9 {
            for x in 6..9 {
                values[y * 10 + x] = 1.0;
            }
        }
        let field = RasterField::from_values(10, 10, &values);
        let boundaries = field.composite_boundary(false, true).unwrap();
        assert_eq!(boundaries.len(), 2);
        for b in &boundaries {
            assert!(b.len() >= 4);
            assert!(b.signed_area() > 0.0);
        }
    }
}
