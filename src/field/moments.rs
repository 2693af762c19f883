//! Geometric moments of the "on" region of a field.
//!
//! The raw sums are cached on the field and recomputed whenever the set of
//! on cells changes; everything else here is derived on demand.

/// Raw geometric moments through third order, plus the cell count.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub area: u64,
    pub sx: f64,
    pub sy: f64,
    pub sxx: f64,
    pub sxy: f64,
    pub syy: f64,
    pub sxxx: f64,
    pub sxxy: f64,
    pub sxyy: f64,
    pub syyy: f64,
}

impl Moments {
    pub fn clear(&mut self) {
        *self = Moments::default();
    }

    /// Accumulate one on-cell at `(x, y)`.
    pub fn add(&mut self, x: f64, y: f64) {
        self.area += 1;
        self.sx += x;
        self.sy += y;
        self.sxx += x * x;
        self.sxy += x * y;
        self.syy += y * y;
        self.sxxx += x * x * x;
        self.sxxy += x * x * y;
        self.sxyy += x * y * y;
        self.syyy += y * y * y;
    }

    /// Centroid of the on region. Returns `None` for an empty region.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.area == 0 {
            return None;
        }
        let a = self.area as f64;
        Some((self.sx / a, self.sy / a))
    }

    /// Central second moments `(mxx, mxy, myy)`.
    fn central_second(&self) -> Option<(f64, f64, f64)> {
        let (xbar, ybar) = self.centroid()?;
        let a = self.area as f64;
        Some((
            self.sxx / a - xbar * xbar,
            self.sxy / a - xbar * ybar,
            self.syy / a - ybar * ybar,
        ))
    }

    /// Orientation angle of the principal axis, degrees in (-90, 90].
    pub fn angle_degrees(&self) -> Option<f64> {
        let (mxx, mxy, myy) = self.central_second()?;
        Some(0.5 * (2.0 * mxy).atan2(mxx - myy).to_degrees())
    }

    /// Least-squares circle fit through the on cells. Returns the radius of
    /// curvature and the fitted center `(radius, xc, yc)`.
    ///
    /// Solves the algebraic circle fit in centered coordinates; the normal
    /// equations involve only moments through third order.
    pub fn curvature(&self) -> Option<(f64, f64, f64)> {
        if self.area < 3 {
            return None;
        }
        let a = self.area as f64;
        let (xbar, ybar) = self.centroid()?;

        // Central moments through third order from the raw sums.
        let m20 = self.sxx - self.sx * self.sx / a;
        let m11 = self.sxy - self.sx * self.sy / a;
        let m02 = self.syy - self.sy * self.sy / a;
        let m30 = self.sxxx - 3.0 * xbar * self.sxx + 2.0 * xbar * xbar * self.sx;
        let m03 = self.syyy - 3.0 * ybar * self.syy + 2.0 * ybar * ybar * self.sy;
        let m21 = self.sxxy - ybar * self.sxx - 2.0 * xbar * self.sxy + 2.0 * a * xbar * xbar * ybar;
        let m12 = self.sxyy - xbar * self.syy - 2.0 * ybar * self.sxy + 2.0 * a * xbar * ybar * ybar;

        // Normal equations of the Kasa circle fit:
        //   m20*u + m11*v = (m30 + m12)/2
        //   m11*u + m02*v = (m03 + m21)/2
        let det = m20 * m02 - m11 * m11;
        if det.abs() < 1.0e-12 {
            return None;
        }
        let rhs1 = 0.5 * (m30 + m12);
        let rhs2 = 0.5 * (m03 + m21);
        let u = (rhs1 * m02 - rhs2 * m11) / det;
        let v = (rhs2 * m20 - rhs1 * m11) / det;

        let r2 = u * u + v * v + (m20 + m02) / a;
        if r2 <= 0.0 {
            return None;
        }
        Some((r2.sqrt(), xbar + u, ybar + v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_moments_degenerate() {
        let m = Moments::default();
        assert_eq!(m.area, 0);
        assert!(m.centroid().is_none());
        assert!(m.angle_degrees().is_none());
    }

    #[test]
    fn test_centroid_of_square() {
        let mut m = Moments::default();
        for x in 0..4 {
            for y in 0..4 {
                m.add(x as f64, y as f64);
            }
        }
        let (cx, cy) = m.centroid().unwrap();
        assert!((cx - 1.5).abs() < 1e-12);
        assert!((cy - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_angle_of_horizontal_bar() {
        let mut m = Moments::default();
        for x in 0..20 {
            for y in 0..2 {
                m.add(x as f64, y as f64);
            }
        }
        let angle = m.angle_degrees().unwrap();
        assert!(angle.abs() < 1e-9, "horizontal bar should align with x-axis, got {angle}");
    }

    #[test]
    fn test_curvature_of_ring() {
        // Cells on a circle of radius 10 about (15, 15).
        let mut m = Moments::default();
        for i in 0..360 {
            let t = (i as f64).to_radians();
            m.add(15.0 + 10.0 * t.cos(), 15.0 + 10.0 * t.sin());
        }
        let (r, xc, yc) = m.curvature().unwrap();
        assert!((r - 10.0).abs() < 0.1, "radius {r}");
        assert!((xc - 15.0).abs() < 0.1);
        assert!((yc - 15.0).abs() < 0.1);
    }
}
