//! Shared value types: bad-data sentinels, thresholds, field identifiers,
//! observation records, and the grid-projection contract.

mod field_id;
mod obs;
mod thresh;

pub use field_id::{FieldId, LevelRange, LevelType};
pub use obs::{ObsHeader, Observation};
pub use thresh::{ThreshCmp, Threshold};

/// Variable codes the core treats specially.
pub mod codes {
    /// u-component of wind.
    pub const UGRD: i32 = 33;
    /// v-component of wind.
    pub const VGRD: i32 = 34;
    /// Specific humidity, vertically interpolated in log space.
    pub const SPFH: i32 = 51;
    /// Precipitation rate.
    pub const PRATE: i32 = 59;
    /// Thunderstorm probability.
    pub const TSTM: i32 = 60;
    /// Total precipitation.
    pub const APCP: i32 = 61;
    /// Large-scale precipitation.
    pub const NCPCP: i32 = 62;
    /// Convective precipitation.
    pub const ACPCP: i32 = 63;

    /// Precipitation-type codes get the zero-zero pairs masked out before
    /// rank correlations are computed.
    pub fn is_precip(code: i32) -> bool {
        matches!(code, PRATE | TSTM | APCP | NCPCP | ACPCP)
    }
}

/// Sentinel for missing values in decoded (floating-point) space.
pub const BAD_DATA: f64 = -9999.0;

/// Sentinel for missing values in integer space.
pub const BAD_DATA_INT: i32 = -9999;

/// Largest valid quantized sample code. Codes above this are reserved for
/// flag values.
pub const FIELD_CODE_MAX: u16 = 65525;

/// Reserved quantized code marking a missing sample.
pub const BAD_DATA_CODE: u16 = u16::MAX;

/// Sample size at or above which normal critical values replace Student's t.
pub const LARGE_SAMPLE_THRESHOLD: usize = 30;

/// Check a decoded value against the missing sentinel. NaN is also treated
/// as missing so that float arithmetic can never resurrect a bad value.
#[inline]
pub fn is_bad(v: f64) -> bool {
    v.is_nan() || (v - BAD_DATA).abs() < 1.0e-5
}

/// Tolerant floating-point equality, used wherever the original algorithms
/// compare accumulated doubles.
#[inline]
pub fn is_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1.0e-10
}

/// The grid-projection contract the pairing engine consumes.
///
/// Implementations convert between earth and grid coordinates. Equality must
/// compare projection parameters, never pointer identity; `proj_eq` exists so
/// that trait objects can be compared.
pub trait GridProjection {
    /// Convert `(lat, lon)` to fractional grid coordinates.
    fn latlon_to_xy(&self, lat: f64, lon: f64) -> (f64, f64);

    /// Convert fractional grid coordinates back to `(lat, lon)`.
    fn xy_to_latlon(&self, x: f64, y: f64) -> (f64, f64);

    /// Grid points in the x-direction.
    fn nx(&self) -> usize;

    /// Grid points in the y-direction.
    fn ny(&self) -> usize;

    /// Short grid name.
    fn name(&self) -> &str;

    /// Parameter-wise equality against another projection.
    fn proj_eq(&self, other: &dyn GridProjection) -> bool;
}

/// A regular latitude/longitude grid: the simplest projection the engine
/// ships with, and the one the test suite verifies against.
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonGrid {
    name: String,
    nx: usize,
    ny: usize,
    /// Latitude of the (0, 0) grid point, degrees.
    pub lat_ll: f64,
    /// Longitude of the (0, 0) grid point, degrees east.
    pub lon_ll: f64,
    /// Grid spacing in latitude, degrees per cell.
    pub delta_lat: f64,
    /// Grid spacing in longitude, degrees per cell.
    pub delta_lon: f64,
}

impl LatLonGrid {
    pub fn new(
        name: impl Into<String>,
        nx: usize,
        ny: usize,
        lat_ll: f64,
        lon_ll: f64,
        delta_lat: f64,
        delta_lon: f64,
    ) -> Self {
        Self {
            name: name.into(),
            nx,
            ny,
            lat_ll,
            lon_ll,
            delta_lat,
            delta_lon,
        }
    }
}

impl GridProjection for LatLonGrid {
    fn latlon_to_xy(&self, lat: f64, lon: f64) -> (f64, f64) {
        (
            (lon - self.lon_ll) / self.delta_lon,
            (lat - self.lat_ll) / self.delta_lat,
        )
    }

    fn xy_to_latlon(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.lat_ll + y * self.delta_lat,
            self.lon_ll + x * self.delta_lon,
        )
    }

    fn nx(&self) -> usize {
        self.nx
    }

    fn ny(&self) -> usize {
        self.ny
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn proj_eq(&self, other: &dyn GridProjection) -> bool {
        other.nx() == self.nx && other.ny() == self.ny && {
            // Two projections agree iff they place the grid corners at the
            // same earth locations.
            let (lat0, lon0) = self.xy_to_latlon(0.0, 0.0);
            let (olat0, olon0) = other.xy_to_latlon(0.0, 0.0);
            let (lat1, lon1) = self.xy_to_latlon(self.nx as f64 - 1.0, self.ny as f64 - 1.0);
            let (olat1, olon1) = other.xy_to_latlon(self.nx as f64 - 1.0, self.ny as f64 - 1.0);
            is_eq(lat0, olat0) && is_eq(lon0, olon0) && is_eq(lat1, olat1) && is_eq(lon1, olon1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_data_detection() {
        assert!(is_bad(BAD_DATA));
        assert!(is_bad(f64::NAN));
        assert!(!is_bad(0.0));
        assert!(!is_bad(-9998.0));
    }

    #[test]
    fn test_latlon_grid_round_trip() {
        let grid = LatLonGrid::new("test", 10, 10, 30.0, -110.0, 0.5, 0.5);
        let (x, y) = grid.latlon_to_xy(32.0, -108.0);
        let (lat, lon) = grid.xy_to_latlon(x, y);
        assert!((lat - 32.0).abs() < 1e-9);
        assert!((lon + 108.0).abs() < 1e-9);
    }

    #[test]
    fn test_proj_eq_compares_parameters() {
        let a = LatLonGrid::new("a", 10, 10, 30.0, -110.0, 0.5, 0.5);
        let b = LatLonGrid::new("b", 10, 10, 30.0, -110.0, 0.5, 0.5);
        let c = LatLonGrid::new("c", 10, 10, 31.0, -110.0, 0.5, 0.5);
        // Same parameters, different names: equal.
        assert!(a.proj_eq(&b));
        assert!(!a.proj_eq(&c));
    }
}
