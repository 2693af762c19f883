//! Masking regions applied to observation locations.

use crate::field::RasterField;

/// A named polyline mask on the earth: a closed sequence of `(lat, lon)`
/// vertices tested by ray casting.
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonPolyline {
    pub name: String,
    /// Vertices as `(lat, lon)` in the caller's longitude-sign convention.
    pub vertices: Vec<(f64, f64)>,
    /// Set when the vertices use degrees west positive; test points arrive
    /// in degrees east and are flipped to match.
    pub west_positive: bool,
}

impl LatLonPolyline {
    pub fn new(name: impl Into<String>, vertices: Vec<(f64, f64)>) -> Self {
        Self {
            name: name.into(),
            vertices,
            west_positive: false,
        }
    }

    /// Even-odd ray-casting inside test in the `(lon, lat)` plane.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let lon = if self.west_positive { -lon } else { lon };
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (lat_i, lon_i) = self.vertices[i];
            let (lat_j, lon_j) = self.vertices[j];
            if ((lat_i > lat) != (lat_j > lat))
                && lon < (lon_j - lon_i) * (lat - lat_i) / (lat_j - lat_i) + lon_i
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// The masking rules a pair set can carry.
#[derive(Debug, Clone)]
pub enum MaskSpec {
    /// A 0/1 field on the verification grid, evaluated at the observation's
    /// grid cell.
    Grid { name: String, field: RasterField },
    /// A polyline on the earth, evaluated at the observation's lat/lon.
    Polyline(LatLonPolyline),
    /// A literal station-id match.
    StationId(String),
}

impl MaskSpec {
    pub fn name(&self) -> &str {
        match self {
            MaskSpec::Grid { name, .. } => name,
            MaskSpec::Polyline(p) => &p.name,
            MaskSpec::StationId(sid) => sid,
        }
    }

    /// Whether an observation at grid cell `(x, y)`, earth location
    /// `(lat, lon)`, with station id `sid` falls inside this mask.
    pub fn matches(&self, x: i64, y: i64, lat: f64, lon: f64, sid: &str) -> bool {
        match self {
            MaskSpec::Grid { field, .. } => field.s_is_on(x, y),
            MaskSpec::Polyline(p) => p.contains(lat, lon),
            MaskSpec::StationId(mask_sid) => sid == mask_sid,
        }
    }
}
