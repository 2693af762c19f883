//! Point-observation records as delivered by the ingest collaborators.

use chrono::{DateTime, Utc};

/// Shared header for a batch of observations from one report.
#[derive(Debug, Clone, PartialEq)]
pub struct ObsHeader {
    /// Message type tag, e.g. `ADPSFC`, `SFCSHP`.
    pub message_type: String,
    /// Station identifier.
    pub station_id: String,
    pub valid_time: DateTime<Utc>,
    pub lat: f64,
    /// Degrees east; the pairing engine applies no sign convention of its
    /// own beyond what the grid projection expects.
    pub lon: f64,
    /// Station elevation, meters.
    pub elevation: f64,
}

/// A single observed value under an [`ObsHeader`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Variable code of the observed quantity.
    pub code: i32,
    /// Level of the observation: pressure in hPa for upper-air reports,
    /// accumulation interval for precipitation.
    pub level: f64,
    /// Height of the observation, meters.
    pub height: f64,
    pub value: f64,
}
