//! Built-in engine settings.

/// Default confidence-interval alpha.
pub const CI_ALPHA: f64 = 0.05;

/// Default bootstrap replicate count (bootstrap off).
pub const N_BOOT_REP: usize = 0;

/// Default bootstrap replicate proportion.
pub const BOOT_REP_PROP: f64 = 1.0;

/// Default bootstrap RNG seed.
pub const BOOT_SEED: u64 = 1;

/// Default interpolation validity-fraction threshold for point
/// verification; smoothing passes typically relax this to 0.5.
pub const INTERP_THRESH: f64 = 1.0;

/// Message types matched by the `ANYAIR` wildcard.
pub const ANYAIR_MSG_TYPES: &[&str] = &["AIRCAR", "AIRCFT"];

/// Message types matched by the `ANYSFC` wildcard.
pub const ANYSFC_MSG_TYPES: &[&str] = &["ADPSFC", "SFCSHP", "ADPUPA", "PROFLR", "MSONET"];

/// Message types matched by the `ONLYSF` wildcard, also the surface-kind
/// list used by vertical-level matching.
pub const ONLYSF_MSG_TYPES: &[&str] = &["ADPSFC", "SFCSHP"];
