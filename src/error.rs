//! Fatal invariant violations raised by the verification core.
//!
//! Only structural errors live here. Missing data is never an error: it
//! propagates through every computation as the bad-data sentinel and shows
//! up in the output rows as missing values.

use thiserror::Error;

/// Errors that abort a verification run.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("grid mismatch: ({nx1}, {ny1}) != ({nx2}, {ny2})")]
    GridMismatch {
        nx1: usize,
        ny1: usize,
        nx2: usize,
        ny2: usize,
    },

    #[error("interpolation method {method} is not supported for {context}")]
    UnsupportedInterp { method: String, context: String },

    #[error("interpolation width {width} is too small for {method} (minimum {min})")]
    InterpWidthTooSmall {
        method: String,
        width: usize,
        min: usize,
    },

    #[error("pressure must be positive in vertical interpolation: p1={p1}, p2={p2}, target={target}")]
    NonPositivePressure { p1: f64, p2: f64, target: f64 },

    #[error("level range {low}-{high} is only valid for pressure levels, not {level_type}")]
    BadLevelRange {
        level_type: String,
        low: f64,
        high: f64,
    },

    #[error("no forecast levels defined for pressure-level task {task}")]
    NoForecastLevels { task: String },

    #[error("u-wind and v-wind pair counts differ: {u_pairs} != {v_pairs}")]
    VectorPairMismatch { u_pairs: usize, v_pairs: usize },

    #[error("bootstrap replicate count must be at least 1, got {n_rep}")]
    BadReplicateCount { n_rep: usize },

    #[error("bootstrap replicate proportion must be in (0, 1], got {prop}")]
    BadReplicateProportion { prop: f64 },

    #[error("{operation} requires an object with area > 0")]
    EmptyObject { operation: String },

    #[error("boundary walker hit an illegal corner combination at ({x}, {y}): (lr, ur, ul, ll) = ({lr}, {ur}, {ul}, {ll})")]
    BadBoundaryStep {
        x: i64,
        y: i64,
        lr: bool,
        ur: bool,
        ul: bool,
        ll: bool,
    },

    #[error("connected-component partition exceeded {max} cells")]
    PartitionOverflow { max: usize },

    #[error("combine requires at least one input field")]
    EmptyCombine,

    #[error("fractional coverage width must be at least 1, got {width}")]
    BadCoverageWidth { width: usize },

    #[error("intensity-scale tile dimension {dim} is not a power of two")]
    BadTileDimension { dim: usize },

    #[error("forecast and observation arrays must have the same length: {f_len} != {o_len}")]
    PairLengthMismatch { f_len: usize, o_len: usize },

    #[error("probability thresholds must define at least one bin, got {n_edges} edges")]
    BadProbThresholds { n_edges: usize },

    #[error("forecast and observation threshold lists must have the same length: {f_len} != {o_len}")]
    ThresholdListMismatch { f_len: usize, o_len: usize },

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type used throughout the crate.
pub type Result<T> = std::result::Result<T, VerifyError>;
