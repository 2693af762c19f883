//! gridvx: the core of a gridded meteorological verification engine.
//!
//! Pairs forecast fields against reference fields (point observations or
//! gridded analyses) and computes verification statistics with confidence
//! intervals.
//!
//! ## Architecture
//!
//! - **Field container** (`field`): quantized 2-D grids with affine decode,
//!   bad-data sentinel, geometric moments, object labeling, and boundary
//!   tracing.
//! - **Interpolation kernel** (`interp`): horizontal neighborhood operators
//!   and vertical log-pressure interpolation.
//! - **Pair builder** (`pairs`): matched forecast/climatology/observation
//!   triples across message types, masks, and interpolation methods.
//! - **Score engine** (`stats`): categorical, multi-category, continuous,
//!   partial-sum, probabilistic, neighborhood, and intensity-scale scores.
//! - **CI engines** (`stats::ci`, `bootstrap`): normal-theory and bootstrap
//!   (percentile, BCa) confidence intervals.
//! - **Driver** (`driver`): iterates verification tasks and emits typed
//!   rows to a sink.
//!
//! File-format I/O, CLI parsing, plotting, and mask-file parsing are
//! external collaborators; the engine is synchronous and single-threaded,
//! and all working state lives in memory.

pub mod bootstrap;
pub mod config;
pub mod driver;
pub mod error;
pub mod field;
pub mod interp;
pub mod pairs;
pub mod stats;
pub mod types;

pub use config::{MessageTypeLists, OutputFlags, VerifyConfig};
pub use driver::{Driver, GridVerifyTask, MemorySink, RowRecord, RowSink, VerifyTask};
pub use error::{Result, VerifyError};
pub use field::RasterField;
pub use interp::InterpMethod;
pub use pairs::{LatLonPolyline, MaskSpec, PairSet, TaskPairs};
pub use types::{
    FieldId, GridProjection, LatLonGrid, LevelRange, LevelType, ObsHeader, Observation, Threshold,
    ThreshCmp, BAD_DATA,
};
