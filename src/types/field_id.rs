//! Identification of the physical variable being verified.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};

/// How the level specification of a field is matched against observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelType {
    /// No level constraint.
    None,
    /// Accumulation interval; the observation level must equal it exactly.
    Accum,
    /// Vertical (surface) level; restricted to surface message types.
    Vert,
    /// Pressure level or pressure-level range in hPa.
    Pres,
    /// Record index within a source file.
    Record,
}

impl fmt::Display for LevelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LevelType::None => "none",
            LevelType::Accum => "accum",
            LevelType::Vert => "vert",
            LevelType::Pres => "pres",
            LevelType::Record => "record",
        };
        f.write_str(s)
    }
}

/// A level specification: type plus inclusive numeric range.
///
/// `low == high` everywhere except pressure levels, where a true range is
/// allowed and `low <= high` is enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelRange {
    pub kind: LevelType,
    pub low: f64,
    pub high: f64,
}

impl LevelRange {
    /// Single-level specification.
    pub fn single(kind: LevelType, level: f64) -> Self {
        Self {
            kind,
            low: level,
            high: level,
        }
    }

    /// Pressure-level range in hPa. Accepts the bounds in either order.
    pub fn pressure_range(a: f64, b: f64) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            kind: LevelType::Pres,
            low,
            high,
        }
    }

    /// Validate the type/range combination: a true range is only legal for
    /// pressure levels.
    pub fn validate(&self) -> Result<()> {
        if self.kind != LevelType::Pres && self.low != self.high {
            return Err(VerifyError::BadLevelRange {
                level_type: self.kind.to_string(),
                low: self.low,
                high: self.high,
            });
        }
        if self.low > self.high {
            return Err(VerifyError::BadLevelRange {
                level_type: self.kind.to_string(),
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    pub fn contains(&self, level: f64) -> bool {
        level >= self.low && level <= self.high
    }

    /// Canonical level string. Pressure ranges are written with the
    /// high-pressure (lower altitude) bound first, e.g. `P850-500`.
    pub fn level_str(&self) -> String {
        let prefix = match self.kind {
            LevelType::None => "L",
            LevelType::Accum => "A",
            LevelType::Vert => "Z",
            LevelType::Pres => "P",
            LevelType::Record => "R",
        };
        if self.low == self.high {
            format!("{}{}", prefix, self.low)
        } else {
            format!("{}{}-{}", prefix, self.high, self.low)
        }
    }
}

/// Names the physical variable to verify: numeric code, level
/// specification, and the vector/probability markers that change how the
/// score engine treats the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldId {
    /// Variable code (opaque to the core beyond the few special cases in
    /// [`crate::types::codes`]).
    pub code: i32,
    /// Human-readable variable abbreviation, e.g. `TMP`.
    pub name: String,
    pub level: LevelRange,
    /// Component of a vector pair (u/v winds).
    pub is_vector: bool,
    /// Forecast values are probabilities in [0, 1].
    pub is_probability: bool,
}

impl FieldId {
    pub fn new(code: i32, name: impl Into<String>, level: LevelRange) -> Self {
        Self {
            code,
            name: name.into(),
            level,
            is_vector: false,
            is_probability: false,
        }
    }

    pub fn vector(mut self) -> Self {
        self.is_vector = true;
        self
    }

    pub fn probability(mut self) -> Self {
        self.is_probability = true;
        self
    }

    /// `VAR/LEVEL` identification string used in output headers.
    pub fn info_str(&self) -> String {
        format!("{}/{}", self.name, self.level.level_str())
    }
}
