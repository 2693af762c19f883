//! Threshold predicates applied to forecast and observation values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Comparison kind for a threshold predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreshCmp {
    /// No threshold: matches everything. Used where a threshold slot is
    /// optional, e.g. wind-speed filtering.
    Na,
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl ThreshCmp {
    fn abbr(self) -> &'static str {
        match self {
            ThreshCmp::Na => "na",
            ThreshCmp::Lt => "lt",
            ThreshCmp::Le => "le",
            ThreshCmp::Eq => "eq",
            ThreshCmp::Ne => "ne",
            ThreshCmp::Ge => "ge",
            ThreshCmp::Gt => "gt",
        }
    }
}

/// A threshold predicate: comparison kind plus numeric operand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Threshold {
    pub cmp: ThreshCmp,
    pub value: f64,
}

impl Threshold {
    pub fn new(cmp: ThreshCmp, value: f64) -> Self {
        Self { cmp, value }
    }

    /// The always-true threshold.
    pub fn na() -> Self {
        Self {
            cmp: ThreshCmp::Na,
            value: 0.0,
        }
    }

    pub fn is_na(&self) -> bool {
        self.cmp == ThreshCmp::Na
    }

    /// Evaluate the predicate against a value.
    pub fn check(&self, v: f64) -> bool {
        match self.cmp {
            ThreshCmp::Na => true,
            ThreshCmp::Lt => v < self.value,
            ThreshCmp::Le => v <= self.value,
            ThreshCmp::Eq => (v - self.value).abs() < 1.0e-10,
            ThreshCmp::Ne => (v - self.value).abs() >= 1.0e-10,
            ThreshCmp::Ge => v >= self.value,
            ThreshCmp::Gt => v > self.value,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_na() {
            write!(f, "na")
        } else {
            write!(f, "{}{}", self.cmp.abbr(), self.value)
        }
    }
}

impl FromStr for Threshold {
    type Err = String;

    /// Parse both the symbolic (`>=0.5`) and abbreviated (`ge0.5`) forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("na") {
            return Ok(Threshold::na());
        }
        let table: [(&str, ThreshCmp); 12] = [
            ("<=", ThreshCmp::Le),
            (">=", ThreshCmp::Ge),
            ("==", ThreshCmp::Eq),
            ("!=", ThreshCmp::Ne),
            ("<", ThreshCmp::Lt),
            (">", ThreshCmp::Gt),
            ("le", ThreshCmp::Le),
            ("ge", ThreshCmp::Ge),
            ("eq", ThreshCmp::Eq),
            ("ne", ThreshCmp::Ne),
            ("lt", ThreshCmp::Lt),
            ("gt", ThreshCmp::Gt),
        ];
        for (prefix, cmp) in table {
            if let Some(rest) = s.strip_prefix(prefix) {
                let value: f64 = rest
                    .trim()
                    .parse()
                    .map_err(|_| format!("bad threshold operand in {s:?}"))?;
                return Ok(Threshold::new(cmp, value));
            }
        }
        Err(format!("unrecognized threshold {s:?}"))
    }
}

impl TryFrom<String> for Threshold {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Threshold> for String {
    fn from(t: Threshold) -> String {
        t.to_string()
    }
}
