//! Engine settings: CI alphas, bootstrap parameters, message-type lists,
//! and output-family flags.
//!
//! Settings load from a TOML file with built-in defaults filling the gaps,
//! and are immutable for the duration of a driver invocation.

pub mod defaults;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::bootstrap::{BootMethod, BootstrapSpec};

/// Membership lists behind the message-type wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTypeLists {
    pub anyair: Vec<String>,
    pub anysfc: Vec<String>,
    pub onlysf: Vec<String>,
}

impl Default for MessageTypeLists {
    fn default() -> Self {
        let to_vec = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        Self {
            anyair: to_vec(defaults::ANYAIR_MSG_TYPES),
            anysfc: to_vec(defaults::ANYSFC_MSG_TYPES),
            onlysf: to_vec(defaults::ONLYSF_MSG_TYPES),
        }
    }
}

/// On/off switches per output row family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFlags {
    pub fho: bool,
    pub ctc: bool,
    pub cts: bool,
    pub mctc: bool,
    pub mcts: bool,
    pub cnt: bool,
    pub sl1l2: bool,
    pub sal1l2: bool,
    pub vl1l2: bool,
    pub val1l2: bool,
    pub pct: bool,
    pub pstd: bool,
    pub pjc: bool,
    pub prc: bool,
    pub nbrctc: bool,
    pub nbrcts: bool,
    pub nbrcnt: bool,
    pub isc: bool,
    pub mpr: bool,
}

impl Default for OutputFlags {
    fn default() -> Self {
        Self {
            fho: true,
            ctc: true,
            cts: true,
            mctc: true,
            mcts: true,
            cnt: true,
            sl1l2: true,
            sal1l2: true,
            vl1l2: true,
            val1l2: true,
            pct: true,
            pstd: true,
            pjc: true,
            prc: true,
            nbrctc: true,
            nbrcts: true,
            nbrcnt: true,
            isc: true,
            mpr: false,
        }
    }
}

/// The full engine settings record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Model name stamped into output headers.
    pub model: String,

    /// Confidence-interval alpha values, e.g. `[0.05]` for 95% intervals.
    pub ci_alpha: Vec<f64>,

    /// Bootstrap interval method.
    pub boot_interval: BootMethod,
    /// Bootstrap replicate count; zero disables the bootstrap.
    pub n_boot_rep: usize,
    /// Replicate subsample proportion (percentile method).
    pub boot_rep_prop: f64,
    /// Bootstrap RNG seed.
    pub boot_seed: u64,
    /// Spill directory for out-of-core bootstrap replicates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmp_dir: Option<PathBuf>,

    /// Compute Spearman and Kendall rank correlations.
    pub rank_corr_flag: bool,

    /// Interpolation validity-fraction threshold.
    pub interp_thresh: f64,

    pub message_types: MessageTypeLists,
    pub output: OutputFlags,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            model: "FCST".into(),
            ci_alpha: vec![defaults::CI_ALPHA],
            boot_interval: BootMethod::Percentile,
            n_boot_rep: defaults::N_BOOT_REP,
            boot_rep_prop: defaults::BOOT_REP_PROP,
            boot_seed: defaults::BOOT_SEED,
            tmp_dir: None,
            rank_corr_flag: true,
            interp_thresh: defaults::INTERP_THRESH,
            message_types: MessageTypeLists::default(),
            output: OutputFlags::default(),
        }
    }
}

impl VerifyConfig {
    /// Load settings from a TOML file, filling unspecified fields from the
    /// defaults.
    pub fn load_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine config {}", path.display()))?;
        let config: VerifyConfig = toml::from_str(&text)
            .with_context(|| format!("parsing engine config {}", path.display()))?;
        Ok(config)
    }

    /// The bootstrap settings in resampler form.
    pub fn bootstrap_spec(&self) -> BootstrapSpec {
        BootstrapSpec {
            method: self.boot_interval,
            n_rep: self.n_boot_rep,
            rep_prop: self.boot_rep_prop,
            seed: self.boot_seed,
            tmp_dir: self.tmp_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reasonable() {
        let c = VerifyConfig::default();
        assert_eq!(c.ci_alpha, vec![0.05]);
        assert_eq!(c.n_boot_rep, 0);
        assert!(!c.bootstrap_spec().enabled());
        assert!(c.message_types.onlysf.contains(&"ADPSFC".to_string()));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_text = r#"
            model = "GFS"
            ci_alpha = [0.05, 0.10]
            n_boot_rep = 250

            [output]
            mpr = true
        "#;
        let c: VerifyConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(c.model, "GFS");
        assert_eq!(c.ci_alpha.len(), 2);
        assert_eq!(c.n_boot_rep, 250);
        assert!(c.output.mpr);
        // Unspecified fields fall back to defaults.
        assert!(c.output.cnt);
        assert_eq!(c.boot_rep_prop, 1.0);
        assert_eq!(c.interp_thresh, 1.0);
    }

    #[test]
    fn test_round_trip_serialization() {
        let c = VerifyConfig::default();
        let text = toml::to_string(&c).unwrap();
        let back: VerifyConfig = toml::from_str(&text).unwrap();
        assert_eq!(c, back);
    }
}
