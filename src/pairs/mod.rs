//! The pair builder: matches point observations against forecast and
//! climatology fields across message types, masking regions, and
//! interpolation methods.

mod mask;

pub use mask::{LatLonPolyline, MaskSpec};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::MessageTypeLists;
use crate::error::{Result, VerifyError};
use crate::field::RasterField;
use crate::interp::{horizontal_interp, vertical_pinterp, InterpMethod};
use crate::types::{codes, is_bad, is_eq, FieldId, GridProjection, LevelType, ObsHeader, Observation, BAD_DATA};

/// Message-type wildcards supported on pair sets.
pub const ANYAIR: &str = "ANYAIR";
pub const ANYSFC: &str = "ANYSFC";
pub const ONLYSF: &str = "ONLYSF";

/// One matched pair: provenance plus the three value streams.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MatchedPair {
    pub station_id: String,
    pub lat: f64,
    pub lon: f64,
    pub level: f64,
    pub elevation: f64,
    pub fcst: f64,
    pub climo: f64,
    pub obs: f64,
}

/// An ordered collection of matched pairs for one
/// `(message type, mask, interpolation)` combination.
///
/// Values are stored as parallel columns so the score engine and the
/// bootstrap resampler can borrow them directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairSet {
    pub msg_type: String,
    pub mask_name: String,
    pub interp_method: Option<InterpMethod>,
    pub interp_width: usize,

    pub station_id: Vec<String>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub level: Vec<f64>,
    pub elevation: Vec<f64>,
    pub fcst: Vec<f64>,
    pub climo: Vec<f64>,
    pub obs: Vec<f64>,
}

impl PairSet {
    pub fn len(&self) -> usize {
        self.obs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obs.is_empty()
    }

    /// Append a matched pair. Pairs with a missing forecast or observation
    /// are never inserted; the climatology slot may hold the sentinel.
    pub fn add_pair(&mut self, pair: MatchedPair) {
        debug_assert!(!is_bad(pair.fcst) && !is_bad(pair.obs));
        self.station_id.push(pair.station_id);
        self.lat.push(pair.lat);
        self.lon.push(pair.lon);
        self.level.push(pair.level);
        self.elevation.push(pair.elevation);
        self.fcst.push(pair.fcst);
        self.climo.push(pair.climo);
        self.obs.push(pair.obs);
    }
}

/// Per-reason rejection tallies for one verification task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectCounts {
    pub wrong_code: u64,
    pub off_time: u64,
    pub bad_obs_value: u64,
    pub off_grid: u64,
    pub level_mismatch: u64,
    pub wrong_msg_type: u64,
    pub outside_mask: u64,
    pub bad_fcst: u64,
}

impl RejectCounts {
    pub fn total(&self) -> u64 {
        self.wrong_code
            + self.off_time
            + self.bad_obs_value
            + self.off_grid
            + self.level_mismatch
            + self.wrong_msg_type
            + self.outside_mask
            + self.bad_fcst
    }
}

/// Matched-pair state for one verification task: forecast and climatology
/// level stacks plus the 3-D pair-set array indexed
/// `[message type][mask][interpolation]`.
#[derive(Debug, Clone)]
pub struct TaskPairs {
    pub fcst_id: FieldId,
    pub obs_id: FieldId,
    pub interp_thresh: f64,
    pub beg: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub msg_lists: MessageTypeLists,

    fcst_levels: Vec<f64>,
    fcst_fields: Vec<RasterField>,
    climo_levels: Vec<f64>,
    climo_fields: Vec<RasterField>,

    msg_types: Vec<String>,
    masks: Vec<MaskSpec>,
    interps: Vec<(InterpMethod, usize)>,
    pair_sets: Vec<PairSet>,

    pub rejects: RejectCounts,
}

impl TaskPairs {
    pub fn new(
        fcst_id: FieldId,
        obs_id: FieldId,
        beg: DateTime<Utc>,
        end: DateTime<Utc>,
        interp_thresh: f64,
        msg_lists: MessageTypeLists,
    ) -> Result<Self> {
        fcst_id.level.validate()?;
        obs_id.level.validate()?;
        Ok(Self {
            fcst_id,
            obs_id,
            interp_thresh,
            beg,
            end,
            msg_lists,
            fcst_levels: Vec::new(),
            fcst_fields: Vec::new(),
            climo_levels: Vec::new(),
            climo_fields: Vec::new(),
            msg_types: Vec::new(),
            masks: Vec::new(),
            interps: Vec::new(),
            pair_sets: Vec::new(),
            rejects: RejectCounts::default(),
        })
    }

    /// Install the forecast level stack: one field per vertical level with
    /// a parallel pressure array.
    pub fn set_fcst_levels(&mut self, levels: Vec<f64>, fields: Vec<RasterField>) -> Result<()> {
        if levels.len() != fields.len() {
            return Err(VerifyError::PairLengthMismatch {
                f_len: levels.len(),
                o_len: fields.len(),
            });
        }
        self.fcst_levels = levels;
        self.fcst_fields = fields;
        Ok(())
    }

    /// Install the climatology level stack. Climatology is optional.
    pub fn set_climo_levels(&mut self, levels: Vec<f64>, fields: Vec<RasterField>) -> Result<()> {
        if levels.len() != fields.len() {
            return Err(VerifyError::PairLengthMismatch {
                f_len: levels.len(),
                o_len: fields.len(),
            });
        }
        self.climo_levels = levels;
        self.climo_fields = fields;
        Ok(())
    }

    /// Define the pair-set dimensions. Must be called before observations
    /// are added; the pair-set array is rebuilt empty.
    pub fn set_dimensions(
        &mut self,
        msg_types: Vec<String>,
        masks: Vec<MaskSpec>,
        interps: Vec<(InterpMethod, usize)>,
    ) {
        self.pair_sets.clear();
        for msg_type in &msg_types {
            for mask in &masks {
                for &(method, width) in &interps {
                    self.pair_sets.push(PairSet {
                        msg_type: msg_type.clone(),
                        mask_name: mask.name().to_string(),
                        interp_method: Some(method),
                        interp_width: width,
                        ..PairSet::default()
                    });
                }
            }
        }
        self.msg_types = msg_types;
        self.masks = masks;
        self.interps = interps;
    }

    pub fn n_msg_types(&self) -> usize {
        self.msg_types.len()
    }

    pub fn n_masks(&self) -> usize {
        self.masks.len()
    }

    pub fn n_interps(&self) -> usize {
        self.interps.len()
    }

    fn set_index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.masks.len() + j) * self.interps.len() + k
    }

    pub fn pair_set(&self, i: usize, j: usize, k: usize) -> &PairSet {
        &self.pair_sets[self.set_index(i, j, k)]
    }

    /// Pair sets in deterministic (message type, mask, interpolation)
    /// order.
    pub fn pair_sets(&self) -> impl Iterator<Item = &PairSet> {
        self.pair_sets.iter()
    }

    /// Total pair count across the array.
    pub fn n_pairs(&self) -> usize {
        self.pair_sets.iter().map(PairSet::len).sum()
    }

    /// Whether a pair-set message type accepts an observation header type,
    /// honoring the wildcard lists.
    fn msg_type_matches(&self, set_type: &str, header_type: &str) -> bool {
        match set_type {
            ANYAIR => self.msg_lists.anyair.iter().any(|m| m == header_type),
            ANYSFC => self.msg_lists.anysfc.iter().any(|m| m == header_type),
            ONLYSF => self.msg_lists.onlysf.iter().any(|m| m == header_type),
            exact => exact == header_type,
        }
    }

    /// Run one observation through the full matching sequence, appending a
    /// pair to every `(message type, mask, interpolation)` combination it
    /// satisfies.
    pub fn add_obs(
        &mut self,
        header: &ObsHeader,
        obs: &Observation,
        grid: &dyn GridProjection,
    ) -> Result<()> {
        // Variable code.
        if obs.code != self.obs_id.code {
            self.rejects.wrong_code += 1;
            return Ok(());
        }

        // Valid-time window.
        if header.valid_time < self.beg || header.valid_time > self.end {
            self.rejects.off_time += 1;
            return Ok(());
        }

        // Observed value.
        if is_bad(obs.value) {
            self.rejects.bad_obs_value += 1;
            return Ok(());
        }

        // Projection onto the grid.
        let (obs_x, obs_y) = grid.latlon_to_xy(header.lat, header.lon);
        let x = obs_x.round() as i64;
        let y = obs_y.round() as i64;
        if x < 0 || x >= grid.nx() as i64 || y < 0 || y >= grid.ny() as i64 {
            self.rejects.off_grid += 1;
            return Ok(());
        }

        // Level matching against the observation field specification.
        match self.obs_id.level.kind {
            LevelType::Pres => {
                if !self.obs_id.level.contains(obs.level) {
                    self.rejects.level_mismatch += 1;
                    return Ok(());
                }
            }
            LevelType::Vert => {
                // Surface verification: the header type must be a surface
                // message type.
                if !self
                    .msg_lists
                    .onlysf
                    .iter()
                    .any(|m| m == &header.message_type)
                {
                    self.rejects.level_mismatch += 1;
                    return Ok(());
                }
            }
            LevelType::Accum => {
                if !is_eq(obs.level, self.obs_id.level.low) {
                    self.rejects.level_mismatch += 1;
                    return Ok(());
                }
            }
            LevelType::None | LevelType::Record => {}
        }

        // Vertical bracketing for pressure-level tasks.
        let (fcst_below, fcst_above, climo_bracket) =
            if self.fcst_id.level.kind == LevelType::Pres {
                if self.fcst_fields.is_empty() {
                    return Err(VerifyError::NoForecastLevels {
                        task: self.fcst_id.info_str(),
                    });
                }
                let (b, a) = find_vert_lvl(&self.fcst_levels, obs.level)
                    .unwrap_or((0, 0));
                (b, a, find_vert_lvl(&self.climo_levels, obs.level))
            } else {
                (0, 0, if self.climo_fields.is_empty() { None } else { Some((0, 0)) })
            };

        for i in 0..self.msg_types.len() {
            if !self.msg_type_matches(&self.msg_types[i], &header.message_type) {
                self.rejects.wrong_msg_type += 1;
                continue;
            }

            for j in 0..self.masks.len() {
                if !self.masks[j].matches(x, y, header.lat, header.lon, &header.station_id) {
                    self.rejects.outside_mask += 1;
                    continue;
                }

                for k in 0..self.interps.len() {
                    let fcst_v = self.compute_interp(
                        true, obs_x, obs_y, k, obs.level, fcst_below, fcst_above,
                    )?;
                    if is_bad(fcst_v) {
                        self.rejects.bad_fcst += 1;
                        continue;
                    }

                    let climo_v = match climo_bracket {
                        Some((below, above)) => self
                            .compute_interp(false, obs_x, obs_y, k, obs.level, below, above)?,
                        None => BAD_DATA,
                    };

                    let idx = self.set_index(i, j, k);
                    self.pair_sets[idx].add_pair(MatchedPair {
                        station_id: header.station_id.clone(),
                        lat: header.lat,
                        lon: header.lon,
                        level: obs.level,
                        elevation: header.elevation,
                        fcst: fcst_v,
                        climo: climo_v,
                        obs: obs.value,
                    });
                }
            }
        }
        Ok(())
    }

    /// Interpolate the forecast (or climatology) stack to the observation
    /// location: horizontally on the bracketing levels, then vertically in
    /// log pressure. Specific humidity interpolates vertically in log
    /// space.
    fn compute_interp(
        &self,
        fcst_flag: bool,
        obs_x: f64,
        obs_y: f64,
        i_interp: usize,
        obs_level: f64,
        below: usize,
        above: usize,
    ) -> Result<f64> {
        let (levels, fields) = if fcst_flag {
            (&self.fcst_levels, &self.fcst_fields)
        } else {
            (&self.climo_levels, &self.climo_fields)
        };
        if fields.is_empty() {
            return Ok(BAD_DATA);
        }

        let (method, width) = self.interps[i_interp];
        let v_below = horizontal_interp(
            &fields[below],
            obs_x,
            obs_y,
            method,
            width,
            self.interp_thresh,
        )?;
        if below == above {
            return Ok(v_below);
        }
        let v_above = horizontal_interp(
            &fields[above],
            obs_x,
            obs_y,
            method,
            width,
            self.interp_thresh,
        )?;
        if is_bad(v_below) || is_bad(v_above) {
            return Ok(BAD_DATA);
        }

        // Specific humidity interpolates in the natural log of q.
        if self.fcst_id.code == codes::SPFH && self.obs_id.code == codes::SPFH {
            if v_below <= 0.0 || v_above <= 0.0 {
                return Ok(BAD_DATA);
            }
            let t = vertical_pinterp(
                v_below.ln(),
                levels[below],
                v_above.ln(),
                levels[above],
                obs_level,
            )?;
            Ok(t.exp())
        } else {
            vertical_pinterp(v_below, levels[below], v_above, levels[above], obs_level)
        }
    }

    /// Emit the rejection tallies as a debug event.
    pub fn log_rejects(&self) {
        let r = &self.rejects;
        debug!(
            task = %self.fcst_id.info_str(),
            wrong_code = r.wrong_code,
            off_time = r.off_time,
            bad_obs_value = r.bad_obs_value,
            off_grid = r.off_grid,
            level_mismatch = r.level_mismatch,
            wrong_msg_type = r.wrong_msg_type,
            outside_mask = r.outside_mask,
            bad_fcst = r.bad_fcst,
            "observation rejection counts"
        );
    }
}

/// Indices of the levels bracketing a target pressure: below means higher
/// pressure, above lower pressure. An out-of-range target collapses to the
/// single nearest level. `None` when the level list is empty.
pub fn find_vert_lvl(levels: &[f64], prs: f64) -> Option<(usize, usize)> {
    if levels.is_empty() {
        return None;
    }

    let mut dist_below = f64::INFINITY;
    let mut dist_above = f64::INFINITY;
    let mut i_below = None;
    let mut i_above = None;
    for (i, &lvl) in levels.iter().enumerate() {
        let dist = prs - lvl;
        // Levels below the observation carry higher pressure values.
        if dist <= 0.0 && dist.abs() < dist_below {
            dist_below = dist.abs();
            i_below = Some(i);
        }
        if dist >= 0.0 && dist.abs() < dist_above {
            dist_above = dist.abs();
            i_above = Some(i);
        }
    }

    match (i_below, i_above) {
        (Some(b), Some(a)) => Some((b, a)),
        // Outside the available range: collapse to the nearest level.
        (None, Some(a)) => Some((a, a)),
        (Some(b), None) => Some((b, b)),
        (None, None) => None,
    }
}
