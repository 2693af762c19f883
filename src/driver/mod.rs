//! The driver: iterates verification tasks, routes matched pairs through
//! the score engine and the CI engines, and emits rows to a sink in a
//! deterministic (task, message type, mask, interpolation, threshold)
//! order.

mod sink;

pub use sink::{
    CntRow, CtcRow, CtsRow, FhoRow, IscRow, JsonLinesSink, MctcRow, MctsRow, MemorySink, MprRow,
    NbrCntRow, NbrCtcRow, NbrCtsRow, PctRow, PjcRow, PrcRow, PstdRow, RowHeader, RowRecord,
    RowSink, Sal1l2Row, Sl1l2Row, Val1l2Row, Vl1l2Row,
};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::bootstrap::{
    bca_intervals, percentile_intervals, BootInterval, BootMethod, BootstrapSpec,
};
use crate::config::VerifyConfig;
use crate::error::Result;
use crate::field::RasterField;
use crate::interp::InterpMethod;
use crate::pairs::{MaskSpec, MatchedPair, PairSet, TaskPairs};
use crate::stats::{
    compute_cntinfo, compute_ctsinfo, compute_i_cntinfo, compute_iscinfo, compute_mctsinfo,
    compute_nbrcntinfo, compute_pctinfo, coverage_pairs, CntInfo, CtsInfo, MctsInfo, NbrCntInfo,
    NbrCtsInfo, PctInfo, Sl1l2Info, Vl1l2Info, N_CNT_STATS, N_CTS_STATS, N_MCTS_STATS,
    N_NBRCNT_STATS,
};
use crate::types::{codes, is_bad, FieldId, GridProjection, ObsHeader, Observation, Threshold};

/// One point-verification task: the matched-pair state plus the threshold
/// lists driving the score families.
#[derive(Debug, Clone)]
pub struct VerifyTask {
    pub pairs: TaskPairs,

    /// Paired categorical thresholds; also the category edges for the
    /// multi-category scores when more than one is present.
    pub fcst_thresholds: Vec<Threshold>,
    pub obs_thresholds: Vec<Threshold>,

    /// Wind-speed threshold pairs for the vector partial sums.
    pub wind_thresholds: Vec<(Threshold, Threshold)>,

    /// Probability bin edges for probabilistic forecasts.
    pub prob_thresholds: Vec<f64>,
}

impl VerifyTask {
    pub fn new(
        fcst_id: FieldId,
        obs_id: FieldId,
        beg: DateTime<Utc>,
        end: DateTime<Utc>,
        config: &VerifyConfig,
    ) -> Result<Self> {
        let pairs = TaskPairs::new(
            fcst_id,
            obs_id,
            beg,
            end,
            config.interp_thresh,
            config.message_types.clone(),
        )?;
        Ok(Self {
            pairs,
            fcst_thresholds: Vec::new(),
            obs_thresholds: Vec::new(),
            wind_thresholds: Vec::new(),
            prob_thresholds: Vec::new(),
        })
    }

    pub fn with_dimensions(
        mut self,
        msg_types: Vec<String>,
        masks: Vec<MaskSpec>,
        interps: Vec<(InterpMethod, usize)>,
    ) -> Self {
        self.pairs.set_dimensions(msg_types, masks, interps);
        self
    }

    pub fn with_thresholds(mut self, fcst: Vec<Threshold>, obs: Vec<Threshold>) -> Self {
        self.fcst_thresholds = fcst;
        self.obs_thresholds = obs;
        self
    }

    pub fn with_wind_thresholds(mut self, thresholds: Vec<(Threshold, Threshold)>) -> Self {
        self.wind_thresholds = thresholds;
        self
    }

    pub fn with_prob_thresholds(mut self, edges: Vec<f64>) -> Self {
        self.prob_thresholds = edges;
        self
    }
}

/// One gridded-verification task: full forecast and observation fields
/// scored with the neighborhood and intensity-scale families.
#[derive(Debug, Clone)]
pub struct GridVerifyTask {
    pub fcst_id: FieldId,
    pub obs_id: FieldId,
    pub fcst_field: RasterField,
    pub obs_field: RasterField,
    pub mask_name: String,

    /// Raw-event threshold pairs applied before building coverage fields.
    pub raw_thresholds: Vec<(Threshold, Threshold)>,
    /// Neighborhood widths.
    pub widths: Vec<usize>,
    /// Fraction thresholds for the neighborhood contingency tables.
    pub frac_thresholds: Vec<Threshold>,
    /// Validity fraction required of each coverage window.
    pub cov_vld_thresh: f64,

    /// Intensity-scale tile `(x_ll, y_ll, dim)`; `dim` must be a power of
    /// two.
    pub isc_tile: Option<(usize, usize, usize)>,
}

/// Runs verification tasks against a configuration and emits rows.
pub struct Driver<'a> {
    config: &'a VerifyConfig,
}

impl<'a> Driver<'a> {
    pub fn new(config: &'a VerifyConfig) -> Self {
        Self { config }
    }

    /// Point verification: ingest every observation into every task, then
    /// score each task's pair sets in order.
    pub fn run(
        &self,
        tasks: &mut [VerifyTask],
        observations: &[(ObsHeader, Vec<Observation>)],
        grid: &dyn GridProjection,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let spec = self.config.bootstrap_spec();
        spec.validate()?;
        let mut rng = spec.make_rng();

        info!(
            n_tasks = tasks.len(),
            n_obs_headers = observations.len(),
            "ingesting observations"
        );
        for (header, obs_list) in observations {
            for obs in obs_list {
                for task in tasks.iter_mut() {
                    task.pairs.add_obs(header, obs, grid)?;
                }
            }
        }

        for i_task in 0..tasks.len() {
            tasks[i_task].pairs.log_rejects();
            self.score_task(tasks, i_task, &spec, &mut rng, sink)?;
        }
        Ok(())
    }

    /// Gridded verification: neighborhood and intensity-scale scoring of
    /// full field pairs.
    pub fn run_grid(&self, tasks: &[GridVerifyTask], sink: &mut dyn RowSink) -> Result<()> {
        let spec = self.config.bootstrap_spec();
        spec.validate()?;
        let mut rng = spec.make_rng();

        for task in tasks {
            self.score_grid_task(task, &spec, &mut rng, sink)?;
        }
        Ok(())
    }

    fn header_for(&self, task: &VerifyTask, ps: &PairSet) -> RowHeader {
        RowHeader {
            model: self.config.model.clone(),
            fcst_var: task.pairs.fcst_id.name.clone(),
            fcst_lev: task.pairs.fcst_id.level.level_str(),
            obs_var: task.pairs.obs_id.name.clone(),
            obs_lev: task.pairs.obs_id.level.level_str(),
            msg_type: ps.msg_type.clone(),
            mask_name: ps.mask_name.clone(),
            interp_mthd: ps.interp_method,
            interp_width: ps.interp_width,
            valid_beg: task.pairs.beg,
            valid_end: task.pairs.end,
            alpha: self.config.ci_alpha.clone(),
        }
    }

    fn score_task(
        &self,
        tasks: &[VerifyTask],
        i_task: usize,
        spec: &BootstrapSpec,
        rng: &mut StdRng,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let task = &tasks[i_task];
        let out = &self.config.output;
        info!(task = %task.pairs.fcst_id.info_str(), n_pairs = task.pairs.n_pairs(), "scoring task");

        // The v-wind task closes out the vector sums against its u-wind
        // partner.
        let u_partner = if task.pairs.fcst_id.is_vector
            && task.pairs.fcst_id.code == codes::VGRD
        {
            tasks[..i_task].iter().find(|t| {
                t.pairs.fcst_id.is_vector
                    && t.pairs.fcst_id.code == codes::UGRD
                    && t.pairs.fcst_id.level == task.pairs.fcst_id.level
            })
        } else {
            None
        };

        for i in 0..task.pairs.n_msg_types() {
            for j in 0..task.pairs.n_masks() {
                for k in 0..task.pairs.n_interps() {
                    let ps = task.pairs.pair_set(i, j, k);
                    let header = self.header_for(task, ps);

                    if out.mpr {
                        for (index, pair) in pair_iter(ps).enumerate() {
                            sink.append_mpr(MprRow {
                                header: header.clone(),
                                index,
                                pair,
                            })?;
                        }
                    }

                    if ps.is_empty() {
                        warn!(
                            msg_type = %ps.msg_type,
                            mask = %ps.mask_name,
                            "no matched pairs; scores emitted as missing"
                        );
                        continue;
                    }

                    if task.pairs.fcst_id.is_probability {
                        self.do_pct(task, ps, &header, sink)?;
                        continue;
                    }

                    self.do_cts(task, ps, &header, spec, rng, sink)?;
                    if task.fcst_thresholds.len() > 1 {
                        self.do_mcts(task, ps, &header, spec, rng, sink)?;
                    }
                    self.do_cnt(task, ps, &header, spec, rng, sink)?;
                    self.do_sl1l2(ps, &header, sink)?;

                    if let Some(u_task) = u_partner {
                        let u_ps = u_task.pairs.pair_set(i, j, k);
                        self.do_vl1l2(task, u_ps, ps, &header, sink)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Categorical scores per threshold pair, with FHO and CTC counts.
    fn do_cts(
        &self,
        task: &VerifyTask,
        ps: &PairSet,
        header: &RowHeader,
        spec: &BootstrapSpec,
        rng: &mut StdRng,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let out = &self.config.output;
        if !out.fho && !out.ctc && !out.cts {
            return Ok(());
        }
        let identity: Vec<usize> = (0..ps.len()).collect();

        for (ft, ot) in task.fcst_thresholds.iter().zip(&task.obs_thresholds) {
            let mut info = CtsInfo::new(*ft, *ot, &self.config.ci_alpha);
            compute_ctsinfo(&ps.fcst, &ps.obs, &identity, true, true, &mut info)?;

            if out.cts && spec.enabled() {
                info.allocate_boot();
                let (ft, ot) = (*ft, *ot);
                let alphas = self.config.ci_alpha.clone();
                let eval = |idx: &[usize]| -> Vec<f64> {
                    let mut rep = CtsInfo::new(ft, ot, &[]);
                    match compute_ctsinfo(&ps.fcst, &ps.obs, idx, true, false, &mut rep) {
                        Ok(()) => rep.stat_values().to_vec(),
                        Err(_) => vec![crate::types::BAD_DATA; N_CTS_STATS],
                    }
                };
                let jack = |skip: usize| -> Vec<f64> {
                    let idx: Vec<usize> = (0..ps.len()).filter(|&x| x != skip).collect();
                    eval(&idx)
                };
                let intervals = run_bootstrap(spec, rng, ps.len(), N_CTS_STATS, &alphas, &eval, jack)?;
                apply_bounds(&intervals, |i_stat, i_alpha, lo, hi| {
                    info.set_boot_bounds(i_stat, i_alpha, lo, hi)
                });
            }

            if out.fho {
                let (f_rate, h_rate, o_rate) = info.cts.fho_rates();
                sink.append_fho(FhoRow {
                    header: header.clone(),
                    fcst_thresh: *ft,
                    obs_thresh: *ot,
                    total: info.cts.n(),
                    f_rate,
                    h_rate,
                    o_rate,
                })?;
            }
            if out.ctc {
                sink.append_ctc(CtcRow {
                    header: header.clone(),
                    fcst_thresh: *ft,
                    obs_thresh: *ot,
                    table: info.cts,
                })?;
            }
            if out.cts {
                sink.append_cts(CtsRow {
                    header: header.clone(),
                    info,
                })?;
            }
        }
        Ok(())
    }

    /// Multi-category scores over the full threshold list.
    fn do_mcts(
        &self,
        task: &VerifyTask,
        ps: &PairSet,
        header: &RowHeader,
        spec: &BootstrapSpec,
        rng: &mut StdRng,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let out = &self.config.output;
        if !out.mctc && !out.mcts {
            return Ok(());
        }
        let identity: Vec<usize> = (0..ps.len()).collect();

        let mut info = MctsInfo::new(
            task.fcst_thresholds.clone(),
            task.obs_thresholds.clone(),
            &self.config.ci_alpha,
        );
        compute_mctsinfo(&ps.fcst, &ps.obs, &identity, true, true, &mut info)?;

        if out.mcts && spec.enabled() {
            info.allocate_boot();
            let fcst_thresholds = task.fcst_thresholds.clone();
            let obs_thresholds = task.obs_thresholds.clone();
            let alphas = self.config.ci_alpha.clone();
            let eval = |idx: &[usize]| -> Vec<f64> {
                let mut rep = MctsInfo::new(fcst_thresholds.clone(), obs_thresholds.clone(), &[]);
                match compute_mctsinfo(&ps.fcst, &ps.obs, idx, true, false, &mut rep) {
                    Ok(()) => rep.stat_values().to_vec(),
                    Err(_) => vec![crate::types::BAD_DATA; N_MCTS_STATS],
                }
            };
            let jack = |skip: usize| -> Vec<f64> {
                let idx: Vec<usize> = (0..ps.len()).filter(|&x| x != skip).collect();
                eval(&idx)
            };
            let intervals = run_bootstrap(spec, rng, ps.len(), N_MCTS_STATS, &alphas, &eval, jack)?;
            apply_bounds(&intervals, |i_stat, i_alpha, lo, hi| {
                info.set_boot_bounds(i_stat, i_alpha, lo, hi)
            });
        }

        if out.mctc {
            sink.append_mctc(MctcRow {
                header: header.clone(),
                table: info.table.clone(),
            })?;
        }
        if out.mcts {
            sink.append_mcts(MctsRow {
                header: header.clone(),
                info,
            })?;
        }
        Ok(())
    }

    /// Continuous scores.
    fn do_cnt(
        &self,
        task: &VerifyTask,
        ps: &PairSet,
        header: &RowHeader,
        spec: &BootstrapSpec,
        rng: &mut StdRng,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        if !self.config.output.cnt {
            return Ok(());
        }
        let identity: Vec<usize> = (0..ps.len()).collect();
        let fcst_code = task.pairs.fcst_id.code;
        let obs_code = task.pairs.obs_id.code;
        let rank_flag = self.config.rank_corr_flag;

        let mut info = CntInfo::new(&self.config.ci_alpha);
        compute_cntinfo(
            &ps.fcst, &ps.obs, &identity, fcst_code, obs_code, true, rank_flag, true, &mut info,
        )?;

        if spec.enabled() {
            info.allocate_boot();
            let alphas = self.config.ci_alpha.clone();
            let eval = |idx: &[usize]| -> Vec<f64> {
                let mut rep = CntInfo::new(&[]);
                match compute_cntinfo(
                    &ps.fcst, &ps.obs, idx, fcst_code, obs_code, true, rank_flag, false, &mut rep,
                ) {
                    Ok(()) => rep.stat_values().to_vec(),
                    Err(_) => vec![crate::types::BAD_DATA; N_CNT_STATS],
                }
            };
            let jack = |skip: usize| -> Vec<f64> {
                let mut rep = CntInfo::new(&[]);
                match compute_i_cntinfo(
                    &ps.fcst, &ps.obs, skip, fcst_code, obs_code, rank_flag, &mut rep,
                ) {
                    Ok(()) => rep.stat_values().to_vec(),
                    Err(_) => vec![crate::types::BAD_DATA; N_CNT_STATS],
                }
            };
            let intervals = run_bootstrap(spec, rng, ps.len(), N_CNT_STATS, &alphas, &eval, jack)?;
            apply_bounds(&intervals, |i_stat, i_alpha, lo, hi| {
                info.set_boot_bounds(i_stat, i_alpha, lo, hi)
            });
        }

        sink.append_cnt(CntRow {
            header: header.clone(),
            info,
        })?;
        Ok(())
    }

    /// Scalar partial sums, plus the anomaly flavor when climatology is
    /// present.
    fn do_sl1l2(&self, ps: &PairSet, header: &RowHeader, sink: &mut dyn RowSink) -> Result<()> {
        let out = &self.config.output;
        if !out.sl1l2 && !out.sal1l2 {
            return Ok(());
        }
        let sums = Sl1l2Info::from_pairs(&ps.fcst, &ps.climo, &ps.obs)?;
        if out.sl1l2 {
            sink.append_sl1l2(Sl1l2Row {
                header: header.clone(),
                sums,
            })?;
        }
        if out.sal1l2 && sums.sacount > 0 {
            sink.append_sal1l2(Sal1l2Row {
                header: header.clone(),
                sums,
            })?;
        }
        Ok(())
    }

    /// Vector partial sums per wind-speed threshold pair.
    fn do_vl1l2(
        &self,
        task: &VerifyTask,
        u_ps: &PairSet,
        v_ps: &PairSet,
        header: &RowHeader,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let out = &self.config.output;
        if !out.vl1l2 && !out.val1l2 {
            return Ok(());
        }

        let thresholds = if task.wind_thresholds.is_empty() {
            vec![(Threshold::na(), Threshold::na())]
        } else {
            task.wind_thresholds.clone()
        };

        for (fwt, owt) in thresholds {
            let mut sums = Vl1l2Info::new(fwt, owt);
            sums.from_pairs(
                &u_ps.fcst, &v_ps.fcst, &u_ps.climo, &v_ps.climo, &u_ps.obs, &v_ps.obs,
            )?;
            debug!(
                fcst_wind = %fwt,
                obs_wind = %owt,
                pairs = sums.vcount,
                "vector partial sums"
            );
            if out.vl1l2 {
                sink.append_vl1l2(Vl1l2Row {
                    header: header.clone(),
                    sums,
                })?;
            }
            if out.val1l2 && sums.vacount > 0 {
                sink.append_val1l2(Val1l2Row {
                    header: header.clone(),
                    sums,
                })?;
            }
        }
        Ok(())
    }

    /// Probabilistic scores: one table per observation threshold.
    fn do_pct(
        &self,
        task: &VerifyTask,
        ps: &PairSet,
        header: &RowHeader,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let out = &self.config.output;
        if !out.pct && !out.pstd && !out.pjc && !out.prc {
            return Ok(());
        }

        for ot in &task.obs_thresholds {
            let mut info = PctInfo::new(task.prob_thresholds.clone(), *ot, &self.config.ci_alpha)?;
            compute_pctinfo(&ps.fcst, &ps.obs, true, &mut info)?;

            if out.pjc {
                sink.append_pjc(PjcRow {
                    header: header.clone(),
                    calibration: info.calibration_points(),
                    likelihood: info.likelihood_points(),
                })?;
            }
            if out.prc {
                sink.append_prc(PrcRow {
                    header: header.clone(),
                    roc: info.roc_points(),
                })?;
            }
            if out.pct {
                sink.append_pct(PctRow {
                    header: header.clone(),
                    info: info.clone(),
                })?;
            }
            if out.pstd {
                sink.append_pstd(PstdRow {
                    header: header.clone(),
                    info,
                })?;
            }
        }
        Ok(())
    }

    /// Neighborhood and intensity-scale scoring of one gridded task.
    fn score_grid_task(
        &self,
        task: &GridVerifyTask,
        spec: &BootstrapSpec,
        rng: &mut StdRng,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let out = &self.config.output;
        let base_header = RowHeader {
            model: self.config.model.clone(),
            fcst_var: task.fcst_id.name.clone(),
            fcst_lev: task.fcst_id.level.level_str(),
            obs_var: task.obs_id.name.clone(),
            obs_lev: task.obs_id.level.level_str(),
            msg_type: String::new(),
            mask_name: task.mask_name.clone(),
            interp_mthd: None,
            interp_width: 0,
            valid_beg: task.fcst_field.valid_time().unwrap_or(DateTime::UNIX_EPOCH),
            valid_end: task.fcst_field.valid_time().unwrap_or(DateTime::UNIX_EPOCH),
            alpha: self.config.ci_alpha.clone(),
        };

        for &width in &task.widths {
            for &(raw_ft, raw_ot) in &task.raw_thresholds {
                let pairs = coverage_pairs(
                    &task.fcst_field,
                    &task.obs_field,
                    width,
                    raw_ft,
                    raw_ot,
                    task.cov_vld_thresh,
                )?;
                if pairs.f.is_empty() {
                    warn!(width, "no valid coverage pairs");
                    continue;
                }
                let mut header = base_header.clone();
                header.interp_width = width;
                let identity: Vec<usize> = (0..pairs.f.len()).collect();

                if out.nbrcnt {
                    let mut info =
                        NbrCntInfo::new(width, raw_ft, raw_ot, &self.config.ci_alpha);
                    compute_nbrcntinfo(&pairs.f, &pairs.o, &identity, true, &mut info)?;

                    if spec.enabled() {
                        info.allocate_boot();
                        let alphas = self.config.ci_alpha.clone();
                        let eval = |idx: &[usize]| -> Vec<f64> {
                            let mut rep = NbrCntInfo::new(width, raw_ft, raw_ot, &[]);
                            match compute_nbrcntinfo(&pairs.f, &pairs.o, idx, true, &mut rep) {
                                Ok(()) => rep.stat_values().to_vec(),
                                Err(_) => vec![crate::types::BAD_DATA; N_NBRCNT_STATS],
                            }
                        };
                        let jack = |skip: usize| -> Vec<f64> {
                            let idx: Vec<usize> =
                                (0..pairs.f.len()).filter(|&x| x != skip).collect();
                            eval(&idx)
                        };
                        let intervals = run_bootstrap(
                            spec,
                            rng,
                            pairs.f.len(),
                            N_NBRCNT_STATS,
                            &alphas,
                            &eval,
                            jack,
                        )?;
                        apply_bounds(&intervals, |i_stat, i_alpha, lo, hi| {
                            info.set_boot_bounds(i_stat, i_alpha, lo, hi)
                        });
                    }

                    sink.append_nbrcnt(NbrCntRow {
                        header: header.clone(),
                        info,
                    })?;
                }

                if out.nbrctc || out.nbrcts {
                    for &frac in &task.frac_thresholds {
                        let mut info = NbrCtsInfo::new(
                            width,
                            raw_ft,
                            raw_ot,
                            frac,
                            &self.config.ci_alpha,
                        );
                        compute_ctsinfo(
                            &pairs.f,
                            &pairs.o,
                            &identity,
                            true,
                            true,
                            &mut info.cts_info,
                        )?;

                        if out.nbrctc {
                            sink.append_nbrctc(NbrCtcRow {
                                header: header.clone(),
                                width,
                                fcst_thresh: raw_ft,
                                obs_thresh: raw_ot,
                                frac_thresh: frac,
                                table: info.cts_info.cts,
                            })?;
                        }
                        if out.nbrcts {
                            sink.append_nbrcts(NbrCtsRow {
                                header: header.clone(),
                                info,
                            })?;
                        }
                    }
                }
            }
        }

        if out.isc {
            if let Some((xll, yll, dim)) = task.isc_tile {
                for &(raw_ft, raw_ot) in &task.raw_thresholds {
                    let info = compute_iscinfo(
                        &task.fcst_field,
                        &task.obs_field,
                        xll,
                        yll,
                        dim,
                        raw_ft,
                        raw_ot,
                    )?;
                    sink.append_isc(IscRow {
                        header: base_header.clone(),
                        info,
                    })?;
                }
            }
        }
        Ok(())
    }
}

/// Dispatch to the configured bootstrap method.
fn run_bootstrap<F, J>(
    spec: &BootstrapSpec,
    rng: &mut StdRng,
    n_pair: usize,
    n_stats: usize,
    alphas: &[f64],
    eval: F,
    jack: J,
) -> Result<Vec<Vec<BootInterval>>>
where
    F: Fn(&[usize]) -> Vec<f64>,
    J: Fn(usize) -> Vec<f64>,
{
    match spec.method {
        BootMethod::Percentile => percentile_intervals(spec, rng, n_pair, n_stats, alphas, eval),
        BootMethod::Bca => bca_intervals(spec, rng, n_pair, n_stats, alphas, eval, jack),
    }
}

/// Copy bootstrap intervals into a score block, skipping missing bounds.
fn apply_bounds(
    intervals: &[Vec<BootInterval>],
    mut set: impl FnMut(usize, usize, f64, f64),
) {
    for (i_stat, per_alpha) in intervals.iter().enumerate() {
        for (i_alpha, interval) in per_alpha.iter().enumerate() {
            if is_bad(interval.lower) && is_bad(interval.upper) {
                continue;
            }
            set(i_stat, i_alpha, interval.lower, interval.upper);
        }
    }
}

/// Iterate the matched pairs of a set in insertion order.
fn pair_iter(ps: &PairSet) -> impl Iterator<Item = MatchedPair> + '_ {
    (0..ps.len()).map(|i| MatchedPair {
        station_id: ps.station_id[i].clone(),
        lat: ps.lat[i],
        lon: ps.lon[i],
        level: ps.level[i],
        elevation: ps.elevation[i],
        fcst: ps.fcst[i],
        climo: ps.climo[i],
        obs: ps.obs[i],
    })
}
