//! Full driver runs: multiple tasks, masks, and interpolation methods
//! against a synthetic observation stream.

use chrono::{TimeZone, Utc};
use gridvx::driver::RowRecord;
use gridvx::interp::InterpMethod;
use gridvx::types::is_bad;
use gridvx::{
    Driver, FieldId, LatLonGrid, LatLonPolyline, LevelRange, LevelType, MaskSpec, MemorySink,
    ObsHeader, Observation, RasterField, Threshold, ThreshCmp, VerifyConfig, VerifyTask,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn grid() -> LatLonGrid {
    LatLonGrid::new("CONUS-TEST", 20, 20, 30.0, -110.0, 0.5, 0.5)
}

fn window() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    (
        Utc.with_ymd_and_hms(2007, 3, 15, 11, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2007, 3, 15, 13, 0, 0).unwrap(),
    )
}

/// A forecast field with a north-south temperature gradient.
fn gradient_field() -> RasterField {
    let values: Vec<f64> = (0..400)
        .map(|n| 270.0 + (n / 20) as f64 * 0.5)
        .collect();
    let mut field = RasterField::from_values(20, 20, &values);
    field.set_valid_time(Utc.with_ymd_and_hms(2007, 3, 15, 12, 0, 0).unwrap());
    field.set_units("KELVIN");
    field
}

fn observation_stream() -> Vec<(ObsHeader, Vec<Observation>)> {
    let stations = [
        ("KDEN", "ADPSFC", 32.0, -106.0, 273.5),
        ("KBOU", "ADPSFC", 33.5, -104.5, 272.0),
        ("SHIP1", "SFCSHP", 35.0, -103.0, 276.5),
        ("KSLC", "ADPSFC", 36.5, -101.5, 274.8),
        ("AIR01", "AIRCFT", 37.0, -101.0, 275.0),
        ("KPHX", "MSONET", 31.0, -108.0, 271.2),
    ];
    stations
        .iter()
        .map(|&(sid, msg, lat, lon, value)| {
            (
                ObsHeader {
                    message_type: msg.into(),
                    station_id: sid.into(),
                    valid_time: Utc.with_ymd_and_hms(2007, 3, 15, 12, 0, 0).unwrap(),
                    lat,
                    lon,
                    elevation: 1500.0,
                },
                vec![Observation {
                    code: 11,
                    level: 0.0,
                    height: 2.0,
                    value,
                }],
            )
        })
        .collect()
}

fn build_task(config: &VerifyConfig) -> VerifyTask {
    let (beg, end) = window();
    let level = LevelRange::single(LevelType::Vert, 2.0);
    let region = LatLonPolyline::new(
        "WEST",
        vec![(29.0, -111.0), (29.0, -104.0), (39.0, -104.0), (39.0, -111.0)],
    );
    let mut task = VerifyTask::new(
        FieldId::new(11, "TMP", level),
        FieldId::new(11, "TMP", level),
        beg,
        end,
        config,
    )
    .unwrap()
    .with_dimensions(
        vec!["ONLYSF".into()],
        vec![
            MaskSpec::Grid {
                name: "FULL".into(),
                field: RasterField::from_values(20, 20, &vec![1.0; 400]),
            },
            MaskSpec::Polyline(region),
        ],
        vec![(InterpMethod::UwMean, 1), (InterpMethod::DwMean, 3)],
    )
    .with_thresholds(
        vec![
            Threshold::new(ThreshCmp::Gt, 273.15),
            Threshold::new(ThreshCmp::Gt, 275.0),
        ],
        vec![
            Threshold::new(ThreshCmp::Gt, 273.15),
            Threshold::new(ThreshCmp::Gt, 275.0),
        ],
    );
    task.pairs
        .set_fcst_levels(vec![0.0], vec![gradient_field()])
        .unwrap();
    task
}

#[test]
fn driver_full_run_row_families_and_counts() {
    init_tracing();
    let mut config = VerifyConfig::default();
    config.model = "TESTMODEL".into();
    config.output.mpr = true;

    let mut tasks = vec![build_task(&config)];
    let mut sink = MemorySink::new();
    Driver::new(&config)
        .run(&mut tasks, &observation_stream(), &grid(), &mut sink)
        .unwrap();

    // The AIRCFT report fails the surface-kind requirement.
    assert!(tasks[0].pairs.rejects.level_mismatch >= 1);

    // 2 masks x 2 interps, every combination populated: per combination,
    // 2 thresholds of FHO/CTC/CTS, one MCTS pair of rows, one CNT, one
    // SL1L2.
    let count = |pred: &dyn Fn(&RowRecord) -> bool| sink.rows.iter().filter(|&r| pred(r)).count();
    assert_eq!(count(&|r| matches!(r, RowRecord::Fho(_))), 2 * 2 * 2);
    assert_eq!(count(&|r| matches!(r, RowRecord::Ctc(_))), 2 * 2 * 2);
    assert_eq!(count(&|r| matches!(r, RowRecord::Cts(_))), 2 * 2 * 2);
    assert_eq!(count(&|r| matches!(r, RowRecord::Mcts(_))), 2 * 2);
    assert_eq!(count(&|r| matches!(r, RowRecord::Cnt(_))), 2 * 2);
    assert_eq!(count(&|r| matches!(r, RowRecord::Sl1l2(_))), 2 * 2);
    // No climatology was installed: no anomaly rows.
    assert_eq!(count(&|r| matches!(r, RowRecord::Sal1l2(_))), 0);

    // Headers carry the model and mask names.
    for row in &sink.rows {
        if let RowRecord::Cnt(r) = row {
            assert_eq!(r.header.model, "TESTMODEL");
            assert!(r.header.mask_name == "FULL" || r.header.mask_name == "WEST");
        }
    }
}

#[test]
fn polyline_mask_restricts_pairs() {
    let config = VerifyConfig::default();
    let mut tasks = vec![build_task(&config)];
    let mut sink = MemorySink::new();
    Driver::new(&config)
        .run(&mut tasks, &observation_stream(), &grid(), &mut sink)
        .unwrap();

    let full = tasks[0].pairs.pair_set(0, 0, 0);
    let west = tasks[0].pairs.pair_set(0, 1, 0);
    assert!(full.len() > west.len());
    // Every WEST pair also appears in FULL (same ingest order).
    for sid in &west.station_id {
        assert!(full.station_id.contains(sid));
    }
}

#[test]
fn climatology_enables_anomaly_rows() {
    let config = VerifyConfig::default();
    let mut task = build_task(&config);
    // Flat climatology of 273.0.
    task.pairs
        .set_climo_levels(
            vec![0.0],
            vec![RasterField::from_values(20, 20, &vec![273.0; 400])],
        )
        .unwrap();

    let mut tasks = vec![task];
    let mut sink = MemorySink::new();
    Driver::new(&config)
        .run(&mut tasks, &observation_stream(), &grid(), &mut sink)
        .unwrap();

    let sal1l2: Vec<_> = sink
        .rows
        .iter()
        .filter_map(|r| match r {
            RowRecord::Sal1l2(row) => Some(row),
            _ => None,
        })
        .collect();
    assert!(!sal1l2.is_empty());
    for row in &sal1l2 {
        assert!(row.sums.sacount > 0);
        assert!(!is_bad(row.sums.fabar));
    }
}

#[test]
fn bootstrap_rows_carry_bounds_in_both_methods() {
    for method in ["Percentile", "Bca"] {
        let mut config = VerifyConfig::default();
        config.n_boot_rep = 150;
        config.boot_seed = 42;
        config.boot_interval = match method {
            "Percentile" => gridvx::bootstrap::BootMethod::Percentile,
            _ => gridvx::bootstrap::BootMethod::Bca,
        };

        let mut tasks = vec![build_task(&config)];
        let mut sink = MemorySink::new();
        Driver::new(&config)
            .run(&mut tasks, &observation_stream(), &grid(), &mut sink)
            .unwrap();

        let cnt_rows: Vec<_> = sink
            .rows
            .iter()
            .filter_map(|r| match r {
                RowRecord::Cnt(row) => Some(row),
                _ => None,
            })
            .collect();
        assert!(!cnt_rows.is_empty());
        for row in cnt_rows {
            let me = &row.info.me;
            if row.info.n < 2 {
                continue;
            }
            assert_eq!(me.bcl.len(), config.ci_alpha.len(), "{method}");
            if !is_bad(me.bcl[0]) && !is_bad(me.bcu[0]) {
                assert!(me.bcl[0] <= me.bcu[0], "{method}");
            }
        }
    }
}

#[test]
fn json_lines_sink_matches_memory_sink() {
    let config = VerifyConfig::default();

    let mut tasks = vec![build_task(&config)];
    let mut memory = MemorySink::new();
    Driver::new(&config)
        .run(&mut tasks, &observation_stream(), &grid(), &mut memory)
        .unwrap();

    let mut tasks = vec![build_task(&config)];
    let mut json = gridvx::driver::JsonLinesSink::new(Vec::<u8>::new());
    Driver::new(&config)
        .run(&mut tasks, &observation_stream(), &grid(), &mut json)
        .unwrap();

    let text = String::from_utf8(json.into_inner()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), memory.rows.len());
    for line in &lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value.is_object(), "each row serializes to one JSON object");
    }
}

#[test]
fn config_toml_round_trip_drives_run() {
    let toml_text = r#"
        model = "TOMLMODEL"
        ci_alpha = [0.1]
        rank_corr_flag = false

        [output]
        mpr = false
        mcts = false
        mctc = false
    "#;
    let config: VerifyConfig = toml::from_str(toml_text).unwrap();
    let mut tasks = vec![build_task(&config)];
    let mut sink = MemorySink::new();
    Driver::new(&config)
        .run(&mut tasks, &observation_stream(), &grid(), &mut sink)
        .unwrap();

    assert!(sink.rows.iter().all(|r| !matches!(r, RowRecord::Mpr(_))));
    assert!(sink.rows.iter().all(|r| !matches!(r, RowRecord::Mcts(_))));
    for row in &sink.rows {
        if let RowRecord::Cnt(r) = row {
            assert_eq!(r.header.model, "TOMLMODEL");
            assert_eq!(r.header.alpha, vec![0.1]);
            // Rank correlations disabled.
            assert!(is_bad(r.info.sp_corr.v));
        }
    }
}
