//! End-to-end scoring scenarios with literal expected values.

use gridvx::interp::vertical_pinterp;
use gridvx::stats::{
    compute_cntinfo, compute_ctsinfo, CntInfo, CtsInfo, Sl1l2Info,
};
use gridvx::types::is_bad;
use gridvx::{RasterField, ThreshCmp, Threshold};

fn identity(n: usize) -> Vec<usize> {
    (0..n).collect()
}

#[test]
fn perfect_forecast_partial_sums_and_cnt() {
    // Forecast identical to observation: 10x10 field of ones.
    let values = vec![1.0; 100];
    let field = RasterField::from_values(10, 10, &values);

    let pairs: Vec<f64> = (0..100)
        .map(|n| field.get(n % 10, n / 10))
        .collect();

    let sums = Sl1l2Info::from_pairs(&pairs, &[], &pairs).unwrap();
    assert_eq!(sums.scount, 100);
    assert_eq!(sums.fbar, 1.0);
    assert_eq!(sums.obar, 1.0);
    assert_eq!(sums.fobar, 1.0);
    assert_eq!(sums.ffbar, 1.0);
    assert_eq!(sums.oobar, 1.0);

    let mut cnt = CntInfo::new(&[0.05]);
    compute_cntinfo(&pairs, &pairs, &identity(100), 0, 0, true, false, true, &mut cnt).unwrap();
    assert_eq!(cnt.me.v, 0.0);
    assert_eq!(cnt.mae.v, 0.0);
    assert_eq!(cnt.rmse.v, 0.0);
    // Zero variance: the correlation is undefined, emitted as missing.
    assert!(is_bad(cnt.pr_corr.v));
}

#[test]
fn constant_bias_cnt() {
    // Obs 1..25 in row-major order on a 5x5 field; forecast = obs + 2.
    let obs: Vec<f64> = (1..=25).map(f64::from).collect();
    let fcst: Vec<f64> = obs.iter().map(|v| v + 2.0).collect();

    let mut cnt = CntInfo::new(&[]);
    compute_cntinfo(&fcst, &obs, &identity(25), 0, 0, true, false, false, &mut cnt).unwrap();

    assert!((cnt.me.v - 2.0).abs() < 1e-12);
    assert!((cnt.mae.v - 2.0).abs() < 1e-12);
    assert!((cnt.mse.v - 4.0).abs() < 1e-12);
    assert!((cnt.rmse.v - 2.0).abs() < 1e-12);
    assert!(cnt.bcmse.v.abs() < 1e-9);
    // MBIAS = mean(F)/mean(O) = 15/13.
    assert!((cnt.mbias.v - 15.0 / 13.0).abs() < 1e-12);
}

#[test]
fn two_by_two_table_with_thresholds() {
    // Fcst [0.2, 0.6; 0.8, 0.3], obs [0, 1; 1, 0], threshold > 0.5.
    let fcst = [0.2, 0.6, 0.8, 0.3];
    let obs = [0.0, 1.0, 1.0, 0.0];
    let t = Threshold::new(ThreshCmp::Gt, 0.5);

    let mut info = CtsInfo::new(t, t, &[]);
    compute_ctsinfo(&fcst, &obs, &identity(4), true, false, &mut info).unwrap();

    assert_eq!(info.cts.fy_oy, 2);
    assert_eq!(info.cts.fy_on, 0);
    assert_eq!(info.cts.fn_oy, 0);
    assert_eq!(info.cts.fn_on, 2);
    assert_eq!(info.acc.v, 1.0);
    assert_eq!(info.pody.v, 1.0);
    assert_eq!(info.far.v, 0.0);
    assert_eq!(info.csi.v, 1.0);
    assert_eq!(info.hss.v, 1.0);
    assert_eq!(info.gss.v, 1.0);
}

#[test]
fn log_pressure_interpolation_literal() {
    // v1 = 10 at 1000 hPa, v2 = 20 at 500 hPa, target 707.107 hPa.
    let v = vertical_pinterp(10.0, 1000.0, 20.0, 500.0, 707.107).unwrap();
    let expected = 10.0 + 10.0 * (1000.0f64 / 707.107).ln() / (1000.0f64 / 500.0).ln();
    assert!((v - expected).abs() < 1e-12);
    assert!((v - 15.0).abs() < 1e-4);
}

#[test]
fn quantization_round_trip_within_resolution() {
    let values: Vec<f64> = (0..400)
        .map(|n| -40.0 + 0.217 * n as f64)
        .collect();
    let field = RasterField::from_values(20, 20, &values);
    for (n, &v) in values.iter().enumerate() {
        let decoded = field.get(n % 20, n / 20);
        assert!(
            (decoded - v).abs() <= field.m() / 2.0 + 1e-9,
            "sample {n}: |{decoded} - {v}| > m/2"
        );
    }
}
