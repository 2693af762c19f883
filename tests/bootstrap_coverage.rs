//! Statistical behavior of the bootstrap resampler on synthetic draws.

use gridvx::bootstrap::{percentile_intervals, BootMethod, BootstrapSpec};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Percentile-CI coverage for the mean of i.i.d. normal samples. A scaled
/// version of the full coverage experiment: a few hundred synthetic pair
/// sets instead of ten thousand, with a correspondingly looser band.
#[test]
fn percentile_ci_coverage_for_normal_mean() {
    let true_mean = 3.0;
    let normal = Normal::new(true_mean, 2.0).unwrap();
    let mut draw_rng = StdRng::seed_from_u64(2024);

    let n_sets = 300;
    let set_size = 200;
    let mut covered = 0;

    for i in 0..n_sets {
        let values: Vec<f64> = (0..set_size).map(|_| normal.sample(&mut draw_rng)).collect();
        let spec = BootstrapSpec {
            method: BootMethod::Percentile,
            n_rep: 300,
            rep_prop: 1.0,
            seed: 10_000 + i as u64,
            tmp_dir: None,
        };
        let mut rng = spec.make_rng();
        let interval = percentile_intervals(&spec, &mut rng, set_size, 1, &[0.05], |idx| {
            vec![idx.iter().map(|&j| values[j]).sum::<f64>() / idx.len() as f64]
        })
        .unwrap()[0][0];

        if interval.lower <= true_mean && true_mean <= interval.upper {
            covered += 1;
        }
    }

    let rate = covered as f64 / n_sets as f64;
    assert!(
        (0.90..=0.99).contains(&rate),
        "95% interval covered the true mean at rate {rate}"
    );
}

/// The interval width shrinks roughly like 1/sqrt(n).
#[test]
fn interval_width_scales_with_sample_size() {
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut draw_rng = StdRng::seed_from_u64(7);

    let width_for = |n: usize, draw_rng: &mut StdRng| -> f64 {
        let values: Vec<f64> = (0..n).map(|_| normal.sample(draw_rng)).collect();
        let spec = BootstrapSpec {
            method: BootMethod::Percentile,
            n_rep: 400,
            rep_prop: 1.0,
            seed: 5,
            tmp_dir: None,
        };
        let mut rng = spec.make_rng();
        let iv = percentile_intervals(&spec, &mut rng, n, 1, &[0.05], |idx| {
            vec![idx.iter().map(|&j| values[j]).sum::<f64>() / idx.len() as f64]
        })
        .unwrap()[0][0];
        iv.upper - iv.lower
    };

    let w_small = width_for(50, &mut draw_rng);
    let w_large = width_for(800, &mut draw_rng);
    let ratio = w_small / w_large;
    // Expect roughly sqrt(800/50) = 4.
    assert!(
        (2.0..=8.0).contains(&ratio),
        "width ratio {ratio} (small {w_small}, large {w_large})"
    );
}
