use analyst_core::config::EngineConfig;
use analyst_core::statistics::{
    adf_test, engle_granger_test, f_test, granger_causality_test, jarque_bera_test,
    ljung_box_test, one_sample_t_test, paired_t_test, two_sample_t_test, AdfRegression,
    StatTestRequest, StatisticalEngine, TTestVariant, TestDiagnostics,
};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};
use statrs::statistics::Statistics;

const SAMPLE_A: [f64; 12] = [
    5.1, 4.9, 5.6, 5.8, 6.0, 5.3, 4.7, 5.9, 6.2, 5.0, 5.5, 5.7,
];
const SAMPLE_B: [f64; 10] = [6.3, 5.9, 7.1, 6.8, 5.5, 7.4, 6.1, 6.9, 7.7, 6.0];

fn gaussian(rng: &mut StdRng, n: usize) -> Vec<f64> {
    let normal = Normal::new(0.0, 1.0).unwrap();
    (0..n).map(|_| normal.sample(rng)).collect()
}

fn random_walk(rng: &mut StdRng, n: usize) -> Vec<f64> {
    let mut level = 0.0;
    gaussian(rng, n)
        .into_iter()
        .map(|step| {
            level += step;
            level
        })
        .collect()
}

fn ar1(rng: &mut StdRng, n: usize, phi: f64) -> Vec<f64> {
    let mut x = 0.0;
    gaussian(rng, n)
        .into_iter()
        .map(|e| {
            x = phi * x + e;
            x
        })
        .collect()
}

// ===========================================================================
// t-tests against statrs
// ===========================================================================

#[test]
fn test_one_sample_t_matches_reference() {
    let r = one_sample_t_test(&SAMPLE_A, 5.0, 0.05).unwrap();
    let n = SAMPLE_A.len() as f64;
    let t = (SAMPLE_A.iter().mean() - 5.0) / (SAMPLE_A.iter().std_dev() / n.sqrt());
    let dist = StudentsT::new(0.0, 1.0, n - 1.0).unwrap();
    let p = 2.0 * (1.0 - dist.cdf(t.abs()));

    assert!((r.statistic - t).abs() < 1e-10);
    assert_eq!(r.degrees_of_freedom, Some(11.0));
    assert!((r.p_value.unwrap() - p).abs() < 1e-9);
    assert_eq!(r.reject_null, p < 0.05);
}

#[test]
fn test_welch_t_matches_reference() {
    let r = two_sample_t_test(&SAMPLE_A, &SAMPLE_B, TTestVariant::Welch, 0.05).unwrap();
    let (na, nb) = (SAMPLE_A.len() as f64, SAMPLE_B.len() as f64);
    let (va, vb) = (SAMPLE_A.iter().variance() / na, SAMPLE_B.iter().variance() / nb);
    let t = (SAMPLE_A.iter().mean() - SAMPLE_B.iter().mean()) / (va + vb).sqrt();
    let df = (va + vb).powi(2) / (va * va / (na - 1.0) + vb * vb / (nb - 1.0));
    let p = 2.0 * StudentsT::new(0.0, 1.0, df).unwrap().cdf(-t.abs());

    assert!((r.statistic - t).abs() < 1e-10);
    assert!((r.degrees_of_freedom.unwrap() - df).abs() < 1e-9);
    assert!((r.p_value.unwrap() - p).abs() < 1e-9);
    assert!(r.reject_null);
}

#[test]
fn test_pooled_variant_uses_combined_degrees_of_freedom() {
    let r = two_sample_t_test(&SAMPLE_A, &SAMPLE_B, TTestVariant::Pooled, 0.05).unwrap();
    assert_eq!(r.degrees_of_freedom, Some(20.0));
    match r.diagnostics {
        TestDiagnostics::TTest { variant, sample_sizes, .. } => {
            assert_eq!(variant, Some(TTestVariant::Pooled));
            assert_eq!(sample_sizes, vec![12, 10]);
        }
        other => panic!("unexpected diagnostics {other:?}"),
    }
}

#[test]
fn test_paired_t_is_one_sample_on_differences() {
    let a = &SAMPLE_A[..10];
    let diffs: Vec<f64> = a.iter().zip(&SAMPLE_B).map(|(x, y)| x - y).collect();
    let paired = paired_t_test(a, &SAMPLE_B, 0.05).unwrap();
    let one = one_sample_t_test(&diffs, 0.0, 0.05).unwrap();
    assert!((paired.statistic - one.statistic).abs() < 1e-12);
    assert!((paired.p_value.unwrap() - one.p_value.unwrap()).abs() < 1e-12);
    assert!(paired_t_test(&SAMPLE_A, &SAMPLE_B, 0.05).is_err());
}

// ===========================================================================
// Variance and normality
// ===========================================================================

#[test]
fn test_f_test_matches_reference() {
    let r = f_test(&SAMPLE_A, &SAMPLE_B, 0.05).unwrap();
    let f = SAMPLE_A.iter().variance() / SAMPLE_B.iter().variance();
    let dist = FisherSnedecor::new(11.0, 9.0).unwrap();
    let p = (2.0 * dist.cdf(f).min(dist.sf(f))).min(1.0);
    assert!((r.statistic - f).abs() < 1e-12);
    assert!((r.p_value.unwrap() - p).abs() < 1e-9);
}

#[test]
fn test_jarque_bera_size_on_normal_samples() {
    let rejections = (0..50u64)
        .filter(|seed| {
            let mut rng = StdRng::seed_from_u64(*seed);
            jarque_bera_test(&gaussian(&mut rng, 500), 0.05).unwrap().reject_null
        })
        .count();
    assert!(rejections <= 10, "{rejections} of 50 normal samples rejected");
}

#[test]
fn test_jarque_bera_rejects_exponential_samples() {
    for seed in 0..10u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let sample: Vec<f64> = (0..500).map(|_| -(1.0 - rng.gen::<f64>()).ln()).collect();
        let r = jarque_bera_test(&sample, 0.05).unwrap();
        assert!(r.reject_null, "seed {seed}: JB = {}", r.statistic);
    }
}

// ===========================================================================
// Time series
// ===========================================================================

#[test]
fn test_ljung_box_matches_chi_squared_reference() {
    let mut rng = StdRng::seed_from_u64(17);
    let series = gaussian(&mut rng, 200);
    let r = ljung_box_test(&series, 5, 0.05).unwrap();
    let p = ChiSquared::new(5.0).unwrap().sf(r.statistic);
    assert!((r.p_value.unwrap() - p).abs() < 1e-9);

    let persistent = ar1(&mut rng, 300, 0.7);
    assert!(ljung_box_test(&persistent, 5, 0.05).unwrap().reject_null);
}

#[test]
fn test_adf_separates_random_walks_from_stationary_series() {
    let mut walk_rejections = 0;
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let walk = random_walk(&mut rng, 250);
        if adf_test(&walk, None, AdfRegression::Constant, 0.05).unwrap().reject_null {
            walk_rejections += 1;
        }
        let stationary = ar1(&mut rng, 250, 0.5);
        let r = adf_test(&stationary, None, AdfRegression::Constant, 0.05).unwrap();
        assert!(r.reject_null, "seed {seed}: tau = {}", r.statistic);
    }
    assert!(walk_rejections <= 6, "{walk_rejections} of 20 random walks rejected");
}

#[test]
fn test_granger_direction() {
    let mut reverse_rejections = 0;
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let x = gaussian(&mut rng, 300);
        let e = gaussian(&mut rng, 300);
        let mut y = vec![0.0; 300];
        for t in 1..300 {
            y[t] = 0.6 * x[t - 1] + e[t];
        }
        assert!(granger_causality_test(&x, &y, 2, 0.05).unwrap().reject_null);
        if granger_causality_test(&y, &x, 2, 0.05).unwrap().reject_null {
            reverse_rejections += 1;
        }
    }
    assert!(reverse_rejections <= 6, "{reverse_rejections} of 20 reverse tests rejected");
}

#[test]
fn test_engle_granger_on_cointegrated_and_independent_walks() {
    let mut spurious = 0;
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let x = random_walk(&mut rng, 250);
        let noise = gaussian(&mut rng, 250);
        let y: Vec<f64> = x.iter().zip(&noise).map(|(xi, e)| 3.0 + 2.0 * xi + e).collect();
        let r = engle_granger_test(&y, &x, None, 0.05).unwrap();
        assert!(r.reject_null, "seed {seed}: tau = {}", r.statistic);

        let z = random_walk(&mut rng, 250);
        if engle_granger_test(&z, &x, None, 0.05).unwrap().reject_null {
            spurious += 1;
        }
    }
    assert!(spurious <= 6, "{spurious} of 20 independent pairs looked cointegrated");
}

// ===========================================================================
// Engine
// ===========================================================================

#[test]
fn test_engine_runs_json_requests_at_configured_level() {
    let config = EngineConfig {
        significance_level: 0.01,
        ..Default::default()
    };
    let engine = StatisticalEngine::new(&config);
    assert_eq!(engine.significance_level(), 0.01);

    let request: StatTestRequest = serde_json::from_value(serde_json::json!({
        "test": "two_sample_t",
        "sample_a": SAMPLE_A,
        "sample_b": SAMPLE_B,
    }))
    .unwrap();
    let out = engine.run(&request).unwrap();
    assert_eq!(out.result.significance_level, 0.01);
    assert!(matches!(
        out.result.diagnostics,
        TestDiagnostics::TTest { variant: Some(TTestVariant::Welch), .. }
    ));

    let value = serde_json::to_value(&*out).unwrap();
    assert_eq!(value["result"]["diagnostics"]["kind"], "t_test");
    assert!(value["result"]["p_value"].is_number());
}
