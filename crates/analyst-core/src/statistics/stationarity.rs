use crate::error::AnalystError;
use crate::numeric::descriptive::{differences, sample_variance};
use crate::numeric::multiple_regression;
use crate::AnalystResult;

use super::result::{
    check_alpha, check_sample, zero_variance, AdfRegression, CriticalValues, HypothesisTestResult,
    TestDiagnostics,
};

pub const DEFAULT_ADF_LAGS: usize = 1;

const MIN_OBSERVATIONS: usize = 10;

/// MacKinnon (2010) response surface coefficients [β∞, β1, β2, β3] at
/// 1%, 5% and 10%, one integrated variable.
const DF_NONE: [[f64; 4]; 3] = [
    [-2.56574, -2.2358, -3.627, 0.0],
    [-1.94100, -0.2686, -3.365, 31.223],
    [-1.61682, 0.2656, -2.714, 25.364],
];
const DF_CONSTANT: [[f64; 4]; 3] = [
    [-3.43035, -6.5393, -16.786, -79.433],
    [-2.86154, -2.8903, -4.234, -40.040],
    [-2.56677, -1.5384, -2.809, 0.0],
];
const DF_CONSTANT_TREND: [[f64; 4]; 3] = [
    [-3.95877, -9.0531, -28.428, -134.155],
    [-3.41049, -4.3904, -9.036, -45.374],
    [-3.12705, -2.5856, -3.925, -22.380],
];

/// Finite-sample critical values cv(T) = β∞ + β1/T + β2/T² + β3/T³.
pub(crate) fn mackinnon(table: &[[f64; 4]; 3], observations: usize) -> CriticalValues {
    let t = observations as f64;
    let cv = |b: &[f64; 4]| b[0] + b[1] / t + b[2] / (t * t) + b[3] / (t * t * t);
    CriticalValues {
        one_pct: cv(&table[0]),
        five_pct: cv(&table[1]),
        ten_pct: cv(&table[2]),
    }
}

pub(crate) struct AdfFit {
    pub statistic: f64,
    pub gamma: f64,
    pub observations: usize,
}

/// Δy_t = γ·y_{t−1} + Σ δ_j·Δy_{t−j} + deterministic terms + ε_t.
/// The statistic is the t-ratio of γ.
pub(crate) fn adf_regression(
    series: &[f64],
    lags: usize,
    regression: AdfRegression,
) -> AnalystResult<AdfFit> {
    let n = series.len();
    let deterministic = match regression {
        AdfRegression::None => 0,
        AdfRegression::Constant => 1,
        AdfRegression::ConstantTrend => 2,
    };
    let regressors = 1 + lags + deterministic;
    let required = regressors + lags + 2;
    if n < required {
        return Err(AnalystError::insufficient("ADF regression", required, n));
    }

    let dy = differences(series);
    let rows = lags..dy.len();
    let y: Vec<f64> = rows.clone().map(|t| dy[t]).collect();

    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(regressors);
    columns.push(rows.clone().map(|t| series[t]).collect());
    for j in 1..=lags {
        columns.push(rows.clone().map(|t| dy[t - j]).collect());
    }
    if deterministic >= 1 {
        columns.push(vec![1.0; y.len()]);
    }
    if deterministic == 2 {
        columns.push(rows.map(|t| (t + 1) as f64).collect());
    }

    let fit = multiple_regression(&y, &columns)?;
    Ok(AdfFit {
        statistic: fit.t_statistics[0],
        gamma: fit.coefficients[0],
        observations: fit.observations,
    })
}

/// Augmented Dickey–Fuller unit-root test.
///
/// No p-value is reported; the decision compares the statistic with the
/// MacKinnon critical value matching `alpha`. Rejecting the null means the
/// series looks stationary.
pub fn adf_test(
    series: &[f64],
    lags: Option<usize>,
    regression: AdfRegression,
    alpha: f64,
) -> AnalystResult<HypothesisTestResult> {
    check_alpha(alpha)?;
    check_sample("ADF test", series, MIN_OBSERVATIONS)?;
    if sample_variance(series) <= 0.0 {
        return Err(zero_variance("ADF test"));
    }
    let lags = lags.unwrap_or(DEFAULT_ADF_LAGS);
    let fit = adf_regression(series, lags, regression)?;

    let table = match regression {
        AdfRegression::None => &DF_NONE,
        AdfRegression::Constant => &DF_CONSTANT,
        AdfRegression::ConstantTrend => &DF_CONSTANT_TREND,
    };
    let critical_values = mackinnon(table, fit.observations);
    let reject = fit.statistic < critical_values.at(alpha);

    Ok(HypothesisTestResult {
        test_name: "Augmented Dickey-Fuller test".into(),
        null_hypothesis: "Series has a unit root (non-stationary)".into(),
        alternative_hypothesis: "Series is stationary".into(),
        statistic: fit.statistic,
        degrees_of_freedom: None,
        p_value: None,
        significance_level: alpha,
        reject_null: reject,
        diagnostics: TestDiagnostics::UnitRoot {
            regression,
            lags,
            observations: fit.observations,
            gamma: fit.gamma,
            critical_values,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic zero-mean noise in (-0.5, 0.5).
    fn noise(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| ((i as f64 * 12.9898).sin() * 43_758.545_3).fract() * 0.5)
            .collect()
    }

    #[test]
    fn test_mackinnon_asymptotics() {
        let cv = mackinnon(&DF_CONSTANT, 1_000_000);
        assert!((cv.five_pct + 2.86154).abs() < 1e-4);
        let small = mackinnon(&DF_CONSTANT, 100);
        // finite samples push critical values further into the tail
        assert!(small.five_pct < cv.five_pct);
        assert!(small.one_pct < small.five_pct && small.five_pct < small.ten_pct);
    }

    #[test]
    fn test_mean_reverting_series_rejects() {
        let e = noise(300);
        let mut x = vec![0.0; 300];
        for t in 1..300 {
            x[t] = 0.3 * x[t - 1] + e[t];
        }
        let r = adf_test(&x, None, AdfRegression::Constant, 0.05).unwrap();
        assert!(r.reject_null, "statistic = {}", r.statistic);
        assert!(r.p_value.is_none());
    }

    #[test]
    fn test_explosive_series_does_not_reject() {
        let e = noise(60);
        let x: Vec<f64> = (0..60)
            .map(|t| 1.05f64.powi(t as i32) + 0.01 * e[t as usize])
            .collect();
        let r = adf_test(&x, Some(0), AdfRegression::Constant, 0.05).unwrap();
        assert!(!r.reject_null, "statistic = {}", r.statistic);
        assert!(r.statistic > 0.0);
    }

    #[test]
    fn test_size_requirements() {
        let short = noise(9);
        assert!(matches!(
            adf_test(&short, None, AdfRegression::Constant, 0.05),
            Err(AnalystError::InsufficientData { .. })
        ));
        let ten = noise(10);
        assert!(matches!(
            adf_test(&ten, Some(4), AdfRegression::ConstantTrend, 0.05),
            Err(AnalystError::InsufficientData { .. })
        ));
        assert!(matches!(
            adf_test(&[3.0; 12], None, AdfRegression::Constant, 0.05),
            Err(AnalystError::Domain(_))
        ));
    }

    #[test]
    fn test_diagnostics_report_regression() {
        let r = adf_test(&noise(50), Some(2), AdfRegression::ConstantTrend, 0.10).unwrap();
        match r.diagnostics {
            TestDiagnostics::UnitRoot {
                regression,
                lags,
                observations,
                ..
            } => {
                assert_eq!(regression, AdfRegression::ConstantTrend);
                assert_eq!(lags, 2);
                assert_eq!(observations, 47);
            }
            other => panic!("unexpected diagnostics {other:?}"),
        }
    }
}
