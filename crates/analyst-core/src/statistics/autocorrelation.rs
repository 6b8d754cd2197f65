use crate::error::AnalystError;
use crate::numeric::descriptive::{autocorrelation, central_moment};
use crate::numeric::distributions::chi_squared_survival;
use crate::AnalystResult;

use super::result::{check_alpha, check_sample, zero_variance, HypothesisTestResult, TestDiagnostics};

/// Ljung–Box: Q = n(n+2) Σ_{k=1..h} ρ_k² / (n − k), chi-square(h) under
/// the null of no autocorrelation.
pub fn ljung_box_test(series: &[f64], lags: usize, alpha: f64) -> AnalystResult<HypothesisTestResult> {
    check_alpha(alpha)?;
    if lags == 0 {
        return Err(AnalystError::invalid("lags", "Must be at least 1"));
    }
    check_sample("Ljung-Box test", series, lags + 2)?;
    if central_moment(series, 2) <= 0.0 {
        return Err(zero_variance("Ljung-Box test"));
    }

    let n = series.len() as f64;
    let autocorrelations: Vec<f64> = (1..=lags).map(|k| autocorrelation(series, k)).collect();
    let q = n
        * (n + 2.0)
        * autocorrelations
            .iter()
            .enumerate()
            .map(|(i, rho)| rho * rho / (n - (i + 1) as f64))
            .sum::<f64>();
    let p = chi_squared_survival(q, lags as f64)?;

    Ok(HypothesisTestResult {
        test_name: "Ljung-Box test".into(),
        null_hypothesis: format!("No autocorrelation up to lag {lags}"),
        alternative_hypothesis: format!("Autocorrelation present at some lag up to {lags}"),
        statistic: q,
        degrees_of_freedom: Some(lags as f64),
        p_value: Some(p),
        significance_level: alpha,
        reject_null: p < alpha,
        diagnostics: TestDiagnostics::Autocorrelation {
            lags,
            autocorrelations,
        },
    })
}
