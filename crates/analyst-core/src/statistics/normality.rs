use crate::numeric::descriptive::{central_moment, excess_kurtosis, skewness};
use crate::numeric::distributions::chi_squared_survival;
use crate::AnalystResult;

use super::result::{check_alpha, check_sample, zero_variance, HypothesisTestResult, TestDiagnostics};

const MIN_OBSERVATIONS: usize = 8;

/// Jarque–Bera: JB = n/6 · (S² + K²/4), chi-square(2) under normality.
pub fn jarque_bera_test(sample: &[f64], alpha: f64) -> AnalystResult<HypothesisTestResult> {
    check_alpha(alpha)?;
    check_sample("Jarque-Bera test", sample, MIN_OBSERVATIONS)?;
    if central_moment(sample, 2) <= 0.0 {
        return Err(zero_variance("Jarque-Bera test"));
    }

    let n = sample.len();
    let s = skewness(sample);
    let k = excess_kurtosis(sample);
    let jb = n as f64 / 6.0 * (s * s + k * k / 4.0);
    let p = chi_squared_survival(jb, 2.0)?;

    Ok(HypothesisTestResult {
        test_name: "Jarque-Bera normality test".into(),
        null_hypothesis: "Sample is drawn from a normal distribution".into(),
        alternative_hypothesis: "Sample is not normally distributed".into(),
        statistic: jb,
        degrees_of_freedom: Some(2.0),
        p_value: Some(p),
        significance_level: alpha,
        reject_null: p < alpha,
        diagnostics: TestDiagnostics::Normality {
            observations: n,
            skewness: s,
            excess_kurtosis: k,
        },
    })
}
