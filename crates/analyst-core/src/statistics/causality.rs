use crate::error::AnalystError;
use crate::numeric::descriptive::sample_variance;
use crate::numeric::distributions::f_survival;
use crate::numeric::multiple_regression;
use crate::numeric::regression::with_intercept;
use crate::AnalystResult;

use super::result::{
    check_alpha, check_same_length, check_sample, zero_variance, AdfRegression,
    HypothesisTestResult, TestDiagnostics,
};
use super::stationarity::{adf_regression, mackinnon, DEFAULT_ADF_LAGS};

const MIN_COINTEGRATION_OBSERVATIONS: usize = 12;

/// MacKinnon (2010) coefficients for residual-based cointegration tests with
/// two variables and a constant.
const EG_CONSTANT_TWO: [[f64; 4]; 3] = [
    [-3.89644, -10.9519, -33.527, 0.0],
    [-3.33613, -6.1101, -6.823, 0.0],
    [-3.04445, -4.2412, -2.720, 0.0],
];

/// Granger causality of `cause` on `effect`.
///
/// Compares an autoregression of `effect` on its own `lags` past values
/// (restricted) with one that also includes `lags` past values of `cause`
/// (unrestricted):
/// F = ((SSR_r − SSR_u) / lags) / (SSR_u / (m − 2·lags − 1)).
pub fn granger_causality_test(
    cause: &[f64],
    effect: &[f64],
    lags: usize,
    alpha: f64,
) -> AnalystResult<HypothesisTestResult> {
    check_alpha(alpha)?;
    if lags == 0 {
        return Err(AnalystError::invalid("lags", "Must be at least 1"));
    }
    check_same_length(cause, effect)?;
    let required = 3 * lags + 2;
    check_sample("Granger causality test (cause)", cause, required)?;
    check_sample("Granger causality test (effect)", effect, required)?;
    if sample_variance(effect) <= 0.0 || sample_variance(cause) <= 0.0 {
        return Err(zero_variance("Granger causality test"));
    }

    let n = effect.len();
    let rows = lags..n;
    let y: Vec<f64> = rows.clone().map(|t| effect[t]).collect();
    let m = y.len();

    let own_lags: Vec<Vec<f64>> = (1..=lags)
        .map(|j| rows.clone().map(|t| effect[t - j]).collect())
        .collect();
    let cause_lags: Vec<Vec<f64>> = (1..=lags)
        .map(|j| rows.clone().map(|t| cause[t - j]).collect())
        .collect();

    let restricted = with_intercept(m, own_lags.clone());
    let mut unrestricted = with_intercept(m, own_lags);
    unrestricted.extend(cause_lags);

    let ssr_r = multiple_regression(&y, &restricted)?.sum_squared_residuals;
    let fit_u = multiple_regression(&y, &unrestricted)?;
    let ssr_u = fit_u.sum_squared_residuals;
    let df_num = lags as f64;
    let df_den = fit_u.degrees_of_freedom as f64;

    let f = if ssr_u > 0.0 {
        ((ssr_r - ssr_u).max(0.0) / df_num) / (ssr_u / df_den)
    } else if ssr_r > 0.0 {
        f64::INFINITY
    } else {
        return Err(AnalystError::Domain(
            "Granger causality test: both regressions fit exactly".into(),
        ));
    };
    let p = f_survival(f, df_num, df_den)?;

    Ok(HypothesisTestResult {
        test_name: "Granger causality test".into(),
        null_hypothesis: format!("Lags of the cause series do not help predict the effect series (lags = {lags})"),
        alternative_hypothesis: "The cause series Granger-causes the effect series".into(),
        statistic: f,
        degrees_of_freedom: Some(df_den),
        p_value: Some(p),
        significance_level: alpha,
        reject_null: p < alpha,
        diagnostics: TestDiagnostics::Granger {
            lags,
            observations: m,
            ssr_restricted: ssr_r,
            ssr_unrestricted: ssr_u,
        },
    })
}

/// Engle–Granger two-step cointegration test.
///
/// Regresses `y` on a constant and `x`, then runs a Dickey–Fuller
/// regression without deterministic terms on the residuals. The statistic
/// is compared with residual-based critical values, not the ordinary ADF
/// table. Rejecting the null means the pair is cointegrated.
pub fn engle_granger_test(
    y: &[f64],
    x: &[f64],
    lags: Option<usize>,
    alpha: f64,
) -> AnalystResult<HypothesisTestResult> {
    check_alpha(alpha)?;
    check_same_length(y, x)?;
    check_sample("Engle-Granger test (y)", y, MIN_COINTEGRATION_OBSERVATIONS)?;
    check_sample("Engle-Granger test (x)", x, MIN_COINTEGRATION_OBSERVATIONS)?;
    if sample_variance(x) <= 0.0 || sample_variance(y) <= 0.0 {
        return Err(zero_variance("Engle-Granger test"));
    }

    let cointegrating = multiple_regression(y, &with_intercept(x.len(), vec![x.to_vec()]))?;
    let lags = lags.unwrap_or(DEFAULT_ADF_LAGS);
    let fit = adf_regression(&cointegrating.residuals, lags, AdfRegression::None)?;
    let critical_values = mackinnon(&EG_CONSTANT_TWO, fit.observations);

    Ok(HypothesisTestResult {
        test_name: "Engle-Granger cointegration test".into(),
        null_hypothesis: "Series are not cointegrated".into(),
        alternative_hypothesis: "Series are cointegrated".into(),
        statistic: fit.statistic,
        degrees_of_freedom: None,
        p_value: None,
        significance_level: alpha,
        reject_null: fit.statistic < critical_values.at(alpha),
        diagnostics: TestDiagnostics::Cointegration {
            intercept: cointegrating.coefficients[0],
            hedge_ratio: cointegrating.coefficients[1],
            r_squared: cointegrating.r_squared,
            adf_lags: lags,
            critical_values,
        },
    })
}
