//! Reference distributions for hypothesis tests, expressed through the
//! regularized incomplete beta and gamma functions.

use crate::error::AnalystError;
use crate::AnalystResult;

use super::special::{regularized_incomplete_beta, regularized_upper_gamma};

fn check_dof(name: &str, df: f64) -> AnalystResult<()> {
    if df > 0.0 && df.is_finite() {
        Ok(())
    } else {
        Err(AnalystError::invalid(
            name,
            format!("degrees of freedom must be positive and finite, got {df}"),
        ))
    }
}

/// CDF of Student's t with `df` degrees of freedom.
pub fn student_t_cdf(t: f64, df: f64) -> AnalystResult<f64> {
    check_dof("df", df)?;
    if t.is_nan() {
        return Err(AnalystError::invalid("t", "statistic is NaN"));
    }
    if t.is_infinite() {
        return Ok(if t > 0.0 { 1.0 } else { 0.0 });
    }
    let x = df / (df + t * t);
    let tail = 0.5 * regularized_incomplete_beta(x, 0.5 * df, 0.5)?;
    Ok(if t > 0.0 { 1.0 - tail } else { tail })
}

/// Two-sided p-value P(|T| ≥ |t|).
pub fn student_t_two_tailed(t: f64, df: f64) -> AnalystResult<f64> {
    check_dof("df", df)?;
    if t.is_nan() {
        return Err(AnalystError::invalid("t", "statistic is NaN"));
    }
    if t.is_infinite() {
        return Ok(0.0);
    }
    regularized_incomplete_beta(df / (df + t * t), 0.5 * df, 0.5)
}

/// Upper tail P(F ≥ f) of the F distribution with (d1, d2) degrees of
/// freedom.
pub fn f_survival(f: f64, d1: f64, d2: f64) -> AnalystResult<f64> {
    check_dof("d1", d1)?;
    check_dof("d2", d2)?;
    if f.is_nan() {
        return Err(AnalystError::invalid("f", "statistic is NaN"));
    }
    if f <= 0.0 {
        return Ok(1.0);
    }
    if f.is_infinite() {
        return Ok(0.0);
    }
    regularized_incomplete_beta(d2 / (d2 + d1 * f), 0.5 * d2, 0.5 * d1)
}

pub fn f_cdf(f: f64, d1: f64, d2: f64) -> AnalystResult<f64> {
    Ok(1.0 - f_survival(f, d1, d2)?)
}

/// Upper tail P(X ≥ x) of the chi-square distribution with k degrees of
/// freedom.
pub fn chi_squared_survival(x: f64, k: f64) -> AnalystResult<f64> {
    check_dof("k", k)?;
    if x.is_nan() {
        return Err(AnalystError::invalid("x", "statistic is NaN"));
    }
    if x <= 0.0 {
        return Ok(1.0);
    }
    if x.is_infinite() {
        return Ok(0.0);
    }
    regularized_upper_gamma(0.5 * x, 0.5 * k)
}
