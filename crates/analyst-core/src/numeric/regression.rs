use serde::{Deserialize, Serialize};

use crate::error::AnalystError;
use crate::AnalystResult;

use super::descriptive::mean;
use super::distributions::student_t_two_tailed;
use super::linalg::invert;

/// Ordinary least squares fit. Index `j` of every per-coefficient vector
/// refers to design column `j`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionResult {
    pub coefficients: Vec<f64>,
    pub standard_errors: Vec<f64>,
    pub t_statistics: Vec<f64>,
    pub p_values: Vec<f64>,
    pub residuals: Vec<f64>,
    pub r_squared: f64,
    pub adjusted_r_squared: f64,
    pub sum_squared_residuals: f64,
    /// n − k
    pub degrees_of_freedom: usize,
    pub observations: usize,
}

/// Prepend a column of ones to `columns`.
pub fn with_intercept(n: usize, columns: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let mut out = Vec::with_capacity(columns.len() + 1);
    out.push(vec![1.0; n]);
    out.extend(columns);
    out
}

/// Solve y = Xβ + ε by the normal equations.
///
/// `columns` are the design matrix columns, each the same length as `y`.
/// An intercept is only fitted if one of the columns is constant (see
/// [`with_intercept`]). R² is centred when the design carries an intercept
/// and uncentred otherwise.
pub fn multiple_regression(y: &[f64], columns: &[Vec<f64>]) -> AnalystResult<RegressionResult> {
    let n = y.len();
    let k = columns.len();
    if k == 0 {
        return Err(AnalystError::invalid(
            "columns",
            "design matrix needs at least one column",
        ));
    }
    if n <= k {
        return Err(AnalystError::insufficient("multiple_regression", k + 1, n));
    }
    if let Some(j) = columns.iter().position(|c| c.len() != n) {
        return Err(AnalystError::invalid(
            "columns",
            format!(
                "column {j} has {} observations, expected {n}",
                columns[j].len()
            ),
        ));
    }
    if y.iter().chain(columns.iter().flatten()).any(|v| !v.is_finite()) {
        return Err(AnalystError::invalid(
            "y",
            "regression inputs must be finite",
        ));
    }

    // X'X and X'y
    let mut xtx = vec![vec![0.0; k]; k];
    for a in 0..k {
        for b in a..k {
            let v: f64 = columns[a].iter().zip(&columns[b]).map(|(p, q)| p * q).sum();
            xtx[a][b] = v;
            xtx[b][a] = v;
        }
    }
    let xty: Vec<f64> = columns
        .iter()
        .map(|c| c.iter().zip(y).map(|(p, q)| p * q).sum::<f64>())
        .collect();

    let xtx_inv = invert(&xtx).map_err(|_| {
        AnalystError::Domain("design matrix is rank deficient (collinear columns)".into())
    })?;

    let coefficients: Vec<f64> = xtx_inv
        .iter()
        .map(|row| row.iter().zip(&xty).map(|(a, b)| a * b).sum::<f64>())
        .collect();

    let residuals: Vec<f64> = (0..n)
        .map(|i| {
            let fitted: f64 = columns
                .iter()
                .zip(&coefficients)
                .map(|(c, beta)| c[i] * beta)
                .sum();
            y[i] - fitted
        })
        .collect();

    let ssr: f64 = residuals.iter().map(|e| e * e).sum();
    let dof = n - k;
    let sigma2 = ssr / dof as f64;

    let has_intercept = columns
        .iter()
        .any(|c| c.iter().all(|v| *v == c[0]) && c[0] != 0.0);
    let sst: f64 = if has_intercept {
        let y_bar = mean(y);
        y.iter().map(|v| (v - y_bar).powi(2)).sum()
    } else {
        y.iter().map(|v| v * v).sum()
    };
    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { 0.0 };
    let adjusted_r_squared = if sst > 0.0 {
        let base = if has_intercept { n - 1 } else { n };
        1.0 - (1.0 - r_squared) * base as f64 / dof as f64
    } else {
        0.0
    };

    let mut standard_errors = Vec::with_capacity(k);
    let mut t_statistics = Vec::with_capacity(k);
    let mut p_values = Vec::with_capacity(k);
    for (j, beta) in coefficients.iter().enumerate() {
        let se = (sigma2 * xtx_inv[j][j]).max(0.0).sqrt();
        let (t, p) = if se > 0.0 {
            let t = beta / se;
            (t, student_t_two_tailed(t, dof as f64)?)
        } else if *beta == 0.0 {
            (0.0, 1.0)
        } else {
            // Exact fit: the coefficient is known without error.
            (beta.signum() * f64::INFINITY, 0.0)
        };
        standard_errors.push(se);
        t_statistics.push(t);
        p_values.push(p);
    }

    Ok(RegressionResult {
        coefficients,
        standard_errors,
        t_statistics,
        p_values,
        residuals,
        r_squared,
        adjusted_r_squared,
        sum_squared_residuals: ssr,
        degrees_of_freedom: dof,
        observations: n,
    })
}
