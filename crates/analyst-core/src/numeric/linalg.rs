use crate::error::AnalystError;
use crate::AnalystResult;

pub type Matrix = Vec<Vec<f64>>;

/// Pivots smaller than this are treated as zero.
const SINGULAR_THRESHOLD: f64 = 1e-12;

/// Residual tolerance when deciding positive semi-definiteness.
pub const PSD_TOLERANCE: f64 = 1e-10;

fn check_square(a: &[Vec<f64>], context: &str) -> AnalystResult<usize> {
    let n = a.len();
    if a.iter().any(|row| row.len() != n) {
        return Err(AnalystError::invalid(
            context,
            format!("matrix must be square ({n} rows)"),
        ));
    }
    Ok(n)
}

/// Gauss-Jordan inversion with partial pivoting.
pub fn invert(a: &[Vec<f64>]) -> AnalystResult<Matrix> {
    let n = check_square(a, "matrix")?;
    if n == 0 {
        return Ok(Vec::new());
    }

    // Augmented matrix [A | I]
    let mut aug: Matrix = a
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = Vec::with_capacity(2 * n);
            r.extend_from_slice(row);
            r.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            r
        })
        .collect();

    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |m, v| m.max(v.abs()))
        .max(1.0);

    for col in 0..n {
        let (pivot_row, pivot_abs) = (col..n)
            .map(|r| (r, aug[r][col].abs()))
            .fold((col, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });

        if pivot_abs < SINGULAR_THRESHOLD * scale {
            return Err(AnalystError::Domain(
                "Singular matrix cannot be inverted".into(),
            ));
        }
        aug.swap(col, pivot_row);

        let pivot = aug[col][col];
        for cell in aug[col].iter_mut() {
            *cell /= pivot;
        }

        let pivot_values = aug[col].clone();
        for (r, row) in aug.iter_mut().enumerate() {
            if r == col {
                continue;
            }
            let factor = row[col];
            if factor == 0.0 {
                continue;
            }
            for (cell, pv) in row.iter_mut().zip(pivot_values.iter()) {
                *cell -= factor * pv;
            }
        }
    }

    Ok(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}

/// Lower-triangular L with A = L·Lᵀ for a symmetric positive semi-definite A.
///
/// Zero pivots are allowed (rank-deficient but valid correlation structures);
/// a negative residual beyond [`PSD_TOLERANCE`] is a domain error.
pub fn cholesky(a: &[Vec<f64>]) -> AnalystResult<Matrix> {
    let n = check_square(a, "matrix")?;
    let mut l = vec![vec![0.0; n]; n];

    for j in 0..n {
        let diag = a[j][j] - (0..j).map(|k| l[j][k] * l[j][k]).sum::<f64>();
        if diag < -PSD_TOLERANCE {
            return Err(AnalystError::Domain(format!(
                "matrix is not positive semi-definite (pivot {j} = {diag:.3e})"
            )));
        }
        l[j][j] = if diag > PSD_TOLERANCE { diag.sqrt() } else { 0.0 };

        for i in (j + 1)..n {
            let s = a[i][j] - (0..j).map(|k| l[i][k] * l[j][k]).sum::<f64>();
            if l[j][j] > 0.0 {
                l[i][j] = s / l[j][j];
            } else if s.abs() > PSD_TOLERANCE {
                return Err(AnalystError::Domain(format!(
                    "matrix is not positive semi-definite (zero pivot {j} with off-diagonal residual {s:.3e})"
                )));
            }
        }
    }
    Ok(l)
}

/// Lower-triangular L times v.
pub fn lower_mul_vec(l: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    l.iter()
        .enumerate()
        .map(|(i, row)| row[..=i].iter().zip(v).map(|(a, b)| a * b).sum::<f64>())
        .collect()
}
