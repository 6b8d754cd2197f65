use crate::error::AnalystError;
use crate::numeric::linalg::{cholesky, Matrix};
use crate::AnalystResult;

const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// Check that `matrix` is a valid n×n correlation matrix and return its
/// lower Cholesky factor.
///
/// Shape, non-finite entries, symmetry, unit diagonal and |ρ| ≤ 1
/// violations are input errors.
/// A well-formed matrix that is not positive semi-definite is a domain
/// error: no joint distribution has those correlations.
pub fn correlation_factor(matrix: &[Vec<f64>], n: usize) -> AnalystResult<Matrix> {
    if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
        return Err(AnalystError::invalid(
            "correlation_matrix",
            format!("Must be {n}x{n} to match the variable list"),
        ));
    }
    for (i, row) in matrix.iter().enumerate() {
        if let Some(j) = row.iter().position(|x| !x.is_finite()) {
            return Err(AnalystError::invalid(
                "correlation_matrix",
                format!("Entry ({i}, {j}) is not a finite number"),
            ));
        }
    }
    for i in 0..n {
        if (matrix[i][i] - 1.0).abs() > SYMMETRY_TOLERANCE {
            return Err(AnalystError::invalid(
                "correlation_matrix",
                format!("Diagonal entry {i} is {}, expected 1", matrix[i][i]),
            ));
        }
        for j in 0..i {
            let (a, b) = (matrix[i][j], matrix[j][i]);
            if a.abs() > 1.0 {
                return Err(AnalystError::invalid(
                    "correlation_matrix",
                    format!("Entry ({i}, {j}) = {a} is outside [-1, 1]"),
                ));
            }
            if (a - b).abs() > SYMMETRY_TOLERANCE {
                return Err(AnalystError::invalid(
                    "correlation_matrix",
                    format!("Not symmetric at ({i}, {j}): {a} vs {b}"),
                ));
            }
        }
    }
    cholesky(matrix).map_err(|e| match e {
        AnalystError::Domain(msg) => AnalystError::Domain(format!("Correlation {msg}")),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_factor() {
        let l = correlation_factor(&[vec![1.0, 0.0], vec![0.0, 1.0]], 2).unwrap();
        assert_eq!(l, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_not_psd_is_domain_error() {
        let m = vec![
            vec![1.0, 0.9, 0.9],
            vec![0.9, 1.0, -0.9],
            vec![0.9, -0.9, 1.0],
        ];
        assert!(matches!(correlation_factor(&m, 3), Err(AnalystError::Domain(_))));
    }

    #[test]
    fn test_shape_and_symmetry_are_input_errors() {
        let wrong_size = vec![vec![1.0]];
        assert!(matches!(
            correlation_factor(&wrong_size, 2),
            Err(AnalystError::InvalidInput { .. })
        ));
        let asym = vec![vec![1.0, 0.5], vec![0.4, 1.0]];
        assert!(matches!(
            correlation_factor(&asym, 2),
            Err(AnalystError::InvalidInput { .. })
        ));
        let bad_diag = vec![vec![2.0, 0.0], vec![0.0, 1.0]];
        assert!(correlation_factor(&bad_diag, 2).is_err());
    }

    #[test]
    fn test_non_finite_entries_are_rejected() {
        let nan_diag = vec![vec![f64::NAN, 0.0], vec![0.0, 1.0]];
        assert!(matches!(
            correlation_factor(&nan_diag, 2),
            Err(AnalystError::InvalidInput { .. })
        ));
        let nan_upper = vec![vec![1.0, f64::NAN], vec![0.3, 1.0]];
        assert!(matches!(
            correlation_factor(&nan_upper, 2),
            Err(AnalystError::InvalidInput { .. })
        ));
        let inf = vec![vec![1.0, 0.0], vec![f64::INFINITY, 1.0]];
        assert!(matches!(
            correlation_factor(&inf, 2),
            Err(AnalystError::InvalidInput { .. })
        ));
    }
}
