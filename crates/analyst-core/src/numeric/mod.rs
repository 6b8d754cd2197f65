//! Numerical primitives shared by every engine: special functions, the
//! reference distributions built on them, descriptive statistics, small
//! dense linear algebra, and ordinary least squares.

pub mod descriptive;
pub mod distributions;
pub mod linalg;
pub mod regression;
pub mod special;

pub use descriptive::percentile;
pub use regression::{multiple_regression, RegressionResult};
pub use special::{
    inverse_normal_cdf, ln_gamma, normal_cdf, regularized_incomplete_beta,
    regularized_lower_gamma, regularized_upper_gamma,
};
