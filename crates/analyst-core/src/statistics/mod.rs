//! Hypothesis tests. Each test validates its minimum sample size, computes
//! its statistic and a p-value (or tabulated critical values), and decides
//! at the caller's significance level. Inputs are never reordered or
//! mutated.

pub mod autocorrelation;
pub mod causality;
pub mod engine;
pub mod normality;
pub mod result;
pub mod stationarity;
pub mod t_test;

pub use autocorrelation::ljung_box_test;
pub use causality::{engle_granger_test, granger_causality_test};
pub use engine::{run_test, StatTestRequest, StatisticalEngine};
pub use f_test::f_test;
pub use normality::jarque_bera_test;
pub use result::{AdfRegression, CriticalValues, HypothesisTestResult, TTestVariant, TestDiagnostics};
pub use stationarity::adf_test;
pub use t_test::{one_sample_t_test, paired_t_test, two_sample_t_test};
