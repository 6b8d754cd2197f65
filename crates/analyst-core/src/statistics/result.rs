use serde::{Deserialize, Serialize};

use crate::error::AnalystError;
use crate::AnalystResult;

/// Outcome of one hypothesis test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisTestResult {
    pub test_name: String,
    pub null_hypothesis: String,
    pub alternative_hypothesis: String,
    pub statistic: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degrees_of_freedom: Option<f64>,
    /// `None` for tests decided against tabulated critical values
    pub p_value: Option<f64>,
    pub significance_level: f64,
    pub reject_null: bool,
    pub diagnostics: TestDiagnostics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TTestVariant {
    /// Equal variances, pooled standard error
    Pooled,
    /// Unequal variances, Welch–Satterthwaite degrees of freedom
    #[default]
    Welch,
}

/// Deterministic terms in the Dickey–Fuller regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdfRegression {
    None,
    #[default]
    Constant,
    ConstantTrend,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

impl CriticalValues {
    /// The value at the largest tabulated level not above `alpha`, so the
    /// test is never looser than requested: 1% for alpha < 0.05, 5% for
    /// alpha < 0.10, otherwise 10%.
    pub fn at(&self, alpha: f64) -> f64 {
        if alpha < 0.05 {
            self.one_pct
        } else if alpha < 0.10 {
            self.five_pct
        } else {
            self.ten_pct
        }
    }
}

/// Test-specific figures behind the statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestDiagnostics {
    TTest {
        #[serde(skip_serializing_if = "Option::is_none")]
        variant: Option<TTestVariant>,
        sample_means: Vec<f64>,
        sample_sizes: Vec<usize>,
        mean_difference: f64,
        standard_error: f64,
    },
    FTest {
        variance_a: f64,
        variance_b: f64,
    },
    Normality {
        observations: usize,
        skewness: f64,
        excess_kurtosis: f64,
    },
    UnitRoot {
        regression: AdfRegression,
        lags: usize,
        observations: usize,
        /// Coefficient on the lagged level
        gamma: f64,
        critical_values: CriticalValues,
    },
    Autocorrelation {
        lags: usize,
        autocorrelations: Vec<f64>,
    },
    Granger {
        lags: usize,
        observations: usize,
        ssr_restricted: f64,
        ssr_unrestricted: f64,
    },
    Cointegration {
        intercept: f64,
        hedge_ratio: f64,
        r_squared: f64,
        adf_lags: usize,
        critical_values: CriticalValues,
    },
}

// ---------------------------------------------------------------------------
// Shared validation
// ---------------------------------------------------------------------------

pub(crate) fn check_alpha(alpha: f64) -> AnalystResult<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(AnalystError::invalid(
            "significance_level",
            format!("Must lie strictly between 0 and 1, got {alpha}"),
        ))
    }
}

/// Size and finiteness check shared by every test.
pub(crate) fn check_sample(context: &str, values: &[f64], min: usize) -> AnalystResult<()> {
    if values.len() < min {
        return Err(AnalystError::insufficient(context, min, values.len()));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AnalystError::invalid(context, "Observations must be finite"));
    }
    Ok(())
}

pub(crate) fn check_same_length(a: &[f64], b: &[f64]) -> AnalystResult<()> {
    if a.len() != b.len() {
        return Err(AnalystError::invalid(
            "samples",
            format!("Series lengths differ: {} vs {}", a.len(), b.len()),
        ));
    }
    Ok(())
}

pub(crate) fn zero_variance(context: &str) -> AnalystError {
    AnalystError::Domain(format!("{context}: sample variance is zero"))
}
