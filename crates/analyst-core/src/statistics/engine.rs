use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::cache::{cache_key, CacheStats, ComputationCache};
use crate::config::EngineConfig;
use crate::types::{with_metadata_f64, ComputationOutput};
use crate::AnalystResult;

use super::autocorrelation::ljung_box_test;
use super::causality::{engle_granger_test, granger_causality_test};
use super::f_test::f_test;
use super::normality::jarque_bera_test;
use super::result::{AdfRegression, HypothesisTestResult, TTestVariant};
use super::stationarity::adf_test;
use super::t_test::{one_sample_t_test, paired_t_test, two_sample_t_test};

/// Every supported test with its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum StatTestRequest {
    OneSampleT {
        sample: Vec<f64>,
        #[serde(default)]
        mu: f64,
    },
    TwoSampleT {
        sample_a: Vec<f64>,
        sample_b: Vec<f64>,
        #[serde(default)]
        variant: TTestVariant,
    },
    PairedT {
        sample_a: Vec<f64>,
        sample_b: Vec<f64>,
    },
    FTest {
        sample_a: Vec<f64>,
        sample_b: Vec<f64>,
    },
    JarqueBera {
        sample: Vec<f64>,
    },
    Adf {
        series: Vec<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lags: Option<usize>,
        #[serde(default)]
        regression: AdfRegression,
    },
    LjungBox {
        series: Vec<f64>,
        lags: usize,
    },
    Granger {
        cause: Vec<f64>,
        effect: Vec<f64>,
        lags: usize,
    },
    EngleGranger {
        y: Vec<f64>,
        x: Vec<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lags: Option<usize>,
    },
}

impl StatTestRequest {
    pub fn name(&self) -> &'static str {
        match self {
            StatTestRequest::OneSampleT { .. } => "one_sample_t",
            StatTestRequest::TwoSampleT { .. } => "two_sample_t",
            StatTestRequest::PairedT { .. } => "paired_t",
            StatTestRequest::FTest { .. } => "f_test",
            StatTestRequest::JarqueBera { .. } => "jarque_bera",
            StatTestRequest::Adf { .. } => "adf",
            StatTestRequest::LjungBox { .. } => "ljung_box",
            StatTestRequest::Granger { .. } => "granger",
            StatTestRequest::EngleGranger { .. } => "engle_granger",
        }
    }
}

/// Run one test at significance level `alpha`.
pub fn run_test(
    request: &StatTestRequest,
    alpha: f64,
) -> AnalystResult<ComputationOutput<HypothesisTestResult>> {
    let start = Instant::now();
    tracing::debug!(test = request.name(), alpha, "running hypothesis test");

    let result = match request {
        StatTestRequest::OneSampleT { sample, mu } => one_sample_t_test(sample, *mu, alpha)?,
        StatTestRequest::TwoSampleT {
            sample_a,
            sample_b,
            variant,
        } => two_sample_t_test(sample_a, sample_b, *variant, alpha)?,
        StatTestRequest::PairedT { sample_a, sample_b } => paired_t_test(sample_a, sample_b, alpha)?,
        StatTestRequest::FTest { sample_a, sample_b } => f_test(sample_a, sample_b, alpha)?,
        StatTestRequest::JarqueBera { sample } => jarque_bera_test(sample, alpha)?,
        StatTestRequest::Adf {
            series,
            lags,
            regression,
        } => adf_test(series, *lags, *regression, alpha)?,
        StatTestRequest::LjungBox { series, lags } => ljung_box_test(series, *lags, alpha)?,
        StatTestRequest::Granger {
            cause,
            effect,
            lags,
        } => granger_causality_test(cause, effect, *lags, alpha)?,
        StatTestRequest::EngleGranger { y, x, lags } => engle_granger_test(y, x, *lags, alpha)?,
    };

    let mut warnings = Vec::new();
    if let Some(p) = result.p_value {
        if (p - alpha).abs() < alpha * 0.1 {
            warnings.push(format!(
                "p-value {p:.4} is within 10% of the significance level; the decision is marginal"
            ));
        }
    }

    let methodology = result.test_name.clone();
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(&methodology, request, warnings, elapsed, result))
}

/// Hypothesis testing engine at a fixed significance level, with its own
/// memo cache.
pub struct StatisticalEngine {
    significance_level: f64,
    cache: ComputationCache<ComputationOutput<HypothesisTestResult>>,
}

impl StatisticalEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            significance_level: config.significance_level,
            cache: ComputationCache::new(&config.cache),
        }
    }

    pub fn significance_level(&self) -> f64 {
        self.significance_level
    }

    pub fn run(
        &self,
        request: &StatTestRequest,
    ) -> AnalystResult<Arc<ComputationOutput<HypothesisTestResult>>> {
        let alpha = self.significance_level;
        let key = cache_key("statistics", &(request, alpha))?;
        self.cache
            .get_or_try_insert_with(key, || run_test(request, alpha))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
