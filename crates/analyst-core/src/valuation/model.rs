use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::cache::{cache_key, CacheStats, ComputationCache};
use crate::config::EngineConfig;
use crate::types::{with_metadata, ComputationOutput, ModelType, ScenarioCase};
use crate::AnalystResult;

use super::dcf::{normalize_assumptions, validate_company, value_scenario, ScenarioResult, ValuationInput};
use super::recommendation::{recommend, Recommendation};
use super::scenarios::{build_scenarios, DcfScenarios};
use super::sensitivity::{build_sensitivity_grid, SensitivityGrid};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub recommendation: Recommendation,
}

/// Full DCF model: base case, bull/bear variants, sensitivity sweep and a
/// rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationModelOutput {
    pub model_type: ModelType,
    pub symbol: String,
    pub base_case: ScenarioResult,
    pub scenarios: DcfScenarios,
    pub sensitivity_analysis: SensitivityGrid,
    pub summary: ValuationSummary,
}

pub fn build_valuation_model(
    input: &ValuationInput,
) -> AnalystResult<ComputationOutput<ValuationModelOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(symbol = %input.symbol, years = input.assumptions.projection_years, "building valuation model");

    validate_company(input)?;
    let assumptions = normalize_assumptions(&input.assumptions, &mut warnings);

    let base_case = value_scenario(input, &assumptions, ScenarioCase::Base, &mut warnings)?;
    let scenarios = build_scenarios(input, &assumptions, &base_case, &mut warnings)?;
    let sensitivity_analysis = build_sensitivity_grid(input, &assumptions, &mut warnings)?;
    let recommendation = recommend(
        input.current_price,
        &base_case,
        &scenarios.bull,
        &scenarios.bear,
    );

    let output = ValuationModelOutput {
        model_type: ModelType::Dcf,
        symbol: input.symbol.clone(),
        base_case,
        scenarios,
        sensitivity_analysis,
        summary: ValuationSummary { recommendation },
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "FCFF DCF with bull/bear scenarios and one-way sensitivity",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// DCF engine with its own memo cache. Identical inputs return the same
/// shared result while it is cached.
pub struct ValuationEngine {
    cache: ComputationCache<ComputationOutput<ValuationModelOutput>>,
}

impl ValuationEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cache: ComputationCache::new(&config.cache),
        }
    }

    pub fn build(
        &self,
        input: &ValuationInput,
    ) -> AnalystResult<Arc<ComputationOutput<ValuationModelOutput>>> {
        let key = cache_key("valuation", input)?;
        self.cache
            .get_or_try_insert_with(key, || build_valuation_model(input))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
