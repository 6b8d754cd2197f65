use napi::Result as NapiResult;
use napi_derive::napi;

use analyst_core::config::EngineConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn build_dcf_model(input_json: String) -> NapiResult<String> {
    let input: analyst_core::valuation::ValuationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        analyst_core::valuation::build_valuation_model(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn quick_valuation(input_json: String) -> NapiResult<String> {
    let input: analyst_core::quick::QuickModel =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = analyst_core::quick::evaluate_quick_model(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Leveraged buyouts
// ---------------------------------------------------------------------------

#[napi]
pub fn build_lbo_model(input_json: String) -> NapiResult<String> {
    let input: analyst_core::lbo::LboInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = analyst_core::lbo::build_lbo_model(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_returns(input_json: String) -> NapiResult<String> {
    let input: analyst_core::lbo::ReturnsInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = analyst_core::lbo::calculate_returns(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Monte Carlo
// ---------------------------------------------------------------------------

#[napi]
pub fn monte_carlo_simulation(input_json: String) -> NapiResult<String> {
    let input: analyst_core::monte_carlo::MonteCarloInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config = EngineConfig::default();
    let output =
        analyst_core::monte_carlo::run_monte_carlo_simulation(&input, &config.monte_carlo)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn monte_carlo_dcf(input_json: String) -> NapiResult<String> {
    let input: analyst_core::monte_carlo::evaluators::McDcfInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config = EngineConfig::default();
    let output =
        analyst_core::monte_carlo::evaluators::run_dcf_simulation(&input, &config.monte_carlo, None)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn dcf_stress_test(input_json: String) -> NapiResult<String> {
    let input: analyst_core::monte_carlo::evaluators::DcfStressInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        analyst_core::monte_carlo::evaluators::run_dcf_stress_test(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Run one hypothesis test. `alpha` defaults to 0.05.
#[napi]
pub fn statistical_test(input_json: String, alpha: Option<f64>) -> NapiResult<String> {
    let input: analyst_core::statistics::StatTestRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let alpha = alpha.unwrap_or(EngineConfig::default().significance_level);
    let output = analyst_core::statistics::run_test(&input, alpha).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
