//! Monte Carlo evaluators that drive the DCF engine.

use std::time::Instant;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::MonteCarloConfig;
use crate::error::AnalystError;
use crate::types::{with_metadata_f64, ComputationOutput, Money, ScenarioCase};
use crate::valuation::dcf::{
    normalize_assumptions, validate_company, value_scenario, DcfAssumptions, ValuationInput,
};
use crate::AnalystResult;

use super::simulation::{run_simulation, CancellationToken, MonteCarloInput, Sample, SimulationResult};
use super::stress::{run_stress_test, StressScenario, StressTestInput, StressTestResult};

/// Assumption names a DCF trial may sample.
pub const DCF_VARIABLES: [&str; 7] = [
    "revenue_growth_rate",
    "ebit_margin",
    "ebitda_margin",
    "terminal_margin",
    "wacc",
    "terminal_growth_rate",
    "tax_rate",
];

/// Maps a sampled assumption vector onto a base valuation input and values
/// it as a single case.
#[derive(Debug, Clone)]
pub struct DcfTrialEvaluator {
    base: ValuationInput,
}

impl DcfTrialEvaluator {
    /// Fails on unknown variable names, and on an `ebitda_margin` draw when
    /// the base input pins an EBIT margin (the EBIT margin would win).
    pub fn new<'a>(
        base: &ValuationInput,
        names: impl IntoIterator<Item = &'a str>,
    ) -> AnalystResult<Self> {
        validate_company(base)?;
        for name in names {
            if !DCF_VARIABLES.contains(&name) {
                return Err(AnalystError::invalid(
                    "variables",
                    format!("'{name}' is not a DCF assumption; expected one of {DCF_VARIABLES:?}"),
                ));
            }
            if name == "ebitda_margin" && base.assumptions.ebit_margin.is_some() {
                return Err(AnalystError::invalid(
                    "variables",
                    "Cannot sample ebitda_margin while the base input sets ebit_margin",
                ));
            }
        }
        Ok(Self { base: base.clone() })
    }

    /// Current value of every samplable assumption, after margin
    /// resolution. Unset margins are omitted.
    pub fn base_sample(&self) -> AnalystResult<Sample> {
        let resolved = normalize_assumptions(&self.base.assumptions, &mut Vec::new());
        let a = &resolved;
        let mut sample = Sample::new();
        for (name, value) in [
            ("revenue_growth_rate", Some(a.revenue_growth_rate)),
            ("ebit_margin", a.ebit_margin),
            ("terminal_margin", a.terminal_margin),
            ("wacc", Some(a.wacc)),
            ("terminal_growth_rate", Some(a.terminal_growth_rate)),
            ("tax_rate", Some(a.tax_rate)),
        ] {
            if let Some(v) = value {
                sample.insert(name.to_string(), to_f64(name, v)?);
            }
        }
        Ok(sample)
    }

    pub fn evaluate(&self, sample: &Sample) -> AnalystResult<Sample> {
        let mut assumptions = self.base.assumptions.clone();
        for (name, value) in sample {
            apply(&mut assumptions, name, *value)?;
        }
        let resolved = normalize_assumptions(&assumptions, &mut Vec::new());
        let result = value_scenario(&self.base, &resolved, ScenarioCase::Base, &mut Vec::new())?;

        let mut outputs = Sample::new();
        outputs.insert("enterprise_value".into(), to_f64("enterprise_value", result.enterprise_value)?);
        outputs.insert("equity_value".into(), to_f64("equity_value", result.equity_value)?);
        outputs.insert("price_per_share".into(), to_f64("price_per_share", result.price_per_share)?);
        outputs.insert(
            "terminal_value_pct".into(),
            to_f64("terminal_value_pct", result.terminal_value_pct)?,
        );
        if let Some(price) = self.base.current_price {
            let upside = result.price_per_share / price - Decimal::ONE;
            outputs.insert("upside".into(), to_f64("upside", upside)?);
        }
        Ok(outputs)
    }
}

// ---------------------------------------------------------------------------
// DCF simulation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McDcfInput {
    pub valuation: ValuationInput,
    pub simulation: MonteCarloInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfSimulationResult {
    /// Deterministic per-share value at the base assumptions
    pub base_price_per_share: Money,
    /// Share of valid trials valued above the current price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability_undervalued: Option<f64>,
    pub simulation: SimulationResult,
}

/// Simulate the DCF per-share value under uncertain assumptions.
///
/// Draws that break a valuation precondition (WACC at or below terminal
/// growth) are skipped and reported in the warnings.
pub fn run_dcf_simulation(
    input: &McDcfInput,
    config: &MonteCarloConfig,
    cancel: Option<&CancellationToken>,
) -> AnalystResult<ComputationOutput<DcfSimulationResult>> {
    let start = Instant::now();
    tracing::debug!(
        symbol = %input.valuation.symbol,
        trials = input.simulation.trial_count,
        "running DCF simulation"
    );

    let evaluator = DcfTrialEvaluator::new(
        &input.valuation,
        input.simulation.variables.iter().map(|v| v.name.as_str()),
    )?;

    let mut warnings: Vec<String> = Vec::new();
    let resolved = normalize_assumptions(&input.valuation.assumptions, &mut warnings);
    let base = value_scenario(&input.valuation, &resolved, ScenarioCase::Base, &mut warnings)?;

    let simulated = run_simulation(&input.simulation, config, |s| evaluator.evaluate(s), cancel)?;
    warnings.extend(simulated.warnings);
    let simulation = simulated.result;

    let probability_undervalued = match input.valuation.current_price {
        Some(price) if !simulation.records.is_empty() => {
            let price = to_f64("current_price", price)?;
            let above = simulation
                .records
                .iter()
                .filter(|r| r.outputs.get("price_per_share").is_some_and(|v| *v > price))
                .count();
            Some(above as f64 / simulation.records.len() as f64)
        }
        _ => None,
    };

    let result = DcfSimulationResult {
        base_price_per_share: base.price_per_share,
        probability_undervalued,
        simulation,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo DCF: sampled assumptions valued through the FCFF model",
        input,
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// DCF stress test
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfStressInput {
    pub valuation: ValuationInput,
    pub scenarios: Vec<StressScenario>,
}

/// Shock the base DCF assumptions with each named scenario.
pub fn run_dcf_stress_test(input: &DcfStressInput) -> AnalystResult<ComputationOutput<StressTestResult>> {
    let names = input
        .scenarios
        .iter()
        .flat_map(|s| s.shocks.keys().map(String::as_str));
    let evaluator = DcfTrialEvaluator::new(&input.valuation, names)?;
    let stress = StressTestInput {
        base: evaluator.base_sample()?,
        scenarios: input.scenarios.clone(),
    };
    run_stress_test(&stress, |s| evaluator.evaluate(s))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn apply(a: &mut DcfAssumptions, name: &str, value: f64) -> AnalystResult<()> {
    let d = Decimal::from_f64(value)
        .ok_or_else(|| AnalystError::invalid(name, format!("Sampled value {value} is not representable")))?;
    match name {
        "revenue_growth_rate" => a.revenue_growth_rate = d,
        "ebit_margin" => a.ebit_margin = Some(d),
        "ebitda_margin" => a.ebitda_margin = Some(d),
        "terminal_margin" => a.terminal_margin = Some(d),
        "wacc" => a.wacc = d,
        "terminal_growth_rate" => a.terminal_growth_rate = d,
        "tax_rate" => a.tax_rate = d,
        other => {
            return Err(AnalystError::invalid(
                "variables",
                format!("'{other}' is not a DCF assumption"),
            ))
        }
    }
    Ok(())
}

fn to_f64(name: &str, value: Decimal) -> AnalystResult<f64> {
    value
        .to_f64()
        .ok_or_else(|| AnalystError::invalid(name, format!("{value} does not fit in f64")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monte_carlo::distribution::McDistribution;
    use crate::monte_carlo::simulation::McVariable;
    use crate::valuation::dcf::ReinvestmentModel;
    use crate::valuation::calculate_dcf;
    use rust_decimal_macros::dec;

    fn valuation() -> ValuationInput {
        ValuationInput {
            symbol: "SIM".into(),
            current_revenue: dec!(1000),
            current_price: Some(dec!(20)),
            shares_outstanding: dec!(100),
            total_debt: dec!(200),
            cash: dec!(50),
            minority_interest: None,
            currency: Default::default(),
            assumptions: DcfAssumptions {
                revenue_growth_rate: dec!(0.05),
                ebit_margin: Some(dec!(0.2)),
                ebitda_margin: None,
                terminal_margin: None,
                wacc: dec!(0.09),
                terminal_growth_rate: dec!(0.025),
                tax_rate: dec!(0.25),
                projection_years: 5,
                reinvestment: ReinvestmentModel::default(),
                mid_year_convention: None,
            },
            scenario_shifts: None,
            sensitivity: None,
        }
    }

    fn variable(name: &str, distribution: McDistribution) -> McVariable {
        McVariable {
            name: name.into(),
            distribution,
        }
    }

    #[test]
    fn test_evaluator_matches_deterministic_dcf() {
        let v = valuation();
        let evaluator = DcfTrialEvaluator::new(&v, ["wacc"]).unwrap();
        let out = evaluator
            .evaluate(&Sample::from([("wacc".to_string(), 0.09)]))
            .unwrap();
        let direct = calculate_dcf(&v).unwrap().result;
        let expected = direct.price_per_share.to_f64().unwrap();
        assert!((out["price_per_share"] - expected).abs() < 1e-6);
        assert!(out.contains_key("upside"));
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let err = DcfTrialEvaluator::new(&valuation(), ["beta"]).unwrap_err();
        assert!(matches!(err, AnalystError::InvalidInput { .. }));
        assert!(DcfTrialEvaluator::new(&valuation(), ["ebitda_margin"]).is_err());
    }

    #[test]
    fn test_wacc_below_growth_is_domain_error() {
        let evaluator = DcfTrialEvaluator::new(&valuation(), ["wacc"]).unwrap();
        let err = evaluator
            .evaluate(&Sample::from([("wacc".to_string(), 0.02)]))
            .unwrap_err();
        assert!(err.is_domain());
    }

    #[test]
    fn test_dcf_simulation_skips_invalid_draws() {
        let input = McDcfInput {
            valuation: valuation(),
            simulation: MonteCarloInput {
                variables: vec![
                    variable("wacc", McDistribution::Uniform { min: 0.015, max: 0.12 }),
                    variable(
                        "revenue_growth_rate",
                        McDistribution::Triangular { min: 0.0, mode: 0.05, max: 0.1 },
                    ),
                ],
                trial_count: 500,
                correlation_matrix: None,
                seed: Some(9),
                confidence_level: None,
                quantiles: None,
            },
        };
        let out = run_dcf_simulation(&input, &MonteCarloConfig::default(), None).unwrap();
        let r = &out.result;
        // wacc ≤ 2.5% in about 10 / 105 of draws
        assert!(r.simulation.skipped_trials > 0);
        assert_eq!(r.simulation.valid_trials + r.simulation.skipped_trials, 500);
        let p = r.probability_undervalued.unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert!(r.simulation.outputs.contains_key("price_per_share"));
        assert!(r.base_price_per_share > Decimal::ZERO);
    }

    #[test]
    fn test_base_sample_resolves_margin() {
        let mut v = valuation();
        v.assumptions.ebit_margin = None;
        v.assumptions.ebitda_margin = Some(dec!(0.30));
        let evaluator = DcfTrialEvaluator::new(&v, []).unwrap();
        let base = evaluator.base_sample().unwrap();
        // default reinvestment depreciates 4% of sales
        assert!((base["ebit_margin"] - 0.26).abs() < 1e-12);
        assert!(!base.contains_key("ebitda_margin"));
    }
}
