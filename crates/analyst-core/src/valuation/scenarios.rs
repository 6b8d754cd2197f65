use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Rate, ScenarioCase};
use crate::AnalystResult;

use super::dcf::{value_scenario, DcfAssumptions, ScenarioResult, ValuationInput};

/// Minimum spread kept between the bull-case WACC and terminal growth.
const MIN_BULL_WACC_SPREAD: Rate = dec!(0.005);

/// Perturbation sizes for the bull and bear cases. The bull case adds the
/// growth and margin shifts and subtracts the discount-rate shift; the bear
/// case does the opposite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioShifts {
    /// Revenue growth shift (default: 0.02)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth: Option<Rate>,
    /// Operating margin shift (default: 0.015)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Rate>,
    /// WACC shift (default: 0.015)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
}

impl ScenarioShifts {
    fn resolved(&self) -> (Rate, Rate, Rate) {
        (
            self.growth.unwrap_or(dec!(0.02)),
            self.margin.unwrap_or(dec!(0.015)),
            self.discount_rate.unwrap_or(dec!(0.015)),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfScenarios {
    pub bull: ScenarioResult,
    pub bear: ScenarioResult,
}

/// Derive the assumption set for `case` from the normalised base case.
/// Base is returned unchanged.
pub fn scenario_assumptions(
    base: &DcfAssumptions,
    shifts: &ScenarioShifts,
    case: ScenarioCase,
    warnings: &mut Vec<String>,
) -> DcfAssumptions {
    let direction = match case {
        ScenarioCase::Bull | ScenarioCase::Upside => Decimal::ONE,
        ScenarioCase::Bear | ScenarioCase::Downside => dec!(-1),
        ScenarioCase::Base => return base.clone(),
    };
    let (growth, margin, discount) = shifts.resolved();

    let mut shifted = base.clone();
    shifted.revenue_growth_rate += direction * growth;
    shifted.ebit_margin = base.ebit_margin.map(|m| m + direction * margin);
    shifted.terminal_margin = base.terminal_margin.map(|m| m + direction * margin);

    let mut wacc = base.wacc - direction * discount;
    // never below the base WACC when the base already sits inside the spread
    let floor = (base.terminal_growth_rate + MIN_BULL_WACC_SPREAD).min(base.wacc);
    if wacc < floor {
        warnings.push(format!(
            "[{case}] WACC shift would breach terminal growth; WACC held at {floor}"
        ));
        wacc = floor;
    }
    shifted.wacc = wacc;
    shifted
}

/// Value the bull and bear cases and check they bracket the base case.
pub fn build_scenarios(
    input: &ValuationInput,
    base_assumptions: &DcfAssumptions,
    base: &ScenarioResult,
    warnings: &mut Vec<String>,
) -> AnalystResult<DcfScenarios> {
    let shifts = input.scenario_shifts.clone().unwrap_or_default();

    let bull_assumptions =
        scenario_assumptions(base_assumptions, &shifts, ScenarioCase::Bull, warnings);
    let bull = value_scenario(input, &bull_assumptions, ScenarioCase::Bull, warnings)?;

    let bear_assumptions =
        scenario_assumptions(base_assumptions, &shifts, ScenarioCase::Bear, warnings);
    let bear = value_scenario(input, &bear_assumptions, ScenarioCase::Bear, warnings)?;

    if !(bull.price_per_share >= base.price_per_share
        && base.price_per_share >= bear.price_per_share)
    {
        tracing::warn!(
            symbol = %input.symbol,
            bull = %bull.price_per_share,
            base = %base.price_per_share,
            bear = %bear.price_per_share,
            "scenario ordering violated"
        );
        warnings.push(format!(
            "Scenario ordering violated: bull {:.2}, base {:.2}, bear {:.2} per share; check the sign of the perturbations",
            bull.price_per_share, base.price_per_share, bear.price_per_share
        ));
    }

    Ok(DcfScenarios { bull, bear })
}
