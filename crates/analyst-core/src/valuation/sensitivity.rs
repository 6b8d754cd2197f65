use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AnalystError;
use crate::types::{Money, Rate, ScenarioCase};
use crate::AnalystResult;

use super::dcf::{value_scenario, DcfAssumptions, ValuationInput};

const MIN_POINTS: usize = 5;
const MAX_POINTS: usize = 7;

/// Assumption swept by the one-dimensional sensitivity analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityVariable {
    Wacc,
    RevenueGrowthRate,
    TerminalGrowthRate,
}

impl SensitivityVariable {
    pub const ALL: [SensitivityVariable; 3] = [
        SensitivityVariable::Wacc,
        SensitivityVariable::RevenueGrowthRate,
        SensitivityVariable::TerminalGrowthRate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SensitivityVariable::Wacc => "wacc",
            SensitivityVariable::RevenueGrowthRate => "revenue_growth_rate",
            SensitivityVariable::TerminalGrowthRate => "terminal_growth_rate",
        }
    }

    fn get(&self, a: &DcfAssumptions) -> Rate {
        match self {
            SensitivityVariable::Wacc => a.wacc,
            SensitivityVariable::RevenueGrowthRate => a.revenue_growth_rate,
            SensitivityVariable::TerminalGrowthRate => a.terminal_growth_rate,
        }
    }

    /// True when `e` rejects this variable's own value.
    fn rejects(&self, e: &AnalystError) -> bool {
        matches!(e, AnalystError::InvalidInput { field, .. } if field == self.name())
    }

    fn set(&self, a: &mut DcfAssumptions, value: Rate) {
        match self {
            SensitivityVariable::Wacc => a.wacc = value,
            SensitivityVariable::RevenueGrowthRate => a.revenue_growth_rate = value,
            SensitivityVariable::TerminalGrowthRate => a.terminal_growth_rate = value,
        }
    }
}

/// Sweep configuration. Points are evenly spaced and centred on the base
/// value of each variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensitivitySettings {
    /// Points per variable, 5 to 7 (default: 5)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<usize>,
    /// WACC step (default: 0.005)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wacc_step: Option<Rate>,
    /// Revenue growth step (default: 0.01)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_step: Option<Rate>,
    /// Terminal growth step (default: 0.0025)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_growth_step: Option<Rate>,
}

impl SensitivitySettings {
    fn step(&self, variable: SensitivityVariable) -> Rate {
        match variable {
            SensitivityVariable::Wacc => self.wacc_step.unwrap_or(dec!(0.005)),
            SensitivityVariable::RevenueGrowthRate => self.growth_step.unwrap_or(dec!(0.01)),
            SensitivityVariable::TerminalGrowthRate => {
                self.terminal_growth_step.unwrap_or(dec!(0.0025))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub value: Rate,
    pub price_per_share: Money,
}

/// Variable name → points in ascending order of the swept value.
pub type SensitivityGrid = BTreeMap<String, Vec<SensitivityPoint>>;

/// The swept values for one variable.
pub fn sweep_values(base: Rate, step: Rate, points: usize) -> Vec<Rate> {
    let centre = Decimal::from(points - 1) / dec!(2);
    (0..points)
        .map(|i| base + (Decimal::from(i) - centre) * step)
        .collect()
}

/// Recompute the per-share value across each variable's sweep, holding the
/// other assumptions at the base case. Points that leave the variable's
/// valid range (WACC at or below zero or terminal growth, growth at or
/// below -100%) are dropped with a warning; any other failure aborts the
/// sweep.
pub fn build_sensitivity_grid(
    input: &ValuationInput,
    base: &DcfAssumptions,
    warnings: &mut Vec<String>,
) -> AnalystResult<SensitivityGrid> {
    let settings = input.sensitivity.clone().unwrap_or_default();
    let points = settings.points.unwrap_or(MIN_POINTS);
    if !(MIN_POINTS..=MAX_POINTS).contains(&points) {
        return Err(AnalystError::invalid(
            "sensitivity.points",
            format!("Must be between {MIN_POINTS} and {MAX_POINTS}"),
        ));
    }

    let mut grid = SensitivityGrid::new();
    for variable in SensitivityVariable::ALL {
        let step = settings.step(variable);
        if step <= Decimal::ZERO {
            return Err(AnalystError::invalid(
                "sensitivity.step",
                format!("Step for {} must be positive", variable.name()),
            ));
        }

        let mut row = Vec::with_capacity(points);
        // Per-point warnings (e.g. terminal value share) would repeat the
        // base case's; only skips are reported.
        let mut scratch = Vec::new();
        for value in sweep_values(variable.get(base), step, points) {
            let mut assumptions = base.clone();
            variable.set(&mut assumptions, value);
            match value_scenario(input, &assumptions, ScenarioCase::Base, &mut scratch) {
                Ok(r) => row.push(SensitivityPoint {
                    value,
                    price_per_share: r.price_per_share,
                }),
                Err(e) if e.is_domain() || variable.rejects(&e) => {
                    warnings.push(format!(
                        "Sensitivity {} = {value} skipped: {e}",
                        variable.name()
                    ));
                }
                Err(e) => return Err(e),
            }
        }

        check_direction(variable, &row, warnings);
        grid.insert(variable.name().to_string(), row);
    }

    Ok(grid)
}

/// Value should fall as WACC rises and rise with terminal growth. Revenue
/// growth has no fixed direction when FCF margins are negative.
fn check_direction(
    variable: SensitivityVariable,
    row: &[SensitivityPoint],
    warnings: &mut Vec<String>,
) {
    let ok = match variable {
        SensitivityVariable::Wacc => row
            .windows(2)
            .all(|w| w[1].price_per_share <= w[0].price_per_share),
        SensitivityVariable::TerminalGrowthRate => row
            .windows(2)
            .all(|w| w[1].price_per_share >= w[0].price_per_share),
        SensitivityVariable::RevenueGrowthRate => true,
    };
    if !ok {
        warnings.push(format!(
            "Sensitivity of value to {} is not monotonic; terminal cash flow may be negative",
            variable.name()
        ));
    }
}
