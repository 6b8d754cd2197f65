use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AnalystError;
use crate::time_value::{irr, xirr, IrrSolution};
use crate::types::{with_metadata, CashFlow, ComputationOutput, Money, Multiple, Rate};
use crate::AnalystResult;

/// Input for a standalone returns calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsInput {
    /// Annual cash flows; index 0 is the initial investment (negative)
    pub cash_flows: Vec<Money>,
    /// Dated cash flows for XIRR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dated_cash_flows: Option<Vec<CashFlow>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsOutput {
    pub irr: Option<Rate>,
    pub xirr: Option<Rate>,
    /// Total returned ÷ total invested
    pub moic: Multiple,
    pub total_invested: Money,
    pub total_returned: Money,
    pub net_gain: Money,
    /// Years spanned by the cash flows (dates when given, else periods)
    pub holding_period_years: Decimal,
}

/// IRR, XIRR and MOIC for an arbitrary cash-flow series.
pub fn calculate_returns(input: &ReturnsInput) -> AnalystResult<ComputationOutput<ReturnsOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let dated: Option<Vec<(NaiveDate, Money)>> = input
        .dated_cash_flows
        .as_ref()
        .map(|flows| flows.iter().map(|cf| (cf.date, cf.amount)).collect());

    let amounts: Vec<Money> = if input.cash_flows.is_empty() {
        dated
            .as_ref()
            .map(|d| d.iter().map(|(_, a)| *a).collect())
            .unwrap_or_default()
    } else {
        input.cash_flows.clone()
    };
    if amounts.len() < 2 {
        return Err(AnalystError::insufficient("returns", 2, amounts.len()));
    }

    let total_invested: Money = amounts
        .iter()
        .filter(|cf| cf.is_sign_negative())
        .map(|cf| cf.abs())
        .sum();
    let total_returned: Money = amounts.iter().filter(|cf| **cf > Decimal::ZERO).sum();
    if total_invested.is_zero() {
        return Err(AnalystError::DivisionByZero {
            context: "MOIC: no invested capital in cash flows".into(),
        });
    }
    let moic = total_returned / total_invested;

    let irr_rate = if input.cash_flows.is_empty() {
        None
    } else {
        accept_irr("IRR", irr(&input.cash_flows), &mut warnings)
    };

    let (xirr_rate, holding_period_years) = match &dated {
        Some(d) if d.len() >= 2 => {
            let days = (d[d.len() - 1].0 - d[0].0).num_days();
            (
                accept_irr("XIRR", xirr(d), &mut warnings),
                Decimal::from(days) / dec!(365.25),
            )
        }
        Some(_) => {
            warnings.push("XIRR requires at least 2 dated cash flows".into());
            (None, Decimal::from(amounts.len() - 1))
        }
        None => (None, Decimal::from(amounts.len() - 1)),
    };

    if moic < Decimal::ONE {
        warnings.push(format!("MOIC of {moic:.2}x returns less than the capital invested"));
    }

    let output = ReturnsOutput {
        irr: irr_rate,
        xirr: xirr_rate,
        moic,
        total_invested,
        total_returned,
        net_gain: total_returned - total_invested,
        holding_period_years,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Returns: IRR, XIRR, MOIC",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Keep a solved rate, turning solver failures and edge-of-bracket roots
/// into warnings.
pub(crate) fn accept_irr(
    label: &str,
    solution: AnalystResult<IrrSolution>,
    warnings: &mut Vec<String>,
) -> Option<Rate> {
    match solution {
        Ok(s) => {
            if s.near_bracket_boundary {
                warnings.push(format!(
                    "{label} of {:.4} lies near the edge of the search bracket; treat with caution",
                    s.rate
                ));
            }
            Some(s.rate)
        }
        Err(e) => {
            warnings.push(format!("{label} not computed: {e}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moic_counts_interim_distributions() {
        let input = ReturnsInput {
            cash_flows: vec![dec!(-100), dec!(50), dec!(50), dec!(150)],
            dated_cash_flows: None,
        };
        let out = calculate_returns(&input).unwrap().result;
        assert_eq!(out.moic, dec!(2.5));
        assert_eq!(out.net_gain, dec!(150));
        assert_eq!(out.holding_period_years, dec!(3));
    }

    #[test]
    fn test_irr_of_level_annuity() {
        let input = ReturnsInput {
            cash_flows: vec![dec!(-1000), dec!(400), dec!(400), dec!(400)],
            dated_cash_flows: None,
        };
        let irr = calculate_returns(&input).unwrap().result.irr.unwrap();
        assert!((irr - dec!(0.0970)).abs() < dec!(0.0001), "irr = {irr}");
    }

    #[test]
    fn test_xirr_and_holding_period_from_dates() {
        let d = |y| NaiveDate::from_ymd_opt(y, 1, 1).unwrap();
        let input = ReturnsInput {
            cash_flows: vec![],
            dated_cash_flows: Some(vec![
                CashFlow { date: d(2020), amount: dec!(-1000), label: None },
                CashFlow { date: d(2025), amount: dec!(2000), label: Some("exit".into()) },
            ]),
        };
        let out = calculate_returns(&input).unwrap().result;
        assert!(out.irr.is_none());
        let x = out.xirr.unwrap();
        // 2^(1/5.0007) − 1
        assert!((x - dec!(0.1487)).abs() < dec!(0.001), "xirr = {x}");
        assert!((out.holding_period_years - dec!(5)).abs() < dec!(0.01));
    }

    #[test]
    fn test_loss_warns() {
        let input = ReturnsInput {
            cash_flows: vec![dec!(-100), dec!(60)],
            dated_cash_flows: None,
        };
        let out = calculate_returns(&input).unwrap();
        assert_eq!(out.result.moic, dec!(0.6));
        assert!(out.warnings.iter().any(|w| w.contains("MOIC")));
    }

    #[test]
    fn test_no_investment_is_error() {
        let input = ReturnsInput {
            cash_flows: vec![dec!(0), dec!(100)],
            dated_cash_flows: None,
        };
        assert!(matches!(
            calculate_returns(&input),
            Err(AnalystError::DivisionByZero { .. })
        ));
    }
}
