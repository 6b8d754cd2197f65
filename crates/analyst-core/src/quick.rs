//! Back-of-the-envelope calculators.
//!
//! Each kind is a variant of [`QuickModel`]; [`evaluate_quick_model`]
//! matches on it exhaustively, so a new kind cannot be added without an
//! implementation.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AnalystError;
use crate::lbo::returns::accept_irr;
use crate::time_value::irr;
use crate::types::{with_metadata, ComputationOutput, ModelType, Money, Multiple, Rate};
use crate::valuation::calculate_terminal_value;
use crate::AnalystResult;

/// Longest horizon accepted for the quick DCF and quick LBO.
const MAX_QUICK_YEARS: u32 = 50;

fn default_years() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum QuickModel {
    /// Growing free cash flow stream plus a Gordon terminal value
    Dcf {
        free_cash_flow: Money,
        growth_rate: Rate,
        discount_rate: Rate,
        terminal_growth_rate: Rate,
        #[serde(default = "default_years")]
        years: u32,
        #[serde(default)]
        net_debt: Money,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shares_outstanding: Option<Decimal>,
    },
    /// Median peer multiple applied to the target's metric
    Comps {
        metric_value: Money,
        peer_multiples: Vec<Multiple>,
        #[serde(default)]
        net_debt: Money,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shares_outstanding: Option<Decimal>,
    },
    /// Earnings power value: no-growth perpetuity of after-tax EBIT
    Epv {
        ebit: Money,
        tax_rate: Rate,
        wacc: Rate,
        #[serde(default)]
        net_debt: Money,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shares_outstanding: Option<Decimal>,
    },
    /// Entry/exit multiple arbitrage with no debt paydown
    Lbo {
        ebitda: Money,
        entry_multiple: Multiple,
        exit_multiple: Multiple,
        /// Debt ÷ EBITDA at entry
        leverage_multiple: Multiple,
        ebitda_growth_rate: Rate,
        #[serde(default = "default_years")]
        hold_period_years: u32,
    },
}

impl QuickModel {
    pub fn model_type(&self) -> ModelType {
        match self {
            QuickModel::Dcf { .. } => ModelType::Dcf,
            QuickModel::Comps { .. } => ModelType::Comps,
            QuickModel::Epv { .. } => ModelType::Epv,
            QuickModel::Lbo { .. } => ModelType::Lbo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickValuation {
    pub model_type: ModelType,
    pub enterprise_value: Money,
    pub equity_value: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_per_share: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moic: Option<Multiple>,
}

pub fn evaluate_quick_model(model: &QuickModel) -> AnalystResult<ComputationOutput<QuickValuation>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (methodology, valuation) = match model {
        QuickModel::Dcf {
            free_cash_flow,
            growth_rate,
            discount_rate,
            terminal_growth_rate,
            years,
            net_debt,
            shares_outstanding,
        } => {
            if *years == 0 || *years > MAX_QUICK_YEARS {
                return Err(AnalystError::invalid(
                    "years",
                    format!("Must be between 1 and {MAX_QUICK_YEARS}"),
                ));
            }
            if *discount_rate <= dec!(-1) || *growth_rate <= dec!(-1) {
                return Err(AnalystError::invalid("discount_rate", "Rates must exceed -100%"));
            }
            let one_plus_r = Decimal::ONE + discount_rate;
            let mut fcf = *free_cash_flow;
            let mut pv = Decimal::ZERO;
            for t in 1..=*years {
                fcf = fcf
                    .checked_mul(Decimal::ONE + growth_rate)
                    .ok_or_else(|| AnalystError::overflow("Quick DCF cash flow"))?;
                pv = discount(fcf, one_plus_r, t)
                    .and_then(|v| pv.checked_add(v))
                    .ok_or_else(|| AnalystError::overflow("Quick DCF present value"))?;
            }
            let tv = calculate_terminal_value(fcf, *terminal_growth_rate, *discount_rate)?;
            let ev = discount(tv, one_plus_r, *years)
                .and_then(|pv_tv| pv.checked_add(pv_tv))
                .ok_or_else(|| AnalystError::overflow("Quick DCF enterprise value"))?;
            (
                "Quick DCF: growing FCF with Gordon terminal value",
                equity_result(ModelType::Dcf, ev, *net_debt, *shares_outstanding)?,
            )
        }
        QuickModel::Comps {
            metric_value,
            peer_multiples,
            net_debt,
            shares_outstanding,
        } => {
            let median = median_multiple(peer_multiples)?;
            let ev = metric_value
                .checked_mul(median)
                .ok_or_else(|| AnalystError::overflow("Comparables enterprise value"))?;
            if peer_multiples.len() < 3 {
                warnings.push(format!(
                    "Only {} peer multiple(s); the median is not robust",
                    peer_multiples.len()
                ));
            }
            (
                "Quick comparables: median peer multiple",
                equity_result(ModelType::Comps, ev, *net_debt, *shares_outstanding)?,
            )
        }
        QuickModel::Epv {
            ebit,
            tax_rate,
            wacc,
            net_debt,
            shares_outstanding,
        } => {
            if *wacc <= Decimal::ZERO {
                return Err(AnalystError::Domain(format!(
                    "WACC must be positive for a perpetuity, got {wacc}"
                )));
            }
            let ev = ebit
                .checked_mul(Decimal::ONE - tax_rate)
                .and_then(|nopat| nopat.checked_div(*wacc))
                .ok_or_else(|| AnalystError::overflow("Earnings power value"))?;
            (
                "Earnings power value: EBIT(1-t) / WACC",
                equity_result(ModelType::Epv, ev, *net_debt, *shares_outstanding)?,
            )
        }
        QuickModel::Lbo {
            ebitda,
            entry_multiple,
            exit_multiple,
            leverage_multiple,
            ebitda_growth_rate,
            hold_period_years,
        } => {
            if *ebitda <= Decimal::ZERO {
                return Err(AnalystError::invalid("ebitda", "EBITDA must be positive"));
            }
            if *hold_period_years == 0 || *hold_period_years > MAX_QUICK_YEARS {
                return Err(AnalystError::invalid(
                    "hold_period_years",
                    format!("Must be between 1 and {MAX_QUICK_YEARS}"),
                ));
            }
            let overflow = || AnalystError::overflow("Quick LBO");
            let entry_ev = ebitda.checked_mul(*entry_multiple).ok_or_else(overflow)?;
            let debt = ebitda.checked_mul(*leverage_multiple).ok_or_else(overflow)?;
            let equity = entry_ev.checked_sub(debt).ok_or_else(overflow)?;
            if equity <= Decimal::ZERO {
                return Err(AnalystError::Domain(format!(
                    "Leverage of {leverage_multiple}x covers the {entry_multiple}x entry multiple; equity must be positive"
                )));
            }
            let exit_ev = (Decimal::ONE + ebitda_growth_rate)
                .checked_powu(*hold_period_years as u64)
                .and_then(|g| ebitda.checked_mul(g))
                .and_then(|exit_ebitda| exit_ebitda.checked_mul(*exit_multiple))
                .ok_or_else(overflow)?;
            let exit_equity = exit_ev.checked_sub(debt).ok_or_else(overflow)?;
            let moic = exit_equity
                .max(Decimal::ZERO)
                .checked_div(equity)
                .ok_or_else(overflow)?;

            let irr_rate = if exit_equity > Decimal::ZERO {
                let mut flows = vec![Decimal::ZERO; *hold_period_years as usize + 1];
                flows[0] = -equity;
                flows[*hold_period_years as usize] = exit_equity;
                accept_irr("IRR", irr(&flows), &mut warnings)
            } else {
                warnings.push("Exit equity is wiped out; IRR is undefined".into());
                None
            };

            (
                "Quick LBO: multiple arbitrage and EBITDA growth, no paydown",
                QuickValuation {
                    model_type: ModelType::Lbo,
                    enterprise_value: exit_ev,
                    equity_value: exit_equity,
                    value_per_share: None,
                    irr: irr_rate,
                    moic: Some(moic),
                },
            )
        }
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(methodology, model, warnings, elapsed, valuation))
}

fn equity_result(
    model_type: ModelType,
    enterprise_value: Money,
    net_debt: Money,
    shares: Option<Decimal>,
) -> AnalystResult<QuickValuation> {
    let equity_value = enterprise_value
        .checked_sub(net_debt)
        .ok_or_else(|| AnalystError::overflow("Equity value"))?;
    let value_per_share = match shares {
        Some(s) if s <= Decimal::ZERO => {
            return Err(AnalystError::Domain(format!(
                "Shares outstanding must be positive, got {s}"
            )))
        }
        Some(s) => Some(equity_value / s.max(Decimal::ONE)),
        None => None,
    };
    Ok(QuickValuation {
        model_type,
        enterprise_value,
        equity_value,
        value_per_share,
        irr: None,
        moic: None,
    })
}

fn median_multiple(multiples: &[Multiple]) -> AnalystResult<Multiple> {
    if multiples.is_empty() {
        return Err(AnalystError::insufficient("comparables median", 1, 0));
    }
    let mut sorted = multiples.to_vec();
    sorted.sort();
    let count = sorted.len();
    Ok(if count % 2 == 0 {
        sorted[count / 2 - 1] / dec!(2) + sorted[count / 2] / dec!(2)
    } else {
        sorted[count / 2]
    })
}

/// `value / (1 + r)^t`, or `None` outside the Decimal range.
fn discount(value: Money, one_plus_r: Decimal, t: u32) -> Option<Money> {
    one_plus_r
        .checked_powu(t as u64)
        .and_then(|factor| value.checked_div(factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_dcf_matches_manual() {
        let model = QuickModel::Dcf {
            free_cash_flow: dec!(100),
            growth_rate: dec!(0),
            discount_rate: dec!(0.10),
            terminal_growth_rate: dec!(0),
            years: 1,
            net_debt: dec!(0),
            shares_outstanding: None,
        };
        let v = evaluate_quick_model(&model).unwrap().result;
        // 100/1.1 + (100/0.1)/1.1 = 1100/1.1 = 1000
        assert!((v.enterprise_value - dec!(1000)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_quick_dcf_domain_error() {
        let model = QuickModel::Dcf {
            free_cash_flow: dec!(100),
            growth_rate: dec!(0.05),
            discount_rate: dec!(0.02),
            terminal_growth_rate: dec!(0.025),
            years: 5,
            net_debt: dec!(0),
            shares_outstanding: None,
        };
        assert!(matches!(
            evaluate_quick_model(&model),
            Err(AnalystError::Domain(_))
        ));
    }

    #[test]
    fn test_quick_comps_uses_median() {
        let model = QuickModel::Comps {
            metric_value: dec!(50),
            peer_multiples: vec![dec!(8), dec!(12), dec!(10), dec!(30)],
            net_debt: dec!(100),
            shares_outstanding: Some(dec!(10)),
        };
        let v = evaluate_quick_model(&model).unwrap().result;
        assert_eq!(v.enterprise_value, dec!(550));
        assert_eq!(v.equity_value, dec!(450));
        assert_eq!(v.value_per_share, Some(dec!(45)));
        assert_eq!(v.model_type, ModelType::Comps);
    }

    #[test]
    fn test_quick_epv() {
        let model = QuickModel::Epv {
            ebit: dec!(200),
            tax_rate: dec!(0.25),
            wacc: dec!(0.10),
            net_debt: dec!(500),
            shares_outstanding: None,
        };
        let v = evaluate_quick_model(&model).unwrap().result;
        assert_eq!(v.enterprise_value, dec!(1500));
        assert_eq!(v.equity_value, dec!(1000));
    }

    #[test]
    fn test_quick_lbo_returns() {
        let model = QuickModel::Lbo {
            ebitda: dec!(100),
            entry_multiple: dec!(10),
            exit_multiple: dec!(10),
            leverage_multiple: dec!(5),
            ebitda_growth_rate: dec!(0),
            hold_period_years: 5,
        };
        let v = evaluate_quick_model(&model).unwrap().result;
        assert_eq!(v.moic, Some(dec!(1)));
        let irr = v.irr.unwrap();
        assert!(irr.abs() < dec!(0.000001), "irr = {irr}");
    }

    #[test]
    fn test_horizons_are_capped() {
        let dcf = QuickModel::Dcf {
            free_cash_flow: dec!(100),
            growth_rate: dec!(0.05),
            discount_rate: dec!(0.10),
            terminal_growth_rate: dec!(0.02),
            years: MAX_QUICK_YEARS + 1,
            net_debt: dec!(0),
            shares_outstanding: None,
        };
        assert!(matches!(
            evaluate_quick_model(&dcf),
            Err(AnalystError::InvalidInput { field, .. }) if field == "years"
        ));

        let lbo = QuickModel::Lbo {
            ebitda: dec!(100),
            entry_multiple: dec!(10),
            exit_multiple: dec!(10),
            leverage_multiple: dec!(5),
            ebitda_growth_rate: dec!(0),
            hold_period_years: 1000,
        };
        assert!(matches!(
            evaluate_quick_model(&lbo),
            Err(AnalystError::InvalidInput { field, .. }) if field == "hold_period_years"
        ));
    }

    #[test]
    fn test_overflowing_quick_models_return_errors() {
        let lbo = QuickModel::Lbo {
            ebitda: dec!(100),
            entry_multiple: dec!(10),
            exit_multiple: dec!(10),
            leverage_multiple: dec!(5),
            ebitda_growth_rate: dec!(10),
            hold_period_years: 50,
        };
        assert!(evaluate_quick_model(&lbo).unwrap_err().is_domain());

        let dcf = QuickModel::Dcf {
            free_cash_flow: dec!(100),
            growth_rate: dec!(5),
            discount_rate: dec!(0.10),
            terminal_growth_rate: dec!(0.02),
            years: 50,
            net_debt: dec!(0),
            shares_outstanding: None,
        };
        assert!(evaluate_quick_model(&dcf).unwrap_err().is_domain());

        let epv = QuickModel::Epv {
            ebit: Decimal::MAX,
            tax_rate: dec!(0),
            wacc: dec!(0.5),
            net_debt: dec!(0),
            shares_outstanding: None,
        };
        assert!(evaluate_quick_model(&epv).unwrap_err().is_domain());
    }

    #[test]
    fn test_tagged_deserialisation() {
        let json = r#"{"model":"epv","ebit":"10","tax_rate":"0.2","wacc":"0.08"}"#;
        let model: QuickModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.model_type(), ModelType::Epv);
    }
}
