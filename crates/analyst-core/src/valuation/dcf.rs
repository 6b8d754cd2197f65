use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AnalystError;
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Rate, ScenarioCase};
use crate::AnalystResult;

/// Operating margin assumed when the input supplies neither an EBIT nor an
/// EBITDA margin.
pub const DEFAULT_OPERATING_MARGIN: Rate = dec!(0.20);

/// Terminal value share of enterprise value above which a warning is raised.
pub const TERMINAL_VALUE_WARNING_PCT: Rate = dec!(0.80);

const MAX_PROJECTION_YEARS: u32 = 50;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How reinvestment is derived from the revenue path. Both variants feed the
/// same projection; only the reinvestment line differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ReinvestmentModel {
    /// Reinvestment = Δrevenue / sales_to_capital
    SalesToCapital { ratio: Decimal },
    /// Reinvestment = capex + ΔNWC − depreciation. Capex and depreciation
    /// are percentages of revenue; NWC is held at `nwc_pct` of revenue.
    PercentOfSales {
        capex_pct: Rate,
        depreciation_pct: Rate,
        nwc_pct: Rate,
    },
}

impl Default for ReinvestmentModel {
    fn default() -> Self {
        ReinvestmentModel::PercentOfSales {
            capex_pct: dec!(0.05),
            depreciation_pct: dec!(0.04),
            nwc_pct: dec!(0.05),
        }
    }
}

/// One period's reinvestment split.
#[derive(Debug, Clone, Copy)]
struct Reinvestment {
    depreciation: Money,
    capex: Money,
    nwc_change: Money,
}

impl Reinvestment {
    fn net(&self) -> Money {
        self.capex + self.nwc_change - self.depreciation
    }
}

impl ReinvestmentModel {
    /// `None` when the split leaves the Decimal range.
    fn for_period(&self, revenue: Money, prior_revenue: Money) -> Option<Reinvestment> {
        let reinvestment = match self {
            ReinvestmentModel::SalesToCapital { ratio } => Reinvestment {
                depreciation: Decimal::ZERO,
                capex: (revenue - prior_revenue).checked_div(*ratio)?,
                nwc_change: Decimal::ZERO,
            },
            ReinvestmentModel::PercentOfSales {
                capex_pct,
                depreciation_pct,
                nwc_pct,
            } => Reinvestment {
                depreciation: revenue * depreciation_pct,
                capex: revenue * capex_pct,
                nwc_change: (revenue - prior_revenue) * nwc_pct,
            },
        };
        Some(reinvestment)
    }

    fn validate(&self) -> AnalystResult<()> {
        match self {
            ReinvestmentModel::SalesToCapital { ratio } => {
                if *ratio <= Decimal::ZERO {
                    return Err(AnalystError::invalid(
                        "reinvestment.ratio",
                        "Sales-to-capital ratio must be positive",
                    ));
                }
            }
            ReinvestmentModel::PercentOfSales {
                capex_pct,
                depreciation_pct,
                nwc_pct,
            } => {
                for (field, v) in [
                    ("reinvestment.capex_pct", capex_pct),
                    ("reinvestment.depreciation_pct", depreciation_pct),
                    ("reinvestment.nwc_pct", nwc_pct),
                ] {
                    if *v < Decimal::ZERO || *v >= Decimal::ONE {
                        return Err(AnalystError::invalid(field, "Must be in [0, 1)"));
                    }
                }
            }
        }
        Ok(())
    }
}

fn default_projection_years() -> u32 {
    5
}

/// Operating and discounting assumptions for one DCF case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfAssumptions {
    /// Revenue growth applied every projection period
    pub revenue_growth_rate: Rate,
    /// EBIT margin as a fraction of revenue (takes precedence over EBITDA margin)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebit_margin: Option<Rate>,
    /// EBITDA margin; converted to an EBIT margin by subtracting depreciation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebitda_margin: Option<Rate>,
    /// Margin reached in the final period, glided to linearly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_margin: Option<Rate>,
    /// Weighted average cost of capital (discount rate)
    pub wacc: Rate,
    /// Perpetuity growth rate for the Gordon growth terminal value
    pub terminal_growth_rate: Rate,
    /// Marginal tax rate on operating income
    pub tax_rate: Rate,
    #[serde(default = "default_projection_years")]
    pub projection_years: u32,
    #[serde(default)]
    pub reinvestment: ReinvestmentModel,
    /// Discount cash flows at mid-period (default: false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid_year_convention: Option<bool>,
}

/// Company-level inputs for a DCF valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationInput {
    pub symbol: String,
    /// Latest annual revenue (period 0)
    pub current_revenue: Money,
    /// Market price per share, used for the recommendation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Money>,
    /// Diluted shares outstanding
    pub shares_outstanding: Decimal,
    #[serde(default)]
    pub total_debt: Money,
    #[serde(default)]
    pub cash: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minority_interest: Option<Money>,
    #[serde(default)]
    pub currency: Currency,
    pub assumptions: DcfAssumptions,
    /// Bull/bear perturbation sizes (defaults: growth ±200bp, margin ±150bp, WACC ∓150bp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_shifts: Option<super::scenarios::ScenarioShifts>,
    /// Sensitivity sweep settings (defaults: 5 points per variable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<super::sensitivity::SensitivitySettings>,
}

/// One projected period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub period: u32,
    pub revenue: Money,
    pub operating_margin: Rate,
    pub ebit: Money,
    pub nopat: Money,
    pub depreciation: Money,
    pub capex: Money,
    pub nwc_change: Money,
    pub reinvestment: Money,
    pub free_cash_flow: Money,
    pub discount_factor: Rate,
    pub present_value: Money,
}

/// Valuation of one named case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub case: ScenarioCase,
    pub assumptions: DcfAssumptions,
    pub projection: Vec<ProjectionRow>,
    pub pv_of_fcf: Money,
    pub terminal_value: Money,
    pub pv_of_terminal: Money,
    pub enterprise_value: Money,
    /// Total debt − cash
    pub net_debt: Money,
    pub equity_value: Money,
    pub price_per_share: Money,
    /// PV of terminal value ÷ enterprise value
    pub terminal_value_pct: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Gordon growth terminal value: FCF_final × (1 + g) / (r − g).
///
/// Fails with a domain error when r ≤ g; the formula has no finite value
/// there.
pub fn calculate_terminal_value(
    final_fcf: Money,
    growth: Rate,
    discount_rate: Rate,
) -> AnalystResult<Money> {
    if discount_rate <= growth {
        return Err(AnalystError::Domain(format!(
            "Discount rate ({discount_rate}) must exceed terminal growth rate ({growth}) for the Gordon growth model"
        )));
    }
    final_fcf
        .checked_mul(Decimal::ONE + growth)
        .and_then(|v| v.checked_div(discount_rate - growth))
        .ok_or_else(|| AnalystError::overflow("Terminal value"))
}

/// Single-case DCF valuation of `input.assumptions`.
pub fn calculate_dcf(input: &ValuationInput) -> AnalystResult<ComputationOutput<ScenarioResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_company(input)?;
    let assumptions = normalize_assumptions(&input.assumptions, &mut warnings);
    let result = value_scenario(input, &assumptions, ScenarioCase::Base, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "FCFF DCF with Gordon growth terminal value",
        input,
        warnings,
        elapsed,
        result,
    ))
}

/// Value one case. `assumptions` is taken as given; callers derive scenario
/// variants before calling.
pub fn value_scenario(
    input: &ValuationInput,
    assumptions: &DcfAssumptions,
    case: ScenarioCase,
    warnings: &mut Vec<String>,
) -> AnalystResult<ScenarioResult> {
    validate_assumptions(assumptions)?;

    let projection = build_projection(input.current_revenue, assumptions)?;
    let last = projection
        .last()
        .ok_or_else(|| AnalystError::insufficient("DCF projection", 1, 0))?;

    let terminal_value = calculate_terminal_value(
        last.free_cash_flow,
        assumptions.terminal_growth_rate,
        assumptions.wacc,
    )?;
    let tv_discount = (Decimal::ONE + assumptions.wacc)
        .checked_powu(assumptions.projection_years as u64)
        .map(|growth| Decimal::ONE / growth)
        .ok_or_else(|| AnalystError::overflow("Terminal discount factor"))?;
    let pv_of_terminal = terminal_value * tv_discount;
    let pv_of_fcf = projection
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.present_value))
        .ok_or_else(|| AnalystError::overflow("Sum of discounted cash flows"))?;
    let enterprise_value = pv_of_fcf
        .checked_add(pv_of_terminal)
        .ok_or_else(|| AnalystError::overflow("Enterprise value"))?;

    let terminal_value_pct = if enterprise_value.is_zero() {
        Decimal::ZERO
    } else {
        pv_of_terminal
            .checked_div(enterprise_value)
            .ok_or_else(|| AnalystError::overflow("Terminal value share"))?
    };
    if terminal_value_pct > TERMINAL_VALUE_WARNING_PCT {
        warnings.push(format!(
            "[{case}] Terminal value represents {:.1}% of enterprise value; the explicit forecast carries little of the valuation",
            terminal_value_pct.saturating_mul(dec!(100))
        ));
    }
    if enterprise_value < Decimal::ZERO {
        warnings.push(format!(
            "[{case}] Enterprise value is negative ({enterprise_value:.0}); reinvestment exceeds NOPAT"
        ));
    }

    let (net_debt, equity_value, price_per_share) = equity_bridge(input, enterprise_value)?;

    Ok(ScenarioResult {
        case,
        assumptions: assumptions.clone(),
        projection,
        pv_of_fcf,
        terminal_value,
        pv_of_terminal,
        enterprise_value,
        net_debt,
        equity_value,
        price_per_share,
        terminal_value_pct,
    })
}

/// Resolve the margin inputs into a single explicit EBIT margin so every
/// derived case perturbs the same figure.
pub fn normalize_assumptions(assumptions: &DcfAssumptions, warnings: &mut Vec<String>) -> DcfAssumptions {
    let mut resolved = assumptions.clone();
    let ebit_margin = match (assumptions.ebit_margin, assumptions.ebitda_margin) {
        (Some(ebit), _) => ebit,
        (None, Some(ebitda)) => match &assumptions.reinvestment {
            ReinvestmentModel::PercentOfSales {
                depreciation_pct, ..
            } => ebitda - depreciation_pct,
            ReinvestmentModel::SalesToCapital { .. } => {
                warnings.push(
                    "EBITDA margin used as operating margin: sales-to-capital reinvestment carries no depreciation split".into(),
                );
                ebitda
            }
        },
        (None, None) => {
            warnings.push(format!(
                "No operating margin supplied; assuming {:.0}% EBIT margin",
                DEFAULT_OPERATING_MARGIN * dec!(100)
            ));
            DEFAULT_OPERATING_MARGIN
        }
    };
    resolved.ebit_margin = Some(ebit_margin);
    resolved.ebitda_margin = None;
    resolved
}

pub(crate) fn validate_company(input: &ValuationInput) -> AnalystResult<()> {
    if input.shares_outstanding <= Decimal::ZERO {
        return Err(AnalystError::Domain(format!(
            "Shares outstanding must be positive, got {}",
            input.shares_outstanding
        )));
    }
    if input.current_revenue <= Decimal::ZERO {
        return Err(AnalystError::invalid(
            "current_revenue",
            "Current revenue must be positive",
        ));
    }
    if let Some(price) = input.current_price {
        if price <= Decimal::ZERO {
            return Err(AnalystError::invalid(
                "current_price",
                "Current price must be positive",
            ));
        }
    }
    if input.total_debt < Decimal::ZERO {
        return Err(AnalystError::invalid("total_debt", "Debt cannot be negative"));
    }
    if input.cash < Decimal::ZERO {
        return Err(AnalystError::invalid("cash", "Cash cannot be negative"));
    }
    if input.minority_interest.is_some_and(|mi| mi < Decimal::ZERO) {
        return Err(AnalystError::invalid(
            "minority_interest",
            "Minority interest cannot be negative",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_assumptions(a: &DcfAssumptions) -> AnalystResult<()> {
    if a.wacc <= Decimal::ZERO {
        return Err(AnalystError::invalid("wacc", "WACC must be positive"));
    }
    if a.wacc <= a.terminal_growth_rate {
        return Err(AnalystError::Domain(format!(
            "WACC ({}) must exceed terminal growth rate ({}) for the Gordon growth model",
            a.wacc, a.terminal_growth_rate
        )));
    }
    if a.revenue_growth_rate <= dec!(-1) {
        return Err(AnalystError::invalid(
            "revenue_growth_rate",
            "Growth must be greater than -100%",
        ));
    }
    if a.tax_rate < Decimal::ZERO || a.tax_rate >= Decimal::ONE {
        return Err(AnalystError::invalid("tax_rate", "Tax rate must be in [0, 1)"));
    }
    if a.projection_years == 0 || a.projection_years > MAX_PROJECTION_YEARS {
        return Err(AnalystError::invalid(
            "projection_years",
            format!("Must be between 1 and {MAX_PROJECTION_YEARS}"),
        ));
    }
    for (field, margin) in [
        ("ebit_margin", a.ebit_margin),
        ("ebitda_margin", a.ebitda_margin),
        ("terminal_margin", a.terminal_margin),
    ] {
        if let Some(m) = margin {
            if m <= dec!(-1) || m >= Decimal::ONE {
                return Err(AnalystError::invalid(field, "Margin must be in (-1, 1)"));
            }
        }
    }
    a.reinvestment.validate()
}

fn margin_for_period(initial: Rate, terminal: Option<Rate>, period: u32, horizon: u32) -> Rate {
    match terminal {
        Some(end) if horizon > 1 => {
            let progress = Decimal::from(period - 1) / Decimal::from(horizon - 1);
            initial + (end - initial) * progress
        }
        Some(end) => end,
        None => initial,
    }
}

fn build_projection(
    current_revenue: Money,
    a: &DcfAssumptions,
) -> AnalystResult<Vec<ProjectionRow>> {
    let initial_margin = a.ebit_margin.unwrap_or(DEFAULT_OPERATING_MARGIN);
    let mid_year = a.mid_year_convention.unwrap_or(false);
    let one_plus_wacc = Decimal::ONE + a.wacc;

    let mut rows = Vec::with_capacity(a.projection_years as usize);
    let mut prior_revenue = current_revenue;

    for period in 1..=a.projection_years {
        let revenue = prior_revenue
            .checked_mul(Decimal::ONE + a.revenue_growth_rate)
            .ok_or_else(|| AnalystError::overflow(&format!("Revenue in period {period}")))?;
        let operating_margin =
            margin_for_period(initial_margin, a.terminal_margin, period, a.projection_years);
        let ebit = revenue * operating_margin;
        let nopat = ebit * (Decimal::ONE - a.tax_rate);

        let reinvestment = a
            .reinvestment
            .for_period(revenue, prior_revenue)
            .ok_or_else(|| AnalystError::overflow(&format!("Reinvestment in period {period}")))?;
        let net_reinvestment = reinvestment.net();
        let free_cash_flow = nopat
            .checked_sub(net_reinvestment)
            .ok_or_else(|| AnalystError::overflow(&format!("Free cash flow in period {period}")))?;

        let compounded = if mid_year {
            one_plus_wacc.checked_powd(Decimal::from(period) - dec!(0.5))
        } else {
            one_plus_wacc.checked_powu(period as u64)
        };
        let discount_factor = compounded
            .map(|c| Decimal::ONE / c)
            .ok_or_else(|| AnalystError::overflow(&format!("Discount factor in period {period}")))?;
        if discount_factor.is_zero() {
            return Err(AnalystError::DivisionByZero {
                context: format!("discount factor at period {period}"),
            });
        }

        rows.push(ProjectionRow {
            period,
            revenue,
            operating_margin,
            ebit,
            nopat,
            depreciation: reinvestment.depreciation,
            capex: reinvestment.capex,
            nwc_change: reinvestment.nwc_change,
            reinvestment: net_reinvestment,
            free_cash_flow,
            discount_factor,
            present_value: free_cash_flow * discount_factor,
        });

        prior_revenue = revenue;
    }

    Ok(rows)
}

/// Returns (net debt, equity value, value per share). Shares are floored at
/// one so the division is always defined.
fn equity_bridge(
    input: &ValuationInput,
    enterprise_value: Money,
) -> AnalystResult<(Money, Money, Money)> {
    let net_debt = input.total_debt - input.cash;
    let equity_value = enterprise_value
        .checked_sub(net_debt)
        .and_then(|v| v.checked_sub(input.minority_interest.unwrap_or(Decimal::ZERO)))
        .ok_or_else(|| AnalystError::overflow("Equity value"))?;
    let shares = input.shares_outstanding.max(Decimal::ONE);
    Ok((net_debt, equity_value, equity_value / shares))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn sample_valuation_input() -> ValuationInput {
        ValuationInput {
            symbol: "ACME".into(),
            current_revenue: dec!(1000),
            current_price: Some(dec!(20)),
            shares_outstanding: dec!(100),
            total_debt: dec!(300),
            cash: dec!(100),
            minority_interest: None,
            currency: Currency::USD,
            assumptions: DcfAssumptions {
                revenue_growth_rate: dec!(0.08),
                ebit_margin: Some(dec!(0.20)),
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

    #[test]
    fn test_terminal_value_closed_form() {
        let fcf = dec!(10_000_000_000);
        let g = dec!(0.025);
        let r = dec!(0.09);
        let tv = calculate_terminal_value(fcf, g, r).unwrap();
        assert_eq!(tv, fcf * (Decimal::ONE + g) / (r - g));
    }

    #[test]
    fn test_terminal_value_rejects_rate_below_growth() {
        let err = calculate_terminal_value(dec!(10_000_000_000), dec!(0.025), dec!(0.02));
        assert!(matches!(err, Err(AnalystError::Domain(_))));
        let equal = calculate_terminal_value(dec!(1), dec!(0.03), dec!(0.03));
        assert!(matches!(equal, Err(AnalystError::Domain(_))));
    }

    #[test]
    fn test_projection_mechanics() {
        let input = sample_valuation_input();
        let out = calculate_dcf(&input).unwrap();
        let rows = &out.result.projection;
        assert_eq!(rows.len(), 5);

        let y1 = &rows[0];
        assert_eq!(y1.revenue, dec!(1080));
        assert_eq!(y1.ebit, dec!(216));
        assert_eq!(y1.nopat, dec!(162));
        // capex 54, depreciation 43.2, ΔNWC 0.05 × 80 = 4
        assert_eq!(y1.capex, dec!(54));
        assert_eq!(y1.depreciation, dec!(43.2));
        assert_eq!(y1.nwc_change, dec!(4));
        assert_eq!(y1.reinvestment, dec!(14.8));
        assert_eq!(y1.free_cash_flow, dec!(147.2));
    }

    #[test]
    fn test_enterprise_value_is_sum_of_present_values() {
        let input = sample_valuation_input();
        let r = calculate_dcf(&input).unwrap().result;
        let pv: Decimal = r.projection.iter().map(|p| p.present_value).sum();
        assert_eq!(r.pv_of_fcf, pv);
        assert_eq!(r.enterprise_value, r.pv_of_fcf + r.pv_of_terminal);
        let last_fcf = r.projection.last().unwrap().free_cash_flow;
        assert_eq!(
            r.terminal_value,
            calculate_terminal_value(last_fcf, dec!(0.025), dec!(0.09)).unwrap()
        );
    }

    #[test]
    fn test_equity_bridge() {
        let mut input = sample_valuation_input();
        input.minority_interest = Some(dec!(50));
        let r = calculate_dcf(&input).unwrap().result;
        assert_eq!(r.net_debt, dec!(200));
        assert_eq!(r.equity_value, r.enterprise_value - dec!(200) - dec!(50));
        assert_eq!(r.price_per_share, r.equity_value / dec!(100));
    }

    #[test]
    fn test_fractional_share_count_floors_divisor_at_one() {
        let mut input = sample_valuation_input();
        input.shares_outstanding = dec!(0.5);
        let r = calculate_dcf(&input).unwrap().result;
        assert_eq!(r.price_per_share, r.equity_value);
    }

    #[test]
    fn test_non_positive_shares_is_domain_error() {
        let mut input = sample_valuation_input();
        input.shares_outstanding = Decimal::ZERO;
        assert!(matches!(calculate_dcf(&input), Err(AnalystError::Domain(_))));
    }

    #[test]
    fn test_wacc_at_or_below_growth_is_domain_error() {
        let mut input = sample_valuation_input();
        input.assumptions.wacc = dec!(0.02);
        assert!(matches!(calculate_dcf(&input), Err(AnalystError::Domain(_))));
    }

    #[test]
    fn test_mid_year_convention_raises_value() {
        let input = sample_valuation_input();
        let end = calculate_dcf(&input).unwrap().result;
        let mut mid_input = sample_valuation_input();
        mid_input.assumptions.mid_year_convention = Some(true);
        let mid = calculate_dcf(&mid_input).unwrap().result;
        assert!(mid.pv_of_fcf > end.pv_of_fcf);
    }

    #[test]
    fn test_margin_glide_reaches_terminal_margin() {
        let mut input = sample_valuation_input();
        input.assumptions.terminal_margin = Some(dec!(0.30));
        let r = calculate_dcf(&input).unwrap().result;
        assert_eq!(r.projection[0].operating_margin, dec!(0.20));
        assert_eq!(r.projection[2].operating_margin, dec!(0.25));
        assert_eq!(r.projection[4].operating_margin, dec!(0.30));
    }

    #[test]
    fn test_sales_to_capital_reinvestment() {
        let mut input = sample_valuation_input();
        input.assumptions.reinvestment = ReinvestmentModel::SalesToCapital { ratio: dec!(2) };
        let r = calculate_dcf(&input).unwrap().result;
        // Δrevenue 80 / 2 = 40
        assert_eq!(r.projection[0].reinvestment, dec!(40));
        assert_eq!(r.projection[0].free_cash_flow, dec!(122));
    }

    #[test]
    fn test_ebitda_margin_is_converted_and_default_margin_warns() {
        let mut input = sample_valuation_input();
        input.assumptions.ebit_margin = None;
        input.assumptions.ebitda_margin = Some(dec!(0.24));
        let r = calculate_dcf(&input).unwrap().result;
        // 24% EBITDA less 4% depreciation
        assert_eq!(r.assumptions.ebit_margin, Some(dec!(0.20)));

        input.assumptions.ebitda_margin = None;
        let out = calculate_dcf(&input).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("No operating margin")));
        assert_eq!(out.result.assumptions.ebit_margin, Some(DEFAULT_OPERATING_MARGIN));
    }

    #[test]
    fn test_terminal_value_share_warning() {
        let mut input = sample_valuation_input();
        input.assumptions.wacc = dec!(0.04);
        input.assumptions.terminal_growth_rate = dec!(0.035);
        let out = calculate_dcf(&input).unwrap();
        assert!(out.result.terminal_value_pct > TERMINAL_VALUE_WARNING_PCT);
        assert!(out.warnings.iter().any(|w| w.contains("Terminal value represents")));
    }

    #[test]
    fn test_runaway_growth_is_a_domain_error() {
        let mut input = sample_valuation_input();
        input.assumptions.revenue_growth_rate = dec!(3.0);
        input.assumptions.projection_years = 50;
        let err = calculate_dcf(&input).unwrap_err();
        assert!(err.is_domain(), "expected a domain error, got {err}");
        assert!(err.to_string().contains("overflows the decimal range"));
    }

    #[test]
    fn test_terminal_value_overflow_is_reported() {
        let err = calculate_terminal_value(Decimal::MAX, dec!(0.02), dec!(0.021)).unwrap_err();
        assert!(err.is_domain(), "{err}");
    }

    #[test]
    fn test_invalid_tax_rate() {
        let mut input = sample_valuation_input();
        input.assumptions.tax_rate = dec!(1.2);
        match calculate_dcf(&input) {
            Err(AnalystError::InvalidInput { field, .. }) => assert_eq!(field, "tax_rate"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}
