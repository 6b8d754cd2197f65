use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::cache::{cache_key, CacheStats, ComputationCache};
use crate::config::EngineConfig;
use crate::error::AnalystError;
use crate::time_value::irr;
use crate::types::{with_metadata, ComputationOutput, Currency, ModelType, Money, Multiple, Rate, ScenarioCase};
use crate::AnalystResult;

use super::debt_schedule::{DebtLedger, DebtSchedulePeriod};
use super::returns::accept_irr;
use super::transaction::{build_transaction, TrancheSpec, TransactionAssumptions, TransactionStructure};

const MAX_HOLD_YEARS: u32 = 30;

/// Revenue and EBITDA paths must stay this far below `Decimal::MAX` so the
/// per-period cash arithmetic and its accumulation over the hold cannot overflow.
const PROJECTION_HEADROOM: Decimal = dec!(1000000);

fn projection_ceiling() -> Decimal {
    Decimal::MAX / PROJECTION_HEADROOM
}

/// `base × (1 + growth)^periods`, rejected once it leaves the projection ceiling.
fn compound(base: Money, growth: Rate, periods: u32, what: &str) -> AnalystResult<Money> {
    (Decimal::ONE + growth)
        .checked_powu(periods as u64)
        .and_then(|factor| base.checked_mul(factor))
        .filter(|v| v.abs() <= projection_ceiling())
        .ok_or_else(|| AnalystError::overflow(what))
}

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtAssumptions {
    #[serde(default)]
    pub tranches: Vec<TrancheSpec>,
    /// Total debt ÷ purchase price; rescales the tranche multiples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_leverage: Option<Rate>,
    /// Share of post-amortisation free cash swept to debt (default: 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_sweep_pct: Option<Rate>,
    /// Cash kept on balance sheet before any sweep (default: 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_cash: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingAssumptions {
    /// Annual EBITDA growth over the hold period
    pub ebitda_growth_rate: Rate,
    /// Annual revenue growth (default: EBITDA growth)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_growth_rate: Option<Rate>,
    pub tax_rate: Rate,
    #[serde(default)]
    pub capex_pct_revenue: Rate,
    /// Depreciation & amortisation as a share of revenue (tax shield only)
    #[serde(default)]
    pub da_pct_revenue: Rate,
    /// Net working capital held as a share of revenue
    #[serde(default)]
    pub nwc_pct_revenue: Rate,
    /// Share of excess cash above the minimum paid out each year (default: 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_payout_pct: Option<Rate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitAssumptions {
    /// Exit EV / EBITDA
    pub exit_multiple: Multiple,
    pub hold_period_years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LboAssumptions {
    pub debt: DebtAssumptions,
    pub operating: OperatingAssumptions,
    pub exit: ExitAssumptions,
    #[serde(default)]
    pub transaction: TransactionAssumptions,
}

/// Upside/downside perturbations. Upside adds both shifts, downside
/// subtracts them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LboScenarioShifts {
    /// EBITDA growth shift (default: 0.02)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebitda_growth: Option<Rate>,
    /// Exit multiple shift in turns of EBITDA (default: 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_multiple: Option<Multiple>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LboInput {
    pub symbol: String,
    /// Enterprise purchase price
    pub purchase_price: Money,
    /// Entry (LTM) EBITDA
    pub ebitda: Money,
    /// Entry (LTM) revenue
    pub revenue: Money,
    #[serde(default)]
    pub currency: Currency,
    pub assumptions: LboAssumptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_shifts: Option<LboScenarioShifts>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingRow {
    pub period: u32,
    pub revenue: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    pub interest_expense: Money,
    pub taxes: Money,
    pub capex: Money,
    pub nwc_change: Money,
    /// Cash available for debt service
    pub free_cash_flow: Money,
    pub scheduled_repayment: Money,
    pub sweep_repayment: Money,
    pub dividends: Money,
    pub cash_balance: Money,
    pub total_debt: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitAnalysis {
    pub exit_year: u32,
    pub exit_ebitda: Money,
    pub exit_multiple: Multiple,
    pub exit_enterprise_value: Money,
    pub remaining_debt: Money,
    pub cash: Money,
    /// Exit EV − remaining debt + cash
    pub exit_equity_value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsAnalysis {
    pub initial_equity: Money,
    /// Interim dividends plus exit proceeds
    pub total_cash_returned: Money,
    /// Sponsor cash flows, t = 0..hold period
    pub cash_flows: Vec<Money>,
    /// `None` when exit equity is wiped out or the root-finder fails
    pub irr: Option<Rate>,
    pub moic: Multiple,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LboCaseResult {
    pub case: ScenarioCase,
    pub ebitda_growth_rate: Rate,
    pub exit_multiple: Multiple,
    pub operating_projection: Vec<OperatingRow>,
    pub debt_schedule: Vec<DebtSchedulePeriod>,
    pub exit: ExitAnalysis,
    pub returns: ReturnsAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LboScenarios {
    pub upside: LboCaseResult,
    pub downside: LboCaseResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LboModelOutput {
    pub model_type: ModelType,
    pub symbol: String,
    pub transaction_structure: TransactionStructure,
    pub base_case: LboCaseResult,
    pub scenarios: LboScenarios,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Entry structure, base-case projection with debt paydown and returns,
/// plus upside/downside cases.
pub fn build_lbo_model(input: &LboInput) -> AnalystResult<ComputationOutput<LboModelOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(symbol = %input.symbol, hold = input.assumptions.exit.hold_period_years, "building LBO model");

    validate_input(input)?;
    let a = &input.assumptions;

    let transaction = build_transaction(
        input.purchase_price,
        input.ebitda,
        &a.debt.tranches,
        a.debt.target_leverage,
        &a.transaction,
    )?;
    if transaction.leverage_multiple > dec!(7) {
        warnings.push(format!(
            "Entry leverage of {:.1}x EBITDA is above typical sponsor levels",
            transaction.leverage_multiple
        ));
    }

    let shifts = input.scenario_shifts.clone().unwrap_or_default();
    let growth_shift = shifts.ebitda_growth.unwrap_or(dec!(0.02));
    let multiple_shift = shifts.exit_multiple.unwrap_or(dec!(1.0));

    let base_growth = a.operating.ebitda_growth_rate;
    let base_multiple = a.exit.exit_multiple;

    let base_case = run_case(input, &transaction, ScenarioCase::Base, base_growth, base_multiple, &mut warnings)?;
    let upside = run_case(
        input,
        &transaction,
        ScenarioCase::Upside,
        base_growth + growth_shift,
        base_multiple + multiple_shift,
        &mut warnings,
    )?;

    let mut downside_multiple = base_multiple - multiple_shift;
    if downside_multiple <= Decimal::ZERO {
        downside_multiple = base_multiple / dec!(2);
        warnings.push(format!(
            "[downside] Exit multiple shift exceeds the base multiple; using {downside_multiple}x"
        ));
    }
    let downside = run_case(
        input,
        &transaction,
        ScenarioCase::Downside,
        base_growth - growth_shift,
        downside_multiple,
        &mut warnings,
    )?;

    if !(upside.returns.moic >= base_case.returns.moic
        && base_case.returns.moic >= downside.returns.moic)
    {
        tracing::warn!(
            symbol = %input.symbol,
            upside = %upside.returns.moic,
            base = %base_case.returns.moic,
            downside = %downside.returns.moic,
            "LBO scenario ordering violated"
        );
        warnings.push(format!(
            "Scenario ordering violated: MOIC upside {:.2}x, base {:.2}x, downside {:.2}x",
            upside.returns.moic, base_case.returns.moic, downside.returns.moic
        ));
    }

    let output = LboModelOutput {
        model_type: ModelType::Lbo,
        symbol: input.symbol.clone(),
        transaction_structure: transaction,
        base_case,
        scenarios: LboScenarios { upside, downside },
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Leveraged buyout: senior-first cash sweep, exit at EBITDA multiple",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// LBO engine with its own memo cache.
pub struct LboEngine {
    cache: ComputationCache<ComputationOutput<LboModelOutput>>,
}

impl LboEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cache: ComputationCache::new(&config.cache),
        }
    }

    pub fn build(&self, input: &LboInput) -> AnalystResult<Arc<ComputationOutput<LboModelOutput>>> {
        let key = cache_key("lbo", input)?;
        self.cache.get_or_try_insert_with(key, || build_lbo_model(input))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_input(input: &LboInput) -> AnalystResult<()> {
    let a = &input.assumptions;
    if input.purchase_price <= Decimal::ZERO {
        return Err(AnalystError::invalid("purchase_price", "Purchase price must be positive"));
    }
    if input.ebitda <= Decimal::ZERO {
        return Err(AnalystError::invalid("ebitda", "Entry EBITDA must be positive"));
    }
    if input.revenue <= Decimal::ZERO {
        return Err(AnalystError::invalid("revenue", "Entry revenue must be positive"));
    }
    for (field, v) in [
        ("purchase_price", input.purchase_price),
        ("ebitda", input.ebitda),
        ("revenue", input.revenue),
    ] {
        if v > projection_ceiling() {
            return Err(AnalystError::overflow(field));
        }
    }
    if a.exit.hold_period_years == 0 || a.exit.hold_period_years > MAX_HOLD_YEARS {
        return Err(AnalystError::invalid(
            "exit.hold_period_years",
            format!("Must be between 1 and {MAX_HOLD_YEARS}"),
        ));
    }
    if a.exit.exit_multiple <= Decimal::ZERO {
        return Err(AnalystError::invalid("exit.exit_multiple", "Exit multiple must be positive"));
    }
    if a.operating.ebitda_growth_rate <= dec!(-1) {
        return Err(AnalystError::invalid(
            "operating.ebitda_growth_rate",
            "Growth must be greater than -100%",
        ));
    }
    if a.operating.tax_rate < Decimal::ZERO || a.operating.tax_rate >= Decimal::ONE {
        return Err(AnalystError::invalid("operating.tax_rate", "Tax rate must be in [0, 1)"));
    }
    for (field, v) in [
        ("operating.capex_pct_revenue", Some(a.operating.capex_pct_revenue)),
        ("operating.da_pct_revenue", Some(a.operating.da_pct_revenue)),
        ("operating.nwc_pct_revenue", Some(a.operating.nwc_pct_revenue)),
        ("operating.dividend_payout_pct", a.operating.dividend_payout_pct),
        ("debt.cash_sweep_pct", a.debt.cash_sweep_pct),
    ] {
        if let Some(v) = v {
            if v < Decimal::ZERO || v > Decimal::ONE {
                return Err(AnalystError::invalid(field, "Must be in [0, 1]"));
            }
        }
    }
    if a.debt.minimum_cash.is_some_and(|c| c < Decimal::ZERO) {
        return Err(AnalystError::invalid("debt.minimum_cash", "Minimum cash cannot be negative"));
    }
    Ok(())
}

/// Project one case from close to exit.
fn run_case(
    input: &LboInput,
    transaction: &TransactionStructure,
    case: ScenarioCase,
    ebitda_growth: Rate,
    exit_multiple: Multiple,
    warnings: &mut Vec<String>,
) -> AnalystResult<LboCaseResult> {
    if ebitda_growth <= dec!(-1) {
        return Err(AnalystError::invalid(
            "operating.ebitda_growth_rate",
            format!("[{case}] growth of {ebitda_growth} is not above -100%"),
        ));
    }
    let a = &input.assumptions;
    let op = &a.operating;
    let hold = a.exit.hold_period_years;
    let sweep_pct = a.debt.cash_sweep_pct.unwrap_or(Decimal::ONE);
    let minimum_cash = a.debt.minimum_cash.unwrap_or(Decimal::ZERO);
    let payout_pct = op.dividend_payout_pct.unwrap_or(Decimal::ZERO);
    let revenue_growth = op.revenue_growth_rate.unwrap_or(ebitda_growth);

    let mut ledger = DebtLedger::new(&transaction.tranches);
    let mut operating_projection = Vec::with_capacity(hold as usize);
    let mut debt_schedule = Vec::with_capacity(hold as usize);
    let mut dividends_paid: Vec<Money> = Vec::with_capacity(hold as usize);

    let mut prior_revenue = input.revenue;
    let mut cash = Decimal::ZERO;

    for period in 1..=hold {
        let ebitda = compound(input.ebitda, ebitda_growth, period, "Projected EBITDA")?;
        let revenue = compound(prior_revenue, revenue_growth, 1, "Projected revenue")?;
        let depreciation = revenue * op.da_pct_revenue;
        let ebit = ebitda - depreciation;

        let interest_expense = ledger.interest_due();
        let taxes = ((ebit - interest_expense) * op.tax_rate).max(Decimal::ZERO);
        let capex = revenue * op.capex_pct_revenue;
        let nwc_change = (revenue - prior_revenue) * op.nwc_pct_revenue;
        let free_cash_flow = ebitda - interest_expense - taxes - capex - nwc_change;

        // Scheduled amortisation is mandatory; the sweep only uses cash
        // above the minimum balance once amortisation is paid.
        let scheduled_due: Money = transaction
            .tranches
            .iter()
            .map(|t| t.amount * t.amortization_pct)
            .sum::<Money>()
            .min(ledger.total_balance());
        let excess = (cash + free_cash_flow - scheduled_due - minimum_cash).max(Decimal::ZERO);
        let (schedule_row, paid) = ledger.service(period, excess * sweep_pct);
        cash += free_cash_flow - paid.scheduled - paid.swept;

        if cash < Decimal::ZERO {
            warnings.push(format!(
                "[{case}] Year {period}: cash shortfall of {:.0} after debt service",
                -cash
            ));
        }

        let dividends = if payout_pct > Decimal::ZERO {
            let d = ((cash - minimum_cash) * payout_pct).max(Decimal::ZERO);
            cash -= d;
            d
        } else {
            Decimal::ZERO
        };
        dividends_paid.push(dividends);

        operating_projection.push(OperatingRow {
            period,
            revenue,
            ebitda,
            depreciation,
            ebit,
            interest_expense,
            taxes,
            capex,
            nwc_change,
            free_cash_flow,
            scheduled_repayment: paid.scheduled,
            sweep_repayment: paid.swept,
            dividends,
            cash_balance: cash,
            total_debt: schedule_row.total_closing,
        });
        debt_schedule.push(schedule_row);
        prior_revenue = revenue;
    }

    let exit_ebitda = compound(input.ebitda, ebitda_growth, hold, "Exit EBITDA")?;
    let exit_enterprise_value = exit_ebitda
        .checked_mul(exit_multiple)
        .ok_or_else(|| AnalystError::overflow("Exit enterprise value"))?;
    let remaining_debt = ledger.total_balance();
    let exit_equity_value = exit_enterprise_value
        .checked_sub(remaining_debt)
        .and_then(|v| v.checked_add(cash))
        .ok_or_else(|| AnalystError::overflow("Exit equity value"))?;
    let exit = ExitAnalysis {
        exit_year: hold,
        exit_ebitda,
        exit_multiple,
        exit_enterprise_value,
        remaining_debt,
        cash,
        exit_equity_value,
    };

    let returns = returns_analysis(
        case,
        transaction.equity_contribution,
        &dividends_paid,
        exit_equity_value,
        warnings,
    );

    Ok(LboCaseResult {
        case,
        ebitda_growth_rate: ebitda_growth,
        exit_multiple,
        operating_projection,
        debt_schedule,
        exit,
        returns,
    })
}

fn returns_analysis(
    case: ScenarioCase,
    initial_equity: Money,
    dividends: &[Money],
    exit_equity_value: Money,
    warnings: &mut Vec<String>,
) -> ReturnsAnalysis {
    // Limited liability: negative exit equity returns nothing.
    let exit_proceeds = exit_equity_value.max(Decimal::ZERO);

    let mut cash_flows = Vec::with_capacity(dividends.len() + 1);
    cash_flows.push(-initial_equity);
    cash_flows.extend_from_slice(dividends);
    if let Some(last) = cash_flows.last_mut() {
        *last += exit_proceeds;
    }

    let total_cash_returned: Money = dividends.iter().sum::<Money>() + exit_proceeds;
    let moic = total_cash_returned / initial_equity;

    let irr_rate = if exit_equity_value <= Decimal::ZERO {
        warnings.push(format!(
            "[{case}] Exit equity is {exit_equity_value:.0}; sponsor equity is wiped out and IRR is undefined"
        ));
        None
    } else {
        accept_irr(&format!("[{case}] IRR"), irr(&cash_flows), warnings)
    };

    if moic < Decimal::ONE {
        warnings.push(format!(
            "[{case}] MOIC of {moic:.2}x is below 1.0x; the sponsor loses capital"
        ));
    }

    ReturnsAnalysis {
        initial_equity,
        total_cash_returned,
        cash_flows,
        irr: irr_rate,
        moic,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_value::npv;

    fn sample_lbo_input() -> LboInput {
        LboInput {
            symbol: "TARGET".into(),
            purchase_price: dec!(1000),
            ebitda: dec!(100),
            revenue: dec!(500),
            currency: Currency::USD,
            assumptions: LboAssumptions {
                debt: DebtAssumptions {
                    tranches: vec![
                        TrancheSpec {
                            name: "Senior".into(),
                            ebitda_multiple: dec!(4),
                            interest_rate: dec!(0.07),
                            seniority: 1,
                            amortization_pct: Some(dec!(0.05)),
                        },
                        TrancheSpec {
                            name: "Subordinated".into(),
                            ebitda_multiple: dec!(1.5),
                            interest_rate: dec!(0.10),
                            seniority: 2,
                            amortization_pct: None,
                        },
                    ],
                    target_leverage: None,
                    cash_sweep_pct: None,
                    minimum_cash: None,
                },
                operating: OperatingAssumptions {
                    ebitda_growth_rate: dec!(0.05),
                    revenue_growth_rate: None,
                    tax_rate: dec!(0.25),
                    capex_pct_revenue: dec!(0.03),
                    da_pct_revenue: dec!(0.03),
                    nwc_pct_revenue: dec!(0.10),
                    dividend_payout_pct: None,
                },
                exit: ExitAssumptions {
                    exit_multiple: dec!(10),
                    hold_period_years: 5,
                },
                transaction: TransactionAssumptions {
                    transaction_fee_pct: Some(dec!(0.02)),
                    financing_fee_pct: None,
                },
            },
            scenario_shifts: None,
        }
    }

    #[test]
    fn test_transaction_and_projection_shape() {
        let out = build_lbo_model(&sample_lbo_input()).unwrap().result;
        let t = &out.transaction_structure;
        assert_eq!(t.total_debt, dec!(550));
        assert_eq!(t.equity_contribution, dec!(470));
        assert_eq!(out.base_case.operating_projection.len(), 5);
        assert_eq!(out.base_case.debt_schedule.len(), 5);
    }

    #[test]
    fn test_debt_schedule_rolls_forward_and_stays_non_negative() {
        let out = build_lbo_model(&sample_lbo_input()).unwrap().result;
        let schedule = &out.base_case.debt_schedule;
        for w in schedule.windows(2) {
            assert_eq!(w[0].total_closing, w[1].total_opening);
            for (a, b) in w[0].tranches.iter().zip(&w[1].tranches) {
                assert_eq!(a.closing_balance, b.opening_balance);
            }
        }
        assert!(schedule
            .iter()
            .flat_map(|p| &p.tranches)
            .all(|t| t.closing_balance >= Decimal::ZERO));
        // Sweep hits the senior tranche before the subordinated one
        let y1 = &schedule[0];
        assert!(y1.tranches[0].sweep_repayment > Decimal::ZERO);
        assert_eq!(y1.tranches[1].sweep_repayment, Decimal::ZERO);
    }

    #[test]
    fn test_exit_equity_and_moic() {
        let out = build_lbo_model(&sample_lbo_input()).unwrap().result;
        let exit = &out.base_case.exit;
        let expected_ebitda = dec!(100) * dec!(1.05).powu(5);
        assert_eq!(exit.exit_ebitda, expected_ebitda);
        assert_eq!(exit.exit_enterprise_value, expected_ebitda * dec!(10));
        assert_eq!(
            exit.exit_equity_value,
            exit.exit_enterprise_value - exit.remaining_debt + exit.cash
        );
        let r = &out.base_case.returns;
        assert_eq!(r.moic, exit.exit_equity_value / dec!(470));
        assert!(r.moic > Decimal::ONE);
    }

    #[test]
    fn test_irr_zeroes_npv() {
        let out = build_lbo_model(&sample_lbo_input()).unwrap().result;
        let r = &out.base_case.returns;
        let rate = r.irr.unwrap();
        let residual = npv(rate, &r.cash_flows).unwrap();
        assert!(residual.abs() < dec!(0.01), "NPV at IRR = {residual}");
    }

    #[test]
    fn test_scenario_moic_ordering() {
        let out = build_lbo_model(&sample_lbo_input()).unwrap();
        let m = &out.result;
        assert!(m.scenarios.upside.returns.moic >= m.base_case.returns.moic);
        assert!(m.base_case.returns.moic >= m.scenarios.downside.returns.moic);
        assert_eq!(m.scenarios.upside.exit_multiple, dec!(11));
        assert_eq!(m.scenarios.downside.ebitda_growth_rate, dec!(0.03));
        assert!(!out.warnings.iter().any(|w| w.contains("ordering")));
    }

    #[test]
    fn test_equity_must_be_positive() {
        let mut input = sample_lbo_input();
        input.assumptions.debt.target_leverage = Some(dec!(1.1));
        assert!(matches!(build_lbo_model(&input), Err(AnalystError::Domain(_))));
    }

    #[test]
    fn test_explosive_growth_is_rejected_not_overflowed() {
        let mut input = sample_lbo_input();
        input.assumptions.operating.ebitda_growth_rate = dec!(30);
        input.assumptions.exit.hold_period_years = 30;
        let err = build_lbo_model(&input).unwrap_err();
        assert!(err.is_domain(), "expected a domain error, got {err}");
        assert!(err.to_string().contains("decimal range"));
    }

    #[test]
    fn test_wiped_out_equity_has_no_irr() {
        let mut input = sample_lbo_input();
        input.assumptions.exit.exit_multiple = dec!(2);
        input.assumptions.operating.ebitda_growth_rate = dec!(-0.10);
        let out = build_lbo_model(&input).unwrap();
        assert!(out.result.base_case.returns.irr.is_none());
        assert_eq!(out.result.base_case.returns.moic, Decimal::ZERO);
        assert!(out.warnings.iter().any(|w| w.contains("wiped out")));
    }

    #[test]
    fn test_dividends_flow_to_sponsor_once_debt_is_repaid() {
        let mut input = sample_lbo_input();
        input.assumptions.debt.tranches.truncate(1);
        input.assumptions.debt.tranches[0].ebitda_multiple = dec!(0.5);
        input.assumptions.operating.dividend_payout_pct = Some(dec!(1));
        let out = build_lbo_model(&input).unwrap().result;
        let r = &out.base_case.returns;
        assert!(r.cash_flows[1..4].iter().any(|cf| *cf > Decimal::ZERO));
        assert_eq!(out.base_case.exit.remaining_debt, Decimal::ZERO);
    }

    #[test]
    fn test_engine_caches() {
        let engine = LboEngine::new(&EngineConfig::default());
        let a = engine.build(&sample_lbo_input()).unwrap();
        let b = engine.build(&sample_lbo_input()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
