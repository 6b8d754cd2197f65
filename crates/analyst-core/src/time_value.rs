use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AnalystError;
use crate::types::{Money, Rate};
use crate::AnalystResult;

/// Lower edge of the IRR search bracket (−99%).
pub const IRR_LOWER_BOUND: f64 = -0.99;
/// Upper edge of the initial IRR bracket (1000%).
pub const IRR_INITIAL_UPPER_BOUND: f64 = 10.0;
/// The upper edge is widened tenfold at a time up to this rate when the
/// initial bracket shows no sign change.
pub const IRR_MAX_UPPER_BOUND: f64 = 1_000.0;
/// A root is accepted when |NPV| at the returned rate is below this many
/// currency units, or below 1e-9 of the gross cash flow for large series.
pub const IRR_NPV_TOLERANCE: f64 = 1e-2;
const IRR_RELATIVE_NPV_TOLERANCE: f64 = 1e-9;
/// Iteration stops once the step is below this relative rate change.
const IRR_RATE_TOLERANCE: f64 = 1e-12;
const MAX_IRR_ITERATIONS: u32 = 300;
/// Distance (in rate) from the bracket edges that is flagged as suspect.
const BOUNDARY_MARGIN: f64 = 0.01;

const DAYS_PER_YEAR: f64 = 365.25;

/// Root found by [`irr`] or [`xirr`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrSolution {
    pub rate: Rate,
    /// NPV at `rate`, in currency units.
    pub npv_residual: f64,
    pub iterations: u32,
    /// True when the root sits within 1% of either bracket edge or the
    /// bracket had to be widened to find it.
    pub near_bracket_boundary: bool,
}

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> AnalystResult<Money> {
    if rate <= dec!(-1) {
        return Err(AnalystError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        if discount.is_zero() {
            return Err(AnalystError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// Internal Rate of Return for evenly spaced (annual) cash flows, with the
/// first flow at t = 0.
pub fn irr(cash_flows: &[Money]) -> AnalystResult<IrrSolution> {
    if cash_flows.len() < 2 {
        return Err(AnalystError::insufficient("IRR", 2, cash_flows.len()));
    }
    let flows = cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| Ok((t as f64, money_to_f64(*cf)?)))
        .collect::<AnalystResult<Vec<_>>>()?;
    solve_rate("IRR", &flows)
}

/// Extended IRR for irregular cash flow dates (actual/365.25 from the
/// first date).
pub fn xirr(dated_flows: &[(NaiveDate, Money)]) -> AnalystResult<IrrSolution> {
    if dated_flows.len() < 2 {
        return Err(AnalystError::insufficient("XIRR", 2, dated_flows.len()));
    }
    let base_date = dated_flows[0].0;
    let flows = dated_flows
        .iter()
        .map(|(date, amount)| {
            let days = (*date - base_date).num_days();
            if days < 0 {
                return Err(AnalystError::invalid(
                    "dated_flows",
                    format!("{date} precedes the first cash flow date {base_date}"),
                ));
            }
            Ok((days as f64 / DAYS_PER_YEAR, money_to_f64(*amount)?))
        })
        .collect::<AnalystResult<Vec<_>>>()?;
    solve_rate("XIRR", &flows)
}

fn money_to_f64(value: Money) -> AnalystResult<f64> {
    value
        .to_f64()
        .ok_or_else(|| AnalystError::invalid("cash_flows", format!("{value} is not representable")))
}

/// NPV and dNPV/dr of `(time, amount)` pairs.
fn npv_with_derivative(rate: f64, flows: &[(f64, f64)]) -> (f64, f64) {
    let base = 1.0 + rate;
    flows.iter().fold((0.0, 0.0), |(v, dv), (t, cf)| {
        let discounted = cf * base.powf(-t);
        (v + discounted, dv - t * discounted / base)
    })
}

/// Bracketed root search: widen the upper edge until NPV changes sign, then
/// run Newton steps that fall back to bisection whenever a step would leave
/// the bracket or fails to halve the previous step.
fn solve_rate(function: &str, flows: &[(f64, f64)]) -> AnalystResult<IrrSolution> {
    let has_inflow = flows.iter().any(|(_, cf)| *cf > 0.0);
    let has_outflow = flows.iter().any(|(_, cf)| *cf < 0.0);
    if !(has_inflow && has_outflow) {
        return Err(AnalystError::Domain(format!(
            "{function} undefined: cash flows need both an outflow and an inflow"
        )));
    }

    let mut lo = IRR_LOWER_BOUND;
    let mut hi = IRR_INITIAL_UPPER_BOUND;
    let mut f_lo = npv_with_derivative(lo, flows).0;
    let mut f_hi = npv_with_derivative(hi, flows).0;
    let mut widened = false;

    while f_lo.signum() == f_hi.signum() && f_lo != 0.0 && f_hi != 0.0 {
        if hi >= IRR_MAX_UPPER_BOUND {
            return Err(AnalystError::Domain(format!(
                "{function} undefined: NPV does not change sign on [{IRR_LOWER_BOUND}, {IRR_MAX_UPPER_BOUND}]"
            )));
        }
        lo = hi;
        f_lo = f_hi;
        hi = (hi * 10.0).min(IRR_MAX_UPPER_BOUND);
        f_hi = npv_with_derivative(hi, flows).0;
        widened = true;
    }

    let (mut rate, mut iterations) = if f_lo == 0.0 {
        (lo, 0)
    } else if f_hi == 0.0 {
        (hi, 0)
    } else {
        safeguarded_newton(flows, lo, hi, f_lo)
    };
    if !rate.is_finite() {
        rate = 0.5 * (lo + hi);
        iterations = MAX_IRR_ITERATIONS;
    }

    let residual = npv_with_derivative(rate, flows).0;
    let gross: f64 = flows.iter().map(|(_, cf)| cf.abs()).sum();
    let tolerance = IRR_NPV_TOLERANCE.max(IRR_RELATIVE_NPV_TOLERANCE * gross);
    if residual.abs() > tolerance {
        return Err(AnalystError::ConvergenceFailure {
            function: function.to_string(),
            iterations,
            last_delta: residual,
        });
    }

    let near_bracket_boundary = widened
        || rate < IRR_LOWER_BOUND + BOUNDARY_MARGIN
        || rate > IRR_INITIAL_UPPER_BOUND - BOUNDARY_MARGIN;

    let rate = Decimal::from_f64(rate).ok_or_else(|| AnalystError::ConvergenceFailure {
        function: function.to_string(),
        iterations,
        last_delta: residual,
    })?;

    Ok(IrrSolution {
        rate,
        npv_residual: residual,
        iterations,
        near_bracket_boundary,
    })
}

fn safeguarded_newton(flows: &[(f64, f64)], lo: f64, hi: f64, f_lo: f64) -> (f64, u32) {
    // Orient so that NPV(neg) < 0 < NPV(pos).
    let (mut neg, mut pos) = if f_lo < 0.0 { (lo, hi) } else { (hi, lo) };
    let mut rate = if lo < 0.1 && 0.1 < hi { 0.1 } else { 0.5 * (lo + hi) };
    let mut step_before_last = hi - lo;
    let mut step = step_before_last;
    let (mut f, mut df) = npv_with_derivative(rate, flows);

    for iteration in 1..=MAX_IRR_ITERATIONS {
        let newton_leaves_bracket = ((rate - pos) * df - f) * ((rate - neg) * df - f) > 0.0;
        let newton_too_slow = (2.0 * f).abs() > (step_before_last * df).abs();
        step_before_last = step;
        if newton_leaves_bracket || newton_too_slow || df == 0.0 {
            step = 0.5 * (pos - neg);
            rate = neg + step;
        } else {
            step = f / df;
            rate -= step;
        }

        if step.abs() < IRR_RATE_TOLERANCE * (1.0 + rate.abs()) {
            return (rate, iteration);
        }

        (f, df) = npv_with_derivative(rate, flows);
        if f == 0.0 {
            return (rate, iteration);
        }
        if f < 0.0 {
            neg = rate;
        } else {
            pos = rate;
        }
    }
    (rate, MAX_IRR_ITERATIONS)
}
