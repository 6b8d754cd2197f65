use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AnalystError;
use crate::types::{Money, Multiple, Rate};
use crate::AnalystResult;

/// One debt tranche as specified by the sponsor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheSpec {
    pub name: String,
    /// Sizing as a multiple of entry EBITDA
    pub ebitda_multiple: Multiple,
    /// Annual cash interest on the opening balance
    pub interest_rate: Rate,
    /// 1 = most senior. Lower numbers are swept first.
    pub seniority: u32,
    /// Scheduled amortisation per year as a fraction of original principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amortization_pct: Option<Rate>,
}

/// A sized tranche at close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheAllocation {
    pub name: String,
    pub amount: Money,
    /// Realised multiple of entry EBITDA after any leverage scaling
    pub ebitda_multiple: Multiple,
    pub interest_rate: Rate,
    pub seniority: u32,
    pub amortization_pct: Rate,
}

/// Fees charged at close.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionAssumptions {
    /// Advisory fees as a fraction of purchase price (default: 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_fee_pct: Option<Rate>,
    /// Arrangement fees as a fraction of total debt (default: 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financing_fee_pct: Option<Rate>,
}

/// Sources & uses at close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStructure {
    pub purchase_price: Money,
    /// Purchase price ÷ entry EBITDA
    pub entry_multiple: Multiple,
    pub tranches: Vec<TrancheAllocation>,
    pub total_debt: Money,
    pub transaction_fees: Money,
    pub financing_fees: Money,
    pub total_uses: Money,
    pub equity_contribution: Money,
    /// Total debt ÷ entry EBITDA
    pub leverage_multiple: Multiple,
    /// Equity ÷ total uses
    pub equity_pct: Rate,
    pub sources: Vec<(String, Money)>,
    pub uses: Vec<(String, Money)>,
}

/// Size the tranches and solve for the sponsor equity cheque.
///
/// Tranches are sized at `ebitda_multiple × ebitda`. When `target_leverage`
/// (debt ÷ purchase price) is supplied the amounts are scaled pro rata so
/// total debt equals `purchase_price × target_leverage`. Fails with a domain
/// error when debt covers all uses and no equity is required.
pub fn build_transaction(
    purchase_price: Money,
    ebitda: Money,
    tranches: &[TrancheSpec],
    target_leverage: Option<Rate>,
    fees: &TransactionAssumptions,
) -> AnalystResult<TransactionStructure> {
    validate_tranches(tranches)?;

    let unscaled: Vec<Money> = tranches.iter().map(|t| t.ebitda_multiple * ebitda).collect();
    let unscaled_total: Money = unscaled.iter().sum();

    let amounts: Vec<Money> = match target_leverage {
        Some(leverage) => {
            if leverage < Decimal::ZERO {
                return Err(AnalystError::invalid(
                    "debt.target_leverage",
                    "Target leverage cannot be negative",
                ));
            }
            let target = purchase_price * leverage;
            if target.is_zero() {
                vec![Decimal::ZERO; tranches.len()]
            } else if unscaled_total.is_zero() {
                return Err(AnalystError::invalid(
                    "debt.tranches",
                    "Target leverage needs at least one tranche with a positive EBITDA multiple",
                ));
            } else {
                unscaled.iter().map(|a| a * target / unscaled_total).collect()
            }
        }
        None => unscaled,
    };

    let allocations: Vec<TrancheAllocation> = tranches
        .iter()
        .zip(&amounts)
        .map(|(t, amount)| TrancheAllocation {
            name: t.name.clone(),
            amount: *amount,
            ebitda_multiple: amount / ebitda,
            interest_rate: t.interest_rate,
            seniority: t.seniority,
            amortization_pct: t.amortization_pct.unwrap_or(Decimal::ZERO),
        })
        .collect();

    let total_debt: Money = amounts.iter().sum();
    let transaction_fees = purchase_price * fees.transaction_fee_pct.unwrap_or(Decimal::ZERO);
    let financing_fees = total_debt * fees.financing_fee_pct.unwrap_or(Decimal::ZERO);
    let total_uses = purchase_price + transaction_fees + financing_fees;
    let equity_contribution = total_uses - total_debt;

    if equity_contribution <= Decimal::ZERO {
        return Err(AnalystError::Domain(format!(
            "Debt ({total_debt}) covers total uses ({total_uses}); equity contribution must be positive"
        )));
    }

    let mut sources: Vec<(String, Money)> = allocations
        .iter()
        .map(|a| (a.name.clone(), a.amount))
        .collect();
    sources.push(("Sponsor Equity".into(), equity_contribution));

    let mut uses = vec![("Purchase Price".to_string(), purchase_price)];
    if transaction_fees > Decimal::ZERO {
        uses.push(("Transaction Fees".into(), transaction_fees));
    }
    if financing_fees > Decimal::ZERO {
        uses.push(("Financing Fees".into(), financing_fees));
    }

    Ok(TransactionStructure {
        purchase_price,
        entry_multiple: purchase_price / ebitda,
        tranches: allocations,
        total_debt,
        transaction_fees,
        financing_fees,
        total_uses,
        equity_contribution,
        leverage_multiple: total_debt / ebitda,
        equity_pct: equity_contribution / total_uses,
        sources,
        uses,
    })
}

fn validate_tranches(tranches: &[TrancheSpec]) -> AnalystResult<()> {
    for t in tranches {
        let field = |f: &str| format!("debt.tranches[{}].{f}", t.name);
        if t.ebitda_multiple < Decimal::ZERO {
            return Err(AnalystError::invalid(
                &field("ebitda_multiple"),
                "EBITDA multiple cannot be negative",
            ));
        }
        if t.interest_rate < Decimal::ZERO || t.interest_rate > dec!(1) {
            return Err(AnalystError::invalid(
                &field("interest_rate"),
                "Interest rate must be in [0, 1]",
            ));
        }
        if let Some(a) = t.amortization_pct {
            if a < Decimal::ZERO || a > Decimal::ONE {
                return Err(AnalystError::invalid(
                    &field("amortization_pct"),
                    "Amortisation must be in [0, 1]",
                ));
            }
        }
    }
    Ok(())
}
