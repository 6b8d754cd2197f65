use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

use super::transaction::TrancheAllocation;

/// One tranche in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranchePeriod {
    pub tranche: String,
    pub opening_balance: Money,
    pub interest: Money,
    pub scheduled_repayment: Money,
    pub sweep_repayment: Money,
    pub closing_balance: Money,
}

/// All tranches in one period, in sweep (seniority) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtSchedulePeriod {
    pub period: u32,
    pub tranches: Vec<TranchePeriod>,
    pub total_opening: Money,
    pub total_interest: Money,
    pub total_repayment: Money,
    pub total_closing: Money,
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    name: String,
    original: Money,
    balance: Money,
    rate: Rate,
    amortization_pct: Rate,
}

/// Running tranche balances across the hold period.
///
/// Entries are kept in ascending seniority so iteration order is sweep
/// order. Balances never go below zero; a repayment larger than the balance
/// is capped and the excess stays with the company as cash.
#[derive(Debug, Clone)]
pub struct DebtLedger {
    entries: Vec<LedgerEntry>,
}

/// Cash movements from servicing one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Servicing {
    pub scheduled: Money,
    pub swept: Money,
}

impl DebtLedger {
    pub fn new(tranches: &[TrancheAllocation]) -> Self {
        let mut sorted: Vec<&TrancheAllocation> = tranches.iter().collect();
        // Stable: equal seniority keeps input order.
        sorted.sort_by_key(|t| t.seniority);
        Self {
            entries: sorted
                .into_iter()
                .map(|t| LedgerEntry {
                    name: t.name.clone(),
                    original: t.amount,
                    balance: t.amount,
                    rate: t.interest_rate,
                    amortization_pct: t.amortization_pct,
                })
                .collect(),
        }
    }

    pub fn total_balance(&self) -> Money {
        self.entries.iter().map(|e| e.balance).sum()
    }

    /// Interest due on the current (opening) balances.
    pub fn interest_due(&self) -> Money {
        self.entries.iter().map(|e| e.balance * e.rate).sum()
    }

    /// Pay scheduled amortisation, then sweep `sweep_cash` against the most
    /// senior outstanding tranche first. Returns the period's schedule and
    /// the amounts actually paid.
    pub fn service(&mut self, period: u32, sweep_cash: Money) -> (DebtSchedulePeriod, Servicing) {
        let mut rows: Vec<TranchePeriod> = self
            .entries
            .iter_mut()
            .map(|e| {
                let opening = e.balance;
                let interest = opening * e.rate;
                let scheduled = (e.original * e.amortization_pct).min(opening);
                e.balance = opening - scheduled;
                TranchePeriod {
                    tranche: e.name.clone(),
                    opening_balance: opening,
                    interest,
                    scheduled_repayment: scheduled,
                    sweep_repayment: Decimal::ZERO,
                    closing_balance: e.balance,
                }
            })
            .collect();

        let mut remaining = sweep_cash.max(Decimal::ZERO);
        for (entry, row) in self.entries.iter_mut().zip(rows.iter_mut()) {
            if remaining <= Decimal::ZERO {
                break;
            }
            let paydown = remaining.min(entry.balance);
            entry.balance -= paydown;
            remaining -= paydown;
            row.sweep_repayment = paydown;
            row.closing_balance = entry.balance;
        }

        let scheduled: Money = rows.iter().map(|r| r.scheduled_repayment).sum();
        let swept: Money = rows.iter().map(|r| r.sweep_repayment).sum();
        let period_row = DebtSchedulePeriod {
            period,
            total_opening: rows.iter().map(|r| r.opening_balance).sum(),
            total_interest: rows.iter().map(|r| r.interest).sum(),
            total_repayment: scheduled + swept,
            total_closing: rows.iter().map(|r| r.closing_balance).sum(),
            tranches: rows,
        };
        (period_row, Servicing { scheduled, swept })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn allocations() -> Vec<TrancheAllocation> {
        vec![
            TrancheAllocation {
                name: "Mezzanine".into(),
                amount: dec!(200),
                ebitda_multiple: dec!(2),
                interest_rate: dec!(0.12),
                seniority: 3,
                amortization_pct: dec!(0),
            },
            TrancheAllocation {
                name: "Senior A".into(),
                amount: dec!(300),
                ebitda_multiple: dec!(3),
                interest_rate: dec!(0.06),
                seniority: 1,
                amortization_pct: dec!(0.05),
            },
        ]
    }

    #[test]
    fn test_ledger_orders_by_seniority() {
        let mut ledger = DebtLedger::new(&allocations());
        let (row, _) = ledger.service(1, dec!(0));
        assert_eq!(row.tranches[0].tranche, "Senior A");
        assert_eq!(row.tranches[1].tranche, "Mezzanine");
    }

    #[test]
    fn test_interest_on_opening_balance() {
        let ledger = DebtLedger::new(&allocations());
        // 300 × 6% + 200 × 12%
        assert_eq!(ledger.interest_due(), dec!(42));
    }

    #[test]
    fn test_sweep_pays_senior_first() {
        let mut ledger = DebtLedger::new(&allocations());
        let (row, paid) = ledger.service(1, dec!(100));
        // Scheduled 15 on senior, then 100 swept against the remaining 285
        assert_eq!(paid.scheduled, dec!(15));
        assert_eq!(paid.swept, dec!(100));
        assert_eq!(row.tranches[0].closing_balance, dec!(185));
        assert_eq!(row.tranches[1].closing_balance, dec!(200));
    }

    #[test]
    fn test_overpayment_floors_at_zero() {
        let mut ledger = DebtLedger::new(&allocations());
        let (row, paid) = ledger.service(1, dec!(1000));
        assert_eq!(paid.swept, dec!(485));
        assert_eq!(row.total_closing, dec!(0));
        assert!(row.tranches.iter().all(|t| t.closing_balance >= dec!(0)));
    }

    #[test]
    fn test_closing_rolls_to_next_opening() {
        let mut ledger = DebtLedger::new(&allocations());
        let (first, _) = ledger.service(1, dec!(50));
        let (second, _) = ledger.service(2, dec!(50));
        for (a, b) in first.tranches.iter().zip(&second.tranches) {
            assert_eq!(a.closing_balance, b.opening_balance);
        }
    }
}
