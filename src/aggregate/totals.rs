//! Totals by transaction kind

use serde::Serialize;

use crate::ledger::{Ledger, TransactionKind};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Totals {
    pub expense: f64,
    pub income: f64,
    /// `income - expense`
    pub balance: f64,
}

/// Sum expenses and income; unrecognized kinds count toward neither
pub fn compute_totals(ledger: &Ledger) -> Totals {
    let (expense, income) = ledger
        .iter()
        .fold((0.0, 0.0), |(expense, income), record| match record.kind {
            TransactionKind::Expense => (expense + record.amount, income),
            TransactionKind::Income => (expense, income + record.amount),
            TransactionKind::Unrecognized(_) => (expense, income),
        });

    Totals {
        expense,
        income,
        balance: income - expense,
    }
}
