//! Record listing: category selection and ordering

use std::cmp::Ordering;

use super::record::{FinancialRecord, Ledger};

/// Listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recent date first
    #[default]
    DateNewest,
    DateOldest,
    AmountHighest,
    AmountLowest,
}

/// Which records to list and how
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Categories to keep; empty keeps everything
    pub categories: Vec<String>,
    pub order: SortOrder,
}

impl RecordQuery {
    /// Apply the query to a snapshot
    ///
    /// Sorting is stable. Rows whose date cannot be parsed go last in both
    /// date orders.
    pub fn apply(&self, ledger: &Ledger) -> Vec<FinancialRecord> {
        let mut rows: Vec<FinancialRecord> = ledger
            .iter()
            .filter(|r| self.categories.is_empty() || self.categories.contains(&r.category))
            .cloned()
            .collect();

        match self.order {
            SortOrder::DateNewest => rows.sort_by(|a, b| compare_dates(a, b, true)),
            SortOrder::DateOldest => rows.sort_by(|a, b| compare_dates(a, b, false)),
            SortOrder::AmountHighest => rows.sort_by(|a, b| b.amount.total_cmp(&a.amount)),
            SortOrder::AmountLowest => rows.sort_by(|a, b| a.amount.total_cmp(&b.amount)),
        }

        rows
    }
}

fn compare_dates(a: &FinancialRecord, b: &FinancialRecord, newest_first: bool) -> Ordering {
    match (a.date.parse(), b.date.parse()) {
        (Some(x), Some(y)) if newest_first => y.cmp(&x),
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::record::{RecordDate, TransactionKind};

    fn row(date: &str, category: &str, amount: f64) -> FinancialRecord {
        FinancialRecord::new(
            RecordDate::from_raw(date),
            format!("{category} {amount}"),
            category,
            amount,
            TransactionKind::Expense,
        )
    }

    fn ledger() -> Ledger {
        vec![
            row("05/01/2024", "Alimentação", 20.0),
            row("??", "Transporte", 15.0),
            row("20/02/2024", "Alimentação", 8.0),
            row("01/12/2023", "Compras", 99.0),
        ]
        .into_iter()
        .collect()
    }

    fn amounts(rows: &[FinancialRecord]) -> Vec<f64> {
        rows.iter().map(|r| r.amount).collect()
    }

    #[test]
    fn test_date_orders_put_malformed_last() {
        let newest = RecordQuery::default().apply(&ledger());
        assert_eq!(amounts(&newest), vec![8.0, 20.0, 99.0, 15.0]);

        let oldest = RecordQuery {
            order: SortOrder::DateOldest,
            ..Default::default()
        }
        .apply(&ledger());
        assert_eq!(amounts(&oldest), vec![99.0, 20.0, 8.0, 15.0]);
    }

    #[test]
    fn test_category_selection_and_amount_order() {
        let query = RecordQuery {
            categories: vec!["Alimentação".into(), "Compras".into()],
            order: SortOrder::AmountLowest,
        };
        assert_eq!(amounts(&query.apply(&ledger())), vec![8.0, 20.0, 99.0]);

        let query = RecordQuery {
            order: SortOrder::AmountHighest,
            ..Default::default()
        };
        assert_eq!(amounts(&query.apply(&ledger())), vec![99.0, 20.0, 15.0, 8.0]);
    }
}
