//! Period and kind selection

use chrono::{Datelike, Local, Months, NaiveDate};

use crate::ledger::{FinancialRecord, Ledger, TransactionKind};

/// Time window, evaluated against today's date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    All,
    /// Same calendar month and year as today
    CurrentMonth,
    /// From three calendar months before today up to today, inclusive
    LastThreeMonths,
}

/// Transaction kinds to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    Both,
    Expenses,
    Income,
}

impl KindFilter {
    fn accepts(self, kind: &TransactionKind) -> bool {
        match self {
            KindFilter::Both => true,
            KindFilter::Expenses => *kind == TransactionKind::Expense,
            KindFilter::Income => *kind == TransactionKind::Income,
        }
    }
}

/// Combined selection used by the analysis view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerFilter {
    pub period: Period,
    pub kind: KindFilter,
}

impl LedgerFilter {
    pub fn new(period: Period, kind: KindFilter) -> Self {
        Self { period, kind }
    }
}

/// Subset of `ledger` matching `period` and `kind` as of the local date
pub fn filter(ledger: &Ledger, period: Period, kind: KindFilter) -> Ledger {
    filter_at(ledger, period, kind, Local::now().date_naive())
}

/// [`filter`] against an explicit `today`
///
/// When a period other than `All` is requested, records whose date cannot
/// be parsed are left out.
pub fn filter_at(ledger: &Ledger, period: Period, kind: KindFilter, today: NaiveDate) -> Ledger {
    ledger
        .iter()
        .filter(|record| kind.accepts(&record.kind))
        .filter(|record| in_period(record, period, today))
        .cloned()
        .collect()
}

fn in_period(record: &FinancialRecord, period: Period, today: NaiveDate) -> bool {
    if period == Period::All {
        return true;
    }
    let Some(date) = record.date.parse() else {
        return false;
    };
    match period {
        Period::All => true,
        Period::CurrentMonth => date.year() == today.year() && date.month() == today.month(),
        Period::LastThreeMonths => {
            let start = today
                .checked_sub_months(Months::new(3))
                .unwrap_or(NaiveDate::MIN);
            date >= start && date <= today
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::RecordDate;

    fn on(date: &str, kind: TransactionKind) -> FinancialRecord {
        FinancialRecord::new(RecordDate::from_raw(date), date, "Outros", 10.0, kind)
    }

    fn dates(ledger: &Ledger) -> Vec<&str> {
        ledger.iter().map(|r| r.date.as_str()).collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    #[test]
    fn test_current_month() {
        let ledger: Ledger = vec![
            on("01/05/2024", TransactionKind::Expense),
            on("30/04/2024", TransactionKind::Expense),
            on("31/05/2024", TransactionKind::Expense),
            on("15/05/2023", TransactionKind::Expense),
            on("not a date", TransactionKind::Expense),
        ]
        .into_iter()
        .collect();

        let selected = filter_at(&ledger, Period::CurrentMonth, KindFilter::Both, today());
        assert_eq!(dates(&selected), vec!["01/05/2024", "31/05/2024"]);
    }

    #[test]
    fn test_last_three_months_is_rolling() {
        let ledger: Ledger = vec![
            on("15/02/2024", TransactionKind::Expense),
            on("14/02/2024", TransactionKind::Expense),
            on("15/05/2024", TransactionKind::Expense),
            on("16/05/2024", TransactionKind::Expense),
            on("", TransactionKind::Expense),
        ]
        .into_iter()
        .collect();

        let selected = filter_at(&ledger, Period::LastThreeMonths, KindFilter::Both, today());
        assert_eq!(dates(&selected), vec!["15/02/2024", "15/05/2024"]);
    }

    #[test]
    fn test_all_keeps_malformed_dates() {
        let ledger: Ledger = vec![on("??", TransactionKind::Expense)].into_iter().collect();
        assert_eq!(filter_at(&ledger, Period::All, KindFilter::Both, today()).len(), 1);
    }

    #[test]
    fn test_kind_selection() {
        let ledger: Ledger = vec![
            on("01/05/2024", TransactionKind::Expense),
            on("02/05/2024", TransactionKind::Income),
            on("03/05/2024", TransactionKind::Unrecognized("Transfer".into())),
        ]
        .into_iter()
        .collect();

        let expenses = filter_at(&ledger, Period::All, KindFilter::Expenses, today());
        assert_eq!(dates(&expenses), vec!["01/05/2024"]);
        let income = filter_at(&ledger, Period::All, KindFilter::Income, today());
        assert_eq!(dates(&income), vec!["02/05/2024"]);
        assert_eq!(filter_at(&ledger, Period::All, KindFilter::Both, today()).len(), 3);
    }

    #[test]
    fn test_wall_clock_current_month() {
        let now = Local::now().date_naive();
        let previous = now.checked_sub_months(Months::new(1)).unwrap();
        let ledger: Ledger = vec![
            FinancialRecord::new(now, "today", "Outros", 1.0, TransactionKind::Expense),
            FinancialRecord::new(previous, "last month", "Outros", 1.0, TransactionKind::Expense),
            on("31/31/2024", TransactionKind::Expense),
        ]
        .into_iter()
        .collect();

        let selected = filter(&ledger, Period::CurrentMonth, KindFilter::Both);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected.records()[0].description, "today");
    }
}
