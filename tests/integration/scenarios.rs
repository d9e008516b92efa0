//! End-to-end ledger scenarios through the application handlers

use chrono::NaiveDate;
use expense_tracker::aggregate::{filter_at, KindFilter, LedgerFilter, Period};
use expense_tracker::ledger::{FinancialRecord, Ledger, RecordDate, TransactionKind};
use tempfile::TempDir;

use crate::{local_app, sample};

fn record(date: &str, description: &str, category: &str, amount: f64, kind: TransactionKind) -> FinancialRecord {
    FinancialRecord::new(RecordDate::from_raw(date), description, category, amount, kind)
}

#[test]
fn test_totals_scenario() {
    let dir = TempDir::new().unwrap();
    let app = local_app(&dir.path().join("despesas.csv"));
    app.load();

    app.submit(record("01/03/2024", "Lunch", "Alimentação", 20.0, TransactionKind::Expense))
        .unwrap();
    app.submit(record("02/03/2024", "Salary", "Outros", 1000.0, TransactionKind::Income))
        .unwrap();

    let totals = app.summary();
    assert_eq!(totals.expense, 20.0);
    assert_eq!(totals.income, 1000.0);
    assert_eq!(totals.balance, 980.0);
    assert_eq!(totals.expense + totals.balance, totals.income);

    let rendered = app.telemetry().registry().render();
    assert_eq!(sample(&rendered, "total_despesas_reais"), Some(20.0));
    assert_eq!(sample(&rendered, "total_receitas_reais"), Some(1000.0));
    assert_eq!(sample(&rendered, "saldo_atual_reais"), Some(980.0));
}

#[test]
fn test_breakdown_scenario() {
    let dir = TempDir::new().unwrap();
    let app = local_app(&dir.path().join("despesas.csv"));
    app.load();

    for (description, category, amount) in [
        ("Lunch", "Alimentação", 20.0),
        ("Bus", "Transporte", 50.0),
        ("Dinner", "Alimentação", 30.0),
    ] {
        app.submit(record("05/03/2024", description, category, amount, TransactionKind::Expense))
            .unwrap();
    }

    let shares = app.analysis(LedgerFilter::default());
    let flat: Vec<(&str, f64, f64)> = shares
        .iter()
        .map(|s| (s.category.as_str(), s.total, s.percentage))
        .collect();
    assert_eq!(
        flat,
        vec![("Alimentação", 50.0, 50.0), ("Transporte", 50.0, 50.0)]
    );

    let rendered = app.telemetry().registry().render();
    assert_eq!(
        sample(&rendered, "registros_por_categoria{categoria=\"Alimentação\"}"),
        Some(2.0)
    );
    assert_eq!(sample(&rendered, "registros_totais"), Some(3.0));
}

#[test]
fn test_current_month_filter_scenario() {
    let ledger: Ledger = vec![
        record("10/03/2024", "This month", "Alimentação", 20.0, TransactionKind::Expense),
        record("28/02/2024", "Last month", "Alimentação", 30.0, TransactionKind::Expense),
        record("not a date", "Broken", "Outros", 40.0, TransactionKind::Expense),
    ]
    .into_iter()
    .collect();
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

    let current = filter_at(&ledger, Period::CurrentMonth, KindFilter::Both, today);
    assert_eq!(current.len(), 1);
    assert_eq!(current.records()[0].description, "This month");

    let everything = filter_at(&ledger, Period::All, KindFilter::Both, today);
    assert_eq!(everything.len(), 3);
}

#[test]
fn test_reload_sees_external_edit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("despesas.csv");
    let app = local_app(&path);
    app.load();
    app.submit(record("01/03/2024", "Lunch", "Alimentação", 20.0, TransactionKind::Expense))
        .unwrap();

    std::fs::write(
        &path,
        "Data,Descrição,Categoria,Valor,Tipo\n01/03/2024,Rent,Serviços,900.00,Despesa\n",
    )
    .unwrap();
    let totals = app.refresh();

    assert_eq!(totals.expense, 900.0);
    let rendered = app.telemetry().registry().render();
    assert_eq!(
        sample(&rendered, "registros_por_categoria{categoria=\"Alimentação\"}"),
        Some(0.0)
    );
    assert_eq!(
        sample(&rendered, "registros_por_categoria{categoria=\"Serviços\"}"),
        Some(1.0)
    );
}
