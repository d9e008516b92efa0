//! Ledger persistence integration tests

use expense_tracker::ledger::{FinancialRecord, RecordDate, RecordStore, TransactionKind};
use tempfile::TempDir;

fn record(i: usize) -> FinancialRecord {
    let kind = if i % 3 == 0 {
        TransactionKind::Income
    } else {
        TransactionKind::Expense
    };
    FinancialRecord::new(
        RecordDate::from_raw(format!("{:02}/03/2024", i % 28 + 1)),
        format!("Compra, item \"{i}\""),
        ["Alimentação", "Transporte", "Serviços"][i % 3],
        i as f64 * 1.25 + 0.1,
        kind,
    )
}

/// Test N appends survive a reload and a rewrite byte for byte
#[test]
fn test_append_reload_rewrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("despesas_br.csv");

    let store = RecordStore::new(&path);
    assert!(store.load().error.is_none());
    for i in 0..25 {
        store.append(record(i)).unwrap();
    }
    let written = std::fs::read(&path).unwrap();

    let reopened = RecordStore::new(&path);
    let report = reopened.load();
    assert!(report.error.is_none());
    assert_eq!(report.ledger.len(), 25);
    assert_eq!(report.ledger.records()[3].description, "Compra, item \"3\"");
    assert_eq!(report.ledger.records()[3].kind, TransactionKind::Income);

    expense_tracker::ledger::write_ledger(&path, &report.ledger).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), written);
}

/// Test the header and number format of a fresh file
#[test]
fn test_file_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("despesas_br.csv");

    let store = RecordStore::new(&path);
    store.load();
    store
        .append(FinancialRecord::new(
            RecordDate::from_raw("05/02/2024"),
            "Lunch",
            "Alimentação",
            20.0,
            TransactionKind::Expense,
        ))
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "Data,Descrição,Categoria,Valor,Tipo\n05/02/2024,Lunch,Alimentação,20.00,Despesa\n"
    );
    assert!(!dir.path().join("despesas_br.csv.tmp").exists());
}

/// Test a ledger written by hand loads with its odd rows intact
#[test]
fn test_hand_written_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("despesas_br.csv");
    let contents = "Data,Descrição,Categoria,Valor,Tipo\n\
                    2024-01-05,Old row,Outros,10.00,Despesa\n\
                    06/01/2024,Refund,Compras,15.50,Estorno\n";
    std::fs::write(&path, contents).unwrap();

    let report = RecordStore::new(&path).load();
    assert!(report.error.is_none());
    assert_eq!(report.ledger.len(), 2);
    assert_eq!(report.ledger.records()[0].date.parse(), None);
    assert_eq!(
        report.ledger.records()[1].kind,
        TransactionKind::Unrecognized("Estorno".into())
    );
}
