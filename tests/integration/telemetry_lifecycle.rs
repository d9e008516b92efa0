//! Telemetry and exporter lifecycle integration tests

use expense_tracker::ledger::{FinancialRecord, RecordDate, TransactionKind};
use expense_tracker::metrics::{InstrumentKind, MetricRegistry};
use expense_tracker::telemetry::{self, StructuredLogger, Telemetry};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

use crate::{local_app, local_config};

fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    write!(stream, "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

/// Test the process-wide service is built once
#[test]
fn test_global_init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = local_config(&dir.path().join("despesas.csv"));

    let first = telemetry::init(&config);
    let second = telemetry::init(&config);

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &telemetry::global().unwrap()));
}

/// Test 100 concurrent starts share one listener
#[test]
fn test_concurrent_start_once() {
    let dir = TempDir::new().unwrap();
    let config = local_config(&dir.path().join("despesas.csv"));
    let logger = StructuredLogger::with_sink(config.service.clone(), std::io::sink());
    let telemetry = Arc::new(Telemetry::with_logger(&config, logger));

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let telemetry = telemetry.clone();
            thread::spawn(move || telemetry.start_exporter())
        })
        .collect();

    let mut addrs: Vec<SocketAddr> = handles
        .into_iter()
        .map(|h| h.join().unwrap().expect("start should succeed"))
        .collect();
    addrs.dedup();
    assert_eq!(addrs.len(), 1);
    assert!(telemetry.health().is_healthy());
}

/// Test re-registration returns the original instrument
#[test]
fn test_registration_is_idempotent() {
    let registry = MetricRegistry::new();
    let first = registry.get_or_create(InstrumentKind::Counter, "despesas_total", "first", &["categoria"]);
    let second = registry.get_or_create(InstrumentKind::Gauge, "despesas_total", "second", &[]);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.description(), "first");
    assert_eq!(second.kind(), InstrumentKind::Counter);
    assert_eq!(registry.len(), 1);
}

/// Test a scrape reflects a submission
#[test]
fn test_scrape_after_submit() {
    let dir = TempDir::new().unwrap();
    let app = local_app(&dir.path().join("despesas.csv"));
    app.load();
    app.submit(FinancialRecord::new(
        RecordDate::from_raw("01/03/2024"),
        "Bus",
        "Transporte",
        4.5,
        TransactionKind::Expense,
    ))
    .unwrap();

    let addr = app.telemetry().start_exporter().unwrap();

    let metrics = get(addr, "/metrics");
    assert!(metrics.starts_with("HTTP/1.1 200"));
    assert!(metrics.contains("despesas_adicionadas_total{categoria=\"Transporte\",tipo=\"Despesa\"} 1"));
    assert!(metrics.contains("app_health 1"));

    let health = get(addr, "/health");
    assert!(health.starts_with("HTTP/1.1 200"));
    assert!(health.contains("\"healthy\":true"));

    assert!(get(addr, "/nope").starts_with("HTTP/1.1 404"));
}
