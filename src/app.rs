//! Application context
//!
//! Wires the record store, the aggregator and telemetry together. Every
//! handler runs inside an instrumented operation and contains failures at
//! this boundary: they are logged once, may degrade health, and are
//! returned to the caller as values.

use opentelemetry::KeyValue;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::aggregate::{compute_totals, Aggregator, CategoryShare, LedgerFilter, Totals};
use crate::config::Config;
use crate::error::Result;
use crate::ledger::{known_categories, FinancialRecord, Ledger, RecordQuery, RecordStore, TransactionKind};
use crate::metrics::HealthComponent;
use crate::telemetry::{self, record_failure, Telemetry};

/// What a successful add hands back to the surface
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub record: FinancialRecord,
    pub totals: Totals,
}

pub struct App {
    config: Config,
    store: RecordStore,
    telemetry: Arc<Telemetry>,
    aggregator: Aggregator,
}

impl App {
    /// Handler object over an existing telemetry service; nothing is loaded
    pub fn new(config: Config, telemetry: Arc<Telemetry>) -> Self {
        let store = RecordStore::new(config.ledger.path.clone());
        let aggregator = Aggregator::new(telemetry.instruments().clone());
        Self {
            config,
            store,
            telemetry,
            aggregator,
        }
    }

    /// One-time process initialization: global telemetry plus the first load
    pub fn bootstrap(config: Config) -> Self {
        let telemetry = telemetry::init(&config);
        let app = Self::new(config, telemetry);
        app.load();
        app
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Read the ledger file and publish its metrics
    ///
    /// An unreadable file leaves an empty ledger and marks the application
    /// unhealthy until a later load succeeds.
    pub fn load(&self) -> Ledger {
        let telemetry = &self.telemetry;
        telemetry.in_span("load", |span| {
            let started = Instant::now();
            let report = self.store.load();
            telemetry
                .instruments()
                .load_duration
                .observe_duration(&[], started.elapsed());

            span.set_attribute(KeyValue::new("path", self.store.path().display().to_string()));
            span.set_attribute(KeyValue::new("registros", report.ledger.len() as i64));

            match &report.error {
                Some(error) => {
                    record_failure(span, error.to_string());
                    telemetry.report(error);
                }
                None => telemetry.health().set(HealthComponent::Data, true),
            }

            self.aggregator.refresh(&report.ledger);
            report.ledger
        })
    }

    /// Append a record, count it, then recompute derived metrics
    ///
    /// The receipt carries the record as stored, amount rounded to cents.
    pub fn submit(&self, record: FinancialRecord) -> Result<Submission> {
        let result: Result<Submission> = self.telemetry.with_span("mutate", |span| {
            span.set_attribute(KeyValue::new("categoria", record.category.clone()));
            span.set_attribute(KeyValue::new("tipo", record.kind.as_str().to_string()));
            span.set_attribute(KeyValue::new("valor", record.amount));

            record.validate()?;
            let record = record.normalized();
            let ledger = self.store.append(record.clone())?;
            self.count_added(&record);
            let totals = self.aggregator.compute_totals(&ledger);

            Ok(Submission { record, totals })
        });

        // with_span already logged the failure
        if let Err(error) = &result {
            self.telemetry.degrade(error);
        }
        result
    }

    /// Totals of the current ledger
    pub fn summary(&self) -> Totals {
        self.telemetry.in_span("compute", |span| {
            let ledger = self.store.snapshot();
            span.set_attribute(KeyValue::new("registros", ledger.len() as i64));
            self.aggregator.compute_totals(&ledger)
        })
    }

    /// Category breakdown of the filtered ledger
    pub fn analysis(&self, selection: LedgerFilter) -> Vec<CategoryShare> {
        self.telemetry.in_span("compute", |span| {
            span.set_attribute(KeyValue::new("periodo", format!("{:?}", selection.period)));
            span.set_attribute(KeyValue::new("tipo", format!("{:?}", selection.kind)));
            let shares = self.aggregator.category_breakdown(&self.store.snapshot(), selection);
            span.set_attribute(KeyValue::new("categorias", shares.len() as i64));
            shares
        })
    }

    /// Records matching `query`, in its order
    pub fn records(&self, query: &RecordQuery) -> Vec<FinancialRecord> {
        self.telemetry.in_span("render", |span| {
            let records = query.apply(&self.store.snapshot());
            span.set_attribute(KeyValue::new("registros", records.len() as i64));
            records
        })
    }

    /// Categories offered for a new record
    pub fn categories(&self) -> Vec<String> {
        known_categories(&self.store.snapshot())
    }

    /// Reload the ledger from disk and republish everything derived from it
    pub fn refresh(&self) -> Totals {
        compute_totals(&self.load())
    }

    fn count_added(&self, record: &FinancialRecord) {
        let instruments = self.telemetry.instruments();
        match record.kind {
            TransactionKind::Expense => instruments
                .expenses_added
                .increment(&[record.category.as_str(), record.kind.as_str()], 1),
            TransactionKind::Income => instruments
                .income_added
                .increment(&[record.category.as_str()], 1),
            // rejected by validation before reaching here
            TransactionKind::Unrecognized(_) => {}
        }
    }
}
