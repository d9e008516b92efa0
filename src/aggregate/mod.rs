//! Derived ledger metrics
//!
//! Pure computations over a ledger snapshot, plus the [`Aggregator`] that
//! pushes every result into the metric registry.

mod breakdown;
mod filter;
mod totals;

pub use breakdown::{breakdown, CategoryShare};
pub use filter::{filter, filter_at, KindFilter, LedgerFilter, Period};
pub use totals::{compute_totals, Totals};

use parking_lot::Mutex;
use tracing::debug;

use crate::ledger::Ledger;
use crate::metrics::Instruments;

/// Computes ledger metrics and publishes them as gauges
///
/// Publishing only uses absolute sets and is serialized, so gauges always
/// describe one snapshot and repeating a call on the same ledger changes
/// nothing.
pub struct Aggregator {
    instruments: Instruments,
    /// Category label values published so far
    published: Mutex<Vec<String>>,
}

impl Aggregator {
    pub fn new(instruments: Instruments) -> Self {
        Self {
            instruments,
            published: Mutex::new(Vec::new()),
        }
    }

    /// Totals of the whole ledger; publishes totals and record counts
    pub fn compute_totals(&self, ledger: &Ledger) -> Totals {
        let totals = compute_totals(ledger);
        self.publish(ledger, &totals);
        totals
    }

    /// Breakdown of the filtered ledger
    ///
    /// Gauges always describe the full `ledger`, not the filtered view.
    pub fn category_breakdown(&self, ledger: &Ledger, selection: LedgerFilter) -> Vec<CategoryShare> {
        self.publish(ledger, &compute_totals(ledger));
        let subset = filter(ledger, selection.period, selection.kind);
        breakdown(&subset)
    }

    /// Publish everything derived from `ledger`
    pub fn refresh(&self, ledger: &Ledger) -> Totals {
        self.compute_totals(ledger)
    }

    fn publish(&self, ledger: &Ledger, totals: &Totals) {
        let mut published = self.published.lock();

        self.instruments.total_expenses.set(&[], totals.expense);
        self.instruments.total_income.set(&[], totals.income);
        self.instruments.balance.set(&[], totals.balance);
        self.instruments.record_count.set(&[], ledger.len() as f64);

        let mut counts: Vec<(&str, usize)> = Vec::new();
        for record in ledger.iter() {
            match counts.iter_mut().find(|(c, _)| *c == record.category) {
                Some((_, n)) => *n += 1,
                None => counts.push((record.category.as_str(), 1)),
            }
        }

        for (category, count) in &counts {
            self.instruments
                .records_by_category
                .set(&[*category], *count as f64);
        }
        for stale in published.iter() {
            if !counts.iter().any(|(c, _)| *c == stale.as_str()) {
                self.instruments.records_by_category.set(&[stale.as_str()], 0.0);
            }
        }

        published.retain(|c| !counts.iter().any(|(seen, _)| *seen == c.as_str()));
        published.extend(counts.iter().map(|(c, _)| c.to_string()));

        debug!(
            records = ledger.len(),
            categories = counts.len(),
            balance = totals.balance,
            "Ledger metrics published"
        );
    }
}
