//! Per-category breakdown

use serde::Serialize;

use crate::ledger::Ledger;

/// One row of the breakdown table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub total: f64,
    /// Share of the grand total, 0-100, two decimals
    pub percentage: f64,
}

/// Group by category and rank by total
///
/// Ties keep first-seen category order. A zero grand total gives every row
/// a percentage of 0.
pub fn breakdown(ledger: &Ledger) -> Vec<CategoryShare> {
    let mut rows: Vec<CategoryShare> = Vec::new();
    for record in ledger.iter() {
        match rows.iter_mut().find(|row| row.category == record.category) {
            Some(row) => row.total += record.amount,
            None => rows.push(CategoryShare {
                category: record.category.clone(),
                total: record.amount,
                percentage: 0.0,
            }),
        }
    }

    // Stable sort preserves first-seen order among equal totals
    rows.sort_by(|a, b| b.total.total_cmp(&a.total));

    let grand_total: f64 = rows.iter().map(|row| row.total).sum();
    if grand_total > 0.0 {
        for row in &mut rows {
            row.percentage = round2(row.total / grand_total * 100.0);
        }
    }

    rows
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
