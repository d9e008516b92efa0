//! Financial records and the ledger value

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

use crate::error::ValidationError;

/// Date format used by the ledger file
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Ledger file columns, in order
pub const COLUMNS: [&str; 5] = ["Data", "Descrição", "Categoria", "Valor", "Tipo"];

/// Categories offered before the ledger contributes its own
pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "Alimentação",
    "Transporte",
    "Entretenimento",
    "Serviços",
    "Compras",
    "Outros",
];

/// Float noise allowed when checking an amount is a whole number of cents
const CENT_TOLERANCE: f64 = 1e-6;

/// Record date as written in the ledger file (`DD/MM/YYYY`)
///
/// The text is kept verbatim so rows with malformed dates survive a load
/// and a rewrite untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordDate(String);

impl RecordDate {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the calendar date, `None` when malformed
    pub fn parse(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.0.trim(), DATE_FORMAT).ok()
    }
}

impl From<NaiveDate> for RecordDate {
    fn from(date: NaiveDate) -> Self {
        Self(date.format(DATE_FORMAT).to_string())
    }
}

impl std::fmt::Display for RecordDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction type (`Tipo` column)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionKind {
    /// `Despesa`
    Expense,
    /// `Receita`
    Income,
    /// Any other literal found in a loaded file
    Unrecognized(String),
}

impl TransactionKind {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionKind::Expense => "Despesa",
            TransactionKind::Income => "Receita",
            TransactionKind::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for TransactionKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Despesa" => TransactionKind::Expense,
            "Receita" => TransactionKind::Income,
            _ => TransactionKind::Unrecognized(raw),
        }
    }
}

impl From<TransactionKind> for String {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Unrecognized(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One ledger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    #[serde(rename = "Data")]
    pub date: RecordDate,

    #[serde(rename = "Descrição")]
    pub description: String,

    #[serde(rename = "Categoria")]
    pub category: String,

    #[serde(rename = "Valor", serialize_with = "serialize_amount")]
    pub amount: f64,

    #[serde(rename = "Tipo")]
    pub kind: TransactionKind,
}

/// Amounts are written with two decimals so a rewrite is byte stable
fn serialize_amount<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.2}", amount))
}

impl FinancialRecord {
    pub fn new(
        date: impl Into<RecordDate>,
        description: impl Into<String>,
        category: impl Into<String>,
        amount: f64,
        kind: TransactionKind,
    ) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            category: category.into(),
            amount,
            kind,
        }
    }

    /// Check the record may be appended to the ledger
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ValidationError::NonPositiveAmount(self.amount));
        }
        // The file stores cents; anything finer would not survive a reload
        let cents = self.amount * 100.0;
        if (cents - cents.round()).abs() > CENT_TOLERANCE {
            return Err(ValidationError::SubCentAmount(self.amount));
        }
        if let TransactionKind::Unrecognized(raw) = &self.kind {
            return Err(ValidationError::UnsupportedKind(raw.clone()));
        }
        Ok(())
    }

    /// The record with its amount rounded to whole cents, as it is stored
    pub fn normalized(mut self) -> Self {
        self.amount = (self.amount * 100.0).round() / 100.0;
        self
    }
}

/// Immutable, cheaply cloned snapshot of the ordered record sequence
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Arc<Vec<FinancialRecord>>,
}

impl Ledger {
    pub fn new(records: Vec<FinancialRecord>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    pub fn records(&self) -> &[FinancialRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FinancialRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// New ledger with `record` at the end; `self` is left as it was
    pub fn appended(&self, record: FinancialRecord) -> Ledger {
        let mut records = Vec::with_capacity(self.records.len() + 1);
        records.extend(self.records.iter().cloned());
        records.push(record);
        Ledger::new(records)
    }

    /// Categories in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for record in self.records.iter() {
            if !seen.contains(&record.category.as_str()) {
                seen.push(&record.category);
            }
        }
        seen
    }
}

impl FromIterator<FinancialRecord> for Ledger {
    fn from_iter<I: IntoIterator<Item = FinancialRecord>>(iter: I) -> Self {
        Ledger::new(iter.into_iter().collect())
    }
}

/// Default categories merged with the ones used in `ledger`, sorted
pub fn known_categories(ledger: &Ledger) -> Vec<String> {
    let mut categories: Vec<String> = DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect();
    for category in ledger.categories() {
        if !categories.iter().any(|c| c == category) {
            categories.push(category.to_string());
        }
    }
    categories.sort();
    categories
}
