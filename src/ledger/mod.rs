//! Ledger of financial records
//!
//! Record model, the CSV-backed store and listing queries.

mod query;
mod record;
mod store;

pub use query::{RecordQuery, SortOrder};
pub use record::{
    known_categories, FinancialRecord, Ledger, RecordDate, TransactionKind, COLUMNS,
    DATE_FORMAT, DEFAULT_CATEGORIES,
};
pub use store::{read_ledger, write_ledger, write_ledger_to, LoadReport, RecordStore};
