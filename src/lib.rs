//! Expense Tracker - personal ledger with built-in observability
//!
//! A CSV-backed ledger of expenses and income, its derived totals and
//! category breakdowns, and the telemetry core that publishes them:
//! Prometheus metrics, correlated structured logs and operation spans.

pub mod aggregate;
pub mod app;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod telemetry;
pub mod util;

pub use app::{App, Submission};
pub use config::Config;
pub use error::{Error, Result};

/// Application version for display and the default identity
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
