//! Error taxonomy
//!
//! Every failure the core can produce. All of them are contained at the
//! application boundary; none is allowed to end the interactive flow.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a submitted record is rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("description must not be empty")]
    EmptyDescription,

    #[error("category must not be empty")]
    EmptyCategory,

    #[error("amount must be greater than zero (got {0})")]
    NonPositiveAmount(f64),

    #[error("amount must have at most two decimal places (got {0})")]
    SubCentAmount(f64),

    #[error("unsupported transaction type {0:?}")]
    UnsupportedKind(String),
}

#[derive(Debug, Error)]
pub enum Error {
    /// The ledger file exists but could not be read or parsed
    #[error("failed to load ledger from {}: {reason}", path.display())]
    DataLoad { path: PathBuf, reason: String },

    #[error("invalid record: {0}")]
    Validation(#[from] ValidationError),

    /// The ledger could not be written back to disk
    #[error("failed to persist ledger to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics exporter failed to start on {addr}: {source}")]
    ExporterStart {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Collector unreachable or telemetry settings unusable
    #[error("telemetry misconfigured: {0}")]
    TelemetryConfig(String),
}

impl Error {
    /// Stable short code, used as a log field
    pub fn code(&self) -> &'static str {
        match self {
            Error::DataLoad { .. } => "DATA_LOAD",
            Error::Validation(_) => "VALIDATION",
            Error::Persist { .. } => "PERSIST",
            Error::ExporterStart { .. } => "EXPORTER_START",
            Error::TelemetryConfig(_) => "TELEMETRY_CONFIG",
        }
    }

    /// Readable sentence for the interaction surface
    pub fn user_message(&self) -> String {
        match self {
            Error::DataLoad { .. } => {
                "The ledger file could not be read. Showing an empty ledger; new records are \
                 blocked until the file is fixed."
                    .to_string()
            }
            Error::Validation(reason) => format!("Record rejected: {reason}."),
            Error::Persist { .. } => {
                "The record could not be saved. Nothing was changed; please try again.".to_string()
            }
            Error::ExporterStart { addr, .. } => {
                format!("Metrics export is unavailable (could not listen on {addr}).")
            }
            Error::TelemetryConfig(_) => {
                "Telemetry is running in local-only mode.".to_string()
            }
        }
    }

    /// Whether this failure should mark the application unhealthy
    pub fn affects_health(&self) -> bool {
        matches!(self, Error::DataLoad { .. } | Error::ExporterStart { .. })
    }
}
