//! Metrics and health
//!
//! Idempotent instrument registry backed by a Prometheus recorder, the
//! catalogue of published instruments and the pull endpoint.

mod catalog;
mod exporter;
mod health;
mod registry;

pub use catalog::*;
pub use exporter::MetricsExporter;
pub use health::{Health, HealthComponent};
pub use registry::{
    sample, Instrument, InstrumentHandle, InstrumentKind, MetricRegistry, DURATION_BUCKETS,
};

