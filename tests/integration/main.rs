//! Integration tests

mod ledger_round_trip;
mod scenarios;
mod telemetry_lifecycle;

pub use expense_tracker::metrics::sample;
use expense_tracker::telemetry::{StructuredLogger, Telemetry};
use expense_tracker::{App, Config};
use std::path::Path;
use std::sync::Arc;

/// Config bound to loopback on an ephemeral port with span export off
pub fn local_config(ledger: &Path) -> Config {
    let mut config = Config::default();
    config.ledger.path = ledger.to_path_buf();
    config.metrics.host = [127, 0, 0, 1].into();
    config.metrics.port = 0;
    config.tracing.collector_endpoint = String::new();
    config
}

/// App over its own telemetry instance, structured logs discarded
pub fn local_app(ledger: &Path) -> App {
    let config = local_config(ledger);
    let logger = StructuredLogger::with_sink(config.service.clone(), std::io::sink());
    let telemetry = Arc::new(Telemetry::with_logger(&config, logger));
    App::new(config, telemetry)
}
