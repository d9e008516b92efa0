//! Observability service
//!
//! [`Telemetry`] owns every process-wide observability resource: the
//! metric registry and instruments, health, the pull endpoint, the
//! OpenTelemetry tracer provider and the structured log stream. [`init`]
//! builds it once per process and hands out the same instance on every
//! later call.

mod context;
mod export;
mod log;

pub use context::{current_span, record_failure, Severity, SpanIds};
pub use export::{
    build_tracer_provider, collector_addr, collector_url, service_resource, TRACER_NAME,
};
pub use log::StructuredLogger;

use once_cell::sync::OnceCell;
use opentelemetry_sdk::trace::SdkTracerProvider;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::Level;

use crate::config::{Config, ServiceIdentity};
use crate::error::Error;
use crate::metrics::{Health, HealthComponent, Instruments, MetricRegistry, MetricsExporter};

static GLOBAL: OnceCell<Arc<Telemetry>> = OnceCell::new();

/// Process-wide telemetry, built on first call
///
/// Later calls ignore `config` and return the existing instance.
pub fn init(config: &Config) -> Arc<Telemetry> {
    GLOBAL
        .get_or_init(|| Arc::new(Telemetry::new(config)))
        .clone()
}

/// The instance built by [`init`], if any
pub fn global() -> Option<Arc<Telemetry>> {
    GLOBAL.get().cloned()
}

pub struct Telemetry {
    identity: ServiceIdentity,
    registry: Arc<MetricRegistry>,
    instruments: Instruments,
    health: Arc<Health>,
    exporter: MetricsExporter,
    tracer_provider: SdkTracerProvider,
    logger: StructuredLogger,
}

impl Telemetry {
    /// Standalone instance logging to standard output
    pub fn new(config: &Config) -> Self {
        Self::with_logger(config, StructuredLogger::stdout(config.service.clone()))
    }

    /// Standalone instance with a custom log sink
    pub fn with_logger(config: &Config, logger: StructuredLogger) -> Self {
        let (tracer_provider, span_error) =
            build_tracer_provider(&config.tracing, &config.service);
        let telemetry = Self::with_tracer_provider(config, logger, tracer_provider);
        if let Some(error) = span_error {
            telemetry.report(&error);
        }
        telemetry
    }

    /// Standalone instance over an existing tracer provider
    pub fn with_tracer_provider(
        config: &Config,
        logger: StructuredLogger,
        tracer_provider: SdkTracerProvider,
    ) -> Self {
        let registry = Arc::new(MetricRegistry::new());
        let instruments = Instruments::register(&registry);
        let health = Arc::new(Health::new(instruments.app_health.clone()));
        let exporter =
            MetricsExporter::new(config.metrics.bind_addr(), registry.handle(), health.clone());

        let identity = config.service.clone();
        instruments.app_info.set_info(&[
            ("service", identity.name.as_str()),
            ("environment", identity.environment.as_str()),
            ("version", identity.version.as_str()),
            ("instance_id", identity.instance_id.as_str()),
        ]);

        let telemetry = Self {
            identity,
            registry,
            instruments,
            health,
            exporter,
            tracer_provider,
            logger,
        };

        for warning in &config.warnings {
            telemetry.report(&Error::TelemetryConfig(warning.clone()));
        }

        telemetry
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn instruments(&self) -> &Instruments {
        &self.instruments
    }

    pub fn health(&self) -> &Health {
        &self.health
    }

    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer_provider
    }

    /// Start the pull endpoint unless it already runs
    ///
    /// Failure is contained: health drops to 0, the error is logged and
    /// `None` is returned.
    pub fn start_exporter(&self) -> Option<SocketAddr> {
        match self.exporter.start_once() {
            Ok(addr) => {
                self.health.set(HealthComponent::Exporter, true);
                Some(addr)
            }
            Err(error) => {
                self.report(&error);
                None
            }
        }
    }

    /// Address of the running pull endpoint
    pub fn exporter_addr(&self) -> Option<SocketAddr> {
        self.exporter.local_addr()
    }

    /// Emit one structured log record
    pub fn log(&self, level: Level, message: &str, fields: Value) {
        self.logger.log(level, message, fields);
    }

    /// Boundary policy for contained failures: log at the failure's
    /// severity, then [`degrade`](Self::degrade)
    pub fn report(&self, error: &Error) {
        self.log(
            error.severity(),
            &error.user_message(),
            json!({ "error_code": error.code(), "error": error.to_string() }),
        );
        self.degrade(error);
    }

    /// Mark the component behind `error` unhealthy, if it affects health
    ///
    /// For failures already logged by [`with_span`](Self::with_span).
    pub fn degrade(&self, error: &Error) {
        if !error.affects_health() {
            return;
        }
        let component = match error {
            Error::ExporterStart { .. } => HealthComponent::Exporter,
            _ => HealthComponent::Data,
        };
        self.health.set(component, false);
    }

    /// Flush queued spans and stop the span exporter
    pub fn shutdown(&self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            tracing::debug!(error = ?e, "Tracer provider shutdown failed");
        }
    }
}
