//! Span export
//!
//! Builds the tracer provider. Finished spans go to an OTLP/HTTP collector
//! through a batch processor when one answers at startup; otherwise the
//! provider has no exporter and spans only live long enough to correlate
//! logs and metrics.

use opentelemetry::KeyValue;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::config::{ServiceIdentity, TracingConfig};
use crate::error::{Error, Result};

/// Instrumentation scope of every span this crate starts
pub const TRACER_NAME: &str = env!("CARGO_PKG_NAME");

const DEFAULT_TRACES_PATH: &str = "/v1/traces";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Tracer provider for `config`, plus the reason export is off, if any
///
/// An empty endpoint turns export off silently. An unusable or unreachable
/// one turns it off for the whole process and is returned as a
/// [`Error::TelemetryConfig`].
pub fn build_tracer_provider(
    config: &TracingConfig,
    identity: &ServiceIdentity,
) -> (SdkTracerProvider, Option<Error>) {
    let builder = SdkTracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_resource(service_resource(identity));

    if config.collector_endpoint.is_empty() {
        return (builder.build(), None);
    }

    let timeout = Duration::from_millis(config.probe_timeout_ms);
    match otlp_exporter(&config.collector_endpoint, timeout) {
        Ok((endpoint, exporter)) => {
            info!(%endpoint, "Exporting spans to collector");
            (builder.with_batch_exporter(exporter).build(), None)
        }
        Err(error) => (builder.build(), Some(error)),
    }
}

/// Resource attributes naming this process
pub fn service_resource(identity: &ServiceIdentity) -> Resource {
    Resource::builder()
        .with_service_name(identity.name.clone())
        .with_attributes([
            KeyValue::new("service.version", identity.version.clone()),
            KeyValue::new("service.instance.id", identity.instance_id.clone()),
            KeyValue::new("deployment.environment", identity.environment.clone()),
            KeyValue::new("k8s.namespace.name", identity.namespace.clone()),
            KeyValue::new("k8s.pod.name", identity.pod_name.clone()),
        ])
        .build()
}

/// Parse a collector endpoint, defaulting the path to `/v1/traces`
pub fn collector_url(endpoint: &str) -> Result<Url> {
    let invalid = |reason: String| Error::TelemetryConfig(format!("{endpoint:?}: {reason}"));

    let mut url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    if url.path().is_empty() || url.path() == "/" {
        url.set_path(DEFAULT_TRACES_PATH);
    }
    Ok(url)
}

/// First socket address the collector resolves to
pub fn collector_addr(url: &Url) -> Result<SocketAddr> {
    let addrs = url
        .socket_addrs(|| None)
        .map_err(|e| Error::TelemetryConfig(format!("cannot resolve collector {url}: {e}")))?;
    addrs
        .into_iter()
        .next()
        .ok_or_else(|| Error::TelemetryConfig(format!("collector {url} has no address")))
}

fn otlp_exporter(
    endpoint: &str,
    timeout: Duration,
) -> Result<(Url, opentelemetry_otlp::SpanExporter)> {
    let url = collector_url(endpoint)?;
    let addr = collector_addr(&url)?;
    TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
        Error::TelemetryConfig(format!("collector {url} unreachable ({addr}): {e}"))
    })?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpJson)
        .with_endpoint(url.as_str())
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .map_err(|e| Error::TelemetryConfig(format!("cannot build span exporter for {url}: {e}")))?;

    Ok((url, exporter))
}
