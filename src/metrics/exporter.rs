//! Prometheus pull endpoint
//!
//! A plain HTTP listener on a detached thread, started at most once per
//! exporter. Responds to:
//! - GET /metrics - Prometheus text exposition
//! - GET /health - JSON health status
//! - GET / - endpoint index

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use serde::Serialize;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::health::Health;
use crate::error::{Error, Result};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Body for /health
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    healthy: bool,
}

/// Owns the listener lifecycle
pub struct MetricsExporter {
    bind_addr: SocketAddr,
    handle: PrometheusHandle,
    health: Arc<Health>,
    /// Bound address once running
    running: Mutex<Option<SocketAddr>>,
}

impl MetricsExporter {
    pub fn new(bind_addr: SocketAddr, handle: PrometheusHandle, health: Arc<Health>) -> Self {
        Self {
            bind_addr,
            handle,
            health,
            running: Mutex::new(None),
        }
    }

    /// Bind and serve, unless already running
    ///
    /// Repeated and concurrent calls after the first success return the
    /// same address without binding again. After a failure the next call
    /// tries again.
    pub fn start_once(&self) -> Result<SocketAddr> {
        let mut running = self.running.lock();
        if let Some(addr) = *running {
            return Ok(addr);
        }

        let start_error = |source: std::io::Error| Error::ExporterStart {
            addr: self.bind_addr,
            source,
        };

        let listener = TcpListener::bind(self.bind_addr).map_err(start_error)?;
        let local_addr = listener.local_addr().map_err(start_error)?;

        let handle = self.handle.clone();
        let health = self.health.clone();
        thread::Builder::new()
            .name("metrics-exporter".to_string())
            .spawn(move || run_exporter(listener, handle, health))
            .map_err(start_error)?;

        *running = Some(local_addr);
        info!(%local_addr, "Metrics exporter started");
        Ok(local_addr)
    }

    /// Address being served, if started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.running.lock()
    }
}

fn run_exporter(listener: TcpListener, handle: PrometheusHandle, health: Arc<Health>) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let handle = handle.clone();
                let health = health.clone();
                thread::spawn(move || {
                    if let Err(e) = handle_request(stream, &handle, &health) {
                        debug!(error = %e, "Scrape handling error");
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "Failed to accept scrape connection");
            }
        }
    }
}

fn handle_request(
    mut stream: TcpStream,
    handle: &PrometheusHandle,
    health: &Health,
) -> std::io::Result<()> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let mut buffer = [0u8; 1024];
    let n = stream.read(&mut buffer)?;

    if n == 0 {
        return Ok(());
    }

    let request = String::from_utf8_lossy(&buffer[..n]);
    let first_line = request.lines().next().unwrap_or("");

    let mut parts = first_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("/");

    let (status, content_type, body) = match (method, path) {
        ("GET", "/metrics") => (
            "200 OK",
            "text/plain; version=0.0.4; charset=utf-8",
            handle.render(),
        ),
        ("GET", "/health") => {
            let healthy = health.is_healthy();
            let response = HealthResponse {
                status: if healthy { "ok" } else { "degraded" },
                healthy,
            };
            let status = if healthy { "200 OK" } else { "503 Service Unavailable" };
            (
                status,
                "application/json",
                serde_json::to_string(&response).unwrap_or_default(),
            )
        }
        ("GET", "/") => {
            let help = r#"{
  "endpoints": {
    "/metrics": "Prometheus metrics",
    "/health": "Health status"
  }
}"#;
            ("200 OK", "application/json", help.to_string())
        }
        ("GET", _) => (
            "404 Not Found",
            "application/json",
            r#"{"error": "Not found"}"#.to_string(),
        ),
        _ => (
            "405 Method Not Allowed",
            "application/json",
            r#"{"error": "Method not allowed"}"#.to_string(),
        ),
    };

    let response = format!(
        "HTTP/1.1 {}\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status,
        content_type,
        body.len(),
        body
    );

    stream.write_all(response.as_bytes())?;
    stream.flush()?;

    Ok(())
}
