//! Configuration management
//!
//! Defaults, optionally overlaid by a TOML file, then by environment
//! variables (`SERVICE_NAME`, `METRICS_PORT`, ...).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceIdentity,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Problems found while applying overrides, reported once telemetry is up
    #[serde(skip)]
    pub warnings: Vec<String>,
}

/// Fixed identity fields attached to every log record
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceIdentity {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_instance_id")]
    pub instance_id: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_pod_name")]
    pub pod_name: String,
}

/// Ledger file location
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

/// Metrics endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Interface the pull endpoint binds to
    #[serde(default = "default_metrics_host")]
    pub host: IpAddr,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl MetricsConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Span export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    /// OTLP/HTTP traces endpoint; empty disables export
    #[serde(default = "default_collector_endpoint")]
    pub collector_endpoint: String,
    /// Connect timeout when probing the collector
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Diagnostic log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Diagnostic output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            environment: default_environment(),
            version: default_version(),
            instance_id: default_instance_id(),
            namespace: default_namespace(),
            pod_name: default_pod_name(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            host: default_metrics_host(),
            port: default_metrics_port(),
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            collector_endpoint: default_collector_endpoint(),
            probe_timeout_ms: default_probe_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_service_name() -> String { "gerenciador-despesas".to_string() }
fn default_environment() -> String { "development".to_string() }
fn default_version() -> String { crate::VERSION.to_string() }
fn default_instance_id() -> String { uuid::Uuid::new_v4().to_string() }
fn default_namespace() -> String { "default".to_string() }
fn default_pod_name() -> String { "local".to_string() }
fn default_ledger_path() -> PathBuf { PathBuf::from("despesas_br.csv") }
fn default_metrics_host() -> IpAddr { IpAddr::from([0, 0, 0, 0]) }
fn default_metrics_port() -> u16 { 8000 }
fn default_collector_endpoint() -> String { "http://localhost:4318/v1/traces".to_string() }
fn default_probe_timeout() -> u64 { 500 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Config {
    /// Defaults, then `path` if given, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&contents).with_context(|| "Failed to parse config file")
    }

    /// Overlay values found by `lookup` (normally `std::env::var`)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *target = value;
            }
        };
        set(&mut self.service.name, "SERVICE_NAME");
        set(&mut self.service.environment, "ENVIRONMENT");
        set(&mut self.service.version, "VERSION");
        set(&mut self.service.instance_id, "INSTANCE_ID");
        set(&mut self.service.namespace, "NAMESPACE");
        set(&mut self.service.pod_name, "POD_NAME");
        set(&mut self.logging.level, "LOG_LEVEL");

        // Empty is meaningful here: it disables span export
        if let Some(endpoint) = lookup("TRACE_COLLECTOR_ENDPOINT") {
            self.tracing.collector_endpoint = endpoint.trim().to_string();
        }

        if let Some(path) = lookup("LEDGER_PATH").filter(|v| !v.trim().is_empty()) {
            self.ledger.path = PathBuf::from(path);
        }

        if let Some(port) = lookup("METRICS_PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.metrics.port = port,
                Err(_) => self.warnings.push(format!(
                    "METRICS_PORT={port:?} is not a valid port, keeping {}",
                    self.metrics.port
                )),
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.service.name.trim().is_empty() {
            anyhow::bail!("service name must not be empty");
        }
        if self.ledger.path.as_os_str().is_empty() {
            anyhow::bail!("ledger path must not be empty");
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            anyhow::bail!("logging format must be \"json\" or \"pretty\"");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.metrics.port, 8000);
        assert_eq!(config.ledger.path, PathBuf::from("despesas_br.csv"));
        assert!(!config.service.instance_id.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(lookup(&[
            ("SERVICE_NAME", "despesas-api"),
            ("ENVIRONMENT", "production"),
            ("POD_NAME", "despesas-7f9c"),
            ("METRICS_PORT", "9464"),
            ("TRACE_COLLECTOR_ENDPOINT", ""),
        ]));

        assert_eq!(config.service.name, "despesas-api");
        assert_eq!(config.service.environment, "production");
        assert_eq!(config.service.pod_name, "despesas-7f9c");
        assert_eq!(config.metrics.port, 9464);
        assert!(config.tracing.collector_endpoint.is_empty());
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_bad_port_becomes_warning() {
        let mut config = Config::default();
        config.apply_env(lookup(&[("METRICS_PORT", "eighty")]));

        assert_eq!(config.metrics.port, 8000);
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn test_toml_sections() {
        let config: Config = toml::from_str(
            r#"
            [service]
            name = "despesas"
            environment = "staging"

            [metrics]
            host = "127.0.0.1"
            port = 9100

            [logging]
            format = "pretty"
            "#,
        )
        .unwrap();

        assert_eq!(config.service.name, "despesas");
        assert_eq!(config.service.namespace, "default");
        assert_eq!(config.metrics.bind_addr(), "127.0.0.1:9100".parse().unwrap());
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }
}
