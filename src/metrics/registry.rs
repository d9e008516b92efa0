//! Idempotent instrument registry
//!
//! Instruments are keyed by name in a sharded map; the entry lock makes
//! get-or-create atomic, so setup code may run any number of times.
//! Values live in a [`PrometheusRecorder`] owned by the registry rather
//! than a globally installed recorder.

use dashmap::DashMap;
use metrics::{Key, KeyName, Label, Level, Metadata, Recorder, SharedString, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Histogram buckets in seconds
pub const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Instrument type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    /// Monotonic, labeled
    Counter,
    /// Settable, labeled
    Gauge,
    /// Distribution of observations, labeled
    Histogram,
    /// Static key/value pairs exposed as a constant-1 gauge
    Info,
}

/// Shared handle to a registered instrument
pub type InstrumentHandle = Arc<Instrument>;

/// A named, typed instrument
pub struct Instrument {
    name: String,
    description: String,
    kind: InstrumentKind,
    label_names: Vec<String>,
    recorder: Arc<PrometheusRecorder>,
}

impl Instrument {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Add `by` to a counter series
    pub fn increment(&self, label_values: &[&str], by: u64) {
        if self.expect_kind(InstrumentKind::Counter) {
            self.recorder
                .register_counter(&self.key(label_values), &metadata())
                .increment(by);
        }
    }

    /// Set a gauge series to an absolute value
    pub fn set(&self, label_values: &[&str], value: f64) {
        if self.expect_kind(InstrumentKind::Gauge) {
            self.recorder
                .register_gauge(&self.key(label_values), &metadata())
                .set(value);
        }
    }

    /// Record one histogram observation
    pub fn observe(&self, label_values: &[&str], value: f64) {
        if self.expect_kind(InstrumentKind::Histogram) {
            self.recorder
                .register_histogram(&self.key(label_values), &metadata())
                .record(value);
        }
    }

    /// Record a duration in seconds
    pub fn observe_duration(&self, label_values: &[&str], elapsed: Duration) {
        self.observe(label_values, elapsed.as_secs_f64());
    }

    /// Publish static key/value pairs
    pub fn set_info(&self, pairs: &[(&str, &str)]) {
        if self.expect_kind(InstrumentKind::Info) {
            let labels: Vec<Label> = pairs
                .iter()
                .map(|(k, v)| Label::new(k.to_string(), v.to_string()))
                .collect();
            let key = Key::from_parts(self.name.clone(), labels);
            self.recorder.register_gauge(&key, &metadata()).set(1.0);
        }
    }

    fn expect_kind(&self, wanted: InstrumentKind) -> bool {
        if self.kind != wanted {
            warn!(
                metric = %self.name,
                registered = ?self.kind,
                requested = ?wanted,
                "Operation does not match instrument kind, ignoring"
            );
            return false;
        }
        true
    }

    fn key(&self, label_values: &[&str]) -> Key {
        if label_values.len() != self.label_names.len() {
            warn!(
                metric = %self.name,
                expected = self.label_names.len(),
                got = label_values.len(),
                "Label value count mismatch"
            );
        }
        let labels: Vec<Label> = self
            .label_names
            .iter()
            .zip(label_values)
            .map(|(name, value)| Label::new(name.clone(), value.to_string()))
            .collect();
        Key::from_parts(self.name.clone(), labels)
    }

    fn describe(&self) {
        let name = KeyName::from(self.name.clone());
        let description = SharedString::from(self.description.clone());
        match self.kind {
            InstrumentKind::Counter => self.recorder.describe_counter(name, None, description),
            InstrumentKind::Gauge | InstrumentKind::Info => {
                self.recorder.describe_gauge(name, None, description)
            }
            InstrumentKind::Histogram => {
                self.recorder
                    .describe_histogram(name, Some(Unit::Seconds), description)
            }
        }
    }
}

impl std::fmt::Debug for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrument")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("label_names", &self.label_names)
            .finish()
    }
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

/// Process-wide instrument registry
pub struct MetricRegistry {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
    instruments: DashMap<String, InstrumentHandle>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        let builder = PrometheusBuilder::new()
            .set_buckets(DURATION_BUCKETS)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Invalid histogram buckets, falling back to summaries");
                PrometheusBuilder::new()
            });
        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        Self {
            recorder: Arc::new(recorder),
            handle,
            instruments: DashMap::new(),
        }
    }

    /// Return the instrument called `name`, registering it on first use
    ///
    /// Later calls return the original instrument even when the description,
    /// kind or label names differ.
    pub fn get_or_create(
        &self,
        kind: InstrumentKind,
        name: &str,
        description: &str,
        label_names: &[&str],
    ) -> InstrumentHandle {
        let entry = self.instruments.entry(name.to_string()).or_insert_with(|| {
            let instrument = Instrument {
                name: name.to_string(),
                description: description.to_string(),
                kind,
                label_names: label_names.iter().map(|l| l.to_string()).collect(),
                recorder: self.recorder.clone(),
            };
            instrument.describe();
            debug!(metric = name, ?kind, "Instrument registered");
            Arc::new(instrument)
        });

        if entry.kind != kind {
            warn!(
                metric = name,
                registered = ?entry.kind,
                requested = ?kind,
                "Instrument already registered with another kind"
            );
        }

        entry.value().clone()
    }

    pub fn get(&self, name: &str) -> Option<InstrumentHandle> {
        self.instruments.get(name).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Prometheus text exposition of every series
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Scrape handle for the exporter
    pub fn handle(&self) -> PrometheusHandle {
        self.handle.clone()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Value of one series in a rendered exposition
///
/// `series` is the metric name plus its label set exactly as rendered, e.g.
/// `registros_totais` or `operacao_duracao_segundos_count{operacao="load"}`.
pub fn sample(rendered: &str, series: &str) -> Option<f64> {
    rendered
        .lines()
        .filter(|line| !line.starts_with('#'))
        .find(|line| {
            line.strip_prefix(series)
                .map_or(false, |rest| rest.starts_with(' '))
        })
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
