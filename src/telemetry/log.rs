//! Structured log stream
//!
//! One JSON object per line. Fixed identity fields and the identifiers of
//! the current OpenTelemetry span are written first; caller fields are
//! merged last and win on key collisions.

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::io::Write;
use tracing::Level;

use super::context::current_span;
use crate::config::ServiceIdentity;

pub struct StructuredLogger {
    identity: ServiceIdentity,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl StructuredLogger {
    /// Logger writing to standard output
    pub fn stdout(identity: ServiceIdentity) -> Self {
        Self::with_sink(identity, std::io::stdout())
    }

    pub fn with_sink(identity: ServiceIdentity, sink: impl Write + Send + 'static) -> Self {
        Self {
            identity,
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// Emit one record
    ///
    /// `fields` is normally a JSON object; anything else is kept under a
    /// `fields` key.
    pub fn log(&self, level: Level, message: &str, fields: Value) {
        let record = self.record(level, message, fields);

        let mut sink = self.sink.lock();
        let written = serde_json::to_writer(&mut *sink, &Value::Object(record))
            .map_err(std::io::Error::from)
            .and_then(|_| sink.write_all(b"\n"))
            .and_then(|_| sink.flush());
        if let Err(e) = written {
            tracing::debug!(error = %e, "Failed to write structured log record");
        }
    }

    /// Build the record without writing it
    pub fn record(&self, level: Level, message: &str, fields: Value) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert(
            "timestamp".into(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true).into(),
        );
        record.insert("service".into(), self.identity.name.clone().into());
        record.insert("environment".into(), self.identity.environment.clone().into());
        record.insert("version".into(), self.identity.version.clone().into());
        record.insert("instance_id".into(), self.identity.instance_id.clone().into());
        record.insert("namespace".into(), self.identity.namespace.clone().into());
        record.insert("pod_name".into(), self.identity.pod_name.clone().into());

        if let Some(span) = current_span() {
            record.insert("trace_id".into(), span.trace_id.to_string().into());
            record.insert("span_id".into(), span.span_id.to_string().into());
        }

        record.insert("level".into(), level.as_str().into());
        record.insert("message".into(), message.into());

        match fields {
            Value::Object(fields) => record.extend(fields),
            Value::Null => {}
            other => {
                record.insert("fields".into(), other);
            }
        }

        record
    }
}
