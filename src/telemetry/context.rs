//! Instrumentation context
//!
//! Wraps an operation in a span, a duration observation and a completion
//! log record, all carrying the same trace and span identifiers.

use opentelemetry::trace::{
    SpanId, SpanRef, Status, TraceContextExt, TraceId, Tracer, TracerProvider,
};
use opentelemetry::{Context, KeyValue};
use serde_json::json;
use std::convert::Infallible;
use std::fmt::Display;
use std::time::Instant;
use tracing::Level;

use super::export::TRACER_NAME;
use super::Telemetry;
use crate::error::Error;

/// Identifiers of a span, as written to log records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanIds {
    pub trace_id: TraceId,
    pub span_id: SpanId,
}

/// Innermost span current on this thread
pub fn current_span() -> Option<SpanIds> {
    let cx = Context::current();
    let span = cx.span();
    let context = span.span_context();
    context.is_valid().then(|| SpanIds {
        trace_id: context.trace_id(),
        span_id: context.span_id(),
    })
}

/// Mark `span` failed with `message`
pub fn record_failure(span: &SpanRef<'_>, message: String) {
    span.add_event(
        "exception",
        vec![KeyValue::new("exception.message", message.clone())],
    );
    span.set_status(Status::error(message));
}

/// Level a failed operation is logged at
pub trait Severity {
    fn severity(&self) -> Level {
        Level::ERROR
    }
}

impl Severity for Error {
    fn severity(&self) -> Level {
        match self {
            Error::Validation(_) | Error::TelemetryConfig(_) => Level::WARN,
            _ => Level::ERROR,
        }
    }
}

impl Severity for Infallible {}

impl Telemetry {
    /// Run `body` inside a span named `operation`
    ///
    /// The span is current while `body` runs, so nested operations become
    /// its children and log records carry its ids. Failures are recorded on
    /// the span, logged once at their [`Severity`] and returned unchanged.
    /// Duration is observed in either case.
    pub fn with_span<T, E, F>(&self, operation: &str, body: F) -> Result<T, E>
    where
        F: FnOnce(&SpanRef<'_>) -> Result<T, E>,
        E: Display + Severity,
    {
        let started = Instant::now();
        let cx = Context::current_with_span(
            self.tracer_provider()
                .tracer(TRACER_NAME)
                .start(operation.to_string()),
        );
        let _attached = cx.clone().attach();
        let span = cx.span();

        let ids = span.span_context();
        let diagnostic = tracing::info_span!(
            "operation",
            name = operation,
            trace_id = %ids.trace_id(),
            span_id = %ids.span_id(),
        );
        let _entered = diagnostic.enter();

        let result = body(&span);

        let elapsed = started.elapsed();
        self.instruments()
            .operation_duration
            .observe_duration(&[operation], elapsed);

        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        match &result {
            Ok(_) => self.log(
                Level::INFO,
                "operation completed",
                json!({ "operation": operation, "duration_ms": duration_ms, "status": "ok" }),
            ),
            Err(e) => {
                record_failure(&span, e.to_string());
                self.log(
                    e.severity(),
                    "operation failed",
                    json!({
                        "operation": operation,
                        "duration_ms": duration_ms,
                        "status": "error",
                        "error": e.to_string(),
                    }),
                );
            }
        }

        span.end();
        result
    }

    /// [`with_span`](Self::with_span) for operations that cannot fail
    pub fn in_span<T, F>(&self, operation: &str, body: F) -> T
    where
        F: FnOnce(&SpanRef<'_>) -> T,
    {
        match self.with_span(operation, |span| Ok::<T, Infallible>(body(span))) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};

    #[test]
    fn test_nested_spans_share_trace() {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let tracer = provider.tracer(TRACER_NAME);

        assert_eq!(current_span(), None);
        let outer = Context::current_with_span(tracer.start("load"));
        {
            let _outer = outer.clone().attach();
            let outer_ids = current_span().unwrap();

            let inner = Context::current_with_span(tracer.start("compute"));
            {
                let _inner = inner.clone().attach();
                let inner_ids = current_span().unwrap();
                assert_eq!(inner_ids.trace_id, outer_ids.trace_id);
                assert_ne!(inner_ids.span_id, outer_ids.span_id);
            }
            inner.span().end();
            assert_eq!(current_span(), Some(outer_ids));
        }
        outer.span().end();
        assert_eq!(current_span(), None);

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "compute");
        assert_eq!(spans[0].parent_span_id, spans[1].span_context.span_id());
    }

    #[test]
    fn test_severity_by_kind() {
        assert_eq!(
            Error::Validation(ValidationError::EmptyDescription).severity(),
            Level::WARN
        );
        assert_eq!(Error::TelemetryConfig("x".into()).severity(), Level::WARN);
        assert_eq!(
            Error::DataLoad {
                path: "despesas.csv".into(),
                reason: "bad header".into(),
            }
            .severity(),
            Level::ERROR
        );
    }
}
