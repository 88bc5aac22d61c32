//! Bridge from the driver's `tracing` events to a [`Tracer`].
//!
//! sqlx reports statements through `tracing` under the `sqlx::query` target at the
//! level configured with `log_statements`. [`TraceLayer`] turns each such event into
//! a `(level, message, attributes)` triple and hands it to the sink.

use crate::trace::level::LogLevel;
use crate::trace::logger::{Attributes, TraceContext, Tracer};
use serde_json::{Number, Value as JsonValue};
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

const DRIVER_TARGET: &str = "sqlx";

/// True for events emitted by the database driver.
pub fn is_driver_event(metadata: &Metadata<'_>) -> bool {
    let target = metadata.target();
    target == DRIVER_TARGET
        || target
            .strip_prefix(DRIVER_TARGET)
            .is_some_and(|rest| rest.starts_with("::"))
}

/// `tracing` layer forwarding every event it sees to a [`Tracer`].
pub struct TraceLayer<T: ?Sized> {
    tracer: Arc<T>,
}

impl<T: Tracer + ?Sized> TraceLayer<T> {
    pub fn new(tracer: Arc<T>) -> Self {
        Self { tracer }
    }

    /// Wrap the layer in a per-layer filter that only lets driver events through.
    ///
    /// Other layers of the same subscriber are unaffected by the filter.
    pub fn driver_only<S>(tracer: Arc<T>) -> impl Layer<S>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        <Self as Layer<S>>::with_filter(Self::new(tracer), filter_fn(is_driver_event))
    }
}

impl<S, T> Layer<S> for TraceLayer<T>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    T: Tracer + ?Sized,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = AttributeVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        let trace_ctx = TraceContext {
            span: ctx.event_span(event).map(|span| span.id()),
            file: metadata.file(),
            line: metadata.line(),
        };
        let level = LogLevel::from(*metadata.level());
        let msg = visitor.message.unwrap_or_default();

        self.tracer.log(&trace_ctx, level, &msg, &visitor.attributes);
    }
}

impl<T: ?Sized> fmt::Debug for TraceLayer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceLayer").finish_non_exhaustive()
    }
}

/// Collects event fields; the `message` field becomes the message.
#[derive(Default)]
struct AttributeVisitor {
    message: Option<String>,
    attributes: Attributes,
}

impl AttributeVisitor {
    fn insert(&mut self, field: &Field, value: JsonValue) {
        self.attributes.insert(field.name().to_string(), value);
    }
}

impl Visit for AttributeVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = Number::from_f64(value)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(value.to_string()));
        self.insert(field, value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, JsonValue::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, JsonValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, JsonValue::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, JsonValue::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.insert(field, JsonValue::String(rendered));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing_subscriber::prelude::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(LogLevel, String, Attributes)>>,
        contexts: Mutex<Vec<TraceContext>>,
    }

    impl Tracer for Recorder {
        fn log(&self, ctx: &TraceContext, level: LogLevel, msg: &str, data: &Attributes) {
            self.events
                .lock()
                .unwrap()
                .push((level, msg.to_string(), data.clone()));
            self.contexts.lock().unwrap().push(ctx.clone());
        }
    }

    #[test]
    fn test_event_location_is_forwarded() {
        let recorder = Arc::new(Recorder::default());
        let subscriber =
            tracing_subscriber::registry().with(TraceLayer::driver_only(recorder.clone()));

        let line = tracing::subscriber::with_default(subscriber, || {
            let line = line!() + 1;
            tracing::debug!(target: "sqlx::query", "located");
            line
        });

        let contexts = recorder.contexts.lock().unwrap();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].file, Some(file!()));
        assert_eq!(contexts[0].line, Some(line));
    }

    #[test]
    fn test_driver_target_detection() {
        let recorder = Arc::new(Recorder::default());
        let subscriber =
            tracing_subscriber::registry().with(TraceLayer::driver_only(recorder.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "sqlx::query", "driver");
            tracing::info!(target: "sqlx", "driver root");
            tracing::info!(target: "sqlxish", "not driver");
            tracing::info!(target: "pgdb::db", "not driver");
        });

        let events = recorder.events.lock().unwrap();
        let messages: Vec<&str> = events.iter().map(|e| e.1.as_str()).collect();
        assert_eq!(messages, vec!["driver", "driver root"]);
    }

    #[test]
    fn test_fields_become_attributes() {
        let recorder = Arc::new(Recorder::default());
        let subscriber =
            tracing_subscriber::registry().with(TraceLayer::driver_only(recorder.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::trace!(
                target: "sqlx::query",
                summary = "select 1",
                rows_returned = 1u64,
                rows_affected = 0i64,
                elapsed_secs = 0.5f64,
                cached = true,
                elapsed = ?std::time::Duration::from_millis(500),
                "statement"
            );
        });

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        let (level, msg, data) = &events[0];
        assert_eq!(*level, LogLevel::Trace);
        assert_eq!(msg, "statement");
        assert_eq!(data.len(), 6);
        assert_eq!(data["summary"], JsonValue::from("select 1"));
        assert_eq!(data["rows_returned"], JsonValue::from(1u64));
        assert_eq!(data["rows_affected"], JsonValue::from(0i64));
        assert_eq!(data["elapsed_secs"], JsonValue::from(0.5f64));
        assert_eq!(data["cached"], JsonValue::Bool(true));
        assert_eq!(data["elapsed"], JsonValue::from("500ms"));
    }

    #[test]
    fn test_event_level_is_forwarded() {
        let recorder = Arc::new(Recorder::default());
        let subscriber =
            tracing_subscriber::registry().with(TraceLayer::driver_only(recorder.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "sqlx::query", "slow statement");
            tracing::error!(target: "sqlx::pool", "failed");
        });

        let events = recorder.events.lock().unwrap();
        let levels: Vec<LogLevel> = events.iter().map(|e| e.0).collect();
        assert_eq!(levels, vec![LogLevel::Warn, LogLevel::Error]);
    }
}
