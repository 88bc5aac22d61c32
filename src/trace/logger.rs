//! Structured text sink for driver trace events.
//!
//! [`PgLogger`] writes one `key=value` line per event:
//!
//! ```text
//! time=2026-10-19T09:25:00.123Z level=DEBUG source=sqlx-core/src/logger.rs:141 msg="SELECT 1" rows_returned=1
//! ```
//!
//! The logger does not go through a `tracing` dispatcher. It is invoked from inside
//! a subscriber's `on_event`, where re-entering the dispatcher would drop the line.

use crate::trace::level::{LogLevel, resolve_severity};
use chrono::{SecondsFormat, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::io::{self, Write as _};
use std::panic::Location;
use tracing::Level;
use tracing::span::Id;
use tracing_subscriber::fmt::MakeWriter;

/// Named attributes attached to a driver event.
pub type Attributes = HashMap<String, JsonValue>;

/// Correlation data for an event.
///
/// `span` is carried through untouched. `file` and `line` locate the code that
/// emitted the event; when either is missing the sink reports its own caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceContext {
    pub span: Option<Id>,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl TraceContext {
    fn source(&self) -> Option<(&'static str, u32)> {
        self.file.zip(self.line)
    }
}

/// Receiver for driver trace events.
///
/// Implementations are called concurrently from whatever task the driver is
/// running on and must not block for long.
pub trait Tracer: Send + Sync + 'static {
    fn log(&self, ctx: &TraceContext, level: LogLevel, msg: &str, data: &Attributes);
}

pub type StderrWriter = fn() -> io::Stderr;

/// Log adapter with a fixed output severity.
///
/// Every event that is not dropped is written at the severity resolved at
/// construction time, whatever level the driver reported it at.
pub struct PgLogger<W = StderrWriter> {
    writer: W,
    level: Level,
}

impl PgLogger {
    /// Create a logger writing to stderr.
    #[track_caller]
    pub fn new(log_level: &str) -> Self {
        Self::with_writer(log_level, io::stderr as StderrWriter)
    }
}

impl<W> PgLogger<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    /// Create a logger writing to `writer`.
    ///
    /// An unknown `log_level` is reported once, at ERROR, through the new logger,
    /// and the logger falls back to ERROR.
    #[track_caller]
    pub fn with_writer(log_level: &str, writer: W) -> Self {
        let caller = Location::caller();
        let (level, parse_error) = resolve_severity(log_level);
        let logger = Self { writer, level };

        if let Some(err) = parse_error {
            let msg = format!(
                "PgLogger: failed to parse the log level {:?} with error: {}. defaulting to {}",
                log_level,
                err,
                Level::ERROR
            );
            logger.write_line(Level::ERROR, (caller.file(), caller.line()), &msg, &[]);
        }

        logger
    }

    /// Output severity used for every emitted line.
    pub fn level(&self) -> Level {
        self.level
    }

    fn write_line(
        &self,
        level: Level,
        (file, line_no): (&str, u32),
        msg: &str,
        attrs: &[(&str, &JsonValue)],
    ) {
        let mut line = String::with_capacity(128);

        let _ = write!(
            line,
            "time={} level={} source={}:{} msg=",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            file,
            line_no
        );
        push_text(&mut line, msg);

        for (key, value) in attrs {
            line.push(' ');
            push_text(&mut line, key);
            line.push('=');
            push_value(&mut line, value);
        }
        line.push('\n');

        // Sink failures are not reported back to the driver.
        let _ = self.writer.make_writer().write_all(line.as_bytes());
    }
}

impl<W> Tracer for PgLogger<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    #[track_caller]
    fn log(&self, ctx: &TraceContext, level: LogLevel, msg: &str, data: &Attributes) {
        if level == LogLevel::None {
            return;
        }
        let caller = Location::caller();
        let source = ctx.source().unwrap_or((caller.file(), caller.line()));

        let mut attrs: Vec<(&str, &JsonValue)> =
            data.iter().map(|(k, v)| (k.as_str(), v)).collect();
        attrs.sort_unstable_by(|a, b| a.0.cmp(b.0));

        self.write_line(self.level, source, msg, &attrs);
    }
}

impl<W> fmt::Debug for PgLogger<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgLogger")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s.chars()
            .any(|c| c == ' ' || c == '=' || c == '"' || c.is_control() || c.is_whitespace())
}

fn push_text(line: &mut String, s: &str) {
    if needs_quoting(s) {
        let _ = write!(line, "{:?}", s);
    } else {
        line.push_str(s);
    }
}

fn push_value(line: &mut String, value: &JsonValue) {
    match value {
        JsonValue::String(s) => push_text(line, s),
        other => push_text(line, &other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        let mut line = String::new();
        push_text(&mut line, "plain");
        line.push('|');
        push_text(&mut line, "");
        line.push('|');
        push_text(&mut line, "a=b");
        line.push('|');
        push_text(&mut line, "two words");
        line.push('|');
        push_value(&mut line, &JsonValue::Null);
        line.push('|');
        push_value(&mut line, &JsonValue::from(2.5));
        assert_eq!(line, r#"plain|""|"a=b"|"two words"|null|2.5"#);
    }

    #[test]
    fn test_context_source_needs_file_and_line() {
        let ctx = TraceContext {
            file: Some("sqlx-core/src/logger.rs"),
            line: Some(141),
            ..Default::default()
        };
        assert_eq!(ctx.source(), Some(("sqlx-core/src/logger.rs", 141)));

        let ctx = TraceContext {
            file: Some("sqlx-core/src/logger.rs"),
            ..Default::default()
        };
        assert_eq!(ctx.source(), None);
    }
}
