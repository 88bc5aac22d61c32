//! Driver trace sink.
//!
//! - `level`: level vocabulary and the mapping onto output severities
//! - `logger`: the [`Tracer`] interface and the structured stderr adapter
//! - `layer`: the `tracing` layer that feeds driver events into a [`Tracer`]

pub mod layer;
pub mod level;
pub mod logger;

pub use layer::{TraceLayer, is_driver_event};
pub use level::{LogLevel, ParseLogLevelError, resolve_severity};
pub use logger::{Attributes, PgLogger, StderrWriter, TraceContext, Tracer};
