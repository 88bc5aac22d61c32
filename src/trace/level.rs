//! Driver log levels and their mapping onto output severities.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

/// Severity attached to a driver event.
///
/// `None` is the "no logging" sentinel: events carrying it are dropped by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    None,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid log level: {0:?}")]
pub struct ParseLogLevelError(pub String);

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Output severity used by the sink for this configured level.
    ///
    /// Trace and debug collapse into DEBUG; `None` falls back to ERROR.
    pub fn severity(&self) -> Level {
        match self {
            Self::Trace | Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error | Self::None => Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    /// Names are matched exactly; `"INFO"` is not a valid level.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "none" => Ok(Self::None),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::TRACE => Self::Trace,
            Level::DEBUG => Self::Debug,
            Level::INFO => Self::Info,
            Level::WARN => Self::Warn,
            _ => Self::Error,
        }
    }
}

/// Resolve a level name to the sink's output severity.
///
/// Unrecognized names resolve to ERROR; the error is returned alongside so the
/// caller can report it.
pub fn resolve_severity(name: &str) -> (Level, Option<ParseLogLevelError>) {
    match name.parse::<LogLevel>() {
        Ok(level) => (level.severity(), None),
        Err(e) => (Level::ERROR, Some(e)),
    }
}
