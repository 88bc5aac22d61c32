//! Error types for the pool factory.
//!
//! Construction can fail in exactly two ways: the connection URL (or one of the
//! pool options embedded in it) does not parse, or the driver cannot build the
//! pool. Both are surfaced through [`PgDbError`] so callers only match on one type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PgDbError {
    #[error("Invalid connection URL: {message}")]
    Parse { message: String, suggestion: String },

    #[error("Failed to construct pool: {message}")]
    Construction {
        message: String,
        suggestion: String,
        retryable: bool,
    },
}

impl PgDbError {
    /// Create a parse error with a helpful suggestion.
    pub fn parse(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a construction error that a retry will not fix.
    pub fn construction(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
            suggestion: suggestion.into(),
            retryable: false,
        }
    }

    /// Create a construction error caused by a transient condition.
    pub fn transient(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
            suggestion: suggestion.into(),
            retryable: true,
        }
    }

    pub fn suggestion(&self) -> &str {
        match self {
            Self::Parse { suggestion, .. } | Self::Construction { suggestion, .. } => suggestion,
        }
    }

    /// True when the failure happened before any connection was attempted.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Check if retrying the same call could succeed.
    ///
    /// The factory itself never retries; this only tells the caller whether the
    /// failure looked transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Construction { retryable: true, .. })
    }
}

pub type PgDbResult<T> = Result<T, PgDbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PgDbError::parse("relative URL without a base", "use postgres://");
        assert!(err.to_string().contains("Invalid connection URL"));

        let err = PgDbError::construction("connection refused", "start the server");
        assert!(err.to_string().contains("Failed to construct pool"));
    }

    #[test]
    fn test_error_categories() {
        assert!(PgDbError::parse("bad", "fix").is_parse());
        assert!(!PgDbError::parse("bad", "fix").is_retryable());
        assert!(!PgDbError::construction("bad password", "fix").is_parse());
        assert!(!PgDbError::construction("bad password", "fix").is_retryable());
        assert!(!PgDbError::transient("down", "wait").is_parse());
        assert!(PgDbError::transient("down", "wait").is_retryable());
    }
}
