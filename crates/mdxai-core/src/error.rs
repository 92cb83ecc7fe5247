//! Error types for the generation engine
//!
//! Three failure kinds cross component boundaries:
//! - Configuration: missing or invalid setup (no model, no credentials)
//! - Generation: backend failed or returned unusable output
//! - Parsing: text could not be decoded into a document or outline
//!
//! Timeouts are kept distinct so callers can recover streamed partial output.

use mdxai_document::{ParseError, SerializeError};
use mdxai_schema::ValidationError;
use std::path::PathBuf;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum MdxaiError {
    /// Missing or invalid setup
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Backend call failed or output was unusable
    #[error("generation error: {0}")]
    Generation(String),

    /// Text could not be decoded
    #[error("parsing error: {0}")]
    Parsing(String),

    /// A network-bound step exceeded its deadline
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Step that timed out
        operation: String,
        /// Configured limit
        timeout_ms: u64,
        /// Streamed text accumulated before the deadline
        partial: Option<String>,
    },

    /// Filesystem access failed
    #[error("io error at {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl MdxaiError {
    /// Create configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create parsing error
    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing(message.into())
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable kind label used in registry results and CLI output
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::Generation(_) => "GenerationError",
            Self::Parsing(_) => "ParsingError",
            Self::Timeout { .. } => "TimeoutError",
            Self::Io { .. } => "IoError",
        }
    }

    /// Message without the kind prefix
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Configuration(m) | Self::Generation(m) | Self::Parsing(m) => m.clone(),
            other => other.to_string(),
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Generation(_) | Self::Timeout { .. })
    }

    /// Streamed output recovered from a timeout
    #[must_use]
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            Self::Timeout { partial, .. } => partial.as_deref().filter(|p| !p.is_empty()),
            _ => None,
        }
    }
}

impl From<ParseError> for MdxaiError {
    fn from(err: ParseError) -> Self {
        Self::Parsing(err.to_string())
    }
}

impl From<SerializeError> for MdxaiError {
    fn from(err: SerializeError) -> Self {
        Self::Parsing(err.to_string())
    }
}

impl From<ValidationError> for MdxaiError {
    fn from(err: ValidationError) -> Self {
        Self::Generation(format!("output failed schema validation: {err}"))
    }
}

impl From<serde_json::Error> for MdxaiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parsing(format!("invalid JSON: {err}"))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, MdxaiError>;
