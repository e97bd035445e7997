//! Error types used throughout cachefront

use std::time::Duration;

use cachefront_common::error::{ErrorClassification, ErrorSeverity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a collaborator (cache provider, persistence service,
/// queue client)
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BackendError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for collaborator operations
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Error surfaced by cache operations
///
/// `Concurrency` is never folded into `Io`: callers distinguish "retry with
/// fresh data" from "infrastructure failure" by variant.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid mode/collaborator combination, caught at registration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unexpected collaborator failure
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<BackendError>,
    },

    /// Etag mismatch, or optimistic update retries exhausted
    #[error("Concurrency error: {message}")]
    Concurrency {
        message: String,
        #[source]
        source: Option<Box<CacheError>>,
    },

    /// Lock not acquired within its budget
    #[error("Timed out after {waited:?} acquiring lock '{lock_name}'")]
    Timeout { lock_name: String, waited: Duration },

    /// Operation unavailable in the cache's consistency mode
    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl CacheError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    /// Wrap a collaborator failure with operation context
    pub fn io<S: Into<String>>(message: S, source: BackendError) -> Self {
        Self::Io { message: message.into(), source: Some(source) }
    }

    pub fn concurrency<S: Into<String>>(message: S) -> Self {
        Self::Concurrency { message: message.into(), source: None }
    }

    /// Terminal concurrency error carrying the last conflict
    pub fn concurrency_caused_by<S: Into<String>>(message: S, cause: CacheError) -> Self {
        Self::Concurrency { message: message.into(), source: Some(Box::new(cause)) }
    }

    pub fn timeout<S: Into<String>>(lock_name: S, waited: Duration) -> Self {
        Self::Timeout { lock_name: lock_name.into(), waited }
    }

    pub fn not_supported<S: Into<String>>(message: S) -> Self {
        Self::NotSupported(message.into())
    }

    pub fn is_concurrency(&self) -> bool {
        matches!(self, Self::Concurrency { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// The collaborator failure behind an `Io` error, if any
    pub fn backend_source(&self) -> Option<&BackendError> {
        match self {
            Self::Io { source, .. } => source.as_ref(),
            _ => None,
        }
    }
}

impl From<BackendError> for CacheError {
    fn from(err: BackendError) -> Self {
        Self::Io { message: err.to_string(), source: Some(err) }
    }
}

/// Result type alias for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

impl ErrorClassification for BackendError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Queue(_) | Self::Unavailable(_))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidInput(_) => ErrorSeverity::Warning,
            Self::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl ErrorClassification for CacheError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Concurrency { .. } | Self::Timeout { .. } => true,
            Self::Io { source: Some(source), .. } => source.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Concurrency { .. } | Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::Io { source: Some(source), .. } => source.severity(),
            Self::Io { source: None, .. } | Self::Configuration(_) | Self::NotSupported(_) => {
                ErrorSeverity::Error
            }
        }
    }

    fn is_critical(&self) -> bool {
        self.backend_source().is_some_and(ErrorClassification::is_critical)
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Timeout { waited, .. } => Some(*waited / 10),
            _ => None,
        }
    }
}
