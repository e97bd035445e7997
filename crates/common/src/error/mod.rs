//! Error vocabulary shared by every cachefront crate.
//!
//! - **[`ErrorClassification`]**: retryability and severity queries, so the
//!   cache orchestrator and the delivery loop can decide how to react without
//!   matching on concrete enums.
//! - **[`ErrorSeverity`]**: one scale for log levels.
//!
//! | Severity | Meaning for a cache operation |
//! |----------|-------------------------------|
//! | Info | Expected: missing key, cancelled worker |
//! | Warning | Contention: lease held, acquire timed out |
//! | Error | Collaborator failed or misconfigured |
//! | Critical | Cache and store may disagree |

use std::fmt;
use std::time::Duration;

/// Standard interface for classifying errors by retryability and severity.
///
/// Retry loops and log sinks consult this trait instead of matching on
/// concrete error enums.
pub trait ErrorClassification {
    /// Whether repeating the operation may succeed (contention, timeouts,
    /// transient backend outages).
    fn is_retryable(&self) -> bool;

    /// Severity used for logging and alerting decisions.
    fn severity(&self) -> ErrorSeverity;

    /// Whether the error signals an integrity problem needing attention.
    fn is_critical(&self) -> bool;

    /// Suggested delay before retrying, if the error carries one.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Log severity, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
        })
    }
}
