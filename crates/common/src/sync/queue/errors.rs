use std::time::Duration;

use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Queue operation errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue is at maximum capacity ({0})")]
    CapacityExceeded(usize),

    #[error("Item not in flight: {0}")]
    ItemNotFound(u64),

    #[error("Queue is shutting down")]
    ShuttingDown,

    #[error("Invalid queue configuration: {0}")]
    InvalidConfig(String),
}

impl ErrorClassification for QueueError {
    fn is_retryable(&self) -> bool {
        // A full queue may have space later
        matches!(self, Self::CapacityExceeded(_))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CapacityExceeded(_) => ErrorSeverity::Warning,
            Self::ItemNotFound(_) | Self::ShuttingDown => ErrorSeverity::Info,
            Self::InvalidConfig(_) => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::CapacityExceeded(_) => Some(Duration::from_millis(100)),
            _ => None,
        }
    }
}

/// Queue operation result type
pub type QueueResult<T> = Result<T, QueueError>;
