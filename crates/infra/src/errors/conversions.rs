//! Conversions from external infrastructure errors into `BackendError`.

use cachefront_common::sync::QueueError;
use cachefront_domain::BackendError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Newtype keeping library conversions on the infrastructure side; converts
/// back into the domain's `BackendError`.
#[derive(Debug)]
pub struct InfraError(pub BackendError);

impl From<InfraError> for BackendError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BackendError> for InfraError {
    fn from(value: BackendError) -> Self {
        InfraError(value)
    }
}

trait IntoBackendError {
    fn into_backend(self) -> BackendError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → BackendError */
/* -------------------------------------------------------------------------- */

impl IntoBackendError for SqlError {
    fn into_backend(self) -> BackendError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => BackendError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        BackendError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 1555 | 2067) => {
                        BackendError::InvalidInput(format!("duplicate id: {message}"))
                    }
                    (ErrorCode::ReadOnly, _) => {
                        BackendError::Unavailable("database is read-only".into())
                    }
                    _ => BackendError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                BackendError::Serialization(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                BackendError::Serialization(format!("invalid column type for {name}: {ty}"))
            }
            RE::Utf8Error(_) => {
                BackendError::Serialization("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidParameterName(name) => {
                BackendError::Internal(format!("invalid parameter name: {name}"))
            }
            RE::InvalidPath(path) => BackendError::InvalidInput(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => BackendError::Internal("invalid SQL query".into()),
            other => BackendError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_backend())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → BackendError */
/* -------------------------------------------------------------------------- */

impl IntoBackendError for r2d2::Error {
    fn into_backend(self) -> BackendError {
        BackendError::Unavailable(format!("connection pool: {self}"))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_backend())
    }
}

/* -------------------------------------------------------------------------- */
/* QueueError → BackendError */
/* -------------------------------------------------------------------------- */

impl IntoBackendError for QueueError {
    fn into_backend(self) -> BackendError {
        match self {
            QueueError::CapacityExceeded(capacity) => {
                BackendError::Queue(format!("queue full at {capacity} items"))
            }
            QueueError::ShuttingDown => BackendError::Unavailable("queue is shutting down".into()),
            QueueError::InvalidConfig(reason) => BackendError::InvalidInput(reason),
            QueueError::ItemNotFound(id) => BackendError::Internal(format!("queue item {id} not in flight")),
        }
    }
}

impl From<QueueError> for InfraError {
    fn from(value: QueueError) -> Self {
        InfraError(value.into_backend())
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → BackendError */
/* -------------------------------------------------------------------------- */

/// Map a failed blocking task into a backend failure
pub fn map_join_error(err: JoinError) -> BackendError {
    if err.is_cancelled() {
        BackendError::Internal("blocking task cancelled".into())
    } else {
        BackendError::Internal(format!("blocking task panic: {err}"))
    }
}
