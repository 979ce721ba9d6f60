//! Error types for kyro-tally.
//!
//! All errors are strongly typed using thiserror so callers can pattern
//! match on the failure class: a rejected sample, a store failure, or a
//! runtime scheduling problem.

use thiserror::Error;

use crate::storage::StorageError;

/// Validation errors that reject a whole sample.
///
/// A rejected sample never touches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is absent or blank.
    #[error("Required field '{field}' is missing")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// Brand and name contain no alphanumeric characters.
    #[error("Brand '{brand}' and name '{name}' normalize to an empty key")]
    EmptyKey {
        /// Raw brand text.
        brand: String,
        /// Raw name text.
        name: String,
    },

    /// The sample payload is not a JSON object.
    #[error("Sample must be a JSON object, got {found}")]
    NotAnObject {
        /// JSON type that was supplied instead.
        found: String,
    },

    /// A configuration value is unusable.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::MissingField`].
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

/// Execution errors raised by the ingestion runtime.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The worker queue is at capacity.
    #[error("Ingest queue full (capacity: {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The worker pool has shut down or dropped the reply.
    #[error("Ingest runtime disconnected")]
    Disconnected,

    /// Waiting for a result took too long.
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        /// Elapsed wait in milliseconds.
        duration_ms: u64,
    },
}

/// Top-level error type for kyro-tally.
#[derive(Debug, Error)]
pub enum TallyError {
    /// The sample was rejected before any mutation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The backing store failed; the record is unchanged.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The ingestion runtime could not run the job.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Invariant violation inside the engine.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the violated invariant.
        message: String,
    },
}

impl TallyError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if resubmitting the same sample may succeed.
    ///
    /// Retrying is always the caller's decision; the engine never retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Internal { .. } => false,
            Self::Storage(e) => matches!(
                e,
                StorageError::BackendError(_) | StorageError::ConnectionError(_)
            ),
            Self::Execution(e) => matches!(
                e,
                ExecutionError::QueueFull { .. } | ExecutionError::Timeout { .. }
            ),
        }
    }
}

/// Result type alias for kyro-tally operations.
pub type TallyResult<T> = Result<T, TallyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_missing_field() {
        let err = ValidationError::missing("brand");
        let msg = format!("{err}");
        assert!(msg.contains("brand"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn test_execution_error_queue_full() {
        let err = ExecutionError::QueueFull { capacity: 16 };
        assert!(format!("{err}").contains("16"));
    }

    #[test]
    fn test_execution_error_timeout() {
        let err = ExecutionError::Timeout { duration_ms: 5000 };
        assert!(format!("{err}").contains("5000ms"));
    }

    #[test]
    fn test_tally_error_from_validation() {
        let err: TallyError = ValidationError::missing("name").into();
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_tally_error_from_storage() {
        let err: TallyError = StorageError::BackendError("disk full".to_string()).into();
        assert!(err.is_storage());
        assert!(err.is_retryable());
        assert!(format!("{err}").contains("disk full"));

        let err: TallyError = StorageError::SerializationError("bad".to_string()).into();
        assert!(!err.is_retryable());

        let err: TallyError = StorageError::ConnectionError("reset".to_string()).into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_tally_error_retryable() {
        let err: TallyError = ExecutionError::QueueFull { capacity: 1 }.into();
        assert!(err.is_execution());
        assert!(err.is_retryable());

        let err: TallyError = ExecutionError::Disconnected.into();
        assert!(!err.is_retryable());

        let err = TallyError::internal("unexpected state");
        assert!(!err.is_retryable());
        assert!(format!("{err}").contains("unexpected state"));
    }
}
