//! Error types for gridlink core.

use crate::dialect::Facet;
use crate::unit_of_work::TupleState;
use std::fmt;
use thiserror::Error;

/// Result type for dialect operations.
pub type DialectResult<T> = Result<T, DialectError>;

/// Boxed backend error carried by [`DialectError::Operation`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while driving a storage dialect.
///
/// An optimistic-lock miss is deliberately absent: it is reported as
/// `Ok(false)` by the locking facet.
#[derive(Debug, Error)]
pub enum DialectError {
    /// The backend client could not be created. Fatal at startup.
    #[error("dialect initialization failed: {message}")]
    Initialization {
        /// Description of the failure.
        message: String,
    },

    /// A single backend call failed. Carries the original cause.
    #[error("{operation} failed for {key}: {source}")]
    Operation {
        /// Name of the dialect operation.
        operation: &'static str,
        /// Rendered key the operation targeted.
        key: String,
        /// Backend-specific cause.
        #[source]
        source: BoxError,
    },

    /// No id could be generated. Never recovered with a fallback value.
    #[error("id generation failed for {key}: {message}")]
    IdGeneration {
        /// Rendered id source key.
        key: String,
        /// Description of the failure.
        message: String,
    },

    /// An insert targeted a key that already holds a record.
    #[error("tuple already exists: {key}")]
    TupleAlreadyExists {
        /// Rendered entity key.
        key: String,
    },

    /// A facet was requested from a dialect that does not offer it.
    #[error("dialect does not support {facet}")]
    UnsupportedFacet {
        /// The missing facet.
        facet: Facet,
    },

    /// A native query or criteria could not be understood.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Description of the problem.
        message: String,
    },

    /// Options or configuration could not be loaded.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// A write would give two records of a table the same value in a
    /// uniquely constrained column.
    #[error("unique constraint {constraint} violated by {key}")]
    UniqueConstraintViolation {
        /// Constraint name.
        constraint: String,
        /// Rendered key of the rejected write.
        key: String,
    },

    /// A key was built from mismatched column names and values.
    #[error("invalid key: {message}")]
    InvalidKey {
        /// Description of the problem.
        message: String,
    },

    /// A managed tuple was asked to move to a state it cannot reach.
    #[error("invalid tuple state transition: {from:?} -> {to:?}")]
    InvalidStateTransition {
        /// Current state.
        from: TupleState,
        /// Requested state.
        to: TupleState,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// Value codec error.
    #[error("codec error: {0}")]
    Codec(#[from] gridlink_codec::CodecError),

    /// Key-value client error.
    #[error("storage error: {0}")]
    Storage(#[from] gridlink_storage::StorageError),
}

impl DialectError {
    /// Creates an initialization error.
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }

    /// Wraps a backend failure of `operation` on `key`.
    pub fn operation(
        operation: &'static str,
        key: &impl fmt::Display,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Operation {
            operation,
            key: key.to_string(),
            source: source.into(),
        }
    }

    /// Creates an id generation error.
    pub fn id_generation(key: &impl fmt::Display, message: impl Into<String>) -> Self {
        Self::IdGeneration {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Creates a tuple already exists error.
    pub fn tuple_already_exists(key: &impl fmt::Display) -> Self {
        Self::TupleAlreadyExists {
            key: key.to_string(),
        }
    }

    /// Creates a unique constraint violation error.
    pub fn unique_constraint_violation(constraint: impl Into<String>, key: &impl fmt::Display) -> Self {
        Self::UniqueConstraintViolation {
            constraint: constraint.into(),
            key: key.to_string(),
        }
    }

    /// Creates an unsupported facet error.
    pub fn unsupported_facet(facet: Facet) -> Self {
        Self::UnsupportedFacet { facet }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Whether this is a backend operation failure.
    #[must_use]
    pub fn is_operation(&self) -> bool {
        matches!(self, Self::Operation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_storage::StorageError;

    #[test]
    fn operation_error_keeps_cause() {
        let err = DialectError::operation("get_tuple", &"users[id=1]", StorageError::Closed);
        assert!(err.is_operation());
        assert_eq!(
            err.to_string(),
            "get_tuple failed for users[id=1]: storage is closed"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn storage_errors_convert_into_dialect_errors() {
        let err: DialectError = StorageError::Unavailable("connection refused".into()).into();
        assert_eq!(err.to_string(), "storage error: backend unavailable: connection refused");
    }

    #[test]
    fn unsupported_facet_names_the_facet() {
        let err = DialectError::unsupported_facet(Facet::StoredProcedures);
        assert_eq!(err.to_string(), "dialect does not support stored procedures");
    }
}
