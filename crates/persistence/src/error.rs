//! Error types for the archive data-access layer.
//!
//! Errors are grouped by category: resource state (not-found), validation of caller
//! input (invalid-argument and range), search translation, transactions, and the
//! backend itself. Backend failures are passed through untouched by the orchestrator.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::types::{QueryLevel, Tag};

/// The primary error type for all archive operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Search translation errors
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Transaction errors
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StorageError {
    /// Returns true if key resolution found no row for the target entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Resource(ResourceError::NotFound { .. }))
    }

    /// Returns true if a required parameter was missing.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            StorageError::Validation(ValidationError::InvalidArgument { .. })
        )
    }

    /// Returns true if a parameter was present but outside its valid range.
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            StorageError::Validation(ValidationError::OutOfRange { .. })
        )
    }

    /// Creates a not-found error for the entity at `level`.
    pub fn not_found(level: QueryLevel, uid: impl Into<String>) -> Self {
        StorageError::Resource(ResourceError::NotFound {
            level,
            uid: uid.into(),
        })
    }
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// Key resolution found no row for the identifier.
    #[error("{level} is not found: {uid}")]
    NotFound { level: QueryLevel, uid: String },
}

/// Errors related to caller-supplied input.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A required argument is missing.
    #[error("invalid argument '{parameter}': {message}")]
    InvalidArgument { parameter: String, message: String },

    /// An argument is present but nonsensical.
    #[error("argument '{parameter}' out of range ({value}): {message}")]
    OutOfRange {
        parameter: String,
        value: String,
        message: String,
    },

    /// A store parameter set lacks a required attribute.
    #[error("missing required attribute: {keyword}")]
    MissingRequiredAttribute { keyword: String },

    /// A store parameter does not belong to the object being stored.
    #[error("parameter {keyword} ({value}) does not match object id {object_id}")]
    IdentifierMismatch {
        keyword: String,
        value: String,
        object_id: String,
    },
}

/// Errors raised while translating matching conditions.
#[derive(Error, Debug)]
pub enum SearchError {
    /// A range matching value could not be interpreted.
    #[error("invalid range '{value}' for attribute {tag}")]
    InvalidRange { tag: Tag, value: String },

    /// The schema has no table for the level.
    #[error("no query table mapped for level {level}")]
    UnmappedLevel { level: QueryLevel },
}

/// Errors related to transactions.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// The transaction could not be started.
    #[error("failed to begin transaction: {message}")]
    BeginFailed { message: String },

    /// The connection is not inside an active transaction.
    #[error("transaction no longer valid")]
    InvalidTransaction,

    /// Nested transactions not supported.
    #[error("nested transactions not supported")]
    NestedNotSupported,
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryError { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for archive operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StorageError::not_found(QueryLevel::Study, "1.2.3");
        assert_eq!(err.to_string(), "study is not found: 1.2.3");
        assert!(err.is_not_found());
        assert!(!err.is_invalid_argument());
    }

    #[test]
    fn test_validation_classification() {
        let missing: StorageError = ValidationError::InvalidArgument {
            parameter: "options".to_string(),
            message: "limit is required".to_string(),
        }
        .into();
        assert!(missing.is_invalid_argument());
        assert!(!missing.is_out_of_range());

        let range: StorageError = ValidationError::OutOfRange {
            parameter: "limit".to_string(),
            value: "0".to_string(),
            message: "must be greater than zero".to_string(),
        }
        .into();
        assert!(range.is_out_of_range());
        assert!(!range.is_invalid_argument());
    }

    #[test]
    fn test_search_error_display() {
        let err = SearchError::InvalidRange {
            tag: Tag::new(0x0008, 0x0020),
            value: "2020-2019-2018".to_string(),
        };
        assert!(err.to_string().contains("(0008,0020)"));
    }

    #[test]
    fn test_serde_json_conversion() {
        let bad: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: StorageError = bad.unwrap_err().into();
        assert!(matches!(
            err,
            StorageError::Backend(BackendError::SerializationError { .. })
        ));
    }
}
