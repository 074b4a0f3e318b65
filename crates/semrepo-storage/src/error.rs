//! Error types for the storage crate.

use std::path::PathBuf;

use thiserror::Error;

// Re-export the core error type
pub use semrepo_core::error::Error as CoreError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Storage error types.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error while preparing the database location.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catalog file could not be read.
    #[error("Cannot read catalog {}: {source}", .path.display())]
    CatalogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// redb error.
    #[error("Database error: {0}")]
    Database(String),

    /// An entity was written without an id.
    #[error("{kind} without id")]
    MissingId { kind: &'static str },

    /// An aspect node cannot be deleted while other nodes point at it.
    #[error("aspect node {id} still has children")]
    HasChildren { id: String },
}

// Convert to CoreError
impl From<Error> for CoreError {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => CoreError::Storage(e.to_string()),
            e @ Error::CatalogFile { .. } => CoreError::NotFound(e.to_string()),
            Error::Serialization(s) => CoreError::Serialization(s),
            Error::Database(s) => CoreError::Storage(s),
            e @ (Error::MissingId { .. } | Error::HasChildren { .. }) => {
                CoreError::Validation(e.to_string())
            }
        }
    }
}

// External error conversions
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<redb::Error> for Error {
    fn from(e: redb::Error) -> Self {
        Error::Database(e.to_string())
    }
}

impl From<redb::TransactionError> for Error {
    fn from(e: redb::TransactionError) -> Self {
        Error::Database(format!("transaction: {}", e))
    }
}

impl From<redb::TableError> for Error {
    fn from(e: redb::TableError) -> Self {
        Error::Database(format!("table: {}", e))
    }
}

impl From<redb::StorageError> for Error {
    fn from(e: redb::StorageError) -> Self {
        Error::Database(format!("storage: {}", e))
    }
}

impl From<redb::CommitError> for Error {
    fn from(e: redb::CommitError) -> Self {
        Error::Database(format!("commit: {}", e))
    }
}

impl From<redb::DatabaseError> for Error {
    fn from(e: redb::DatabaseError) -> Self {
        Error::Database(format!("open: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_validation_errors() {
        let err: CoreError = Error::HasChildren {
            id: "air".to_string(),
        }
        .into();
        assert_eq!(
            err,
            CoreError::Validation("aspect node air still has children".to_string())
        );
        assert!(err.is_client_error());

        let err: CoreError = Error::MissingId { kind: "function" }.into();
        assert_eq!(err, CoreError::Validation("function without id".to_string()));
    }

    #[test]
    fn test_unreadable_catalog_is_not_found() {
        let err: CoreError = Error::CatalogFile {
            path: PathBuf::from("/nowhere/catalog.json"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();
        assert!(matches!(err, CoreError::NotFound(msg) if msg.contains("/nowhere/catalog.json")));
    }
}
