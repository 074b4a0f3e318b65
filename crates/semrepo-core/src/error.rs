//! Unified error handling for semrepo.
//!
//! Every crate in the workspace converts its local errors into this type so
//! the transport layer can classify failures with [`Error::is_client_error`].

/// Unified error type for semrepo.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed or contradictory filter criteria. Reported to the caller, never retried.
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    /// A function or aspect id that is not part of the loaded catalog.
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    /// The aspect parent relation contains a cycle.
    #[error("Cycle detected at aspect node {node_id}: {}", .path.join(" -> "))]
    CycleDetected { node_id: String, path: Vec<String> },

    /// Not found errors.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage/database errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_criteria(msg: impl Into<String>) -> Self {
        Self::InvalidCriteria(msg.into())
    }

    pub fn unknown_reference(msg: impl Into<String>) -> Self {
        Self::UnknownReference(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Errors caused by the request rather than by the registry state.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidCriteria(_)
                | Error::UnknownReference(_)
                | Error::NotFound(_)
                | Error::Validation(_)
        )
    }

    /// Errors that indicate corrupted catalog data.
    pub fn is_data_integrity_error(&self) -> bool {
        matches!(self, Error::CycleDetected { .. })
    }
}

/// Convenience macros for creating errors.
#[macro_export]
macro_rules! invalid_criteria_err {
    ($msg:expr) => {
        $crate::error::Error::InvalidCriteria($msg.into())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::InvalidCriteria(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! unknown_reference_err {
    ($msg:expr) => {
        $crate::error::Error::UnknownReference($msg.into())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::UnknownReference(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! not_found_err {
    ($msg:expr) => {
        $crate::error::Error::NotFound($msg.into())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::NotFound(format!($fmt, $($arg)*))
    };
}

// Error conversion helpers
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
