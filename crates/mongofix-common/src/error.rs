//! Error types for mongofix

use thiserror::Error;

/// Result type alias for mongofix operations
pub type Result<T> = std::result::Result<T, FixtureError>;

/// Unified error type for all mongofix operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FixtureError {
    /// A required configuration value is missing or invalid.
    /// Raised before any network activity.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or handshake failure while opening a connection scope
    #[error("Connection error: {0}")]
    Connection(String),

    /// A pre-insert hook rejected a document
    #[error("Transformation error in collection '{collection}': {message}")]
    Transformation { collection: String, message: String },

    /// Count/find/insert failure reported by the database client
    #[error("Query error: {0}")]
    Query(String),

    /// A find-by-id lookup matched no document
    #[error("No document with _id {id} in collection '{collection}'")]
    NotFound { collection: String, id: String },

    /// The scoped deadline elapsed before the operation finished
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The caller cancelled the operation's context
    #[error("Operation cancelled")]
    Cancelled,

    /// A fixture file could not be located, read or parsed
    #[error("Fixture error: {0}")]
    Fixture(String),
}

impl FixtureError {
    /// Build a transformation error for the given collection
    pub fn transformation(collection: impl Into<String>, message: impl Into<String>) -> Self {
        FixtureError::Transformation {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Returns true if a find-by-id matched nothing
    pub fn is_not_found(&self) -> bool {
        matches!(self, FixtureError::NotFound { .. })
    }

    /// Returns true for failures raised by the database client while
    /// counting, finding or inserting, including "not found"
    pub fn is_query_error(&self) -> bool {
        matches!(self, FixtureError::Query(_) | FixtureError::NotFound { .. })
    }

    /// Returns true if the scoped deadline elapsed.
    ///
    /// Nothing in mongofix retries; this is for callers such as CI scripts
    /// waiting for the database to come up.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FixtureError::Timeout(_))
    }
}

// MongoDB-specific error conversions (when mongodb-errors feature is enabled)
#[cfg(feature = "mongodb-errors")]
impl From<mongodb::error::Error> for FixtureError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;
        match *err.kind {
            ErrorKind::Io(_)
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ConnectionPoolCleared { .. } => {
                FixtureError::Connection(err.to_string())
            }
            ErrorKind::InvalidArgument { .. } => FixtureError::Configuration(err.to_string()),
            _ => FixtureError::Query(err.to_string()),
        }
    }
}
