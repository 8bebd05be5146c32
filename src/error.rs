use thiserror::Error;

/// Main error type for Schemascope
#[derive(Error, Debug)]
pub enum SchemascopeError {
    /// Graph store unreachable, or it refused the credentials
    #[error("Connection error: {0}")]
    Connection(String),

    /// The graph store rejected a statement
    #[error("Query error: {0}")]
    Query(String),

    /// No aggregate has been persisted yet
    #[error("Aggregate not found: no schema available yet")]
    AggregateNotFound,

    /// The persisted aggregate exists but cannot be read back
    #[error("Malformed aggregate: {0}")]
    MalformedAggregate(String),

    /// Database-related errors (SQLite snapshot backend)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected response shapes from the graph store
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SchemascopeError {
    /// True for conditions the caller should surface as "no schema available yet".
    ///
    /// A corrupt snapshot cannot be told apart from an absent one without
    /// deeper inspection, so both count.
    pub fn is_missing_aggregate(&self) -> bool {
        matches!(
            self,
            SchemascopeError::AggregateNotFound | SchemascopeError::MalformedAggregate(_)
        )
    }
}

/// Convenient Result type using SchemascopeError
pub type Result<T> = std::result::Result<T, SchemascopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchemascopeError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: SchemascopeError = rusqlite_err.into();
        assert!(matches!(err, SchemascopeError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SchemascopeError = io_err.into();
        assert!(matches!(err, SchemascopeError::Io(_)));
    }

    #[test]
    fn test_missing_aggregate_covers_corruption() {
        assert!(SchemascopeError::AggregateNotFound.is_missing_aggregate());
        assert!(SchemascopeError::MalformedAggregate("eof".into()).is_missing_aggregate());
        assert!(!SchemascopeError::Connection("refused".into()).is_missing_aggregate());
    }
}
