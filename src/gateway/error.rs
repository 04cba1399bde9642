//! Data source error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while producing a table snapshot
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// The database could not be opened (missing file, permissions, corrupt header)
    #[error("Failed to open data source {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Preparing or stepping the snapshot query failed
    #[error("Query against table {table} failed: {source}")]
    Query {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Table name is not a plain SQL identifier
    #[error("Invalid table name: {0:?}")]
    InvalidTable(String),

    /// Snapshot could not be encoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for gateway operations
pub type DataSourceResult<T> = Result<T, DataSourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DataSourceError::InvalidTable("actor; DROP".to_string());
        assert_eq!(err.to_string(), "Invalid table name: \"actor; DROP\"");

        let err = DataSourceError::Query {
            table: "actor".to_string(),
            source: rusqlite::Error::InvalidQuery,
        };
        assert!(err.to_string().starts_with("Query against table actor failed"));
    }
}
