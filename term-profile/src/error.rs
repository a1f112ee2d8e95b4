//! Error types for the profiling pipeline, catalog and derived views.
//!
//! Errors that belong to a single table carry its `(schema, table)` key (and the
//! column when one is involved) so that callers can surface short messages
//! without a backtrace.

use std::path::PathBuf;

use thiserror::Error;

/// Result type used throughout term-profile.
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Errors that can occur while profiling tables or reading profiles back.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// The source table could not be read during extraction.
    #[error("Failed to read {schema}.{table}: {message}")]
    SourceRead {
        schema: String,
        table: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A statistic, pattern or artifact could not be computed for a table.
    #[error("{}", compute_message(.schema, .table, .column.as_deref(), .message))]
    Compute {
        schema: String,
        table: String,
        column: Option<String>,
        message: String,
    },

    /// A catalog entry references an artifact that is missing or unreadable.
    #[error("Artifact for {key} is missing or unreadable at {}: {message}", .path.display())]
    ArtifactMissing {
        key: String,
        path: PathBuf,
        message: String,
    },

    /// The catalog store could not be written.
    #[error("Failed to write catalog: {0}")]
    CatalogWrite(String),

    /// The catalog store could not be opened or read.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// No catalog entry exists for the requested table.
    #[error("Table {0} has not been profiled")]
    NotProfiled(String),

    /// The requested column does not exist in the snapshot.
    #[error("Column '{column}' not found in {key}")]
    ColumnNotFound { key: String, column: String },

    /// Caller supplied an identifier, path component or pattern that was rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Profiling was cancelled before this table started.
    #[error("Profiling cancelled before {schema}.{table} started")]
    Cancelled { schema: String, table: String },

    /// DataFusion query planning or execution error.
    #[error("Query execution failed: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Arrow computation error.
    #[error("Arrow computation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet encoding or decoding error.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn compute_message(schema: &str, table: &str, column: Option<&str>, message: &str) -> String {
    match column {
        Some(column) => format!("Failed to profile {schema}.{table}.{column}: {message}"),
        None => format!("Failed to profile {schema}.{table}: {message}"),
    }
}

impl ProfileError {
    /// Creates a source read error for a table.
    pub fn source_read(
        schema: impl Into<String>,
        table: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::SourceRead {
            schema: schema.into(),
            table: table.into(),
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// Creates a compute error attributed to a table.
    pub fn compute(
        schema: impl Into<String>,
        table: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Compute {
            schema: schema.into(),
            table: table.into(),
            column: None,
            message: message.into(),
        }
    }

    /// Creates a compute error attributed to one column of a table.
    pub fn column_compute(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Compute {
            schema: schema.into(),
            table: table.into(),
            column: Some(column.into()),
            message: message.into(),
        }
    }

    /// Creates an invalid input error with the given message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Returns true if this error is an artifact problem that led to catalog pruning.
    pub fn is_artifact_missing(&self) -> bool {
        matches!(self, Self::ArtifactMissing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_error_mentions_column() {
        let err = ProfileError::column_compute("sales", "orders", "qty", "unsupported cast");
        assert_eq!(
            err.to_string(),
            "Failed to profile sales.orders.qty: unsupported cast"
        );

        let err = ProfileError::compute("sales", "orders", "no columns");
        assert_eq!(err.to_string(), "Failed to profile sales.orders: no columns");
    }

    #[test]
    fn test_source_read_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "table vanished");
        let err = ProfileError::source_read("public", "users", io);
        assert!(err.to_string().contains("public.users"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_artifact_missing_flag() {
        let err = ProfileError::ArtifactMissing {
            key: "pg/public.users".to_string(),
            path: PathBuf::from("/tmp/none.parquet"),
            message: "not found".to_string(),
        };
        assert!(err.is_artifact_missing());
        assert!(!ProfileError::NotProfiled("x".into()).is_artifact_missing());
    }
}
