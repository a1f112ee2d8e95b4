//! Materialization of source tables into snapshots.

use std::path::{Path, PathBuf};

use arrow::datatypes::{DataType, SchemaRef};
use datafusion::prelude::{ParquetReadOptions, SessionContext};
use tracing::{debug, instrument};

use crate::artifacts;
use crate::error::{ProfileError, Result};
use crate::sources::SourceConnector;

/// Table name under which a snapshot is registered on a session.
pub const SNAPSHOT_TABLE: &str = "snapshot";

/// Copies one source table, unchanged, into a Parquet file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Streams `schema.table` from `source` into `path` and opens the result.
    ///
    /// Any failure while reading the source or writing the file is reported as
    /// [`ProfileError::SourceRead`]; a partially written file may be left at
    /// `path` and must not be registered anywhere.
    #[instrument(skip(self, source, path), fields(connection = %source.connection_name()))]
    pub async fn extract(
        &self,
        source: &dyn SourceConnector,
        schema: &str,
        table: &str,
        path: &Path,
    ) -> Result<Snapshot> {
        let frame = source.table(schema, table).await?;
        let stream = frame
            .execute_stream()
            .await
            .map_err(|e| ProfileError::source_read(schema, table, e))?;

        let rows = artifacts::write_stream(stream, path)
            .await
            .map_err(|e| ProfileError::source_read(schema, table, e))?;
        debug!(schema, table, rows, "Snapshot written");

        Snapshot::open(path).map_err(|e| ProfileError::source_read(schema, table, e))
    }
}

/// A column of a snapshot as fixed at extraction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotColumn {
    pub name: String,
    /// 1-based position in the snapshot schema.
    pub ordinal: usize,
    pub data_type: DataType,
}

/// An immutable Parquet materialization of a table.
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: PathBuf,
    schema: SchemaRef,
    row_count: u64,
}

impl Snapshot {
    /// Opens a snapshot file, reading its schema and row count from the footer.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (schema, row_count) = artifacts::read_schema(&path)?;
        Ok(Self {
            path,
            schema,
            row_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared Arrow schema, as embedded in the file.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Columns in ordinal order.
    pub fn columns(&self) -> Vec<SnapshotColumn> {
        self.schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| SnapshotColumn {
                name: field.name().clone(),
                ordinal: i + 1,
                data_type: field.data_type().clone(),
            })
            .collect()
    }

    /// Looks up a column by exact name.
    pub fn column(&self, name: &str) -> Option<SnapshotColumn> {
        self.columns().into_iter().find(|c| c.name == name)
    }

    /// Registers the snapshot on `ctx` as [`SNAPSHOT_TABLE`].
    pub async fn register(&self, ctx: &SessionContext) -> Result<()> {
        register_parquet(ctx, SNAPSHOT_TABLE, &self.path).await
    }
}

/// Registers a Parquet file on a session under `name`.
pub(crate) async fn register_parquet(ctx: &SessionContext, name: &str, path: &Path) -> Result<()> {
    let location = path.to_str().ok_or_else(|| {
        ProfileError::invalid_input(format!(
            "Artifact path is not valid UTF-8: {}",
            path.display()
        ))
    })?;
    ctx.register_parquet(name, location, ParquetReadOptions::default())
        .await?;
    Ok(())
}
