//! On-disk layout and Parquet I/O for profiling artifacts.
//!
//! Every profiled table owns one directory:
//!
//! ```text
//! <root>/<connection>/<schema>/<table>/
//!     data.parquet       snapshot
//!     summary.parquet    summary records
//!     patterns.parquet   pattern artifact (tables with string columns only)
//!     staging/           files of a run in progress
//! ```
//!
//! A run writes into `staging/` and [`commit`] moves the files into place once
//! all of them exist, so readers never observe a half-written artifact.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use datafusion::physical_plan::{RecordBatchStream, SendableRecordBatchStream};
use futures::StreamExt;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use tracing::{debug, warn};

use crate::catalog::TableKey;
use crate::error::Result;
use crate::security::PathSecurity;

/// File name of the snapshot artifact.
pub const SNAPSHOT_FILE: &str = "data.parquet";
/// File name of the summary artifact.
pub const SUMMARY_FILE: &str = "summary.parquet";
/// File name of the pattern artifact.
pub const PATTERN_FILE: &str = "patterns.parquet";
/// Directory, inside a table directory, holding the files of an unfinished run.
pub const STAGING_DIR: &str = "staging";

/// Maps table keys to artifact directories under a root.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory owned by `key`, rejecting components that could
    /// escape the root.
    pub fn table_dir(&self, key: &TableKey) -> Result<PathBuf> {
        PathSecurity::validate_component(&key.connection, "Connection name")?;
        PathSecurity::validate_component(&key.schema, "Schema name")?;
        PathSecurity::validate_component(&key.table, "Table name")?;
        Ok(self
            .root
            .join(&key.connection)
            .join(&key.schema)
            .join(&key.table))
    }

    /// Returns the final artifact paths for `key`.
    pub fn paths(&self, key: &TableKey) -> Result<ArtifactPaths> {
        Ok(ArtifactPaths::in_dir(self.table_dir(key)?))
    }
}

/// Paths of the three artifacts inside one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub snapshot: PathBuf,
    pub summary: PathBuf,
    pub patterns: PathBuf,
}

impl ArtifactPaths {
    fn in_dir(dir: PathBuf) -> Self {
        Self {
            snapshot: dir.join(SNAPSHOT_FILE),
            summary: dir.join(SUMMARY_FILE),
            patterns: dir.join(PATTERN_FILE),
            dir,
        }
    }

    /// The same artifacts inside the staging directory.
    pub fn staged(&self) -> ArtifactPaths {
        Self::in_dir(self.dir.join(STAGING_DIR))
    }
}

/// Streams record batches into a Parquet file, returning the number of rows written.
///
/// The file is created even when the stream yields no batches, so an empty
/// relation still produces a readable artifact with its schema.
pub(crate) async fn write_stream(mut stream: SendableRecordBatchStream, path: &Path) -> Result<u64> {
    ensure_parent(path)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, stream.schema(), None)?;

    let mut rows = 0u64;
    while let Some(batch) = stream.next().await {
        let batch = batch?;
        rows += batch.num_rows() as u64;
        writer.write(&batch)?;
    }
    writer.close()?;

    debug!(path = %path.display(), rows, "Parquet artifact written");
    Ok(rows)
}

/// Writes in-memory batches sharing `schema` into a Parquet file.
pub(crate) fn write_batches(schema: SchemaRef, batches: &[RecordBatch], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}

/// Reads the embedded Arrow schema and row count from a Parquet footer.
pub fn read_schema(path: &Path) -> Result<(SchemaRef, u64)> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let rows = builder.metadata().file_metadata().num_rows().max(0) as u64;
    Ok((builder.schema().clone(), rows))
}

/// Reads every batch of a Parquet file.
pub fn read_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(batches)
}

/// Moves staged artifacts into their final location and removes the staging directory.
///
/// When the run produced no pattern artifact, a pattern file left by an earlier
/// run is deleted so it cannot be mistaken for current data.
pub(crate) fn commit(paths: &ArtifactPaths, with_patterns: bool) -> Result<()> {
    let staged = paths.staged();

    std::fs::rename(&staged.snapshot, &paths.snapshot)?;
    std::fs::rename(&staged.summary, &paths.summary)?;
    if with_patterns {
        std::fs::rename(&staged.patterns, &paths.patterns)?;
    } else if paths.patterns.exists() {
        std::fs::remove_file(&paths.patterns)?;
    }

    std::fs::remove_dir_all(&staged.dir)?;
    debug!(dir = %paths.dir.display(), "Artifacts committed");
    Ok(())
}

/// Deletes whatever a failed run left in the staging directory.
pub(crate) fn discard_staged(paths: &ArtifactPaths) {
    let staged = paths.staged();
    if let Err(e) = std::fs::remove_dir_all(&staged.dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(dir = %staged.dir.display(), error = %e, "Failed to clean staging directory");
        }
    }
}

/// Deletes a table's artifact directory. A directory that is already gone is not an error.
pub(crate) fn remove_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec![Some("a"), None, Some("c")])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_layout_paths() {
        let layout = ArtifactLayout::new("/profiles");
        let paths = layout
            .paths(&TableKey::new("pg", "public", "users"))
            .unwrap();

        assert_eq!(paths.dir, PathBuf::from("/profiles/pg/public/users"));
        assert_eq!(
            paths.snapshot,
            PathBuf::from("/profiles/pg/public/users/data.parquet")
        );
        assert_eq!(
            paths.staged().summary,
            PathBuf::from("/profiles/pg/public/users/staging/summary.parquet")
        );
    }

    #[test]
    fn test_layout_rejects_escaping_components() {
        let layout = ArtifactLayout::new("/profiles");
        assert!(layout.paths(&TableKey::new("pg", "..", "users")).is_err());
        assert!(layout.paths(&TableKey::new("pg", "public", "a/b")).is_err());
        assert!(layout.paths(&TableKey::new("", "public", "users")).is_err());
    }

    #[test]
    fn test_write_and_read_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.parquet");
        let batch = batch();

        write_batches(batch.schema(), std::slice::from_ref(&batch), &path).unwrap();

        let (schema, rows) = read_schema(&path).unwrap();
        assert_eq!(rows, 3);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);

        let read = read_batches(&path).unwrap();
        assert_eq!(read.iter().map(|b| b.num_rows()).sum::<usize>(), 3);
    }

    #[test]
    fn test_empty_file_keeps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.parquet");

        write_batches(batch().schema(), &[], &path).unwrap();

        let (schema, rows) = read_schema(&path).unwrap();
        assert_eq!(rows, 0);
        assert_eq!(schema.fields().len(), 2);
    }

    #[test]
    fn test_read_schema_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.parquet");
        std::fs::write(&path, b"definitely not parquet").unwrap();

        assert!(read_schema(&path).is_err());
        assert!(read_schema(&dir.path().join("missing.parquet")).is_err());
    }

    #[test]
    fn test_commit_moves_files_and_drops_stale_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactLayout::new(dir.path())
            .paths(&TableKey::new("pg", "public", "users"))
            .unwrap();
        let staged = paths.staged();
        let batch = batch();

        std::fs::create_dir_all(&paths.dir).unwrap();
        std::fs::write(&paths.patterns, b"old").unwrap();

        write_batches(batch.schema(), std::slice::from_ref(&batch), &staged.snapshot).unwrap();
        write_batches(batch.schema(), std::slice::from_ref(&batch), &staged.summary).unwrap();
        commit(&paths, false).unwrap();

        assert!(paths.snapshot.exists());
        assert!(paths.summary.exists());
        assert!(!paths.patterns.exists());
        assert!(!staged.dir.exists());
    }

    #[test]
    fn test_discard_and_remove_are_tolerant() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactLayout::new(dir.path())
            .paths(&TableKey::new("pg", "public", "users"))
            .unwrap();

        discard_staged(&paths);
        remove_dir(&paths.dir).unwrap();

        std::fs::create_dir_all(paths.staged().dir).unwrap();
        discard_staged(&paths);
        assert!(!paths.staged().dir.exists());
    }
}
