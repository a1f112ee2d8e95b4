//! Derived views computed from stored artifacts.
//!
//! Views never touch the original source: the [`ViewEngine`] finds a table's
//! artifacts through the [`Catalog`], verifies them, and runs its queries on a
//! fresh DataFusion session over the Parquet files. An entry whose artifact is
//! missing or unreadable is pruned from the catalog before the error reaches
//! the caller.
//!
//! # Example
//!
//! ```rust,no_run
//! use term_profile::catalog::TableKey;
//! use term_profile::config::ProfilerConfig;
//! use term_profile::views::{Histogram, ViewEngine};
//!
//! # async fn example() -> term_profile::error::Result<()> {
//! let engine = ViewEngine::new(ProfilerConfig::default())?;
//! let key = TableKey::new("warehouse", "sales", "orders");
//!
//! match engine.histogram(&key, "amount").await? {
//!     Histogram::Numeric(h) => {
//!         for bin in h.bins {
//!             println!("[{}, {}): {}", bin.lower, bin.upper, bin.count);
//!         }
//!     }
//!     other => println!("{other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

mod frequency;
mod histogram;
mod metrics;
mod overview;
mod pattern_match;

pub use frequency::ValueFrequency;
pub use histogram::{DateBin, Histogram, LengthBin, NumericBin, NumericBinning, NumericHistogram, BIN_COUNT};
pub use metrics::{ColumnMetrics, MetricsDetail};
pub use overview::{ProfiledTable, ProfiledTables};
pub use pattern_match::PatternMatch;

use std::path::Path;

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Int64Type};
use arrow::util::display::array_value_to_string;
use datafusion::prelude::SessionContext;
use tracing::{debug, warn};

use crate::catalog::{Catalog, CatalogEntry, TableKey};
use crate::config::ProfilerConfig;
use crate::error::{ProfileError, Result};
use crate::extractor::{Snapshot, SnapshotColumn};
use crate::logging::{truncate_field, LogConfig};

/// Computes views over profiled tables.
#[derive(Debug, Clone)]
pub struct ViewEngine {
    catalog: Catalog,
    config: ProfilerConfig,
    log_config: LogConfig,
}

impl ViewEngine {
    /// Creates an engine reading the catalog at `config.catalog_path`, after validating `config`.
    pub fn new(config: ProfilerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog: Catalog::new(config.catalog_path.clone()),
            config,
            log_config: LogConfig::default(),
        })
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Returns the catalog entry for `key`, or [`ProfileError::NotProfiled`].
    pub(crate) fn entry(&self, key: &TableKey) -> Result<CatalogEntry> {
        self.catalog
            .lookup(key)?
            .ok_or_else(|| ProfileError::NotProfiled(key.to_string()))
    }

    /// Prunes `key` and builds the error reported for its unreadable artifact.
    pub(crate) fn artifact_missing(
        &self,
        key: &TableKey,
        path: &Path,
        error: ProfileError,
    ) -> Result<ProfileError> {
        warn!(key = %key, path = %path.display(), error = %error, "Artifact unreadable, pruning catalog entry");
        self.catalog.prune(key)?;
        Ok(ProfileError::ArtifactMissing {
            key: key.to_string(),
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }

    /// Verifies and opens the snapshot of `entry`, pruning the entry if it cannot be read.
    pub(crate) fn open_snapshot(&self, entry: &CatalogEntry) -> Result<Snapshot> {
        match Snapshot::open(&entry.snapshot_path) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => Err(self.artifact_missing(&entry.key, &entry.snapshot_path, e)?),
        }
    }

    /// Opens the snapshot of `key`, resolves `column` in it, and registers it on a fresh session.
    pub(crate) async fn snapshot_session(
        &self,
        key: &TableKey,
        column: &str,
    ) -> Result<(SessionContext, SnapshotColumn)> {
        let entry = self.entry(key)?;
        let snapshot = self.open_snapshot(&entry)?;
        let column = resolve_column(&snapshot, key, column)?;

        let ctx = self.config.session_context();
        snapshot.register(&ctx).await?;
        Ok((ctx, column))
    }

    pub(crate) fn log_query(&self, view: &str, sql: &str) {
        if self.log_config.log_view_queries {
            debug!(
                view,
                sql = %truncate_field(sql, self.log_config.max_field_length),
                "Running view query"
            );
        }
    }
}

pub(crate) fn resolve_column(
    snapshot: &Snapshot,
    key: &TableKey,
    column: &str,
) -> Result<SnapshotColumn> {
    snapshot
        .column(column)
        .ok_or_else(|| ProfileError::ColumnNotFound {
            key: key.to_string(),
            column: column.to_string(),
        })
}

/// Runs a query returning `(v, cnt)` rows and renders each value as text.
pub(crate) async fn grouped_counts(
    ctx: &SessionContext,
    sql: &str,
) -> Result<Vec<(Option<String>, u64)>> {
    let batches = ctx.sql(sql).await?.collect().await?;

    let mut groups = Vec::new();
    for batch in &batches {
        let values = batch.column(0);
        let counts = cast(batch.column(1), &DataType::Int64)?;
        let counts = counts.as_primitive::<Int64Type>();
        for i in 0..batch.num_rows() {
            let value = if values.is_null(i) {
                None
            } else {
                Some(array_value_to_string(values, i)?)
            };
            groups.push((value, counts.value(i).max(0) as u64));
        }
    }
    Ok(groups)
}
