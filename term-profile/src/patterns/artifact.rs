//! Builds the pattern artifact: every string column of a snapshot with its
//! values replaced by stored-variant signatures.

use std::path::Path;

use datafusion::prelude::SessionContext;
use tracing::debug;

use crate::artifacts;
use crate::error::Result;
use crate::extractor::{Snapshot, SNAPSHOT_TABLE};
use crate::security::SqlSecurity;
use crate::types::ColumnKind;

use super::PATTERN_SIGNATURE_FUNCTION;

/// Names of the snapshot columns that are generalized into the pattern artifact.
pub fn pattern_columns(snapshot: &Snapshot) -> Vec<String> {
    snapshot
        .columns()
        .into_iter()
        .filter(|c| ColumnKind::of(&c.data_type) == ColumnKind::String)
        .map(|c| c.name)
        .collect()
}

/// Writes the pattern artifact for `snapshot` to `path`.
///
/// `ctx` must already have the snapshot registered. Returns `false`, writing
/// nothing, when the snapshot has no string columns. Rows keep the snapshot's
/// order and count.
pub async fn write_pattern_artifact(
    ctx: &SessionContext,
    snapshot: &Snapshot,
    path: &Path,
) -> Result<bool> {
    let columns = pattern_columns(snapshot);
    if columns.is_empty() {
        debug!(snapshot = %snapshot.path().display(), "No string columns, skipping pattern artifact");
        return Ok(false);
    }

    let projections = columns
        .iter()
        .map(|name| {
            let col = SqlSecurity::quote_identifier(name)?;
            Ok(format!("{PATTERN_SIGNATURE_FUNCTION}({col}) AS {col}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let sql = format!("SELECT {} FROM {SNAPSHOT_TABLE}", projections.join(", "));
    let stream = ctx.sql(&sql).await?.execute_stream().await?;
    let rows = artifacts::write_stream(stream, path).await?;

    debug!(columns = columns.len(), rows, "Pattern artifact written");
    Ok(true)
}
