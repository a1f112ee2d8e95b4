//! Catalog-wide overview and per-table summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::catalog::TableKey;
use crate::error::Result;
use crate::summarizer::SummaryRecord;

use super::ViewEngine;

/// Overview line of one profiled table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfiledTable {
    pub key: TableKey,
    pub column_count: usize,
    pub row_count: u64,
    pub last_profiled: DateTime<Utc>,
}

/// Result of listing profiled tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfiledTables {
    pub tables: Vec<ProfiledTable>,
    /// Entries pruned during this listing because their summary could not be read.
    pub removed: Vec<TableKey>,
}

impl ViewEngine {
    /// Lists every profiled table with its column and row counts.
    ///
    /// Entries whose summary artifact cannot be read are pruned from the
    /// catalog and reported in [`ProfiledTables::removed`]; the listing itself
    /// still succeeds, even when pruning fails. Only an unreadable catalog is
    /// an error.
    #[instrument(skip(self))]
    pub async fn profiled_tables(&self) -> Result<ProfiledTables> {
        let mut listing = ProfiledTables::default();

        for entry in self.catalog().list_all()? {
            match SummaryRecord::read(&entry.summary_path) {
                Ok(records) => listing.tables.push(ProfiledTable {
                    column_count: records.len(),
                    row_count: records.iter().map(|r| r.row_count).max().unwrap_or(0),
                    last_profiled: entry.last_profiled,
                    key: entry.key,
                }),
                Err(e) => {
                    // Both failures are logged; the listing only reports the key.
                    if let Err(prune_error) = self.artifact_missing(&entry.key, &entry.summary_path, e) {
                        warn!(key = %entry.key, error = %prune_error, "Failed to prune invalid catalog entry");
                    }
                    listing.removed.push(entry.key);
                }
            }
        }

        if !listing.removed.is_empty() {
            info!(removed = listing.removed.len(), "Removed invalid records from the catalog");
        }
        Ok(listing)
    }

    /// Summary records of one table in ordinal order.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn table_profile(&self, key: &TableKey) -> Result<Vec<SummaryRecord>> {
        let entry = self.entry(key)?;
        let mut records = match SummaryRecord::read(&entry.summary_path) {
            Ok(records) => records,
            Err(e) => return Err(self.artifact_missing(key, &entry.summary_path, e)?),
        };
        records.sort_by_key(|r| r.ordinal_position);
        Ok(records)
    }
}
