//! Type-dispatched metrics of a single column.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::catalog::TableKey;
use crate::error::{ProfileError, Result};
use crate::extractor::SNAPSHOT_TABLE;
use crate::security::SqlSecurity;
use crate::summarizer::{scalar_f64, scalar_string, scalar_u64};
use crate::types::ColumnKind;

use super::ViewEngine;

/// Metrics of one column of a profiled table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetrics {
    pub column: String,
    pub data_type: String,
    pub kind: ColumnKind,
    /// Number of non-null values.
    pub count: u64,
    pub null_count: u64,
    pub distinct_count: u64,
    pub detail: MetricsDetail,
}

/// Metrics that only make sense for some column kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricsDetail {
    String {
        min_value: Option<String>,
        max_value: Option<String>,
        min_length: Option<u64>,
        max_length: Option<u64>,
        avg_length: Option<f64>,
    },
    Numeric {
        min_value: Option<String>,
        max_value: Option<String>,
        mean: Option<f64>,
        /// Sample standard deviation.
        std_dev: Option<f64>,
        median: Option<f64>,
    },
    Temporal {
        min_value: Option<String>,
        max_value: Option<String>,
    },
    Other,
}

impl ViewEngine {
    /// Computes counts and kind-specific metrics for `column`.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn column_metrics(&self, key: &TableKey, column: &str) -> Result<ColumnMetrics> {
        let (ctx, resolved) = self.snapshot_session(key, column).await?;
        let col = SqlSecurity::quote_identifier(&resolved.name)?;
        let kind = ColumnKind::of(&resolved.data_type);

        let extra = match kind {
            ColumnKind::String => format!(
                ", CAST(MIN({col}) AS VARCHAR) AS min_value, CAST(MAX({col}) AS VARCHAR) AS max_value, \
                 MIN(character_length({col})) AS min_length, MAX(character_length({col})) AS max_length, \
                 AVG(CAST(character_length({col}) AS DOUBLE)) AS avg_length"
            ),
            ColumnKind::Numeric => format!(
                ", CAST(MIN({col}) AS VARCHAR) AS min_value, CAST(MAX({col}) AS VARCHAR) AS max_value, \
                 AVG(CAST({col} AS DOUBLE)) AS mean, STDDEV_SAMP(CAST({col} AS DOUBLE)) AS std_dev, \
                 MEDIAN(CAST({col} AS DOUBLE)) AS median"
            ),
            ColumnKind::Temporal => format!(
                ", CAST(MIN({col}) AS VARCHAR) AS min_value, CAST(MAX({col}) AS VARCHAR) AS max_value"
            ),
            ColumnKind::Other => String::new(),
        };
        let sql = format!(
            "SELECT COUNT({col}) AS cnt, COUNT(*) - COUNT({col}) AS null_count, \
             COUNT(DISTINCT {col}) AS distinct_count{extra} FROM {SNAPSHOT_TABLE}"
        );
        self.log_query("column_metrics", &sql);

        let batches = ctx.sql(&sql).await?.collect().await?;
        let row = batches
            .iter()
            .find(|b| b.num_rows() > 0)
            .ok_or_else(|| ProfileError::Compute {
                schema: key.schema.clone(),
                table: key.table.clone(),
                column: Some(resolved.name.clone()),
                message: "Metrics query returned no rows".to_string(),
            })?;

        let detail = match kind {
            ColumnKind::String => MetricsDetail::String {
                min_value: scalar_string(row, "min_value")?,
                max_value: scalar_string(row, "max_value")?,
                min_length: scalar_u64(row, "min_length")?,
                max_length: scalar_u64(row, "max_length")?,
                avg_length: scalar_f64(row, "avg_length")?,
            },
            ColumnKind::Numeric => MetricsDetail::Numeric {
                min_value: scalar_string(row, "min_value")?,
                max_value: scalar_string(row, "max_value")?,
                mean: scalar_f64(row, "mean")?,
                std_dev: scalar_f64(row, "std_dev")?,
                median: scalar_f64(row, "median")?,
            },
            ColumnKind::Temporal => MetricsDetail::Temporal {
                min_value: scalar_string(row, "min_value")?,
                max_value: scalar_string(row, "max_value")?,
            },
            ColumnKind::Other => MetricsDetail::Other,
        };

        Ok(ColumnMetrics {
            column: resolved.name.clone(),
            data_type: resolved.data_type.to_string(),
            kind,
            count: scalar_u64(row, "cnt")?.unwrap_or(0),
            null_count: scalar_u64(row, "null_count")?.unwrap_or(0),
            distinct_count: scalar_u64(row, "distinct_count")?.unwrap_or(0),
            detail,
        })
    }
}
