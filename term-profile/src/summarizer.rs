//! Per-column summary statistics over a snapshot.
//!
//! Every column gets a [`SummaryRecord`], whatever its declared type. Length
//! statistics and the pattern-distinct-count are computed over the string
//! representation of each non-null value, so a numeric column reports the
//! lengths of its rendered digits.
//!
//! Each column is summarized by one aggregate query over the registered
//! snapshot:
//!
//! ```sql
//! SELECT COUNT(*), COUNT(*) - COUNT(v), COUNT(DISTINCT v),
//!        MIN(txt), MAX(txt),
//!        MIN(len), MAX(len), AVG(len), MEDIAN(len), STDDEV_SAMP(len),
//!        COUNT(DISTINCT sig)
//! FROM (SELECT col AS v,
//!              CAST(col AS VARCHAR) AS txt,
//!              CAST(character_length(CAST(col AS VARCHAR)) AS DOUBLE) AS len,
//!              pattern_signature(col) AS sig
//!       FROM snapshot)
//! ```

use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, Float64Array, PrimitiveArray, StringArray, UInt32Array, UInt64Array,
};
use arrow::compute::cast;
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Field, Float64Type, Schema, SchemaRef, UInt32Type, UInt64Type,
};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::artifacts;
use crate::config::ProfilerConfig;
use crate::error::{ProfileError, Result};
use crate::extractor::{Snapshot, SnapshotColumn, SNAPSHOT_TABLE};
use crate::log_column;
use crate::logging::LogConfig;
use crate::patterns::PATTERN_SIGNATURE_FUNCTION;
use crate::security::SqlSecurity;

/// Statistics of one column of a profiled table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub column_name: String,
    /// 1-based position in the snapshot schema.
    pub ordinal_position: u32,
    /// Declared Arrow type, rendered with its `Display` form.
    pub data_type: String,
    pub row_count: u64,
    pub null_count: u64,
    /// `100 * null_count / row_count`, two decimals; absent for empty tables.
    pub null_percentage: Option<f64>,
    pub distinct_count: u64,
    /// `100 * distinct_count / row_count`, two decimals; absent for empty tables.
    pub distinct_percentage: Option<f64>,
    /// Smallest string representation.
    pub min_value: Option<String>,
    /// Largest string representation.
    pub max_value: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub mean_length: Option<f64>,
    pub median_length: Option<f64>,
    /// Sample standard deviation of the lengths.
    pub std_dev_length: Option<f64>,
    /// `std_dev_length / sqrt(row_count)`.
    pub std_error_length: Option<f64>,
    /// Number of distinct stored-variant signatures.
    pub pattern_count: u64,
}

static SUMMARY_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("column_name", DataType::Utf8, false),
        Field::new("ordinal_position", DataType::UInt32, false),
        Field::new("data_type", DataType::Utf8, false),
        Field::new("row_count", DataType::UInt64, false),
        Field::new("null_count", DataType::UInt64, false),
        Field::new("null_percentage", DataType::Float64, true),
        Field::new("distinct_count", DataType::UInt64, false),
        Field::new("distinct_percentage", DataType::Float64, true),
        Field::new("min_value", DataType::Utf8, true),
        Field::new("max_value", DataType::Utf8, true),
        Field::new("min_length", DataType::UInt64, true),
        Field::new("max_length", DataType::UInt64, true),
        Field::new("mean_length", DataType::Float64, true),
        Field::new("median_length", DataType::Float64, true),
        Field::new("std_dev_length", DataType::Float64, true),
        Field::new("std_error_length", DataType::Float64, true),
        Field::new("pattern_count", DataType::UInt64, false),
    ]))
});

impl SummaryRecord {
    /// Arrow schema of the summary artifact.
    pub fn schema() -> SchemaRef {
        SUMMARY_SCHEMA.clone()
    }

    /// Converts records into a single batch with [`SummaryRecord::schema`].
    pub fn to_batch(records: &[SummaryRecord]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.column_name.as_str()),
            )),
            Arc::new(UInt32Array::from_iter_values(
                records.iter().map(|r| r.ordinal_position),
            )),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.data_type.as_str()),
            )),
            Arc::new(UInt64Array::from_iter_values(records.iter().map(|r| r.row_count))),
            Arc::new(UInt64Array::from_iter_values(records.iter().map(|r| r.null_count))),
            Arc::new(Float64Array::from_iter(records.iter().map(|r| r.null_percentage))),
            Arc::new(UInt64Array::from_iter_values(
                records.iter().map(|r| r.distinct_count),
            )),
            Arc::new(Float64Array::from_iter(
                records.iter().map(|r| r.distinct_percentage),
            )),
            Arc::new(StringArray::from_iter(
                records.iter().map(|r| r.min_value.as_deref()),
            )),
            Arc::new(StringArray::from_iter(
                records.iter().map(|r| r.max_value.as_deref()),
            )),
            Arc::new(UInt64Array::from_iter(records.iter().map(|r| r.min_length))),
            Arc::new(UInt64Array::from_iter(records.iter().map(|r| r.max_length))),
            Arc::new(Float64Array::from_iter(records.iter().map(|r| r.mean_length))),
            Arc::new(Float64Array::from_iter(records.iter().map(|r| r.median_length))),
            Arc::new(Float64Array::from_iter(records.iter().map(|r| r.std_dev_length))),
            Arc::new(Float64Array::from_iter(
                records.iter().map(|r| r.std_error_length),
            )),
            Arc::new(UInt64Array::from_iter_values(
                records.iter().map(|r| r.pattern_count),
            )),
        ];
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }

    /// Reads records back from summary batches, in stored order.
    pub fn from_batches(batches: &[RecordBatch]) -> Result<Vec<SummaryRecord>> {
        let mut records = Vec::new();
        for batch in batches {
            let names = string_column(batch, "column_name")?;
            let ordinals = typed_column::<UInt32Type>(batch, "ordinal_position", DataType::UInt32)?;
            let types = string_column(batch, "data_type")?;
            let rows = u64_column(batch, "row_count")?;
            let nulls = u64_column(batch, "null_count")?;
            let null_pct = f64_column(batch, "null_percentage")?;
            let distinct = u64_column(batch, "distinct_count")?;
            let distinct_pct = f64_column(batch, "distinct_percentage")?;
            let min_value = string_column(batch, "min_value")?;
            let max_value = string_column(batch, "max_value")?;
            let min_len = u64_column(batch, "min_length")?;
            let max_len = u64_column(batch, "max_length")?;
            let mean = f64_column(batch, "mean_length")?;
            let median = f64_column(batch, "median_length")?;
            let std_dev = f64_column(batch, "std_dev_length")?;
            let std_err = f64_column(batch, "std_error_length")?;
            let patterns = u64_column(batch, "pattern_count")?;

            for i in 0..batch.num_rows() {
                records.push(SummaryRecord {
                    column_name: names.value(i).to_string(),
                    ordinal_position: ordinals.value(i),
                    data_type: types.value(i).to_string(),
                    row_count: rows.value(i),
                    null_count: nulls.value(i),
                    null_percentage: optional(&null_pct, i),
                    distinct_count: distinct.value(i),
                    distinct_percentage: optional(&distinct_pct, i),
                    min_value: min_value.is_valid(i).then(|| min_value.value(i).to_string()),
                    max_value: max_value.is_valid(i).then(|| max_value.value(i).to_string()),
                    min_length: optional(&min_len, i),
                    max_length: optional(&max_len, i),
                    mean_length: optional(&mean, i),
                    median_length: optional(&median, i),
                    std_dev_length: optional(&std_dev, i),
                    std_error_length: optional(&std_err, i),
                    pattern_count: patterns.value(i),
                });
            }
        }
        Ok(records)
    }

    /// Writes a summary artifact.
    pub fn write(records: &[SummaryRecord], path: &Path) -> Result<()> {
        let batch = Self::to_batch(records)?;
        artifacts::write_batches(Self::schema(), &[batch], path)
    }

    /// Reads a summary artifact.
    pub fn read(path: &Path) -> Result<Vec<SummaryRecord>> {
        Self::from_batches(&artifacts::read_batches(path)?)
    }
}

/// Rounds a percentage to two decimals.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `100 * part / whole`, two decimals, or `None` when `whole` is zero.
pub(crate) fn percentage(part: u64, whole: u64) -> Option<f64> {
    (whole > 0).then(|| round2(100.0 * part as f64 / whole as f64))
}

/// Computes summary records for every column of a snapshot.
#[derive(Debug, Clone)]
pub struct Summarizer {
    config: ProfilerConfig,
    log_config: LogConfig,
}

impl Summarizer {
    pub fn new(config: ProfilerConfig) -> Self {
        Self {
            config,
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Summarizes every column of `snapshot`.
    pub async fn summarize(
        &self,
        snapshot: &Snapshot,
        schema: &str,
        table: &str,
    ) -> Result<Vec<SummaryRecord>> {
        self.summarize_with_progress(snapshot, schema, table, &mut |_, _| {})
            .await
    }

    /// Summarizes every column, calling `on_column(done, total)` after each one.
    ///
    /// Columns are processed in ordinal order. The first failing column aborts
    /// the whole table with a [`ProfileError::Compute`] naming that column.
    #[instrument(skip(self, snapshot, on_column), fields(columns = snapshot.schema().fields().len()))]
    pub async fn summarize_with_progress(
        &self,
        snapshot: &Snapshot,
        schema: &str,
        table: &str,
        on_column: &mut (dyn FnMut(usize, usize) + Send),
    ) -> Result<Vec<SummaryRecord>> {
        let ctx = self.config.session_context();
        snapshot
            .register(&ctx)
            .await
            .map_err(|e| ProfileError::compute(schema, table, e.to_string()))?;

        let columns = snapshot.columns();
        let total = columns.len();
        let mut records = Vec::with_capacity(total);

        for (done, column) in columns.iter().enumerate() {
            let record = summarize_column(&ctx, column)
                .await
                .map_err(|e| ProfileError::column_compute(schema, table, &column.name, e.to_string()))?;

            log_column!(
                self.log_config,
                column = %column.name,
                null_count = record.null_count,
                distinct_count = record.distinct_count,
                pattern_count = record.pattern_count,
                "Column summarized"
            );
            records.push(record);
            on_column(done + 1, total);
        }

        debug!(schema, table, columns = total, "Summary computed");
        Ok(records)
    }
}

async fn summarize_column(ctx: &SessionContext, column: &SnapshotColumn) -> Result<SummaryRecord> {
    let col = SqlSecurity::quote_identifier(&column.name)?;
    let sql = format!(
        "SELECT \
            COUNT(*) AS row_count, \
            COUNT(*) - COUNT(v) AS null_count, \
            COUNT(DISTINCT v) AS distinct_count, \
            MIN(txt) AS min_value, \
            MAX(txt) AS max_value, \
            MIN(len) AS min_length, \
            MAX(len) AS max_length, \
            AVG(len) AS mean_length, \
            MEDIAN(len) AS median_length, \
            STDDEV_SAMP(len) AS std_dev_length, \
            COUNT(DISTINCT sig) AS pattern_count \
         FROM ( \
            SELECT {col} AS v, \
                   CAST({col} AS VARCHAR) AS txt, \
                   CAST(character_length(CAST({col} AS VARCHAR)) AS DOUBLE) AS len, \
                   {PATTERN_SIGNATURE_FUNCTION}({col}) AS sig \
            FROM {SNAPSHOT_TABLE} \
         ) s"
    );

    let batches = ctx.sql(&sql).await?.collect().await?;
    let Some(row) = batches.iter().find(|b| b.num_rows() > 0) else {
        return Err(ArrowError::ComputeError("Aggregate query returned no rows".to_string()).into());
    };

    let row_count = scalar_u64(row, "row_count")?.unwrap_or(0);
    let null_count = scalar_u64(row, "null_count")?.unwrap_or(0);
    let distinct_count = scalar_u64(row, "distinct_count")?.unwrap_or(0);
    let std_dev_length = scalar_f64(row, "std_dev_length")?;
    let std_error_length = match std_dev_length {
        Some(std_dev) if row_count > 0 => Some(std_dev / (row_count as f64).sqrt()),
        _ => None,
    };

    Ok(SummaryRecord {
        column_name: column.name.clone(),
        ordinal_position: column.ordinal as u32,
        data_type: column.data_type.to_string(),
        row_count,
        null_count,
        null_percentage: percentage(null_count, row_count),
        distinct_count,
        distinct_percentage: percentage(distinct_count, row_count),
        min_value: scalar_string(row, "min_value")?,
        max_value: scalar_string(row, "max_value")?,
        min_length: scalar_u64(row, "min_length")?,
        max_length: scalar_u64(row, "max_length")?,
        mean_length: scalar_f64(row, "mean_length")?,
        median_length: scalar_f64(row, "median_length")?,
        std_dev_length,
        std_error_length,
        pattern_count: scalar_u64(row, "pattern_count")?.unwrap_or(0),
    })
}

fn column_by_name<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ArrowError::SchemaError(format!("Missing column '{name}'")).into())
}

fn typed_column<T: ArrowPrimitiveType>(
    batch: &RecordBatch,
    name: &str,
    data_type: DataType,
) -> Result<PrimitiveArray<T>> {
    let array = cast(column_by_name(batch, name)?, &data_type)?;
    Ok(array.as_primitive::<T>().clone())
}

fn u64_column(batch: &RecordBatch, name: &str) -> Result<UInt64Array> {
    typed_column::<UInt64Type>(batch, name, DataType::UInt64)
}

fn f64_column(batch: &RecordBatch, name: &str) -> Result<Float64Array> {
    typed_column::<Float64Type>(batch, name, DataType::Float64)
}

fn string_column(batch: &RecordBatch, name: &str) -> Result<StringArray> {
    let array = cast(column_by_name(batch, name)?, &DataType::Utf8)?;
    Ok(array.as_string::<i32>().clone())
}

fn optional<T: ArrowPrimitiveType>(
    array: &PrimitiveArray<T>,
    i: usize,
) -> Option<T::Native> {
    array.is_valid(i).then(|| array.value(i))
}

pub(crate) fn scalar_u64(batch: &RecordBatch, name: &str) -> Result<Option<u64>> {
    Ok(optional(&u64_column(batch, name)?, 0))
}

pub(crate) fn scalar_f64(batch: &RecordBatch, name: &str) -> Result<Option<f64>> {
    Ok(optional(&f64_column(batch, name)?, 0))
}

pub(crate) fn scalar_string(batch: &RecordBatch, name: &str) -> Result<Option<String>> {
    let array = string_column(batch, name)?;
    Ok(array.is_valid(0).then(|| array.value(0).to_string()))
}
