//! Histograms, dispatched on the column kind.
//!
//! - string columns: counts per character length of the non-null values;
//! - numeric columns: [`BIN_COUNT`] equal-width bins between min and max;
//! - date and timestamp columns: counts per calendar date;
//! - anything else: [`Histogram::Unsupported`].
//!
//! A column without a single non-null value has [`Histogram::NoValues`].

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Float64Type, Int64Type};
use chrono::NaiveDate;
use datafusion::prelude::SessionContext;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::catalog::TableKey;
use crate::error::{ProfileError, Result};
use crate::extractor::SNAPSHOT_TABLE;
use crate::security::SqlSecurity;
use crate::types::ColumnKind;

use super::ViewEngine;

/// Number of bins of a numeric histogram.
pub const BIN_COUNT: usize = 10;

/// Histogram of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Histogram {
    StringLength(Vec<LengthBin>),
    Numeric(NumericHistogram),
    Temporal(Vec<DateBin>),
    /// The column has no non-null values.
    NoValues,
    /// The column's type has no histogram.
    Unsupported { data_type: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBin {
    pub length: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBin {
    pub date: NaiveDate,
    pub count: u64,
}

/// One equal-width bin. `upper` is exclusive except for the last bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericBin {
    pub index: usize,
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericHistogram {
    pub min: f64,
    pub max: f64,
    pub width: f64,
    /// Always [`BIN_COUNT`] bins, in index order.
    pub bins: Vec<NumericBin>,
    /// NaN and infinite values. They are not null but fall outside every bin.
    pub non_finite: u64,
}

impl NumericHistogram {
    /// Bins finite values and counts the others; `None` when no value is finite.
    pub fn from_values(values: impl IntoIterator<Item = f64> + Clone) -> Option<Self> {
        let binning = NumericBinning::fit(values.clone())?;
        let mut counts = [0u64; BIN_COUNT];
        let mut non_finite = 0;
        for value in values {
            if value.is_finite() {
                counts[binning.index(value)] += 1;
            } else {
                non_finite += 1;
            }
        }
        Some(binning.histogram(counts, non_finite))
    }

    /// Number of values counted: every bin plus [`non_finite`](Self::non_finite).
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum::<u64>() + self.non_finite
    }
}

/// Edges of [`BIN_COUNT`] equal-width bins over `[min, max]`.
///
/// Bin `i` covers `[lower(i), lower(i + 1))` and the last bin is closed at
/// `max`. When `min == max` the width is zero and every value falls in the
/// last bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericBinning {
    min: f64,
    max: f64,
    width: f64,
}

impl NumericBinning {
    /// Creates a binning over `[min, max]`. Both bounds must be finite and `min <= max`.
    pub fn new(min: f64, max: f64) -> Self {
        // Dividing first keeps the width finite for ranges wider than f64::MAX.
        let width = max / BIN_COUNT as f64 - min / BIN_COUNT as f64;
        Self { min, max, width }
    }

    /// Fits the binning to the finite values of an iterator.
    pub fn fit(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;
        Some(Self::new(min, max))
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Inclusive lower edge of bin `i`, never above `max`.
    pub fn lower(&self, i: usize) -> f64 {
        if i == 0 {
            self.min
        } else {
            // Overflow turns into +inf, which `min` clamps back to `max`.
            (self.min + i as f64 * self.width).min(self.max)
        }
    }

    /// Upper edge of bin `i`; the last bin ends at `max`.
    pub fn upper(&self, i: usize) -> f64 {
        if i + 1 >= BIN_COUNT {
            self.max
        } else {
            self.lower(i + 1)
        }
    }

    /// Index of the bin holding `value`, which must lie in `[min, max]`.
    ///
    /// The estimate from division is corrected against the reported edges so
    /// that a value always sits inside the bounds of the bin it is counted in.
    pub fn index(&self, value: f64) -> usize {
        let last = BIN_COUNT - 1;
        if self.width <= 0.0 || value >= self.max {
            return last;
        }

        let estimate = ((value - self.min) / self.width).floor();
        let mut i = if estimate.is_finite() && estimate > 0.0 {
            (estimate as usize).min(last)
        } else {
            0
        };
        while i > 0 && value < self.lower(i) {
            i -= 1;
        }
        while i < last && value >= self.lower(i + 1) {
            i += 1;
        }
        i
    }

    fn histogram(&self, counts: [u64; BIN_COUNT], non_finite: u64) -> NumericHistogram {
        NumericHistogram {
            min: self.min,
            max: self.max,
            width: self.width,
            bins: counts
                .iter()
                .enumerate()
                .map(|(index, &count)| NumericBin {
                    index,
                    lower: self.lower(index),
                    upper: self.upper(index),
                    count,
                })
                .collect(),
            non_finite,
        }
    }
}

impl ViewEngine {
    /// Computes the histogram of `column`.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn histogram(&self, key: &TableKey, column: &str) -> Result<Histogram> {
        let (ctx, resolved) = self.snapshot_session(key, column).await?;
        let col = SqlSecurity::quote_identifier(&resolved.name)?;

        match ColumnKind::of(&resolved.data_type) {
            ColumnKind::String => self.length_histogram(&ctx, &col).await,
            ColumnKind::Numeric => self.numeric_histogram(&ctx, &col, key, &resolved.name).await,
            ColumnKind::Temporal => self.date_histogram(&ctx, &col).await,
            ColumnKind::Other => Ok(Histogram::Unsupported {
                data_type: resolved.data_type.to_string(),
            }),
        }
    }

    async fn length_histogram(&self, ctx: &SessionContext, col: &str) -> Result<Histogram> {
        let sql = format!(
            "SELECT CAST(character_length(CAST({col} AS VARCHAR)) AS BIGINT) AS len, COUNT(*) AS cnt \
             FROM {SNAPSHOT_TABLE} WHERE {col} IS NOT NULL GROUP BY 1 ORDER BY 1"
        );
        self.log_query("histogram", &sql);

        let mut bins = Vec::new();
        for batch in ctx.sql(&sql).await?.collect().await? {
            let lengths = cast(batch.column(0), &DataType::Int64)?;
            let lengths = lengths.as_primitive::<Int64Type>();
            let counts = cast(batch.column(1), &DataType::Int64)?;
            let counts = counts.as_primitive::<Int64Type>();
            for i in 0..batch.num_rows() {
                bins.push(LengthBin {
                    length: lengths.value(i).max(0) as u64,
                    count: counts.value(i).max(0) as u64,
                });
            }
        }

        Ok(if bins.is_empty() {
            Histogram::NoValues
        } else {
            Histogram::StringLength(bins)
        })
    }

    /// Two streaming passes: one fits the bin edges over the finite values, one counts.
    ///
    /// NaN and infinities are reported in [`NumericHistogram::non_finite`]. A
    /// column holding nothing else has no range to bin and is a compute error.
    async fn numeric_histogram(
        &self,
        ctx: &SessionContext,
        col: &str,
        key: &TableKey,
        column: &str,
    ) -> Result<Histogram> {
        let sql = format!(
            "SELECT CAST({col} AS DOUBLE) AS v FROM {SNAPSHOT_TABLE} WHERE {col} IS NOT NULL"
        );
        self.log_query("histogram", &sql);

        let mut min_max: Option<(f64, f64)> = None;
        let mut non_finite = 0u64;
        for_each_value(ctx, &sql, |v| {
            if !v.is_finite() {
                non_finite += 1;
                return;
            }
            min_max = Some(match min_max {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            });
        })
        .await?;

        let Some((min, max)) = min_max else {
            if non_finite > 0 {
                return Err(ProfileError::Compute {
                    schema: key.schema.clone(),
                    table: key.table.clone(),
                    column: Some(column.to_string()),
                    message: format!("No finite values to bin ({non_finite} NaN or infinite)"),
                });
            }
            return Ok(Histogram::NoValues);
        };

        let binning = NumericBinning::new(min, max);
        let mut counts = [0u64; BIN_COUNT];
        for_each_value(ctx, &sql, |v| {
            if v.is_finite() {
                counts[binning.index(v)] += 1;
            }
        })
        .await?;

        Ok(Histogram::Numeric(binning.histogram(counts, non_finite)))
    }

    async fn date_histogram(&self, ctx: &SessionContext, col: &str) -> Result<Histogram> {
        let sql = format!(
            "SELECT CAST({col} AS DATE) AS day, COUNT(*) AS cnt \
             FROM {SNAPSHOT_TABLE} WHERE {col} IS NOT NULL GROUP BY 1 ORDER BY 1"
        );
        self.log_query("histogram", &sql);

        let mut bins = Vec::new();
        for batch in ctx.sql(&sql).await?.collect().await? {
            let days = cast(batch.column(0), &DataType::Date32)?;
            let days = days.as_primitive::<Date32Type>();
            let counts = cast(batch.column(1), &DataType::Int64)?;
            let counts = counts.as_primitive::<Int64Type>();
            for i in 0..batch.num_rows() {
                if let Some(date) = days.is_valid(i).then(|| days.value_as_date(i)).flatten() {
                    bins.push(DateBin {
                        date,
                        count: counts.value(i).max(0) as u64,
                    });
                }
            }
        }

        Ok(if bins.is_empty() {
            Histogram::NoValues
        } else {
            Histogram::Temporal(bins)
        })
    }
}

/// Streams the non-null values of the first column of a query as `f64`.
async fn for_each_value(
    ctx: &SessionContext,
    sql: &str,
    mut f: impl FnMut(f64),
) -> Result<()> {
    let mut stream = ctx.sql(sql).await?.execute_stream().await?;
    while let Some(batch) = stream.next().await {
        let batch = batch?;
        let values = cast(batch.column(0), &DataType::Float64)?;
        for v in values.as_primitive::<Float64Type>().iter().flatten() {
            f(v);
        }
    }
    Ok(())
}
