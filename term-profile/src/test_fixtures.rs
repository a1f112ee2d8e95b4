//! Small in-memory tables for exercising the pipeline and the views.
//!
//! All tables live in the `public` schema of a [`SessionSource`] named `test`:
//!
//! - `items`: the three-column reference table (`code`, `qty`, `shipped`);
//! - `customers`: strings with nulls and punctuation, floats, timestamps and a boolean;
//! - `readings`: numeric columns only, so it has no pattern artifact.

use std::sync::Arc;

use arrow::array::{
    BooleanArray, Date32Array, Float64Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;

use crate::error::Result;
use crate::sources::SessionSource;

/// Connection name of [`reference_source`].
pub const TEST_CONNECTION: &str = "test";

/// Schema holding every fixture table.
pub const TEST_SCHEMA: &str = "public";

/// Days since the epoch of 2024-01-15.
const JAN_15_2024: i32 = 19_737;

/// `code` = AB12, CD34, ab56; `qty` = 1, 2, null; `shipped` = two dates and a null.
pub fn items_batch() -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("code", DataType::Utf8, true),
        Field::new("qty", DataType::Int64, true),
        Field::new("shipped", DataType::Date32, true),
    ]));
    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["AB12", "CD34", "ab56"])),
            Arc::new(Int64Array::from(vec![Some(1), Some(2), None])),
            Arc::new(Date32Array::from(vec![
                Some(JAN_15_2024),
                Some(JAN_15_2024 + 1),
                None,
            ])),
        ],
    )?)
}

pub fn customers_batch() -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("phone", DataType::Utf8, true),
        Field::new("balance", DataType::Float64, true),
        Field::new(
            "signed_up",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            true,
        ),
        Field::new("active", DataType::Boolean, true),
    ]));

    const DAY_MS: i64 = 86_400_000;
    let base = JAN_15_2024 as i64 * DAY_MS;

    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5, 6])),
            Arc::new(StringArray::from(vec![
                Some("Alice"),
                Some("Bob"),
                None,
                Some("Alice"),
                Some("Dana"),
                Some("Alice"),
            ])),
            Arc::new(StringArray::from(vec![
                Some("555-0001"),
                Some("555-0002"),
                Some("5550003"),
                None,
                Some("(555) 000-4"),
                Some("555-0001"),
            ])),
            Arc::new(Float64Array::from(vec![
                Some(0.0),
                Some(10.0),
                Some(2.5),
                None,
                Some(7.5),
                Some(10.0),
            ])),
            Arc::new(TimestampMillisecondArray::from(vec![
                Some(base + 3_600_000),
                Some(base + 7_200_000),
                Some(base + DAY_MS),
                None,
                Some(base + 2 * DAY_MS + 1),
                Some(base + 2 * DAY_MS + 2),
            ])),
            Arc::new(BooleanArray::from(vec![
                Some(true),
                Some(false),
                Some(true),
                None,
                Some(true),
                Some(true),
            ])),
        ],
    )?)
}

pub fn readings_batch() -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("sensor", DataType::Int64, false),
        Field::new("value", DataType::Float64, true),
    ]));
    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from((0..11).collect::<Vec<i64>>())),
            Arc::new(Float64Array::from(
                (0..11).map(|v| Some(v as f64)).collect::<Vec<_>>(),
            )),
        ],
    )?)
}

/// A source with every fixture table registered.
pub fn reference_source() -> Result<SessionSource> {
    let source = SessionSource::new(TEST_CONNECTION, SessionContext::new());
    for (table, batch) in [
        ("items", items_batch()?),
        ("customers", customers_batch()?),
        ("readings", readings_batch()?),
    ] {
        source.register_batches(TEST_SCHEMA, table, batch.schema(), vec![batch])?;
    }
    Ok(source)
}
