//! Shared setup for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    BooleanArray, Date32Array, Float64Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use term_profile::prelude::*;

pub const CONNECTION: &str = "test";
pub const SCHEMA: &str = "public";

/// 2024-01-15 as days since the epoch.
pub const JAN_15_2024: i32 = 19_737;
const DAY_MS: i64 = 86_400_000;

pub fn items() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("code", DataType::Utf8, true),
        Field::new("qty", DataType::Int64, true),
        Field::new("shipped", DataType::Date32, true),
    ]));
    RecordBatch::try_new(
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
    )
    .unwrap()
}

pub fn customers() -> RecordBatch {
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
        Field::new("notes", DataType::Int64, true),
    ]));
    let base = JAN_15_2024 as i64 * DAY_MS;

    RecordBatch::try_new(
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
            Arc::new(Int64Array::from(vec![None::<i64>; 6])),
        ],
    )
    .unwrap()
}

pub fn readings() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("sensor", DataType::Int64, false),
        Field::new("value", DataType::Float64, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![7, 7, 7, 7])),
            Arc::new(Float64Array::from(vec![
                Some(0.5),
                Some(1.5),
                None,
                Some(9.5),
            ])),
        ],
    )
    .unwrap()
}

/// A source named `test` with `public.items`, `public.customers` and `public.readings`.
pub fn source() -> SessionSource {
    let source = SessionSource::new(CONNECTION, SessionContext::new());
    for (table, batch) in [
        ("items", items()),
        ("customers", customers()),
        ("readings", readings()),
    ] {
        source
            .register_batches(SCHEMA, table, batch.schema(), vec![batch])
            .unwrap();
    }
    source
}

pub fn key(table: &str) -> TableKey {
    TableKey::new(CONNECTION, SCHEMA, table)
}

/// Profiles `tables` from [`source`] with artifacts and catalog under `dir`.
pub async fn profile(dir: &Path, tables: &[&str]) -> (ProfilerConfig, Vec<TableOutcome>) {
    let config = ProfilerConfig::in_dir(dir);
    let profiler = Profiler::new(config.clone()).unwrap();
    let outcomes = profiler
        .profile_tables(&source(), tables.iter().map(|t| (SCHEMA, *t)))
        .await;
    (config, outcomes)
}
