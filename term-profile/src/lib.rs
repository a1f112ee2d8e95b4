//! # term-profile - Table Profiling for Rust
//!
//! term-profile profiles tables from relational sources. Each selected table is
//! copied into an immutable Parquet snapshot, summarized column by column,
//! generalized into character-class patterns, and recorded in a small SQLite
//! catalog. Histograms, frequency rankings, pattern lookups and column metrics
//! are then computed on demand from the stored artifacts, without going back
//! to the source.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use arrow::array::{Int64Array, StringArray};
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use datafusion::prelude::SessionContext;
//! use term_profile::prelude::*;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! // Any DataFusion catalog can act as a source.
//! let source = SessionSource::new("warehouse", SessionContext::new());
//! let schema = Arc::new(Schema::new(vec![
//!     Field::new("code", DataType::Utf8, true),
//!     Field::new("qty", DataType::Int64, true),
//! ]));
//! let batch = RecordBatch::try_new(
//!     schema.clone(),
//!     vec![
//!         Arc::new(StringArray::from(vec!["AB12", "CD34", "ab56"])),
//!         Arc::new(Int64Array::from(vec![Some(1), Some(2), None])),
//!     ],
//! )?;
//! source.register_batches("sales", "orders", schema, vec![batch])?;
//!
//! // Profile it.
//! let config = ProfilerConfig::in_dir("/var/lib/profiles");
//! let profiler = Profiler::new(config.clone())?;
//! for outcome in profiler.profile_tables(&source, [("sales", "orders")]).await {
//!     println!("{}", outcome.message());
//! }
//!
//! // Read views back from the artifacts.
//! let views = ViewEngine::new(config)?;
//! let key = TableKey::new("warehouse", "sales", "orders");
//! for record in views.table_profile(&key).await? {
//!     println!("{}: {} distinct, {} patterns", record.column_name, record.distinct_count, record.pattern_count);
//! }
//! let matches = views.pattern_matches(&key, "code", "AANN").await?;
//! assert_eq!(matches.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`sources`**: the [`SourceConnector`](sources::SourceConnector) trait and
//!   [`SessionSource`](sources::SessionSource), plus schema/table discovery
//! - **`extractor`**: streams a source table into a snapshot
//! - **`summarizer`**: per-column statistics ([`SummaryRecord`](summarizer::SummaryRecord))
//! - **`patterns`**: value signatures as Rust functions and DataFusion UDFs
//! - **`catalog`**: the SQLite registry of profiled tables
//! - **`views`**: histograms, frequencies, pattern matches, metrics and overviews
//! - **`pipeline`**: the batch orchestration with progress and per-table outcomes
//!
//! ## Artifacts
//!
//! ```text
//! <artifact_root>/<connection>/<schema>/<table>/data.parquet
//!                                              /summary.parquet
//!                                              /patterns.parquet
//! ```
//!
//! A catalog entry only ever points at a complete set of files. When a view
//! finds a referenced file missing or unreadable, the entry is pruned.

pub mod artifacts;
pub mod catalog;
pub mod config;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod patterns;
pub mod pipeline;
pub mod prelude;
pub mod security;
pub mod sources;
pub mod summarizer;
pub mod types;
pub mod views;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
