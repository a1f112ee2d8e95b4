//! Prelude for commonly used types and traits in term-profile.

pub use crate::catalog::{Catalog, CatalogEntry, TableKey};
pub use crate::config::ProfilerConfig;
pub use crate::error::{ProfileError, Result};
pub use crate::logging::LogConfig;
pub use crate::pipeline::{ProfileProgress, Profiler, TableOutcome};
pub use crate::sources::{SessionSource, SourceConnector};
pub use crate::summarizer::SummaryRecord;
pub use crate::types::ColumnKind;
pub use crate::views::{Histogram, ViewEngine};
