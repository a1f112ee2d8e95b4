//! The profiling pipeline: extraction, pattern generalization, summary, commit
//! and catalog registration for a batch of tables.
//!
//! Tables are profiled one after another and columns are summarized one after
//! another; every step is awaited in order and nothing is spawned. A failure
//! only affects its own table: the batch continues and the caller receives one
//! [`TableOutcome`] per requested table.
//!
//! # Example
//!
//! ```rust,no_run
//! use term_profile::config::ProfilerConfig;
//! use term_profile::pipeline::Profiler;
//! use term_profile::sources::SessionSource;
//! use datafusion::prelude::SessionContext;
//!
//! # async fn example() -> term_profile::error::Result<()> {
//! let source = SessionSource::new("warehouse", SessionContext::new());
//! let profiler = Profiler::new(ProfilerConfig::default())?
//!     .with_progress(|p| println!("{}.{} {:>3.0}% {}", p.schema, p.table, p.fraction * 100.0, p.message));
//!
//! for outcome in profiler.profile_tables(&source, [("sales", "orders")]).await {
//!     println!("{}", outcome.message());
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::artifacts::{self, ArtifactLayout, ArtifactPaths};
use crate::catalog::{Catalog, CatalogEntry, TableKey};
use crate::config::ProfilerConfig;
use crate::error::{ProfileError, Result};
use crate::extractor::Extractor;
use crate::logging::LogConfig;
use crate::patterns::{pattern_columns, write_pattern_artifact};
use crate::sources::SourceConnector;
use crate::summarizer::{Summarizer, SummaryRecord};
use crate::{log_artifact_op, perf_debug};

/// A progress checkpoint of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileProgress {
    pub schema: String,
    pub table: String,
    /// In `[0, 1]`, never decreasing within one table.
    pub fraction: f64,
    pub message: String,
}

/// Receives progress checkpoints.
pub type ProgressCallback = Arc<dyn Fn(ProfileProgress) + Send + Sync>;

/// Result of profiling one table.
#[derive(Debug)]
pub struct TableOutcome {
    pub schema: String,
    pub table: String,
    pub duration: Duration,
    pub result: Result<CatalogEntry>,
}

impl TableOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// One-line report keyed by `schema.table`.
    pub fn message(&self) -> String {
        match &self.result {
            Ok(_) => format!(
                "Profiled {}.{} in {:.2?}",
                self.schema, self.table, self.duration
            ),
            Err(e) => format!("Error profiling {}.{}: {e}", self.schema, self.table),
        }
    }
}

/// Profiles tables from a [`SourceConnector`] into artifacts and catalog entries.
#[derive(Clone)]
pub struct Profiler {
    config: ProfilerConfig,
    catalog: Catalog,
    layout: ArtifactLayout,
    extractor: Extractor,
    summarizer: Summarizer,
    log_config: LogConfig,
    progress: Option<ProgressCallback>,
    cancel: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for Profiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profiler")
            .field("config", &self.config)
            .field("has_progress", &self.progress.is_some())
            .field("has_cancel", &self.cancel.is_some())
            .finish()
    }
}

impl Profiler {
    /// Creates a profiler after validating `config`.
    pub fn new(config: ProfilerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog: Catalog::new(config.catalog_path.clone()),
            layout: ArtifactLayout::new(config.artifact_root.clone()),
            extractor: Extractor::new(),
            summarizer: Summarizer::new(config.clone()),
            log_config: LogConfig::default(),
            progress: None,
            cancel: None,
            config,
        })
    }

    /// Installs a progress callback.
    pub fn with_progress(mut self, callback: impl Fn(ProfileProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Installs a flag checked before each table; once set, remaining tables are reported as cancelled.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.summarizer = self.summarizer.with_log_config(log_config.clone());
        self.log_config = log_config;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn report(&self, schema: &str, table: &str, fraction: f64, message: impl Into<String>) {
        if let Some(callback) = &self.progress {
            callback(ProfileProgress {
                schema: schema.to_string(),
                table: table.to_string(),
                fraction: fraction.clamp(0.0, 1.0),
                message: message.into(),
            });
        }
    }

    /// Profiles each `(schema, table)` in order.
    pub async fn profile_tables<I, S, T>(&self, source: &dyn SourceConnector, tables: I) -> Vec<TableOutcome>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let tables: Vec<(String, String)> = tables
            .into_iter()
            .map(|(s, t)| (s.as_ref().to_string(), t.as_ref().to_string()))
            .collect();

        let mut outcomes = Vec::with_capacity(tables.len());
        for (schema, table) in tables {
            if self.is_cancelled() {
                outcomes.push(TableOutcome {
                    result: Err(ProfileError::Cancelled {
                        schema: schema.clone(),
                        table: table.clone(),
                    }),
                    schema,
                    table,
                    duration: Duration::ZERO,
                });
                continue;
            }

            let started = Instant::now();
            let result = self.profile_table(source, &schema, &table).await;
            let outcome = TableOutcome {
                schema,
                table,
                duration: started.elapsed(),
                result,
            };
            match &outcome.result {
                Ok(_) => info!("{}", outcome.message()),
                Err(_) => error!("{}", outcome.message()),
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Profiles one table and registers it in the catalog.
    ///
    /// On failure no catalog entry is created or changed and the staging
    /// directory is removed; artifacts of an earlier successful run stay in place.
    #[instrument(skip(self, source), fields(connection = %source.connection_name()))]
    pub async fn profile_table(
        &self,
        source: &dyn SourceConnector,
        schema: &str,
        table: &str,
    ) -> Result<CatalogEntry> {
        let started = Instant::now();
        let key = TableKey::new(source.connection_name(), schema, table);
        let paths = self.layout.paths(&key)?;
        artifacts::discard_staged(&paths);

        match self.run(source, &key, &paths).await {
            Ok(entry) => {
                self.report(
                    schema,
                    table,
                    1.0,
                    format!("Complete! Time taken: {:.2?}", started.elapsed()),
                );
                Ok(entry)
            }
            Err(e) => {
                artifacts::discard_staged(&paths);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        source: &dyn SourceConnector,
        key: &TableKey,
        paths: &ArtifactPaths,
    ) -> Result<CatalogEntry> {
        let (schema, table) = (key.schema.as_str(), key.table.as_str());
        let staged = paths.staged();

        self.report(schema, table, 0.2, format!("Exporting {table} to parquet..."));
        let snapshot = self
            .extractor
            .extract(source, schema, table, &staged.snapshot)
            .await?;
        perf_debug!(
            self.log_config,
            key = %key,
            rows = snapshot.row_count(),
            columns = snapshot.schema().fields().len(),
            "Snapshot extracted"
        );

        self.report(schema, table, 0.4, "Analyzing columns...");
        let ctx = self.config.session_context();
        snapshot
            .register(&ctx)
            .await
            .map_err(|e| ProfileError::compute(schema, table, e.to_string()))?;

        if !pattern_columns(&snapshot).is_empty() {
            self.report(schema, table, 0.5, "Generating patterns...");
        }
        let with_patterns = write_pattern_artifact(&ctx, &snapshot, &staged.patterns)
            .await
            .map_err(|e| ProfileError::compute(schema, table, format!("Pattern generation failed: {e}")))?;
        perf_debug!(self.log_config, key = %key, with_patterns, "Pattern artifact staged");

        let records = self
            .summarizer
            .summarize_with_progress(&snapshot, schema, table, &mut |done, total| {
                self.report(
                    schema,
                    table,
                    0.6 + 0.3 * done as f64 / total as f64,
                    format!("Analyzed {done} of {total} columns"),
                )
            })
            .await?;

        self.report(schema, table, 0.9, "Saving results...");
        SummaryRecord::write(&records, &staged.summary)
            .map_err(|e| ProfileError::compute(schema, table, format!("Failed to write summary: {e}")))?;
        artifacts::commit(paths, with_patterns)
            .map_err(|e| ProfileError::compute(schema, table, format!("Failed to commit artifacts: {e}")))?;
        log_artifact_op!(
            self.log_config,
            key = %key,
            dir = %paths.dir.display(),
            rows = snapshot.row_count(),
            "Artifacts committed"
        );

        let entry = CatalogEntry {
            key: key.clone(),
            snapshot_path: paths.snapshot.clone(),
            summary_path: paths.summary.clone(),
            pattern_path: with_patterns.then(|| paths.patterns.clone()),
            last_profiled: Utc::now(),
        };
        self.catalog.upsert(&entry)?;
        Ok(entry)
    }

    /// Removes a table from the catalog, optionally deleting its artifact directory.
    ///
    /// Returns whether a catalog entry existed.
    #[instrument(skip(self), fields(key = %key))]
    pub fn remove_table(&self, key: &TableKey, delete_artifacts: bool) -> Result<bool> {
        let entry = self.catalog.lookup(key)?;
        let removed = self.catalog.prune(key)?;

        if delete_artifacts {
            let dir = match entry.as_ref().and_then(|e| e.snapshot_path.parent()) {
                Some(dir) => dir.to_path_buf(),
                None => self.layout.table_dir(key)?,
            };
            artifacts::remove_dir(&dir)?;
            log_artifact_op!(self.log_config, key = %key, dir = %dir.display(), "Artifacts deleted");
        }
        Ok(removed)
    }
}
