//! Configuration for profiling runs and derived views.
//!
//! ```rust
//! use term_profile::config::ProfilerConfig;
//!
//! let config = ProfilerConfig::default()
//!     .with_artifact_root("/var/lib/profiles/data")
//!     .with_catalog_path("/var/lib/profiles/catalog.db")
//!     .with_frequency_limit(50);
//! assert_eq!(config.frequency_limit, 50);
//! ```

use std::path::{Path, PathBuf};

use datafusion::execution::config::SessionConfig;
use datafusion::prelude::SessionContext;
use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};
use crate::patterns::register_pattern_functions;

/// Default number of groups returned by frequency views.
pub const DEFAULT_FREQUENCY_LIMIT: usize = 100;

/// Settings shared by the profiling pipeline and the view engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Root directory under which artifacts are laid out per connection/schema/table.
    pub artifact_root: PathBuf,
    /// Path of the SQLite file backing the catalog.
    pub catalog_path: PathBuf,
    /// Maximum number of groups in value and pattern frequency views.
    pub frequency_limit: usize,
    /// DataFusion batch size used for artifact reads (None uses DataFusion defaults).
    pub batch_size: Option<usize>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            artifact_root: PathBuf::from("data_profiles"),
            catalog_path: PathBuf::from("profiles.db"),
            frequency_limit: DEFAULT_FREQUENCY_LIMIT,
            batch_size: None,
        }
    }
}

impl ProfilerConfig {
    /// Creates a configuration rooted at `dir`: artifacts in `dir/data_profiles`,
    /// catalog in `dir/profiles.db`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            artifact_root: dir.join("data_profiles"),
            catalog_path: dir.join("profiles.db"),
            ..Self::default()
        }
    }

    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProfileError::Configuration(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the artifact root directory.
    pub fn with_artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.artifact_root = root.into();
        self
    }

    /// Sets the catalog file path.
    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = path.into();
        self
    }

    /// Sets the maximum number of groups in frequency views.
    pub fn with_frequency_limit(mut self, limit: usize) -> Self {
        self.frequency_limit = limit;
        self
    }

    /// Sets the DataFusion batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.frequency_limit == 0 {
            return Err(ProfileError::Configuration(
                "frequency_limit must be at least 1".to_string(),
            ));
        }
        if self.batch_size == Some(0) {
            return Err(ProfileError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.artifact_root.as_os_str().is_empty() {
            return Err(ProfileError::Configuration(
                "artifact_root cannot be empty".to_string(),
            ));
        }
        if self.catalog_path.as_os_str().is_empty() {
            return Err(ProfileError::Configuration(
                "catalog_path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Creates a fresh DataFusion session with the signature functions registered.
    ///
    /// Every artifact computation runs on its own short-lived session.
    pub fn session_context(&self) -> SessionContext {
        let mut session_config = SessionConfig::new();
        if let Some(batch_size) = self.batch_size {
            session_config = session_config.with_batch_size(batch_size);
        }
        let ctx = SessionContext::new_with_config(session_config);
        register_pattern_functions(&ctx);
        ctx
    }
}
