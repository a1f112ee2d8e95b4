//! Persistent registry of profiled tables and where their artifacts live.
//!
//! The catalog is a single SQLite file holding one `profile_catalog` table keyed
//! by `(connection_name, schema_name, table_name)`. A [`Catalog`] only remembers
//! the file path: every operation opens its own connection and closes it before
//! returning, so nothing holds the file open across a profiling run.
//!
//! ```rust,no_run
//! use term_profile::catalog::{Catalog, CatalogEntry, TableKey};
//!
//! # fn example() -> term_profile::error::Result<()> {
//! let catalog = Catalog::new("profiles.db");
//! let key = TableKey::new("warehouse", "sales", "orders");
//! if let Some(entry) = catalog.lookup(&key)? {
//!     println!("{key} last profiled at {}", entry.last_profiled);
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProfileError, Result};

/// Identity of a profiled table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableKey {
    /// Name of the source connection the table was read from.
    pub connection: String,
    /// Schema (or database) containing the table.
    pub schema: String,
    /// Table name.
    pub table: String,
}

impl TableKey {
    /// Creates a new key.
    pub fn new(
        connection: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            connection: connection.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.connection, self.schema, self.table)
    }
}

/// One catalog row: where a profiled table's artifacts live and when it was profiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub key: TableKey,
    pub snapshot_path: PathBuf,
    pub summary_path: PathBuf,
    /// Absent when the table has no string columns.
    pub pattern_path: Option<PathBuf>,
    pub last_profiled: DateTime<Utc>,
}

/// Handle on the catalog file.
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
}

impl Catalog {
    /// Creates a handle for the catalog stored at `path`. The file is created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the catalog file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ProfileError::Catalog(format!(
                        "Failed to create catalog directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let conn = Connection::open(&self.path).map_err(|e| {
            ProfileError::Catalog(format!(
                "Failed to open catalog {}: {e}",
                self.path.display()
            ))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS profile_catalog (
                connection_name TEXT NOT NULL,
                schema_name TEXT NOT NULL,
                table_name TEXT NOT NULL,
                data_path TEXT NOT NULL,
                summary_path TEXT NOT NULL,
                pattern_path TEXT,
                last_profiled TEXT NOT NULL,
                PRIMARY KEY (connection_name, schema_name, table_name)
            )",
            [],
        )
        .map_err(|e| ProfileError::Catalog(format!("Failed to create schema: {e}")))?;

        Ok(conn)
    }

    /// Inserts or replaces the entry for `entry.key`.
    ///
    /// A single statement performs the replacement, so a failure leaves any
    /// previously committed entry untouched.
    pub fn upsert(&self, entry: &CatalogEntry) -> Result<()> {
        let conn = self
            .connect()
            .map_err(|e| ProfileError::CatalogWrite(e.to_string()))?;

        conn.execute(
            "INSERT INTO profile_catalog
                (connection_name, schema_name, table_name, data_path, summary_path, pattern_path, last_profiled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (connection_name, schema_name, table_name) DO UPDATE SET
                data_path = excluded.data_path,
                summary_path = excluded.summary_path,
                pattern_path = excluded.pattern_path,
                last_profiled = excluded.last_profiled",
            rusqlite::params![
                entry.key.connection,
                entry.key.schema,
                entry.key.table,
                path_to_text(&entry.snapshot_path),
                path_to_text(&entry.summary_path),
                entry.pattern_path.as_deref().map(path_to_text),
                entry.last_profiled.to_rfc3339(),
            ],
        )
        .map_err(|e| ProfileError::CatalogWrite(format!("Failed to upsert {}: {e}", entry.key)))?;

        debug!(key = %entry.key, "Catalog entry upserted");
        Ok(())
    }

    /// Looks up the entry for a table.
    pub fn lookup(&self, key: &TableKey) -> Result<Option<CatalogEntry>> {
        let conn = self.connect()?;

        let row = conn
            .query_row(
                "SELECT connection_name, schema_name, table_name, data_path, summary_path, pattern_path, last_profiled
                 FROM profile_catalog
                 WHERE connection_name = ?1 AND schema_name = ?2 AND table_name = ?3",
                rusqlite::params![key.connection, key.schema, key.table],
                read_row,
            )
            .optional()
            .map_err(|e| ProfileError::Catalog(format!("Failed to look up {key}: {e}")))?;

        row.map(into_entry).transpose()
    }

    /// Lists every entry, ordered by connection, schema and table.
    pub fn list_all(&self) -> Result<Vec<CatalogEntry>> {
        let conn = self.connect()?;

        let mut stmt = conn
            .prepare(
                "SELECT connection_name, schema_name, table_name, data_path, summary_path, pattern_path, last_profiled
                 FROM profile_catalog
                 ORDER BY connection_name, schema_name, table_name",
            )
            .map_err(|e| ProfileError::Catalog(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], read_row)
            .map_err(|e| ProfileError::Catalog(format!("Failed to list entries: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            let row = row.map_err(|e| ProfileError::Catalog(format!("Failed to read row: {e}")))?;
            entries.push(into_entry(row)?);
        }
        Ok(entries)
    }

    /// Removes the entry for a table without touching files on disk.
    ///
    /// Returns whether an entry was removed.
    pub fn prune(&self, key: &TableKey) -> Result<bool> {
        let conn = self
            .connect()
            .map_err(|e| ProfileError::CatalogWrite(e.to_string()))?;

        let deleted = conn
            .execute(
                "DELETE FROM profile_catalog
                 WHERE connection_name = ?1 AND schema_name = ?2 AND table_name = ?3",
                rusqlite::params![key.connection, key.schema, key.table],
            )
            .map_err(|e| ProfileError::CatalogWrite(format!("Failed to prune {key}: {e}")))?;

        if deleted > 0 {
            warn!(key = %key, "Catalog entry pruned");
        }
        Ok(deleted > 0)
    }

    /// Distinct connection names with at least one entry, sorted.
    pub fn connections(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;

        let mut stmt = conn
            .prepare("SELECT DISTINCT connection_name FROM profile_catalog ORDER BY connection_name")
            .map_err(|e| ProfileError::Catalog(format!("Failed to prepare query: {e}")))?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| ProfileError::Catalog(format!("Failed to list connections: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ProfileError::Catalog(format!("Failed to read row: {e}")))?;

        Ok(names)
    }
}

type CatalogRow = (String, String, String, String, String, Option<String>, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_entry(row: CatalogRow) -> Result<CatalogEntry> {
    let (connection, schema, table, data_path, summary_path, pattern_path, last_profiled) = row;
    let key = TableKey::new(connection, schema, table);

    let last_profiled = DateTime::parse_from_rfc3339(&last_profiled)
        .map_err(|e| {
            ProfileError::Catalog(format!(
                "Invalid last_profiled timestamp '{last_profiled}' for {key}: {e}"
            ))
        })?
        .with_timezone(&Utc);

    Ok(CatalogEntry {
        key,
        snapshot_path: PathBuf::from(data_path),
        summary_path: PathBuf::from(summary_path),
        pattern_path: pattern_path.map(PathBuf::from),
        last_profiled,
    })
}

fn path_to_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
