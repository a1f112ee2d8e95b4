//! Source connectors feeding the profiling pipeline.
//!
//! Establishing a live connection to a particular database engine is the
//! caller's business. The pipeline only needs the small surface described by
//! [`SourceConnector`]: enumerate schemas and tables, and hand out a lazy
//! [`DataFrame`] for one table. [`SessionSource`] implements it over any
//! DataFusion [`SessionContext`], which covers in-memory tables, registered
//! files and custom table providers.

use std::fmt::{self, Debug};
use std::sync::Arc;

use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::catalog::{CatalogProvider, MemorySchemaProvider, SchemaProvider};
use datafusion::common::TableReference;
use datafusion::datasource::{MemTable, TableProvider};
use datafusion::prelude::{DataFrame, SessionContext};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{ProfileError, Result};

/// A connected source that can enumerate and read tables.
///
/// # Examples
///
/// ```rust,no_run
/// use term_profile::sources::{SessionSource, SourceConnector};
/// use datafusion::prelude::SessionContext;
///
/// # async fn example() -> term_profile::error::Result<()> {
/// let source = SessionSource::new("warehouse", SessionContext::new());
/// for schema in source.list_schemas().await? {
///     println!("{schema}: {:?}", source.list_tables(&schema).await?);
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait SourceConnector: Debug + Send + Sync {
    /// Name of the connection; the first component of every catalog key.
    fn connection_name(&self) -> &str;

    /// Lists the schemas (or databases) visible through this connection.
    async fn list_schemas(&self) -> Result<Vec<String>>;

    /// Lists the tables of one schema.
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>>;

    /// Returns a lazy relation over one table. Nothing is read until it is executed.
    async fn table(&self, schema: &str, table: &str) -> Result<DataFrame>;
}

/// [`SourceConnector`] over the catalog of a DataFusion session.
#[derive(Clone)]
pub struct SessionSource {
    name: String,
    ctx: SessionContext,
    catalog: String,
}

impl SessionSource {
    /// Wraps the default catalog of `ctx` under the connection name `name`.
    pub fn new(name: impl Into<String>, ctx: SessionContext) -> Self {
        let catalog = ctx
            .state()
            .config()
            .options()
            .catalog
            .default_catalog
            .clone();
        Self {
            name: name.into(),
            ctx,
            catalog,
        }
    }

    /// Uses a catalog other than the session default.
    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = catalog.into();
        self
    }

    /// The wrapped session.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    fn catalog_provider(&self) -> Result<Arc<dyn CatalogProvider>> {
        self.ctx.catalog(&self.catalog).ok_or_else(|| {
            ProfileError::Configuration(format!(
                "Catalog '{}' is not registered on connection '{}'",
                self.catalog, self.name
            ))
        })
    }

    fn schema_provider(&self, schema: &str) -> Result<Option<Arc<dyn SchemaProvider>>> {
        Ok(self.catalog_provider()?.schema(schema))
    }

    /// Registers a table provider as `schema.table`, creating the schema if needed.
    pub fn register_provider(
        &self,
        schema: &str,
        table: &str,
        provider: Arc<dyn TableProvider>,
    ) -> Result<()> {
        let catalog = self.catalog_provider()?;
        let schema_provider = match catalog.schema(schema) {
            Some(existing) => existing,
            None => {
                let created: Arc<dyn SchemaProvider> = Arc::new(MemorySchemaProvider::new());
                catalog.register_schema(schema, created.clone())?;
                created
            }
        };
        schema_provider.register_table(table.to_string(), provider)?;
        debug!(connection = %self.name, schema, table, "Registered source table");
        Ok(())
    }

    /// Registers in-memory batches as `schema.table`.
    pub fn register_batches(
        &self,
        schema: &str,
        table: &str,
        arrow_schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Result<()> {
        let provider = MemTable::try_new(arrow_schema, vec![batches])?;
        self.register_provider(schema, table, Arc::new(provider))
    }
}

impl Debug for SessionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSource")
            .field("name", &self.name)
            .field("catalog", &self.catalog)
            .finish()
    }
}

#[async_trait]
impl SourceConnector for SessionSource {
    fn connection_name(&self) -> &str {
        &self.name
    }

    async fn list_schemas(&self) -> Result<Vec<String>> {
        let mut schemas: Vec<String> = self
            .catalog_provider()?
            .schema_names()
            .into_iter()
            .filter(|name| name != "information_schema")
            .collect();
        schemas.sort();
        Ok(schemas)
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        let Some(provider) = self.schema_provider(schema)? else {
            return Err(ProfileError::SourceRead {
                schema: schema.to_string(),
                table: "*".to_string(),
                message: format!("Schema not found on connection '{}'", self.name),
                source: None,
            });
        };
        let mut tables = provider.table_names();
        tables.sort();
        Ok(tables)
    }

    async fn table(&self, schema: &str, table: &str) -> Result<DataFrame> {
        let reference = TableReference::full(self.catalog.as_str(), schema, table);
        self.ctx
            .table(reference)
            .await
            .map_err(|e| ProfileError::source_read(schema, table, e))
    }
}

/// Tables of one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInventory {
    pub schema: String,
    pub tables: Vec<String>,
}

/// Name and declared type of a source column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

/// Lists every schema that has at least one table, with its tables.
#[instrument(skip(source), fields(connection = %source.connection_name()))]
pub async fn discover(source: &dyn SourceConnector) -> Result<Vec<SchemaInventory>> {
    let mut inventory = Vec::new();
    for schema in source.list_schemas().await? {
        let tables = source.list_tables(&schema).await?;
        if !tables.is_empty() {
            inventory.push(SchemaInventory { schema, tables });
        }
    }
    Ok(inventory)
}

/// Describes the columns of a source table without reading any rows.
pub async fn describe_table(
    source: &dyn SourceConnector,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnDescription>> {
    let frame = source.table(schema, table).await?;
    Ok(frame
        .schema()
        .fields()
        .iter()
        .map(|field| ColumnDescription {
            name: field.name().clone(),
            data_type: field.data_type().clone(),
            nullable: field.is_nullable(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{Field, Schema};

    fn numbers() -> (SchemaRef, RecordBatch) {
        let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int64, false)]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(Int64Array::from(vec![1, 2, 3]))],
        )
        .unwrap();
        (schema, batch)
    }

    #[tokio::test]
    async fn test_session_source_lists_registered_tables() {
        let source = SessionSource::new("mem", SessionContext::new());
        let (schema, batch) = numbers();
        source
            .register_batches("sales", "orders", schema.clone(), vec![batch.clone()])
            .unwrap();
        source
            .register_batches("sales", "customers", schema, vec![batch])
            .unwrap();

        let schemas = source.list_schemas().await.unwrap();
        assert!(schemas.contains(&"sales".to_string()));
        assert!(!schemas.contains(&"information_schema".to_string()));
        assert_eq!(
            source.list_tables("sales").await.unwrap(),
            vec!["customers", "orders"]
        );
    }

    #[tokio::test]
    async fn test_table_reads_rows() {
        let source = SessionSource::new("mem", SessionContext::new());
        let (schema, batch) = numbers();
        source
            .register_batches("sales", "orders", schema, vec![batch])
            .unwrap();

        let frame = source.table("sales", "orders").await.unwrap();
        assert_eq!(frame.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_missing_table_is_source_read_error() {
        let source = SessionSource::new("mem", SessionContext::new());
        let err = source.table("sales", "nope").await.unwrap_err();
        assert!(matches!(err, ProfileError::SourceRead { ref table, .. } if table == "nope"));

        let err = source.list_tables("nowhere").await.unwrap_err();
        assert!(matches!(err, ProfileError::SourceRead { .. }));
    }

    #[tokio::test]
    async fn test_discover_skips_empty_schemas() {
        let source = SessionSource::new("mem", SessionContext::new());
        let (schema, batch) = numbers();
        source
            .register_batches("sales", "orders", schema, vec![batch])
            .unwrap();

        let inventory = discover(&source).await.unwrap();
        assert_eq!(
            inventory,
            vec![SchemaInventory {
                schema: "sales".to_string(),
                tables: vec!["orders".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn test_describe_table() {
        let source = SessionSource::new("mem", SessionContext::new());
        let (schema, batch) = numbers();
        source
            .register_batches("sales", "orders", schema, vec![batch])
            .unwrap();

        let columns = describe_table(&source, "sales", "orders").await.unwrap();
        assert_eq!(
            columns,
            vec![ColumnDescription {
                name: "n".to_string(),
                data_type: DataType::Int64,
                nullable: false,
            }]
        );
    }
}
