//! Schema introspection of attached databases
//!
//! Produces the textual schema handed to the agent: one `CREATE TABLE`
//! rendering per user table followed by a few sample rows.

use super::config::MainDatabasePolicy;
use super::value::{render_tuple, row_values};
use crate::error::{Result, RuntimeError};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::{debug, warn};

/// Column name and declared type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// Metadata of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Owning alias
    pub database: String,

    /// Table name
    pub name: String,

    /// Columns in declaration order
    pub columns: Vec<ColumnInfo>,

    /// Rendered sample rows
    pub sample_rows: Vec<String>,
}

impl TableDescriptor {
    /// `alias.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }

    /// `CREATE TABLE alias.table (\n  col TYPE, ...\n);`
    pub fn create_statement(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.data_type))
            .collect();
        format!(
            "CREATE TABLE {} (\n  {}\n);",
            self.qualified_name(),
            columns.join(", ")
        )
    }

    /// Description sections: the DDL, then the sample header and rows
    pub fn sections(&self) -> Vec<String> {
        let mut sections = vec![self.create_statement()];
        if !self.sample_rows.is_empty() {
            sections.push(format!("-- Sample data from {}:", self.qualified_name()));
            sections.extend(self.sample_rows.iter().map(|row| format!("-- {}", row)));
        }
        sections
    }
}

/// Rendered schema of a set of tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescription {
    /// Qualified table names
    pub table_names: Vec<String>,

    /// Sections of every table joined by blank lines
    pub description: String,

    pub tables: Vec<TableDescriptor>,
}

impl SchemaDescription {
    pub fn from_tables(tables: Vec<TableDescriptor>) -> Self {
        let table_names = tables.iter().map(TableDescriptor::qualified_name).collect();
        let description = tables
            .iter()
            .flat_map(TableDescriptor::sections)
            .collect::<Vec<_>>()
            .join("\n\n");
        Self {
            table_names,
            description,
            tables,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Look up a table by qualified or bare name
    pub fn find(&self, name: &str) -> Option<&TableDescriptor> {
        let name = name.trim();
        self.tables
            .iter()
            .find(|t| t.qualified_name().eq_ignore_ascii_case(name))
            .or_else(|| self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name)))
    }
}

/// Reads table metadata through the shared pool
#[derive(Debug, Clone)]
pub struct SchemaIntrospector {
    sample_rows: usize,
    main_policy: MainDatabasePolicy,
}

impl Default for SchemaIntrospector {
    fn default() -> Self {
        Self::new(3, MainDatabasePolicy::default())
    }
}

impl SchemaIntrospector {
    pub fn new(sample_rows: usize, main_policy: MainDatabasePolicy) -> Self {
        Self {
            sample_rows,
            main_policy,
        }
    }

    /// Databases visible on the connection, `temp` excluded
    pub async fn attached_databases(&self, pool: &SqlitePool) -> Result<Vec<String>> {
        let rows = sqlx::query("PRAGMA database_list").fetch_all(pool).await?;

        let mut databases = Vec::new();
        for row in rows {
            let name: String = row.try_get("name")?;
            match name.as_str() {
                "temp" => continue,
                "main" => {
                    if self.main_policy == MainDatabasePolicy::Exclude
                        || self.list_tables(pool, "main").await?.is_empty()
                    {
                        continue;
                    }
                }
                _ => {}
            }
            databases.push(name);
        }
        Ok(databases)
    }

    /// User tables of one database, sorted by name
    pub async fn list_tables(&self, pool: &SqlitePool, database: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT name FROM {}.sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            quote_ident(database)
        );
        let rows = sqlx::query(&sql).fetch_all(pool).await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }

    /// Columns and sample rows of one table
    pub async fn describe_table(
        &self,
        pool: &SqlitePool,
        database: &str,
        table: &str,
    ) -> Result<TableDescriptor> {
        let sql = format!(
            "PRAGMA {}.table_info({})",
            quote_ident(database),
            quote_ident(table)
        );
        let rows = sqlx::query(&sql).fetch_all(pool).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("name")?;
            let declared: Option<String> = row.try_get("type")?;
            let data_type = declared
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "TEXT".to_string());
            columns.push(ColumnInfo { name, data_type });
        }

        if columns.is_empty() {
            return Err(RuntimeError::Introspection(format!(
                "No columns reported for {}.{}",
                database, table
            )));
        }

        let sample_rows = match self.sample(pool, database, table).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Skipping sample rows of {}.{}: {}", database, table, e);
                Vec::new()
            }
        };

        Ok(TableDescriptor {
            database: database.to_string(),
            name: table.to_string(),
            columns,
            sample_rows,
        })
    }

    async fn sample(&self, pool: &SqlitePool, database: &str, table: &str) -> Result<Vec<String>> {
        if self.sample_rows == 0 {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT * FROM {}.{} LIMIT {}",
            quote_ident(database),
            quote_ident(table),
            self.sample_rows
        );
        let rows = sqlx::query(&sql).fetch_all(pool).await?;
        Ok(rows.iter().map(|row| render_tuple(&row_values(row))).collect())
    }

    /// Describe the named tables of one database, skipping unreadable ones
    pub async fn describe_tables(
        &self,
        pool: &SqlitePool,
        database: &str,
        tables: &[String],
    ) -> Vec<TableDescriptor> {
        let mut described = Vec::with_capacity(tables.len());
        for table in tables {
            match self.describe_table(pool, database, table).await {
                Ok(descriptor) => described.push(descriptor),
                Err(e) => warn!("Error getting info for table {}.{}: {}", database, table, e),
            }
        }
        described
    }

    /// Describe the given databases; unreadable tables are logged and skipped
    pub async fn describe_databases(
        &self,
        pool: &SqlitePool,
        databases: &[String],
    ) -> Result<SchemaDescription> {
        let mut tables = Vec::new();
        for database in databases {
            let names = self.list_tables(pool, database).await?;
            tables.extend(self.describe_tables(pool, database, &names).await);
        }

        let schema = SchemaDescription::from_tables(tables);
        debug!("Found tables: {:?}", schema.table_names);
        Ok(schema)
    }

    /// Describe one attached database
    pub async fn describe_database(
        &self,
        pool: &SqlitePool,
        database: &str,
    ) -> Result<SchemaDescription> {
        let attached = self.attached_databases(pool).await?;
        if !attached.iter().any(|d| d == database) && database != "main" {
            return Err(RuntimeError::Introspection(format!(
                "Database '{}' is not attached",
                database
            )));
        }
        self.describe_databases(pool, &[database.to_string()]).await
    }

    /// Describe every attached database
    pub async fn describe_schema(&self, pool: &SqlitePool) -> Result<SchemaDescription> {
        let attached = self.attached_databases(pool).await?;
        self.describe_databases(pool, &attached).await
    }
}

/// Quote an identifier for interpolation into SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
