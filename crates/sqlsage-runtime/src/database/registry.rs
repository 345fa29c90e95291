//! Shared connection with every configured database attached

use super::config::RegistryConfig;
use crate::error::{Result, RuntimeError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Pool over a private temporary `main` with the configured databases attached
///
/// Every pooled connection runs the `ATTACH` statements when it is opened,
/// so `alias.table` resolves on whichever connection serves a query. Files
/// are attached with `mode=ro`.
#[derive(Debug)]
pub struct AttachedPool {
    pool: SqlitePool,
    aliases: Vec<String>,
}

impl AttachedPool {
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Attached aliases in configuration order
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| a == alias)
    }
}

/// Lazily creates the process-wide [`AttachedPool`]
pub struct ConnectionRegistry {
    config: RegistryConfig,
    cell: OnceCell<Arc<AttachedPool>>,
}

impl ConnectionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Configured aliases in order
    pub fn aliases(&self) -> Vec<String> {
        self.config.aliases()
    }

    /// Return the shared handle, creating it on first use
    ///
    /// Concurrent first calls share one initialisation. A failed attempt
    /// leaves the registry empty so the next call tries again.
    pub async fn get_connection(&self) -> Result<Arc<AttachedPool>> {
        self.cell
            .get_or_try_init(|| async { self.connect().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Whether the shared handle has been created
    pub fn is_connected(&self) -> bool {
        self.cell.initialized()
    }

    async fn connect(&self) -> Result<AttachedPool> {
        self.config.validate()?;

        let attachments = Arc::new(self.resolve_files()?);
        info!(
            "Attaching {} database(s) from {}",
            attachments.len(),
            self.config.base_dir.display()
        );

        let hook_attachments = attachments.clone();
        let pool = SqlitePoolOptions::new()
            .max_connections(self.config.pool_size.max(1))
            .after_connect(move |conn, _meta| {
                let attachments = hook_attachments.clone();
                Box::pin(async move {
                    for (alias, uri) in attachments.iter() {
                        debug!("ATTACH {} AS {}", uri, alias);
                        sqlx::query(&format!("ATTACH DATABASE ? AS \"{}\"", alias))
                            .bind(uri.as_str())
                            .execute(&mut *conn)
                            .await?;
                    }
                    // Attached stores are never written through this pool
                    sqlx::query("PRAGMA query_only = ON")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            // Empty filename: a private temporary main per connection.
            // SQLITE_OPEN_MEMORY would carry over to every ATTACH.
            .connect_with(SqliteConnectOptions::new().filename(""))
            .await?;

        Ok(AttachedPool {
            pool,
            aliases: attachments.iter().map(|(alias, _)| alias.clone()).collect(),
        })
    }

    /// Resolve every configured file to a read-only URI, failing on the
    /// first missing one
    fn resolve_files(&self) -> Result<Vec<(String, String)>> {
        self.config
            .databases
            .iter()
            .map(|db| {
                let path = db.resolve(&self.config.base_dir);
                ensure_exists(&path)?;
                Ok((db.alias.clone(), read_only_uri(&path)))
            })
            .collect()
    }

    /// Confirm every file is present and every alias answers a query
    pub async fn health_check(&self) -> Result<Vec<String>> {
        for db in &self.config.databases {
            ensure_exists(&db.resolve(&self.config.base_dir))?;
        }

        let handle = self.get_connection().await?;
        for alias in handle.aliases() {
            sqlx::query(&format!("SELECT count(*) FROM \"{}\".sqlite_master", alias))
                .fetch_one(handle.pool())
                .await?;
        }

        Ok(handle.aliases().to_vec())
    }
}

/// `file:` URI opening `path` read-only
fn read_only_uri(path: &Path) -> String {
    let mut uri = String::from("file:");
    for c in path.to_string_lossy().chars() {
        match c {
            '%' => uri.push_str("%25"),
            '?' => uri.push_str("%3f"),
            '#' => uri.push_str("%23"),
            c => uri.push(c),
        }
    }
    uri.push_str("?mode=ro");
    uri
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(RuntimeError::Configuration(format!(
            "Database file not found: {}",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_uri() {
        assert_eq!(
            read_only_uri(Path::new("/data/zepto.db")),
            "file:/data/zepto.db?mode=ro"
        );
        assert_eq!(
            read_only_uri(Path::new("/data/50%?#.db")),
            "file:/data/50%25%3f%23.db?mode=ro"
        );
    }
}
