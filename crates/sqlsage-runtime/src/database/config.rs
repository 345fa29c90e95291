//! Database registry configuration

use crate::error::{Result, RuntimeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One database file attached under an alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedDatabase {
    /// Name the file is attached as (`alias.table`)
    pub alias: String,

    /// Database file, relative to the registry base directory unless absolute
    pub file: PathBuf,
}

impl AttachedDatabase {
    pub fn new(alias: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            alias: alias.into(),
            file: file.into(),
        }
    }

    /// Resolve the file path against a base directory
    pub fn resolve(&self, base_dir: &Path) -> PathBuf {
        if self.file.is_absolute() {
            self.file.clone()
        } else {
            base_dir.join(&self.file)
        }
    }
}

/// How the (normally empty) `main` database is treated during introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MainDatabasePolicy {
    /// Describe `main` only when it holds user tables
    #[default]
    IncludeIfNonEmpty,

    /// Never describe `main`
    Exclude,
}

/// Connection registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory relative database paths are resolved against
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Databases to attach, in order
    #[serde(default = "default_databases")]
    pub databases: Vec<AttachedDatabase>,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            databases: default_databases(),
            pool_size: default_pool_size(),
        }
    }
}

impl RegistryConfig {
    pub fn new(base_dir: impl Into<PathBuf>, databases: Vec<AttachedDatabase>) -> Self {
        Self {
            base_dir: base_dir.into(),
            databases,
            pool_size: default_pool_size(),
        }
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Configured aliases in order
    pub fn aliases(&self) -> Vec<String> {
        self.databases.iter().map(|db| db.alias.clone()).collect()
    }

    /// Check aliases are plain, unique identifiers
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for db in &self.databases {
            if !is_identifier(&db.alias) {
                return Err(RuntimeError::Configuration(format!(
                    "Invalid database alias '{}': expected [A-Za-z_][A-Za-z0-9_]*",
                    db.alias
                )));
            }
            if matches!(db.alias.to_ascii_lowercase().as_str(), "main" | "temp") {
                return Err(RuntimeError::Configuration(format!(
                    "Database alias '{}' is reserved",
                    db.alias
                )));
            }
            if !seen.insert(db.alias.to_ascii_lowercase()) {
                return Err(RuntimeError::Configuration(format!(
                    "Duplicate database alias '{}'",
                    db.alias
                )));
            }
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_databases() -> Vec<AttachedDatabase> {
    ["zepto", "blinkit", "instamart"]
        .iter()
        .map(|alias| AttachedDatabase::new(*alias, format!("{}.db", alias)))
        .collect()
}

fn default_pool_size() -> u32 {
    5
}
