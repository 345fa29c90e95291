//! Shared fixtures: three small store databases in a temp directory

#![allow(dead_code)]

use sqlsage_runtime::{AttachedDatabase, RegistryConfig};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use tempfile::TempDir;

const ZEPTO: &[&str] = &[
    "CREATE TABLE products (id INTEGER PRIMARY KEY, name TEXT, price REAL, category TEXT)",
    "INSERT INTO products VALUES (1, 'Milk', 2.5, 'Dairy'), (2, 'Bread', 1.75, 'Bakery'), \
     (3, 'Eggs', 3.0, 'Dairy'), (4, 'Apples', 4.2, 'Fruit')",
    "CREATE TABLE orders (id INTEGER PRIMARY KEY, product_id INTEGER, quantity INTEGER)",
    "INSERT INTO orders VALUES (1, 1, 2), (2, 3, 1)",
];

const BLINKIT: &[&str] = &[
    "CREATE TABLE products (id INTEGER PRIMARY KEY, name TEXT, price REAL, brand TEXT)",
    "INSERT INTO products VALUES (1, 'Paneer', 3.1, 'Amul'), (2, 'Butter', 2.2, 'Amul')",
    "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT, city TEXT)",
    "INSERT INTO customers VALUES (1, 'Asha', 'Pune')",
];

const INSTAMART: &[&str] = &[
    "CREATE TABLE deliveries (id INTEGER PRIMARY KEY, order_id INTEGER, status)",
    "INSERT INTO deliveries VALUES (1, 10, 'delivered'), (2, 11, NULL)",
];

/// Create one database file from a list of statements
pub async fn create_db(path: &Path, statements: &[&str]) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    for statement in statements {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    pool.close().await;
}

/// Temp directory holding zepto.db, blinkit.db and instamart.db
pub async fn store_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    create_db(&dir.path().join("zepto.db"), ZEPTO).await;
    create_db(&dir.path().join("blinkit.db"), BLINKIT).await;
    create_db(&dir.path().join("instamart.db"), INSTAMART).await;
    dir
}

pub fn registry_config(dir: &Path) -> RegistryConfig {
    RegistryConfig::new(
        dir,
        vec![
            AttachedDatabase::new("zepto", "zepto.db"),
            AttachedDatabase::new("blinkit", "blinkit.db"),
            AttachedDatabase::new("instamart", "instamart.db"),
        ],
    )
}
