//! Database setup and initialization.
//!
//! Entry points call [`setup_database`] with the resolved database path; it
//! opens (and if necessary creates) the `SQLite` file and ensures the schema
//! for every repository in this crate.

use std::path::Path;

use anyhow::Result;
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};

use crate::blob_store::SqliteBlobStore;
use crate::snapshot::SqliteSnapshotRepository;

/// Set up the `SQLite` database connection and ensure the schema exists.
pub async fn setup_database(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true),
    )
    .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Set up an in-memory `SQLite` database for testing.
pub async fn setup_test_database() -> Result<SqlitePool> {
    let pool = SqlitePool::connect("sqlite::memory:").await?;
    create_schema(&pool).await?;
    Ok(pool)
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    SqliteSnapshotRepository::new(pool.clone())
        .ensure_table()
        .await?;
    SqliteBlobStore::new(pool.clone()).ensure_table().await?;
    Ok(())
}
