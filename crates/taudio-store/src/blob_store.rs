//! `SQLite` implementation of the `AudioStore` trait.
//!
//! Audio blobs live as rows keyed directly by document id. This is the
//! fallback backend when no directory has been linked: it needs no
//! filename sanitization and no permission handling, at the cost of the
//! audio being invisible to anything outside the app.

use std::path::Path;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use taudio_core::domain::document::DocumentId;
use taudio_core::ports::store::{AudioStore, PermissionState, StoreError};

/// `SQLite` implementation of the `AudioStore` trait.
pub struct SqliteBlobStore {
    pool: SqlitePool,
}

impl SqliteBlobStore {
    /// Create a new `SQLite` blob store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Ensure the blob table exists.
    ///
    /// Call this during initialization to set up the schema.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS audio_blobs (
                doc_id INTEGER PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                data BLOB NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl AudioStore for SqliteBlobStore {
    async fn save(&self, id: DocumentId, title: &str, blob: &[u8]) -> Result<(), StoreError> {
        let updated_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

        sqlx::query(
            "INSERT OR REPLACE INTO audio_blobs (doc_id, title, data, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(title)
        .bind(blob)
        .bind(&updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Write(e.to_string()))?;

        tracing::debug!(id, bytes = blob.len(), "audio blob stored");
        Ok(())
    }

    async fn get(&self, id: DocumentId) -> Result<Option<Vec<u8>>, StoreError> {
        let row = sqlx::query("SELECT data FROM audio_blobs WHERE doc_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row.map(|r| r.get("data")))
    }

    async fn delete(&self, id: DocumentId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM audio_blobs WHERE doc_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    // The embedded store lives inside the app's own database: there is
    // nothing to link and access cannot be revoked.
    fn query_permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    async fn request_permission(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn link_new_location(&self, _location: &Path) -> Result<(), StoreError> {
        Ok(())
    }
}
