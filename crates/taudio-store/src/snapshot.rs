//! `SQLite` implementation of the `SnapshotRepository` trait.
//!
//! Stores the document library as a JSON blob in a key-value table. The
//! snapshot is rewritten wholesale after every registry mutation, so a
//! single row is all the schema this needs.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use taudio_core::domain::document::Document;
use taudio_core::ports::snapshot::{SnapshotError, SnapshotRepository};

/// `SQLite` implementation of the `SnapshotRepository` trait.
pub struct SqliteSnapshotRepository {
    pool: SqlitePool,
}

const SNAPSHOT_KEY: &str = "document_library";

impl SqliteSnapshotRepository {
    /// Create a new `SQLite` snapshot repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Ensure the snapshot table exists.
    ///
    /// Call this during initialization to set up the schema.
    pub async fn ensure_table(&self) -> Result<(), SnapshotError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS library_kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SnapshotError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl SnapshotRepository for SqliteSnapshotRepository {
    async fn load(&self) -> Result<Vec<Document>, SnapshotError> {
        let row = sqlx::query("SELECT value FROM library_kv WHERE key = ?")
            .bind(SNAPSHOT_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SnapshotError::Storage(e.to_string()))?;

        match row {
            Some(r) => {
                let json: String = r.get("value");
                serde_json::from_str(&json).map_err(|e| SnapshotError::Storage(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, documents: &[Document]) -> Result<(), SnapshotError> {
        let json =
            serde_json::to_string(documents).map_err(|e| SnapshotError::Storage(e.to_string()))?;
        let updated_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

        sqlx::query("INSERT OR REPLACE INTO library_kv (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(SNAPSHOT_KEY)
            .bind(&json)
            .bind(&updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| SnapshotError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taudio_core::domain::document::{DocumentStatus, VoiceEngine};
    use taudio_core::domain::voice::VoiceId;

    fn sample_document() -> Document {
        Document {
            id: 1_700_000_000_000,
            title: "Class Notes - History.txt".to_string(),
            meta: "156 KB • Ready".to_string(),
            progress: 100.0,
            status: DocumentStatus::Ready,
            content: Some("The French Revolution was a period of upheaval.".to_string()),
            voice: VoiceId::from("Charon"),
            voice_engine: VoiceEngine::Remote,
            icon: "article".to_string(),
            audio_size: Some("156 KB".to_string()),
            failure: None,
        }
    }

    #[tokio::test]
    async fn load_returns_empty_library_when_no_snapshot() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let repo = SqliteSnapshotRepository::new(pool);
        repo.ensure_table().await.unwrap();

        let documents = repo.load().await.unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let repo = SqliteSnapshotRepository::new(pool);
        repo.ensure_table().await.unwrap();

        let documents = vec![sample_document()];
        repo.save(&documents).await.unwrap();

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, documents[0].id);
        assert_eq!(loaded[0].status, DocumentStatus::Ready);
        assert_eq!(loaded[0].voice, VoiceId::from("Charon"));
    }

    #[tokio::test]
    async fn save_replaces_the_previous_snapshot() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let repo = SqliteSnapshotRepository::new(pool);
        repo.ensure_table().await.unwrap();

        repo.save(&[sample_document()]).await.unwrap();
        repo.save(&[]).await.unwrap();

        assert!(repo.load().await.unwrap().is_empty());
    }
}
