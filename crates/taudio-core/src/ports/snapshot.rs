//! Document snapshot persistence port.
//!
//! The whole document list is loaded once at startup and rewritten after
//! every registry mutation. The snapshot is a thin persistence mirror, not
//! a query surface — the in-memory registry is the source of truth while
//! the process runs.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::document::Document;

/// Errors from snapshot persistence.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Serialization or storage failure.
    #[error("snapshot storage error: {0}")]
    Storage(String),
}

/// Port for persisting the document library between sessions.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Load the persisted document list. An absent snapshot is an empty
    /// library, not an error.
    async fn load(&self) -> Result<Vec<Document>, SnapshotError>;

    /// Replace the persisted document list.
    async fn save(&self, documents: &[Document]) -> Result<(), SnapshotError>;
}
