//! In-memory document registry mirrored to a persisted snapshot.
//!
//! The registry owns the canonical list of documents while the process
//! runs. Every mutation is a pure replace-by-id against the latest list —
//! never against a captured copy — so concurrent pipeline tasks cannot lose
//! each other's writes under the cooperative scheduler. An update targeting
//! an id that has been removed is a silent no-op: a pipeline may
//! legitimately finish after its document was deleted.
//!
//! After every mutation the full list is written through the
//! [`SnapshotRepository`] so the library survives restarts.

use std::sync::{Arc, RwLock};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::document::{
    Document, DocumentId, DocumentStatus, FailureKind, NewDocument, VoiceEngine,
};
use crate::ports::snapshot::{SnapshotError, SnapshotRepository};
use crate::ports::store::{AudioStore, PermissionState};

/// In-memory document list plus lifecycle state, mirrored to a snapshot.
pub struct DocumentRegistry {
    documents: RwLock<Vec<Document>>,
    snapshot: Arc<dyn SnapshotRepository>,
    last_id: AtomicI64,
}

impl DocumentRegistry {
    /// Load the registry from its persisted snapshot.
    pub async fn load(snapshot: Arc<dyn SnapshotRepository>) -> Result<Self, SnapshotError> {
        let documents = snapshot.load().await?;
        let last_id = documents.iter().map(|d| d.id).max().unwrap_or(0);
        tracing::debug!(count = documents.len(), "loaded document snapshot");

        Ok(Self {
            documents: RwLock::new(documents),
            snapshot,
            last_id: AtomicI64::new(last_id),
        })
    }

    /// Create a new registry with an empty library.
    #[must_use]
    pub fn empty(snapshot: Arc<dyn SnapshotRepository>) -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            snapshot,
            last_id: AtomicI64::new(0),
        }
    }

    /// Allocate the next document id: the creation timestamp in epoch
    /// milliseconds, bumped past the previous id so ids stay strictly
    /// increasing even within one millisecond.
    fn allocate_id(&self) -> DocumentId {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(now.max(prev + 1))
            })
            .map_or(now, |prev| now.max(prev + 1))
    }

    /// Create a document record and persist the snapshot.
    pub async fn create(&self, new: NewDocument) -> Result<Document, SnapshotError> {
        let document = Document {
            id: self.allocate_id(),
            title: new.title,
            meta: "Queued".to_string(),
            progress: 0.0,
            status: new.status,
            content: new.content,
            voice: new.voice,
            voice_engine: VoiceEngine::Remote,
            icon: new.icon,
            audio_size: None,
            failure: None,
        };

        self.documents.write().unwrap().push(document.clone());
        self.persist().await?;

        tracing::info!(id = document.id, status = %document.status, "document created");
        Ok(document)
    }

    /// A copy of the document with the given id, if present.
    #[must_use]
    pub fn get(&self, id: DocumentId) -> Option<Document> {
        self.documents
            .read()
            .unwrap()
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    /// A copy of the full library, in creation order.
    #[must_use]
    pub fn list(&self) -> Vec<Document> {
        self.documents.read().unwrap().clone()
    }

    /// Mutate the document with the given id in place and persist.
    ///
    /// Returns the updated document, or `None` (without persisting) when the
    /// id is absent — deletion during processing is expected, not an error.
    pub async fn update<F>(&self, id: DocumentId, mutate: F) -> Result<Option<Document>, SnapshotError>
    where
        F: FnOnce(&mut Document),
    {
        let updated = {
            let mut documents = self.documents.write().unwrap();
            documents.iter_mut().find(|d| d.id == id).map(|doc| {
                mutate(doc);
                doc.clone()
            })
        };

        if updated.is_some() {
            self.persist().await?;
        }
        Ok(updated)
    }

    /// Remove the document with the given id and persist.
    pub async fn remove(&self, id: DocumentId) -> Result<Option<Document>, SnapshotError> {
        let removed = {
            let mut documents = self.documents.write().unwrap();
            let index = documents.iter().position(|d| d.id == id);
            index.map(|i| documents.remove(i))
        };

        if let Some(ref doc) = removed {
            tracing::info!(id = doc.id, "document removed");
            self.persist().await?;
        }
        Ok(removed)
    }

    /// Reconcile the loaded library with reality.
    ///
    /// - Documents left in a non-terminal status by a previous session are
    ///   downgraded to `error` (their pipeline task no longer exists).
    /// - A `ready` document must have a persisted blob reachable through the
    ///   store; when the store's permission is granted and the blob is gone,
    ///   the status is downgraded. While access is not granted the invariant
    ///   is unverifiable and the document is left alone.
    ///
    /// System-voice documents are exempt — they never persist a blob.
    pub async fn reconcile(&self, store: &dyn AudioStore) -> Result<(), SnapshotError> {
        let mut changed = false;

        let interrupted: Vec<DocumentId> = self
            .documents
            .read()
            .unwrap()
            .iter()
            .filter(|d| !d.status.is_terminal())
            .map(|d| d.id)
            .collect();

        for id in interrupted {
            tracing::warn!(id, "document was mid-pipeline when the session ended");
            let mut documents = self.documents.write().unwrap();
            if let Some(doc) = documents.iter_mut().find(|d| d.id == id) {
                doc.mark_error(FailureKind::Interrupted, "Interrupted — retry to continue");
                changed = true;
            }
        }

        if store.query_permission() == PermissionState::Granted {
            let ready: Vec<DocumentId> = self
                .documents
                .read()
                .unwrap()
                .iter()
                .filter(|d| {
                    d.status == DocumentStatus::Ready && d.voice_engine == VoiceEngine::Remote
                })
                .map(|d| d.id)
                .collect();

            for id in ready {
                match store.get(id).await {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        tracing::warn!(id, "ready document has no persisted audio; downgrading");
                        let mut documents = self.documents.write().unwrap();
                        if let Some(doc) = documents.iter_mut().find(|d| d.id == id) {
                            doc.mark_error(FailureKind::AudioMissing, "Audio missing from storage");
                            changed = true;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(id, error = %e, "could not verify persisted audio");
                    }
                }
            }
        }

        if changed {
            self.persist().await?;
        }
        Ok(())
    }

    /// Write the current list through the snapshot repository.
    async fn persist(&self) -> Result<(), SnapshotError> {
        let documents = self.documents.read().unwrap().clone();
        self.snapshot.save(&documents).await
    }
}
