//! Audio blob storage port — the façade the pipeline persists through.
//!
//! Two interchangeable backends exist: a user-linked directory (blobs as
//! WAV files, explicit permission states) and an embedded SQLite store
//! (blobs as rows, always accessible). The pipeline never knows which one
//! it is talking to.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::document::DocumentId;

/// Access state of the storage location.
///
/// One state is tracked per store, not per document: a permission downgrade
/// affects every in-flight pipeline at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// No location has ever been associated.
    Unlinked,

    /// A location is associated but access has not been confirmed this
    /// session. Reached implicitly when a read/write hits a permission
    /// failure.
    Locked,

    /// Access confirmed.
    Granted,
}

/// Errors raised by the storage façade.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No storage location has ever been associated.
    #[error("no storage location has been linked")]
    NotLinked,

    /// A location exists but access is not granted at call time.
    #[error("storage permission has not been granted")]
    PermissionDenied,

    /// Writing the blob failed for a non-permission reason.
    #[error("storage write failed: {0}")]
    Write(String),

    /// Backend-specific failure (database, filesystem metadata).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence façade for audio blobs, keyed by document id.
///
/// `get` degrades gracefully: a missing blob and an inaccessible location
/// both yield `Ok(None)`. Callers that need to tell the two apart consult
/// [`query_permission`](AudioStore::query_permission) — a pure state read
/// that never prompts. [`request_permission`](AudioStore::request_permission)
/// is the only operation allowed to confirm access interactively and must be
/// reached from a user-initiated call path.
#[async_trait]
pub trait AudioStore: Send + Sync {
    /// Persist the blob for a document, overwriting any previous audio.
    ///
    /// Fails with [`StoreError::NotLinked`] when no location was ever
    /// associated and [`StoreError::PermissionDenied`] when access is not
    /// granted at call time. Never prompts.
    async fn save(&self, id: DocumentId, title: &str, blob: &[u8]) -> Result<(), StoreError>;

    /// Fetch the blob for a document.
    ///
    /// Lookups go by id alone so title edits never orphan audio. Returns
    /// `Ok(None)` both when no blob exists and when the location is
    /// currently inaccessible.
    async fn get(&self, id: DocumentId) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete the blob for a document. Idempotent — deleting a missing blob
    /// is not an error.
    async fn delete(&self, id: DocumentId) -> Result<(), StoreError>;

    /// Current permission state. Pure read: never probes, never prompts.
    fn query_permission(&self) -> PermissionState;

    /// Confirm access to the linked location, prompting if the platform
    /// requires it. Returns whether access is granted afterwards.
    async fn request_permission(&self) -> Result<bool, StoreError>;

    /// Associate a new storage location and confirm access to it.
    async fn link_new_location(&self, location: &Path) -> Result<(), StoreError>;
}
