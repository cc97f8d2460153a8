//! Directory-backed implementation of the `AudioStore` trait.
//!
//! Audio lives as WAV files inside a directory the user explicitly linked,
//! so the library remains usable from outside the app (file manager, other
//! players). Access to the directory is a process-wide capability with an
//! explicit tri-state permission:
//!
//! ```text
//!   unlinked ──link_new_location──► granted
//!   locked ───request_permission──► granted
//!   granted ──(read/write hits a permission failure)──► locked
//! ```
//!
//! The downgrade is lazy — nothing polls the directory; the first failing
//! operation flips the state. `query_permission` is a pure read and never
//! touches the filesystem.
//!
//! Files are named `{prefix}_{id}_{sanitizedTitle}.wav` and looked up by the
//! `{prefix}_{id}_` part alone, so retitling a document never orphans its
//! audio.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use taudio_core::domain::document::DocumentId;
use taudio_core::ports::store::{AudioStore, PermissionState, StoreError};

/// Prefix shared by every audio file this store writes.
const FILE_PREFIX: &str = "taudio";

/// Extension of the persisted container.
const FILE_EXT: &str = "wav";

/// Maximum length of the sanitized title portion of a filename.
const TITLE_MAX_CHARS: usize = 30;

/// Probe file used to confirm the directory is writable.
const PROBE_FILE: &str = ".taudio_write_test";

struct DirState {
    root: Option<PathBuf>,
    permission: PermissionState,
}

/// Directory-backed implementation of the `AudioStore` trait.
pub struct DirectoryStore {
    state: Mutex<DirState>,
}

impl DirectoryStore {
    /// Create a store with no linked directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DirState {
                root: None,
                permission: PermissionState::Unlinked,
            }),
        }
    }

    /// Create a store for a directory linked in a previous session.
    ///
    /// The store starts `locked`: the handle exists but access has not been
    /// confirmed for this session until `request_permission` succeeds.
    #[must_use]
    pub fn with_location(root: PathBuf) -> Self {
        Self {
            state: Mutex::new(DirState {
                root: Some(root),
                permission: PermissionState::Locked,
            }),
        }
    }

    /// The currently linked directory, if any.
    #[must_use]
    pub fn location(&self) -> Option<PathBuf> {
        self.state.lock().unwrap().root.clone()
    }

    /// Root for a write operation: requires a link and a granted permission.
    fn granted_root(&self) -> Result<PathBuf, StoreError> {
        let state = self.state.lock().unwrap();
        match (&state.root, state.permission) {
            (None, _) => Err(StoreError::NotLinked),
            (Some(root), PermissionState::Granted) => Ok(root.clone()),
            (Some(_), _) => Err(StoreError::PermissionDenied),
        }
    }

    /// Flip `granted → locked` after an access failure.
    fn downgrade(&self) {
        let mut state = self.state.lock().unwrap();
        if state.permission == PermissionState::Granted {
            tracing::warn!("storage directory access failed; downgrading permission to locked");
            state.permission = PermissionState::Locked;
        }
    }

    fn map_write_error(&self, e: &std::io::Error) -> StoreError {
        if e.kind() == ErrorKind::PermissionDenied {
            self.downgrade();
            StoreError::PermissionDenied
        } else {
            StoreError::Write(e.to_string())
        }
    }

    /// All files in `root` belonging to the document, by id-prefix match.
    async fn matching_paths(root: &Path, id: DocumentId) -> std::io::Result<Vec<PathBuf>> {
        let prefix = id_prefix(id);
        let mut matches = Vec::new();

        let mut entries = tokio::fs::read_dir(root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&prefix))
            {
                matches.push(entry.path());
            }
        }
        Ok(matches)
    }

    /// Verify the directory is writable by writing and removing a probe file.
    async fn probe_writable(root: &Path) -> std::io::Result<()> {
        let probe = root.join(PROBE_FILE);
        tokio::fs::write(&probe, b"probe").await?;
        let _ = tokio::fs::remove_file(&probe).await;
        Ok(())
    }
}

impl Default for DirectoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioStore for DirectoryStore {
    async fn save(&self, id: DocumentId, title: &str, blob: &[u8]) -> Result<(), StoreError> {
        let root = self.granted_root()?;

        // Remove files written under an earlier title before writing the
        // current one, so exactly one file per id survives an overwrite.
        let stale = Self::matching_paths(&root, id)
            .await
            .map_err(|e| self.map_write_error(&e))?;
        for path in stale {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != ErrorKind::NotFound {
                    return Err(self.map_write_error(&e));
                }
            }
        }

        let path = root.join(file_name(id, title));
        tokio::fs::write(&path, blob)
            .await
            .map_err(|e| self.map_write_error(&e))?;

        tracing::debug!(id, path = %path.display(), bytes = blob.len(), "audio file stored");
        Ok(())
    }

    async fn get(&self, id: DocumentId) -> Result<Option<Vec<u8>>, StoreError> {
        let root = {
            let state = self.state.lock().unwrap();
            if state.permission != PermissionState::Granted {
                return Ok(None);
            }
            match &state.root {
                Some(root) => root.clone(),
                None => return Ok(None),
            }
        };

        let paths = match Self::matching_paths(&root, id).await {
            Ok(paths) => paths,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                self.downgrade();
                return Ok(None);
            }
            Err(e) => return Err(StoreError::Backend(e.to_string())),
        };

        let Some(path) = paths.first() else {
            return Ok(None);
        };

        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                self.downgrade();
                Ok(None)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    async fn delete(&self, id: DocumentId) -> Result<(), StoreError> {
        let root = {
            let state = self.state.lock().unwrap();
            match (&state.root, state.permission) {
                (None, _) => return Ok(()),
                (Some(_), p) if p != PermissionState::Granted => {
                    tracing::warn!(id, "skipping audio removal while storage is not accessible");
                    return Ok(());
                }
                (Some(root), _) => root.clone(),
            }
        };

        let paths = match Self::matching_paths(&root, id).await {
            Ok(paths) => paths,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                self.downgrade();
                tracing::warn!(id, "skipping audio removal; directory access was revoked");
                return Ok(());
            }
            Err(e) => return Err(StoreError::Backend(e.to_string())),
        };

        for path in paths {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                match e.kind() {
                    ErrorKind::NotFound => {}
                    ErrorKind::PermissionDenied => {
                        self.downgrade();
                        tracing::warn!(id, "audio removal interrupted; directory access was revoked");
                        return Ok(());
                    }
                    _ => return Err(StoreError::Backend(e.to_string())),
                }
            }
        }
        Ok(())
    }

    fn query_permission(&self) -> PermissionState {
        self.state.lock().unwrap().permission
    }

    async fn request_permission(&self) -> Result<bool, StoreError> {
        let root = {
            let state = self.state.lock().unwrap();
            match &state.root {
                Some(root) => root.clone(),
                None => return Err(StoreError::NotLinked),
            }
        };

        match Self::probe_writable(&root).await {
            Ok(()) => {
                self.state.lock().unwrap().permission = PermissionState::Granted;
                tracing::info!(root = %root.display(), "storage directory access granted");
                Ok(true)
            }
            Err(e) => {
                self.state.lock().unwrap().permission = PermissionState::Locked;
                tracing::warn!(root = %root.display(), error = %e, "storage directory access denied");
                Ok(false)
            }
        }
    }

    async fn link_new_location(&self, location: &Path) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(location)
            .await
            .map_err(|e| self.map_write_error(&e))?;
        Self::probe_writable(location)
            .await
            .map_err(|e| self.map_write_error(&e))?;

        let mut state = self.state.lock().unwrap();
        state.root = Some(location.to_path_buf());
        state.permission = PermissionState::Granted;
        tracing::info!(root = %location.display(), "storage directory linked");
        Ok(())
    }
}

/// Sanitized title portion of a filename: non-alphanumeric characters are
/// replaced and the result is capped at [`TITLE_MAX_CHARS`].
fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(TITLE_MAX_CHARS)
        .collect()
}

fn file_name(id: DocumentId, title: &str) -> String {
    format!("{FILE_PREFIX}_{id}_{}.{FILE_EXT}", sanitize_title(title))
}

/// The part of the filename lookups match on — everything up to the title,
/// so title edits never orphan a file.
fn id_prefix(id: DocumentId) -> String {
    format!("{FILE_PREFIX}_{id}_")
}
