//! Core domain types and port definitions for taudio.
//!
//! taudio converts user-supplied text and documents into spoken audio via a
//! remote synthesis service and keeps the result locally for offline replay.
//! This crate holds the pieces every adapter needs and nothing else:
//!
//! - [`domain`] — the [`Document`] record, its lifecycle status, and the
//!   remote voice catalog
//! - [`ports`] — trait boundaries for the remote speech service, the audio
//!   blob store, and the document snapshot
//! - [`registry`] — the in-memory document library mirrored to a persisted
//!   snapshot
//!
//! Concrete adapters (SQLite, directory storage, the HTTP speech client, the
//! pipeline itself) live in sibling crates.

pub mod domain;
pub mod ports;
pub mod registry;

// Re-export commonly used types for convenience
pub use domain::document::{
    Document, DocumentId, DocumentStatus, FailureKind, NewDocument, VoiceEngine, format_size,
    icon_for_mime,
};
pub use domain::voice::{DEFAULT_VOICE, VoiceId, VoiceInfo, remote_voices};
pub use ports::snapshot::{SnapshotError, SnapshotRepository};
pub use ports::store::{AudioStore, PermissionState, StoreError};
pub use ports::synthesis::{SpeechClient, SynthesisError};
pub use registry::DocumentRegistry;
