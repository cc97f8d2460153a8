//! Storage adapters for taudio.
//!
//! Implements the `taudio-core` persistence ports twice over:
//!
//! - [`SqliteBlobStore`] — audio blobs as rows in the embedded database.
//!   Always accessible, but opaque to anything outside the app.
//! - [`DirectoryStore`] — audio blobs as WAV files in a user-linked
//!   directory, with explicit permission states and graceful degradation
//!   when access is revoked between sessions.
//! - [`SqliteSnapshotRepository`] — the document library as a JSON snapshot
//!   in a key-value table.
//!
//! The pipeline talks to all of these through the port traits and never
//! learns which backend is in play.

pub mod blob_store;
pub mod dir_store;
pub mod setup;
pub mod snapshot;

pub use blob_store::SqliteBlobStore;
pub use dir_store::DirectoryStore;
pub use setup::{setup_database, setup_test_database};
pub use snapshot::SqliteSnapshotRepository;
