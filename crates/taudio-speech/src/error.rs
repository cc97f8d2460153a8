//! Pipeline error taxonomy.
//!
//! Every way a document can fail funnels into [`PipelineError`]. All of it
//! is caught at the pipeline boundary and converted into the document's
//! `error` status plus a user-readable caption — nothing propagates out of
//! `process`. The one deliberate exception is a quota failure on synthesis,
//! which never becomes an error at all (see the system-voice fallback).

use thiserror::Error;

use taudio_core::domain::document::{DocumentId, FailureKind};
use taudio_core::ports::snapshot::SnapshotError;
use taudio_core::ports::store::StoreError;
use taudio_core::ports::synthesis::SynthesisError;

use crate::codec::DecodeError;

/// A failure that takes a document to the `error` status.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Text extraction from the source file failed.
    #[error("text extraction failed: {0}")]
    Extraction(#[source] SynthesisError),

    /// Speech synthesis failed.
    #[error("speech synthesis failed: {0}")]
    Synthesis(#[source] SynthesisError),

    /// The synthesis payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Persisting the audio blob failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Persisting the library snapshot failed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Extraction or submission yielded no text to synthesize.
    #[error("no text to process")]
    EmptyText,
}

impl PipelineError {
    /// Classified failure kind recorded on the document.
    #[must_use]
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Extraction(_) | Self::EmptyText => FailureKind::Extraction,
            Self::Synthesis(reason) => match reason {
                SynthesisError::Quota => FailureKind::SynthesisQuota,
                SynthesisError::Auth => FailureKind::SynthesisAuth,
                SynthesisError::Safety => FailureKind::SynthesisSafety,
                SynthesisError::Network(_) => FailureKind::SynthesisNetwork,
                SynthesisError::Empty => FailureKind::SynthesisEmpty,
            },
            Self::Decode(_) => FailureKind::Decode,
            Self::Store(store) => match store {
                StoreError::NotLinked => FailureKind::StorageNotLinked,
                StoreError::PermissionDenied => FailureKind::StoragePermissionDenied,
                StoreError::Write(_) | StoreError::Backend(_) => FailureKind::StorageWrite,
            },
            Self::Snapshot(_) => FailureKind::StorageWrite,
        }
    }

    /// User-facing caption for the document's error state. Each failure
    /// kind gets its own message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyText => "No text to process".to_string(),
            Self::Extraction(_) => "Couldn't read the document — try a different file".to_string(),
            Self::Synthesis(reason) => match reason {
                SynthesisError::Quota => "Voice generation quota exhausted".to_string(),
                SynthesisError::Auth => "Speech service rejected the credentials".to_string(),
                SynthesisError::Safety => "Content was rejected by safety filters".to_string(),
                SynthesisError::Network(_) => {
                    "Network error while generating audio — check your connection".to_string()
                }
                SynthesisError::Empty => "The speech service returned no audio".to_string(),
            },
            Self::Decode(_) => "Received unreadable audio data".to_string(),
            Self::Store(store) => match store {
                StoreError::NotLinked => "Link an audio folder before generating".to_string(),
                StoreError::PermissionDenied => {
                    "Folder access needed — grant storage permission and retry".to_string()
                }
                StoreError::Write(_) | StoreError::Backend(_) => {
                    "Couldn't save the audio file".to_string()
                }
            },
            Self::Snapshot(_) => "Couldn't update the library".to_string(),
        }
    }
}

/// A retry request that could not start. Unlike [`PipelineError`] these are
/// returned to the caller — there is no document state to absorb them into.
#[derive(Debug, Error)]
pub enum RetryError {
    /// The document does not exist.
    #[error("document {0} not found")]
    NotFound(DocumentId),

    /// Only documents in the `error` status can be retried.
    #[error("document {0} is not in a retryable state")]
    NotRetryable(DocumentId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_synthesis_reason_maps_to_a_distinct_kind() {
        let reasons = [
            SynthesisError::Quota,
            SynthesisError::Auth,
            SynthesisError::Safety,
            SynthesisError::Network("dns".to_string()),
            SynthesisError::Empty,
        ];
        let mut kinds: Vec<FailureKind> = reasons
            .into_iter()
            .map(|r| PipelineError::Synthesis(r).failure_kind())
            .collect();
        kinds.dedup();
        assert_eq!(kinds.len(), 5);
    }

    #[test]
    fn store_errors_map_to_storage_kinds() {
        assert_eq!(
            PipelineError::Store(StoreError::NotLinked).failure_kind(),
            FailureKind::StorageNotLinked
        );
        assert_eq!(
            PipelineError::Store(StoreError::PermissionDenied).failure_kind(),
            FailureKind::StoragePermissionDenied
        );
    }

    #[test]
    fn messages_differ_per_classification() {
        let quota = PipelineError::Synthesis(SynthesisError::Quota).user_message();
        let auth = PipelineError::Synthesis(SynthesisError::Auth).user_message();
        let network =
            PipelineError::Synthesis(SynthesisError::Network("x".to_string())).user_message();
        assert_ne!(quota, auth);
        assert_ne!(auth, network);
    }
}
