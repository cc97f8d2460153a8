//! Document domain types.
//!
//! A [`Document`] is one user-visible audio item: a piece of source text (or
//! an uploaded file) that is converted to spoken audio and kept for offline
//! replay. Status and progress are kept consistent by construction — use
//! [`Document::mark_ready`] and [`Document::mark_error`] for terminal
//! transitions rather than writing the fields directly.

use serde::{Deserialize, Serialize};

use crate::domain::voice::VoiceId;

/// Unique identifier of a document.
///
/// Allocated from the creation timestamp (epoch milliseconds) with a
/// monotonic bump, so ids are unique and sort by creation time.
pub type DocumentId = i64;

/// Lifecycle status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Extracting text from a source file, or inferring a title.
    Analyzing,

    /// Waiting on the remote synthesis call.
    Generating,

    /// Terminal success — audio is available for replay.
    Ready,

    /// Terminal failure — retryable by the user from the same inputs.
    Error,
}

impl DocumentStatus {
    /// String representation used in captions and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Analyzing => "analyzing",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }

    /// Whether this status is terminal (no pipeline task owns the document).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which engine renders speech for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VoiceEngine {
    /// Remote neural synthesis; audio is persisted locally after generation.
    #[default]
    Remote,

    /// On-device system voice; nothing is persisted and speech is rendered
    /// at playback time. Selected automatically when the remote service
    /// reports an exhausted quota.
    System,
}

/// Classified cause of a document's `error` status.
///
/// A quota failure never appears here — it is absorbed by the system-voice
/// fallback and the document completes `ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Text extraction from the source file failed.
    Extraction,
    /// The speech service reported an exhausted quota. Normally absorbed by
    /// the fallback before reaching a document record.
    SynthesisQuota,
    /// The speech service rejected our credentials.
    SynthesisAuth,
    /// The speech service's safety filters rejected the content.
    SynthesisSafety,
    /// Transport-level failure talking to the speech service.
    SynthesisNetwork,
    /// The speech service returned no audio payload.
    SynthesisEmpty,
    /// The audio payload could not be decoded.
    Decode,
    /// No storage location has ever been linked.
    StorageNotLinked,
    /// The storage location exists but access is not granted.
    StoragePermissionDenied,
    /// Writing the audio blob failed.
    StorageWrite,
    /// The session ended while the document was still being processed.
    Interrupted,
    /// A `ready` document's audio blob was missing on load.
    AudioMissing,
}

/// One user-visible audio item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,

    /// Display title. Mutable; persisted filenames tolerate title drift.
    pub title: String,

    /// Human-readable status caption shown under the title.
    pub meta: String,

    /// Fractional progress 0–100, monotonic within a phase, reset at phase
    /// boundaries.
    pub progress: f32,

    /// Lifecycle status.
    pub status: DocumentStatus,

    /// Source text. Present from submission for text input; cached after
    /// extraction for file input so a retry never re-extracts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Selected synthesis voice.
    pub voice: VoiceId,

    /// Engine used to render speech for this document.
    #[serde(default)]
    pub voice_engine: VoiceEngine,

    /// Presentational icon identifier derived from the source type.
    pub icon: String,

    /// Human-readable audio size, set once the blob is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_size: Option<String>,

    /// Classified cause of the last failure while status is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl Document {
    /// Terminal success: status `ready` implies progress 100.
    pub fn mark_ready(&mut self) {
        self.status = DocumentStatus::Ready;
        self.progress = 100.0;
        self.failure = None;
    }

    /// Terminal failure: status `error` implies progress 0. The message
    /// becomes the status caption.
    pub fn mark_error(&mut self, kind: FailureKind, message: impl Into<String>) {
        self.status = DocumentStatus::Error;
        self.progress = 0.0;
        self.failure = Some(kind);
        self.meta = message.into();
    }
}

/// Data for creating a new document record.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub content: Option<String>,
    pub voice: VoiceId,
    pub icon: String,
    /// Initial status: `analyzing` when the source needs text extraction,
    /// `generating` otherwise.
    pub status: DocumentStatus,
}

/// Presentational icon identifier for a source MIME type.
#[must_use]
pub fn icon_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "application/pdf" => "picture_as_pdf",
        "application/epub+zip" => "book_2",
        m if m.contains("word") || m.contains("officedocument") => "description",
        _ => "article",
    }
}

/// Format a byte count as a short human-readable size ("156 KB", "2.4 MB").
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let bytes = bytes as f64;
    if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.0} KB", bytes / KB)
    } else {
        format!("{bytes:.0} B")
    }
}
