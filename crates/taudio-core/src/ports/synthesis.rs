//! Remote speech service port — extraction, titling, and synthesis.
//!
//! The remote endpoint is an external collaborator: an opaque async call
//! that returns text or a base64 payload, or a classified error. Everything
//! the pipeline decides — retry, user-visible failure, silent engine
//! fallback — hangs off the [`SynthesisError`] classification.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::voice::VoiceId;

/// Classified failure of a remote speech service call.
///
/// Each kind maps to a distinct user-facing message. `Quota` on a synthesis
/// call is special: it triggers the silent system-voice fallback instead of
/// surfacing an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    /// Usage quota or rate limit exceeded.
    #[error("speech service quota exceeded")]
    Quota,

    /// Authentication or permission rejected by the service.
    #[error("speech service rejected the credentials")]
    Auth,

    /// Content rejected by the service's safety filters.
    #[error("content rejected by safety filters")]
    Safety,

    /// Transport-level failure (DNS, connection, timeout, 5xx).
    #[error("network error talking to the speech service: {0}")]
    Network(String),

    /// The call succeeded but carried no usable payload.
    #[error("the speech service returned an empty response")]
    Empty,
}

/// Port for the remote text/speech generation service.
#[async_trait]
pub trait SpeechClient: Send + Sync {
    /// Extract readable text from a binary document.
    async fn extract_text(&self, data: &[u8], mime_type: &str) -> Result<String, SynthesisError>;

    /// Infer a short display title for a piece of text.
    async fn infer_title(&self, text: &str) -> Result<String, SynthesisError>;

    /// Synthesize speech for one chunk of plain text.
    ///
    /// Returns the base64-encoded raw PCM payload (s16le mono, 24 kHz by
    /// convention). Inputs are limited to a few thousand characters; long
    /// documents are chunked by the caller.
    async fn synthesize(&self, text: &str, voice: &VoiceId) -> Result<String, SynthesisError>;
}
