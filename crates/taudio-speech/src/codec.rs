//! Base64 decoding for the synthesis wire format.
//!
//! The remote call returns its PCM payload base64-encoded (standard
//! alphabet, standard padding). A decode failure means the synthesis
//! response was unusable — it is treated as a failed synthesis, never as a
//! partial result.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Error decoding the synthesis payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload contained invalid characters or padding.
    #[error("malformed base64 audio payload: {0}")]
    MalformedBase64(#[from] base64::DecodeError),
}

/// Decode the base64-encoded PCM payload returned by the synthesis call.
pub fn decode_audio_payload(payload: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(STANDARD.decode(payload)?)
}
