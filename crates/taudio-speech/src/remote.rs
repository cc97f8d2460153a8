//! HTTP implementation of the `SpeechClient` trait.
//!
//! Talks to a remote generate/synthesize endpoint over JSON. The service
//! itself is an external collaborator — all this module owns is the wire
//! shape and the mapping from HTTP failures to the classified
//! [`SynthesisError`] kinds the pipeline branches on.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use taudio_core::domain::voice::VoiceId;
use taudio_core::ports::synthesis::{SpeechClient, SynthesisError};

const EXTRACT_PROMPT: &str =
    "Extract all text from this document. Return only the full transcription, without preamble.";

const TITLE_PROMPT: &str =
    "Suggest a short title of a few words for this text. Return only the title.";

/// How much of a document the title-inference request carries.
const TITLE_SAMPLE_CHARS: usize = 2_000;

/// Configuration for [`HttpSpeechClient`].
#[derive(Debug, Clone)]
pub struct HttpSpeechClientConfig {
    /// Base URL of the speech service.
    pub base_url: String,

    /// Bearer token for the service.
    pub api_key: String,

    /// Optional per-call deadline. Off by default: the upstream service has
    /// no documented latency bound, so the cutoff is an operator decision.
    /// When it fires the call is classified as a network failure.
    pub timeout: Option<Duration>,
}

/// HTTP implementation of the `SpeechClient` trait.
pub struct HttpSpeechClient {
    client: reqwest::Client,
    config: HttpSpeechClientConfig,
}

// ── Wire shapes ────────────────────────────────────────────────────

#[derive(Serialize)]
struct ExtractRequest<'a> {
    data: &'a str,
    mime_type: &'a str,
    prompt: &'a str,
}

#[derive(Serialize)]
struct TitleRequest<'a> {
    text: &'a str,
    prompt: &'a str,
}

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

#[derive(Deserialize)]
struct TextResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct AudioResponse {
    audio: Option<AudioPayload>,
}

#[derive(Deserialize)]
struct AudioPayload {
    /// Base64-encoded raw PCM (s16le mono 24 kHz).
    data: String,
}

impl HttpSpeechClient {
    /// Create a client from its configuration.
    #[must_use]
    pub fn new(config: HttpSpeechClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn execute<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp, SynthesisError>
    where
        Req: Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{path}", self.config.base_url.trim_end_matches('/'));

        let send = async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(request)
                .send()
                .await
                .map_err(|e| SynthesisError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_http_failure(status, &body));
            }

            response
                .json::<Resp>()
                .await
                .map_err(|e| SynthesisError::Network(e.to_string()))
        };

        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| SynthesisError::Network("request timed out".to_string()))?,
            None => send.await,
        }
    }
}

#[async_trait]
impl SpeechClient for HttpSpeechClient {
    async fn extract_text(&self, data: &[u8], mime_type: &str) -> Result<String, SynthesisError> {
        let encoded = STANDARD.encode(data);
        let response: TextResponse = self
            .execute(
                "v1/extract",
                &ExtractRequest {
                    data: &encoded,
                    mime_type,
                    prompt: EXTRACT_PROMPT,
                },
            )
            .await?;

        response
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(SynthesisError::Empty)
    }

    async fn infer_title(&self, text: &str) -> Result<String, SynthesisError> {
        let sample: String = text.chars().take(TITLE_SAMPLE_CHARS).collect();
        let response: TextResponse = self
            .execute(
                "v1/title",
                &TitleRequest {
                    text: &sample,
                    prompt: TITLE_PROMPT,
                },
            )
            .await?;

        response
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(SynthesisError::Empty)
    }

    async fn synthesize(&self, text: &str, voice: &VoiceId) -> Result<String, SynthesisError> {
        let response: AudioResponse = self
            .execute(
                "v1/synthesize",
                &SynthesizeRequest {
                    text,
                    voice: voice.as_str(),
                },
            )
            .await?;

        response
            .audio
            .map(|payload| payload.data)
            .filter(|data| !data.is_empty())
            .ok_or(SynthesisError::Empty)
    }
}

/// Map an HTTP failure onto the classified error kinds.
fn classify_http_failure(status: StatusCode, body: &str) -> SynthesisError {
    match status.as_u16() {
        429 => SynthesisError::Quota,
        401 | 403 => SynthesisError::Auth,
        400 | 422 => {
            let body = body.to_ascii_lowercase();
            if body.contains("safety") || body.contains("blocked") {
                SynthesisError::Safety
            } else {
                SynthesisError::Network(format!("HTTP {status}"))
            }
        }
        _ => SynthesisError::Network(format!("HTTP {status}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_and_auth_statuses_classify_directly() {
        assert_eq!(
            classify_http_failure(StatusCode::TOO_MANY_REQUESTS, ""),
            SynthesisError::Quota
        );
        assert_eq!(
            classify_http_failure(StatusCode::UNAUTHORIZED, ""),
            SynthesisError::Auth
        );
        assert_eq!(
            classify_http_failure(StatusCode::FORBIDDEN, ""),
            SynthesisError::Auth
        );
    }

    #[test]
    fn safety_rejections_are_detected_in_the_body() {
        let err = classify_http_failure(
            StatusCode::BAD_REQUEST,
            r#"{"error": "prompt blocked by SAFETY policy"}"#,
        );
        assert_eq!(err, SynthesisError::Safety);
    }

    #[test]
    fn other_failures_are_network_errors() {
        assert!(matches!(
            classify_http_failure(StatusCode::INTERNAL_SERVER_ERROR, ""),
            SynthesisError::Network(_)
        ));
        assert!(matches!(
            classify_http_failure(StatusCode::BAD_REQUEST, "malformed"),
            SynthesisError::Network(_)
        ));
    }
}
