//! Synthesis pipeline — drives a document from submission to replayable
//! audio.
//!
//! ```text
//!   (new) ──► analyzing ──► generating ──► ready
//!                │               │
//!                ▼               ▼
//!              error ◄───────────┘      (user retry re-enters the phase)
//! ```
//!
//! One pipeline task owns one document at a time; documents in flight
//! concurrently are independent tasks sharing only the
//! [`DocumentRegistry`], whose updates are replace-by-id. The pipeline
//! mutates the shared record, emits [`PipelineEvent`]s for the application
//! layer, and absorbs every failure at its boundary into the document's
//! `error` status — [`process`](SpeechPipeline::process) never carries an
//! error out.
//!
//! Remote failures are classified ([`SynthesisError`]); a quota failure on
//! synthesis is special-cased into a silent fallback: the document switches
//! to the on-device system voice, completes `ready`, and persists no blob.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use taudio_core::DocumentRegistry;
use taudio_core::domain::document::{
    DocumentId, DocumentStatus, FailureKind, NewDocument, VoiceEngine, format_size, icon_for_mime,
};
use taudio_core::domain::voice::VoiceId;
use taudio_core::ports::store::AudioStore;
use taudio_core::ports::synthesis::{SpeechClient, SynthesisError};

use crate::codec;
use crate::error::{PipelineError, RetryError};
use crate::progress::{LinearRamp, PhaseBounds, ProgressEstimator, ProgressTicker};
use crate::text;
use crate::wav;

// ── Submission input ───────────────────────────────────────────────

/// Source material for a new document.
#[derive(Debug, Clone)]
pub enum SourceInput {
    /// Freeform text pasted or typed by the user.
    Text(String),

    /// An uploaded file that needs text extraction first.
    File { data: Vec<u8>, mime_type: String },
}

/// A user submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Display title; leave empty to let the pipeline infer one.
    pub title: String,

    /// The material to speak.
    pub source: SourceInput,

    /// Synthesis voice for the remote engine.
    pub voice: VoiceId,
}

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted by the pipeline for the application layer.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The document entered a new lifecycle status.
    StatusChanged {
        id: DocumentId,
        status: DocumentStatus,
    },

    /// The document reached `ready`.
    Completed { id: DocumentId },

    /// The document reached `error`.
    Failed {
        id: DocumentId,
        kind: FailureKind,
        message: String,
    },

    /// Synthesis quota was exhausted; the document switched to the system
    /// voice engine and completed without a persisted blob.
    EngineFallback { id: DocumentId },
}

// ── Configuration ──────────────────────────────────────────────────

/// Tunables for the pipeline.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Sample rate of the synthesis payload.
    pub sample_rate: u32,

    /// Progress bounds while extracting/titling.
    pub analyzing: PhaseBounds,

    /// Progress bounds while synthesizing and persisting.
    pub generating: PhaseBounds,

    /// Interval between simulated progress updates.
    pub tick_interval: Duration,

    /// Estimator driving the progress simulation.
    pub estimator: Arc<dyn ProgressEstimator>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: wav::DEFAULT_SAMPLE_RATE,
            analyzing: PhaseBounds {
                floor: 5.0,
                cap: 95.0,
            },
            generating: PhaseBounds {
                floor: 10.0,
                cap: 97.0,
            },
            tick_interval: Duration::from_millis(350),
            estimator: Arc::new(LinearRamp::default()),
        }
    }
}

// ── Pipeline ───────────────────────────────────────────────────────

/// The synthesis orchestrator.
pub struct SpeechPipeline {
    registry: Arc<DocumentRegistry>,
    store: Arc<dyn AudioStore>,
    client: Arc<dyn SpeechClient>,
    config: PipelineConfig,
    event_tx: mpsc::UnboundedSender<PipelineEvent>,

    /// Raw source material kept for retry within this session. Extracted
    /// text is cached on the document record instead and takes precedence.
    sources: Mutex<HashMap<DocumentId, SourceInput>>,
}

impl SpeechPipeline {
    /// Create a new pipeline.
    ///
    /// Returns the pipeline and a receiver for [`PipelineEvent`]s.
    #[must_use]
    pub fn new(
        registry: Arc<DocumentRegistry>,
        store: Arc<dyn AudioStore>,
        client: Arc<dyn SpeechClient>,
        config: PipelineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let pipeline = Self {
            registry,
            store,
            client,
            config,
            event_tx,
            sources: Mutex::new(HashMap::new()),
        };
        (pipeline, event_rx)
    }

    /// The registry this pipeline updates.
    #[must_use]
    pub fn registry(&self) -> &Arc<DocumentRegistry> {
        &self.registry
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Create the document record for a submission and remember its source.
    ///
    /// The record starts in `analyzing` when the source needs extraction and
    /// `generating` otherwise. Processing is a separate step
    /// ([`process`](Self::process)) so the caller can run it as its own
    /// task.
    pub async fn submit(&self, request: SubmitRequest) -> Result<DocumentId, PipelineError> {
        let (content, icon, needs_extraction) = match &request.source {
            SourceInput::Text(body) => (Some(body.clone()), icon_for_mime("text/plain"), false),
            SourceInput::File { mime_type, .. } => (None, icon_for_mime(mime_type), true),
        };

        let title = if request.title.trim().is_empty() {
            // Untitled text gets a local title immediately; untitled files
            // are titled during the analyzing phase, once there is text.
            content.as_deref().map(text::derive_title).unwrap_or_default()
        } else {
            request.title.trim().to_string()
        };

        let document = self
            .registry
            .create(NewDocument {
                title,
                content,
                voice: request.voice,
                icon: icon.to_string(),
                status: if needs_extraction {
                    DocumentStatus::Analyzing
                } else {
                    DocumentStatus::Generating
                },
            })
            .await?;

        self.sources
            .lock()
            .unwrap()
            .insert(document.id, request.source);

        Ok(document.id)
    }

    /// Drive a document to a terminal state.
    ///
    /// Every pipeline failure is absorbed here into the document's `error`
    /// status; the future resolves without an error either way.
    pub async fn process(&self, id: DocumentId) {
        if let Err(e) = self.run(id).await {
            self.fail(id, &e).await;
        }
    }

    /// Re-enter the pipeline for a document in the `error` status, replaying
    /// the stored source. Extraction is not repeated when text is already
    /// cached on the record.
    pub async fn retry(&self, id: DocumentId) -> Result<(), RetryError> {
        let document = self.registry.get(id).ok_or(RetryError::NotFound(id))?;
        if document.status != DocumentStatus::Error {
            return Err(RetryError::NotRetryable(id));
        }

        tracing::info!(id, "retrying document");
        self.process(id).await;
        Ok(())
    }

    /// Remove a document and its persisted audio. Safe to call while the
    /// document's pipeline is still running — the task's final update then
    /// becomes a no-op.
    pub async fn delete(&self, id: DocumentId) -> Result<(), PipelineError> {
        self.sources.lock().unwrap().remove(&id);
        self.store.delete(id).await?;
        self.registry.remove(id).await?;
        Ok(())
    }

    // ── Phases ─────────────────────────────────────────────────────

    async fn run(&self, id: DocumentId) -> Result<(), PipelineError> {
        let Some(document) = self.registry.get(id) else {
            tracing::warn!(id, "process called for a document that no longer exists");
            return Ok(());
        };

        let mut title = document.title.clone();

        // Phase: analyzing. Skipped entirely when text is already available
        // (plain submissions, or a retry after a successful extraction).
        let body = if let Some(content) = document.content {
            content
        } else {
            let source = self.sources.lock().unwrap().get(&id).cloned();
            let Some(SourceInput::File { data, mime_type }) = source else {
                return Err(PipelineError::EmptyText);
            };

            let extracted = self.analyze(id, &data, &mime_type, &mut title).await?;
            self.registry
                .update(id, |doc| {
                    doc.content = Some(extracted.clone());
                    doc.title = title.clone();
                    doc.progress = 100.0;
                })
                .await?;
            extracted
        };

        // Phase: generating.
        self.enter_phase(id, DocumentStatus::Generating, self.config.generating, "Generating audio")
            .await?;
        let ticker = self.start_ticker(id, DocumentStatus::Generating, self.config.generating);

        let chunks = text::chunk_text(&body);
        if chunks.is_empty() {
            return Err(PipelineError::EmptyText);
        }

        let mut pcm: Vec<u8> = Vec::new();
        for (index, chunk) in chunks.iter().enumerate() {
            match self.client.synthesize(chunk, &document.voice).await {
                Ok(payload) => {
                    let bytes = codec::decode_audio_payload(&payload)?;
                    tracing::debug!(
                        id,
                        chunk = index + 1,
                        total = chunks.len(),
                        bytes = bytes.len(),
                        "synthesized chunk"
                    );
                    pcm.extend_from_slice(&bytes);
                }
                Err(SynthesisError::Quota) => {
                    drop(ticker);
                    return self.fallback_to_system_voice(id).await;
                }
                Err(e) => return Err(PipelineError::Synthesis(e)),
            }
        }

        if pcm.is_empty() {
            return Err(PipelineError::Synthesis(SynthesisError::Empty));
        }

        let blob = wav::encode(&pcm, self.config.sample_rate);
        self.store.save(id, &title, &blob).await?;
        drop(ticker);

        let size = format_size(blob.len() as u64);
        let updated = self
            .registry
            .update(id, |doc| {
                doc.mark_ready();
                doc.audio_size = Some(size.clone());
                doc.meta = format!("{size} • Ready");
            })
            .await?;

        if updated.is_some() {
            tracing::info!(id, size = %size, "document ready");
            self.emit(PipelineEvent::StatusChanged {
                id,
                status: DocumentStatus::Ready,
            });
            self.emit(PipelineEvent::Completed { id });
        } else {
            tracing::debug!(id, "document removed mid-pipeline; completion dropped");
        }
        Ok(())
    }

    /// Extraction plus best-effort title inference for file sources.
    async fn analyze(
        &self,
        id: DocumentId,
        data: &[u8],
        mime_type: &str,
        title: &mut String,
    ) -> Result<String, PipelineError> {
        self.enter_phase(id, DocumentStatus::Analyzing, self.config.analyzing, "Extracting text")
            .await?;
        let _ticker = self.start_ticker(id, DocumentStatus::Analyzing, self.config.analyzing);

        let extracted = self
            .client
            .extract_text(data, mime_type)
            .await
            .map_err(PipelineError::Extraction)?;
        if extracted.trim().is_empty() {
            return Err(PipelineError::EmptyText);
        }

        // Title inference is best-effort: a failure falls back to a local
        // heuristic instead of failing the document.
        if title.trim().is_empty() {
            *title = match self.client.infer_title(&extracted).await {
                Ok(inferred) if !inferred.trim().is_empty() => inferred.trim().to_string(),
                Ok(_) => text::derive_title(&extracted),
                Err(e) => {
                    tracing::debug!(id, error = %e, "title inference failed; deriving locally");
                    text::derive_title(&extracted)
                }
            };
        }

        Ok(extracted)
    }

    /// Quota exhaustion on the remote engine: complete the document with the
    /// on-device system voice instead of surfacing an error. No blob is
    /// persisted — playback renders through the system engine directly.
    async fn fallback_to_system_voice(&self, id: DocumentId) -> Result<(), PipelineError> {
        tracing::info!(id, "synthesis quota exhausted; switching to system voice");

        let updated = self
            .registry
            .update(id, |doc| {
                doc.voice_engine = VoiceEngine::System;
                doc.mark_ready();
                doc.audio_size = None;
                doc.meta = "System voice • Ready".to_string();
            })
            .await?;

        if updated.is_some() {
            self.emit(PipelineEvent::EngineFallback { id });
            self.emit(PipelineEvent::StatusChanged {
                id,
                status: DocumentStatus::Ready,
            });
            self.emit(PipelineEvent::Completed { id });
        }
        Ok(())
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Enter a phase: set status, reset progress to the phase floor, update
    /// the caption, and announce the transition.
    async fn enter_phase(
        &self,
        id: DocumentId,
        status: DocumentStatus,
        bounds: PhaseBounds,
        caption: &str,
    ) -> Result<(), PipelineError> {
        let updated = self
            .registry
            .update(id, |doc| {
                doc.status = status;
                doc.progress = bounds.floor;
                doc.meta = caption.to_string();
                doc.failure = None;
            })
            .await?;

        if updated.is_some() {
            tracing::debug!(id, status = %status, "phase entered");
            self.emit(PipelineEvent::StatusChanged { id, status });
        }
        Ok(())
    }

    fn start_ticker(
        &self,
        id: DocumentId,
        phase: DocumentStatus,
        bounds: PhaseBounds,
    ) -> ProgressTicker {
        ProgressTicker::start(
            Arc::clone(&self.registry),
            id,
            phase,
            bounds,
            Arc::clone(&self.config.estimator),
            self.config.tick_interval,
        )
    }

    /// Absorb a pipeline failure into the document's terminal error state.
    async fn fail(&self, id: DocumentId, error: &PipelineError) {
        let kind = error.failure_kind();
        let message = error.user_message();
        tracing::warn!(id, error = %error, ?kind, "pipeline failed");

        match self
            .registry
            .update(id, {
                let message = message.clone();
                move |doc| doc.mark_error(kind, message)
            })
            .await
        {
            Ok(Some(_)) => {
                self.emit(PipelineEvent::StatusChanged {
                    id,
                    status: DocumentStatus::Error,
                });
                self.emit(PipelineEvent::Failed { id, kind, message });
            }
            Ok(None) => tracing::debug!(id, "failure for a removed document ignored"),
            Err(e) => tracing::error!(id, error = %e, "could not record pipeline failure"),
        }
    }

    /// Emit a pipeline event (best-effort — a dropped receiver is logged and
    /// ignored).
    fn emit(&self, event: PipelineEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::warn!("pipeline event receiver dropped");
        }
    }
}
