//! Integration tests for the `SpeechPipeline` state machine.
//!
//! These tests drive the pipeline through its transitions using mock
//! speech-client and store backends. No network, filesystem, or real
//! timers are required — the mocks return canned responses.
//!
//! # What is tested
//!
//! - Plain-text submission skips `analyzing` and completes `ready` with a
//!   retrievable blob
//! - Extraction failure reaches `error` without a single synthesis call
//! - Quota exhaustion falls back to the system voice with no persisted blob
//! - A locked store fails the save, and a permission grant plus user retry
//!   recovers without re-running extraction
//! - Long text is chunked and the PCM concatenated in order
//! - Status/progress invariants hold in every terminal state
//! - Deletes tolerate in-flight pipelines and are idempotent

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use taudio_core::domain::document::{Document, DocumentStatus, FailureKind, VoiceEngine};
use taudio_core::domain::voice::VoiceId;
use taudio_core::ports::snapshot::{SnapshotError, SnapshotRepository};
use taudio_core::ports::store::{AudioStore, PermissionState, StoreError};
use taudio_core::ports::synthesis::{SpeechClient, SynthesisError};
use taudio_core::registry::DocumentRegistry;
use taudio_speech::pipeline::{
    PipelineConfig, PipelineEvent, SourceInput, SpeechPipeline, SubmitRequest,
};
use taudio_speech::progress::{LinearRamp, PhaseBounds};
use taudio_speech::wav;

// ── Mock backends ──────────────────────────────────────────────────

/// Snapshot repository that keeps the list in memory.
#[derive(Default)]
struct MemorySnapshot {
    saved: Mutex<Vec<Document>>,
}

#[async_trait]
impl SnapshotRepository for MemorySnapshot {
    async fn load(&self) -> Result<Vec<Document>, SnapshotError> {
        Ok(self.saved.lock().unwrap().clone())
    }

    async fn save(&self, documents: &[Document]) -> Result<(), SnapshotError> {
        *self.saved.lock().unwrap() = documents.to_vec();
        Ok(())
    }
}

/// In-memory audio store with a controllable permission state.
struct MemoryStore {
    blobs: Mutex<HashMap<i64, Vec<u8>>>,
    permission: Mutex<PermissionState>,
}

impl MemoryStore {
    fn new(permission: PermissionState) -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            permission: Mutex::new(permission),
        }
    }

    fn blob(&self, id: i64) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(&id).cloned()
    }

    fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

#[async_trait]
impl AudioStore for MemoryStore {
    async fn save(&self, id: i64, _title: &str, blob: &[u8]) -> Result<(), StoreError> {
        match *self.permission.lock().unwrap() {
            PermissionState::Unlinked => return Err(StoreError::NotLinked),
            PermissionState::Locked => return Err(StoreError::PermissionDenied),
            PermissionState::Granted => {}
        }
        self.blobs.lock().unwrap().insert(id, blob.to_vec());
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<Vec<u8>>, StoreError> {
        if *self.permission.lock().unwrap() != PermissionState::Granted {
            return Ok(None);
        }
        Ok(self.blob(id))
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.blobs.lock().unwrap().remove(&id);
        Ok(())
    }

    fn query_permission(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> Result<bool, StoreError> {
        *self.permission.lock().unwrap() = PermissionState::Granted;
        Ok(true)
    }

    async fn link_new_location(&self, _location: &Path) -> Result<(), StoreError> {
        *self.permission.lock().unwrap() = PermissionState::Granted;
        Ok(())
    }
}

/// Canned PCM payload: two s16le samples.
const PCM_CHUNK: [u8; 4] = [0x01, 0x02, 0x03, 0x04];

/// Speech client with scriptable responses and call counters.
struct MockClient {
    extract_response: Result<String, SynthesisError>,
    title_response: Result<String, SynthesisError>,
    /// Responses consumed per synthesis call; when exhausted, a valid
    /// payload of [`PCM_CHUNK`] is returned.
    synth_responses: Mutex<Vec<Result<String, SynthesisError>>>,
    extract_calls: AtomicUsize,
    synth_calls: AtomicUsize,
    /// Delay before each synthesis response resolves.
    synth_delay: Duration,
}

impl MockClient {
    fn ok() -> Self {
        Self {
            extract_response: Ok("Extracted text from the document.".to_string()),
            title_response: Ok("Inferred Title".to_string()),
            synth_responses: Mutex::new(Vec::new()),
            extract_calls: AtomicUsize::new(0),
            synth_calls: AtomicUsize::new(0),
            synth_delay: Duration::ZERO,
        }
    }

    fn with_extract_error(error: SynthesisError) -> Self {
        Self {
            extract_response: Err(error),
            ..Self::ok()
        }
    }

    fn with_synth_responses(responses: Vec<Result<String, SynthesisError>>) -> Self {
        Self {
            synth_responses: Mutex::new(responses),
            ..Self::ok()
        }
    }
}

#[async_trait]
impl SpeechClient for MockClient {
    async fn extract_text(&self, _data: &[u8], _mime: &str) -> Result<String, SynthesisError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        self.extract_response.clone()
    }

    async fn infer_title(&self, _text: &str) -> Result<String, SynthesisError> {
        self.title_response.clone()
    }

    async fn synthesize(&self, _text: &str, _voice: &VoiceId) -> Result<String, SynthesisError> {
        self.synth_calls.fetch_add(1, Ordering::SeqCst);
        if !self.synth_delay.is_zero() {
            tokio::time::sleep(self.synth_delay).await;
        }
        let mut scripted = self.synth_responses.lock().unwrap();
        if scripted.is_empty() {
            Ok(STANDARD.encode(PCM_CHUNK))
        } else {
            scripted.remove(0)
        }
    }
}

// ── Harness ────────────────────────────────────────────────────────

struct Harness {
    pipeline: Arc<SpeechPipeline>,
    events: tokio::sync::mpsc::UnboundedReceiver<PipelineEvent>,
    store: Arc<MemoryStore>,
    client: Arc<MockClient>,
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        tick_interval: Duration::from_millis(5),
        estimator: Arc::new(LinearRamp {
            ramp: Duration::from_millis(40),
        }),
        ..PipelineConfig::default()
    }
}

fn harness(client: MockClient, permission: PermissionState) -> Harness {
    let registry = Arc::new(DocumentRegistry::empty(Arc::new(MemorySnapshot::default())));
    let store = Arc::new(MemoryStore::new(permission));
    let client = Arc::new(client);

    let (pipeline, events) = SpeechPipeline::new(
        registry,
        Arc::clone(&store) as Arc<dyn AudioStore>,
        Arc::clone(&client) as Arc<dyn SpeechClient>,
        fast_config(),
    );

    Harness {
        pipeline: Arc::new(pipeline),
        events,
        store,
        client,
    }
}

fn text_request(body: &str) -> SubmitRequest {
    SubmitRequest {
        title: "Hello".to_string(),
        source: SourceInput::Text(body.to_string()),
        voice: VoiceId::from("Zephyr"),
    }
}

fn file_request() -> SubmitRequest {
    SubmitRequest {
        title: String::new(),
        source: SourceInput::File {
            data: vec![0x25, 0x50, 0x44, 0x46],
            mime_type: "application/pdf".to_string(),
        },
        voice: VoiceId::from("Kore"),
    }
}

fn drain_events(rx: &mut tokio::sync::mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

fn statuses_from(events: &[PipelineEvent]) -> Vec<DocumentStatus> {
    events
        .iter()
        .filter_map(|e| {
            if let PipelineEvent::StatusChanged { status, .. } = e {
                Some(*status)
            } else {
                None
            }
        })
        .collect()
}

/// Status/progress consistency: `ready ⇒ 100`, `error ⇒ 0`.
fn assert_invariants(doc: &Document) {
    match doc.status {
        DocumentStatus::Ready => assert!((doc.progress - 100.0).abs() < f32::EPSILON),
        DocumentStatus::Error => assert!((doc.progress - 0.0).abs() < f32::EPSILON),
        _ => assert!(doc.progress < 100.0),
    }
}

// ── Scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn plain_text_completes_ready_with_a_persisted_blob() {
    let mut h = harness(MockClient::ok(), PermissionState::Granted);

    let id = h.pipeline.submit(text_request("Hello world")).await.unwrap();
    h.pipeline.process(id).await;

    let doc = h.pipeline.registry().get(id).unwrap();
    assert_eq!(doc.status, DocumentStatus::Ready);
    assert_invariants(&doc);
    assert_eq!(doc.voice_engine, VoiceEngine::Remote);
    assert!(doc.audio_size.is_some());

    // No extraction happened for plain text.
    assert_eq!(h.client.extract_calls.load(Ordering::SeqCst), 0);

    // The blob is a WAV container whose payload is the mock PCM.
    let blob = h.store.blob(id).unwrap();
    assert_eq!(wav::payload(&blob), Some(PCM_CHUNK.as_slice()));

    let statuses = statuses_from(&drain_events(&mut h.events));
    assert_eq!(
        statuses,
        vec![DocumentStatus::Generating, DocumentStatus::Ready]
    );
}

#[tokio::test]
async fn extraction_failure_reaches_error_without_synthesis() {
    let mut h = harness(
        MockClient::with_extract_error(SynthesisError::Network("boom".to_string())),
        PermissionState::Granted,
    );

    let id = h.pipeline.submit(file_request()).await.unwrap();
    h.pipeline.process(id).await;

    let doc = h.pipeline.registry().get(id).unwrap();
    assert_eq!(doc.status, DocumentStatus::Error);
    assert_invariants(&doc);
    assert_eq!(doc.failure, Some(FailureKind::Extraction));
    assert_eq!(h.client.synth_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.blob_count(), 0);

    let events = drain_events(&mut h.events);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Failed { .. }))
    );
}

#[tokio::test]
async fn file_submission_extracts_titles_and_completes() {
    let mut h = harness(MockClient::ok(), PermissionState::Granted);

    let id = h.pipeline.submit(file_request()).await.unwrap();
    h.pipeline.process(id).await;

    let doc = h.pipeline.registry().get(id).unwrap();
    assert_eq!(doc.status, DocumentStatus::Ready);
    assert_eq!(doc.title, "Inferred Title");
    assert_eq!(doc.icon, "picture_as_pdf");
    assert_eq!(
        doc.content.as_deref(),
        Some("Extracted text from the document.")
    );
    assert_eq!(h.client.extract_calls.load(Ordering::SeqCst), 1);

    let statuses = statuses_from(&drain_events(&mut h.events));
    assert_eq!(
        statuses,
        vec![
            DocumentStatus::Analyzing,
            DocumentStatus::Generating,
            DocumentStatus::Ready
        ]
    );
}

#[tokio::test]
async fn quota_exhaustion_falls_back_to_the_system_voice() {
    let mut h = harness(
        MockClient::with_synth_responses(vec![Err(SynthesisError::Quota)]),
        PermissionState::Granted,
    );

    let id = h.pipeline.submit(text_request("Hello world")).await.unwrap();
    h.pipeline.process(id).await;

    let doc = h.pipeline.registry().get(id).unwrap();
    assert_eq!(doc.status, DocumentStatus::Ready);
    assert_invariants(&doc);
    assert_eq!(doc.voice_engine, VoiceEngine::System);
    assert!(doc.failure.is_none());

    // Nothing was persisted — playback goes through the system engine.
    assert_eq!(h.store.blob_count(), 0);

    let events = drain_events(&mut h.events);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PipelineEvent::EngineFallback { .. }))
    );
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Failed { .. }))
    );
}

#[tokio::test]
async fn other_synthesis_failures_surface_as_errors() {
    let mut h = harness(
        MockClient::with_synth_responses(vec![Err(SynthesisError::Auth)]),
        PermissionState::Granted,
    );

    let id = h.pipeline.submit(text_request("Hello world")).await.unwrap();
    h.pipeline.process(id).await;

    let doc = h.pipeline.registry().get(id).unwrap();
    assert_eq!(doc.status, DocumentStatus::Error);
    assert_eq!(doc.failure, Some(FailureKind::SynthesisAuth));
    assert_eq!(doc.voice_engine, VoiceEngine::Remote);

    let events = drain_events(&mut h.events);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Failed { kind, .. } if *kind == FailureKind::SynthesisAuth))
    );
}

#[tokio::test]
async fn malformed_payload_is_a_decode_failure_not_a_partial_result() {
    let h = harness(
        MockClient::with_synth_responses(vec![Ok("n0t/base64!!".to_string())]),
        PermissionState::Granted,
    );

    let id = h.pipeline.submit(text_request("Hello world")).await.unwrap();
    h.pipeline.process(id).await;

    let doc = h.pipeline.registry().get(id).unwrap();
    assert_eq!(doc.status, DocumentStatus::Error);
    assert_eq!(doc.failure, Some(FailureKind::Decode));
    assert_eq!(h.store.blob_count(), 0);
}

#[tokio::test]
async fn locked_store_fails_then_grant_and_retry_recover() {
    let mut h = harness(MockClient::ok(), PermissionState::Locked);

    let id = h.pipeline.submit(text_request("Hello world")).await.unwrap();
    h.pipeline.process(id).await;

    let doc = h.pipeline.registry().get(id).unwrap();
    assert_eq!(doc.status, DocumentStatus::Error);
    assert_eq!(doc.failure, Some(FailureKind::StoragePermissionDenied));
    assert_invariants(&doc);

    // User grants access and retries; synthesis reruns, persistence works.
    assert!(h.store.request_permission().await.unwrap());
    h.pipeline.retry(id).await.unwrap();

    let doc = h.pipeline.registry().get(id).unwrap();
    assert_eq!(doc.status, DocumentStatus::Ready);
    assert_invariants(&doc);
    assert!(h.store.blob(id).is_some());

    let statuses = statuses_from(&drain_events(&mut h.events));
    assert!(statuses.ends_with(&[DocumentStatus::Generating, DocumentStatus::Ready]));
}

#[tokio::test]
async fn retry_does_not_repeat_a_cached_extraction() {
    let h = harness(
        MockClient::with_synth_responses(vec![Err(SynthesisError::Network("flaky".to_string()))]),
        PermissionState::Granted,
    );

    let id = h.pipeline.submit(file_request()).await.unwrap();
    h.pipeline.process(id).await;
    assert_eq!(
        h.pipeline.registry().get(id).unwrap().status,
        DocumentStatus::Error
    );
    assert_eq!(h.client.extract_calls.load(Ordering::SeqCst), 1);

    // The scripted failure is consumed; the retry synthesizes fine.
    h.pipeline.retry(id).await.unwrap();

    assert_eq!(
        h.pipeline.registry().get(id).unwrap().status,
        DocumentStatus::Ready
    );
    assert_eq!(
        h.client.extract_calls.load(Ordering::SeqCst),
        1,
        "extraction must not rerun once cached"
    );
}

#[tokio::test]
async fn retry_requires_the_error_status() {
    let h = harness(MockClient::ok(), PermissionState::Granted);

    let id = h.pipeline.submit(text_request("Hello world")).await.unwrap();
    h.pipeline.process(id).await;

    let err = h.pipeline.retry(id).await.unwrap_err();
    assert!(matches!(
        err,
        taudio_speech::RetryError::NotRetryable(doc_id) if doc_id == id
    ));

    let err = h.pipeline.retry(9_999).await.unwrap_err();
    assert!(matches!(err, taudio_speech::RetryError::NotFound(_)));
}

#[tokio::test]
async fn long_text_is_chunked_and_concatenated_in_order() {
    let h = harness(MockClient::ok(), PermissionState::Granted);

    // Three sentences of ~2700 chars each force multiple chunks.
    let body = "word ".repeat(540).trim_end().to_string() + ". ";
    let body = body.repeat(3);
    let id = h.pipeline.submit(text_request(&body)).await.unwrap();
    h.pipeline.process(id).await;

    let calls = h.client.synth_calls.load(Ordering::SeqCst);
    assert!(calls > 1, "expected chunked synthesis, got {calls} call(s)");

    let blob = h.store.blob(id).unwrap();
    let payload = wav::payload(&blob).unwrap();
    assert_eq!(payload.len(), PCM_CHUNK.len() * calls);
    for piece in payload.chunks(PCM_CHUNK.len()) {
        assert_eq!(piece, PCM_CHUNK);
    }
}

#[tokio::test]
async fn empty_submission_is_rejected_before_synthesis() {
    let h = harness(MockClient::ok(), PermissionState::Granted);

    let id = h.pipeline.submit(text_request("   ")).await.unwrap();
    h.pipeline.process(id).await;

    let doc = h.pipeline.registry().get(id).unwrap();
    assert_eq!(doc.status, DocumentStatus::Error);
    assert_eq!(h.client.synth_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn delete_is_idempotent_and_tolerates_in_flight_pipelines() {
    let h = harness(MockClient::ok(), PermissionState::Granted);

    let id = h.pipeline.submit(text_request("Hello world")).await.unwrap();
    h.pipeline.process(id).await;
    assert!(h.store.blob(id).is_some());

    h.pipeline.delete(id).await.unwrap();
    h.pipeline.delete(id).await.unwrap();
    assert!(h.store.blob(id).is_none());
    assert!(h.pipeline.registry().get(id).is_none());

    // Deleting before processing: the pipeline's updates become no-ops.
    let id = h.pipeline.submit(text_request("Hello again")).await.unwrap();
    h.pipeline.delete(id).await.unwrap();
    h.pipeline.process(id).await;
    assert!(h.pipeline.registry().get(id).is_none());
}

#[tokio::test]
async fn progress_simulates_monotonically_and_stays_below_100_mid_phase() {
    let client = MockClient {
        synth_delay: Duration::from_millis(80),
        ..MockClient::ok()
    };
    let h = harness(client, PermissionState::Granted);

    let id = h.pipeline.submit(text_request("Hello world")).await.unwrap();
    let worker = tokio::spawn({
        let pipeline = Arc::clone(&h.pipeline);
        async move { pipeline.process(id).await }
    });

    let mut samples = Vec::new();
    loop {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let Some(doc) = h.pipeline.registry().get(id) else {
            break;
        };
        if doc.status != DocumentStatus::Generating {
            break;
        }
        assert!(doc.progress < 100.0, "simulated progress must stay below 100");
        samples.push(doc.progress);
    }
    worker.await.unwrap();

    assert!(samples.len() >= 2, "expected to observe the phase in flight");
    for pair in samples.windows(2) {
        assert!(pair[1] >= pair[0], "progress moved backwards: {pair:?}");
    }

    let doc = h.pipeline.registry().get(id).unwrap();
    assert_eq!(doc.status, DocumentStatus::Ready);
    assert_invariants(&doc);
}

#[tokio::test]
async fn a_stale_ticker_never_touches_a_later_state() {
    use taudio_speech::progress::ProgressTicker;

    let h = harness(MockClient::ok(), PermissionState::Granted);
    let id = h.pipeline.submit(text_request("Hello world")).await.unwrap();
    h.pipeline.process(id).await;
    assert_eq!(
        h.pipeline.registry().get(id).unwrap().status,
        DocumentStatus::Ready
    );

    // A ticker armed for a phase the document is no longer in must be a
    // no-op even while it runs.
    let ticker = ProgressTicker::start(
        Arc::clone(h.pipeline.registry()),
        id,
        DocumentStatus::Generating,
        PhaseBounds {
            floor: 10.0,
            cap: 97.0,
        },
        Arc::new(LinearRamp {
            ramp: Duration::from_millis(10),
        }),
        Duration::from_millis(5),
    );
    tokio::time::sleep(Duration::from_millis(40)).await;
    drop(ticker);

    let doc = h.pipeline.registry().get(id).unwrap();
    assert_eq!(doc.status, DocumentStatus::Ready);
    assert!((doc.progress - 100.0).abs() < f32::EPSILON);
}
