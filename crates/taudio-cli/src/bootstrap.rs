//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together for
//! the CLI adapter:
//! - Database pool and repositories (via taudio-store)
//! - Audio store backend selection (linked directory vs embedded database)
//! - The HTTP speech client (via taudio-speech)
//! - Registry load and startup reconciliation
//!
//! Command handlers receive the fully-composed [`App`] and delegate to it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use taudio_core::{AudioStore, DocumentRegistry, SpeechClient};
use taudio_speech::pipeline::{PipelineConfig, PipelineEvent, SpeechPipeline};
use taudio_speech::remote::{HttpSpeechClient, HttpSpeechClientConfig};
use taudio_store::{DirectoryStore, SqliteBlobStore, SqliteSnapshotRepository, setup_database};

/// File under the data root remembering the linked audio directory.
const LIBRARY_LINK_FILE: &str = "library_dir";

/// Fully composed application context for CLI commands.
pub struct App {
    pub pipeline: Arc<SpeechPipeline>,
    pub store: Arc<dyn AudioStore>,
    pub data_root: PathBuf,
}

/// Resolve the application data root.
pub fn data_root() -> Result<PathBuf> {
    Ok(dirs::data_dir()
        .context("no data directory available on this platform")?
        .join("taudio"))
}

/// Remember a linked audio directory for future sessions.
pub fn persist_library_dir(data_root: &Path, directory: &Path) -> Result<()> {
    std::fs::create_dir_all(data_root)?;
    std::fs::write(
        data_root.join(LIBRARY_LINK_FILE),
        directory.display().to_string(),
    )?;
    Ok(())
}

fn load_library_dir(data_root: &Path) -> Option<PathBuf> {
    let raw = std::fs::read_to_string(data_root.join(LIBRARY_LINK_FILE)).ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// Wire up storage, registry, client, and pipeline.
pub async fn bootstrap(timeout: Option<Duration>) -> Result<App> {
    let data_root = data_root()?;
    let pool = setup_database(&data_root.join("taudio.db")).await?;

    let snapshot = Arc::new(SqliteSnapshotRepository::new(pool.clone()));
    let registry = Arc::new(DocumentRegistry::load(snapshot).await?);

    // A directory linked in an earlier session starts locked; access is
    // re-confirmed by the first command that needs it. Without a link the
    // embedded blob store is used.
    let store: Arc<dyn AudioStore> = match load_library_dir(&data_root) {
        Some(directory) => {
            tracing::debug!(directory = %directory.display(), "using linked audio directory");
            Arc::new(DirectoryStore::with_location(directory))
        }
        None => Arc::new(SqliteBlobStore::new(pool)),
    };

    registry.reconcile(store.as_ref()).await?;

    let client: Arc<dyn SpeechClient> = Arc::new(HttpSpeechClient::new(HttpSpeechClientConfig {
        base_url: std::env::var("TAUDIO_SPEECH_URL")
            .unwrap_or_else(|_| "https://api.taudio.app".to_string()),
        api_key: std::env::var("TAUDIO_API_KEY").unwrap_or_default(),
        timeout,
    }));

    let (pipeline, events) = SpeechPipeline::new(
        Arc::clone(&registry),
        Arc::clone(&store),
        client,
        PipelineConfig::default(),
    );

    spawn_event_printer(events);

    Ok(App {
        pipeline: Arc::new(pipeline),
        store,
        data_root,
    })
}

/// Print pipeline events as they happen, so long conversions show their
/// phase transitions on the terminal.
fn spawn_event_printer(mut events: tokio::sync::mpsc::UnboundedReceiver<PipelineEvent>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                PipelineEvent::StatusChanged { id, status } => {
                    println!("  [{id}] {status}");
                }
                PipelineEvent::EngineFallback { id } => {
                    println!("  [{id}] quota exhausted — switched to the system voice");
                }
                PipelineEvent::Failed { id, message, .. } => {
                    println!("  [{id}] failed: {message}");
                }
                PipelineEvent::Completed { .. } => {}
            }
        }
    });
}
