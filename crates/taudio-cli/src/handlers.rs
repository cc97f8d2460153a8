//! Command handlers - thin glue between the parsed CLI and the pipeline.

use std::path::Path;

use anyhow::{Context, Result, bail};

use taudio_core::domain::document::{Document, DocumentStatus, VoiceEngine};
use taudio_core::domain::voice::{VoiceId, remote_voices};
use taudio_core::ports::store::{AudioStore, PermissionState};
use taudio_speech::pipeline::{SourceInput, SubmitRequest};
use taudio_store::DirectoryStore;

use crate::bootstrap::{App, persist_library_dir};
use crate::commands::{AddArgs, Commands};

/// Dispatch a parsed subcommand.
pub async fn dispatch(app: App, command: Commands) -> Result<()> {
    match command {
        Commands::Add(args) => add(&app, args).await,
        Commands::List => list(&app),
        Commands::Retry { id } => retry(&app, id).await,
        Commands::Delete { id } => delete(&app, id).await,
        Commands::Voices => voices(),
        Commands::Link { directory } => link(&app, &directory).await,
        Commands::Grant => grant(&app).await,
        Commands::Export { id, output } => export(&app, id, &output).await,
    }
}

/// Re-confirm access to a locked storage directory.
///
/// A direct CLI invocation is a user gesture, so prompting/probing here is
/// allowed; background code paths must never call this.
async fn ensure_access(store: &dyn AudioStore) -> Result<()> {
    if store.query_permission() == PermissionState::Locked
        && !store.request_permission().await?
    {
        bail!("audio directory access was denied — check the linked folder or relink with `taudio link`");
    }
    Ok(())
}

async fn add(app: &App, args: AddArgs) -> Result<()> {
    let source = if let Some(path) = &args.file {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        SourceInput::File {
            data,
            mime_type: mime_for_path(path).to_string(),
        }
    } else if let Some(text) = args.text {
        SourceInput::Text(text)
    } else {
        bail!("provide text to speak, or --file <path> to convert a document");
    };

    // Default the title to the file name; plain text gets an inferred title.
    let title = args.title.unwrap_or_else(|| {
        args.file
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    ensure_access(app.store.as_ref()).await?;

    let id = app
        .pipeline
        .submit(SubmitRequest {
            title,
            source,
            voice: VoiceId::new(args.voice),
        })
        .await?;
    app.pipeline.process(id).await;

    report_outcome(app, id)
}

fn list(app: &App) -> Result<()> {
    let documents = app.pipeline.registry().list();
    if documents.is_empty() {
        println!("Library is empty — add something with `taudio add`.");
        return Ok(());
    }

    println!(
        "{:>14}  {:<10}  {:>6}  {:<34}  {}",
        "ID", "STATUS", "PROG", "TITLE", "INFO"
    );
    for doc in documents {
        println!(
            "{:>14}  {:<10}  {:>5.0}%  {:<34}  {}",
            doc.id,
            doc.status.as_str(),
            doc.progress,
            truncate(&doc.title, 34),
            doc.meta,
        );
    }
    Ok(())
}

async fn retry(app: &App, id: i64) -> Result<()> {
    ensure_access(app.store.as_ref()).await?;
    app.pipeline.retry(id).await?;
    report_outcome(app, id)
}

async fn delete(app: &App, id: i64) -> Result<()> {
    app.pipeline.delete(id).await?;
    println!("Deleted {id}.");
    Ok(())
}

fn voices() -> Result<()> {
    for voice in remote_voices() {
        println!("{:<8}  {}", voice.id.as_str(), voice.label);
    }
    Ok(())
}

async fn link(app: &App, directory: &Path) -> Result<()> {
    // Probe the new location before remembering it.
    let store = DirectoryStore::new();
    store.link_new_location(directory).await?;

    persist_library_dir(&app.data_root, directory)?;
    println!("Audio library linked to {}.", directory.display());
    Ok(())
}

async fn grant(app: &App) -> Result<()> {
    match app.store.query_permission() {
        PermissionState::Unlinked => {
            bail!("no audio directory is linked — use `taudio link <dir>` first")
        }
        PermissionState::Granted => {
            println!("Audio directory access is already granted.");
            Ok(())
        }
        PermissionState::Locked => {
            if app.store.request_permission().await? {
                println!("Audio directory access granted.");
                Ok(())
            } else {
                bail!("audio directory access was denied")
            }
        }
    }
}

async fn export(app: &App, id: i64, output: &Path) -> Result<()> {
    let document = app
        .pipeline
        .registry()
        .get(id)
        .with_context(|| format!("no document with id {id}"))?;
    if document.voice_engine == VoiceEngine::System {
        bail!("document {id} uses the system voice; there is no stored audio file");
    }

    ensure_access(app.store.as_ref()).await?;

    match app.store.get(id).await? {
        Some(blob) => {
            tokio::fs::write(output, &blob)
                .await
                .with_context(|| format!("could not write {}", output.display()))?;
            println!("Exported {} ({} bytes).", output.display(), blob.len());
            Ok(())
        }
        // get() cannot distinguish "missing" from "inaccessible"; the
        // permission state can.
        None if app.store.query_permission() != PermissionState::Granted => {
            bail!("audio is inaccessible — grant access with `taudio grant` and retry")
        }
        None => bail!("no audio stored for document {id} — run `taudio retry {id}`"),
    }
}

fn report_outcome(app: &App, id: i64) -> Result<()> {
    let document: Document = app
        .pipeline
        .registry()
        .get(id)
        .context("document disappeared while processing")?;

    match document.status {
        DocumentStatus::Ready => {
            println!("\"{}\" is ready ({}).", document.title, document.meta);
            Ok(())
        }
        _ => bail!("\"{}\": {}", document.title, document.meta),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

/// Best-effort MIME type from a file extension.
fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("epub") => "application/epub+zip",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("txt" | "md") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_titles() {
        assert_eq!(truncate("Moby Dick", 34), "Moby Dick");
    }

    #[test]
    fn truncate_caps_long_titles() {
        let long = "x".repeat(60);
        let shown = truncate(&long, 10);
        assert_eq!(shown.chars().count(), 10);
        assert!(shown.ends_with('…'));
    }

    #[test]
    fn mime_detection_covers_the_common_document_types() {
        assert_eq!(mime_for_path(Path::new("a.pdf")), "application/pdf");
        assert_eq!(mime_for_path(Path::new("b.epub")), "application/epub+zip");
        assert_eq!(mime_for_path(Path::new("c.txt")), "text/plain");
        assert_eq!(mime_for_path(Path::new("d.unknown")), "application/octet-stream");
    }
}
