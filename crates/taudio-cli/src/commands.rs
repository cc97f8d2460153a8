//! Subcommand definitions for the taudio CLI.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use taudio_core::DEFAULT_VOICE;

/// All taudio subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Convert text or a document file to audio
    Add(AddArgs),

    /// List the documents in the library
    List,

    /// Retry a failed document
    Retry {
        /// Document id (see `taudio list`)
        id: i64,
    },

    /// Delete a document and its stored audio
    Delete {
        /// Document id (see `taudio list`)
        id: i64,
    },

    /// List the available synthesis voices
    Voices,

    /// Store audio as files in the given directory from now on
    Link {
        /// Directory for the audio library (created if missing)
        directory: PathBuf,
    },

    /// Re-confirm access to the linked audio directory
    Grant,

    /// Copy a document's audio to a file
    Export {
        /// Document id (see `taudio list`)
        id: i64,

        /// Destination path for the WAV file
        output: PathBuf,
    },
}

/// Arguments for `taudio add`.
#[derive(Args)]
pub struct AddArgs {
    /// Text to speak (use --file to convert a document instead)
    pub text: Option<String>,

    /// Convert a document file instead of inline text
    #[arg(long, conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Title for the document (inferred when omitted)
    #[arg(long)]
    pub title: Option<String>,

    /// Synthesis voice (see `taudio voices`)
    #[arg(long, default_value = DEFAULT_VOICE)]
    pub voice: String,
}
