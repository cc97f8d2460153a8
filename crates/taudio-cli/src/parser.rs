//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface definition for the taudio document-to-speech tool.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser)]
#[command(name = "taudio")]
#[command(about = "Convert text and documents to spoken audio for offline replay")]
#[command(version)]
pub struct Cli {
    /// Deadline in seconds for each remote speech call (off by default)
    #[arg(long = "timeout", global = true)]
    pub timeout_secs: Option<u64>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
