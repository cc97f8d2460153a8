//! CLI entry point - the composition root.
//!
//! Command dispatch routes to handlers which delegate to the pipeline; all
//! infrastructure wiring lives in [`bootstrap`].

mod bootstrap;
mod commands;
mod handlers;
mod parser;

use std::time::Duration;

use clap::Parser;

use parser::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let Some(command) = cli.command else {
        // No command provided - show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    let app = bootstrap::bootstrap(cli.timeout_secs.map(Duration::from_secs)).await?;
    handlers::dispatch(app, command).await
}
