//! Scrivo CLI - Markdown document engine.
//!
//! Provides commands for:
//! - `render`: Render a document to HTML (or the full output as JSON)
//! - `text`: Print a document's plain-text mirror
//! - `toc`: Print a document's heading outline as JSON
//! - `warm`: Load every document under the source directory into the cache

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{RenderArgs, TextArgs, TocArgs, WarmArgs};
use output::Output;

/// Scrivo - Markdown document engine.
#[derive(Parser)]
#[command(name = "scrivo", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document to HTML.
    Render(RenderArgs),
    /// Print a document as plain text.
    Text(TextArgs),
    /// Print a document's heading outline.
    Toc(TocArgs),
    /// Render every document under the source directory.
    Warm(WarmArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Render(args) => args.document.config.verbose,
            Self::Text(args) => args.document.config.verbose,
            Self::Toc(args) => args.document.config.verbose,
            Self::Warm(args) => args.config.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Text(args) => args.execute(),
        Commands::Toc(args) => args.execute(),
        Commands::Warm(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
