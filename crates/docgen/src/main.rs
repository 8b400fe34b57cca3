//! docgen CLI - Diagram-aware Markdown to document converter.
//!
//! Provides commands for:
//! - `convert`: Convert a Markdown file into a document
//! - `serve`: Start the conversion server
//! - `templates`: List reference templates
//! - `check`: Report availability of the external tools

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CheckArgs, ConvertArgs, ServeArgs, TemplatesArgs};
use output::Output;

/// docgen - Markdown with Mermaid diagrams to DOCX.
#[derive(Parser)]
#[command(name = "docgen", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a Markdown file into a document.
    Convert(ConvertArgs),
    /// Start the conversion server.
    Serve(ServeArgs),
    /// List reference templates.
    Templates(TemplatesArgs),
    /// Check that pandoc and the Mermaid CLI can be launched.
    Check(CheckArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Convert(args) => args.verbose,
            Self::Serve(args) => args.verbose,
            Self::Templates(_) | Self::Check(_) => false,
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
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Convert(args) => args.execute(),
        Commands::Serve(args) => match tokio::runtime::Runtime::new() {
            Ok(rt) => rt.block_on(args.execute()),
            Err(err) => Err(err.into()),
        },
        Commands::Templates(args) => args.execute(),
        Commands::Check(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
