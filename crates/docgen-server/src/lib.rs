//! HTTP server for docgen.
//!
//! Exposes the conversion pipeline over HTTP using axum:
//! - `GET /api/health`: Liveness and pandoc availability
//! - `GET /api/templates`: Reference templates in the template store
//! - `POST /api/convert`: Multipart Markdown upload, returns the document
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use docgen_config::Config;
//! use docgen_convert::CleanupRegistry;
//! use docgen_server::{converter_from_config, run_server, server_config_from_config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load(None, None).unwrap();
//!     let registry = Arc::new(CleanupRegistry::new().unwrap());
//!     let converter = converter_from_config(&config, registry);
//!     run_server(server_config_from_config(&config), converter).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Client ──HTTP──► axum router (docgen-server)
//!                        │
//!                        └─► POST /api/convert ──spawn_blocking──► Converter
//!                                                                      │
//!                                                                      ├─► mmdc
//!                                                                      └─► pandoc
//! ```
//!
//! Delivered workspaces stay on disk for the configured grace period and are
//! drained by the cleanup registry when the server shuts down.

mod app;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use docgen_config::Config;
use docgen_convert::{
    CleanupRegistry, Converter, OutputFormat, Pandoc, TemplateStore, WorkspaceManager,
};
use docgen_diagrams::{MermaidCli, RenderOptions, Theme};
use docgen_process::ToolCommand;
use state::AppState;

/// Default request body limit (16 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Maximum accepted request body size.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Run the server until Ctrl-C, then drain pending workspace cleanups.
///
/// # Errors
///
/// Returns an error if the server fails to bind or serve.
pub async fn run_server(
    config: ServerConfig,
    converter: Converter,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::clone(converter.workspaces().registry());
    let state = Arc::new(AppState::new(converter));
    let app = app::create_router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let pending = registry.pending_count();
    tokio::task::spawn_blocking(move || registry.shutdown()).await?;
    tracing::info!(removed = pending, "Drained pending workspaces");

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from docgen config.
#[must_use]
pub fn server_config_from_config(config: &Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        max_upload_bytes: config.server.max_upload_bytes,
    }
}

/// Build a converter backed by `mmdc` and pandoc from docgen config.
///
/// Workspaces are handed to `registry` after delivery.
#[must_use]
pub fn converter_from_config(config: &Config, registry: Arc<CleanupRegistry>) -> Converter {
    let diagrams = &config.diagrams_resolved;

    let options = RenderOptions {
        theme: Theme::parse(&diagrams.theme).unwrap_or_default(),
        background: diagrams.background.clone(),
        width: diagrams.width,
        height: diagrams.height,
        timeout: diagrams.timeout,
    };
    let mut renderer =
        MermaidCli::new(ToolCommand::new(diagrams.mermaid_cli.as_str())).with_options(options);
    if let Some(debug_dir) = &diagrams.debug_dir {
        renderer = renderer.with_debug_dir(debug_dir);
    }

    let pandoc = Pandoc::new(ToolCommand::new(config.compiler.pandoc.as_str()))
        .with_timeout(config.compiler.timeout());
    let workspaces = WorkspaceManager::new(config.workspace_resolved.upload_dir.clone(), registry)
        .with_grace_period(config.workspace_resolved.cleanup_delay);

    let mut converter = Converter::new(Arc::new(renderer), Arc::new(pandoc), workspaces)
        .with_templates(TemplateStore::new(&config.templates_resolved.dir))
        .with_concurrency(diagrams.max_concurrency)
        .with_format(OutputFormat::parse(&config.compiler.format).unwrap_or_default());
    if let Some(output_dir) = &diagrams.output_dir {
        converter = converter.with_shared_images_dir(output_dir);
    }
    converter
}
