//! `docgen serve` command implementation.

use std::sync::Arc;

use clap::Args;
use docgen_convert::CleanupRegistry;
use docgen_server::{converter_from_config, run_server, server_config_from_config};

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose output (show diagram warnings and request logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load(self.host, self.port)?;

        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!(
            "Upload directory: {}",
            config.workspace_resolved.upload_dir.display()
        ));
        output.info(&format!(
            "Template directory: {}",
            config.templates_resolved.dir.display()
        ));
        if let Some(debug_dir) = &config.diagrams_resolved.debug_dir {
            output.info(&format!("Diagram debug artifacts: {}", debug_dir.display()));
        }

        let registry = Arc::new(CleanupRegistry::new()?);
        let converter = converter_from_config(&config, registry);
        run_server(server_config_from_config(&config), converter)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}
