//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod convert;
pub(crate) mod serve;
pub(crate) mod templates;

use std::path::PathBuf;

use clap::Args;
use docgen_config::{CliSettings, Config};

use crate::error::CliError;

pub(crate) use check::CheckArgs;
pub(crate) use convert::ConvertArgs;
pub(crate) use serve::ServeArgs;
pub(crate) use templates::TemplatesArgs;

/// Configuration file and overrides shared by all commands.
#[derive(Args, Debug, Default)]
pub(crate) struct ConfigArgs {
    /// Path to configuration file (default: auto-discover docgen.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding conversion workspaces (overrides config).
    #[arg(long, env = "UPLOAD_FOLDER")]
    upload_dir: Option<PathBuf>,

    /// Directory holding .docx reference templates (overrides config).
    #[arg(long, env = "TEMPLATE_FOLDER")]
    template_dir: Option<PathBuf>,

    /// Mermaid CLI executable (overrides config).
    #[arg(long, env = "MERMAID_CLI")]
    mermaid_cli: Option<String>,

    /// Write per-diagram debug artifacts to this directory.
    #[arg(long, env = "MERMAID_DEBUG_DIR")]
    debug_dir: Option<PathBuf>,

    /// Pandoc executable (overrides config).
    #[arg(long)]
    pandoc: Option<String>,
}

impl ConfigArgs {
    /// Load configuration, applying command line overrides.
    pub(crate) fn load(&self, host: Option<String>, port: Option<u16>) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            host,
            port,
            upload_dir: self.upload_dir.clone(),
            template_dir: self.template_dir.clone(),
            mermaid_cli: self.mermaid_cli.clone(),
            debug_dir: self.debug_dir.clone(),
            pandoc: self.pandoc.clone(),
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}
