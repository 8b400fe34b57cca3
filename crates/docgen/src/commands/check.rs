//! `docgen check` command implementation.

use clap::Args;
use docgen_convert::{DocumentCompiler, Pandoc};
use docgen_diagrams::MermaidCli;
use docgen_process::ToolCommand;

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    #[command(flatten)]
    config: ConfigArgs,
}

impl CheckArgs {
    /// Fails only when pandoc is missing; without the Mermaid CLI diagrams
    /// are kept as code.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load(None, None)?;

        let mermaid_cli = &config.diagrams_resolved.mermaid_cli;
        let mermaid_available =
            MermaidCli::new(ToolCommand::new(mermaid_cli.as_str())).is_available();
        output.tool_status("mermaid-cli", mermaid_cli, mermaid_available, false);

        let pandoc = &config.compiler.pandoc;
        let pandoc_available = Pandoc::new(ToolCommand::new(pandoc.as_str())).is_available();
        output.tool_status("pandoc", pandoc, pandoc_available, true);

        if !mermaid_available {
            output.warning("Diagrams will be kept as code blocks");
        }
        if !pandoc_available {
            return Err(CliError::Validation(format!("pandoc not found: {pandoc}")));
        }
        Ok(())
    }
}
