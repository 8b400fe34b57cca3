//! `docgen convert` command implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use docgen_convert::{
    CleanupRegistry, ConvertRequest, ConvertedDocument, Converter, OutputFormat, looks_binary,
};
use docgen_server::converter_from_config;

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Markdown file to convert.
    input: PathBuf,

    /// Output file (default: input with the document extension).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Reference template name from the template directory.
    #[arg(short, long)]
    template: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Enable verbose output (show diagram warnings and timing logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ConvertArgs {
    /// Execute the convert command.
    ///
    /// Pending workspace cleanups are drained before returning.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load(None, None)?;
        let markdown = read_markdown(&self.input)?;

        let registry = Arc::new(CleanupRegistry::new()?);
        let converter = converter_from_config(&config, Arc::clone(&registry));
        let target = self
            .output
            .clone()
            .unwrap_or_else(|| default_output(&self.input, converter.format()));
        if same_file(&self.input, &target) {
            return Err(CliError::Validation(format!(
                "output {} would overwrite the input; pass --output",
                target.display()
            )));
        }

        let result = self.convert(&converter, markdown, &target);
        registry.shutdown();
        let document = result?;

        let report = &document.report;
        tracing::info!(
            input = %self.input.display(),
            output = %target.display(),
            extracted = report.extracted,
            rendered = report.rendered,
            skipped = report.skipped,
            "Converted document"
        );
        let failed = report.failed.len();
        if failed > 0 {
            tracing::warn!(ordinals = ?report.failed, "Diagrams kept as code");
            output.warning(&format!(
                "{failed} of {} diagram(s) could not be rendered and were kept as code",
                report.extracted
            ));
        }
        output.success(&format!("Wrote {}", target.display()));
        Ok(())
    }

    fn convert(
        &self,
        converter: &Converter,
        markdown: String,
        target: &Path,
    ) -> Result<ConvertedDocument, CliError> {
        let mut request =
            ConvertRequest::new(markdown).with_source_name(self.input.display().to_string());
        if let Some(template) = &self.template {
            request = request.with_template(template.as_str());
        }

        let document = converter.convert(&request)?;
        fs::copy(&document.artifact, target)?;
        Ok(document)
    }
}

/// Read a Markdown file, rejecting binary and non-UTF-8 content.
fn read_markdown(path: &Path) -> Result<String, CliError> {
    let content = fs::read(path)?;
    if looks_binary(&content) {
        return Err(CliError::Validation(format!(
            "{} appears to be binary, not text",
            path.display()
        )));
    }
    String::from_utf8(content).map_err(|_| {
        CliError::Validation(format!("{} must be UTF-8 encoded text", path.display()))
    })
}

/// Whether `a` and `b` name the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Input path with the extension of `format`.
fn default_output(input: &Path, format: OutputFormat) -> PathBuf {
    input.with_extension(format.extension())
}
