//! Document compilation through pandoc.
//!
//! The compiler always runs with its working directory set to the
//! conversion workspace, so the relative `images/...` references in the
//! Markdown resolve. The directory is passed to the child process; the
//! process-global working directory is never touched.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use docgen_process::{ProcessError, ToolCommand};

/// Default pandoc executable.
pub const DEFAULT_PANDOC: &str = "pandoc";

/// Default time budget for one compilation (60 seconds).
pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(60);

/// Document format produced by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Docx,
    Odt,
    Epub,
    Html,
}

impl OutputFormat {
    /// Parse a format from its file extension.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "docx" => Some(Self::Docx),
            "odt" => Some(Self::Odt),
            "epub" => Some(Self::Epub),
            "html" => Some(Self::Html),
            _ => None,
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Odt => "odt",
            Self::Epub => "epub",
            Self::Html => "html",
        }
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::Odt => "application/vnd.oasis.opendocument.text",
            Self::Epub => "application/epub+zip",
            Self::Html => "text/html; charset=utf-8",
        }
    }

    /// Whether pandoc accepts a `--reference-doc` for this format.
    #[must_use]
    pub fn supports_reference_doc(self) -> bool {
        matches!(self, Self::Docx | Self::Odt)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One compiler invocation.
///
/// `input` and `output` are resolved against `working_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    pub working_dir: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Reference document providing styles.
    pub reference_doc: Option<PathBuf>,
}

impl CompileJob {
    /// Absolute location of the output file.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.working_dir.join(&self.output)
    }
}

/// Document compilation error.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("document compiler '{program}' not found, install pandoc or configure compiler.pandoc")]
    Unavailable { program: String },
    #[error("document conversion timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("document conversion failed (exit code {code:?})")]
    Failed { code: Option<i32>, details: String },
    #[error("document compiler did not produce an output file")]
    MissingOutput,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Compiles Markdown in a working directory into a document.
pub trait DocumentCompiler: Send + Sync {
    /// Run one compilation.
    ///
    /// On success the output file exists.
    fn compile(&self, job: &CompileJob) -> Result<(), CompileError>;

    /// Check whether the compiler can be launched.
    fn is_available(&self) -> bool;
}

/// Compiler backed by the pandoc CLI.
#[derive(Debug, Clone)]
pub struct Pandoc {
    command: ToolCommand,
    timeout: Duration,
}

impl Default for Pandoc {
    fn default() -> Self {
        Self::new(ToolCommand::new(DEFAULT_PANDOC))
    }
}

impl Pandoc {
    #[must_use]
    pub fn new(command: ToolCommand) -> Self {
        Self {
            command,
            timeout: DEFAULT_COMPILE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn command(&self) -> &ToolCommand {
        &self.command
    }
}

impl DocumentCompiler for Pandoc {
    fn compile(&self, job: &CompileJob) -> Result<(), CompileError> {
        // A missing working directory makes spawn fail with NotFound, which
        // would otherwise read as a missing executable.
        if !job.working_dir.is_dir() {
            return Err(CompileError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "working directory {} does not exist",
                    job.working_dir.display()
                ),
            )));
        }

        let mut command = self.command.to_command();
        command
            .arg(&job.input)
            .arg("-o")
            .arg(&job.output)
            .current_dir(&job.working_dir);
        if let Some(reference_doc) = &job.reference_doc {
            command.arg("--reference-doc").arg(reference_doc);
        }

        tracing::info!(
            working_dir = %job.working_dir.display(),
            input = %job.input.display(),
            output = %job.output.display(),
            reference_doc = ?job.reference_doc,
            "Running pandoc"
        );

        let output = docgen_process::run(command, self.command.program(), self.timeout)
            .map_err(|e| match e {
                ProcessError::NotFound { program } => CompileError::Unavailable { program },
                ProcessError::Timeout { timeout, .. } => CompileError::Timeout(timeout),
                ProcessError::Io { source, .. } => CompileError::Io(source),
            })?;

        if !output.success() {
            tracing::error!(code = ?output.code, stderr = %output.stderr.trim(), "Pandoc failed");
            return Err(CompileError::Failed {
                code: output.code,
                details: output.stderr,
            });
        }

        if !job.output_path().is_file() {
            return Err(CompileError::MissingOutput);
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.command.is_available()
    }
}
