//! Diagram rendering through the Mermaid CLI.
//!
//! [`render_all`] renders every extracted block into the images directory on
//! a bounded rayon pool. Each block gets its own [`RenderOutcome`]; a failed
//! block never aborts the others.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use docgen_process::{ProcessError, ProcessOutput, ToolCommand};
use rayon::prelude::*;

use crate::consts::{
    DEFAULT_BACKGROUND, DEFAULT_HEIGHT, DEFAULT_MERMAID_CLI, DEFAULT_TIMEOUT, DEFAULT_WIDTH,
};
use crate::debug::DebugArtifacts;
use crate::extract::DiagramBlock;
use crate::language::Theme;

/// Options passed to every `mmdc` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub theme: Theme,
    pub background: String,
    pub width: u32,
    pub height: u32,
    /// Time budget for a single diagram.
    pub timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            background: DEFAULT_BACKGROUND.to_owned(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A successfully rendered image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub path: PathBuf,
    /// Size of the image file in bytes (always non-zero).
    pub bytes: u64,
}

/// Why a single diagram failed to render.
#[derive(Debug, thiserror::Error)]
pub enum RenderFailure {
    #[error("Mermaid CLI '{program}' not found")]
    ToolNotFound { program: String },
    #[error("rendering timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Mermaid CLI exited with code {code:?}: {}", .stderr.trim())]
    Exit {
        code: Option<i32>,
        stderr: String,
        stdout: String,
    },
    #[error("Mermaid CLI produced no image")]
    EmptyOutput,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Renders one diagram block to an image file.
///
/// Implementations must be safe to call from several threads at once, each
/// call with a distinct output path.
pub trait DiagramRenderer: Send + Sync {
    /// Render `block` to `output`.
    ///
    /// On success the file at `output` exists and is non-empty. On failure no
    /// partial file is left behind.
    fn render(&self, block: &DiagramBlock, output: &Path) -> Result<RenderedImage, RenderFailure>;
}

/// Renderer backed by the Mermaid CLI (`mmdc`).
#[derive(Debug, Clone)]
pub struct MermaidCli {
    command: ToolCommand,
    options: RenderOptions,
    debug: Option<DebugArtifacts>,
}

impl Default for MermaidCli {
    fn default() -> Self {
        Self::new(ToolCommand::new(DEFAULT_MERMAID_CLI))
    }
}

impl MermaidCli {
    /// Create a renderer invoking the given command with default options.
    #[must_use]
    pub fn new(command: ToolCommand) -> Self {
        Self {
            command,
            options: RenderOptions::default(),
            debug: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Keep per-diagram sources, images, and failure reports under `dir`.
    #[must_use]
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug = Some(DebugArtifacts::new(dir));
        self
    }

    #[must_use]
    pub fn command(&self) -> &ToolCommand {
        &self.command
    }

    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Check whether the Mermaid CLI can be launched.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.command.is_available()
    }

    fn tool_args(&self) -> [String; 8] {
        [
            "-t".to_owned(),
            self.options.theme.as_str().to_owned(),
            "-b".to_owned(),
            self.options.background.clone(),
            "-w".to_owned(),
            self.options.width.to_string(),
            "-H".to_owned(),
            self.options.height.to_string(),
        ]
    }
}

impl DiagramRenderer for MermaidCli {
    fn render(&self, block: &DiagramBlock, output: &Path) -> Result<RenderedImage, RenderFailure> {
        let scratch = tempfile::Builder::new()
            .prefix("docgen-")
            .suffix(".mmd")
            .tempfile()?;
        fs::write(scratch.path(), &block.source)?;

        let tool_args = self.tool_args();
        let mut command = self.command.to_command();
        command
            .arg("-i")
            .arg(scratch.path())
            .arg("-o")
            .arg(output)
            .args(&tool_args);

        let command_line = format!(
            "{} -i {} -o {} {}",
            self.command,
            scratch.path().display(),
            output.display(),
            tool_args.join(" ")
        );
        tracing::debug!(block = %block.id, command = %command_line, "Running Mermaid CLI");

        let result = docgen_process::run(command, self.command.program(), self.options.timeout);
        let process_output = result.as_ref().ok().cloned();
        let outcome = interpret(result, output);

        if let Some(debug) = &self.debug {
            debug.record(
                block,
                scratch.path(),
                output,
                &outcome,
                process_output.as_ref(),
                &command_line,
            );
        }

        if outcome.is_err() {
            // The tool may have written a partial file before failing.
            let _ = fs::remove_file(output);
        }
        outcome
    }
}

fn interpret(
    result: Result<ProcessOutput, ProcessError>,
    output: &Path,
) -> Result<RenderedImage, RenderFailure> {
    let process_output = match result {
        Ok(process_output) => process_output,
        Err(ProcessError::NotFound { program }) => {
            return Err(RenderFailure::ToolNotFound { program });
        }
        Err(ProcessError::Timeout { timeout, .. }) => return Err(RenderFailure::Timeout(timeout)),
        Err(ProcessError::Io { source, .. }) => return Err(RenderFailure::Io(source)),
    };

    if !process_output.success() {
        return Err(RenderFailure::Exit {
            code: process_output.code,
            stderr: process_output.stderr,
            stdout: process_output.stdout,
        });
    }

    match fs::metadata(output) {
        Ok(meta) if meta.len() > 0 => Ok(RenderedImage {
            path: output.to_path_buf(),
            bytes: meta.len(),
        }),
        _ => Err(RenderFailure::EmptyOutput),
    }
}

/// Result of rendering a single block.
#[derive(Debug)]
pub enum RenderOutcome {
    Rendered {
        ordinal: usize,
        image: RenderedImage,
    },
    Failed {
        ordinal: usize,
        failure: RenderFailure,
    },
}

impl RenderOutcome {
    /// Ordinal of the block this outcome belongs to.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        match self {
            Self::Rendered { ordinal, .. } | Self::Failed { ordinal, .. } => *ordinal,
        }
    }

    #[must_use]
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

/// Render all blocks into `images_dir`, at most `concurrency` at a time.
///
/// Each block is written to `images_dir/<image_filename>`. Outcomes are
/// returned in block order, one per block.
pub fn render_all<R>(
    renderer: &R,
    blocks: &[DiagramBlock],
    images_dir: &Path,
    concurrency: usize,
) -> Vec<RenderOutcome>
where
    R: DiagramRenderer + ?Sized,
{
    if blocks.is_empty() {
        return Vec::new();
    }

    let threads = concurrency.clamp(1, blocks.len());
    let render = |block: &DiagramBlock| render_block(renderer, block, images_dir);

    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("docgen-render-{i}"))
        .build()
    {
        Ok(pool) => pool.install(|| blocks.par_iter().map(render).collect()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to create render pool, rendering sequentially");
            blocks.iter().map(render).collect()
        }
    }
}

fn render_block<R>(renderer: &R, block: &DiagramBlock, images_dir: &Path) -> RenderOutcome
where
    R: DiagramRenderer + ?Sized,
{
    let output = images_dir.join(&block.image_filename);
    match renderer.render(block, &output) {
        Ok(image) => {
            tracing::info!(block = %block.id, bytes = image.bytes, "Rendered diagram");
            RenderOutcome::Rendered {
                ordinal: block.ordinal,
                image,
            }
        }
        Err(failure) => {
            tracing::warn!(block = %block.id, error = %failure, "Diagram rendering failed");
            RenderOutcome::Failed {
                ordinal: block.ordinal,
                failure,
            }
        }
    }
}

/// Ordinals of the blocks that failed to render, in ascending order.
#[must_use]
pub fn failed_ordinals(outcomes: &[RenderOutcome]) -> Vec<usize> {
    let mut failed: Vec<usize> = outcomes
        .iter()
        .filter(|outcome| !outcome.is_rendered())
        .map(RenderOutcome::ordinal)
        .collect();
    failed.sort_unstable();
    failed
}
