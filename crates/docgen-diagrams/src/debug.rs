//! Debug artifacts for diagram rendering.
//!
//! When a debug directory is configured, each rendered block gets its own
//! `<debug_dir>/<block id>/` directory holding the diagram source, a copy of
//! the image (on success), or `conversion_error.json` (on failure). Writing
//! these never affects the render outcome.

use std::fs;
use std::path::{Path, PathBuf};

use docgen_process::ProcessOutput;
use serde::Serialize;

use crate::extract::DiagramBlock;
use crate::render::{RenderFailure, RenderedImage};

/// Name of the failure report written for a failed block.
pub const ERROR_REPORT_FILE: &str = "conversion_error.json";

/// Writes per-block debug artifacts under a directory.
#[derive(Debug, Clone)]
pub struct DebugArtifacts {
    dir: PathBuf,
}

#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    block: &'a str,
    error: String,
    return_code: Option<i32>,
    stderr: &'a str,
    stdout: &'a str,
    command: &'a str,
    output_path: &'a Path,
}

impl DebugArtifacts {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory holding artifacts for one block.
    #[must_use]
    pub fn block_dir(&self, block: &DiagramBlock) -> PathBuf {
        self.dir.join(&block.id)
    }

    /// Record the artifacts of one render attempt.
    ///
    /// Errors are logged and otherwise ignored.
    pub fn record(
        &self,
        block: &DiagramBlock,
        scratch: &Path,
        output: &Path,
        outcome: &Result<RenderedImage, RenderFailure>,
        process_output: Option<&ProcessOutput>,
        command: &str,
    ) {
        if let Err(e) = self.write(block, scratch, output, outcome, process_output, command) {
            tracing::warn!(block = %block.id, error = %e, "Failed to write debug artifacts");
        }
    }

    fn write(
        &self,
        block: &DiagramBlock,
        scratch: &Path,
        output: &Path,
        outcome: &Result<RenderedImage, RenderFailure>,
        process_output: Option<&ProcessOutput>,
        command: &str,
    ) -> std::io::Result<()> {
        let dir = self.block_dir(block);
        fs::create_dir_all(&dir)?;
        fs::copy(scratch, dir.join(format!("{}.mmd", block.id)))?;

        match outcome {
            Ok(image) => {
                fs::copy(&image.path, dir.join(&block.image_filename))?;
            }
            Err(failure) => {
                let (return_code, stderr, stdout) = match failure {
                    RenderFailure::Exit {
                        code,
                        stderr,
                        stdout,
                    } => (*code, stderr.as_str(), stdout.as_str()),
                    _ => process_output.map_or((None, "", ""), |out| {
                        (out.code, out.stderr.as_str(), out.stdout.as_str())
                    }),
                };
                let report = ErrorReport {
                    block: &block.id,
                    error: failure.to_string(),
                    return_code,
                    stderr,
                    stdout,
                    command,
                    output_path: output,
                };
                let json = serde_json::to_string_pretty(&report)?;
                fs::write(dir.join(ERROR_REPORT_FILE), json)?;
            }
        }

        tracing::debug!(block = %block.id, dir = %dir.display(), "Saved debug artifacts");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::extract::extract_diagrams;

    fn block() -> DiagramBlock {
        extract_diagrams("```mermaid\ngraph TD\n  A --> B\n```")
            .blocks
            .remove(0)
    }

    #[test]
    fn test_records_source_and_image() {
        let work = tempfile::tempdir().unwrap();
        let debug_dir = tempfile::tempdir().unwrap();
        let block = block();
        let scratch = work.path().join("input.mmd");
        fs::write(&scratch, &block.source).unwrap();
        let image_path = work.path().join(&block.image_filename);
        fs::write(&image_path, b"png").unwrap();
        let outcome = Ok(RenderedImage {
            path: image_path.clone(),
            bytes: 3,
        });

        let artifacts = DebugArtifacts::new(debug_dir.path());
        artifacts.record(
            &block,
            &scratch,
            &image_path,
            &outcome,
            None,
            "mmdc -i in -o out",
        );

        let dir = artifacts.block_dir(&block);
        assert_eq!(
            fs::read_to_string(dir.join(format!("{}.mmd", block.id))).unwrap(),
            "graph TD\n  A --> B"
        );
        assert_eq!(fs::read(dir.join(&block.image_filename)).unwrap(), b"png");
        assert!(!dir.join(ERROR_REPORT_FILE).exists());
    }

    #[test]
    fn test_records_failure_report() {
        let work = tempfile::tempdir().unwrap();
        let debug_dir = tempfile::tempdir().unwrap();
        let block = block();
        let scratch = work.path().join("input.mmd");
        fs::write(&scratch, &block.source).unwrap();
        let outcome = Err(RenderFailure::Exit {
            code: Some(1),
            stderr: "Parse error".to_owned(),
            stdout: String::new(),
        });

        let artifacts = DebugArtifacts::new(debug_dir.path());
        artifacts.record(
            &block,
            &scratch,
            Path::new("/tmp/out.png"),
            &outcome,
            None,
            "mmdc -i in -o out",
        );

        let report =
            fs::read_to_string(artifacts.block_dir(&block).join(ERROR_REPORT_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(json["return_code"], 1);
        assert_eq!(json["stderr"], "Parse error");
        assert_eq!(json["command"], "mmdc -i in -o out");
        assert_eq!(json["block"], block.id.as_str());
        assert_eq!(json["output_path"], "/tmp/out.png");
        assert!(!artifacts.block_dir(&block).join(&block.image_filename).exists());
    }

    #[test]
    fn test_unwritable_dir_is_ignored() {
        let work = tempfile::tempdir().unwrap();
        let blocker = work.path().join("file");
        fs::write(&blocker, "").unwrap();
        let block = block();

        // Debug dir below a regular file cannot be created.
        DebugArtifacts::new(blocker.join("debug")).record(
            &block,
            &work.path().join("missing.mmd"),
            &work.path().join("out.png"),
            &Err(RenderFailure::EmptyOutput),
            None,
            "mmdc",
        );
    }
}
