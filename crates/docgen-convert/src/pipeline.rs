//! Conversion orchestration.
//!
//! [`Converter::convert`] runs one request through
//! `Received → Extracted → Rendering → Reconciled → Compiling → Delivered`.
//! Diagram failures degrade to the original code block; compiler and
//! workspace failures abort the request and remove its workspace at once.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docgen_diagrams::consts::DEFAULT_CONCURRENCY;
use docgen_diagrams::{
    DiagramBlock, DiagramRenderer, Extraction, RenderOutcome, extract_diagrams, failed_ordinals,
    render_all, restore_failed_blocks,
};

use crate::compiler::{CompileJob, DocumentCompiler, OutputFormat};
use crate::error::{ConvertError, WorkspaceError};
use crate::templates::TemplateStore;
use crate::workspace::{ConversionWorkspace, INPUT_FILE, WorkspaceManager, output_file};

/// A conversion request.
#[derive(Debug, Clone, Default)]
pub struct ConvertRequest {
    pub markdown: String,
    /// Reference template name in the template store.
    pub template: Option<String>,
    /// Original file name, for logging.
    pub source_name: Option<String>,
}

impl ConvertRequest {
    #[must_use]
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    #[must_use]
    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }
}

/// Per-request diagram statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramReport {
    /// Blocks replaced by placeholders.
    pub extracted: usize,
    pub rendered: usize,
    /// Ordinals of blocks restored as code.
    pub failed: Vec<usize>,
    /// `mermaid` blocks left as code because their syntax was not recognized.
    pub skipped: usize,
}

/// A successfully converted document.
#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    /// Delivered artifact; valid until the workspace grace period ends.
    pub artifact: PathBuf,
    pub workspace_root: PathBuf,
    /// Markdown exactly as handed to the compiler.
    pub markdown: String,
    pub report: DiagramReport,
    pub format: OutputFormat,
}

/// Stage of a conversion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    Received,
    Extracted,
    Rendering,
    Reconciled,
    Compiling,
    Delivered,
    Aborted,
}

impl ConversionStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Extracted => "extracted",
            Self::Rendering => "rendering",
            Self::Reconciled => "reconciled",
            Self::Compiling => "compiling",
            Self::Delivered => "delivered",
            Self::Aborted => "aborted",
        }
    }
}

/// Diagram-aware Markdown to document converter.
///
/// Shared across requests; every call to [`convert`](Self::convert) works in
/// its own workspace.
#[derive(Clone)]
pub struct Converter {
    renderer: Arc<dyn DiagramRenderer>,
    compiler: Arc<dyn DocumentCompiler>,
    workspaces: WorkspaceManager,
    templates: Option<TemplateStore>,
    concurrency: usize,
    shared_images_dir: Option<PathBuf>,
    format: OutputFormat,
}

impl Converter {
    #[must_use]
    pub fn new(
        renderer: Arc<dyn DiagramRenderer>,
        compiler: Arc<dyn DocumentCompiler>,
        workspaces: WorkspaceManager,
    ) -> Self {
        Self {
            renderer,
            compiler,
            workspaces,
            templates: None,
            concurrency: DEFAULT_CONCURRENCY,
            shared_images_dir: None,
            format: OutputFormat::default(),
        }
    }

    #[must_use]
    pub fn with_templates(mut self, templates: TemplateStore) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Maximum number of diagrams rendered at once per request.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Render images into a shared directory and copy them into each workspace.
    #[must_use]
    pub fn with_shared_images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shared_images_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn compiler(&self) -> &Arc<dyn DocumentCompiler> {
        &self.compiler
    }

    #[must_use]
    pub fn templates(&self) -> Option<&TemplateStore> {
        self.templates.as_ref()
    }

    #[must_use]
    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Convert one Markdown document.
    ///
    /// On success the artifact stays on disk for the workspace grace period.
    /// On failure nothing of the request is left on disk.
    pub fn convert(&self, request: &ConvertRequest) -> Result<ConvertedDocument, ConvertError> {
        let reference_doc = self.resolve_template(request.template.as_deref())?;
        let workspace = self.workspaces.allocate()?;
        let id = workspace.id().to_owned();
        log_stage(&id, ConversionStage::Received);
        tracing::info!(
            workspace = %id,
            source = request.source_name.as_deref().unwrap_or("<inline>"),
            bytes = request.markdown.len(),
            "Converting document"
        );

        match self.process(&workspace, request, reference_doc) {
            Ok((markdown, report)) => {
                let artifact = workspace.delivery_path(self.format.extension());
                let workspace_root = self.workspaces.release(workspace);
                log_stage(&id, ConversionStage::Delivered);
                tracing::info!(
                    workspace = %id,
                    artifact = %artifact.display(),
                    diagrams = report.extracted,
                    failed = report.failed.len(),
                    "Conversion complete"
                );
                Ok(ConvertedDocument {
                    artifact,
                    workspace_root,
                    markdown,
                    report,
                    format: self.format,
                })
            }
            Err(err) => {
                log_stage(&id, ConversionStage::Aborted);
                tracing::error!(workspace = %id, error = %err, "Conversion failed");
                workspace.discard();
                Err(err)
            }
        }
    }

    fn resolve_template(&self, name: Option<&str>) -> Result<Option<PathBuf>, ConvertError> {
        let Some(name) = name.filter(|name| !name.is_empty()) else {
            return Ok(None);
        };
        let Some(store) = &self.templates else {
            tracing::warn!(template = name, "No template directory configured, ignoring template");
            return Ok(None);
        };
        Ok(store.resolve(name)?)
    }

    fn process(
        &self,
        workspace: &ConversionWorkspace,
        request: &ConvertRequest,
        reference_doc: Option<PathBuf>,
    ) -> Result<(String, DiagramReport), ConvertError> {
        let Extraction {
            text,
            blocks,
            skipped,
        } = extract_diagrams(&request.markdown);
        log_stage(workspace.id(), ConversionStage::Extracted);

        let mut report = DiagramReport {
            extracted: blocks.len(),
            skipped,
            ..DiagramReport::default()
        };

        let markdown = if blocks.is_empty() {
            text
        } else {
            log_stage(workspace.id(), ConversionStage::Rendering);
            let outcomes = self.render(workspace, &blocks)?;
            report.failed = failed_ordinals(&outcomes);
            report.rendered = blocks.len() - report.failed.len();
            if report.failed.is_empty() {
                text
            } else {
                restore_failed_blocks(&text, &blocks, &report.failed)
            }
        };
        log_stage(workspace.id(), ConversionStage::Reconciled);

        workspace.write_input(&markdown)?;

        let extension = self.format.extension();
        let reference_doc = match reference_doc {
            Some(_) if !self.format.supports_reference_doc() => {
                tracing::warn!(
                    format = %self.format,
                    "Format takes no reference document, ignoring template"
                );
                None
            }
            other => other,
        };
        let job = CompileJob {
            working_dir: workspace.root().to_path_buf(),
            input: PathBuf::from(INPUT_FILE),
            output: PathBuf::from(output_file(extension)),
            reference_doc,
        };
        log_stage(workspace.id(), ConversionStage::Compiling);
        self.compiler.compile(&job)?;

        workspace.deliver(extension)?;
        Ok((markdown, report))
    }

    fn render(
        &self,
        workspace: &ConversionWorkspace,
        blocks: &[DiagramBlock],
    ) -> Result<Vec<RenderOutcome>, WorkspaceError> {
        let Some(shared) = &self.shared_images_dir else {
            return Ok(render_all(
                self.renderer.as_ref(),
                blocks,
                &workspace.images_dir(),
                self.concurrency,
            ));
        };

        fs::create_dir_all(shared).map_err(|source| WorkspaceError::Io {
            path: shared.clone(),
            source,
        })?;
        let outcomes = render_all(self.renderer.as_ref(), blocks, shared, self.concurrency);
        for outcome in &outcomes {
            if let RenderOutcome::Rendered { image, .. } = outcome {
                import(workspace, &image.path)?;
            }
        }
        Ok(outcomes)
    }
}

fn import(workspace: &ConversionWorkspace, image: &Path) -> Result<(), WorkspaceError> {
    let target = workspace.import_image(image)?;
    tracing::debug!(
        workspace = %workspace.id(),
        image = %target.display(),
        "Copied image into workspace"
    );
    Ok(())
}

fn log_stage(workspace: &str, stage: ConversionStage) {
    tracing::debug!(workspace, stage = stage.as_str(), "Conversion stage");
}
