//! Diagram-aware Markdown to document conversion.
//!
//! [`Converter`] ties the pieces together: Mermaid blocks are extracted and
//! rendered by `docgen-diagrams`, failed diagrams are restored as code, and
//! the result is compiled by pandoc inside a private workspace.
//!
//! # Architecture
//!
//! - `pipeline`: Request orchestration ([`Converter`])
//! - `compiler`: [`DocumentCompiler`] trait and the [`Pandoc`] backend
//! - `workspace`: Per-request directories ([`WorkspaceManager`])
//! - `cleanup`: Deferred removal of delivered workspaces ([`CleanupRegistry`])
//! - `templates`: Reference `.docx` templates ([`TemplateStore`])
//! - `validate`: Upload and file name checks
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docgen_convert::{CleanupRegistry, ConvertRequest, Converter, Pandoc, WorkspaceManager};
//! use docgen_diagrams::MermaidCli;
//!
//! let registry = Arc::new(CleanupRegistry::new()?);
//! let converter = Converter::new(
//!     Arc::new(MermaidCli::default()),
//!     Arc::new(Pandoc::default()),
//!     WorkspaceManager::new("/tmp/docgen_uploads", Arc::clone(&registry)),
//! );
//! let document = converter.convert(&ConvertRequest::new("# Hello"))?;
//! println!("{}", document.artifact.display());
//! registry.shutdown();
//! ```

mod cleanup;
mod compiler;
mod error;
mod pipeline;
mod templates;
mod validate;
mod workspace;

pub use cleanup::{CleanupRegistry, MAX_CLEANUP_DELAY};
pub use compiler::{
    CompileError, CompileJob, DEFAULT_COMPILE_TIMEOUT, DEFAULT_PANDOC, DocumentCompiler,
    OutputFormat, Pandoc,
};
pub use error::{ConvertError, FailureCategory, TemplateError, WorkspaceError};
pub use pipeline::{ConversionStage, ConvertRequest, ConvertedDocument, Converter, DiagramReport};
pub use templates::{TemplateInfo, TemplateStore, validate_template_name};
pub use validate::{is_markdown_filename, is_safe_filename, looks_binary};
pub use workspace::{ConversionWorkspace, DEFAULT_GRACE_PERIOD, INPUT_FILE, WorkspaceManager};
