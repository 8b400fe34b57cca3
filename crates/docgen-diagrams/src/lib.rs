//! Mermaid diagram handling for docgen.
//!
//! This crate turns fenced `mermaid` blocks into images a document compiler
//! can embed:
//! - [`extract_diagrams`] swaps each recognized block for an image placeholder
//! - [`render_all`] renders blocks in parallel through a [`DiagramRenderer`]
//!   (the Mermaid CLI by default), one outcome per block
//! - [`restore_failed_blocks`] puts failed blocks back as code, so the
//!   document never references a missing image
//!
//! # Architecture
//!
//! - [`language`]: Diagram kinds and rendering themes
//! - `extract`: Block detection and placeholder substitution
//! - `render`: Renderer trait, Mermaid CLI backend, bounded parallel rendering
//! - `reconcile`: Restoration of failed blocks
//! - `debug`: Optional per-block debug artifacts
//!
//! # Example
//!
//! ```ignore
//! use docgen_diagrams::{
//!     MermaidCli, extract_diagrams, failed_ordinals, render_all, restore_failed_blocks,
//! };
//!
//! let extraction = extract_diagrams(markdown);
//! let outcomes = render_all(&MermaidCli::default(), &extraction.blocks, images_dir, 4);
//! let failed = failed_ordinals(&outcomes);
//! let text = restore_failed_blocks(&extraction.text, &extraction.blocks, &failed);
//! ```

pub mod consts;
mod debug;
mod extract;
pub mod language;
mod reconcile;
mod render;

pub use debug::{DebugArtifacts, ERROR_REPORT_FILE};
pub use extract::{DiagramBlock, Extraction, extract_diagrams};
pub use language::{DiagramKind, Theme};
pub use reconcile::restore_failed_blocks;
pub use render::{
    DiagramRenderer, MermaidCli, RenderFailure, RenderOptions, RenderOutcome, RenderedImage,
    failed_ordinals, render_all,
};
