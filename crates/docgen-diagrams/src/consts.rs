//! Constants for diagram extraction and rendering.

use std::time::Duration;

/// Directory (relative to the compiler working directory) holding rendered images.
pub const IMAGES_DIR: &str = "images";

/// Alt text of the image placeholder substituted for each diagram.
pub const PLACEHOLDER_ALT: &str = "Mermaid diagram";

/// Default Mermaid CLI executable.
pub const DEFAULT_MERMAID_CLI: &str = "mmdc";

/// Default background color passed to `mmdc -b`.
pub const DEFAULT_BACKGROUND: &str = "white";

/// Default rendered image width in pixels.
pub const DEFAULT_WIDTH: u32 = 800;

/// Default rendered image height in pixels.
pub const DEFAULT_HEIGHT: u32 = 600;

/// Default timeout for a single `mmdc` invocation (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of diagrams rendered concurrently.
pub const DEFAULT_CONCURRENCY: usize = 4;
