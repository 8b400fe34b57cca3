//! Per-request conversion workspaces.
//!
//! Every conversion gets its own `<upload_root>/docgen-<uuid>/` directory:
//!
//! ```text
//! docgen-<uuid>/
//! ├── input.md             compiler-facing Markdown
//! ├── images/              rendered diagrams
//! ├── output.<ext>         raw compiler output (removed on delivery)
//! └── final_output.<ext>   delivered artifact
//! ```
//!
//! A [`ConversionWorkspace`] is removed exactly once: either synchronously
//! (on [`discard`](ConversionWorkspace::discard) or drop) or by the
//! [`CleanupRegistry`] after it was handed over with
//! [`defer_cleanup`](ConversionWorkspace::defer_cleanup).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use docgen_diagrams::consts::IMAGES_DIR;
use uuid::Uuid;

use crate::cleanup::{CleanupRegistry, remove_workspace};
use crate::error::WorkspaceError;

/// Name of the compiler input file inside a workspace.
pub const INPUT_FILE: &str = "input.md";

/// Prefix of workspace directory names.
const WORKSPACE_PREFIX: &str = "docgen-";

/// Default delay between delivery and removal of a workspace (5 minutes).
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(300);

/// Allocates workspaces under an upload root and hands them to a cleanup registry.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    upload_root: PathBuf,
    registry: Arc<CleanupRegistry>,
    grace_period: Duration,
}

impl WorkspaceManager {
    #[must_use]
    pub fn new(upload_root: impl Into<PathBuf>, registry: Arc<CleanupRegistry>) -> Self {
        Self {
            upload_root: upload_root.into(),
            registry,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Set how long delivered workspaces are kept.
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    #[must_use]
    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<CleanupRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Create a fresh workspace with an empty `images/` directory.
    ///
    /// The upload root is created if missing.
    pub fn allocate(&self) -> Result<ConversionWorkspace, WorkspaceError> {
        fs::create_dir_all(&self.upload_root).map_err(|source| WorkspaceError::Create {
            path: self.upload_root.clone(),
            source,
        })?;

        let id = Uuid::new_v4().simple().to_string();
        let root = self.upload_root.join(format!("{WORKSPACE_PREFIX}{id}"));
        fs::create_dir(&root).map_err(|source| WorkspaceError::Create {
            path: root.clone(),
            source,
        })?;

        // From here on, dropping the workspace removes the directory.
        let workspace = ConversionWorkspace {
            id,
            root,
            handed_off: false,
        };
        let images_dir = workspace.images_dir();
        fs::create_dir(&images_dir).map_err(|source| WorkspaceError::Create {
            path: images_dir,
            source,
        })?;

        tracing::debug!(
            workspace = %workspace.id,
            root = %workspace.root.display(),
            "Allocated workspace"
        );
        Ok(workspace)
    }

    /// Hand a delivered workspace to the cleanup registry.
    ///
    /// Returns the workspace root, which stays on disk for the grace period.
    pub fn release(&self, workspace: ConversionWorkspace) -> PathBuf {
        workspace.defer_cleanup(&self.registry, self.grace_period)
    }
}

/// An exclusively owned conversion directory.
#[derive(Debug)]
pub struct ConversionWorkspace {
    id: String,
    root: PathBuf,
    handed_off: bool,
}

impl ConversionWorkspace {
    /// Unique id of this workspace (used in log fields).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    #[must_use]
    pub fn input_path(&self) -> PathBuf {
        self.root.join(INPUT_FILE)
    }

    /// Raw compiler output path for a file extension.
    #[must_use]
    pub fn output_path(&self, extension: &str) -> PathBuf {
        self.root.join(output_file(extension))
    }

    /// Delivered artifact path for a file extension.
    #[must_use]
    pub fn delivery_path(&self, extension: &str) -> PathBuf {
        self.root.join(format!("final_output.{extension}"))
    }

    /// Write the compiler-facing Markdown to `input.md`.
    pub fn write_input(&self, markdown: &str) -> Result<PathBuf, WorkspaceError> {
        let path = self.input_path();
        fs::write(&path, markdown).map_err(|source| io_error(&path, source))?;
        Ok(path)
    }

    /// Copy an image into `images/`, keeping its file name.
    pub fn import_image(&self, source: &Path) -> Result<PathBuf, WorkspaceError> {
        let file_name = source.file_name().ok_or_else(|| {
            io_error(
                source,
                io::Error::new(io::ErrorKind::InvalidInput, "image path has no file name"),
            )
        })?;
        let target = self.images_dir().join(file_name);
        fs::copy(source, &target).map_err(|e| io_error(source, e))?;
        Ok(target)
    }

    /// Copy the raw compiler output to the delivery path and remove the raw output.
    ///
    /// Returns the delivery path.
    pub fn deliver(&self, extension: &str) -> Result<PathBuf, WorkspaceError> {
        let raw = self.output_path(extension);
        let delivered = self.delivery_path(extension);
        fs::copy(&raw, &delivered).map_err(|source| io_error(&raw, source))?;
        fs::remove_file(&raw).map_err(|source| io_error(&raw, source))?;
        Ok(delivered)
    }

    /// Hand this workspace to `registry` for removal after `delay`.
    pub fn defer_cleanup(mut self, registry: &CleanupRegistry, delay: Duration) -> PathBuf {
        registry.schedule(self.root.clone(), delay);
        // Only once the registry owns the path does drop stop removing it.
        self.handed_off = true;
        self.root.clone()
    }

    /// Remove this workspace now.
    pub fn discard(mut self) {
        self.handed_off = true;
        remove_workspace(&self.root);
    }
}

impl Drop for ConversionWorkspace {
    fn drop(&mut self) {
        if !self.handed_off {
            remove_workspace(&self.root);
        }
    }
}

/// Raw compiler output file name for a file extension.
pub(crate) fn output_file(extension: &str) -> String {
    format!("output.{extension}")
}

fn io_error(path: &Path, source: io::Error) -> WorkspaceError {
    WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn manager(root: &Path) -> WorkspaceManager {
        WorkspaceManager::new(root.join("uploads"), Arc::new(CleanupRegistry::new().unwrap()))
    }

    #[test]
    fn test_allocate_creates_layout() {
        let root = tempfile::tempdir().unwrap();
        let manager = manager(root.path());

        let workspace = manager.allocate().unwrap();

        assert!(workspace.root().starts_with(manager.upload_root()));
        assert!(workspace.images_dir().is_dir());
        let name = workspace.root().file_name().unwrap().to_str().unwrap();
        assert_eq!(name, format!("docgen-{}", workspace.id()));
        assert_eq!(workspace.input_path(), workspace.root().join("input.md"));
        assert_eq!(
            workspace.output_path("docx"),
            workspace.root().join("output.docx")
        );
        assert_eq!(
            workspace.delivery_path("docx"),
            workspace.root().join("final_output.docx")
        );
    }

    #[test]
    fn test_allocate_distinct_workspaces() {
        let root = tempfile::tempdir().unwrap();
        let manager = manager(root.path());

        let first = manager.allocate().unwrap();
        let second = manager.allocate().unwrap();

        assert_ne!(first.root(), second.root());
    }

    #[test]
    fn test_allocate_fails_when_root_is_a_file() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("uploads");
        fs::write(&blocker, "").unwrap();
        let manager = manager(root.path());

        let err = manager.allocate().unwrap_err();

        assert!(matches!(err, WorkspaceError::Create { .. }));
    }

    #[test]
    fn test_drop_removes_workspace() {
        let root = tempfile::tempdir().unwrap();
        let manager = manager(root.path());

        let workspace = manager.allocate().unwrap();
        let path = workspace.root().to_path_buf();
        workspace.write_input("# doc").unwrap();
        drop(workspace);

        assert!(!path.exists());
    }

    #[test]
    fn test_discard_removes_workspace() {
        let root = tempfile::tempdir().unwrap();
        let manager = manager(root.path());

        let workspace = manager.allocate().unwrap();
        let path = workspace.root().to_path_buf();
        workspace.discard();

        assert!(!path.exists());
        assert_eq!(manager.registry().pending_count(), 0);
    }

    #[test]
    fn test_deliver_replaces_raw_output() {
        let root = tempfile::tempdir().unwrap();
        let manager = manager(root.path());
        let workspace = manager.allocate().unwrap();
        fs::write(workspace.output_path("docx"), b"document").unwrap();

        let delivered = workspace.deliver("docx").unwrap();

        assert_eq!(delivered, workspace.delivery_path("docx"));
        assert_eq!(fs::read(&delivered).unwrap(), b"document");
        assert!(!workspace.output_path("docx").exists());
    }

    #[test]
    fn test_deliver_without_output_fails() {
        let root = tempfile::tempdir().unwrap();
        let manager = manager(root.path());
        let workspace = manager.allocate().unwrap();

        let err = workspace.deliver("docx").unwrap_err();

        assert!(matches!(err, WorkspaceError::Io { .. }));
    }

    #[test]
    fn test_import_image() {
        let root = tempfile::tempdir().unwrap();
        let manager = manager(root.path());
        let workspace = manager.allocate().unwrap();
        let shared = root.path().join("diagram-1-abcdef01.png");
        fs::write(&shared, b"png").unwrap();

        let imported = workspace.import_image(&shared).unwrap();

        assert_eq!(imported, workspace.images_dir().join("diagram-1-abcdef01.png"));
        assert_eq!(fs::read(imported).unwrap(), b"png");
        assert!(shared.exists());
    }

    #[test]
    fn test_release_defers_cleanup() {
        let root = tempfile::tempdir().unwrap();
        let manager = manager(root.path()).with_grace_period(Duration::from_secs(300));

        let workspace = manager.allocate().unwrap();
        let path = manager.release(workspace);

        assert!(path.exists());
        assert_eq!(manager.registry().pending(), vec![path.clone()]);

        manager.registry().shutdown();
        assert!(!path.exists());
    }

    #[test]
    fn test_release_with_unbounded_grace_period() {
        let root = tempfile::tempdir().unwrap();
        let manager = manager(root.path()).with_grace_period(Duration::from_secs(u64::MAX));

        let workspace = manager.allocate().unwrap();
        let path = manager.release(workspace);

        assert!(path.exists());
        assert_eq!(manager.registry().pending(), vec![path.clone()]);

        manager.registry().shutdown();
        assert!(!path.exists());
    }
}
