//! Reference template store.
//!
//! A directory of `.docx` files pandoc can use as `--reference-doc`.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::TemplateError;
use crate::validate::is_safe_filename;

/// Template file extension.
const TEMPLATE_EXTENSION: &str = "docx";

/// A template available in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInfo {
    /// File name, used to select the template.
    pub name: String,
    pub path: PathBuf,
}

/// Directory of reference templates.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List all `.docx` templates, sorted by name.
    ///
    /// A missing directory yields an empty list.
    pub fn list(&self) -> io::Result<Vec<TemplateInfo>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut templates = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(TEMPLATE_EXTENSION)
            {
                continue;
            }
            let Some(name) = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_owned)
            else {
                continue;
            };
            templates.push(TemplateInfo { name, path });
        }
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    /// Resolve a template name to an absolute path.
    ///
    /// Returns `Ok(None)` when the name is valid but no such template exists;
    /// conversion then proceeds without a reference document.
    pub fn resolve(&self, name: &str) -> Result<Option<PathBuf>, TemplateError> {
        validate_template_name(name, &self.dir)?;

        let path = self.dir.join(name);
        if !path.is_file() {
            tracing::warn!(
                template = name,
                dir = %self.dir.display(),
                "Template not found, continuing without it"
            );
            return Ok(None);
        }

        // The compiler runs in the workspace, so relative paths would not resolve.
        let path = match std::path::absolute(&path) {
            Ok(absolute) => absolute,
            Err(_) => path,
        };
        tracing::debug!(template = name, path = %path.display(), "Resolved template");
        Ok(Some(path))
    }
}

/// Check that a template name is a safe `.docx` file name inside `dir`.
pub fn validate_template_name(name: &str, dir: &Path) -> Result<(), TemplateError> {
    let invalid = |reason| TemplateError::InvalidName {
        name: name.to_owned(),
        reason,
    };

    if !is_safe_filename(name) {
        return Err(invalid("unsafe filename"));
    }
    if !name.ends_with(".docx") {
        return Err(invalid("template must be a .docx file"));
    }

    let candidate = dir.join(name);
    let inside = candidate.starts_with(dir)
        && Path::new(name)
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if !inside {
        return Err(invalid("path escapes the template directory"));
    }
    Ok(())
}
