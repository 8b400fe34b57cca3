//! Error types for the conversion pipeline.

use std::io;
use std::path::PathBuf;

use crate::compiler::CompileError;

/// Failure to create or use a conversion workspace.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace {}: {source}", .path.display())]
    Create { path: PathBuf, source: io::Error },
    #[error("workspace I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Invalid template request.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("invalid template name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },
}

/// Failure of a whole conversion request.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Coarse failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    CompilerUnavailable,
    CompilerTimeout,
    CompilerFailed,
    InvalidRequest,
    Internal,
}

impl ConvertError {
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Compile(CompileError::Unavailable { .. }) => FailureCategory::CompilerUnavailable,
            Self::Compile(CompileError::Timeout(_)) => FailureCategory::CompilerTimeout,
            Self::Compile(CompileError::Failed { .. } | CompileError::MissingOutput) => {
                FailureCategory::CompilerFailed
            }
            Self::Compile(CompileError::Io(_)) | Self::Workspace(_) => FailureCategory::Internal,
            Self::Template(_) => FailureCategory::InvalidRequest,
        }
    }

    /// Diagnostic output of the compiler, when it ran and failed.
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Compile(CompileError::Failed { details, .. }) if !details.is_empty() => {
                Some(details.as_str())
            }
            _ => None,
        }
    }
}
