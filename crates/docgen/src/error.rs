//! CLI error types.

use docgen_config::ConfigError;
use docgen_convert::ConvertError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{}", format_convert(.0))]
    Convert(#[from] ConvertError),

    #[error("{0}")]
    Server(String),

    #[error("{0}")]
    Validation(String),
}

fn format_convert(err: &ConvertError) -> String {
    match err.details() {
        Some(details) => format!("{err}\n{}", details.trim_end()),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use docgen_convert::CompileError;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_convert_error_includes_details() {
        let err = CliError::from(ConvertError::from(CompileError::Failed {
            code: Some(1),
            details: "pandoc: could not find reference doc\n".to_owned(),
        }));

        assert_eq!(
            err.to_string(),
            "document conversion failed (exit code Some(1))\npandoc: could not find reference doc"
        );
    }
}
