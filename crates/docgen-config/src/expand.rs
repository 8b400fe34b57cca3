//! Environment variable expansion for configuration strings.

use std::borrow::Cow;

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a config value.
///
/// `field` names the config key in error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

/// Expand an optional config value in place.
pub(crate) fn expand_env_opt(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    if let Some(raw) = value.as_deref() {
        *value = Some(expand_env(raw, field)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_value_unchanged() {
        assert_eq!(expand_env("mmdc", "diagrams.mermaid_cli").unwrap(), "mmdc");
    }

    #[test]
    fn test_expand_set_variable() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("DOCGEN_TEST_EXPAND_HOME", "/opt/docgen");
        }

        let expanded = expand_env("${DOCGEN_TEST_EXPAND_HOME}/uploads", "workspace.upload_dir");
        assert_eq!(expanded.unwrap(), "/opt/docgen/uploads");

        unsafe {
            std::env::remove_var("DOCGEN_TEST_EXPAND_HOME");
        }
    }

    #[test]
    fn test_expand_default_when_unset() {
        let expanded = expand_env("${DOCGEN_TEST_EXPAND_UNSET:-pandoc}", "compiler.pandoc");
        assert_eq!(expanded.unwrap(), "pandoc");
    }

    #[test]
    fn test_unset_variable_is_error() {
        let err = expand_env("${DOCGEN_TEST_EXPAND_MISSING}", "server.host").unwrap_err();

        match &err {
            ConfigError::EnvVar { field, message } => {
                assert_eq!(field, "server.host");
                assert!(message.contains("DOCGEN_TEST_EXPAND_MISSING"));
            }
            other => panic!("Expected EnvVar error, got {other:?}"),
        }
    }

    #[test]
    fn test_expand_optional_none() {
        let mut value = None;
        expand_env_opt(&mut value, "diagrams.debug_dir").unwrap();
        assert!(value.is_none());
    }
}
