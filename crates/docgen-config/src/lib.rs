//! Configuration management for docgen.
//!
//! Parses `docgen.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `workspace.upload_dir`
//! - `templates.dir`
//! - `diagrams.mermaid_cli`
//! - `diagrams.output_dir`
//! - `diagrams.debug_dir`
//! - `compiler.pandoc`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the directory holding conversion workspaces.
    pub upload_dir: Option<PathBuf>,
    /// Override the reference template directory.
    pub template_dir: Option<PathBuf>,
    /// Override the Mermaid CLI executable.
    pub mermaid_cli: Option<String>,
    /// Enable render debug artifacts in this directory.
    pub debug_dir: Option<PathBuf>,
    /// Override the pandoc executable.
    pub pandoc: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "docgen.toml";

/// Directory name (under the system temp dir) for conversion workspaces.
const DEFAULT_UPLOAD_DIR: &str = "docgen_uploads";

/// Default reference template directory, relative to the config directory.
const DEFAULT_TEMPLATE_DIR: &str = "templates_store";

/// Upper bound for `workspace.cleanup_delay_secs` (7 days).
const MAX_CLEANUP_DELAY_SECS: u64 = 7 * 24 * 60 * 60;

/// Mermaid themes accepted by `diagrams.theme`.
const THEMES: &[&str] = &["default", "neutral", "dark", "forest"];

/// Output formats accepted by `compiler.format`.
const FORMATS: &[&str] = &["docx", "odt", "epub", "html"];

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Workspace configuration (paths are relative strings from TOML).
    workspace: WorkspaceConfigRaw,
    /// Template configuration (paths are relative strings from TOML).
    templates: TemplatesConfigRaw,
    /// Diagram rendering configuration (paths are relative strings from TOML).
    diagrams: DiagramsConfigRaw,
    /// Document compiler configuration.
    pub compiler: CompilerConfig,

    /// Resolved workspace configuration (set after loading).
    #[serde(skip)]
    pub workspace_resolved: WorkspaceConfig,
    /// Resolved template configuration (set after loading).
    #[serde(skip)]
    pub templates_resolved: TemplatesConfig,
    /// Resolved diagrams configuration (set after loading).
    #[serde(skip)]
    pub diagrams_resolved: DiagramsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Maximum accepted request body size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5000,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Raw workspace configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WorkspaceConfigRaw {
    upload_dir: Option<String>,
    cleanup_delay_secs: Option<u64>,
}

/// Resolved workspace configuration.
#[derive(Debug)]
pub struct WorkspaceConfig {
    /// Root directory under which per-request workspaces are created.
    pub upload_dir: PathBuf,
    /// How long a delivered workspace is kept before removal.
    pub cleanup_delay: Duration,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            upload_dir: std::env::temp_dir().join(DEFAULT_UPLOAD_DIR),
            cleanup_delay: Duration::from_secs(300),
        }
    }
}

/// Raw template configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TemplatesConfigRaw {
    dir: Option<String>,
}

/// Resolved template configuration.
#[derive(Debug, Default)]
pub struct TemplatesConfig {
    /// Directory holding `.docx` reference templates.
    pub dir: PathBuf,
}

/// Raw diagrams configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DiagramsConfigRaw {
    mermaid_cli: Option<String>,
    theme: Option<String>,
    background: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    timeout_secs: Option<u64>,
    max_concurrency: Option<usize>,
    output_dir: Option<String>,
    debug_dir: Option<String>,
}

/// Resolved diagram rendering configuration.
#[derive(Debug)]
pub struct DiagramsConfig {
    /// Mermaid CLI executable.
    pub mermaid_cli: String,
    /// Mermaid theme name.
    pub theme: String,
    /// Image background color.
    pub background: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Time budget for rendering one diagram.
    pub timeout: Duration,
    /// Maximum number of diagrams rendered at once.
    pub max_concurrency: usize,
    /// Shared directory images are rendered into before being copied into a workspace.
    pub output_dir: Option<PathBuf>,
    /// Directory for per-diagram debug artifacts.
    pub debug_dir: Option<PathBuf>,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            mermaid_cli: "mmdc".to_owned(),
            theme: "neutral".to_owned(),
            background: "white".to_owned(),
            width: 800,
            height: 600,
            timeout: Duration::from_secs(30),
            max_concurrency: 4,
            output_dir: None,
            debug_dir: None,
        }
    }
}

/// Document compiler configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Pandoc executable.
    pub pandoc: String,
    /// Time budget for one compilation in seconds.
    pub timeout_secs: u64,
    /// Output format (`docx`, `odt`, `epub`, or `html`).
    pub format: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            pandoc: "pandoc".to_owned(),
            timeout_secs: 60,
            format: "docx".to_owned(),
        }
    }
}

impl CompilerConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`workspace.upload_dir`").
        field: String,
        /// Error message (e.g., "${`DOCGEN_UPLOADS`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a numeric field to be greater than zero.
fn require_positive(value: u64, field: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

/// Require a numeric field to be at most `max`.
fn require_at_most(value: u64, max: u64, field: &str) -> Result<(), ConfigError> {
    if value > max {
        return Err(ConfigError::Validation(format!(
            "{field} must be at most {max}"
        )));
    }
    Ok(())
}

/// Require a string field to be one of the allowed values.
fn require_one_of(value: &str, allowed: &[&str], field: &str) -> Result<(), ConfigError> {
    if !allowed.contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{field} must be one of: {}",
            allowed.join(", ")
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `docgen.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(upload_dir) = &settings.upload_dir {
            self.workspace_resolved.upload_dir.clone_from(upload_dir);
        }
        if let Some(template_dir) = &settings.template_dir {
            self.templates_resolved.dir.clone_from(template_dir);
        }
        if let Some(mermaid_cli) = &settings.mermaid_cli {
            self.diagrams_resolved.mermaid_cli.clone_from(mermaid_cli);
        }
        if let Some(debug_dir) = &settings.debug_dir {
            self.diagrams_resolved.debug_dir = Some(debug_dir.clone());
        }
        if let Some(pandoc) = &settings.pandoc {
            self.compiler.pandoc.clone_from(pandoc);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            workspace: WorkspaceConfigRaw::default(),
            templates: TemplatesConfigRaw::default(),
            diagrams: DiagramsConfigRaw::default(),
            compiler: CompilerConfig::default(),
            workspace_resolved: WorkspaceConfig::default(),
            templates_resolved: TemplatesConfig {
                dir: base.join(DEFAULT_TEMPLATE_DIR),
            },
            diagrams_resolved: DiagramsConfig::default(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        // Validate configuration after loading and resolution
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Checks that all required fields are properly set and contain valid values.
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_workspace()?;
        self.validate_diagrams()?;
        self.validate_compiler()?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 is technically valid (OS assigns a random port), but it's
        // unlikely to be intentional in a config file
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }
        require_positive(self.server.max_upload_bytes as u64, "server.max_upload_bytes")?;

        Ok(())
    }

    /// Validate workspace configuration.
    fn validate_workspace(&self) -> Result<(), ConfigError> {
        require_at_most(
            self.workspace_resolved.cleanup_delay.as_secs(),
            MAX_CLEANUP_DELAY_SECS,
            "workspace.cleanup_delay_secs",
        )
    }

    /// Validate diagrams configuration.
    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        let diagrams = &self.diagrams_resolved;

        require_non_empty(&diagrams.mermaid_cli, "diagrams.mermaid_cli")?;
        require_one_of(&diagrams.theme, THEMES, "diagrams.theme")?;
        require_non_empty(&diagrams.background, "diagrams.background")?;
        require_positive(u64::from(diagrams.width), "diagrams.width")?;
        require_positive(u64::from(diagrams.height), "diagrams.height")?;
        require_positive(diagrams.timeout.as_secs(), "diagrams.timeout_secs")?;
        require_positive(diagrams.max_concurrency as u64, "diagrams.max_concurrency")?;

        Ok(())
    }

    /// Validate compiler configuration.
    fn validate_compiler(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.compiler.pandoc, "compiler.pandoc")?;
        require_positive(self.compiler.timeout_secs, "compiler.timeout_secs")?;
        require_one_of(&self.compiler.format, FORMATS, "compiler.format")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        expand::expand_env_opt(&mut self.workspace.upload_dir, "workspace.upload_dir")?;
        expand::expand_env_opt(&mut self.templates.dir, "templates.dir")?;
        expand::expand_env_opt(&mut self.diagrams.mermaid_cli, "diagrams.mermaid_cli")?;
        expand::expand_env_opt(&mut self.diagrams.output_dir, "diagrams.output_dir")?;
        expand::expand_env_opt(&mut self.diagrams.debug_dir, "diagrams.debug_dir")?;
        self.compiler.pandoc = expand::expand_env(&self.compiler.pandoc, "compiler.pandoc")?;
        Ok(())
    }

    /// Resolve relative paths against the config directory and apply defaults.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let defaults = WorkspaceConfig::default();
        self.workspace_resolved = WorkspaceConfig {
            upload_dir: self
                .workspace
                .upload_dir
                .as_deref()
                .map_or(defaults.upload_dir, |dir| config_dir.join(dir)),
            cleanup_delay: self
                .workspace
                .cleanup_delay_secs
                .map_or(defaults.cleanup_delay, Duration::from_secs),
        };

        self.templates_resolved = TemplatesConfig {
            dir: config_dir.join(self.templates.dir.as_deref().unwrap_or(DEFAULT_TEMPLATE_DIR)),
        };

        let raw = &self.diagrams;
        let defaults = DiagramsConfig::default();
        self.diagrams_resolved = DiagramsConfig {
            mermaid_cli: raw.mermaid_cli.clone().unwrap_or(defaults.mermaid_cli),
            theme: raw.theme.clone().unwrap_or(defaults.theme),
            background: raw.background.clone().unwrap_or(defaults.background),
            width: raw.width.unwrap_or(defaults.width),
            height: raw.height.unwrap_or(defaults.height),
            timeout: raw.timeout_secs.map_or(defaults.timeout, Duration::from_secs),
            max_concurrency: raw.max_concurrency.unwrap_or(defaults.max_concurrency),
            output_dir: raw.output_dir.as_deref().map(|dir| config_dir.join(dir)),
            debug_dir: raw.debug_dir.as_deref().map(|dir| config_dir.join(dir)),
        };
    }
}
