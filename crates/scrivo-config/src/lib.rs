//! Configuration management for Scrivo.
//!
//! Parses `scrivo.toml` configuration files with serde and provides
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
//! - `assets.endpoint`
//! - `assets.format`

mod expand;

use std::path::{Path, PathBuf};

use scrivo_renderer::{
    AssetOptions, DEFAULT_EXCERPT_LENGTH, DEFAULT_MAX_SOURCE_BYTES, DEFAULT_ORDER, Environment,
    RenderOptions,
};
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "scrivo.toml";

/// Fewest responsive widths an asset configuration may list.
const MIN_WIDTHS: usize = 3;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override docs source directory.
    pub source_dir: Option<PathBuf>,
    /// Override rendering environment.
    pub environment: Option<Environment>,
    /// Override size guard threshold.
    pub max_source_bytes: Option<usize>,
    /// Override asset service endpoint.
    pub asset_endpoint: Option<String>,
    /// Override syntax highlighting flag.
    pub highlight: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Documentation configuration (paths are relative strings from TOML).
    docs: DocsConfigRaw,
    /// Rendering limits and environment.
    pub render: RenderConfig,
    /// Image rewriting.
    pub assets: AssetsConfig,
    /// Code highlighting.
    pub highlight: HighlightConfig,

    /// Resolved docs configuration (set after loading).
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw docs configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    source_dir: Option<String>,
}

/// Resolved documentation configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Source directory for markdown files.
    pub source_dir: PathBuf,
}

/// `[render]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Sources larger than this are not parsed.
    pub max_source_bytes: usize,
    /// Characters kept in computed excerpts.
    pub excerpt_length: usize,
    /// Order for pages with neither frontmatter order nor numeric prefix.
    pub default_order: i64,
    /// Controls error detail in degraded output.
    pub environment: Environment,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
            default_order: DEFAULT_ORDER,
            environment: Environment::default(),
        }
    }
}

/// `[assets]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Asset service path prefix or URL.
    pub endpoint: String,
    /// Responsive widths in pixels.
    pub widths: Vec<u32>,
    /// Modern image format offered in `<source>`.
    pub format: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        let defaults = AssetOptions::default();
        Self {
            endpoint: defaults.endpoint,
            widths: defaults.widths,
            format: defaults.format,
        }
    }
}

/// `[highlight]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enabled: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self { enabled: true }
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
        /// Config field path (e.g., "`assets.endpoint`").
        field: String,
        /// Error message (e.g., "${`ASSET_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `scrivo.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, then the result is validated
    /// again so overrides can't produce an invalid config.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or validation fails.
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

    /// Renderer options described by this configuration.
    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            max_source_bytes: self.render.max_source_bytes,
            excerpt_length: self.render.excerpt_length,
            default_order: self.render.default_order,
            environment: self.render.environment,
            assets: AssetOptions {
                endpoint: self.assets.endpoint.clone(),
                widths: self.assets.widths.clone(),
                format: self.assets.format.clone(),
            },
            highlight: self.highlight.enabled,
        }
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.docs_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(environment) = settings.environment {
            self.render.environment = environment;
        }
        if let Some(max_source_bytes) = settings.max_source_bytes {
            self.render.max_source_bytes = max_source_bytes;
        }
        if let Some(endpoint) = &settings.asset_endpoint {
            self.assets.endpoint.clone_from(endpoint);
        }
        if let Some(highlight) = settings.highlight {
            self.highlight.enabled = highlight;
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
            docs: DocsConfigRaw::default(),
            render: RenderConfig::default(),
            assets: AssetsConfig::default(),
            highlight: HighlightConfig::default(),
            docs_resolved: DocsConfig {
                source_dir: base.join("docs"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_render()?;
        self.validate_assets()?;
        Ok(())
    }

    fn validate_render(&self) -> Result<(), ConfigError> {
        if self.render.max_source_bytes == 0 {
            return Err(ConfigError::Validation(
                "render.max_source_bytes must be greater than 0".to_owned(),
            ));
        }
        if self.render.excerpt_length == 0 {
            return Err(ConfigError::Validation(
                "render.excerpt_length must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_assets(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.assets.endpoint, "assets.endpoint")?;
        require_non_empty(&self.assets.format, "assets.format")?;
        if !self.assets.format.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ConfigError::Validation(format!(
                "assets.format must be a bare image format name, got {:?}",
                self.assets.format
            )));
        }
        if self.assets.widths.len() < MIN_WIDTHS {
            return Err(ConfigError::Validation(format!(
                "assets.widths must list at least {MIN_WIDTHS} widths"
            )));
        }
        if self.assets.widths.contains(&0) {
            return Err(ConfigError::Validation(
                "assets.widths must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.assets.endpoint = expand::expand_env(&self.assets.endpoint, "assets.endpoint")?;
        self.assets.format = expand::expand_env(&self.assets.format, "assets.format")?;
        Ok(())
    }

    /// Resolve relative paths against the config file's directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.docs_resolved = DocsConfig {
            source_dir: config_dir.join(self.docs.source_dir.as_deref().unwrap_or("docs")),
        };
    }
}
