//! CLI command implementations.

pub(crate) mod render;
pub(crate) mod text;
pub(crate) mod toc;
pub(crate) mod warm;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, ValueEnum};
use scrivo_config::{CliSettings, Config};
use scrivo_renderer::{DocumentRenderer, Environment, RenderOutput};
use scrivo_site::ContentCache;

use crate::error::CliError;
use crate::output::Output;

pub(crate) use render::RenderArgs;
pub(crate) use text::TextArgs;
pub(crate) use toc::TocArgs;
pub(crate) use warm::WarmArgs;

/// Rendering environment as accepted on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum EnvironmentArg {
    Development,
    Production,
}

impl From<EnvironmentArg> for Environment {
    fn from(arg: EnvironmentArg) -> Self {
        match arg {
            EnvironmentArg::Development => Self::Development,
            EnvironmentArg::Production => Self::Production,
        }
    }
}

/// Configuration options shared by every command.
#[derive(Args)]
pub(crate) struct ConfigArgs {
    /// Path to configuration file (default: auto-discover scrivo.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rendering environment; development shows error details (overrides config).
    #[arg(long, value_enum, env = "SCRIVO_ENV")]
    environment: Option<EnvironmentArg>,

    /// Asset service endpoint for images (overrides config).
    #[arg(long)]
    asset_endpoint: Option<String>,

    /// Size guard threshold in bytes (overrides config).
    #[arg(long)]
    max_source_bytes: Option<usize>,

    /// Disable syntax highlighting.
    #[arg(long)]
    no_highlight: bool,

    /// Enable verbose output (info-level logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ConfigArgs {
    /// Load configuration with command-line overrides applied.
    pub(crate) fn load(&self, source_dir: Option<PathBuf>) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            source_dir,
            environment: self.environment.map(Environment::from),
            max_source_bytes: self.max_source_bytes,
            asset_endpoint: self.asset_endpoint.clone(),
            highlight: self.no_highlight.then_some(false),
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}

/// Build a filesystem-backed cache for `config`.
pub(crate) fn content_cache(config: &Config) -> ContentCache {
    ContentCache::with_fs(DocumentRenderer::new(config.render_options()))
}

/// Arguments for commands that operate on one document.
#[derive(Args)]
pub(crate) struct DocumentArgs {
    /// Markdown file to process.
    file: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl DocumentArgs {
    /// Load config and render the document.
    ///
    /// Recovered problems are reported on stderr; the output itself is
    /// always usable.
    pub(crate) fn render(&self, output: &Output) -> Result<Arc<RenderOutput>, CliError> {
        let config = self.config.load(None)?;
        let path = std::path::absolute(&self.file)?;
        let rendered = content_cache(&config).get(&path)?;
        report(output, &path, &rendered);
        Ok(rendered)
    }
}

/// Print status and warnings for one rendered document.
pub(crate) fn report(output: &Output, path: &Path, rendered: &RenderOutput) {
    if !rendered.is_complete() {
        output.warning(&format!(
            "{}: rendered with status {}",
            path.display(),
            rendered.status.as_str()
        ));
    }
    for warning in &rendered.warnings {
        output.warning(&format!("{}: {warning}", path.display()));
    }
}
