//! `scrivo render` command implementation.

use clap::{Args, ValueEnum};

use super::DocumentArgs;
use crate::error::CliError;
use crate::output::Output;

/// Output format for the render command.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub(crate) enum RenderFormat {
    /// HTML fragment only.
    #[default]
    Html,
    /// Full render output as JSON.
    Json,
}

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t)]
    format: RenderFormat,
}

impl RenderArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let rendered = self.document.render(&output)?;
        match self.format {
            RenderFormat::Html => output.document(&rendered.html)?,
            RenderFormat::Json => output.document(&serde_json::to_string_pretty(&*rendered)?)?,
        }
        Ok(())
    }
}
