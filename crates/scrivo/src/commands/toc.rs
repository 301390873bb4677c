//! `scrivo toc` command implementation.

use clap::Args;

use super::DocumentArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the toc command.
#[derive(Args)]
pub(crate) struct TocArgs {
    #[command(flatten)]
    pub document: DocumentArgs,
}

impl TocArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let rendered = self.document.render(&output)?;
        output.document(&serde_json::to_string_pretty(&rendered.toc)?)?;
        Ok(())
    }
}
