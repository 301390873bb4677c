//! `scrivo text` command implementation.

use clap::Args;

use super::DocumentArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the text command.
#[derive(Args)]
pub(crate) struct TextArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    /// Prefix the text with the resolved title.
    #[arg(long)]
    with_title: bool,
}

impl TextArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let rendered = self.document.render(&output)?;
        if self.with_title {
            output.document(&format!("{}\n\n{}", rendered.title, rendered.plain_text))?;
        } else {
            output.document(&rendered.plain_text)?;
        }
        Ok(())
    }
}
