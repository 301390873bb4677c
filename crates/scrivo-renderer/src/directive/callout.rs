//! Callout containers: `:::info` ... `:::`.

use serde::{Deserialize, Serialize};

use super::{Block, BlockDirective, DirectiveNode, DirectiveOutput};

/// Callout flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalloutKind {
    Info,
    Warning,
    Error,
    Success,
    Tip,
    Note,
    Danger,
}

impl CalloutKind {
    pub const ALL: [Self; 7] = [
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Success,
        Self::Tip,
        Self::Note,
        Self::Danger,
    ];

    /// Parse the directive name (`info`, `warning`, ...). Case-sensitive.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
            Self::Tip => "tip",
            Self::Note => "note",
            Self::Danger => "danger",
        }
    }

    /// Default heading shown when the author gives no title.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Success => "Success",
            Self::Tip => "Tip",
            Self::Note => "Note",
            Self::Danger => "Danger",
        }
    }
}

/// Handler for the seven callout containers.
///
/// `:::warning[Heads up]` and `:::warning Heads up` both set a custom title.
/// The single-line form `:::tip Use the CLI :::` makes the text the body.
#[derive(Debug, Default)]
pub struct CalloutDirective;

impl BlockDirective for CalloutDirective {
    fn handles(&self, name: &str) -> bool {
        CalloutKind::from_name(name).is_some()
    }

    fn render(&self, block: &Block<'_>) -> DirectiveOutput {
        let Some(kind) = CalloutKind::from_name(block.name) else {
            return DirectiveOutput::Skip;
        };

        if block.single_line {
            return DirectiveOutput::Wrap {
                node: DirectiveNode::Callout { kind, title: None },
                body: Some(block.header.to_owned()),
            };
        }

        let header = block.header.trim();
        let title = header
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(header)
            .trim();

        DirectiveOutput::Wrap {
            node: DirectiveNode::Callout {
                kind,
                title: (!title.is_empty()).then(|| title.to_owned()),
            },
            body: None,
        }
    }
}
