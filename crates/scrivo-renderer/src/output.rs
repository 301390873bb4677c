//! Render output.

use serde::Serialize;

use crate::frontmatter::Frontmatter;
use crate::transform::OutlineItem;

/// How a [`RenderOutput`] was produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    /// Full pipeline ran.
    #[default]
    Complete,
    /// Source exceeded the size guard and was not parsed.
    Truncated,
    /// A pipeline stage failed; markup shows the raw source.
    Degraded,
}

impl RenderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Truncated => "truncated",
            Self::Degraded => "degraded",
        }
    }
}

/// Everything produced for one document.
///
/// Immutable once built. The cache shares it behind an `Arc`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    pub html: String,
    pub toc: Vec<OutlineItem>,
    pub frontmatter: Frontmatter,
    pub plain_text: String,
    pub title: String,
    /// Body after the frontmatter header.
    pub raw_body: String,
    pub order: i64,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub draft: bool,
    pub status: RenderStatus,
    /// Recovered problems: frontmatter decode failures, unterminated
    /// directives and the like.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RenderOutput {
    /// Rough heap footprint, used for cache statistics.
    #[must_use]
    pub fn approx_bytes(&self) -> usize {
        fn outline_bytes(items: &[OutlineItem]) -> usize {
            items
                .iter()
                .map(|item| item.id.len() + item.text.len() + outline_bytes(&item.children))
                .sum()
        }

        self.html.len()
            + self.plain_text.len()
            + self.raw_body.len()
            + self.title.len()
            + self.excerpt.len()
            + self.description.as_ref().map_or(0, String::len)
            + self.warnings.iter().map(String::len).sum::<usize>()
            + outline_bytes(&self.toc)
            + std::mem::size_of::<Self>()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == RenderStatus::Complete
    }
}
