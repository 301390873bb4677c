//! In-page heading outline.

use serde::{Deserialize, Serialize};

use crate::tree::{Block, Document, inline_text};

/// One entry of the outline: an H2 with its H3 children, or an H3.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineItem {
    pub id: String,
    pub text: String,
    pub level: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineItem>,
}

/// Collect H2 and H3 headings. An H3 nests under the nearest preceding H2
/// and is dropped when there is none.
pub(crate) fn collect(doc: &Document) -> Vec<OutlineItem> {
    let mut outline: Vec<OutlineItem> = Vec::new();
    collect_blocks(&doc.blocks, &mut outline);
    outline
}

fn collect_blocks(blocks: &[Block], outline: &mut Vec<OutlineItem>) {
    for block in blocks {
        match block {
            Block::Heading(heading) if matches!(heading.level, 2 | 3) => {
                let item = OutlineItem {
                    id: heading.id.clone().unwrap_or_default(),
                    text: inline_text(&heading.inlines).trim().to_owned(),
                    level: heading.level,
                    children: Vec::new(),
                };
                if item.level == 2 {
                    outline.push(item);
                } else if let Some(parent) = outline.last_mut() {
                    parent.children.push(item);
                }
            }
            Block::Quote(children) | Block::Callout { children, .. } => {
                collect_blocks(children, outline);
            }
            Block::List(list) => {
                for item in &list.items {
                    collect_blocks(&item.blocks, outline);
                }
            }
            _ => {}
        }
    }
}
