//! Code block decoration.
//!
//! Fenced code tagged with a diagram language turns into a diagram node.
//! Every other code block gets a header label naming its language.

use crate::directive::DIAGRAM_LANGUAGES;
use crate::tree::{Block, Document, walk_blocks_mut};

/// Label for code with no declared language.
const PLAIN_LABEL: &str = "text";

pub(crate) fn decorate(doc: &mut Document) {
    walk_blocks_mut(&mut doc.blocks, &mut |block| {
        let Block::Code(code) = block else {
            return;
        };
        if code
            .lang
            .as_deref()
            .is_some_and(|lang| DIAGRAM_LANGUAGES.contains(&lang))
        {
            let source = std::mem::take(&mut code.source);
            *block = Block::Diagram(source.trim_end_matches('\n').to_owned());
            return;
        }
        code.label = Some(code.lang.clone().unwrap_or_else(|| PLAIN_LABEL.to_owned()));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::CodeBlock;
    use pretty_assertions::assert_eq;

    fn code(lang: Option<&str>, source: &str) -> Block {
        Block::Code(CodeBlock {
            lang: lang.map(str::to_owned),
            source: source.to_owned(),
            ..CodeBlock::default()
        })
    }

    #[test]
    fn test_mermaid_fence_becomes_diagram() {
        let mut doc = Document {
            blocks: vec![code(Some("mermaid"), "graph TD\n  A-->B\n")],
        };
        decorate(&mut doc);
        assert_eq!(doc.blocks, vec![Block::Diagram("graph TD\n  A-->B".to_owned())]);
    }

    #[test]
    fn test_labels() {
        let mut doc = Document {
            blocks: vec![code(Some("rust"), "fn x() {}\n"), code(None, "plain\n")],
        };
        decorate(&mut doc);
        let labels: Vec<_> = doc
            .blocks
            .iter()
            .map(|b| match b {
                Block::Code(c) => c.label.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec![Some("rust".to_owned()), Some("text".to_owned())]);
    }
}
