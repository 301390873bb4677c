//! Diagram blocks: `::mermaid` ... `::`.
//!
//! The source is kept verbatim and rendered into a container for
//! client-side rendering. It is never highlighted as code.

use super::{Block, BlockDirective, DirectiveNode, DirectiveOutput};

/// Languages rendered as diagrams, both as `::name` blocks and as fenced code.
pub(crate) const DIAGRAM_LANGUAGES: &[&str] = &["mermaid"];

#[derive(Debug, Default)]
pub struct DiagramDirective;

impl BlockDirective for DiagramDirective {
    fn handles(&self, name: &str) -> bool {
        DIAGRAM_LANGUAGES.contains(&name)
    }

    fn render(&self, block: &Block<'_>) -> DirectiveOutput {
        DirectiveOutput::Replace(DirectiveNode::Diagram {
            source: block.body.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kept_verbatim() {
        let block = Block {
            name: "mermaid",
            header: "",
            body: "graph TD\n  A-->B\n\n  B-->C",
            single_line: false,
            line: 3,
        };
        assert_eq!(
            DiagramDirective.render(&block),
            DirectiveOutput::Replace(DirectiveNode::Diagram {
                source: "graph TD\n  A-->B\n\n  B-->C".to_owned()
            })
        );
    }

    #[test]
    fn test_handles_only_mermaid() {
        assert!(DiagramDirective.handles("mermaid"));
        assert!(!DiagramDirective.handles("plantuml"));
    }
}
