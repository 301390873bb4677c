//! Directive preprocessor.
//!
//! Runs in two passes over the lines of a document:
//!
//! 1. **Layout**: classify every line once, track code fences, and match
//!    container openers to closers with a stack (innermost open container
//!    wins). Block openers (`::mermaid`) are matched to the next bare `::`
//!    and their body is opaque.
//! 2. **Expand**: walk the matched structure, calling handlers and writing
//!    sentinels for every node they produce.
//!
//! Both passes are linear in the number of lines.

use std::ops::Range;

use super::fence::FenceTracker;
use super::{
    ApiDirective, Block, BlockDirective, CalloutDirective, DiagramDirective, DirectiveLine,
    DirectiveNode, DirectiveOutput, EmbedDirective, LeafDirective, classify, close_sentinel,
    open_sentinel, sentinel_tag,
};

/// Default limit on nested wrapping containers.
const DEFAULT_MAX_DEPTH: usize = 16;

/// Output of [`DirectiveProcessor::process`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Preprocessed {
    /// Markdown with directives replaced by sentinels.
    pub markdown: String,
    /// Nodes referenced by sentinel index.
    pub nodes: Vec<DirectiveNode>,
    /// Diagnostics such as unterminated containers.
    pub warnings: Vec<String>,
    /// Tag used in this document's sentinels.
    pub sentinel_tag: String,
}

/// Line-oriented directive expander.
///
/// Handlers are registered per syntax. The processor holds no per-document
/// state, so one instance can be shared across threads.
///
/// ```
/// use scrivo_renderer::directive::{DirectiveNode, DirectiveProcessor};
///
/// let processor = DirectiveProcessor::standard();
/// let out = processor.process(":::info\nRemember this.\n:::\n");
/// assert!(matches!(out.nodes[0], DirectiveNode::Callout { .. }));
/// assert!(out.markdown.contains("Remember this."));
/// ```
pub struct DirectiveProcessor {
    containers: Vec<Box<dyn BlockDirective>>,
    blocks: Vec<Box<dyn BlockDirective>>,
    leaves: Vec<Box<dyn LeafDirective>>,
    max_depth: usize,
}

impl Default for DirectiveProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DirectiveProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectiveProcessor")
            .field("containers", &self.containers.len())
            .field("blocks", &self.blocks.len())
            .field("leaves", &self.leaves.len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl DirectiveProcessor {
    /// Processor with no handlers: every directive stays literal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            containers: Vec::new(),
            blocks: Vec::new(),
            leaves: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Processor with callouts, API blocks, embeds and diagrams.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_container(CalloutDirective)
            .with_container(ApiDirective)
            .with_block(DiagramDirective)
            .with_leaf(EmbedDirective)
    }

    /// Register a `:::name` ... `:::` handler.
    #[must_use]
    pub fn with_container<D: BlockDirective + 'static>(mut self, handler: D) -> Self {
        self.containers.push(Box::new(handler));
        self
    }

    /// Register a `::name` ... `::` handler.
    #[must_use]
    pub fn with_block<D: BlockDirective + 'static>(mut self, handler: D) -> Self {
        self.blocks.push(Box::new(handler));
        self
    }

    /// Register a `::name[label]{attrs}` handler.
    #[must_use]
    pub fn with_leaf<D: LeafDirective + 'static>(mut self, handler: D) -> Self {
        self.leaves.push(Box::new(handler));
        self
    }

    /// Limit how deep wrapping containers may nest. Deeper openers stay literal.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    fn container(&self, name: &str) -> Option<&dyn BlockDirective> {
        self.containers
            .iter()
            .find(|h| h.handles(name))
            .map(AsRef::as_ref)
    }

    fn block(&self, name: &str) -> Option<&dyn BlockDirective> {
        self.blocks.iter().find(|h| h.handles(name)).map(AsRef::as_ref)
    }

    fn leaf(&self, name: &str) -> Option<&dyn LeafDirective> {
        self.leaves.iter().find(|h| h.handles(name)).map(AsRef::as_ref)
    }

    /// Expand all directives in `input`.
    #[must_use]
    pub fn process(&self, input: &str) -> Preprocessed {
        let layout = self.layout(input);
        let mut run = Run {
            tag: sentinel_tag(input),
            ..Run::default()
        };
        self.expand(&layout, 0..layout.lines.len(), 0, &mut run);

        if input.ends_with('\n') && !run.markdown.is_empty() {
            run.markdown.push('\n');
        }

        Preprocessed {
            markdown: run.markdown,
            nodes: run.nodes,
            warnings: run.warnings,
            sentinel_tag: run.tag,
        }
    }

    fn layout<'a>(&self, input: &'a str) -> Layout<'a> {
        let lines: Vec<&str> = input.lines().collect();
        let count = lines.len();

        // Nearest bare `::` at or after each index.
        let mut next_block_close = vec![None; count + 1];
        for i in (0..count).rev() {
            next_block_close[i] = if classify(lines[i]) == Some(DirectiveLine::BlockClose) {
                Some(i)
            } else {
                next_block_close[i + 1]
            };
        }

        let mut kinds = Vec::with_capacity(count);
        let mut close = vec![None; count];
        let mut matched = vec![false; count];
        let mut fence = FenceTracker::new();
        let mut open_containers = Vec::new();

        let mut i = 0;
        while i < count {
            let line = lines[i];
            if fence.in_fence() {
                fence.update(line);
                kinds.push(LineKind::Literal);
                i += 1;
                continue;
            }

            let Some(directive) = classify(line) else {
                fence.update(line);
                kinds.push(LineKind::Literal);
                i += 1;
                continue;
            };

            let block_end = match &directive {
                DirectiveLine::ContainerOpen { .. } => {
                    open_containers.push(i);
                    None
                }
                DirectiveLine::ContainerClose => {
                    if let Some(open) = open_containers.pop() {
                        close[open] = Some(i);
                        matched[i] = true;
                    }
                    None
                }
                DirectiveLine::BlockOpen { name } if self.block(name).is_some() => {
                    next_block_close[i + 1]
                }
                _ => None,
            };

            kinds.push(LineKind::Directive(directive));
            match block_end {
                Some(end) => {
                    close[i] = Some(end);
                    // Block bodies are opaque: no fences, no directives.
                    kinds.extend((i + 1..=end).map(|_| LineKind::Literal));
                    i = end + 1;
                }
                None => i += 1,
            }
        }

        Layout {
            lines,
            kinds,
            close,
            matched,
        }
    }

    fn expand(&self, layout: &Layout<'_>, range: Range<usize>, depth: usize, run: &mut Run) {
        let end = range.end;
        let mut i = range.start;
        while i < end {
            i = match &layout.kinds[i] {
                LineKind::Literal => {
                    run.push_line(layout.lines[i]);
                    i + 1
                }
                LineKind::Directive(directive) => {
                    self.expand_directive(layout, i, directive, end, depth, run)
                }
            };
        }
    }

    /// Expand the directive on line `i`, returning the next line to process.
    fn expand_directive(
        &self,
        layout: &Layout<'_>,
        i: usize,
        directive: &DirectiveLine<'_>,
        end: usize,
        depth: usize,
        run: &mut Run,
    ) -> usize {
        let line = layout.lines[i];
        let line_no = i + 1;

        match directive {
            DirectiveLine::ContainerOpen { name, header } => {
                let Some(handler) = self.container(name) else {
                    run.push_line(line);
                    return i + 1;
                };
                let Some(close) = layout.close[i].filter(|&c| c < end) else {
                    run.warn(format!(
                        "line {line_no}: unterminated :::{name} (missing closing :::)"
                    ));
                    run.push_line(line);
                    return i + 1;
                };
                if depth >= self.max_depth {
                    run.warn(format!(
                        "line {line_no}: :::{name} nested deeper than {} levels",
                        self.max_depth
                    ));
                    run.push_line(line);
                    return i + 1;
                }

                let body = layout.lines[i + 1..close].join("\n");
                let block = Block {
                    name,
                    header,
                    body: &body,
                    single_line: false,
                    line: line_no,
                };
                match handler.render(&block) {
                    DirectiveOutput::Wrap { node, body: None } => {
                        let index = run.open(line, node);
                        self.expand(layout, i + 1..close, depth + 1, run);
                        run.close(line, index);
                        close + 1
                    }
                    DirectiveOutput::Wrap {
                        node,
                        body: Some(text),
                    } => {
                        let index = run.open(line, node);
                        run.push_line(&text);
                        run.close(line, index);
                        close + 1
                    }
                    DirectiveOutput::Replace(node) => {
                        run.replace(line, node);
                        close + 1
                    }
                    DirectiveOutput::Skip => {
                        run.push_line(line);
                        i + 1
                    }
                }
            }
            DirectiveLine::ContainerInline { name, header } => {
                let Some(handler) = self.container(name) else {
                    run.push_line(line);
                    return i + 1;
                };
                let block = Block {
                    name,
                    header,
                    body: "",
                    single_line: true,
                    line: line_no,
                };
                match handler.render(&block) {
                    DirectiveOutput::Wrap { node, body } => {
                        let index = run.open(line, node);
                        if let Some(text) = body.filter(|t| !t.is_empty()) {
                            run.push_line(&text);
                        }
                        run.close(line, index);
                    }
                    DirectiveOutput::Replace(node) => run.replace(line, node),
                    DirectiveOutput::Skip => run.push_line(line),
                }
                i + 1
            }
            DirectiveLine::ContainerClose => {
                if !layout.matched[i] {
                    run.warn(format!("line {line_no}: stray ::: with no open container"));
                }
                run.push_line(line);
                i + 1
            }
            DirectiveLine::Leaf { name, args } => {
                match self.leaf(name).map(|h| h.render(name, args)) {
                    Some(DirectiveOutput::Replace(node)) => run.replace(line, node),
                    _ => run.push_line(line),
                }
                i + 1
            }
            DirectiveLine::BlockOpen { name } => {
                let handler = self.block(name);
                let Some(close) = layout.close[i].filter(|&c| c < end) else {
                    if handler.is_some() {
                        run.warn(format!("line {line_no}: unterminated ::{name} (missing closing ::)"));
                    }
                    run.push_line(line);
                    return i + 1;
                };

                let body = layout.lines[i + 1..close].join("\n");
                let block = Block {
                    name,
                    header: "",
                    body: &body,
                    single_line: false,
                    line: line_no,
                };
                match handler.map(|h| h.render(&block)) {
                    Some(DirectiveOutput::Replace(node)) => run.replace(line, node),
                    _ => {
                        for literal in &layout.lines[i..=close] {
                            run.push_line(literal);
                        }
                    }
                }
                close + 1
            }
            DirectiveLine::BlockClose => {
                run.push_line(line);
                i + 1
            }
        }
    }
}

#[derive(Debug)]
enum LineKind<'a> {
    /// Emitted unchanged (text, fenced code, opaque block bodies).
    Literal,
    Directive(DirectiveLine<'a>),
}

#[derive(Debug)]
struct Layout<'a> {
    lines: Vec<&'a str>,
    kinds: Vec<LineKind<'a>>,
    /// Matching closer for container and block openers.
    close: Vec<Option<usize>>,
    /// Closers that matched some opener.
    matched: Vec<bool>,
}

/// Per-call output buffer.
#[derive(Debug, Default)]
struct Run {
    markdown: String,
    nodes: Vec<DirectiveNode>,
    warnings: Vec<String>,
    tag: String,
    started: bool,
}

impl Run {
    fn push_line(&mut self, line: &str) {
        if self.started {
            self.markdown.push('\n');
        }
        self.started = true;
        self.markdown.push_str(line);
    }

    fn push_node(&mut self, node: DirectiveNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Emit an opening sentinel with the indentation of `source_line`.
    fn open(&mut self, source_line: &str, node: DirectiveNode) -> usize {
        let index = self.push_node(node);
        let sentinel = format!("{}{}", indent_of(source_line), open_sentinel(&self.tag, index));
        self.push_line(&sentinel);
        index
    }

    fn close(&mut self, source_line: &str, index: usize) {
        let sentinel = format!("{}{}", indent_of(source_line), close_sentinel(&self.tag, index));
        self.push_line(&sentinel);
    }

    fn replace(&mut self, source_line: &str, node: DirectiveNode) {
        self.open(source_line, node);
    }

    fn warn(&mut self, message: String) {
        tracing::debug!(%message, "Directive warning");
        self.warnings.push(message);
    }
}

fn indent_of(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::CalloutKind;
    use pretty_assertions::assert_eq;

    fn process(input: &str) -> Preprocessed {
        DirectiveProcessor::standard().process(input)
    }

    #[test]
    fn test_plain_markdown_unchanged() {
        let input = "# Title\n\nSome *text*.\n";
        let out = process(input);
        assert_eq!(out.markdown, input);
        assert!(out.nodes.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_callout_wraps_body() {
        let out = process(":::info\nNote\n:::");
        assert_eq!(out.markdown, "<!--scrivo:0-->\nNote\n<!--/scrivo:0-->");
        assert_eq!(
            out.nodes,
            vec![DirectiveNode::Callout {
                kind: CalloutKind::Info,
                title: None
            }]
        );
    }

    #[test]
    fn test_nested_callouts() {
        let out = process(":::warning\nOuter\n:::tip\nInner\n:::\nAfter\n:::");
        assert_eq!(
            out.markdown,
            "<!--scrivo:0-->\nOuter\n<!--scrivo:1-->\nInner\n<!--/scrivo:1-->\nAfter\n<!--/scrivo:0-->"
        );
        assert_eq!(out.nodes.len(), 2);
    }

    #[test]
    fn test_unterminated_callout_is_literal() {
        let out = process(":::info\nNo closer here");
        assert_eq!(out.markdown, ":::info\nNo closer here");
        assert!(out.nodes.is_empty());
        assert!(out.warnings.iter().any(|w| w.contains("unterminated")));
    }

    #[test]
    fn test_unterminated_outer_keeps_inner() {
        let out = process(":::info\n:::note\nInner\n:::");
        assert_eq!(out.markdown, ":::info\n<!--scrivo:0-->\nInner\n<!--/scrivo:0-->");
    }

    #[test]
    fn test_stray_closer_is_literal() {
        let out = process("Text\n:::");
        assert_eq!(out.markdown, "Text\n:::");
        assert!(out.warnings.iter().any(|w| w.contains("stray")));
    }

    #[test]
    fn test_closer_inside_code_fence_ignored() {
        let out = process(":::info\n```\n:::\n```\nstill inside\n:::");
        assert_eq!(
            out.markdown,
            "<!--scrivo:0-->\n```\n:::\n```\nstill inside\n<!--/scrivo:0-->"
        );
    }

    #[test]
    fn test_directives_in_code_fence_untouched() {
        let input = "```md\n:::info\nx\n:::\n::youtube[a]{id=b}\n```";
        let out = process(input);
        assert_eq!(out.markdown, input);
        assert!(out.nodes.is_empty());
    }

    #[test]
    fn test_unknown_container_literal() {
        let out = process(":::details\nBody\n:::");
        assert_eq!(out.markdown, ":::details\nBody\n:::");
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_unknown_container_nested_in_callout() {
        let out = process(":::info\n:::details\nBody\n:::\n:::");
        assert_eq!(
            out.markdown,
            "<!--scrivo:0-->\n:::details\nBody\n:::\n<!--/scrivo:0-->"
        );
    }

    #[test]
    fn test_single_line_callout() {
        let out = process(":::tip Use the CLI :::");
        assert_eq!(out.markdown, "<!--scrivo:0-->\nUse the CLI\n<!--/scrivo:0-->");
    }

    #[test]
    fn test_api_block_replaced() {
        let out = process(":::api GET /users\nList users.\n\nPaged.\n:::\nAfter");
        assert_eq!(out.markdown, "<!--scrivo:0-->\nAfter");
        assert!(matches!(&out.nodes[0], DirectiveNode::Api { html } if html.contains("List users.")));
    }

    #[test]
    fn test_api_block_bad_method_literal() {
        let out = process(":::api FETCH /users\nBody\n:::");
        assert_eq!(out.markdown, ":::api FETCH /users\nBody\n:::");
    }

    #[test]
    fn test_leaf_embed() {
        let out = process("Intro\n::youtube[My Vid]{id=abc123XYZ90}\nOutro");
        assert_eq!(out.markdown, "Intro\n<!--scrivo:0-->\nOutro");
        assert!(matches!(&out.nodes[0], DirectiveNode::Embed { html } if html.contains("abc123XYZ90")));
    }

    #[test]
    fn test_unknown_leaf_literal() {
        let out = process("::tweet[x]{id=1}");
        assert_eq!(out.markdown, "::tweet[x]{id=1}");
    }

    #[test]
    fn test_mermaid_block() {
        let out = process("::mermaid\ngraph TD\n:::\nA-->B\n::\nAfter");
        assert_eq!(out.markdown, "<!--scrivo:0-->\nAfter");
        assert_eq!(
            out.nodes,
            vec![DirectiveNode::Diagram {
                source: "graph TD\n:::\nA-->B".to_owned()
            }]
        );
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_unterminated_mermaid_literal() {
        let out = process("::mermaid\ngraph TD");
        assert_eq!(out.markdown, "::mermaid\ngraph TD");
        assert!(out.warnings.iter().any(|w| w.contains("unterminated")));
    }

    #[test]
    fn test_indented_callout_keeps_indent() {
        let out = process("- item\n\n  :::note\n  Nested\n  :::");
        assert_eq!(
            out.markdown,
            "- item\n\n  <!--scrivo:0-->\n  Nested\n  <!--/scrivo:0-->"
        );
    }

    #[test]
    fn test_indented_code_directive_stays_literal() {
        let source = "Example:\n\n    :::info\n    body\n    :::";
        let out = process(source);
        assert_eq!(out.markdown, source);
        assert!(out.nodes.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let processor = DirectiveProcessor::standard().with_max_depth(1);
        let out = processor.process(":::info\n:::note\nx\n:::\n:::");
        assert_eq!(
            out.markdown,
            "<!--scrivo:0-->\n:::note\nx\n:::\n<!--/scrivo:0-->"
        );
        assert!(out.warnings.iter().any(|w| w.contains("nested deeper")));
    }

    #[test]
    fn test_many_unterminated_openers_linear() {
        let input = ":::info\n".repeat(20_000);
        let out = process(&input);
        assert_eq!(out.markdown, input);
        assert_eq!(out.warnings.len(), 20_000);
    }

    #[test]
    fn test_sentinel_tag_changes_when_source_mentions_it() {
        let out = process("<!--scrivo:0-->\n:::info\nNote\n:::");
        assert_ne!(out.sentinel_tag, "scrivo");
        assert_eq!(
            out.markdown,
            format!(
                "<!--scrivo:0-->\n<!--{tag}:0-->\nNote\n<!--/{tag}:0-->",
                tag = out.sentinel_tag
            )
        );
    }

    #[test]
    fn test_trailing_newline_preserved() {
        assert_eq!(process("a\n").markdown, "a\n");
        assert_eq!(process("a").markdown, "a");
    }
}
