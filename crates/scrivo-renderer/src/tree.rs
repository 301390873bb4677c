//! Document tree.
//!
//! Built from pulldown-cmark events over preprocessed markdown. Directive
//! sentinels found in HTML blocks are swapped for their typed nodes here,
//! so the transform passes and the renderer only ever see closed enums.
//!
//! Nesting is capped while building. Every later pass recurses over the
//! tree, so containers past [`MAX_NESTING`] and inline spans past
//! [`MAX_INLINE_NESTING`] are flattened into their parent.

use pulldown_cmark::{BlockQuoteKind, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::PipelineError;
use crate::directive::fence::info_language;
use crate::directive::{CalloutKind, DirectiveNode, Sentinel, parse_sentinel};

/// Deepest block container nesting (quotes, lists, items, callouts).
pub(crate) const MAX_NESTING: usize = 128;

/// Deepest inline span nesting (emphasis, links and the like).
pub(crate) const MAX_INLINE_NESTING: usize = 64;

/// Parser extensions enabled for every document.
pub(crate) fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_GFM
        | Options::ENABLE_HEADING_ATTRIBUTES
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Document {
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Block {
    Heading(Heading),
    Paragraph(Vec<Inline>),
    /// Inline content of a tight list item.
    Plain(Vec<Inline>),
    Code(CodeBlock),
    Quote(Vec<Block>),
    List(List),
    Table(Table),
    Rule,
    /// Raw HTML from the source. Escaped on output.
    Html(String),
    Callout {
        kind: CalloutKind,
        title: Option<String>,
        children: Vec<Block>,
    },
    /// Pre-escaped markup from a directive.
    Api(String),
    /// Pre-escaped markup from a directive.
    Embed(String),
    Diagram(String),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Heading {
    pub level: u8,
    pub id: Option<String>,
    pub inlines: Vec<Inline>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub(crate) struct CodeBlock {
    pub lang: Option<String>,
    pub source: String,
    /// Header label, set by code decoration.
    pub label: Option<String>,
    /// Classed HTML, set by highlighting.
    pub highlighted: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct List {
    pub start: Option<u64>,
    pub items: Vec<ListItem>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub(crate) struct ListItem {
    pub task: Option<bool>,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Alignment {
    None,
    Left,
    Center,
    Right,
}

impl From<pulldown_cmark::Alignment> for Alignment {
    fn from(value: pulldown_cmark::Alignment) -> Self {
        match value {
            pulldown_cmark::Alignment::None => Self::None,
            pulldown_cmark::Alignment::Left => Self::Left,
            pulldown_cmark::Alignment::Center => Self::Center,
            pulldown_cmark::Alignment::Right => Self::Right,
        }
    }
}

pub(crate) type Cell = Vec<Inline>;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Table {
    pub alignments: Vec<Alignment>,
    pub head: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link {
        url: String,
        title: String,
        children: Vec<Inline>,
    },
    Image(Image),
    SoftBreak,
    HardBreak,
    /// Raw inline HTML. Escaped on output.
    Html(String),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Image {
    pub src: String,
    pub alt: String,
    pub title: String,
    pub rendition: Rendition,
}

/// How an image reference is emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Rendition {
    /// Untouched `<img>`.
    Original,
    /// `<img loading="lazy">` with no variants.
    Lazy,
    /// `<picture>` with width variants in `format` plus the original format.
    Responsive { widths: Vec<u32>, format: String },
}

/// Plain text of an inline run (used for slugs, outline text and alt text).
pub(crate) fn inline_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_inline_text(inlines, &mut out);
    out
}

fn push_inline_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children)
            | Inline::Link { children, .. } => push_inline_text(children, out),
            Inline::Image(image) => out.push_str(&image.alt),
            Inline::SoftBreak | Inline::HardBreak => out.push(' '),
            Inline::Html(_) => {}
        }
    }
}

/// Visit every block in document order, depth first.
pub(crate) fn walk_blocks_mut(blocks: &mut [Block], visit: &mut impl FnMut(&mut Block)) {
    for block in blocks {
        visit(block);
        match block {
            Block::Quote(children) | Block::Callout { children, .. } => {
                walk_blocks_mut(children, visit);
            }
            Block::List(list) => {
                for item in &mut list.items {
                    walk_blocks_mut(&mut item.blocks, visit);
                }
            }
            _ => {}
        }
    }
}

/// Visit every inline run in the document.
pub(crate) fn walk_inlines_mut(blocks: &mut [Block], visit: &mut impl FnMut(&mut Inline)) {
    walk_blocks_mut(blocks, &mut |block| match block {
        Block::Heading(Heading { inlines, .. }) | Block::Paragraph(inlines) | Block::Plain(inlines) => {
            visit_inlines(inlines, visit);
        }
        Block::Table(table) => {
            for cell in table.head.iter_mut().chain(table.rows.iter_mut().flatten()) {
                visit_inlines(cell, visit);
            }
        }
        _ => {}
    });
}

fn visit_inlines(inlines: &mut [Inline], visit: &mut impl FnMut(&mut Inline)) {
    for inline in inlines {
        visit(inline);
        match inline {
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children)
            | Inline::Link { children, .. } => visit_inlines(children, visit),
            _ => {}
        }
    }
}

/// Tree plus anything flattened or dropped on the way.
#[derive(Debug)]
pub(crate) struct Parsed {
    pub document: Document,
    pub warnings: Vec<String>,
}

/// Parse preprocessed markdown, resolving sentinels tagged `tag` against
/// `nodes`.
pub(crate) fn build(
    markdown: &str,
    nodes: Vec<DirectiveNode>,
    tag: &str,
) -> Result<Parsed, PipelineError> {
    let mut builder = Builder::new(nodes, tag);
    for event in Parser::new_ext(markdown, parser_options()) {
        builder.event(event);
    }
    builder.finish()
}

#[derive(Debug)]
enum ContainerKind {
    Root,
    Quote,
    Callout {
        kind: CalloutKind,
        title: Option<String>,
        sentinel: Option<usize>,
    },
    List {
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    Item {
        task: Option<bool>,
    },
}

#[derive(Debug)]
struct Container {
    kind: ContainerKind,
    blocks: Vec<Block>,
    /// Inline content outside any paragraph (tight list items).
    loose: Vec<Inline>,
}

impl Container {
    fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
            loose: Vec::new(),
        }
    }

    fn flush_loose(&mut self) {
        if !self.loose.is_empty() {
            let inlines = std::mem::take(&mut self.loose);
            self.blocks.push(Block::Plain(inlines));
        }
    }
}

#[derive(Debug)]
enum Span {
    /// Base of a paragraph, heading or table cell.
    Leaf,
    Emphasis,
    Strong,
    Strikethrough,
    /// Contents are spliced into the parent.
    Transparent,
    Link { url: String, title: String },
    Image { src: String, title: String },
}

#[derive(Debug)]
struct SpanFrame {
    span: Span,
    children: Vec<Inline>,
}

#[derive(Debug)]
enum LeafKind {
    Paragraph,
    Heading { level: u8, id: Option<String> },
    Cell,
}

#[derive(Debug, Default)]
struct TableFrame {
    alignments: Vec<Alignment>,
    head: Vec<Cell>,
    rows: Vec<Vec<Cell>>,
    row: Vec<Cell>,
}

struct Builder<'t> {
    nodes: Vec<Option<DirectiveNode>>,
    tag: &'t str,
    containers: Vec<Container>,
    /// Container starts past [`MAX_NESTING`] whose ends are still due.
    skipped: usize,
    flattened: bool,
    leaf: Option<LeafKind>,
    spans: Vec<SpanFrame>,
    code: Option<CodeBlock>,
    tables: Vec<TableFrame>,
}

impl<'t> Builder<'t> {
    fn new(nodes: Vec<DirectiveNode>, tag: &'t str) -> Self {
        Self {
            nodes: nodes.into_iter().map(Some).collect(),
            tag,
            containers: vec![Container::new(ContainerKind::Root)],
            skipped: 0,
            flattened: false,
            leaf: None,
            spans: Vec::new(),
            code: None,
            tables: Vec::new(),
        }
    }

    fn at_nesting_limit(&mut self) -> bool {
        if self.containers.len() > MAX_NESTING {
            self.flattened = true;
            true
        } else {
            false
        }
    }

    /// Swallow the end of a container start that was never opened.
    fn end_skipped(&mut self) -> bool {
        if self.skipped > 0 {
            self.skipped -= 1;
            true
        } else {
            false
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some(code) = &mut self.code {
                    code.source.push_str(&text);
                } else {
                    self.push_inline(Inline::Text(text.into_string()));
                }
            }
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.push_inline(Inline::Code(math.into_string()));
            }
            Event::Html(html) => self.html_block(&html),
            Event::InlineHtml(html) => self.push_inline(Inline::Html(html.into_string())),
            Event::FootnoteReference(label) => {
                self.push_inline(Inline::Text(format!("[^{label}]")));
            }
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => self.push_block(Block::Rule),
            Event::TaskListMarker(checked) => {
                if let Some(Container {
                    kind: ContainerKind::Item { task },
                    ..
                }) = self
                    .containers
                    .iter_mut()
                    .rev()
                    .find(|c| matches!(c.kind, ContainerKind::Item { .. }))
                {
                    *task = Some(checked);
                }
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.start_leaf(LeafKind::Paragraph),
            Tag::Heading { level, id, .. } => self.start_leaf(LeafKind::Heading {
                level: heading_level_to_num(level),
                id: id.map(|id| id.into_string()),
            }),
            Tag::BlockQuote(Some(kind)) => {
                let kind = callout_for_alert(kind);
                self.open(ContainerKind::Callout {
                    kind,
                    title: None,
                    sentinel: None,
                });
            }
            Tag::BlockQuote(None) => self.open(ContainerKind::Quote),
            Tag::CodeBlock(kind) => {
                let lang = match &kind {
                    CodeBlockKind::Fenced(info) => info_language(info).map(str::to_owned),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some(CodeBlock {
                    lang,
                    ..CodeBlock::default()
                });
            }
            Tag::List(start) => self.open(ContainerKind::List {
                start,
                items: Vec::new(),
            }),
            Tag::Item => self.open(ContainerKind::Item { task: None }),
            Tag::Table(alignments) => self.tables.push(TableFrame {
                alignments: alignments.into_iter().map(Alignment::from).collect(),
                ..TableFrame::default()
            }),
            Tag::TableCell => self.start_leaf(LeafKind::Cell),
            Tag::Emphasis => self.push_span(Span::Emphasis),
            Tag::Strong => self.push_span(Span::Strong),
            Tag::Strikethrough => self.push_span(Span::Strikethrough),
            Tag::Link {
                dest_url, title, ..
            } => self.push_span(Span::Link {
                url: dest_url.into_string(),
                title: title.into_string(),
            }),
            Tag::Image {
                dest_url, title, ..
            } => self.push_span(Span::Image {
                src: dest_url.into_string(),
                title: title.into_string(),
            }),
            Tag::Superscript | Tag::Subscript => self.push_span(Span::Transparent),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => self.end_leaf(),
            TagEnd::TableCell => {
                let cell = self.take_leaf_inlines();
                if let Some(table) = self.tables.last_mut() {
                    table.row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.tables.last_mut() {
                    table.head = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.tables.last_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.tables.pop() {
                    self.push_block(Block::Table(Table {
                        alignments: table.alignments,
                        head: table.head,
                        rows: table.rows,
                    }));
                }
            }
            TagEnd::CodeBlock => {
                if let Some(code) = self.code.take() {
                    self.push_block(Block::Code(code));
                }
            }
            TagEnd::BlockQuote(_) | TagEnd::List(_) | TagEnd::Item if self.end_skipped() => {}
            TagEnd::BlockQuote(_) => {
                self.close_until(|kind| {
                    matches!(
                        kind,
                        ContainerKind::Quote | ContainerKind::Callout { sentinel: None, .. }
                    )
                });
            }
            TagEnd::List(_) => self.close_until(|kind| matches!(kind, ContainerKind::List { .. })),
            TagEnd::Item => self.close_until(|kind| matches!(kind, ContainerKind::Item { .. })),
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image
            | TagEnd::Superscript
            | TagEnd::Subscript => self.pop_span(),
            _ => {}
        }
    }

    fn html_block(&mut self, html: &str) {
        let mut raw = String::new();
        for line in html.lines() {
            match parse_sentinel(line, self.tag) {
                Some(sentinel) => {
                    if !raw.is_empty() {
                        self.push_block(Block::Html(std::mem::take(&mut raw)));
                    }
                    self.sentinel(sentinel, line);
                }
                None => {
                    raw.push_str(line);
                    raw.push('\n');
                }
            }
        }
        if !raw.is_empty() {
            self.push_block(Block::Html(raw));
        }
    }

    fn sentinel(&mut self, sentinel: Sentinel, line: &str) {
        match sentinel {
            Sentinel::Open(index) => {
                match self.nodes.get_mut(index).and_then(Option::take) {
                    Some(DirectiveNode::Callout { kind, title }) => {
                        // Past the limit the body stays in the parent and
                        // the close sentinel finds nothing to close.
                        if !self.at_nesting_limit() {
                            self.open(ContainerKind::Callout {
                                kind,
                                title,
                                sentinel: Some(index),
                            });
                        }
                    }
                    Some(DirectiveNode::Api { html }) => self.push_block(Block::Api(html)),
                    Some(DirectiveNode::Embed { html }) => self.push_block(Block::Embed(html)),
                    Some(DirectiveNode::Diagram { source }) => {
                        self.push_block(Block::Diagram(source));
                    }
                    // Not a sentinel we issued; keep it as raw text.
                    None => self.push_block(Block::Html(format!("{}\n", line.trim()))),
                }
            }
            Sentinel::Close(index) => self.close_until(|kind| {
                matches!(kind, ContainerKind::Callout { sentinel: Some(i), .. } if *i == index)
            }),
        }
    }

    fn open(&mut self, kind: ContainerKind) {
        if self.at_nesting_limit() {
            self.skipped += 1;
            return;
        }
        if let Some(top) = self.containers.last_mut() {
            top.flush_loose();
        }
        self.containers.push(Container::new(kind));
    }

    /// Close containers down to and including the innermost one matching
    /// `pred`. Nothing happens when no open container matches.
    fn close_until(&mut self, pred: impl Fn(&ContainerKind) -> bool) {
        let Some(position) = self.containers.iter().rposition(|c| pred(&c.kind)) else {
            return;
        };
        if position == 0 {
            return;
        }
        while self.containers.len() > position {
            self.close_top();
        }
    }

    fn close_top(&mut self) {
        if self.containers.len() <= 1 {
            return;
        }
        let Some(mut container) = self.containers.pop() else {
            return;
        };
        container.flush_loose();
        let blocks = container.blocks;

        match container.kind {
            ContainerKind::Root => {}
            ContainerKind::Quote => self.push_block(Block::Quote(blocks)),
            ContainerKind::Callout { kind, title, .. } => self.push_block(Block::Callout {
                kind,
                title,
                children: blocks,
            }),
            ContainerKind::List { start, mut items } => {
                // Content of items skipped at the nesting limit.
                if !blocks.is_empty() {
                    items.push(ListItem { task: None, blocks });
                }
                self.push_block(Block::List(List { start, items }));
            }
            ContainerKind::Item { task } => {
                if let Some(Container {
                    kind: ContainerKind::List { items, .. },
                    ..
                }) = self.containers.last_mut()
                {
                    items.push(ListItem { task, blocks });
                } else {
                    for block in blocks {
                        self.push_block(block);
                    }
                }
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        if self.leaf.is_some() {
            self.end_leaf();
        }
        if let Some(top) = self.containers.last_mut() {
            top.flush_loose();
            top.blocks.push(block);
        }
    }

    fn start_leaf(&mut self, kind: LeafKind) {
        if self.leaf.is_some() {
            self.end_leaf();
        }
        // Spans left over from loose inline content belong to the container.
        while !self.spans.is_empty() {
            self.pop_span();
        }
        self.leaf = Some(kind);
        self.spans.push(SpanFrame {
            span: Span::Leaf,
            children: Vec::new(),
        });
    }

    /// Collapse all open spans into the leaf's inline run.
    fn take_leaf_inlines(&mut self) -> Vec<Inline> {
        self.leaf = None;
        while self.spans.len() > 1 {
            self.pop_span();
        }
        self.spans.pop().map(|frame| frame.children).unwrap_or_default()
    }

    fn end_leaf(&mut self) {
        let kind = self.leaf.take();
        let inlines = self.take_leaf_inlines();
        let block = match kind {
            Some(LeafKind::Heading { level, id }) => Block::Heading(Heading { level, id, inlines }),
            Some(LeafKind::Paragraph) => Block::Paragraph(inlines),
            Some(LeafKind::Cell) => {
                if let Some(table) = self.tables.last_mut() {
                    table.row.push(inlines);
                }
                return;
            }
            None => return,
        };
        self.push_block(block);
    }

    fn push_span(&mut self, span: Span) {
        let span = if self.spans.len() > MAX_INLINE_NESTING {
            self.flattened = true;
            Span::Transparent
        } else {
            span
        };
        self.spans.push(SpanFrame {
            span,
            children: Vec::new(),
        });
    }

    fn pop_span(&mut self) {
        if self.spans.len() <= 1 && self.leaf.is_some() {
            return;
        }
        let Some(frame) = self.spans.pop() else {
            return;
        };
        let children = frame.children;
        match frame.span {
            Span::Leaf | Span::Transparent => {
                for inline in children {
                    self.push_inline(inline);
                }
            }
            Span::Emphasis => self.push_inline(Inline::Emphasis(children)),
            Span::Strong => self.push_inline(Inline::Strong(children)),
            Span::Strikethrough => self.push_inline(Inline::Strikethrough(children)),
            Span::Link { url, title } => self.push_inline(Inline::Link {
                url,
                title,
                children,
            }),
            Span::Image { src, title } => self.push_inline(Inline::Image(Image {
                src,
                alt: inline_text(&children),
                title,
                rendition: Rendition::Original,
            })),
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        if let Some(frame) = self.spans.last_mut() {
            frame.children.push(inline);
        } else if let Some(top) = self.containers.last_mut() {
            top.loose.push(inline);
        }
    }

    fn finish(mut self) -> Result<Parsed, PipelineError> {
        if self.leaf.is_some() {
            self.end_leaf();
        }
        while !self.spans.is_empty() {
            self.pop_span();
        }
        if let Some(code) = self.code.take() {
            self.push_block(Block::Code(code));
        }
        while self.containers.len() > 1 {
            self.close_top();
        }
        let mut root = self.containers.pop().ok_or_else(|| PipelineError::Stage {
            stage: "parse",
            message: "document root missing".to_owned(),
        })?;
        root.flush_loose();

        let mut warnings = Vec::new();
        if self.flattened {
            warnings.push(format!(
                "nesting deeper than {MAX_NESTING} blocks or {MAX_INLINE_NESTING} inline spans was flattened"
            ));
        }
        Ok(Parsed {
            document: Document { blocks: root.blocks },
            warnings,
        })
    }
}

fn callout_for_alert(kind: BlockQuoteKind) -> CalloutKind {
    match kind {
        BlockQuoteKind::Note => CalloutKind::Note,
        BlockQuoteKind::Tip => CalloutKind::Tip,
        BlockQuoteKind::Important => CalloutKind::Info,
        BlockQuoteKind::Warning => CalloutKind::Warning,
        BlockQuoteKind::Caution => CalloutKind::Danger,
    }
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
