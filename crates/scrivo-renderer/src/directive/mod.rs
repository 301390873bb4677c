//! Directive preprocessing.
//!
//! Custom block syntax is rewritten before structural parsing:
//!
//! - **Callouts**: `:::info` ... `:::` (also warning, error, success, tip,
//!   note, danger)
//! - **API blocks**: `:::api METHOD PATH`, summary line, blank line,
//!   description, `:::`
//! - **Embeds**: `::youtube[Title]{id=ID}`, `::embed[Title]{url=URL}`
//! - **Diagrams**: `::mermaid` ... `::`
//!
//! # Intermediate form
//!
//! The preprocessor does not emit final markup. Each expanded directive
//! becomes a [`DirectiveNode`] stored in a side table, and the markdown
//! gets an HTML comment sentinel pointing at it (`<!--scrivo:3-->`).
//! When the source itself mentions the tag, a hash of the source is added
//! to it (`<!--scrivo-1f..:3-->`) so typed-in comments never match.
//! Wrapping directives (callouts) also get a closing sentinel
//! (`<!--/scrivo:3-->`) with their body left in place as markdown. Comments
//! are HTML blocks that the parser passes through untouched, so nothing in
//! a node is re-escaped or re-interpreted; the tree builder swaps the
//! sentinels back for typed nodes.
//!
//! # Fencing
//!
//! Container openers nest: every `:::name` line pushes, every bare `:::`
//! line closes the innermost open container. A `:::` line with nothing open
//! stays literal text, as does an opener that is never closed. Lines inside
//! fenced code are never directives, so a literal `:::` inside a callout
//! must sit in a code fence.

use std::hash::{DefaultHasher, Hash, Hasher};

mod api;
mod args;
mod callout;
mod diagram;
mod embed;
pub(crate) mod fence;
mod parser;
mod processor;

pub use api::{ApiDirective, HttpMethod};
pub use args::DirectiveArgs;
pub use callout::{CalloutDirective, CalloutKind};
pub use diagram::DiagramDirective;
pub use embed::{EmbedDirective, Provider, provider_for_url};
pub use processor::{DirectiveProcessor, Preprocessed};

pub(crate) use diagram::DIAGRAM_LANGUAGES;
pub(crate) use embed::describe_leaf;
pub(crate) use parser::{DirectiveLine, classify};

/// Typed result of expanding one directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveNode {
    /// Wrapper around a markdown body.
    Callout {
        kind: CalloutKind,
        title: Option<String>,
    },
    /// Pre-escaped API endpoint markup.
    Api { html: String },
    /// Pre-escaped media embed or link card markup.
    Embed { html: String },
    /// Diagram source, kept verbatim.
    Diagram { source: String },
}

/// What a handler wants done with a directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveOutput {
    /// Keep the body as markdown and wrap it in `node`.
    ///
    /// `body` replaces the source body when set (used by the single-line
    /// container form, whose text lives in the header).
    Wrap {
        node: DirectiveNode,
        body: Option<String>,
    },
    /// Replace the whole directive, body included, with `node`.
    Replace(DirectiveNode),
    /// Not handled; the source lines stay literal.
    Skip,
}

/// A container or block directive as seen by its handler.
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    pub name: &'a str,
    /// Text after the name on the opening line.
    pub header: &'a str,
    /// Lines between opener and closer, joined with `\n`.
    pub body: &'a str,
    /// True for the `:::name text :::` form.
    pub single_line: bool,
    /// 1-based line of the opener.
    pub line: usize,
}

/// Handler for `:::name` containers and `::name` ... `::` blocks.
pub trait BlockDirective: Send + Sync {
    fn handles(&self, name: &str) -> bool;

    fn render(&self, block: &Block<'_>) -> DirectiveOutput;
}

/// Handler for single-line `::name[label]{attrs}` directives.
pub trait LeafDirective: Send + Sync {
    fn handles(&self, name: &str) -> bool;

    fn render(&self, name: &str, args: &DirectiveArgs) -> DirectiveOutput;
}

const SENTINEL_TAG: &str = "scrivo";
const SENTINEL_START: &str = "<!--";
const SENTINEL_END: &str = "-->";

/// Sentinel tag that no line of `input` can contain.
pub(crate) fn sentinel_tag(input: &str) -> String {
    if !input.contains(SENTINEL_TAG) {
        return SENTINEL_TAG.to_owned();
    }
    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    format!("{SENTINEL_TAG}-{:016x}", hasher.finish())
}

pub(crate) fn open_sentinel(tag: &str, index: usize) -> String {
    format!("{SENTINEL_START}{tag}:{index}{SENTINEL_END}")
}

pub(crate) fn close_sentinel(tag: &str, index: usize) -> String {
    format!("{SENTINEL_START}/{tag}:{index}{SENTINEL_END}")
}

/// Sentinel recognized on a single (trimmed) line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sentinel {
    Open(usize),
    Close(usize),
}

pub(crate) fn parse_sentinel(line: &str, tag: &str) -> Option<Sentinel> {
    let inner = line.trim().strip_prefix(SENTINEL_START)?;
    let (inner, close) = match inner.strip_prefix('/') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    let index = inner
        .strip_prefix(tag)?
        .strip_prefix(':')?
        .strip_suffix(SENTINEL_END)?
        .parse()
        .ok()?;
    Some(if close {
        Sentinel::Close(index)
    } else {
        Sentinel::Open(index)
    })
}
