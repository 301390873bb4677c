//! Markdown document transformation engine.
//!
//! Turns one source file (optional YAML frontmatter plus an extended
//! markdown body) into a [`RenderOutput`]: sanitized HTML, a heading
//! outline, a plain-text mirror and resolved page metadata.
//!
//! # Pipeline
//!
//! 1. **Frontmatter**: split and decode the header ([`frontmatter`]).
//! 2. **Directives**: rewrite `:::callout`, `:::api`, `::mermaid` and
//!    `::youtube[..]{..}` syntax into sentinels plus typed nodes
//!    ([`directive`]).
//! 3. **Parse**: build a document tree with `pulldown-cmark`.
//! 4. **Transform**: heading ids, image URLs, outline, code labels and
//!    highlighting.
//! 5. **Render**: serialize the tree to HTML, escaping all raw HTML.
//! 6. **Mirror**: derive plain text from the source body.
//!
//! [`DocumentRenderer::render`] wraps the whole pipeline: oversized input is
//! not parsed, and any stage failure yields degraded output instead of an
//! error.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use scrivo_renderer::DocumentRenderer;
//!
//! let renderer = DocumentRenderer::default();
//! let out = renderer.render(
//!     Path::new("guide/01-setup.md"),
//!     "---\ntitle: Setup\n---\n## Install\n\n:::tip\nUse **cargo**.\n:::\n",
//! );
//! assert_eq!(out.title, "Setup");
//! assert_eq!(out.order, 1);
//! assert_eq!(out.toc[0].id, "install");
//! assert!(out.html.contains("callout-tip"));
//! assert!(!out.plain_text.contains("**"));
//! ```

pub mod directive;
mod engine;
mod error;
mod escape;
pub mod frontmatter;
mod metadata;
mod options;
mod output;
mod plaintext;
mod render;
mod transform;
mod tree;

pub use engine::DocumentRenderer;
pub use error::PipelineError;
pub use escape::escape_html;
pub use frontmatter::Frontmatter;
pub use metadata::{resolve_excerpt, resolve_order, resolve_title, title_from_path};
pub use options::{
    AssetOptions, DEFAULT_EXCERPT_LENGTH, DEFAULT_MAX_SOURCE_BYTES, DEFAULT_ORDER, Environment,
    RenderOptions,
};
pub use output::{RenderOutput, RenderStatus};
pub use plaintext::to_plain_text;
pub use transform::{OutlineItem, slugify};
