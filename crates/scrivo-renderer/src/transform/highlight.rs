//! Syntax highlighting with syntect CSS classes.
//!
//! Best effort: an unknown language or a highlighter error leaves the
//! block to be rendered as escaped plain text.

use std::sync::OnceLock;

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::tree::{Block, Document, walk_blocks_mut};

/// Languages that are never worth a highlighter lookup.
const PLAIN_LANGUAGES: &[&str] = &["text", "plain", "plaintext", "txt"];

/// Cached syntax set with lazy init.
fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

/// Highlight `source` as `language`, returning classed HTML.
pub(crate) fn highlight_code(source: &str, language: &str) -> Option<String> {
    if PLAIN_LANGUAGES.contains(&language) {
        return None;
    }
    let syntax_set = syntax_set();
    let Some(syntax) = syntax_set
        .find_syntax_by_token(language)
        .or_else(|| syntax_set.find_syntax_by_token(&language.to_ascii_lowercase()))
    else {
        tracing::debug!(language, "No syntax for language, rendering unstyled");
        return None;
    };

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, ClassStyle::Spaced);
    for line in LinesWithEndings::from(source) {
        if let Err(error) = generator.parse_html_for_line_which_includes_newline(line) {
            tracing::debug!(language, %error, "Highlighting failed, rendering unstyled");
            return None;
        }
    }
    Some(generator.finalize())
}

pub(crate) fn apply(doc: &mut Document) {
    walk_blocks_mut(&mut doc.blocks, &mut |block| {
        if let Block::Code(code) = block
            && let Some(lang) = code.lang.as_deref()
        {
            code.highlighted = highlight_code(&code.source, lang);
        }
    });
}
