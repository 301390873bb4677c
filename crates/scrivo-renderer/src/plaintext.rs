//! Plain-text mirror.
//!
//! Works on the frontmatter-stripped source, not on the render tree, so it
//! stays available when the structural pipeline fails. Directives become
//! their textual equivalents and markdown syntax is removed line by line.
//! The result never contains `**`, `:::`, code fence markers or `##`.

use std::sync::LazyLock;

use regex::Regex;

use crate::directive::fence::{FenceEvent, FenceTracker, info_language};
use crate::directive::{
    CalloutKind, DIAGRAM_LANGUAGES, DirectiveLine, HttpMethod, classify, describe_leaf,
};

/// Label emitted in place of a diagram opener.
const DIAGRAM_LABEL: &str = "[Diagram]";

static ATX_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{0,3}(#{1,6})(?:\s+(.*?))?(?:\s+#+)?\s*$").unwrap()
});
static HEADING_ATTRS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\{#[^}]*\}\s*$").unwrap());
static THEMATIC_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{0,3}(?:(?:\*\s*){3,}|(?:-\s*){3,}|(?:_\s*){3,})$").unwrap()
});
static TABLE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\|?\s*:?-+:?\s*(?:\|\s*:?-+:?\s*)*\|?\s*$").unwrap()
});
static BLOCKQUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:>\s?)+").unwrap());
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[([^\]]+)\]\(\s*<?([^)\s>]*)>?(?:\s+"[^"]*")?\s*\)"#).unwrap()
});
static AUTOLINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<((?:https?|mailto):[^>\s]+)>").unwrap());
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`+([^`]+?)`+").unwrap());
static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").unwrap());
static EMPHASIS_STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").unwrap());
static EMPHASIS_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\W)_([^_\s](?:[^_]*[^_\s])?)_(\W|$)").unwrap());
static STRIKETHROUGH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~~(.+?)~~").unwrap());
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?>").unwrap());
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*(?:\n[ \t]*){2,}").unwrap());

/// Tokens that must never survive, with their replacement. Applied until
/// none remain so overlapping runs (`***`, `####`) are fully reduced.
const RESIDUE: &[(&str, &str)] = &[("```", ""), ("~~~", ""), (":::", ""), ("**", ""), ("##", "#")];

/// Convert a document body to plain text.
#[must_use]
pub fn to_plain_text(body: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let mut mirror = Mirror {
        last_block_close: lines
            .iter()
            .rposition(|line| classify(line) == Some(DirectiveLine::BlockClose)),
        ..Mirror::default()
    };
    for (index, line) in lines.into_iter().enumerate() {
        mirror.index = index;
        mirror.line(line);
    }
    finish(&mirror.out)
}

#[derive(Debug, PartialEq, Eq)]
enum Mode {
    Text,
    /// Inside fenced code.
    Fence,
    /// Inside a `::mermaid` ... `::` block.
    DiagramBlock,
}

#[derive(Debug)]
struct Mirror {
    out: String,
    fence: FenceTracker,
    mode: Mode,
    /// Line being mirrored.
    index: usize,
    /// Last bare `::` line; a block opener after it is unterminated text.
    last_block_close: Option<usize>,
}

impl Default for Mirror {
    fn default() -> Self {
        Self {
            out: String::new(),
            fence: FenceTracker::new(),
            mode: Mode::Text,
            index: 0,
            last_block_close: None,
        }
    }
}

impl Mirror {
    fn emit(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn line(&mut self, line: &str) {
        match self.mode {
            Mode::Fence => {
                if self.fence.update(line) == FenceEvent::Close {
                    self.mode = Mode::Text;
                } else {
                    self.emit(line);
                }
            }
            Mode::DiagramBlock => {
                if classify(line) == Some(DirectiveLine::BlockClose) {
                    self.mode = Mode::Text;
                } else {
                    self.emit(line);
                }
            }
            Mode::Text => match classify(line) {
                Some(DirectiveLine::BlockOpen { .. }) if !self.block_closes_later() => {
                    self.text_line(line);
                }
                Some(directive) => self.directive(directive),
                None => self.text_line(line),
            },
        }
    }

    fn block_closes_later(&self) -> bool {
        self.last_block_close.is_some_and(|close| close > self.index)
    }

    fn directive(&mut self, directive: DirectiveLine<'_>) {
        match directive {
            DirectiveLine::ContainerOpen { name, header }
            | DirectiveLine::ContainerInline { name, header } => {
                if name == "api" {
                    self.api_header(header);
                } else if CalloutKind::from_name(name).is_some() {
                    let title = header.trim().trim_start_matches('[').trim_end_matches(']');
                    if !title.is_empty() {
                        let title = strip_inline(title);
                        self.emit(&title);
                    }
                } else if !header.is_empty() {
                    let header = strip_inline(header);
                    self.emit(&header);
                }
            }
            DirectiveLine::ContainerClose | DirectiveLine::BlockClose => {}
            DirectiveLine::Leaf { name, args } => {
                if let Some((label, title, url)) = describe_leaf(name, &args) {
                    self.emit(&format!("[{label}: {title}]({url})"));
                } else if !args.label.is_empty() {
                    let label = strip_inline(&args.label);
                    self.emit(&label);
                }
            }
            DirectiveLine::BlockOpen { name } => {
                if DIAGRAM_LANGUAGES.contains(&name) {
                    self.emit(DIAGRAM_LABEL);
                    self.mode = Mode::DiagramBlock;
                }
            }
        }
    }

    /// `METHOD PATH` as an underlined heading, then the inline summary.
    fn api_header(&mut self, header: &str) {
        let mut parts = header.split_whitespace();
        let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
            return;
        };
        let Some(method) = HttpMethod::parse(method) else {
            let header = strip_inline(header);
            self.emit(&header);
            return;
        };
        let title = format!("{} {path}", method.as_str());
        self.underlined(&title, '-');
        let summary = parts.collect::<Vec<_>>().join(" ");
        if !summary.is_empty() {
            self.emit(&summary);
        }
    }

    fn underlined(&mut self, text: &str, ch: char) {
        let width = text.chars().count().max(1);
        self.emit(text);
        self.emit(&ch.to_string().repeat(width));
    }

    fn text_line(&mut self, line: &str) {
        if let FenceEvent::Open(info) = self.fence.update(line) {
            self.mode = Mode::Fence;
            if info_language(info).is_some_and(|lang| DIAGRAM_LANGUAGES.contains(&lang)) {
                self.emit(DIAGRAM_LABEL);
            }
            return;
        }

        if let Some(caps) = ATX_HEADING.captures(line) {
            let level = caps.get(1).map_or(1, |m| m.len());
            let content = caps.get(2).map_or("", |m| m.as_str());
            let content = HEADING_ATTRS.replace(content, "");
            let text = strip_inline(&content);
            if !text.is_empty() {
                self.underlined(&text, if level == 1 { '=' } else { '-' });
            }
            return;
        }

        if THEMATIC_BREAK.is_match(line) || (line.contains('-') && TABLE_SEPARATOR.is_match(line)) {
            return;
        }

        let line = BLOCKQUOTE.replace(line, "");
        let mut line = line.trim_end();
        if line.trim_start().starts_with('|') {
            line = line.trim().trim_start_matches('|').trim_end_matches('|').trim();
        }
        let text = strip_inline(line);
        self.emit(&text);
    }
}

/// Remove inline markdown from one line.
pub(crate) fn strip_inline(text: &str) -> String {
    let text = COMMENT.replace_all(text, "");
    let text = IMAGE.replace_all(&text, "[Image: $1]");
    let text = LINK.replace_all(&text, "$1 ($2)");
    let text = AUTOLINK.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = STRONG.replace_all(&text, "$1$2");
    let text = EMPHASIS_STAR.replace_all(&text, "$1");
    let text = EMPHASIS_UNDERSCORE.replace_all(&text, "$1$2$3");
    let text = STRIKETHROUGH.replace_all(&text, "$1");
    let text = HTML_TAG.replace_all(&text, "");
    text.into_owned()
}

fn finish(text: &str) -> String {
    let text = COMMENT.replace_all(text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    let mut text = text.trim().to_owned();

    while let Some((token, replacement)) = RESIDUE.iter().find(|(token, _)| text.contains(token)) {
        text = text.replace(token, replacement);
    }
    text
}
