//! Title, order and excerpt resolution.
//!
//! Every resolver has a fallback that cannot fail, so the resilience
//! boundary can call them on any input.

use std::path::Path;

use crate::directive::fence::FenceTracker;
use crate::frontmatter::Frontmatter;
use crate::plaintext::strip_inline;

/// File stems that take their title and order from the parent directory.
const INDEX_STEMS: &[&str] = &["index", "readme", "_index"];
/// Title used when nothing else is available.
const UNTITLED: &str = "Untitled";
/// Appended to truncated excerpts.
const ELLIPSIS: char = '…';

/// Title: frontmatter, then the first H1 of the raw body, then the file name.
#[must_use]
pub fn resolve_title(frontmatter: &Frontmatter, raw_body: &str, path: &Path) -> String {
    frontmatter
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_owned)
        .or_else(|| first_h1(raw_body))
        .unwrap_or_else(|| title_from_path(path))
}

/// Order: frontmatter, then a numeric file name prefix, then `default`.
#[must_use]
pub fn resolve_order(frontmatter: &Frontmatter, path: &Path, default: i64) -> i64 {
    frontmatter
        .order
        .or_else(|| order_from_path(path))
        .unwrap_or(default)
}

/// Excerpt: frontmatter, then the start of the plain-text mirror.
#[must_use]
pub fn resolve_excerpt(frontmatter: &Frontmatter, plain_text: &str, limit: usize) -> String {
    frontmatter
        .excerpt
        .as_deref()
        .map(str::trim)
        .filter(|excerpt| !excerpt.is_empty())
        .map_or_else(|| excerpt(plain_text, limit), str::to_owned)
}

/// First level-1 ATX heading outside fenced code.
pub(crate) fn first_h1(raw_body: &str) -> Option<String> {
    let mut fence = FenceTracker::new();
    for line in raw_body.lines() {
        if fence.in_fence() {
            fence.update(line);
            continue;
        }
        fence.update(line);
        if fence.in_fence() {
            continue;
        }

        let indent = line.len() - line.trim_start().len();
        let Some(rest) = line.trim_start().strip_prefix('#') else {
            continue;
        };
        if indent > 3 || !(rest.is_empty() || rest.starts_with([' ', '\t'])) {
            continue;
        }

        let mut text = rest.trim();
        if let Some(start) = text.rfind("{#")
            && text.ends_with('}')
        {
            text = text[..start].trim_end();
        }
        let text = text.trim_end_matches('#').trim_end();
        let title = strip_inline(text).trim().to_owned();
        if !title.is_empty() {
            return Some(title);
        }
    }
    None
}

/// Split `01-getting-started` into `(Some(1), "getting-started")`.
fn split_numeric_prefix(stem: &str) -> (Option<i64>, &str) {
    let digits = stem.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return (None, stem);
    }
    let rest = &stem[digits..];
    let trimmed = rest.trim_start_matches(['-', '_', '.', ' ']);
    if trimmed.len() == rest.len() || trimmed.is_empty() {
        return (None, stem);
    }
    (stem[..digits].parse().ok(), trimmed)
}

/// Stem that names the document: the file stem, or the parent directory
/// for index files.
fn naming_stem(path: &Path) -> Option<&str> {
    let stem = path.file_stem()?.to_str()?;
    if INDEX_STEMS.contains(&stem.to_ascii_lowercase().as_str()) {
        return path.parent()?.file_name()?.to_str();
    }
    Some(stem)
}

/// Title-cased name derived from the path.
///
/// ```
/// use std::path::Path;
/// use scrivo_renderer::title_from_path;
///
/// assert_eq!(title_from_path(Path::new("docs/02-getting_started.md")), "Getting Started");
/// assert_eq!(title_from_path(Path::new("docs/api-guide/index.md")), "Api Guide");
/// ```
#[must_use]
pub fn title_from_path(path: &Path) -> String {
    let Some(stem) = naming_stem(path) else {
        return UNTITLED.to_owned();
    };
    let (_, name) = split_numeric_prefix(stem);
    let title = titlecase_from_slug(name);
    if title.is_empty() {
        UNTITLED.to_owned()
    } else {
        title
    }
}

fn order_from_path(path: &Path) -> Option<i64> {
    naming_stem(path).and_then(|stem| split_numeric_prefix(stem).0)
}

fn titlecase_from_slug(slug: &str) -> String {
    let mut result = String::with_capacity(slug.len());
    for word in slug.split(['-', '_', ' ']).filter(|w| !w.is_empty()) {
        if !result.is_empty() {
            result.push(' ');
        }
        capitalize_first_into(word, &mut result);
    }
    result
}

/// Capitalize the first character of a word, appending to `buf`.
fn capitalize_first_into(word: &str, buf: &mut String) {
    let mut chars = word.chars();
    if let Some(first) = chars.next() {
        buf.extend(first.to_uppercase());
        buf.push_str(chars.as_str());
    }
}

fn is_underline(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && (line.bytes().all(|b| b == b'=') || line.bytes().all(|b| b == b'-'))
}

/// First `limit` characters of the prose in `plain_text`, cut at the last
/// word boundary and marked with an ellipsis.
pub(crate) fn excerpt(plain_text: &str, limit: usize) -> String {
    let lines: Vec<&str> = plain_text.lines().collect();
    let mut words = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let heading = lines.get(i + 1).is_some_and(|next| is_underline(next));
        if heading || is_underline(line) {
            continue;
        }
        words.extend(line.split_whitespace());
    }
    let text = words.join(" ");

    let Some((cut, _)) = text.char_indices().nth(limit) else {
        return text;
    };
    let head = &text[..cut];
    // A space right at the limit means `head` already ends on a whole word.
    let head = if text[cut..].starts_with(' ') {
        head
    } else {
        match head.rfind(' ') {
            Some(space) if space > 0 => &head[..space],
            _ => head,
        }
    };
    let mut out = head.trim_end().to_owned();
    out.push(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn titled(title: &str) -> Frontmatter {
        Frontmatter {
            title: Some(title.to_owned()),
            ..Frontmatter::default()
        }
    }

    #[test]
    fn test_title_precedence() {
        let path = Path::new("docs/03-intro.md");
        assert_eq!(resolve_title(&titled("X"), "# Y", path), "X");
        assert_eq!(resolve_title(&Frontmatter::default(), "# Y", path), "Y");
        assert_eq!(resolve_title(&Frontmatter::default(), "text", path), "Intro");
        assert_eq!(resolve_title(&titled("  "), "# Y", path), "Y");
    }

    #[test]
    fn test_first_h1_rules() {
        assert_eq!(first_h1("## Sub\n# Main *doc* #\n# Second"), Some("Main doc".to_owned()));
        assert_eq!(first_h1("```\n# not a title\n```\n# Real"), Some("Real".to_owned()));
        assert_eq!(first_h1("#NoSpace\n    # indented code"), None);
        assert_eq!(first_h1("# Anchored {#top}"), Some("Anchored".to_owned()));
        assert_eq!(first_h1(":::info\n# Inside callout\n:::"), Some("Inside callout".to_owned()));
    }

    #[test]
    fn test_title_from_path() {
        assert_eq!(title_from_path(Path::new("a/getting-started.md")), "Getting Started");
        assert_eq!(title_from_path(Path::new("a/10_faq.md")), "Faq");
        assert_eq!(title_from_path(Path::new("guides/02-setup/index.md")), "Setup");
        assert_eq!(title_from_path(Path::new("2024.md")), "2024");
        assert_eq!(title_from_path(Path::new("index.md")), "Untitled");
    }

    #[test]
    fn test_order_precedence() {
        let fm = Frontmatter {
            order: Some(5),
            ..Frontmatter::default()
        };
        assert_eq!(resolve_order(&fm, Path::new("01-a.md"), 999), 5);
        assert_eq!(resolve_order(&Frontmatter::default(), Path::new("07-a.md"), 999), 7);
        assert_eq!(resolve_order(&Frontmatter::default(), Path::new("x/04-b/index.md"), 999), 4);
        assert_eq!(resolve_order(&Frontmatter::default(), Path::new("a.md"), 999), 999);
    }

    #[test]
    fn test_excerpt_short_text_untouched() {
        assert_eq!(excerpt("Title\n=====\n\nShort body.", 160), "Short body.");
    }

    #[test]
    fn test_excerpt_truncates_at_word_boundary() {
        assert_eq!(excerpt("alpha beta gamma delta", 13), "alpha beta…");
        assert_eq!(excerpt("alpha beta gamma delta", 11), "alpha beta…");
        assert_eq!(excerpt("alpha beta gamma", 10), "alpha beta…");
        assert_eq!(excerpt("alpha beta gamma", 9), "alpha…");
    }

    #[test]
    fn test_excerpt_single_long_word() {
        assert_eq!(excerpt("abcdefghij", 4), "abcd…");
    }

    #[test]
    fn test_excerpt_multibyte() {
        assert_eq!(excerpt("ééé ééé ééé", 5), "ééé…");
    }

    #[test]
    fn test_frontmatter_excerpt_wins() {
        let fm = Frontmatter {
            excerpt: Some("Given.".to_owned()),
            ..Frontmatter::default()
        };
        assert_eq!(resolve_excerpt(&fm, "computed text", 160), "Given.");
    }
}
