//! Line grammar for directives.
//!
//! Every directive occupies whole lines:
//!
//! | Line              | Meaning                                   |
//! |-------------------|-------------------------------------------|
//! | `:::name header`  | container opener                          |
//! | `:::name text :::`| single-line container                     |
//! | `:::`             | container closer                          |
//! | `::name[l]{a=b}`  | leaf directive                            |
//! | `::name`          | block opener, closed by a bare `::` line  |
//! | `::`              | block closer                              |
//!
//! Exactly three (or two) colons are significant; longer colon runs are
//! plain text. A line indented four or more columns is an indented code
//! line and never a directive.

use super::DirectiveArgs;

/// Classification of one source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DirectiveLine<'a> {
    ContainerOpen { name: &'a str, header: &'a str },
    ContainerInline { name: &'a str, header: &'a str },
    ContainerClose,
    Leaf { name: &'a str, args: DirectiveArgs },
    BlockOpen { name: &'a str },
    BlockClose,
}

/// Columns before the first non-blank character, tabs stopping at multiples of 4.
fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for b in line.bytes() {
        match b {
            b' ' => width += 1,
            b'\t' => width += 4 - width % 4,
            _ => break,
        }
    }
    width
}

/// Classify a line, returning `None` for ordinary text.
pub(crate) fn classify(line: &str) -> Option<DirectiveLine<'_>> {
    if indent_width(line) >= 4 {
        return None;
    }
    let trimmed = line.trim();
    let colons = trimmed.bytes().take_while(|&b| b == b':').count();
    let rest = &trimmed[colons..];

    match colons {
        3 => classify_container(rest),
        2 => classify_leaf(rest),
        _ => None,
    }
}

fn classify_container(rest: &str) -> Option<DirectiveLine<'_>> {
    if rest.is_empty() {
        return Some(DirectiveLine::ContainerClose);
    }

    let rest = rest.trim_start();
    let (name, header) = split_name(rest)?;
    if !header.is_empty() && !header.starts_with(char::is_whitespace) && !header.starts_with('[')
    {
        return None;
    }
    let header = header.trim();

    if let Some(inner) = header.strip_suffix(":::")
        && !inner.ends_with(':')
    {
        return Some(DirectiveLine::ContainerInline {
            name,
            header: inner.trim(),
        });
    }

    Some(DirectiveLine::ContainerOpen { name, header })
}

fn classify_leaf(rest: &str) -> Option<DirectiveLine<'_>> {
    if rest.is_empty() {
        return Some(DirectiveLine::BlockClose);
    }

    let (name, after) = split_name(rest)?;
    if after.trim().is_empty() {
        return Some(DirectiveLine::BlockOpen { name });
    }

    let (label, consumed) = take_delimited(after, '[', ']');
    let after = &after[consumed..];
    let (attrs, consumed) = take_delimited(after, '{', '}');
    let after = &after[consumed..];

    if !after.trim().is_empty() || (label.is_none() && attrs.is_none()) {
        return None;
    }

    Some(DirectiveLine::Leaf {
        name,
        args: DirectiveArgs::parse(label.unwrap_or(""), attrs.unwrap_or("")),
    })
}

/// Split a leading directive name from the rest of the line.
fn split_name(s: &str) -> Option<(&str, &str)> {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some((&s[..end], &s[end..]))
}

/// Take a balanced `open ... close` group from the start of `s`.
///
/// Returns the inner text and the number of bytes consumed, or
/// `(None, 0)` when `s` does not start with a complete group.
fn take_delimited(s: &str, open: char, close: char) -> (Option<&str>, usize) {
    if !s.starts_with(open) {
        return (None, 0);
    }

    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return (Some(&s[open.len_utf8()..i]), i + close.len_utf8());
            }
        }
    }

    (None, 0)
}
