//! Leaf directive arguments: `[label]{key=value ...}`.

use std::collections::BTreeMap;

/// Label and attributes parsed from a leaf directive.
///
/// ```
/// use scrivo_renderer::directive::DirectiveArgs;
///
/// let args = DirectiveArgs::parse("My Video", r#"id=abc123 start="30""#);
/// assert_eq!(args.label, "My Video");
/// assert_eq!(args.get("id"), Some("abc123"));
/// assert_eq!(args.get("start"), Some("30"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectiveArgs {
    /// Text between the square brackets.
    pub label: String,
    /// Attributes from the braces, in key order.
    pub attrs: BTreeMap<String, String>,
}

impl DirectiveArgs {
    /// Parse a label and the inside of a `{...}` attribute block.
    ///
    /// Values may be double-quoted, single-quoted or bare (ending at
    /// whitespace). Tokens without `=` are ignored.
    #[must_use]
    pub fn parse(label: &str, attrs: &str) -> Self {
        let mut args = Self {
            label: label.trim().to_owned(),
            attrs: BTreeMap::new(),
        };

        let mut rest = attrs.trim_start();
        while !rest.is_empty() {
            match split_pair(rest) {
                Some((key, value, tail)) => {
                    args.attrs.insert(key.to_owned(), value.to_owned());
                    rest = tail.trim_start();
                }
                None => {
                    // Drop the unrecognized token and keep going.
                    let skip = rest.find(char::is_whitespace).unwrap_or(rest.len());
                    rest = rest[skip..].trim_start();
                }
            }
        }

        args
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Label when present, otherwise `fallback`.
    #[must_use]
    pub fn label_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.label.is_empty() {
            fallback
        } else {
            &self.label
        }
    }
}

/// Split `key=value rest` into its parts.
fn split_pair(s: &str) -> Option<(&str, &str, &str)> {
    let token_end = s.find(char::is_whitespace).unwrap_or(s.len());
    let eq = s[..token_end].find('=')?;
    let key = &s[..eq];
    if key.is_empty() {
        return None;
    }

    let after = &s[eq + 1..];
    for quote in ['"', '\''] {
        if let Some(inner) = after.strip_prefix(quote) {
            let close = inner.find(quote)?;
            return Some((key, &inner[..close], &inner[close + 1..]));
        }
    }

    let end = after.find(char::is_whitespace).unwrap_or(after.len());
    Some((key, &after[..end], &after[end..]))
}
