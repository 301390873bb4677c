//! Frontmatter splitting.
//!
//! A document may start with a YAML header fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Getting Started
//! order: 2
//! ---
//! # Body starts here
//! ```
//!
//! Decoding never fails the caller. Malformed YAML yields an empty
//! [`Frontmatter`] plus a warning, and a missing closing fence means the
//! header is treated as ordinary body text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fence line delimiting the header.
const FENCE: &str = "---";

/// Decoded document header.
///
/// Recognized keys are lifted into typed fields; everything else is kept in
/// [`extra`](Self::extra) as JSON values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// Keys without a typed field.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Frontmatter {
    /// True when the header carried no keys at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.order.is_none()
            && self.draft.is_none()
            && self.excerpt.is_none()
            && self.extra.is_empty()
    }

    /// Look up an untyped key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Build from a decoded JSON object, lifting known keys leniently.
    ///
    /// A typed key with an unexpected shape stays in `extra` instead of
    /// failing the whole header.
    fn from_object(object: serde_json::Map<String, Value>) -> Self {
        let mut fm = Self::default();
        for (key, value) in object {
            let leftover = match key.as_str() {
                "title" => scalar_string(&value).map(|s| fm.title = Some(s)),
                "description" => scalar_string(&value).map(|s| fm.description = Some(s)),
                "excerpt" => scalar_string(&value).map(|s| fm.excerpt = Some(s)),
                "order" => integer(&value).map(|n| fm.order = Some(n)),
                "draft" => value.as_bool().map(|b| fm.draft = Some(b)),
                _ => None,
            };
            if leftover.is_none() {
                fm.extra.insert(key, value);
            }
        }
        fm
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Result of splitting a document.
#[derive(Clone, Debug, Default)]
pub struct Split<'a> {
    pub frontmatter: Frontmatter,
    /// Body text after the header (the whole input when there is none).
    pub body: &'a str,
    /// Set when a header was present but could not be decoded.
    pub warning: Option<String>,
}

/// Separate the optional YAML header from the body.
///
/// A leading byte-order mark and blank lines before the opening fence are
/// tolerated.
pub fn split(input: &str) -> Split<'_> {
    let text = input.strip_prefix('\u{feff}').unwrap_or(input);

    let Some((yaml, body)) = find_header(text) else {
        return Split {
            body: text,
            ..Split::default()
        };
    };

    match decode(yaml) {
        Ok(frontmatter) => Split {
            frontmatter,
            body,
            warning: None,
        },
        Err(message) => {
            tracing::warn!(error = %message, "Ignoring malformed frontmatter");
            Split {
                frontmatter: Frontmatter::default(),
                body,
                warning: Some(format!("malformed frontmatter: {message}")),
            }
        }
    }
}

/// Locate `(yaml, body)` slices. Returns `None` when no complete header exists.
fn find_header(text: &str) -> Option<(&str, &str)> {
    let mut cursor = 0;
    let mut lines = text.split_inclusive('\n');

    // Skip blank lines before the opening fence.
    let opening = loop {
        let line = lines.next()?;
        cursor += line.len();
        if !line.trim().is_empty() {
            break line;
        }
    };
    if opening.trim_end() != FENCE {
        return None;
    }

    let yaml_start = cursor;
    for line in lines {
        let line_start = cursor;
        cursor += line.len();
        if line.trim_end() == FENCE {
            return Some((&text[yaml_start..line_start], &text[cursor..]));
        }
    }

    tracing::warn!("Frontmatter opening fence has no closing fence, treating as body");
    None
}

fn decode(yaml: &str) -> Result<Frontmatter, String> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::default());
    }

    let parsed: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
    let json = serde_json::to_value(parsed).map_err(|e| e.to_string())?;

    match json {
        Value::Null => Ok(Frontmatter::default()),
        Value::Object(object) => Ok(Frontmatter::from_object(object)),
        _ => Err("header must be a mapping".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_header() {
        let split = split("# Title\n\nBody");
        assert!(split.frontmatter.is_empty());
        assert_eq!(split.body, "# Title\n\nBody");
        assert!(split.warning.is_none());
    }

    #[test]
    fn test_typed_fields() {
        let input = "---\ntitle: Demo\ndescription: A page\norder: 3\ndraft: true\n---\n# Hi\n";
        let split = split(input);
        assert_eq!(split.frontmatter.title.as_deref(), Some("Demo"));
        assert_eq!(split.frontmatter.description.as_deref(), Some("A page"));
        assert_eq!(split.frontmatter.order, Some(3));
        assert_eq!(split.frontmatter.draft, Some(true));
        assert_eq!(split.body, "# Hi\n");
    }

    #[test]
    fn test_extra_keys_kept() {
        let split = split("---\ntags: [a, b]\nauthor: Sam\n---\nBody");
        assert_eq!(
            split.frontmatter.get("tags"),
            Some(&serde_json::json!(["a", "b"]))
        );
        assert_eq!(
            split.frontmatter.get("author"),
            Some(&Value::String("Sam".to_owned()))
        );
    }

    #[test]
    fn test_malformed_yaml_recovers() {
        let split = split("---\ntitle: [unclosed\n---\nBody text");
        assert!(split.frontmatter.is_empty());
        assert_eq!(split.body, "Body text");
        assert!(split.warning.is_some());
    }

    #[test]
    fn test_non_mapping_root_recovers() {
        let split = split("---\n- a\n- b\n---\nBody");
        assert!(split.frontmatter.is_empty());
        assert_eq!(split.body, "Body");
        assert!(split.warning.is_some());
    }

    #[test]
    fn test_unterminated_header_is_body() {
        let input = "---\ntitle: Demo\n# Heading";
        let split = split(input);
        assert!(split.frontmatter.is_empty());
        assert_eq!(split.body, input);
    }

    #[test]
    fn test_empty_header() {
        let split = split("---\n---\nBody");
        assert!(split.frontmatter.is_empty());
        assert_eq!(split.body, "Body");
        assert!(split.warning.is_none());
    }

    #[test]
    fn test_bom_and_leading_blank_lines() {
        let split = split("\u{feff}\n\n---\ntitle: X\n---\nBody");
        assert_eq!(split.frontmatter.title.as_deref(), Some("X"));
        assert_eq!(split.body, "Body");
    }

    #[test]
    fn test_crlf_line_endings() {
        let split = split("---\r\ntitle: X\r\n---\r\nBody");
        assert_eq!(split.frontmatter.title.as_deref(), Some("X"));
        assert_eq!(split.body, "Body");
    }

    #[test]
    fn test_mistyped_field_kept_as_extra() {
        let split = split("---\ndraft: maybe\norder: \"7\"\n---\n");
        assert_eq!(split.frontmatter.draft, None);
        assert_eq!(
            split.frontmatter.get("draft"),
            Some(&Value::String("maybe".to_owned()))
        );
        assert_eq!(split.frontmatter.order, Some(7));
    }

    #[test]
    fn test_horizontal_rule_not_header() {
        let split = split("Intro\n\n---\n\nMore");
        assert!(split.frontmatter.is_empty());
        assert_eq!(split.body, "Intro\n\n---\n\nMore");
    }
}
