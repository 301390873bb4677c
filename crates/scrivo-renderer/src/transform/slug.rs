//! Heading ids.

use std::collections::HashSet;

use crate::tree::{Block, Document, Heading, inline_text, walk_blocks_mut};

/// Id used when a heading has no usable characters.
const FALLBACK_SLUG: &str = "section";

/// Convert heading text to an anchor id.
///
/// Lowercases, drops everything outside `[a-z0-9-]`, turns whitespace runs
/// into single hyphens, collapses hyphen runs and trims hyphens at both ends.
///
/// ```
/// use scrivo_renderer::slugify;
///
/// assert_eq!(slugify("Getting Started"), "getting-started");
/// assert_eq!(slugify("What's new in v2.0?"), "whats-new-in-v20");
/// assert_eq!(slugify("  --Edge -- case--  "), "edge-case");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    // Starts true so leading separators are dropped.
    let mut last_was_dash = true;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            result.push(c);
            last_was_dash = false;
        } else if (c.is_whitespace() || c == '-') && !last_was_dash {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }
    result
}

/// Ids handed out within one document.
#[derive(Debug, Default)]
pub(crate) struct SlugRegistry {
    used: HashSet<String>,
}

impl SlugRegistry {
    /// Reserve `base`, or the first free `base-N` (N from 2).
    pub(crate) fn claim(&mut self, base: &str) -> String {
        let base = if base.is_empty() { FALLBACK_SLUG } else { base };
        if self.used.insert(base.to_owned()) {
            return base.to_owned();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Give every heading a unique id. Explicit `{#id}` values are kept but
/// still de-duplicated.
pub(crate) fn assign(doc: &mut Document) {
    let mut registry = SlugRegistry::default();
    walk_blocks_mut(&mut doc.blocks, &mut |block| {
        if let Block::Heading(Heading { id, inlines, .. }) = block {
            let base = match id.as_deref() {
                Some(explicit) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
                _ => slugify(&inline_text(inlines)),
            };
            *id = Some(registry.claim(&base));
        }
    });
}
