//! Fenced code tracking.
//!
//! Directive syntax inside fenced code is literal. Both the preprocessor and
//! the plain-text mirror walk lines through a [`FenceTracker`] to know when
//! they are inside a fence.

/// Open fence marker: character and run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Marker {
    ch: char,
    len: usize,
}

/// What a line did to the fence state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FenceEvent<'a> {
    /// Line opened a fence; carries the trimmed info string.
    Open(&'a str),
    Close,
    /// Line is fence content.
    Inside,
    /// Line is outside any fence.
    Outside,
}

/// Line-by-line fence state machine (backtick or tilde fences, three or more).
///
/// A closing fence uses the same character, is at least as long as the
/// opener, and carries no info string.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<Marker>,
}

impl FenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn in_fence(&self) -> bool {
        self.open.is_some()
    }

    /// Feed the next line.
    pub(crate) fn update<'a>(&mut self, line: &'a str) -> FenceEvent<'a> {
        let trimmed = line.trim_start();

        match self.open {
            Some(open) => {
                let run = leading_run(trimmed, open.ch);
                if run >= open.len && trimmed[run * open.ch.len_utf8()..].trim().is_empty() {
                    self.open = None;
                    FenceEvent::Close
                } else {
                    FenceEvent::Inside
                }
            }
            None => {
                let Some(ch) = trimmed.chars().next().filter(|c| matches!(c, '`' | '~')) else {
                    return FenceEvent::Outside;
                };
                let len = leading_run(trimmed, ch);
                let info = trimmed[len..].trim();
                // Backtick fences may not carry backticks in their info string.
                if len < 3 || (ch == '`' && info.contains('`')) {
                    return FenceEvent::Outside;
                }
                self.open = Some(Marker { ch, len });
                FenceEvent::Open(info)
            }
        }
    }
}

fn leading_run(s: &str, ch: char) -> usize {
    s.chars().take_while(|&c| c == ch).count()
}

/// Language token of a fence info string (`rust,ignore` -> `rust`).
pub(crate) fn info_language(info: &str) -> Option<&str> {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .filter(|lang| !lang.is_empty())
}
