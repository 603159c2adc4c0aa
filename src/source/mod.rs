use std::sync::LazyLock;

use regex::Regex;

pub mod source_map;
pub use source_map::SourceMap;

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span { start: range.start, end: range.end }
    }
}

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A\s*```(?:[A-Za-z0-9_+\-]*[ \t]*\r?\n)?(.*?)\r?\n?```\s*\z")
        .expect("code fence pattern is valid")
});

/// Strips a surrounding Markdown code fence (with optional language tag).
///
/// Chat messages arrive as "```bf\n++.\n```"; everything outside the fence is
/// dropped. Text without a fence is returned unchanged. Whitespace inside the
/// fence is preserved since it is significant to some languages.
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(body) => body.as_str(),
        None => text,
    }
}
