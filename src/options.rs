use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Shared flag a caller can trip to stop a running program.
///
/// Engines poll it between fetch cycles; cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-call settings. Everything here is owned by a single `evaluate` call.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Name shown in diagnostics; engines fall back to their virtual name.
    pub filename: Option<String>,
    /// Fetch-cycle ceiling. `None` uses the engine default.
    pub max_steps: Option<u64>,
    /// Bytes consumed by the read instructions.
    pub input: Vec<u8>,
    /// Seed for Befunge's `?`. `None` draws a fresh seed.
    pub seed: Option<u64>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }

    pub fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = input.into();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn filename_or<'a>(&'a self, virtual_name: &'a str) -> &'a str {
        self.filename.as_deref().unwrap_or(virtual_name)
    }
}

/// Cursor over [`Options::input`] used by the read instructions.
pub(crate) struct Input<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Input<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Input { bytes, pos: 0 }
    }

    pub(crate) fn read_byte(&mut self) -> Option<u8> {
        let b = self.bytes.get(self.pos).copied()?;
        self.pos += 1;
        Some(b)
    }

    /// Next UTF-8 character; an invalid sequence yields U+FFFD.
    pub(crate) fn read_char(&mut self) -> Option<char> {
        let rest = self.bytes.get(self.pos..)?;
        let first = *rest.first()?;
        let len = match first {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        let len = len.min(rest.len());
        self.pos += len;
        match std::str::from_utf8(&rest[..len]) {
            Ok(s) => s.chars().next(),
            Err(_) => Some(char::REPLACEMENT_CHARACTER),
        }
    }

    /// Skips leading whitespace and reads an optionally signed decimal.
    /// Returns `None` at end of input or when no digits follow.
    pub(crate) fn read_integer(&mut self) -> Option<i64> {
        while self.bytes.get(self.pos).is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        let start = self.pos;
        if matches!(self.bytes.get(self.pos), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let digits = self.pos;
        while self.bytes.get(self.pos).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits {
            self.pos = start;
            return None;
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).ok()?;
        text.parse().ok()
    }
}
