pub mod ansi;
pub mod json;
pub mod registry;

use serde::Serialize;

use crate::source::{SourceMap, Span};

/// Coarse failure classes shared by every engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// The program failed a precondition before execution started.
    Structural,
    /// A well-formed program reached an operation that cannot proceed.
    RuntimeSemantic,
    /// A step ceiling, deadline or cancellation stopped execution.
    ResourceExhaustion,
    /// A loop made no observable progress across an iteration.
    ProgressStall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    MismatchedBracket,
    TrailingBracket,
    TrailingCommand,
    NoTermination,
    UnknownSymbol,
    InvalidOpcodeSelection,
    EmptyStack,
    InvalidNumber,
    InvalidCharacter,
    DivisionByZero,
    StepLimitExceeded,
    Cancelled,
    TimedOut,
    InfiniteLoop,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 14] = [
        ErrorKind::MismatchedBracket,
        ErrorKind::TrailingBracket,
        ErrorKind::TrailingCommand,
        ErrorKind::NoTermination,
        ErrorKind::UnknownSymbol,
        ErrorKind::InvalidOpcodeSelection,
        ErrorKind::EmptyStack,
        ErrorKind::InvalidNumber,
        ErrorKind::InvalidCharacter,
        ErrorKind::DivisionByZero,
        ErrorKind::StepLimitExceeded,
        ErrorKind::Cancelled,
        ErrorKind::TimedOut,
        ErrorKind::InfiniteLoop,
    ];

    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::MismatchedBracket => "ESO-S001",
            ErrorKind::TrailingBracket => "ESO-S002",
            ErrorKind::TrailingCommand => "ESO-S003",
            ErrorKind::NoTermination => "ESO-S004",
            ErrorKind::UnknownSymbol => "ESO-S005",
            ErrorKind::InvalidOpcodeSelection => "ESO-R001",
            ErrorKind::EmptyStack => "ESO-R002",
            ErrorKind::InvalidNumber => "ESO-R003",
            ErrorKind::InvalidCharacter => "ESO-R004",
            ErrorKind::DivisionByZero => "ESO-R005",
            ErrorKind::StepLimitExceeded => "ESO-X001",
            ErrorKind::Cancelled => "ESO-X002",
            ErrorKind::TimedOut => "ESO-X003",
            ErrorKind::InfiniteLoop => "ESO-L001",
        }
    }

    pub fn category(self) -> Category {
        match self {
            ErrorKind::MismatchedBracket
            | ErrorKind::TrailingBracket
            | ErrorKind::TrailingCommand
            | ErrorKind::NoTermination
            | ErrorKind::UnknownSymbol => Category::Structural,
            ErrorKind::InvalidOpcodeSelection
            | ErrorKind::EmptyStack
            | ErrorKind::InvalidNumber
            | ErrorKind::InvalidCharacter
            | ErrorKind::DivisionByZero => Category::RuntimeSemantic,
            ErrorKind::StepLimitExceeded | ErrorKind::Cancelled | ErrorKind::TimedOut => {
                Category::ResourceExhaustion
            }
            ErrorKind::InfiniteLoop => Category::ProgressStall,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Where a failure happened: virtual filename, 1-based line and column,
/// and the raw text of that line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locator {
    pub filename: String,
    pub line: usize,
    pub column: usize,
    pub line_text: String,
    /// Number of characters to underline, at least 1.
    pub width: usize,
}

/// Leaf errors raised below the engines. They know what went wrong but not
/// where; the engine attaches the position when turning them into a
/// [`Diagnostic`].
pub trait Fault: std::error::Error {
    fn kind(&self) -> ErrorKind;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}:{}:{}: {message}", .locator.filename, .locator.line, .locator.column)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
    pub locator: Locator,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, message: impl Into<String>, locator: Locator) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            locator,
            notes: Vec::new(),
            suggestion: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }
}

/// Builds diagnostics against one source text under one virtual filename.
pub struct Reporter<'a> {
    filename: &'a str,
    map: SourceMap<'a>,
}

impl<'a> Reporter<'a> {
    pub fn new(filename: &'a str, source: &'a str) -> Self {
        Reporter { filename, map: SourceMap::new(source) }
    }

    fn locator(&self, line: usize, column: usize, width: usize) -> Locator {
        Locator {
            filename: self.filename.to_string(),
            line,
            column,
            line_text: self.map.line_text(line).to_string(),
            width: width.max(1),
        }
    }

    pub fn at_span(&self, kind: ErrorKind, message: impl Into<String>, span: Span) -> Diagnostic {
        let (line, column) = self.map.lookup(span.start);
        let (end_line, end_column) = self.map.lookup(span.end);
        let width = if end_line == line { end_column.saturating_sub(column) } else { 1 };
        Diagnostic::new(kind, message, self.locator(line, column, width))
    }

    /// For engines that address the source as a grid of rows and columns.
    pub fn at_line_col(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Diagnostic {
        Diagnostic::new(kind, message, self.locator(line, column, 1))
    }

    /// Whole-program failures point just past the last character.
    pub fn at_end(&self, kind: ErrorKind, message: impl Into<String>) -> Diagnostic {
        let (line, column) = self.map.end();
        Diagnostic::new(kind, message, self.locator(line, column, 1))
    }

    pub fn fault(&self, fault: &dyn Fault, span: Span) -> Diagnostic {
        self.at_span(fault.kind(), fault.to_string(), span)
    }
}
