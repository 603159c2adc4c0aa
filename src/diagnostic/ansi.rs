use std::fmt::Write;

use super::Diagnostic;

#[derive(Debug, Clone, Copy)]
enum Style {
    Header,
    Emphasis,
    Frame,
    Muted,
}

impl Style {
    fn sgr(self) -> &'static str {
        match self {
            Style::Header => "1;31",
            Style::Emphasis => "1",
            Style::Frame => "36",
            Style::Muted => "2",
        }
    }
}

/// Terminal rendering: header, location arrow, the offending source line
/// and a run of carets under the reported span.
pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn paint(&self, style: Style, text: &str) -> String {
        if self.use_color { format!("\x1b[{}m{text}\x1b[0m", style.sgr()) } else { text.to_string() }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let loc = &d.locator;
        let width = loc.line.to_string().len();
        let blank = " ".repeat(width);
        let bar = self.paint(Style::Frame, "|");
        let mut out = String::new();

        let header = self.paint(Style::Header, &format!("error[{}]", d.code()));
        let _ = writeln!(out, "{header}: {}", self.paint(Style::Emphasis, &d.message));
        let _ = writeln!(out, "  {} {}:{}:{}", self.paint(Style::Frame, "-->"), loc.filename, loc.line, loc.column);
        let _ = writeln!(out, "{blank} {bar}");

        // Tabs would shift the caret under a different column; show them as spaces.
        let shown = loc.line_text.replace('\t', " ");
        let number = self.paint(Style::Frame, &format!("{:>width$}", loc.line));
        let _ = writeln!(out, "{number} {bar} {shown}");

        let lead = " ".repeat(loc.column.saturating_sub(1));
        let carets = self.paint(Style::Header, &"^".repeat(loc.width.max(1)));
        let _ = writeln!(out, "{blank} {bar} {lead}{carets}");
        let _ = writeln!(out, "{blank} {bar}");

        let eq = self.paint(Style::Muted, "=");
        for note in &d.notes {
            let _ = writeln!(out, "  {eq} note: {note}");
        }
        if let Some(hint) = &d.suggestion {
            let _ = writeln!(out, "  {eq} suggestion: {hint}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{ErrorKind, Reporter};
    use crate::source::Span;

    const PLAIN: AnsiRenderer = AnsiRenderer { use_color: false };

    fn empty_pop(source: &str, start: usize, end: usize) -> Diagnostic {
        Reporter::new("<befunge>", source)
            .at_span(ErrorKind::EmptyStack, "pop from empty stack", Span::new(start, end))
            .with_note("'+' pops two values")
            .with_suggestion("push a value first")
    }

    #[test]
    fn header_and_arrow() {
        let out = PLAIN.render(&empty_pop("1+@", 1, 2));
        assert!(out.starts_with("error[ESO-R002]: pop from empty stack\n"), "bad header:\n{out}");
        assert!(out.contains("--> <befunge>:1:2"), "bad location:\n{out}");
    }

    #[test]
    fn caret_sits_under_column() {
        let out = PLAIN.render(&empty_pop("1+@", 1, 2));
        assert!(out.contains("1 | 1+@\n"), "missing source line:\n{out}");
        assert!(out.contains("  |  ^\n"), "caret misplaced:\n{out}");
    }

    #[test]
    fn caret_run_matches_span_width() {
        let d = Reporter::new("<cow>", "MoO moo").at_span(ErrorKind::MismatchedBracket, "unmatched 'moo'", Span::new(4, 7));
        let out = PLAIN.render(&d);
        assert!(out.contains("|     ^^^\n"), "expected three carets at column 5:\n{out}");
    }

    #[test]
    fn notes_then_suggestion() {
        let out = PLAIN.render(&empty_pop("1+@", 1, 2));
        let note = out.find("= note: '+' pops two values").expect("note");
        let hint = out.find("= suggestion: push a value first").expect("suggestion");
        assert!(note < hint);
    }

    #[test]
    fn colour_only_when_asked() {
        let d = empty_pop("1+@", 1, 2);
        assert!(AnsiRenderer { use_color: true }.render(&d).contains("\x1b[1;31m"));
        assert!(!PLAIN.render(&d).contains('\x1b'));
    }

    #[test]
    fn second_line_and_wide_gutter() {
        let source = format!("{}>x@", "v\n".repeat(11));
        let d = Reporter::new("<befunge>", &source).at_line_col(ErrorKind::UnknownSymbol, "unknown symbol 'x'", 12, 2);
        let out = PLAIN.render(&d);
        assert!(out.contains(":12:2"), "expected line 12:\n{out}");
        assert!(out.contains("12 | >x@\n"), "expected the twelfth line:\n{out}");
        assert!(out.contains("   |  ^\n"), "gutter should be two wide:\n{out}");
    }
}
